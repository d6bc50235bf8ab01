use super::tab::TabDescriptor;

/// Allowed drift of the width vector away from 100%.
pub const WIDTH_SUM_TOLERANCE: f64 = 0.01;

/// A non-empty run of tabs shown one at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    tabs: Vec<TabDescriptor>,
    active: usize,
}

impl Group {
    /// Returns `None` for an empty tab list; an empty group is never constructed.
    pub fn new(tabs: Vec<TabDescriptor>) -> Option<Self> {
        if tabs.is_empty() {
            return None;
        }
        Some(Self { tabs, active: 0 })
    }

    pub fn single(tab: TabDescriptor) -> Self { Self { tabs: vec![tab], active: 0 } }

    pub fn tabs(&self) -> &[TabDescriptor] { &self.tabs }

    pub fn len(&self) -> usize { self.tabs.len() }

    pub fn active_index(&self) -> usize { self.active }

    pub fn active_tab(&self) -> &TabDescriptor { &self.tabs[self.active] }

    pub fn position(&self, tab: &TabDescriptor) -> Option<usize> {
        self.tabs.iter().position(|t| t == tab)
    }

    pub(crate) fn set_active(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }
        self.active = index;
        true
    }

    pub(crate) fn insert(&mut self, index: usize, tab: TabDescriptor) {
        let index = index.min(self.tabs.len());
        self.tabs.insert(index, tab);
        if index <= self.active && self.tabs.len() > 1 {
            self.active += 1;
        }
    }

    /// Removes a tab. The caller must delete the group if this empties it.
    pub(crate) fn remove(&mut self, index: usize) -> TabDescriptor {
        let tab = self.tabs.remove(index);
        if index < self.active || self.active >= self.tabs.len() {
            self.active = self.active.saturating_sub(1);
        }
        tab
    }

    pub(crate) fn reorder(&mut self, from: usize, to: usize) {
        let active = self.tabs[self.active].clone();
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        self.active = self.position(&active).unwrap_or(0);
    }

    pub(crate) fn is_empty(&self) -> bool { self.tabs.is_empty() }
}

/// Ordered groups plus one width percentage per group.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Layout {
    pub(crate) groups: Vec<Group>,
    pub(crate) widths: Vec<f64>,
}

impl Layout {
    pub fn new(groups: Vec<Group>, widths: Vec<f64>) -> Self { Self { groups, widths } }

    pub fn groups(&self) -> &[Group] { &self.groups }

    pub fn widths(&self) -> &[f64] { &self.widths }

    pub fn len(&self) -> usize { self.groups.len() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    pub fn group(&self, index: usize) -> Option<&Group> { self.groups.get(index) }

    pub fn tabs(&self) -> impl Iterator<Item = &TabDescriptor> + '_ {
        self.groups.iter().flat_map(|g| g.tabs.iter())
    }

    pub fn width_sum(&self) -> f64 { self.widths.iter().sum() }

    /// Structural problems, empty when every invariant holds. Minimum widths
    /// are checked separately since they depend on the registry and container.
    pub fn invariant_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.groups.is_empty() {
            issues.push("layout has no groups".to_string());
        }

        if self.widths.len() != self.groups.len() {
            issues.push(format!(
                "{} widths for {} groups",
                self.widths.len(),
                self.groups.len()
            ));
        }

        if !self.groups.is_empty() && (self.width_sum() - 100.0).abs() > WIDTH_SUM_TOLERANCE {
            issues.push(format!("widths sum to {}, not 100", self.width_sum()));
        }

        for (index, group) in self.groups.iter().enumerate() {
            if group.is_empty() {
                issues.push(format!("group {index} is empty"));
            } else if group.active >= group.tabs.len() {
                issues.push(format!("group {index} has active tab {} out of range", group.active));
            }
        }

        for (index, width) in self.widths.iter().enumerate() {
            if !width.is_finite() || *width < 0.0 {
                issues.push(format!("width {index} is {width}"));
            }
        }

        issues
    }
}

pub fn equal_shares(count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let mut widths = vec![100.0 / count as f64; count];
    fix_rounding(&mut widths);
    widths
}

/// Scales `widths` so they sum to exactly 100 (up to float error in the last slot).
pub fn normalize(widths: &mut [f64]) {
    let total: f64 = widths.iter().sum();
    if widths.is_empty() {
        return;
    }
    if total <= 0.0 || !total.is_finite() {
        let equal = equal_shares(widths.len());
        widths.copy_from_slice(&equal);
        return;
    }
    for w in widths.iter_mut() {
        *w = *w * 100.0 / total;
    }
    fix_rounding(widths);
}

fn fix_rounding(widths: &mut [f64]) {
    let Some((last, rest)) = widths.split_last_mut() else { return };
    let rest_sum: f64 = rest.iter().sum();
    *last = (100.0 - rest_sum).max(0.0);
}

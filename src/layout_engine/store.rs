//! The canonical layout and the only code allowed to change it.
//!
//! Every operation is computed on a copy and committed whole, so callers never
//! observe a half-applied move or split. Rejected operations leave the layout
//! untouched and report `false`; the `try_*` variants expose the reason.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::resize::{
    self, WidthConstraints, divider_widths, enforce_minimum_widths, fund_new_slots, percent_to_px,
    px_to_percent,
};
use crate::common::config::ResizeSettings;
use crate::model::layout::{WIDTH_SUM_TOLERANCE, equal_shares, normalize};
use crate::model::{Group, KeyMinter, Layout, TabDescriptor};
use crate::persistence::default_layout;
use crate::registry::TabRegistry;

/// Where a split places the new group.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitTarget {
    /// Before the group currently at this index.
    Index(usize),
    Append,
    Prepend,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("group {0} does not exist")]
    NoSuchGroup(usize),
    #[error("group {group} has no tab at {index}")]
    NoSuchTab { group: usize, index: usize },
    #[error("{tab} is not in group {group}")]
    TabNotInGroup { tab: TabDescriptor, group: usize },
    #[error("index {index} is past the end of group {group}")]
    InsertOutOfRange { group: usize, index: usize },
    #[error("split position {0} is past the last group")]
    SplitOutOfRange(usize),
    #[error("divider {0} does not exist")]
    NoSuchDivider(usize),
    #[error("unknown tab type {0:?}")]
    UnknownTabType(String),
    #[error("expected {expected} widths, got {actual}")]
    WidthCount { expected: usize, actual: usize },
    #[error("minimum widths cannot be satisfied")]
    UnderCapacity,
    #[error("the last remaining tab cannot be closed")]
    LastTab,
}

pub type StoreResult = Result<Layout, StoreError>;

#[derive(Debug, Clone)]
pub struct LayoutStore {
    layout: Layout,
    registry: TabRegistry,
    minter: KeyMinter,
    container_width_px: f64,
    new_group_share: f64,
}

impl LayoutStore {
    pub fn new(layout: Layout, registry: TabRegistry, container_width_px: f64) -> Self {
        let mut minter = KeyMinter::new();
        minter.observe(layout.tabs());
        Self {
            layout,
            registry,
            minter,
            container_width_px,
            new_group_share: ResizeSettings::default().new_group_share,
        }
    }

    pub fn with_settings(mut self, settings: &ResizeSettings) -> Self {
        self.new_group_share = settings.new_group_share;
        self
    }

    pub fn layout(&self) -> &Layout { &self.layout }

    pub fn registry(&self) -> &TabRegistry { &self.registry }

    pub fn container_width_px(&self) -> f64 { self.container_width_px }

    pub fn constraints(&self) -> WidthConstraints { WidthConstraints::of(&self.layout, &self.registry) }

    /// Groups narrower than their minimum at the current container width.
    pub fn minimum_width_violations(&self) -> Vec<usize> {
        let constraints = self.constraints();
        percent_to_px(self.layout.widths(), self.container_width_px)
            .iter()
            .zip(&constraints.min_widths_px)
            .enumerate()
            .filter(|(_, (w, min))| **w + WIDTH_SUM_TOLERANCE < **min)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn move_within_group(&mut self, group: usize, from: usize, to: usize) -> bool {
        let result = self.try_move_within_group(group, from, to);
        self.commit("move_within_group", result)
    }

    pub fn try_move_within_group(&self, group: usize, from: usize, to: usize) -> StoreResult {
        let mut layout = self.layout.clone();
        let g = layout.groups.get_mut(group).ok_or(StoreError::NoSuchGroup(group))?;
        for index in [from, to] {
            if index >= g.len() {
                return Err(StoreError::NoSuchTab { group, index });
            }
        }
        if from != to {
            g.reorder(from, to);
        }
        Ok(layout)
    }

    pub fn move_between_groups(
        &mut self,
        source: usize,
        tab: &TabDescriptor,
        target: usize,
        target_index: usize,
    ) -> bool {
        let result = self.try_move_between_groups(source, tab, target, target_index);
        self.commit("move_between_groups", result)
    }

    /// Moves `tab` into another group under a fresh instance key. Emptying the
    /// source deletes it, and `target` is read against the layout before that.
    pub fn try_move_between_groups(
        &mut self,
        source: usize,
        tab: &TabDescriptor,
        target: usize,
        target_index: usize,
    ) -> StoreResult {
        let from = self.locate(source, tab)?;
        let target_len = self.layout.group(target).ok_or(StoreError::NoSuchGroup(target))?.len();
        if source == target {
            return self.try_move_within_group(source, from, target_index.min(target_len - 1));
        }
        if target_index > target_len {
            return Err(StoreError::InsertOutOfRange { group: target, index: target_index });
        }

        let mut layout = self.layout.clone();
        let mut target = target;
        if take_tab(&mut layout, source, from) && target > source {
            target -= 1;
        }

        let fresh = self.minter.remint(tab);
        trace!(%tab, %fresh, source, target, "tab crossed groups");
        let group = &mut layout.groups[target];
        group.insert(target_index, fresh);
        group.set_active(target_index);
        Ok(self.settle(layout))
    }

    pub fn split(&mut self, source: usize, tab: &TabDescriptor, position: SplitTarget) -> bool {
        let result = self.try_split(source, tab, position);
        self.commit("split", result)
    }

    /// Moves `tab` alone into a new group. `SplitTarget::Index` is read against
    /// the layout before the source is removed.
    pub fn try_split(&mut self, source: usize, tab: &TabDescriptor, position: SplitTarget) -> StoreResult {
        let from = self.locate(source, tab)?;
        let len = self.layout.len();
        if let SplitTarget::Index(index) = position
            && index > len
        {
            return Err(StoreError::SplitOutOfRange(index));
        }

        let mut layout = self.layout.clone();
        let removed = take_tab(&mut layout, source, from);

        let insert_at = match position {
            SplitTarget::Prepend => 0,
            SplitTarget::Append => layout.len(),
            SplitTarget::Index(index) if removed && index > source => index - 1,
            SplitTarget::Index(index) => index,
        };

        if removed && insert_at == source {
            trace!(%tab, source, "split would recreate the same group");
            return Ok(self.layout.clone());
        }

        let group = Group::single(self.minter.remint(tab));
        if removed {
            // the source group's width moves with its only tab
            let mut widths = self.layout.widths.clone();
            let inherited = widths.remove(source);
            widths.insert(insert_at, inherited);
            layout.groups.insert(insert_at, group);
            layout.widths = widths;
            Ok(self.settle(layout))
        } else {
            layout.groups.insert(insert_at, group);
            Ok(self.fund_inserted(layout, insert_at))
        }
    }

    /// Moves divider `divider` by `delta_px` from the current widths.
    pub fn resize_divider(&mut self, divider: usize, delta_px: f64, container_width_px: f64) -> bool {
        let result = self.try_resize_divider(divider, delta_px, container_width_px);
        self.commit("resize_divider", result)
    }

    pub fn try_resize_divider(&self, divider: usize, delta_px: f64, container_width_px: f64) -> StoreResult {
        if divider + 1 >= self.layout.len() {
            return Err(StoreError::NoSuchDivider(divider));
        }
        let start = percent_to_px(self.layout.widths(), container_width_px);
        let (widths, cascading) =
            divider_widths(&start, &self.constraints(), divider, delta_px, container_width_px)
                .ok_or(StoreError::UnderCapacity)?;
        if !cascading.is_empty() {
            trace!(divider, ?cascading, "resize cascaded");
        }
        let mut layout = self.layout.clone();
        layout.widths = widths;
        Ok(layout)
    }

    /// Replaces the width vector wholesale, as produced by a resize session.
    pub fn set_widths(&mut self, widths: Vec<f64>) -> bool {
        let result = if widths.len() != self.layout.len() {
            Err(StoreError::WidthCount {
                expected: self.layout.len(),
                actual: widths.len(),
            })
        } else {
            let mut layout = self.layout.clone();
            layout.widths = widths;
            normalize(&mut layout.widths);
            Ok(layout)
        };
        self.commit("set_widths", result)
    }

    /// Fits the width vector to the current group count.
    pub fn reconcile_group_count(&mut self) -> bool {
        let mut layout = self.layout.clone();
        layout.widths = resize::reconcile_group_count(
            &layout.widths,
            &self.constraints(),
            self.container_width_px,
            self.new_group_share,
        );
        let layout = self.settle(layout);
        self.commit("reconcile_group_count", Ok(layout))
    }

    pub fn set_active_tab(&mut self, group: usize, index: usize) -> bool {
        let result = self.try_set_active_tab(group, index);
        self.commit("set_active_tab", result)
    }

    pub fn try_set_active_tab(&self, group: usize, index: usize) -> StoreResult {
        let mut layout = self.layout.clone();
        let g = layout.groups.get_mut(group).ok_or(StoreError::NoSuchGroup(group))?;
        if !g.set_active(index) {
            return Err(StoreError::NoSuchTab { group, index });
        }
        Ok(self.settle(layout))
    }

    /// Adds a fresh instance of `type_id` to the end of `group` and shows it.
    pub fn open_tab(&mut self, type_id: &str, group: usize) -> bool {
        let result = self.try_open_tab(type_id, group);
        self.commit("open_tab", result)
    }

    pub fn try_open_tab(&mut self, type_id: &str, group: usize) -> StoreResult {
        self.known_type(type_id)?;
        if group >= self.layout.len() {
            return Err(StoreError::NoSuchGroup(group));
        }
        let mut layout = self.layout.clone();
        let tab = self.minter.mint(type_id);
        let g = &mut layout.groups[group];
        let index = g.len();
        g.insert(index, tab);
        g.set_active(index);
        Ok(self.settle(layout))
    }

    /// Opens a fresh instance of `type_id` in a new group of its own.
    pub fn add_group(&mut self, type_id: &str, position: SplitTarget) -> bool {
        let result = self.try_add_group(type_id, position);
        self.commit("add_group", result)
    }

    pub fn try_add_group(&mut self, type_id: &str, position: SplitTarget) -> StoreResult {
        self.known_type(type_id)?;
        let insert_at = match position {
            SplitTarget::Prepend => 0,
            SplitTarget::Append => self.layout.len(),
            SplitTarget::Index(index) if index <= self.layout.len() => index,
            SplitTarget::Index(index) => return Err(StoreError::SplitOutOfRange(index)),
        };
        let mut layout = self.layout.clone();
        layout.groups.insert(insert_at, Group::single(self.minter.mint(type_id)));
        Ok(self.fund_inserted(layout, insert_at))
    }

    /// Closes a tab, deleting its group when it was the last one there. The
    /// only tab of the only group stays open.
    pub fn close_tab(&mut self, group: usize, index: usize) -> bool {
        let result = self.try_close_tab(group, index);
        self.commit("close_tab", result)
    }

    pub fn try_close_tab(&self, group: usize, index: usize) -> StoreResult {
        let g = self.layout.group(group).ok_or(StoreError::NoSuchGroup(group))?;
        if index >= g.len() {
            return Err(StoreError::NoSuchTab { group, index });
        }
        if self.layout.len() == 1 && g.len() == 1 {
            return Err(StoreError::LastTab);
        }
        let mut layout = self.layout.clone();
        take_tab(&mut layout, group, index);
        Ok(self.settle(layout))
    }

    /// Equal shares, then minimums.
    pub fn rebalance(&mut self) -> bool {
        let mut layout = self.layout.clone();
        layout.widths = equal_shares(layout.len());
        let layout = self.settle(layout);
        self.commit("rebalance", Ok(layout))
    }

    pub fn reset(&mut self) -> bool {
        let layout = default_layout();
        self.minter.retain_only(layout.tabs());
        let layout = self.settle(layout);
        self.commit("reset", Ok(layout))
    }

    /// Records a new container width and re-applies minimums against it.
    pub fn set_container_width(&mut self, container_width_px: f64) -> bool {
        if container_width_px <= 0.0 || !container_width_px.is_finite() {
            debug!(container_width_px, "ignoring degenerate container width");
            return false;
        }
        self.container_width_px = container_width_px;
        let layout = self.settle(self.layout.clone());
        self.commit("set_container_width", Ok(layout))
    }

    fn known_type(&self, type_id: &str) -> Result<(), StoreError> {
        if self.registry.contains(type_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownTabType(type_id.to_string()))
        }
    }

    fn locate(&self, group: usize, tab: &TabDescriptor) -> Result<usize, StoreError> {
        self.layout
            .group(group)
            .ok_or(StoreError::NoSuchGroup(group))?
            .position(tab)
            .ok_or_else(|| StoreError::TabNotInGroup { tab: tab.clone(), group })
    }

    /// Widths for a layout with one new group at `index` that has no width yet.
    fn fund_inserted(&self, mut layout: Layout, index: usize) -> Layout {
        let mut slots: Vec<Option<f64>> = layout.widths.iter().copied().map(Some).collect();
        slots.insert(index, None);
        let constraints = WidthConstraints::of(&layout, &self.registry);
        layout.widths = fund_new_slots(&slots, &constraints, self.container_width_px, self.new_group_share);
        self.settle(layout)
    }

    /// Renormalizes when the sum has drifted and lifts every group to its
    /// minimum where the container allows.
    fn settle(&self, mut layout: Layout) -> Layout {
        if layout.widths.len() != layout.len() {
            layout.widths = resize::reconcile_group_count(
                &layout.widths,
                &WidthConstraints::of(&layout, &self.registry),
                self.container_width_px,
                self.new_group_share,
            );
        }
        if (layout.width_sum() - 100.0).abs() > WIDTH_SUM_TOLERANCE {
            normalize(&mut layout.widths);
        }

        let constraints = WidthConstraints::of(&layout, &self.registry);
        let px = percent_to_px(&layout.widths, self.container_width_px);
        let satisfied = px
            .iter()
            .zip(&constraints.min_widths_px)
            .all(|(w, min)| *w + WIDTH_SUM_TOLERANCE >= *min);
        if satisfied {
            return layout;
        }
        match enforce_minimum_widths(&px, &constraints) {
            Some(px) => layout.widths = px_to_percent(&px, self.container_width_px),
            None => debug!(
                container = self.container_width_px,
                "minimum widths exceed the container, keeping proportional widths"
            ),
        }
        layout
    }

    fn commit(&mut self, op: &'static str, result: StoreResult) -> bool {
        match result {
            Ok(layout) if layout != self.layout => {
                debug_assert!(
                    layout.invariant_issues().is_empty(),
                    "{op}: {:?}",
                    layout.invariant_issues()
                );
                self.layout = layout;
                debug!(op, groups = self.layout.len(), "layout updated");
                true
            }
            Ok(_) => {
                trace!(op, "layout unchanged");
                false
            }
            Err(err) => {
                debug!(op, %err, "layout operation rejected");
                false
            }
        }
    }
}

/// Removes a tab, deleting its group and width if that empties it. Returns
/// whether the group went away.
fn take_tab(layout: &mut Layout, group: usize, index: usize) -> bool {
    layout.groups[group].remove(index);
    if layout.groups[group].is_empty() {
        layout.groups.remove(group);
        layout.widths.remove(group);
        normalize(&mut layout.widths);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ACCOUNT, CHAT, HISTORY, INVENTORY, PARAMETERS, TabSpec};

    fn tab(ty: &str, key: &str) -> TabDescriptor { TabDescriptor::new(ty, key) }

    fn types(layout: &Layout) -> Vec<Vec<&str>> {
        layout
            .groups()
            .iter()
            .map(|g| g.tabs().iter().map(|t| t.type_id.as_str()).collect())
            .collect()
    }

    fn registry() -> TabRegistry {
        let mut registry = TabRegistry::empty(200.0);
        for ty in ["a", "b", "c", "d"] {
            registry.register(ty, TabSpec::new(ty.to_uppercase(), 100.0, 1));
        }
        registry
    }

    /// [[a,b],[c],[d]] with widths 40/30/30 on a 1000px container.
    fn store() -> LayoutStore {
        let layout = Layout::new(
            vec![
                Group::new(vec![tab("a", "1"), tab("b", "2")]).unwrap(),
                Group::single(tab("c", "3")),
                Group::single(tab("d", "4")),
            ],
            vec![40.0, 30.0, 30.0],
        );
        LayoutStore::new(layout, registry(), 1000.0)
    }

    fn assert_sound(store: &LayoutStore) {
        assert!(store.layout().invariant_issues().is_empty(), "{:?}", store.layout());
        assert!(store.minimum_width_violations().is_empty(), "{:?}", store.layout());
    }

    mod moves {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn reorder_within_group() {
            let mut store = store();
            assert!(store.move_within_group(0, 0, 1));
            assert_eq!(store.layout().groups()[0].tabs(), &[tab("b", "2"), tab("a", "1")]);
            assert_eq!(store.layout().widths(), &[40.0, 30.0, 30.0]);
        }

        #[test]
        fn reorder_to_same_index_is_noop() {
            let mut store = store();
            let before = store.layout().clone();
            assert!(!store.move_within_group(0, 1, 1));
            assert_eq!(store.layout(), &before);
        }

        #[test]
        fn out_of_range_reorder_is_rejected() {
            let store = store();
            assert_eq!(
                store.try_move_within_group(0, 0, 2),
                Err(StoreError::NoSuchTab { group: 0, index: 2 })
            );
            assert_eq!(store.try_move_within_group(7, 0, 0), Err(StoreError::NoSuchGroup(7)));
        }

        #[test]
        fn cross_group_move_mints_new_key() {
            let mut store = store();
            assert!(store.move_between_groups(0, &tab("b", "2"), 1, 0));
            assert_eq!(types(store.layout()), vec![vec!["a"], vec!["b", "c"], vec!["d"]]);
            let moved = &store.layout().groups()[1].tabs()[0];
            assert_ne!(moved.instance_key, "2");
            assert_eq!(store.layout().groups()[1].active_tab(), moved);
            assert_sound(&store);
        }

        #[test]
        fn emptied_source_shifts_later_target() {
            let mut store = store();
            assert!(store.move_between_groups(1, &tab("c", "3"), 2, 1));
            assert_eq!(types(store.layout()), vec![vec!["a", "b"], vec!["d", "c"]]);
            assert_eq!(store.layout().widths().len(), 2);
            assert_sound(&store);
        }

        #[test]
        fn emptied_source_leaves_earlier_target_alone() {
            let mut store = store();
            assert!(store.move_between_groups(2, &tab("d", "4"), 0, 2));
            assert_eq!(types(store.layout()), vec![vec!["a", "b", "d"], vec!["c"]]);
            assert_sound(&store);
        }

        #[test]
        fn stale_payload_is_noop() {
            let mut store = store();
            let before = store.layout().clone();
            assert!(!store.move_between_groups(1, &tab("a", "1"), 0, 0));
            assert!(!store.move_between_groups(0, &tab("a", "1"), 9, 0));
            assert!(!store.move_between_groups(0, &tab("a", "1"), 1, 5));
            assert_eq!(store.layout(), &before);
        }

        #[test]
        fn same_group_move_reorders() {
            let mut store = store();
            assert!(store.move_between_groups(0, &tab("a", "1"), 0, 5));
            assert_eq!(store.layout().groups()[0].tabs(), &[tab("b", "2"), tab("a", "1")]);
        }
    }

    mod splits {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn split_out_of_multi_tab_group_funds_new_group() {
            let mut store = store();
            assert!(store.split(0, &tab("b", "2"), SplitTarget::Index(1)));
            assert_eq!(types(store.layout()), vec![vec!["a"], vec!["b"], vec!["c"], vec!["d"]]);
            let sum: f64 = store.layout().widths().iter().sum();
            assert!((sum - 100.0).abs() < WIDTH_SUM_TOLERANCE);
            assert!((store.layout().widths()[1] - 10.0).abs() < 1e-6);
            assert_sound(&store);
        }

        #[test]
        fn prepend_and_append() {
            let mut store = store();
            assert!(store.split(0, &tab("a", "1"), SplitTarget::Append));
            assert_eq!(types(store.layout()), vec![vec!["b"], vec!["c"], vec!["d"], vec!["a"]]);

            let c = store.layout().groups()[1].tabs()[0].clone();
            assert!(store.split(1, &c, SplitTarget::Prepend));
            assert_eq!(types(store.layout()), vec![vec!["c"], vec!["b"], vec!["d"], vec!["a"]]);
            assert_sound(&store);
        }

        #[test]
        fn lone_tab_keeps_its_width() {
            let mut store = store();
            assert!(store.split(1, &tab("c", "3"), SplitTarget::Append));
            assert_eq!(types(store.layout()), vec![vec!["a", "b"], vec!["d"], vec!["c"]]);
            assert_eq!(store.layout().widths(), &[40.0, 30.0, 30.0]);
        }

        #[test]
        fn lone_tab_to_its_own_slot_is_noop() {
            let mut store = store();
            let before = store.layout().clone();
            assert!(!store.split(1, &tab("c", "3"), SplitTarget::Index(1)));
            assert!(!store.split(1, &tab("c", "3"), SplitTarget::Index(2)));
            assert_eq!(store.layout(), &before);
        }

        #[test]
        fn index_past_removed_source_is_corrected() {
            let mut store = store();
            assert!(store.split(1, &tab("c", "3"), SplitTarget::Index(3)));
            assert_eq!(types(store.layout()), vec![vec!["a", "b"], vec!["d"], vec!["c"]]);
        }

        #[test]
        fn split_beyond_end_is_rejected() {
            let mut store = store();
            assert_eq!(
                store.try_split(0, &tab("a", "1"), SplitTarget::Index(4)),
                Err(StoreError::SplitOutOfRange(4))
            );
        }

        #[test]
        fn split_then_merge_back_restores_membership() {
            let mut store = store();
            assert!(store.split(0, &tab("b", "2"), SplitTarget::Append));
            let moved = store.layout().groups()[3].tabs()[0].clone();
            assert!(store.move_between_groups(3, &moved, 0, 1));
            assert_eq!(types(store.layout()), vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
            assert_sound(&store);
        }
    }

    mod widths {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn divider_resize_clamps_right_neighbour() {
            let layout = Layout::new(
                vec![
                    Group::new(vec![tab("a", "1"), tab("b", "2")]).unwrap(),
                    Group::single(tab("c", "3")),
                ],
                vec![60.0, 40.0],
            );
            let mut registry = registry();
            registry.register("a", TabSpec::new("A", 200.0, 1));
            registry.register("c", TabSpec::new("C", 150.0, 1));
            let mut store = LayoutStore::new(layout, registry, 1000.0);

            assert!(store.resize_divider(0, 300.0, 1000.0));
            assert_eq!(store.layout().widths(), &[85.0, 15.0]);
        }

        #[test]
        fn missing_divider_is_rejected() {
            let store = store();
            assert_eq!(store.try_resize_divider(2, 10.0, 1000.0), Err(StoreError::NoSuchDivider(2)));
        }

        #[test]
        fn fourth_group_is_funded_by_lowest_priority() {
            let layout = Layout::new(
                vec![
                    Group::single(tab(CHAT, "1")),
                    Group::single(tab(INVENTORY, "2")),
                    Group::single(tab(ACCOUNT, "3")),
                ],
                vec![33.0, 33.0, 34.0],
            );
            let mut store = LayoutStore::new(layout, TabRegistry::default(), 3000.0);
            assert!(store.add_group(PARAMETERS, SplitTarget::Append));

            let widths = store.layout().widths();
            assert_eq!(widths.len(), 4);
            // account (priority 1) pays for the new group; chat and inventory keep theirs
            assert!((widths[0] - 33.0).abs() < 1e-6, "{widths:?}");
            assert!((widths[1] - 33.0).abs() < 1e-6, "{widths:?}");
            assert!((widths[2] - 24.0).abs() < 1e-6, "{widths:?}");
            assert!((widths[3] - 10.0).abs() < 1e-6, "{widths:?}");
            assert_sound(&store);
        }

        #[test]
        fn equal_priorities_share_the_cost_of_a_new_group() {
            let layout = Layout::new(
                vec![
                    Group::single(tab("a", "1")),
                    Group::single(tab("b", "2")),
                    Group::single(tab("c", "3")),
                ],
                vec![33.0, 33.0, 34.0],
            );
            let mut store = LayoutStore::new(layout, registry(), 3000.0);
            assert!(store.add_group("d", SplitTarget::Append));

            let widths = store.layout().widths();
            let expected = [33.0 - 10.0 / 3.0, 33.0 - 10.0 / 3.0, 34.0 - 10.0 / 3.0, 10.0];
            for (w, e) in widths.iter().zip(expected) {
                assert!((w - e).abs() < 1e-6, "{widths:?}");
            }
            assert_sound(&store);
        }

        #[test]
        fn reconcile_repairs_mismatched_vector() {
            let mut store = store();
            store.layout.widths = vec![50.0, 50.0];
            assert!(store.reconcile_group_count());
            assert_eq!(store.layout().widths().len(), 3);
            assert_sound(&store);
        }

        #[test]
        fn set_widths_checks_length() {
            let mut store = store();
            assert!(!store.set_widths(vec![50.0, 50.0]));
            assert!(store.set_widths(vec![20.0, 40.0, 40.0]));
            assert_eq!(store.layout().widths(), &[20.0, 40.0, 40.0]);
        }

        #[test]
        fn activating_a_wider_tab_enforces_its_minimum() {
            let layout = Layout::new(
                vec![
                    Group::new(vec![tab(HISTORY, "h"), tab(CHAT, "c")]).unwrap(),
                    Group::single(tab(ACCOUNT, "a")),
                ],
                vec![25.0, 75.0],
            );
            let mut store = LayoutStore::new(layout, TabRegistry::default(), 1000.0);
            assert!(store.set_active_tab(0, 1));
            assert_eq!(store.layout().widths(), &[32.0, 68.0]);
            assert!(!store.set_active_tab(0, 5));
        }

        #[test]
        fn rebalance_returns_to_equal_shares() {
            let mut store = store();
            assert!(store.rebalance());
            let widths = store.layout().widths();
            assert!(widths.iter().all(|w| (w - 100.0 / 3.0).abs() < 1e-6), "{widths:?}");
        }

        #[test]
        fn shrinking_container_reapplies_minimums() {
            let mut store = store();
            store.set_widths(vec![80.0, 10.0, 10.0]);
            assert!(store.set_container_width(500.0));
            assert_sound(&store);
            assert!(!store.set_container_width(0.0));
        }
    }

    mod lifecycle {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn open_tab_appends_and_activates() {
            let mut store = store();
            assert!(store.open_tab("c", 0));
            let group = &store.layout().groups()[0];
            assert_eq!(group.len(), 3);
            assert_eq!(group.active_index(), 2);
            assert_eq!(group.active_tab().type_id, "c");
        }

        #[test]
        fn unknown_types_cannot_be_opened() {
            let mut store = store();
            assert_eq!(
                store.try_open_tab("nope", 0),
                Err(StoreError::UnknownTabType("nope".into()))
            );
            assert!(!store.add_group("nope", SplitTarget::Append));
        }

        #[test]
        fn closing_last_tab_removes_group() {
            let mut store = store();
            assert!(store.close_tab(1, 0));
            assert_eq!(types(store.layout()), vec![vec!["a", "b"], vec!["d"]]);
            assert_sound(&store);
            assert!(!store.close_tab(5, 0));
        }

        #[test]
        fn last_tab_cannot_be_closed() {
            let layout = Layout::new(vec![Group::single(tab("a", "1"))], vec![100.0]);
            let mut store = LayoutStore::new(layout, registry(), 1000.0);
            assert_eq!(store.try_close_tab(0, 0), Err(StoreError::LastTab));
            assert!(!store.close_tab(0, 0));
            assert_eq!(types(store.layout()), vec![vec!["a"]]);
            assert_eq!(store.layout().widths(), &[100.0]);

            assert!(store.open_tab("b", 0));
            assert!(store.close_tab(0, 0));
            assert_eq!(types(store.layout()), vec![vec!["b"]]);
            assert_eq!(store.try_close_tab(0, 0), Err(StoreError::LastTab));
        }

        #[test]
        fn reset_restores_default_layout() {
            let mut store = LayoutStore::new(default_layout(), TabRegistry::default(), 1200.0);
            store.close_tab(0, 0);
            assert!(store.reset());
            assert_eq!(store.layout(), &default_layout());
        }
    }
}

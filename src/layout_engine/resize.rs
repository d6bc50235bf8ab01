//! Width redistribution: divider drags, minimum-width enforcement and
//! reconciliation when the number of groups changes.
//!
//! Widths are stored as percentages of the container but every constraint is
//! expressed in pixels, so the functions here convert at the edges and work in
//! whichever unit the constraint is defined in.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::model::Layout;
use crate::model::layout::{equal_shares, normalize};
use crate::registry::TabRegistry;

const EPSILON: f64 = 1e-6;

pub fn percent_to_px(widths: &[f64], container_width_px: f64) -> Vec<f64> {
    widths.iter().map(|w| w * container_width_px / 100.0).collect()
}

pub fn px_to_percent(widths_px: &[f64], container_width_px: f64) -> Vec<f64> {
    let mut widths: Vec<f64> = if container_width_px > 0.0 {
        widths_px.iter().map(|w| w * 100.0 / container_width_px).collect()
    } else {
        widths_px.to_vec()
    };
    normalize(&mut widths);
    widths
}

/// Per-group minimum widths in pixels and priorities, in group order.
#[derive(Debug, Clone, PartialEq)]
pub struct WidthConstraints {
    pub min_widths_px: Vec<f64>,
    pub priorities: Vec<i32>,
}

impl WidthConstraints {
    pub fn of(layout: &Layout, registry: &TabRegistry) -> Self {
        Self {
            min_widths_px: layout.groups().iter().map(|g| registry.group_min_width_px(g)).collect(),
            priorities: layout.groups().iter().map(|g| registry.group_priority(g)).collect(),
        }
    }

    pub fn min_widths_percent(&self, container_width_px: f64) -> Vec<f64> {
        if container_width_px <= 0.0 {
            return vec![0.0; self.min_widths_px.len()];
        }
        self.min_widths_px.iter().map(|m| m * 100.0 / container_width_px).collect()
    }

    /// Indices ordered lowest priority first, ties by index.
    fn donor_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.priorities.len()).collect();
        order.sort_by_key(|&i| (self.priorities[i], i));
        order
    }

    /// `donor_order` split into runs of equal priority.
    fn donor_tiers(&self) -> Vec<Vec<usize>> {
        let mut tiers: Vec<Vec<usize>> = Vec::new();
        for idx in self.donor_order() {
            match tiers.last_mut() {
                Some(tier) if self.priorities[tier[0]] == self.priorities[idx] => tier.push(idx),
                _ => tiers.push(vec![idx]),
            }
        }
        tiers
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DividerResize {
    pub widths_px: Vec<f64>,
    /// Groups beyond the right neighbour that gave up width.
    pub cascading_groups: Vec<usize>,
}

/// Moves divider `divider` (between groups `divider` and `divider + 1`) by
/// `delta_px` relative to `start_px`.
///
/// Growing the left side clamps the right neighbour at its minimum and takes
/// the rest from groups further right. Shrinking the left side clamps it at
/// its minimum and drops whatever is left of the delta.
pub fn resize_divider_px(
    start_px: &[f64],
    min_widths_px: &[f64],
    divider: usize,
    delta_px: f64,
) -> Option<DividerResize> {
    let left = divider;
    let right = divider + 1;
    if right >= start_px.len() || min_widths_px.len() != start_px.len() {
        return None;
    }

    let slack = |i: usize| (start_px[i] - min_widths_px[i]).max(0.0);
    let mut widths_px = start_px.to_vec();
    let mut cascading_groups = Vec::new();

    if delta_px > 0.0 {
        let right_room = slack(right);
        if delta_px <= right_room {
            widths_px[left] += delta_px;
            widths_px[right] -= delta_px;
        } else {
            widths_px[right] -= right_room;
            let mut absorbed = right_room;
            let mut remaining = delta_px - right_room;
            for idx in right + 1..start_px.len() {
                if remaining <= EPSILON {
                    break;
                }
                let take = slack(idx).min(remaining);
                if take <= 0.0 {
                    continue;
                }
                widths_px[idx] -= take;
                remaining -= take;
                absorbed += take;
                cascading_groups.push(idx);
            }
            widths_px[left] += absorbed;
        }
    } else if delta_px < 0.0 {
        let give = (-delta_px).min(slack(left));
        widths_px[left] -= give;
        widths_px[right] += give;
    }

    Some(DividerResize {
        widths_px,
        cascading_groups,
    })
}

/// Lifts every group to its minimum, funding the shortfall from the other
/// groups' slack, lowest priority first. Returns `None` when the minimums do
/// not fit in the total width.
pub fn enforce_minimum_widths(widths_px: &[f64], constraints: &WidthConstraints) -> Option<Vec<f64>> {
    let mins = &constraints.min_widths_px;
    if mins.len() != widths_px.len() {
        return None;
    }

    let total: f64 = widths_px.iter().sum();
    let total_min: f64 = mins.iter().sum();
    if total_min > total + EPSILON {
        return None;
    }

    let mut widths = widths_px.to_vec();
    let mut shortfall = 0.0;
    for (w, min) in widths.iter_mut().zip(mins) {
        if *w < *min {
            shortfall += *min - *w;
            *w = *min;
        }
    }

    if shortfall <= EPSILON {
        return Some(widths);
    }

    for idx in constraints.donor_order() {
        if shortfall <= EPSILON {
            break;
        }
        let take = (widths[idx] - mins[idx]).max(0.0).min(shortfall);
        widths[idx] -= take;
        shortfall -= take;
    }

    (shortfall <= EPSILON).then_some(widths)
}

/// Divider drag in percent space: resize, enforce minimums, renormalize.
/// `None` means the increment could not be satisfied and the caller keeps
/// its current widths.
pub fn divider_widths(
    start_px: &[f64],
    constraints: &WidthConstraints,
    divider: usize,
    delta_px: f64,
    container_width_px: f64,
) -> Option<(Vec<f64>, Vec<usize>)> {
    let resized = resize_divider_px(start_px, &constraints.min_widths_px, divider, delta_px)?;
    let enforced = enforce_minimum_widths(&resized.widths_px, constraints)?;
    Some((
        px_to_percent(&enforced, container_width_px),
        resized.cascading_groups,
    ))
}

/// Fits a width vector to `constraints.priorities.len()` groups.
///
/// More groups than widths: each new group asks for `new_share` percent,
/// funded from existing slack, lowest priority first; if the slack runs out
/// everything is scaled proportionally instead. Fewer groups: the surplus is
/// truncated and the rest renormalized. No widths at all: equal shares.
pub fn reconcile_group_count(
    widths: &[f64],
    constraints: &WidthConstraints,
    container_width_px: f64,
    new_share: f64,
) -> Vec<f64> {
    let count = constraints.priorities.len();
    if count == 0 {
        return Vec::new();
    }
    if widths.is_empty() {
        return equal_shares(count);
    }
    if widths.len() >= count {
        let mut kept = widths[..count].to_vec();
        normalize(&mut kept);
        return kept;
    }

    let slots: Vec<Option<f64>> = widths
        .iter()
        .copied()
        .map(Some)
        .chain(std::iter::repeat_n(None, count - widths.len()))
        .collect();
    fund_new_slots(&slots, constraints, container_width_px, new_share)
}

/// Fills the `None` slots with `new_share` percent each. `Some` slots pay for
/// them out of their slack above minimum, lowest priority tier first. Within a
/// tier the cost is split evenly, capped by each member's slack.
pub fn fund_new_slots(
    slots: &[Option<f64>],
    constraints: &WidthConstraints,
    container_width_px: f64,
    new_share: f64,
) -> Vec<f64> {
    let new_count = slots.iter().filter(|s| s.is_none()).count();
    let existing_count = slots.len() - new_count;
    if new_count == 0 || existing_count == 0 {
        let mut widths: Vec<f64> = slots.iter().map(|s| s.unwrap_or(new_share)).collect();
        normalize(&mut widths);
        return widths;
    }

    let share = if new_share * new_count as f64 >= 100.0 {
        100.0 / slots.len() as f64
    } else {
        new_share
    };
    let need = share * new_count as f64;

    let mut existing: Vec<f64> = slots.iter().map(|s| s.unwrap_or(0.0)).collect();
    normalize_some(&mut existing, slots);

    let mins = constraints.min_widths_percent(container_width_px);
    let mut funded = existing.clone();
    let mut remaining = need;
    for tier in constraints.donor_tiers() {
        if remaining <= EPSILON {
            break;
        }
        let mut donors: Vec<(usize, f64)> = tier
            .into_iter()
            .filter(|&idx| slots.get(idx).is_some_and(Option::is_some))
            .map(|idx| (idx, (funded[idx] - mins.get(idx).copied().unwrap_or(0.0)).max(0.0)))
            .collect();
        // tightest donor first; whatever it cannot give is spread over the rest
        donors.sort_by(|a, b| a.1.total_cmp(&b.1));
        let tier_slack: f64 = donors.iter().map(|(_, slack)| slack).sum();
        let mut owed = remaining.min(tier_slack);
        remaining -= owed;
        let mut left = donors.len();
        for (idx, slack) in donors {
            let take = slack.min(owed / left as f64);
            funded[idx] -= take;
            owed -= take;
            left -= 1;
        }
    }

    if remaining > EPSILON {
        debug!(need, remaining, "not enough slack for new groups, scaling proportionally");
        let scale = (100.0 - need) / 100.0;
        funded = existing.iter().map(|w| w * scale).collect();
    }

    for (w, slot) in funded.iter_mut().zip(slots) {
        if slot.is_none() {
            *w = share;
        }
    }
    normalize(&mut funded);
    funded
}

/// Normalizes only the `Some` positions of `widths` to sum to 100.
fn normalize_some(widths: &mut [f64], slots: &[Option<f64>]) {
    let total: f64 = slots.iter().flatten().sum();
    let count = slots.iter().flatten().count();
    for (w, slot) in widths.iter_mut().zip(slots) {
        if let Some(v) = slot {
            *w = if total > 0.0 { v * 100.0 / total } else { 100.0 / count as f64 };
        }
    }
}

/// One in-flight divider drag.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub divider_index: usize,
    pub start_widths_px: Vec<f64>,
    pub min_widths_px: Vec<f64>,
    pub cascading_groups: Vec<usize>,
    priorities: Vec<i32>,
    container_width_px: f64,
    start_x: f64,
    last_applied: Option<Instant>,
    pending_delta: Option<f64>,
}

impl ResizeSession {
    fn constraints(&self) -> WidthConstraints {
        WidthConstraints {
            min_widths_px: self.min_widths_px.clone(),
            priorities: self.priorities.clone(),
        }
    }

    fn compute(&mut self, delta_px: f64) -> Option<Vec<f64>> {
        let (widths, cascading) = divider_widths(
            &self.start_widths_px,
            &self.constraints(),
            self.divider_index,
            delta_px,
            self.container_width_px,
        )?;
        if !cascading.is_empty() {
            trace!(divider = self.divider_index, ?cascading, "resize cascaded");
        }
        self.cascading_groups = cascading;
        Some(widths)
    }
}

/// Turns pointer movement on a divider into width vectors, at most one per
/// throttle interval.
#[derive(Debug, Clone)]
pub struct ResizeController {
    session: Option<ResizeSession>,
    throttle: Duration,
}

impl ResizeController {
    pub fn new(throttle: Duration) -> Self { Self { session: None, throttle } }

    pub fn is_active(&self) -> bool { self.session.is_some() }

    pub fn session(&self) -> Option<&ResizeSession> { self.session.as_ref() }

    /// Snapshots widths and minimums. Returns false for a divider that does not
    /// exist in `layout`.
    pub fn start(
        &mut self,
        divider_index: usize,
        pointer_x: f64,
        layout: &Layout,
        registry: &TabRegistry,
        container_width_px: f64,
    ) -> bool {
        if divider_index + 1 >= layout.len() {
            debug!(divider_index, groups = layout.len(), "ignoring resize on missing divider");
            return false;
        }
        let constraints = WidthConstraints::of(layout, registry);
        self.session = Some(ResizeSession {
            divider_index,
            start_widths_px: percent_to_px(layout.widths(), container_width_px),
            min_widths_px: constraints.min_widths_px,
            cascading_groups: Vec::new(),
            priorities: constraints.priorities,
            container_width_px,
            start_x: pointer_x,
            last_applied: None,
            pending_delta: None,
        });
        debug!(divider_index, "resize started");
        true
    }

    /// New percentage widths for the pointer at `pointer_x`, or `None` when
    /// throttled or when the increment cannot be satisfied.
    pub fn drag(&mut self, pointer_x: f64, now: Instant) -> Option<Vec<f64>> {
        let throttle = self.throttle;
        let session = self.session.as_mut()?;
        let delta = pointer_x - session.start_x;

        if let Some(last) = session.last_applied
            && now.saturating_duration_since(last) < throttle
        {
            session.pending_delta = Some(delta);
            return None;
        }

        session.last_applied = Some(now);
        session.pending_delta = None;
        session.compute(delta)
    }

    /// Ends the drag, returning the widths for a throttled delta that was
    /// never applied.
    pub fn end(&mut self) -> Option<Vec<f64>> {
        let mut session = self.session.take()?;
        debug!(divider = session.divider_index, "resize ended");
        let pending = session.pending_delta.take()?;
        session.compute(pending)
    }

    pub fn cancel(&mut self) { self.session = None; }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Group, TabDescriptor};

    fn constraints(mins: &[f64], priorities: &[i32]) -> WidthConstraints {
        WidthConstraints {
            min_widths_px: mins.to_vec(),
            priorities: priorities.to_vec(),
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} vs {expected:?}");
        }
    }

    fn sum(widths: &[f64]) -> f64 { widths.iter().sum() }

    mod divider {
        use super::*;

        #[test]
        fn small_delta_moves_between_neighbours() {
            let out = resize_divider_px(&[500.0, 500.0], &[200.0, 200.0], 0, 100.0).unwrap();
            assert_close(&out.widths_px, &[600.0, 400.0]);
            assert!(out.cascading_groups.is_empty());
        }

        #[test]
        fn right_neighbour_clamps_without_cascade_target() {
            let out = resize_divider_px(&[600.0, 400.0], &[200.0, 150.0], 0, 300.0).unwrap();
            assert_close(&out.widths_px, &[850.0, 150.0]);
        }

        #[test]
        fn overflow_cascades_rightward() {
            let out = resize_divider_px(
                &[300.0, 300.0, 200.0, 200.0],
                &[100.0, 250.0, 150.0, 150.0],
                0,
                200.0,
            )
            .unwrap();
            // 50 from the neighbour, 50 from group 2, 50 from group 3; 50 unabsorbed
            assert_close(&out.widths_px, &[450.0, 250.0, 150.0, 150.0]);
            assert_eq!(out.cascading_groups, vec![2, 3]);
        }

        #[test]
        fn cascade_stops_once_absorbed() {
            let out = resize_divider_px(
                &[300.0, 300.0, 200.0, 200.0],
                &[100.0, 250.0, 100.0, 100.0],
                0,
                120.0,
            )
            .unwrap();
            assert_close(&out.widths_px, &[420.0, 250.0, 130.0, 200.0]);
            assert_eq!(out.cascading_groups, vec![2]);
        }

        #[test]
        fn shrinking_left_clamps_without_cascade() {
            let out = resize_divider_px(
                &[300.0, 300.0, 400.0],
                &[100.0, 100.0, 100.0],
                1,
                -500.0,
            )
            .unwrap();
            // only 200 of the 500 can come out of group 1; group 0 is untouched
            assert_close(&out.widths_px, &[300.0, 100.0, 600.0]);
            assert!(out.cascading_groups.is_empty());
        }

        #[test]
        fn missing_divider_is_rejected() {
            assert!(resize_divider_px(&[500.0, 500.0], &[0.0, 0.0], 1, 10.0).is_none());
            assert!(resize_divider_px(&[1000.0], &[0.0], 0, 10.0).is_none());
        }

        #[test]
        fn zero_delta_is_identity() {
            let out = resize_divider_px(&[400.0, 600.0], &[100.0, 100.0], 0, 0.0).unwrap();
            assert_close(&out.widths_px, &[400.0, 600.0]);
        }
    }

    mod minimums {
        use super::*;

        #[test]
        fn satisfied_widths_pass_through() {
            let c = constraints(&[100.0, 100.0], &[1, 1]);
            assert_close(&enforce_minimum_widths(&[400.0, 600.0], &c).unwrap(), &[400.0, 600.0]);
        }

        #[test]
        fn shortfall_comes_from_lowest_priority_first() {
            let c = constraints(&[300.0, 100.0, 100.0], &[5, 1, 3]);
            let out = enforce_minimum_widths(&[200.0, 400.0, 400.0], &c).unwrap();
            assert_close(&out, &[300.0, 300.0, 400.0]);
        }

        #[test]
        fn ties_break_by_index() {
            let c = constraints(&[300.0, 100.0, 100.0], &[5, 1, 1]);
            let out = enforce_minimum_widths(&[200.0, 400.0, 400.0], &c).unwrap();
            assert_close(&out, &[300.0, 300.0, 400.0]);
        }

        #[test]
        fn donors_are_drained_in_turn() {
            let c = constraints(&[500.0, 100.0, 100.0], &[5, 1, 2]);
            let out = enforce_minimum_widths(&[200.0, 300.0, 500.0], &c).unwrap();
            assert_close(&out, &[500.0, 100.0, 400.0]);
        }

        #[test]
        fn under_capacity_is_rejected() {
            let c = constraints(&[600.0, 600.0], &[1, 1]);
            assert!(enforce_minimum_widths(&[500.0, 500.0], &c).is_none());
        }
    }

    mod reconcile {
        use super::*;

        #[test]
        fn new_group_is_funded_by_lowest_priority_slack() {
            let c = constraints(&[100.0, 100.0, 100.0, 100.0], &[3, 1, 2, 0]);
            let out = reconcile_group_count(&[33.0, 33.0, 34.0], &c, 1000.0, 10.0);
            assert_close(&out, &[33.0, 23.0, 34.0, 10.0]);
        }

        #[test]
        fn new_group_funding_spills_to_next_donor() {
            let c = constraints(&[250.0, 300.0, 300.0, 100.0], &[1, 2, 3, 0]);
            let out = reconcile_group_count(&[33.0, 33.0, 34.0], &c, 1000.0, 10.0);
            // group 0 can spare 8, group 1 covers the remaining 2
            assert_close(&out, &[25.0, 31.0, 34.0, 10.0]);
        }

        #[test]
        fn insufficient_slack_scales_proportionally() {
            let c = constraints(&[500.0, 500.0, 100.0], &[1, 1, 1]);
            let out = reconcile_group_count(&[50.0, 50.0], &c, 1000.0, 10.0);
            assert_close(&out, &[45.0, 45.0, 10.0]);
        }

        #[test]
        fn shrinking_truncates_and_renormalizes() {
            let c = constraints(&[0.0, 0.0], &[1, 1]);
            let out = reconcile_group_count(&[30.0, 30.0, 40.0], &c, 1000.0, 10.0);
            assert_close(&out, &[50.0, 50.0]);
        }

        #[test]
        fn no_prior_widths_means_equal_shares() {
            let c = constraints(&[0.0, 0.0, 0.0, 0.0], &[1, 1, 1, 1]);
            let out = reconcile_group_count(&[], &c, 1000.0, 10.0);
            assert_close(&out, &[25.0, 25.0, 25.0, 25.0]);
        }

        #[test]
        fn equal_priorities_split_the_new_share() {
            let c = constraints(&[100.0, 100.0, 100.0, 100.0], &[1, 1, 1, 1]);
            let out = reconcile_group_count(&[33.0, 33.0, 34.0], &c, 3000.0, 10.0);
            let third = 10.0 / 3.0;
            assert_close(&out, &[33.0 - third, 33.0 - third, 34.0 - third, 10.0]);
        }

        #[test]
        fn tight_tier_member_gives_what_it_can() {
            // group 0 can spare 2, so groups 1 and 2 cover 4 each; group 3 is
            // a higher tier and is untouched
            let c = constraints(&[100.0, 100.0, 100.0, 100.0, 0.0], &[1, 1, 1, 5, 0]);
            let out = reconcile_group_count(&[12.0, 30.0, 30.0, 28.0], &c, 1000.0, 10.0);
            assert_close(&out, &[10.0, 26.0, 26.0, 28.0, 10.0]);
        }

        #[test]
        fn exhausted_tier_spills_into_next() {
            let c = constraints(&[150.0, 150.0, 150.0, 0.0], &[1, 1, 5, 0]);
            let out = reconcile_group_count(&[20.0, 20.0, 60.0], &c, 1000.0, 16.0);
            assert_close(&out, &[15.0, 15.0, 54.0, 16.0]);
        }

        #[test]
        fn positional_slots_fund_in_place() {
            let c = constraints(&[100.0, 100.0, 100.0], &[1, 1, 1]);
            let out = fund_new_slots(&[Some(60.0), None, Some(40.0)], &c, 1000.0, 10.0);
            assert_close(&out, &[55.0, 10.0, 35.0]);
            assert!((sum(&out) - 100.0).abs() < 1e-9);
        }

        #[test]
        fn oversized_share_falls_back_to_equal_split() {
            let c = constraints(&[0.0, 0.0, 0.0], &[1, 1, 1]);
            let out = fund_new_slots(&[Some(100.0), None, None], &c, 1000.0, 60.0);
            assert_close(&out, &[100.0 / 3.0, 100.0 / 3.0, 100.0 / 3.0]);
        }
    }

    mod controller {
        use super::*;

        fn layout() -> (Layout, TabRegistry) {
            let groups = vec![
                Group::new(vec![
                    TabDescriptor::new("chat", "a"),
                    TabDescriptor::new("inventory", "b"),
                ])
                .unwrap(),
                Group::single(TabDescriptor::new("account", "c")),
            ];
            (Layout::new(groups, vec![60.0, 40.0]), TabRegistry::default())
        }

        #[test]
        fn drag_then_throttle_then_flush_on_end() {
            let (layout, registry) = layout();
            let mut controller = ResizeController::new(Duration::from_millis(16));
            assert!(controller.start(0, 600.0, &layout, &registry, 1000.0));

            let t0 = Instant::now();
            let first = controller.drag(650.0, t0).unwrap();
            assert_close(&first, &[65.0, 35.0]);

            assert!(controller.drag(700.0, t0 + Duration::from_millis(5)).is_none());
            let flushed = controller.end().unwrap();
            assert_close(&flushed, &[70.0, 30.0]);
            assert!(!controller.is_active());
        }

        #[test]
        fn drag_after_interval_applies_immediately() {
            let (layout, registry) = layout();
            let mut controller = ResizeController::new(Duration::from_millis(16));
            controller.start(0, 600.0, &layout, &registry, 1000.0);

            let t0 = Instant::now();
            controller.drag(610.0, t0).unwrap();
            let later = controller.drag(500.0, t0 + Duration::from_millis(20)).unwrap();
            assert_close(&later, &[50.0, 50.0]);
            assert!(controller.end().is_none());
        }

        #[test]
        fn clamps_at_minimums() {
            let (layout, registry) = layout();
            let mut controller = ResizeController::new(Duration::ZERO);
            controller.start(0, 600.0, &layout, &registry, 1000.0);

            // account minimum is 200px
            let grown = controller.drag(2000.0, Instant::now()).unwrap();
            assert_close(&grown, &[80.0, 20.0]);

            // chat (active in group 0) minimum is 320px
            let shrunk = controller.drag(-2000.0, Instant::now()).unwrap();
            assert_close(&shrunk, &[32.0, 68.0]);
        }

        #[test]
        fn missing_divider_does_not_start() {
            let (layout, registry) = layout();
            let mut controller = ResizeController::new(Duration::ZERO);
            assert!(!controller.start(1, 0.0, &layout, &registry, 1000.0));
            assert!(controller.drag(10.0, Instant::now()).is_none());
        }

        #[test]
        fn cancel_drops_pending_delta() {
            let (layout, registry) = layout();
            let mut controller = ResizeController::new(Duration::from_secs(1));
            controller.start(0, 600.0, &layout, &registry, 1000.0);
            let t0 = Instant::now();
            controller.drag(610.0, t0);
            controller.drag(640.0, t0);
            controller.cancel();
            assert!(controller.end().is_none());
        }
    }
}

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::geometry::ContainerGeometry;
use super::store::SplitTarget;
use crate::common::config::DragSettings;
use crate::sys::geometry::{Point, Rect, RectExt};

/// Where releasing now would open a new group, relative to the group under
/// the pointer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropIndicator {
    BetweenGroupsLeft(usize),
    BetweenGroupsRight(usize),
    LeftGroup(usize),
    RightGroup(usize),
}

impl DropIndicator {
    pub fn group(self) -> usize {
        match self {
            DropIndicator::BetweenGroupsLeft(g)
            | DropIndicator::BetweenGroupsRight(g)
            | DropIndicator::LeftGroup(g)
            | DropIndicator::RightGroup(g) => g,
        }
    }

    pub fn split_target(self) -> SplitTarget {
        match self {
            DropIndicator::BetweenGroupsLeft(g) => SplitTarget::Index(g),
            DropIndicator::BetweenGroupsRight(g) => SplitTarget::Index(g + 1),
            DropIndicator::LeftGroup(_) => SplitTarget::Prepend,
            DropIndicator::RightGroup(_) => SplitTarget::Append,
        }
    }
}

/// Field-per-indicator view for renderers. At most one field is set.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorState {
    pub left_group: Option<usize>,
    pub right_group: Option<usize>,
    pub between_groups_left: Option<usize>,
    pub between_groups_right: Option<usize>,
}

impl From<Option<DropIndicator>> for IndicatorState {
    fn from(indicator: Option<DropIndicator>) -> Self {
        let mut state = IndicatorState::default();
        match indicator {
            Some(DropIndicator::LeftGroup(g)) => state.left_group = Some(g),
            Some(DropIndicator::RightGroup(g)) => state.right_group = Some(g),
            Some(DropIndicator::BetweenGroupsLeft(g)) => state.between_groups_left = Some(g),
            Some(DropIndicator::BetweenGroupsRight(g)) => state.between_groups_right = Some(g),
            None => {}
        }
        state
    }
}

impl IndicatorState {
    pub fn indicator(&self) -> Option<DropIndicator> {
        self.between_groups_left
            .map(DropIndicator::BetweenGroupsLeft)
            .or(self.between_groups_right.map(DropIndicator::BetweenGroupsRight))
            .or(self.left_group.map(DropIndicator::LeftGroup))
            .or(self.right_group.map(DropIndicator::RightGroup))
    }

    pub fn is_empty(&self) -> bool { self.indicator().is_none() }
}

/// Indicator for a pointer over `group`, before debouncing. Nothing fires
/// over the header strip.
pub fn raw_indicator(
    point: Point,
    group: usize,
    group_count: usize,
    group_rect: Rect,
    header_rect: Option<Rect>,
    settings: &DragSettings,
) -> Option<DropIndicator> {
    if header_rect.is_some_and(|header| header.contains(point)) {
        return None;
    }

    let threshold = settings.edge_threshold(group_rect.size.width);
    let near_left = point.x - group_rect.left() <= threshold;
    let near_right = group_rect.right() - point.x <= threshold;
    let first = group == 0;
    let last = group + 1 == group_count;

    if near_left && !first {
        Some(DropIndicator::BetweenGroupsLeft(group))
    } else if near_right && !last {
        Some(DropIndicator::BetweenGroupsRight(group))
    } else if near_left && first {
        Some(DropIndicator::LeftGroup(group))
    } else if near_right && last {
        Some(DropIndicator::RightGroup(group))
    } else {
        None
    }
}

/// Computes indicators from pointer geometry and only lets a change through
/// once it has held still for the debounce interval.
#[derive(Debug, Clone)]
pub struct DropIndicatorEngine {
    settings: DragSettings,
    committed: Option<DropIndicator>,
    pending: Option<(Option<DropIndicator>, Instant)>,
}

impl Default for DropIndicatorEngine {
    fn default() -> Self { Self::new(DragSettings::default()) }
}

impl DropIndicatorEngine {
    pub fn new(settings: DragSettings) -> Self {
        Self {
            settings,
            committed: None,
            pending: None,
        }
    }

    pub fn current(&self) -> Option<DropIndicator> { self.committed }

    pub fn state(&self) -> IndicatorState { self.committed.into() }

    pub fn evaluate(
        &mut self,
        point: Point,
        geometry: &impl ContainerGeometry,
        now: Instant,
    ) -> Option<DropIndicator> {
        let raw = geometry.group_at(point).and_then(|group| {
            let rect = geometry.group_rect(group)?;
            raw_indicator(
                point,
                group,
                geometry.group_count(),
                rect,
                geometry.header_rect(group),
                &self.settings,
            )
        });
        self.update(raw, now)
    }

    /// Feeds one raw observation; returns the indicator currently in effect.
    pub fn update(&mut self, raw: Option<DropIndicator>, now: Instant) -> Option<DropIndicator> {
        if raw == self.committed {
            self.pending = None;
            return self.committed;
        }
        match self.pending {
            Some((candidate, _)) if candidate == raw => {}
            _ => self.pending = Some((raw, now)),
        }
        self.poll(now)
    }

    /// Commits a pending change that has been stable long enough.
    pub fn poll(&mut self, now: Instant) -> Option<DropIndicator> {
        if let Some((candidate, since)) = self.pending
            && now.saturating_duration_since(since) >= self.debounce()
        {
            trace!(from = ?self.committed, to = ?candidate, "indicator changed");
            self.committed = candidate;
            self.pending = None;
        }
        self.committed
    }

    pub fn reset(&mut self) {
        self.committed = None;
        self.pending = None;
    }

    fn debounce(&self) -> Duration { self.settings.indicator_debounce() }
}

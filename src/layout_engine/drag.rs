//! Tab drag gestures: from pointer-down on a handle to the single store
//! operation a release resolves to.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, trace};

use super::drop_indicator::{DropIndicator, DropIndicatorEngine, IndicatorState};
use super::geometry::ContainerGeometry;
use super::store::{LayoutStore, SplitTarget};
use crate::common::config::DragSettings;
use crate::model::{Layout, TabDescriptor};
use crate::sys::geometry::{Point, Rect};

/// The live drag. Owned by [`DragController`]; there is never more than one.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub dragged_tab: TabDescriptor,
    pub source_group_index: usize,
    pub source_index: usize,
    pub target_group_index: Option<usize>,
    pub current_drop_index: Option<usize>,
    pub indicators: IndicatorState,
    source_tab_rects: Vec<Rect>,
}

impl DragSession {
    pub fn source_tab_rects(&self) -> &[Rect] { &self.source_tab_rects }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DropAction {
    Split {
        source: usize,
        tab: TabDescriptor,
        position: SplitTarget,
    },
    MoveBetweenGroups {
        source: usize,
        tab: TabDescriptor,
        target: usize,
        index: usize,
    },
    MoveWithinGroup {
        group: usize,
        from: usize,
        to: usize,
    },
    Cancelled,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DropOutcome {
    pub action: DropAction,
    /// False when the store rejected the action or it changed nothing.
    pub applied: bool,
}

#[derive(Debug, Clone, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    indicators: DropIndicatorEngine,
}

impl Default for DragController {
    fn default() -> Self { Self::new(DragSettings::default()) }
}

impl DragController {
    pub fn new(settings: DragSettings) -> Self {
        Self {
            state: DragState::Idle,
            indicators: DropIndicatorEngine::new(settings),
        }
    }

    pub fn is_dragging(&self) -> bool { matches!(self.state, DragState::Dragging(_)) }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    /// Starts dragging the tab at `index` of `group`. Returns false when that
    /// tab does not exist.
    pub fn start(
        &mut self,
        layout: &Layout,
        group: usize,
        index: usize,
        geometry: &impl ContainerGeometry,
    ) -> bool {
        let Some(tab) = layout.group(group).and_then(|g| g.tabs().get(index)) else {
            debug!(group, index, "ignoring drag of missing tab");
            return false;
        };
        if self.is_dragging() {
            debug!("replacing drag session that never ended");
        }
        self.indicators.reset();
        self.state = DragState::Dragging(DragSession {
            dragged_tab: tab.clone(),
            source_group_index: group,
            source_index: index,
            target_group_index: Some(group),
            current_drop_index: Some(index),
            indicators: IndicatorState::default(),
            source_tab_rects: geometry.tab_rects(group),
        });
        debug!(%tab, group, index, "drag started");
        true
    }

    /// Pointer moved. Indicators go through the debounce; the drop index
    /// does not.
    pub fn update(
        &mut self,
        point: Point,
        geometry: &impl ContainerGeometry,
        now: Instant,
    ) -> Option<&DragSession> {
        let DragState::Dragging(session) = &mut self.state else {
            return None;
        };

        let indicator = self.indicators.evaluate(point, geometry, now);
        let target = geometry.group_at(point);
        session.target_group_index = target;
        session.indicators = indicator.into();
        session.current_drop_index = target.map(|group| {
            if group == session.source_group_index {
                drop_index_among(&session.source_tab_rects, Some(session.source_index), point.x)
            } else {
                drop_index_among(&geometry.tab_rects(group), None, point.x)
            }
        });
        trace!(?target, drop_index = ?session.current_drop_index, ?indicator, "drag moved");
        Some(session)
    }

    /// Pointer released: plans the drop from the last known state, applies it
    /// to `store` and ends the drag.
    pub fn resolve(&mut self, store: &mut LayoutStore, now: Instant) -> Option<DropOutcome> {
        let indicator = self.indicators.poll(now);
        let DragState::Dragging(mut session) = std::mem::take(&mut self.state) else {
            return None;
        };
        session.indicators = indicator.into();
        self.end();

        let action = plan_drop(&session, indicator);
        let applied = match &action {
            DropAction::Split { source, tab, position } => store.split(*source, tab, *position),
            DropAction::MoveBetweenGroups { source, tab, target, index } => {
                store.move_between_groups(*source, tab, *target, *index)
            }
            DropAction::MoveWithinGroup { group, from, to } => {
                store.move_within_group(*group, *from, *to)
            }
            DropAction::Cancelled => false,
        };
        debug!(?action, applied, "drop resolved");
        Some(DropOutcome { action, applied })
    }

    /// Clears the session and indicators. Safe to call when idle.
    pub fn end(&mut self) {
        if self.is_dragging() {
            trace!("drag ended");
        }
        self.state = DragState::Idle;
        self.indicators.reset();
    }
}

/// Decides the single store operation a release performs.
pub fn plan_drop(session: &DragSession, indicator: Option<DropIndicator>) -> DropAction {
    let source = session.source_group_index;
    let tab = session.dragged_tab.clone();

    if let Some(indicator) = indicator {
        return DropAction::Split {
            source,
            tab,
            position: indicator.split_target(),
        };
    }

    match (session.target_group_index, session.current_drop_index) {
        (Some(target), index) if target != source => DropAction::MoveBetweenGroups {
            source,
            tab,
            target,
            index: index.unwrap_or(0),
        },
        (Some(_), Some(to)) if to != session.source_index => DropAction::MoveWithinGroup {
            group: source,
            from: session.source_index,
            to,
        },
        _ => DropAction::Cancelled,
    }
}

/// Number of tab centers left of `x`, skipping `exclude`. The result is an
/// insert position in the group with the excluded tab already removed.
fn drop_index_among(rects: &[Rect], exclude: Option<usize>, x: f64) -> usize {
    rects
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != exclude)
        .filter(|(_, rect)| rect.mid().x < x)
        .count()
}

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::drag::{DragController, DragSession, DropOutcome};
use super::drop_indicator::IndicatorState;
use super::geometry::{ContainerGeometry, LayoutGeometry};
use super::resize::{ResizeController, ResizeSession};
use super::store::{LayoutStore, SplitTarget};
use crate::common::config::{Config, GeometrySettings};
use crate::model::{Layout, TabDescriptor};
use crate::persistence::LayoutPersistence;
use crate::registry::TabRegistry;
use crate::sys::geometry::{Point, Rect};

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    SelectTab {
        group: usize,
        index: usize,
    },
    OpenTab {
        #[serde(rename = "type")]
        type_id: String,
        group: usize,
    },
    AddGroup {
        #[serde(rename = "type")]
        type_id: String,
        position: SplitTarget,
    },
    CloseTab {
        group: usize,
        index: usize,
    },
    MoveTab {
        group: usize,
        from: usize,
        to: usize,
    },
    MoveToGroup {
        source: usize,
        tab: TabDescriptor,
        target: usize,
        index: usize,
    },
    SplitTab {
        source: usize,
        tab: TabDescriptor,
        position: SplitTarget,
    },
    ResizeDivider {
        divider: usize,
        delta_px: f64,
    },
    ResetLayout,
    Rebalance,
}

/// Gesture input. Times are passed in so debouncing and throttling stay
/// deterministic.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    TabPointerDown { group: usize, index: usize },
    DividerPointerDown { divider: usize, x: f64 },
    PointerMove { point: Point, at: Instant },
    /// Global release; ends whatever gesture is live.
    PointerUp { at: Instant },
    PointerCancel,
    ContainerResized { width_px: f64 },
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    pub layout_changed: bool,
    pub indicators: IndicatorState,
    pub drop_index: Option<usize>,
    pub drop: Option<DropOutcome>,
}

impl EventResponse {
    fn changed(layout_changed: bool) -> Self {
        Self {
            layout_changed,
            ..Default::default()
        }
    }
}

pub struct LayoutEngine {
    store: LayoutStore,
    drag: DragController,
    resize: ResizeController,
    persistence: LayoutPersistence,
    geometry_settings: GeometrySettings,
}

impl LayoutEngine {
    /// Loads the stored layout (or the default) and fits it to the configured
    /// container width.
    pub fn new(config: &Config, persistence: LayoutPersistence) -> Self {
        let settings = &config.settings;
        let registry = TabRegistry::from_config(config);
        let width = settings.geometry.container_width_px;
        let layout = persistence.load(&registry, width, &settings.resize);
        let store = LayoutStore::new(layout, registry, width).with_settings(&settings.resize);

        let mut engine = Self {
            store,
            drag: DragController::new(settings.drag.clone()),
            resize: ResizeController::new(settings.resize.throttle()),
            persistence,
            geometry_settings: settings.geometry.clone(),
        };
        if engine.store.set_container_width(width) {
            engine.persist();
        }
        engine
    }

    pub fn layout(&self) -> &Layout { self.store.layout() }

    pub fn store(&self) -> &LayoutStore { &self.store }

    pub fn registry(&self) -> &TabRegistry { self.store.registry() }

    pub fn persistence(&self) -> &LayoutPersistence { &self.persistence }

    pub fn drag_session(&self) -> Option<&DragSession> { self.drag.session() }

    pub fn resize_session(&self) -> Option<&ResizeSession> { self.resize.session() }

    /// Geometry for the current layout at the current container width.
    pub fn computed_geometry(&self) -> LayoutGeometry {
        let g = &self.geometry_settings;
        LayoutGeometry::compute(
            self.store.layout(),
            Rect::new(0.0, 0.0, self.store.container_width_px(), g.container_height_px),
            g.header_height_px,
            g.tab_width_px,
        )
    }

    pub fn handle_event(&mut self, event: LayoutEvent, geometry: &impl ContainerGeometry) -> EventResponse {
        debug!(?event);
        match event {
            LayoutEvent::TabPointerDown { group, index } => {
                if self.resize.is_active() {
                    debug!("ignoring tab drag while resizing");
                } else {
                    self.drag.start(self.store.layout(), group, index, geometry);
                }
            }
            LayoutEvent::DividerPointerDown { divider, x } => {
                if self.drag.is_dragging() {
                    debug!("ignoring divider drag while dragging a tab");
                } else {
                    self.resize.start(
                        divider,
                        x,
                        self.store.layout(),
                        self.store.registry(),
                        geometry.container_width(),
                    );
                }
            }
            LayoutEvent::PointerMove { point, at } => {
                if self.resize.is_active() {
                    let changed = self.resize.drag(point.x, at).is_some_and(|w| self.store.set_widths(w));
                    return self.after_mutation(changed);
                }
                if let Some(session) = self.drag.update(point, geometry, at) {
                    return EventResponse {
                        indicators: session.indicators,
                        drop_index: session.current_drop_index,
                        ..Default::default()
                    };
                }
            }
            LayoutEvent::PointerUp { at } => {
                let resized = self.resize.end().is_some_and(|w| self.store.set_widths(w));
                let drop = self.drag.resolve(&mut self.store, at);
                let dropped = drop.as_ref().is_some_and(|d| d.applied);
                let mut response = self.after_mutation(resized || dropped);
                response.drop = drop;
                return response;
            }
            LayoutEvent::PointerCancel => {
                self.drag.end();
                self.resize.cancel();
            }
            LayoutEvent::ContainerResized { width_px } => {
                let changed = self.store.set_container_width(width_px);
                return self.after_mutation(changed);
            }
        }
        EventResponse::default()
    }

    pub fn handle_command(&mut self, command: LayoutCommand) -> EventResponse {
        debug!(?command);
        // a reset also overwrites a stored blob that failed to load
        let always_save = matches!(command, LayoutCommand::ResetLayout);
        let store = &mut self.store;
        let changed = match command {
            LayoutCommand::SelectTab { group, index } => store.set_active_tab(group, index),
            LayoutCommand::OpenTab { type_id, group } => store.open_tab(&type_id, group),
            LayoutCommand::AddGroup { type_id, position } => store.add_group(&type_id, position),
            LayoutCommand::CloseTab { group, index } => store.close_tab(group, index),
            LayoutCommand::MoveTab { group, from, to } => store.move_within_group(group, from, to),
            LayoutCommand::MoveToGroup { source, tab, target, index } => {
                store.move_between_groups(source, &tab, target, index)
            }
            LayoutCommand::SplitTab { source, tab, position } => store.split(source, &tab, position),
            LayoutCommand::ResizeDivider { divider, delta_px } => {
                let width = store.container_width_px();
                store.resize_divider(divider, delta_px, width)
            }
            LayoutCommand::ResetLayout => store.reset(),
            LayoutCommand::Rebalance => store.rebalance(),
        };
        if always_save && !changed {
            self.persist();
        }
        self.after_mutation(changed)
    }

    pub fn draw_tree(&self) -> String {
        render_tree(self.store.layout(), self.store.registry(), self.store.container_width_px())
    }

    fn after_mutation(&mut self, changed: bool) -> EventResponse {
        if changed {
            self.persist();
            debug!("Tree\n{}", self.draw_tree().trim());
        }
        EventResponse::changed(changed)
    }

    fn persist(&mut self) {
        match self.persistence.save(self.store.layout()) {
            Ok(()) => debug!(key = self.persistence.key(), "layout saved"),
            Err(err) => warn!("failed to save layout: {err:#}"),
        }
    }
}

/// ASCII view of `layout`. Groups holding a tab type the registry does not
/// know are left out.
fn render_tree(layout: &Layout, registry: &TabRegistry, container: f64) -> String {
    let children = layout
        .groups()
        .iter()
        .zip(layout.widths())
        .enumerate()
        .filter(|(index, (group, _))| {
            let known = group.tabs().iter().all(|tab| registry.contains(&tab.type_id));
            if !known {
                warn!(group = *index, "skipping group with an unregistered tab type");
            }
            known
        })
        .map(|(index, (group, pct))| {
            let width_px = container * pct / 100.0;
            let tabs = group
                .tabs()
                .iter()
                .enumerate()
                .filter_map(|(i, tab)| {
                    let line = if i == group.active_index() {
                        format!("☒ {}", registry.render(tab, width_px)?)
                    } else {
                        format!("☐ {tab}")
                    };
                    Some(ascii_tree::Tree::Leaf(vec![line]))
                })
                .collect();
            ascii_tree::Tree::Node(format!("group {index} {pct:.2}% {width_px:.0}px"), tabs)
        })
        .collect();
    let tree = ascii_tree::Tree::Node(format!("layout {container:.0}px"), children);
    let mut out = String::new();
    if let Err(err) = ascii_tree::write_tree(&mut out, &tree) {
        warn!(%err, "failed to draw layout tree");
    }
    out
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::Group;

    #[test]
    fn unregistered_groups_are_not_rendered() {
        let layout = Layout::new(
            vec![
                Group::single(TabDescriptor::new("chat", "c")),
                Group::new(vec![
                    TabDescriptor::new("account", "a"),
                    TabDescriptor::new("ghost", "g"),
                ])
                .unwrap(),
                Group::single(TabDescriptor::new("history", "h")),
            ],
            vec![40.0, 30.0, 30.0],
        );
        let tree = render_tree(&layout, &TabRegistry::default(), 1000.0);
        assert!(tree.contains("group 0 40.00% 400px"), "{tree}");
        assert!(tree.contains("☒ Chat [c] 400px"), "{tree}");
        assert!(!tree.contains("group 1"), "{tree}");
        assert!(!tree.contains("ghost"), "{tree}");
        assert!(tree.contains("group 2 30.00% 300px"), "{tree}");
    }
}

//! Gesture traces: one JSON object per line, each stamped with a millisecond
//! offset from the start of the trace.
//!
//! ```text
//! {"at_ms":0,"kind":"tab_down","group":0,"index":1}
//! {"at_ms":20,"kind":"move","x":900.0,"y":300.0}
//! {"at_ms":90,"kind":"up"}
//! ```

use std::io::BufRead;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::{LayoutCommand, LayoutEngine, LayoutEvent};
use crate::sys::geometry::Point;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Gesture {
    TabDown { group: usize, index: usize },
    DividerDown { divider: usize, x: f64 },
    Move { x: f64, y: f64 },
    Up,
    Cancel,
    Resize { width_px: f64 },
    Command { command: LayoutCommand },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TraceLine {
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub gesture: Gesture,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub lines: usize,
    pub mutations: usize,
}

/// Feeds every line of `trace` to `engine`, computing geometry from the
/// engine's own layout before each step. Blank lines and `#` comments are
/// skipped.
pub fn replay(engine: &mut LayoutEngine, trace: impl BufRead) -> anyhow::Result<ReplaySummary> {
    let start = Instant::now();
    let mut summary = ReplaySummary::default();

    for (number, line) in trace.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read trace line {}", number + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry: TraceLine = serde_json::from_str(trimmed)
            .with_context(|| format!("bad trace line {}: {trimmed}", number + 1))?;
        let at = start + Duration::from_millis(entry.at_ms);
        let geometry = engine.computed_geometry();

        let response = match entry.gesture {
            Gesture::Command { command } => engine.handle_command(command),
            Gesture::TabDown { group, index } => {
                engine.handle_event(LayoutEvent::TabPointerDown { group, index }, &geometry)
            }
            Gesture::DividerDown { divider, x } => {
                engine.handle_event(LayoutEvent::DividerPointerDown { divider, x }, &geometry)
            }
            Gesture::Move { x, y } => engine.handle_event(
                LayoutEvent::PointerMove { point: Point::new(x, y), at },
                &geometry,
            ),
            Gesture::Up => engine.handle_event(LayoutEvent::PointerUp { at }, &geometry),
            Gesture::Cancel => engine.handle_event(LayoutEvent::PointerCancel, &geometry),
            Gesture::Resize { width_px } => {
                engine.handle_event(LayoutEvent::ContainerResized { width_px }, &geometry)
            }
        };

        summary.lines += 1;
        if response.layout_changed {
            summary.mutations += 1;
        }
        debug!(line = number + 1, changed = response.layout_changed, "replayed");
    }

    Ok(summary)
}

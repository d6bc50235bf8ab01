pub mod drag;
pub mod drop_indicator;
pub mod engine;
pub mod geometry;
pub mod replay;
pub mod resize;
pub mod store;

pub use drag::{DragController, DragSession, DropAction, DropOutcome};
pub use drop_indicator::{DropIndicator, DropIndicatorEngine, IndicatorState};
pub use engine::{EventResponse, LayoutCommand, LayoutEngine, LayoutEvent};
pub use geometry::{ContainerGeometry, LayoutGeometry};
pub use resize::{ResizeController, ResizeSession};
pub use store::{LayoutStore, SplitTarget, StoreError};

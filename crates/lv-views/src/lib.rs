//! Linked views: coordinated scatterplot and parallel-coordinates engines
//!
//! Each view is a [`RenderEngine`] hosted by a [`ViewContainer`]. Containers
//! turn the engine's events into selection updates on the shared
//! [`lv_core::SelectionBroker`] and turn broadcasts back into highlight passes.

mod container;
mod engine;
pub mod plots;
pub mod scale;
mod viewport;

pub use container::{LifecycleStats, ViewContainer, ViewProps};
pub use engine::{Lifecycle, Margin, PointerEvent, RenderEngine, ViewError};
pub use plots::{
    AxisRange, ParallelCoordinatesConfig, ParallelCoordinatesEngine, ScatterplotConfig, ScatterplotEngine,
};
pub use scale::{build_axis, AttributeDescriptor, AttributeKind, Axis, LinearScale, Orientation, PointScale, Scale};
pub use viewport::Viewport;

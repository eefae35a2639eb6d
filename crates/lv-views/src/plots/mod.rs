//! Render engine implementations

pub mod parallel_coordinates;
pub mod scatter;

// Utilities
pub mod utils;

// Re-exports
pub use parallel_coordinates::{AxisRange, ParallelCoordinatesConfig, ParallelCoordinatesEngine};
pub use scatter::{ScatterplotConfig, ScatterplotEngine};

//! Emphasis palette shared by the linked views

use egui::{Color32, Stroke};

/// Default mark colour
pub const MARK_BLUE: Color32 = Color32::from_rgb(0x1f, 0x77, 0xb4);

/// Border and line colour of selected records
pub const SELECTED_RED: Color32 = Color32::from_rgb(0xff, 0x00, 0x00);

/// Axis lines, ticks and titles
pub const AXIS_COLOR: Color32 = Color32::from_gray(60);

/// Parallel-coordinates axis lines and ticks
pub const AXIS_LINE_LIGHT: Color32 = Color32::from_gray(0x99);

/// Parallel-coordinates tick labels
pub const TICK_TEXT: Color32 = Color32::from_gray(0x66);

/// Parallel-coordinates axis titles
pub const AXIS_TITLE: Color32 = Color32::BLACK;

/// Fill of an active brush extent
pub const BRUSH_FILL: Color32 = Color32::from_rgba_premultiplied(60, 60, 60, 60);

/// Outline of an active brush extent
pub fn brush_stroke() -> Stroke {
    Stroke::new(1.0, Color32::WHITE)
}

/// Stroke used for axis lines and ticks
pub fn axis_stroke() -> Stroke {
    Stroke::new(1.0, AXIS_COLOR)
}

//! Rendering abstraction layer
//!
//! This crate provides the retained graphical surface each render engine owns,
//! and the `Renderer` trait used to paint it.

mod painter;
mod surface;

pub use painter::PainterRenderer;
pub use surface::{ease_cubic_in_out, Element, ElementId, ElementKind, Primitive, Style, Surface};

use egui::{Align2, Color32, Pos2, Rect, Stroke};

/// Trait for renderers
pub trait Renderer {
    /// Begin a new frame
    fn begin_frame(&mut self);

    /// End the current frame
    fn end_frame(&mut self);

    /// Draw an open polyline
    fn draw_polyline(&mut self, points: &[Pos2], stroke: Stroke);

    /// Draw a circle
    fn draw_circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke);

    /// Draw a rectangle
    fn draw_rect(&mut self, rect: Rect, fill: Color32, stroke: Stroke);

    /// Draw text
    fn draw_text(&mut self, text: &str, position: Pos2, anchor: Align2, color: Color32, size: f32);
}

//! `Renderer` backed by an egui painter

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2};

use crate::Renderer;

/// Paints surface elements through an `egui::Painter`
pub struct PainterRenderer<'a> {
    painter: &'a Painter,
    /// Screen position of the surface's top-left corner
    offset: Vec2,
    shapes: usize,
}

impl<'a> PainterRenderer<'a> {
    pub fn new(painter: &'a Painter, screen_origin: Pos2) -> Self {
        Self {
            painter,
            offset: screen_origin.to_vec2(),
            shapes: 0,
        }
    }

    /// Shapes added during the last frame
    pub fn shape_count(&self) -> usize {
        self.shapes
    }
}

impl Renderer for PainterRenderer<'_> {
    fn begin_frame(&mut self) {
        self.shapes = 0;
    }

    fn end_frame(&mut self) {
        tracing::trace!("Painted {} shapes", self.shapes);
    }

    fn draw_polyline(&mut self, points: &[Pos2], stroke: Stroke) {
        if points.len() < 2 {
            return;
        }
        let points = points.iter().map(|p| *p + self.offset).collect();
        self.painter.add(Shape::line(points, stroke));
        self.shapes += 1;
    }

    fn draw_circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.painter.circle(center + self.offset, radius, fill, stroke);
        self.shapes += 1;
    }

    fn draw_rect(&mut self, rect: Rect, fill: Color32, stroke: Stroke) {
        self.painter.rect(rect.translate(self.offset), 0.0, fill, stroke);
        self.shapes += 1;
    }

    fn draw_text(&mut self, text: &str, position: Pos2, anchor: Align2, color: Color32, size: f32) {
        self.painter.text(position + self.offset, anchor, text, FontId::proportional(size), color);
        self.shapes += 1;
    }
}

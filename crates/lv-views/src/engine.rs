//! Render engine contract shared by every linked view

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use lv_core::{Dataset, EventEmitter, SelectionSet};
use lv_render::Surface;

/// Errors raised by render engines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("{0} used before create()")]
    NotCreated(&'static str),

    #[error("{view} expects {expected} attributes, got {actual}")]
    AttributeCount {
        view: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("No record carries attribute '{0}'")]
    UnknownAttribute(String),
}

/// Where an engine is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Created,
    Rendered,
}

/// Pointer gestures in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Click(Pos2),
    DoubleClick(Pos2),
    Hover(Pos2),
    /// The pointer left the surface
    Leave,
    DragStart(Pos2),
    DragMove(Pos2),
    DragEnd(Pos2),
}

/// Space kept free around the plot area for axes and labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margin {
    pub const fn same(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Offset of the plot area inside the surface
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    /// Plot area left over inside a surface of `size`
    pub fn inner_size(&self, size: Vec2) -> Vec2 {
        Vec2::new(
            (size.x - self.left - self.right).max(0.0),
            (size.y - self.top - self.bottom).max(0.0),
        )
    }
}

/// A view that draws a dataset onto its own surface.
///
/// Lifecycle: `create` once per mount, `render` whenever data or attributes
/// change, `highlight_selected_items` whenever the shared selection changes,
/// `clear` on unmount. Highlighting never rebuilds scales or marks.
pub trait RenderEngine: Send {
    /// Get the view type (for logging and serialization)
    fn view_type(&self) -> &'static str;

    fn lifecycle(&self) -> Lifecycle;

    /// Allocate the surface. Calling it again rebuilds from scratch.
    fn create(&mut self, size: Vec2);

    /// Draw `data` projected on `attributes`, reconciling existing marks
    fn render(&mut self, data: &Dataset, attributes: &[String], emitter: EventEmitter) -> Result<(), ViewError>;

    /// Restyle marks against the shared selection
    fn highlight_selected_items(&mut self, selection: &SelectionSet) -> Result<(), ViewError>;

    /// Feed a pointer gesture; events go to the emitter passed to `render`
    fn handle_pointer(&mut self, event: PointerEvent) -> Result<(), ViewError>;

    /// Advance transitions; returns true while anything still moves
    fn on_frame_update(&mut self, dt: f32) -> bool;

    /// Drop every element and all state. Safe to call in any state.
    fn clear(&mut self);

    /// The engine's surface, once created
    fn surface(&self) -> Option<&Surface>;

    /// Save configuration
    fn save_config(&self) -> Value;

    /// Load configuration
    fn load_config(&mut self, config: Value);

    /// Get as any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;

    /// Get as any mut for downcasting
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_inner_size() {
        let margin = Margin {
            top: 100.0,
            right: 10.0,
            bottom: 50.0,
            left: 100.0,
        };
        assert_eq!(margin.inner_size(Vec2::new(500.0, 450.0)), Vec2::new(390.0, 300.0));
        assert_eq!(margin.inner_size(Vec2::new(50.0, 50.0)), Vec2::ZERO);
        assert_eq!(margin.origin(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_error_messages() {
        let err = ViewError::AttributeCount {
            view: "ScatterplotView",
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.to_string(), "ScatterplotView expects 2 attributes, got 3");
    }
}

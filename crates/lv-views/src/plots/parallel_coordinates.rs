//! Parallel coordinates render engine
//!
//! One vertical axis per attribute and one polyline per record. Each axis
//! carries its own range brush; a record passes the filter only when it lies
//! inside every active brush.

use ahash::{AHashMap, AHashSet};
use egui::{Align2, Pos2, Rect, Stroke, Vec2};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use lv_core::{category_label, Dataset, EventEmitter, Record, RecordId, SelectionSet, Value, ViewEvent};
use lv_render::{ElementId, ElementKind, Primitive, Style, Surface};

use crate::engine::{Lifecycle, Margin, PointerEvent, RenderEngine, ViewError};
use crate::plots::utils::{colors, format_attribute_name};
use crate::scale::{build_axis, Axis, Orientation, PointScale, Scale};

const VIEW_TYPE: &str = "ParallelCoordinatesView";

/// Configuration for parallel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelCoordinatesConfig {
    pub margin: Margin,

    /// Base polyline width
    pub stroke_width: f32,

    /// Opacity right after a render
    pub default_opacity: f32,

    /// Opacity of unselected lines while a selection is shown
    pub unselected_opacity: f32,

    /// Opacity of lines outside a brush preview
    pub preview_dimmed_opacity: f32,

    /// Half width of the area around an axis that starts a brush
    pub brush_half_width: f32,

    pub transition_secs: f32,

    /// Approximate number of ticks per numeric axis
    pub tick_count: usize,

    /// Pixel slack when picking a line under the pointer
    pub hit_tolerance: f32,
}

impl Default for ParallelCoordinatesConfig {
    fn default() -> Self {
        Self {
            margin: Margin::same(50.0),
            stroke_width: 1.5,
            default_opacity: 0.3,
            unselected_opacity: 0.1,
            preview_dimmed_opacity: 0.05,
            brush_half_width: 8.0,
            transition_secs: 1.0,
            tick_count: 5,
            hit_tolerance: 3.0,
        }
    }
}

/// Data-space extent of one axis brush
#[derive(Debug, Clone, PartialEq)]
pub enum AxisRange {
    Numeric { min: f64, max: f64 },
    Categories(IndexSet<String>),
}

impl AxisRange {
    /// Whether a record value passes this brush
    pub fn contains(&self, value: Option<&Value>) -> bool {
        match self {
            AxisRange::Numeric { min, max } => value
                .and_then(Value::as_number)
                .map(|v| v >= *min && v <= *max)
                .unwrap_or(false),
            AxisRange::Categories(labels) => labels.contains(&category_label(value)),
        }
    }

    /// Range covered by the pixel interval `[y0, y1]` on `axis`.
    ///
    /// A categorical drag that covers no value falls back to the first one.
    pub fn from_extent(axis: &Axis, y0: f32, y1: f32) -> Self {
        let (low, high) = (y0.min(y1), y0.max(y1));
        match &axis.scale {
            Scale::Linear(scale) => AxisRange::Numeric {
                min: scale.invert(high),
                max: scale.invert(low),
            },
            Scale::Point(scale) => {
                let mut labels: IndexSet<String> = scale.values_within(low, high).into_iter().collect();
                if labels.is_empty() {
                    if let Some(first) = scale.domain().first() {
                        labels.insert(first.clone());
                    }
                }
                AxisRange::Categories(labels)
            }
        }
    }

    /// What is left of this range on a rebuilt `axis`.
    ///
    /// A range of the wrong kind is dropped; categories missing from the new
    /// domain are discarded, and nothing is left when none remain.
    fn rebased(self, axis: &Axis) -> Option<Self> {
        match (self, &axis.scale) {
            (range @ AxisRange::Numeric { .. }, Scale::Linear(_)) => Some(range),
            (AxisRange::Categories(labels), Scale::Point(scale)) => {
                let labels: IndexSet<String> = labels
                    .into_iter()
                    .filter(|label| scale.domain().contains(label))
                    .collect();
                (!labels.is_empty()).then_some(AxisRange::Categories(labels))
            }
            _ => None,
        }
    }

    /// Pixel interval covered on `axis`, for drawing the band
    fn pixel_extent(&self, axis: &Axis) -> Option<(f32, f32)> {
        match (self, &axis.scale) {
            (AxisRange::Numeric { min, max }, Scale::Linear(scale)) => {
                let (a, b) = (scale.map(*min), scale.map(*max));
                Some((a.min(b), a.max(b)))
            }
            (AxisRange::Categories(labels), Scale::Point(scale)) => labels
                .iter()
                .filter_map(|label| scale.map(label))
                .fold(None, |extent, y| match extent {
                    None => Some((y, y)),
                    Some((lo, hi)) => Some((f32::min(lo, y), f32::max(hi, y))),
                }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Default,
    Selected,
    Unselected,
    PreviewIn,
    PreviewOut,
}

/// Vertical drag on one axis, in plot pixels
#[derive(Debug, Clone)]
struct AxisGesture {
    attribute: String,
    anchor: f32,
    current: f32,
}

struct Projection {
    data: Dataset,
    index: AHashMap<RecordId, usize>,
    emitter: EventEmitter,
}

struct PcpState {
    surface: Surface,
    plot_size: Vec2,
    axes: Vec<Axis>,
    lines: AHashMap<RecordId, ElementId>,
    emphasis: AHashMap<RecordId, Emphasis>,
    selected: AHashSet<RecordId>,
    hovered: Option<RecordId>,
    brushes: IndexMap<String, AxisRange>,
    gesture: Option<AxisGesture>,
    projection: Option<Projection>,
}

/// Parallel coordinates plot
pub struct ParallelCoordinatesEngine {
    pub config: ParallelCoordinatesConfig,
    state: Option<PcpState>,
}

impl ParallelCoordinatesEngine {
    pub fn new() -> Self {
        Self::with_config(ParallelCoordinatesConfig::default())
    }

    pub fn with_config(config: ParallelCoordinatesConfig) -> Self {
        Self { config, state: None }
    }

    /// Axes of the last render, left to right
    pub fn axes(&self) -> &[Axis] {
        self.state.as_ref().map(|s| s.axes.as_slice()).unwrap_or(&[])
    }

    pub fn axis(&self, attribute: &str) -> Option<&Axis> {
        self.axes().iter().find(|axis| axis.name() == attribute)
    }

    /// Surface position of a numeric value on an attribute's axis
    pub fn value_position(&self, attribute: &str, value: f64) -> Option<Pos2> {
        let state = self.state.as_ref()?;
        let axis = self.axis(attribute)?;
        let y = axis.map_number(value)?;
        Some(Pos2::new(axis.position, y) + state.surface.origin())
    }

    /// Surface position of a category on an attribute's axis
    pub fn category_position(&self, attribute: &str, label: &str) -> Option<Pos2> {
        let state = self.state.as_ref()?;
        let axis = self.axis(attribute)?;
        let y = match &axis.scale {
            Scale::Point(scale) => scale.map(label)?,
            Scale::Linear(_) => return None,
        };
        Some(Pos2::new(axis.position, y) + state.surface.origin())
    }

    /// Active brushes in the order they were first drawn
    pub fn brushes(&self) -> Option<&IndexMap<String, AxisRange>> {
        self.state.as_ref().map(|s| &s.brushes)
    }

    /// Records passing every active brush
    pub fn filtered_records(&self) -> Vec<Record> {
        self.state
            .as_ref()
            .map(|state| state.filtered_records())
            .unwrap_or_default()
    }

    pub fn line_element(&self, id: RecordId) -> Option<ElementId> {
        self.state.as_ref()?.lines.get(&id).copied()
    }

    pub fn line_count(&self) -> usize {
        self.state.as_ref().map(|s| s.lines.len()).unwrap_or(0)
    }

    pub fn hovered(&self) -> Option<RecordId> {
        self.state.as_ref()?.hovered
    }
}

impl Default for ParallelCoordinatesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PcpState {
    fn filtered_records(&self) -> Vec<Record> {
        let Some(projection) = &self.projection else {
            return Vec::new();
        };
        projection
            .data
            .iter()
            .filter(|record| self.passes_brushes(record))
            .cloned()
            .collect()
    }

    fn passes_brushes(&self, record: &Record) -> bool {
        self.brushes
            .iter()
            .all(|(attribute, range)| range.contains(record.get(attribute)))
    }

    fn polyline(&self, record: &Record) -> Primitive {
        Primitive::Polyline {
            points: self
                .axes
                .iter()
                .filter_map(|axis| axis.project(record).map(|y| Pos2::new(axis.position, y)))
                .collect(),
        }
    }

    fn apply_style(&mut self, config: &ParallelCoordinatesConfig, id: RecordId) {
        let Some(&element) = self.lines.get(&id) else {
            return;
        };
        let emphasis = self.emphasis.get(&id).copied().unwrap_or(Emphasis::Default);
        let style = line_style(config, emphasis, self.selected.contains(&id), self.hovered == Some(id));
        self.surface.set_style(element, style);
    }

    fn restyle_all(&mut self, config: &ParallelCoordinatesConfig) {
        let ids: Vec<RecordId> = self.lines.keys().copied().collect();
        for id in ids {
            self.apply_style(config, id);
        }
    }

    fn set_hover(&mut self, config: &ParallelCoordinatesConfig, id: Option<RecordId>) {
        if self.hovered == id {
            return;
        }
        let previous = std::mem::replace(&mut self.hovered, id);
        for id in previous.into_iter().chain(id) {
            self.apply_style(config, id);
        }
    }

    fn preview(&mut self, config: &ParallelCoordinatesConfig) {
        let inside: AHashSet<RecordId> = self.filtered_records().iter().map(Record::id).collect();
        for id in self.lines.keys() {
            let emphasis = if inside.contains(id) {
                Emphasis::PreviewIn
            } else {
                Emphasis::PreviewOut
            };
            self.emphasis.insert(*id, emphasis);
        }
        self.restyle_all(config);
    }

    fn record_under(&self, position: Pos2, config: &ParallelCoordinatesConfig) -> Option<RecordId> {
        let point = self.surface.to_plot(position);
        self.surface
            .hit_test(ElementKind::Mark, point, config.hit_tolerance)
            .and_then(|element| element.key())
    }

    fn activate(&self, position: Pos2, config: &ParallelCoordinatesConfig, make: fn(Record) -> ViewEvent) {
        let Some(projection) = &self.projection else {
            return;
        };
        let record = self
            .record_under(position, config)
            .and_then(|id| projection.index.get(&id))
            .map(|&i| &projection.data.records()[i]);

        if let Some(record) = record {
            projection.emitter.emit(make(record.clone()));
        }
    }

    fn axis_at(&self, point: Pos2, config: &ParallelCoordinatesConfig) -> Option<&Axis> {
        if point.y < 0.0 || point.y > self.plot_size.y {
            return None;
        }
        self.axes
            .iter()
            .find(|axis| (point.x - axis.position).abs() <= config.brush_half_width)
    }

    fn brush_start(&mut self, position: Pos2, config: &ParallelCoordinatesConfig) {
        if self.projection.is_none() {
            return;
        }
        let point = self.surface.to_plot(position);
        let Some(axis) = self.axis_at(point, config) else {
            return;
        };
        self.gesture = Some(AxisGesture {
            attribute: axis.name().to_string(),
            anchor: point.y,
            current: point.y,
        });
    }

    /// Update the gesture; returns the range it now covers, if any
    fn brush_update(&mut self, position: Pos2) -> Option<(String, Option<AxisRange>)> {
        let y = self.surface.to_plot(position).y.clamp(0.0, self.plot_size.y);
        let gesture = self.gesture.as_mut()?;
        gesture.current = y;
        let (attribute, anchor, current) = (gesture.attribute.clone(), gesture.anchor, gesture.current);

        let axis = self.axes.iter().find(|axis| axis.name() == attribute)?;
        let range = (anchor != current).then(|| AxisRange::from_extent(axis, anchor, current));
        Some((attribute, range))
    }

    fn brush_move(&mut self, position: Pos2, config: &ParallelCoordinatesConfig) {
        let Some((attribute, Some(range))) = self.brush_update(position) else {
            return;
        };
        self.brushes.insert(attribute, range);
        self.draw_brush_bands(config);
        self.preview(config);
    }

    fn brush_end(&mut self, position: Pos2, config: &ParallelCoordinatesConfig) {
        let update = self.brush_update(position);
        self.gesture = None;
        let Some((attribute, range)) = update else {
            return;
        };

        match range {
            Some(range) => {
                self.brushes.insert(attribute, range);
            }
            None => {
                self.brushes.shift_remove(&attribute);
                tracing::debug!("Brush on '{}' removed", attribute);
            }
        }
        self.draw_brush_bands(config);

        let records = self.filtered_records();
        tracing::info!(
            "Parallel coordinates brush committed {} records ({} active brushes)",
            records.len(),
            self.brushes.len()
        );
        if let Some(projection) = &self.projection {
            projection.emitter.emit(ViewEvent::BrushCommitted(records));
        }
    }

    fn draw_axes(&mut self, config: &ParallelCoordinatesConfig) {
        for kind in [ElementKind::Axis, ElementKind::Tick, ElementKind::Label, ElementKind::BrushOverlay] {
            self.surface.remove_kind(kind);
        }

        let line = Style::stroked(Stroke::new(1.0, colors::AXIS_LINE_LIGHT));
        let tick_text = Style::new(colors::TICK_TEXT, Stroke::NONE, 1.0);
        let title = Style::new(colors::AXIS_TITLE, Stroke::NONE, 1.0);
        let height = self.plot_size.y;

        for axis in &self.axes {
            let x = axis.position;
            self.surface.insert(
                ElementKind::Axis,
                Primitive::Segment {
                    from: Pos2::new(x, 0.0),
                    to: Pos2::new(x, height),
                },
                line,
            );

            for tick in axis.ticks(config.tick_count) {
                self.surface.insert(
                    ElementKind::Tick,
                    Primitive::Segment {
                        from: Pos2::new(x - 5.0, tick.offset),
                        to: Pos2::new(x, tick.offset),
                    },
                    line,
                );
                self.surface.insert(
                    ElementKind::Tick,
                    Primitive::Text {
                        position: Pos2::new(x - 10.0, tick.offset),
                        text: tick.label,
                        anchor: Align2::RIGHT_CENTER,
                        size: 11.0,
                    },
                    tick_text,
                );
            }

            self.surface.insert(
                ElementKind::Label,
                Primitive::Text {
                    position: Pos2::new(x, -20.0),
                    text: format_attribute_name(axis.name()),
                    anchor: Align2::CENTER_BOTTOM,
                    size: 12.0,
                },
                title,
            );

            self.surface.insert(
                ElementKind::BrushOverlay,
                Primitive::Rect {
                    rect: Rect::from_min_max(
                        Pos2::new(x - config.brush_half_width, 0.0),
                        Pos2::new(x + config.brush_half_width, height),
                    ),
                },
                Style::hidden(),
            );
        }
    }

    fn draw_brush_bands(&mut self, config: &ParallelCoordinatesConfig) {
        self.surface.remove_kind(ElementKind::BrushSelection);

        let style = Style::new(colors::BRUSH_FILL, colors::brush_stroke(), 1.0);
        for (attribute, range) in &self.brushes {
            let Some(axis) = self.axes.iter().find(|axis| axis.name() == attribute) else {
                continue;
            };
            let Some((top, bottom)) = range.pixel_extent(axis) else {
                continue;
            };

            // Keep single-category bands visible
            let (top, bottom) = if bottom - top < 4.0 {
                (top - 2.0, bottom + 2.0)
            } else {
                (top, bottom)
            };
            let rect = Rect::from_min_max(
                Pos2::new(axis.position - config.brush_half_width, top),
                Pos2::new(axis.position + config.brush_half_width, bottom),
            );
            self.surface.insert(ElementKind::BrushSelection, Primitive::Rect { rect }, style);
        }
    }
}

fn line_style(config: &ParallelCoordinatesConfig, emphasis: Emphasis, selected: bool, hovered: bool) -> Style {
    let width = config.stroke_width;
    let current_color = if selected { colors::SELECTED_RED } else { colors::MARK_BLUE };

    let (color, stroke_width, opacity) = match emphasis {
        Emphasis::Default => (colors::MARK_BLUE, width, config.default_opacity),
        Emphasis::Selected => (colors::SELECTED_RED, width * 2.0, 1.0),
        Emphasis::Unselected => (colors::MARK_BLUE, width, config.unselected_opacity),
        Emphasis::PreviewIn => (current_color, width * 1.5, 1.0),
        Emphasis::PreviewOut => (current_color, width, config.preview_dimmed_opacity),
    };

    if hovered {
        Style::stroked(Stroke::new(width * 2.0, color))
    } else {
        let mut style = Style::stroked(Stroke::new(stroke_width, color));
        style.opacity = opacity;
        style
    }
}

impl RenderEngine for ParallelCoordinatesEngine {
    fn view_type(&self) -> &'static str {
        VIEW_TYPE
    }

    fn lifecycle(&self) -> Lifecycle {
        match &self.state {
            None => Lifecycle::Uninitialized,
            Some(state) if state.projection.is_none() => Lifecycle::Created,
            Some(_) => Lifecycle::Rendered,
        }
    }

    fn create(&mut self, size: Vec2) {
        if self.state.is_some() {
            tracing::warn!("Parallel coordinates created twice; rebuilding its surface");
        }

        let plot_size = self.config.margin.inner_size(size);
        self.state = Some(PcpState {
            surface: Surface::new(size, self.config.margin.origin()),
            plot_size,
            axes: Vec::new(),
            lines: AHashMap::new(),
            emphasis: AHashMap::new(),
            selected: AHashSet::new(),
            hovered: None,
            brushes: IndexMap::new(),
            gesture: None,
            projection: None,
        });
        tracing::debug!("Parallel coordinates created with plot area {:?}", plot_size);
    }

    fn render(&mut self, data: &Dataset, attributes: &[String], emitter: EventEmitter) -> Result<(), ViewError> {
        let config = &self.config;
        let state = self.state.as_mut().ok_or(ViewError::NotCreated(VIEW_TYPE))?;

        if data.is_empty() || attributes.is_empty() {
            tracing::debug!("Parallel coordinates render skipped: nothing to draw");
            return Ok(());
        }
        if let Some(unknown) = attributes
            .iter()
            .find(|attribute| !data.iter().any(|record| record.get(attribute).is_some()))
        {
            return Err(ViewError::UnknownAttribute(unknown.clone()));
        }

        let size = state.plot_size;
        let positions = PointScale::new(attributes.iter().cloned().collect(), (0.0, size.x));
        state.axes = attributes
            .iter()
            .filter_map(|attribute| {
                let x = positions.map(attribute)?;
                build_axis(data, attribute, (0.0, size.y), Orientation::Vertical, x)
            })
            .collect();

        let before = state.brushes.len();
        let axes = &state.axes;
        state.brushes = std::mem::take(&mut state.brushes)
            .into_iter()
            .filter_map(|(attribute, range)| {
                let axis = axes.iter().find(|axis| axis.name() == attribute)?;
                let range = range.rebased(axis)?;
                Some((attribute, range))
            })
            .collect();
        if state.brushes.len() != before {
            tracing::debug!("Dropped {} brushes that no longer fit their axes", before - state.brushes.len());
        }
        state.gesture = None;
        state.hovered = None;
        state.selected.clear();
        state.emphasis.clear();

        state.draw_axes(config);

        let style = line_style(config, Emphasis::Default, false, false);
        let mut seen = AHashSet::with_capacity(data.len());
        for record in data {
            let polyline = state.polyline(record);
            seen.insert(record.id());

            match state.lines.get(&record.id()) {
                Some(&element) => {
                    state.surface.transition_to(element, polyline, config.transition_secs);
                    state.surface.set_style(element, style);
                }
                None => {
                    let element = state.surface.insert_keyed(ElementKind::Mark, record.id(), polyline, style);
                    state.lines.insert(record.id(), element);
                }
            }
        }

        let surface = &mut state.surface;
        state.lines.retain(|id, element| {
            if seen.contains(id) {
                true
            } else {
                surface.remove(*element);
                false
            }
        });

        state.draw_brush_bands(config);

        let kinds: Vec<_> = state.axes.iter().map(|axis| format!("{}:{:?}", axis.name(), axis.kind())).collect();
        tracing::info!(
            "Rendered parallel coordinates: {} lines over [{}]",
            state.lines.len(),
            kinds.join(", ")
        );

        state.projection = Some(Projection {
            data: data.clone(),
            index: data.iter().enumerate().map(|(i, r)| (r.id(), i)).collect(),
            emitter,
        });
        Ok(())
    }

    fn highlight_selected_items(&mut self, selection: &SelectionSet) -> Result<(), ViewError> {
        let state = self.state.as_mut().ok_or(ViewError::NotCreated(VIEW_TYPE))?;

        state.selected = selection.iter().collect();
        let ids: Vec<RecordId> = state.lines.keys().copied().collect();
        for id in ids {
            let emphasis = if state.selected.contains(&id) {
                Emphasis::Selected
            } else {
                Emphasis::Unselected
            };
            state.emphasis.insert(id, emphasis);
        }
        state.restyle_all(&self.config);

        tracing::debug!("Parallel coordinates highlighted {} records", selection.len());
        Ok(())
    }

    fn handle_pointer(&mut self, event: PointerEvent) -> Result<(), ViewError> {
        let config = &self.config;
        let state = self.state.as_mut().ok_or(ViewError::NotCreated(VIEW_TYPE))?;

        match event {
            PointerEvent::Click(position) => state.activate(position, config, ViewEvent::Clicked),
            PointerEvent::DoubleClick(position) => state.activate(position, config, ViewEvent::DoubleClicked),
            PointerEvent::Hover(position) => {
                if state.gesture.is_none() {
                    let id = state.record_under(position, config);
                    state.set_hover(config, id);
                }
            }
            PointerEvent::Leave => state.set_hover(config, None),
            PointerEvent::DragStart(position) => state.brush_start(position, config),
            PointerEvent::DragMove(position) => state.brush_move(position, config),
            PointerEvent::DragEnd(position) => state.brush_end(position, config),
        }
        Ok(())
    }

    fn on_frame_update(&mut self, dt: f32) -> bool {
        self.state
            .as_mut()
            .map(|state| state.surface.advance(dt))
            .unwrap_or(false)
    }

    fn clear(&mut self) {
        if let Some(state) = self.state.take() {
            tracing::debug!(
                "Parallel coordinates cleared ({} elements, {} brushes dropped)",
                state.surface.len(),
                state.brushes.len()
            );
        }
    }

    fn surface(&self) -> Option<&Surface> {
        self.state.as_ref().map(|state| &state.surface)
    }

    fn save_config(&self) -> JsonValue {
        serde_json::to_value(&self.config).unwrap_or(JsonValue::Null)
    }

    fn load_config(&mut self, config: JsonValue) {
        match serde_json::from_value(config) {
            Ok(config) => self.config = config,
            Err(err) => tracing::warn!("Ignoring invalid parallel coordinates config: {}", err),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

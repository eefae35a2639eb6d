//! Scatterplot render engine
//!
//! Two attributes projected as circles, one per record, with a rectangular
//! brush. Marks are keyed by record identity so re-rendering moves them in
//! place instead of rebuilding them.

use ahash::{AHashMap, AHashSet};
use egui::{Align2, Pos2, Rect, Stroke, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lv_core::{Dataset, EventEmitter, Record, RecordId, SelectionSet, ViewEvent};
use lv_render::{ElementId, ElementKind, Primitive, Style, Surface};

use crate::engine::{Lifecycle, Margin, PointerEvent, RenderEngine, ViewError};
use crate::plots::utils::{colors, format_attribute_name};
use crate::scale::{build_axis, Axis, Orientation};

const VIEW_TYPE: &str = "ScatterplotView";

/// Configuration for the scatterplot engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterplotConfig {
    pub margin: Margin,

    /// Circle radius in pixels
    pub radius: f32,

    /// Opacity of marks that are not selected
    pub default_opacity: f32,

    /// Opacity of marks outside a brush preview
    pub dimmed_opacity: f32,

    /// Border width of selected marks
    pub selected_stroke_width: f32,

    /// Seconds a surviving mark takes to reach its new position
    pub transition_secs: f32,

    /// Approximate number of ticks per numeric axis
    pub tick_count: usize,

    /// Pixel slack when picking a mark under the pointer
    pub hit_tolerance: f32,
}

impl Default for ScatterplotConfig {
    fn default() -> Self {
        Self {
            margin: Margin {
                top: 100.0,
                right: 10.0,
                bottom: 50.0,
                left: 100.0,
            },
            radius: 3.0,
            default_opacity: 0.3,
            dimmed_opacity: 0.1,
            selected_stroke_width: 2.0,
            transition_secs: 1.0,
            tick_count: 5,
            hit_tolerance: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Unselected,
    /// Selected, or inside a brush preview
    Selected,
    /// Outside a brush preview
    Dimmed,
}

/// Rectangle being dragged out, in plot coordinates
#[derive(Debug, Clone, Copy)]
struct RectBrush {
    anchor: Pos2,
    current: Pos2,
    element: ElementId,
}

impl RectBrush {
    fn rect(&self) -> Rect {
        Rect::from_two_pos(self.anchor, self.current)
    }
}

/// Everything that exists only after a successful render
struct Projection {
    data: Dataset,
    index: AHashMap<RecordId, usize>,
    x_axis: Axis,
    y_axis: Axis,
    emitter: EventEmitter,
}

struct ScatterState {
    surface: Surface,
    plot_size: Vec2,
    overlay: ElementId,
    marks: AHashMap<RecordId, ElementId>,
    projection: Option<Projection>,
    selected: AHashSet<RecordId>,
    brush: Option<RectBrush>,
}

/// Scatterplot of two attributes
pub struct ScatterplotEngine {
    pub config: ScatterplotConfig,
    state: Option<ScatterState>,
}

impl ScatterplotEngine {
    pub fn new() -> Self {
        Self::with_config(ScatterplotConfig::default())
    }

    pub fn with_config(config: ScatterplotConfig) -> Self {
        Self { config, state: None }
    }

    /// Draw `data` with `x_attribute` across and `y_attribute` up
    pub fn render_scatterplot(
        &mut self,
        data: &Dataset,
        x_attribute: &str,
        y_attribute: &str,
        emitter: EventEmitter,
    ) -> Result<(), ViewError> {
        let config = &self.config;
        let state = self.state.as_mut().ok_or(ViewError::NotCreated(VIEW_TYPE))?;

        if data.is_empty() {
            tracing::debug!("Scatterplot render skipped: empty dataset");
            return Ok(());
        }
        for attribute in [x_attribute, y_attribute] {
            if !data.iter().any(|record| record.get(attribute).is_some()) {
                return Err(ViewError::UnknownAttribute(attribute.to_string()));
            }
        }

        let size = state.plot_size;
        let x_axis = build_axis(data, x_attribute, (0.0, size.x), Orientation::Horizontal, size.y);
        let y_axis = build_axis(data, y_attribute, (0.0, size.y), Orientation::Vertical, 0.0);
        let (Some(x_axis), Some(y_axis)) = (x_axis, y_axis) else {
            return Ok(());
        };

        draw_axes(&mut state.surface, &x_axis, &y_axis, size, config);

        let style = mark_style(config, Emphasis::Unselected);
        let mut seen = AHashSet::with_capacity(data.len());
        let mut entered = 0;

        for record in data {
            let (Some(x), Some(y)) = (x_axis.project(record), y_axis.project(record)) else {
                continue;
            };
            let circle = Primitive::Circle {
                center: Pos2::new(x, y),
                radius: config.radius,
            };
            seen.insert(record.id());

            match state.marks.get(&record.id()) {
                Some(&element) => {
                    state.surface.transition_to(element, circle, config.transition_secs);
                    state.surface.set_style(element, style);
                }
                None => {
                    let element = state.surface.insert_keyed(ElementKind::Mark, record.id(), circle, style);
                    state.marks.insert(record.id(), element);
                    entered += 1;
                }
            }
        }

        let surface = &mut state.surface;
        let before = state.marks.len();
        state.marks.retain(|id, element| {
            if seen.contains(id) {
                true
            } else {
                surface.remove(*element);
                false
            }
        });

        tracing::info!(
            "Rendered scatterplot {} x {}: {} marks ({} entered, {} exited)",
            x_attribute,
            y_attribute,
            state.marks.len(),
            entered,
            before - state.marks.len()
        );

        state.selected.clear();
        state.projection = Some(Projection {
            data: data.clone(),
            index: data.iter().enumerate().map(|(i, r)| (r.id(), i)).collect(),
            x_axis,
            y_axis,
            emitter,
        });
        Ok(())
    }

    pub fn x_axis(&self) -> Option<&Axis> {
        self.projection().map(|p| &p.x_axis)
    }

    pub fn y_axis(&self) -> Option<&Axis> {
        self.projection().map(|p| &p.y_axis)
    }

    /// Surface position of an (x, y) pair of numeric values
    pub fn value_position(&self, x: f64, y: f64) -> Option<Pos2> {
        let state = self.state.as_ref()?;
        let projection = state.projection.as_ref()?;
        let point = Pos2::new(projection.x_axis.map_number(x)?, projection.y_axis.map_number(y)?);
        Some(point + state.surface.origin())
    }

    /// Surface element drawing `id`
    pub fn mark_element(&self, id: RecordId) -> Option<ElementId> {
        self.state.as_ref()?.marks.get(&id).copied()
    }

    pub fn mark_count(&self) -> usize {
        self.state.as_ref().map(|s| s.marks.len()).unwrap_or(0)
    }

    /// Current brush rectangle in plot coordinates, while dragging
    pub fn brush_rect(&self) -> Option<Rect> {
        self.state.as_ref()?.brush.map(|b| b.rect())
    }

    /// Records whose mark centre lies inside `rect` (plot coordinates)
    pub fn records_in_rect(&self, rect: Rect) -> Vec<Record> {
        self.state
            .as_ref()
            .map(|state| state.records_in_rect(rect))
            .unwrap_or_default()
    }

    fn projection(&self) -> Option<&Projection> {
        self.state.as_ref()?.projection.as_ref()
    }
}

impl Default for ScatterplotEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScatterState {
    fn clamp_to_plot(&self, point: Pos2) -> Pos2 {
        Pos2::new(
            point.x.clamp(0.0, self.plot_size.x),
            point.y.clamp(0.0, self.plot_size.y),
        )
    }

    fn overlay_contains(&self, point: Pos2) -> bool {
        match self.surface.get(self.overlay).map(|e| e.primitive()) {
            Some(Primitive::Rect { rect }) => rect.contains(point),
            _ => false,
        }
    }

    fn records_in_rect(&self, rect: Rect) -> Vec<Record> {
        let Some(projection) = &self.projection else {
            return Vec::new();
        };

        projection
            .data
            .iter()
            .filter(|record| match (projection.x_axis.project(record), projection.y_axis.project(record)) {
                (Some(x), Some(y)) => rect.contains(Pos2::new(x, y)),
                _ => false,
            })
            .cloned()
            .collect()
    }

    fn restyle(&mut self, config: &ScatterplotConfig, emphasis: impl Fn(RecordId) -> Emphasis) {
        for (id, element) in &self.marks {
            self.surface.set_style(*element, mark_style(config, emphasis(*id)));
        }
    }

    fn apply_selection(&mut self, config: &ScatterplotConfig) {
        let selected = std::mem::take(&mut self.selected);
        self.restyle(config, |id| {
            if selected.contains(&id) {
                Emphasis::Selected
            } else {
                Emphasis::Unselected
            }
        });
        self.selected = selected;
    }

    /// Emit `make(record)` for the mark under `position`, if any
    fn activate(&self, position: Pos2, config: &ScatterplotConfig, make: fn(Record) -> ViewEvent) {
        let Some(projection) = &self.projection else {
            return;
        };
        let point = self.surface.to_plot(position);
        let record = self
            .surface
            .hit_test(ElementKind::Mark, point, config.hit_tolerance)
            .and_then(|element| element.key())
            .and_then(|id| projection.index.get(&id))
            .map(|&i| &projection.data.records()[i]);

        if let Some(record) = record {
            projection.emitter.emit(make(record.clone()));
        }
    }

    fn brush_start(&mut self, position: Pos2, config: &ScatterplotConfig) {
        if self.projection.is_none() {
            return;
        }
        let point = self.surface.to_plot(position);

        // Marks sit above the overlay and take the press themselves
        if !self.overlay_contains(point)
            || self.surface.hit_test(ElementKind::Mark, point, config.hit_tolerance).is_some()
        {
            return;
        }

        if let Some(previous) = self.brush.take() {
            self.surface.remove(previous.element);
        }
        let element = self.surface.insert(
            ElementKind::BrushSelection,
            Primitive::Rect {
                rect: Rect::from_two_pos(point, point),
            },
            brush_style(),
        );
        self.brush = Some(RectBrush {
            anchor: point,
            current: point,
            element,
        });
    }

    fn brush_move(&mut self, position: Pos2, config: &ScatterplotConfig) {
        let current = self.clamp_to_plot(self.surface.to_plot(position));
        let Some(brush) = self.brush.as_mut() else {
            return;
        };
        brush.current = current;
        let (rect, element) = (brush.rect(), brush.element);
        self.surface.set_primitive(element, Primitive::Rect { rect });

        if is_empty_extent(rect) {
            self.apply_selection(config);
            return;
        }
        let inside: AHashSet<RecordId> = self.records_in_rect(rect).iter().map(Record::id).collect();
        self.restyle(config, |id| {
            if inside.contains(&id) {
                Emphasis::Selected
            } else {
                Emphasis::Dimmed
            }
        });
    }

    fn brush_end(&mut self, position: Pos2, config: &ScatterplotConfig) {
        let current = self.clamp_to_plot(self.surface.to_plot(position));
        let Some(mut brush) = self.brush.take() else {
            return;
        };
        brush.current = current;
        self.surface.remove(brush.element);

        let rect = brush.rect();
        if is_empty_extent(rect) {
            tracing::debug!("Scatterplot brush released with an empty extent");
            self.apply_selection(config);
            return;
        }

        let records = self.records_in_rect(rect);
        tracing::info!("Scatterplot brush committed {} records", records.len());
        if let Some(projection) = &self.projection {
            projection.emitter.emit(ViewEvent::BrushCommitted(records));
        }
    }
}

fn is_empty_extent(rect: Rect) -> bool {
    rect.width() <= 0.0 || rect.height() <= 0.0
}

fn mark_style(config: &ScatterplotConfig, emphasis: Emphasis) -> Style {
    match emphasis {
        Emphasis::Unselected => Style::new(colors::MARK_BLUE, Stroke::NONE, config.default_opacity),
        Emphasis::Selected => Style::new(
            colors::MARK_BLUE,
            Stroke::new(config.selected_stroke_width, colors::SELECTED_RED),
            1.0,
        ),
        Emphasis::Dimmed => Style::new(colors::MARK_BLUE, Stroke::NONE, config.dimmed_opacity),
    }
}

fn brush_style() -> Style {
    Style::new(colors::BRUSH_FILL, colors::brush_stroke(), 1.0)
}

fn draw_axes(surface: &mut Surface, x_axis: &Axis, y_axis: &Axis, size: Vec2, config: &ScatterplotConfig) {
    for kind in [ElementKind::Axis, ElementKind::Tick, ElementKind::Label] {
        surface.remove_kind(kind);
    }

    let line = Style::stroked(colors::axis_stroke());
    let text = Style::new(colors::AXIS_COLOR, Stroke::NONE, 1.0);
    let segment = |from: Pos2, to: Pos2| Primitive::Segment { from, to };
    let label = |position: Pos2, text: String, anchor: Align2, size: f32| Primitive::Text {
        position,
        text,
        anchor,
        size,
    };

    // Bottom axis
    let y = x_axis.position;
    surface.insert(ElementKind::Axis, segment(Pos2::new(0.0, y), Pos2::new(size.x, y)), line);
    for tick in x_axis.ticks(config.tick_count) {
        surface.insert(ElementKind::Tick, segment(Pos2::new(tick.offset, y), Pos2::new(tick.offset, y + 6.0)), line);
        surface.insert(ElementKind::Tick, label(Pos2::new(tick.offset, y + 9.0), tick.label, Align2::CENTER_TOP, 10.0), text);
    }
    surface.insert(
        ElementKind::Label,
        label(Pos2::new(size.x / 2.0, y + 30.0), format_attribute_name(x_axis.name()), Align2::CENTER_TOP, 12.0),
        text,
    );

    // Left axis
    let x = y_axis.position;
    surface.insert(ElementKind::Axis, segment(Pos2::new(x, 0.0), Pos2::new(x, size.y)), line);
    for tick in y_axis.ticks(config.tick_count) {
        surface.insert(ElementKind::Tick, segment(Pos2::new(x - 6.0, tick.offset), Pos2::new(x, tick.offset)), line);
        surface.insert(ElementKind::Tick, label(Pos2::new(x - 9.0, tick.offset), tick.label, Align2::RIGHT_CENTER, 10.0), text);
    }
    surface.insert(
        ElementKind::Label,
        label(Pos2::new(x, -20.0), format_attribute_name(y_axis.name()), Align2::CENTER_BOTTOM, 12.0),
        text,
    );
}

impl RenderEngine for ScatterplotEngine {
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
            tracing::warn!("Scatterplot created twice; rebuilding its surface");
        }

        let plot_size = self.config.margin.inner_size(size);
        let mut surface = Surface::new(size, self.config.margin.origin());
        let overlay = surface.insert(
            ElementKind::BrushOverlay,
            Primitive::Rect {
                rect: Rect::from_min_size(Pos2::ZERO, plot_size),
            },
            Style::hidden(),
        );

        self.state = Some(ScatterState {
            surface,
            plot_size,
            overlay,
            marks: AHashMap::new(),
            projection: None,
            selected: AHashSet::new(),
            brush: None,
        });
        tracing::debug!("Scatterplot created with plot area {:?}", plot_size);
    }

    fn render(&mut self, data: &Dataset, attributes: &[String], emitter: EventEmitter) -> Result<(), ViewError> {
        if self.state.is_none() {
            return Err(ViewError::NotCreated(VIEW_TYPE));
        }
        match attributes {
            [x, y] => self.render_scatterplot(data, x, y, emitter),
            _ => Err(ViewError::AttributeCount {
                view: VIEW_TYPE,
                expected: 2,
                actual: attributes.len(),
            }),
        }
    }

    fn highlight_selected_items(&mut self, selection: &SelectionSet) -> Result<(), ViewError> {
        let state = self.state.as_mut().ok_or(ViewError::NotCreated(VIEW_TYPE))?;
        state.selected = selection.iter().collect();
        state.apply_selection(&self.config);
        tracing::debug!("Scatterplot highlighted {} records", selection.len());
        Ok(())
    }

    fn handle_pointer(&mut self, event: PointerEvent) -> Result<(), ViewError> {
        let config = &self.config;
        let state = self.state.as_mut().ok_or(ViewError::NotCreated(VIEW_TYPE))?;

        match event {
            PointerEvent::Click(position) => state.activate(position, config, ViewEvent::Clicked),
            PointerEvent::DoubleClick(position) => state.activate(position, config, ViewEvent::DoubleClicked),
            PointerEvent::Hover(_) | PointerEvent::Leave => {}
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
            tracing::debug!("Scatterplot cleared ({} elements dropped)", state.surface.len());
        }
    }

    fn surface(&self) -> Option<&Surface> {
        self.state.as_ref().map(|state| &state.surface)
    }

    fn save_config(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    fn load_config(&mut self, config: Value) {
        match serde_json::from_value(config) {
            Ok(config) => self.config = config,
            Err(err) => tracing::warn!("Ignoring invalid scatterplot config: {}", err),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lv_core::SelectionBroker;

    fn housing() -> Dataset {
        Dataset::new(vec![
            Record::from_pairs(0, [("area", 1000.0), ("price", 200000.0)]),
            Record::from_pairs(1, [("area", 2000.0), ("price", 400000.0)]),
            Record::from_pairs(2, [("area", 1500.0), ("price", 250000.0)]),
        ])
        .unwrap()
    }

    fn attributes() -> Vec<String> {
        vec!["area".to_string(), "price".to_string()]
    }

    fn rendered(data: &Dataset) -> (ScatterplotEngine, EventEmitter) {
        let mut engine = ScatterplotEngine::new();
        let emitter = EventEmitter::new();
        engine.create(Vec2::new(500.0, 450.0));
        engine.render(data, &attributes(), emitter.clone()).unwrap();
        engine.on_frame_update(2.0);
        (engine, emitter)
    }

    fn at(engine: &ScatterplotEngine, area: f64, price: f64) -> Pos2 {
        engine.value_position(area, price).unwrap()
    }

    fn opacity(engine: &ScatterplotEngine, id: RecordId) -> f32 {
        let element = engine.mark_element(id).unwrap();
        engine.surface().unwrap().get(element).unwrap().style().opacity
    }

    #[test]
    fn test_lifecycle_states() {
        let mut engine = ScatterplotEngine::new();
        assert_eq!(engine.lifecycle(), Lifecycle::Uninitialized);
        assert_eq!(
            engine.render(&housing(), &attributes(), EventEmitter::new()),
            Err(ViewError::NotCreated(VIEW_TYPE))
        );

        engine.create(Vec2::new(500.0, 450.0));
        assert_eq!(engine.lifecycle(), Lifecycle::Created);

        engine.render(&housing(), &attributes(), EventEmitter::new()).unwrap();
        assert_eq!(engine.lifecycle(), Lifecycle::Rendered);

        engine.clear();
        engine.clear();
        assert_eq!(engine.lifecycle(), Lifecycle::Uninitialized);
    }

    #[test]
    fn test_render_requires_two_attributes() {
        let mut engine = ScatterplotEngine::new();
        engine.create(Vec2::new(500.0, 450.0));
        let result = engine.render(&housing(), &["area".to_string()], EventEmitter::new());
        assert!(matches!(result, Err(ViewError::AttributeCount { expected: 2, actual: 1, .. })));

        let result = engine.render(&housing(), &["area".to_string(), "garden".to_string()], EventEmitter::new());
        assert_eq!(result, Err(ViewError::UnknownAttribute("garden".to_string())));
    }

    #[test]
    fn test_empty_dataset_is_a_no_op() {
        let mut engine = ScatterplotEngine::new();
        engine.create(Vec2::new(500.0, 450.0));
        engine.render(&Dataset::empty(), &attributes(), EventEmitter::new()).unwrap();
        assert_eq!(engine.lifecycle(), Lifecycle::Created);
        assert_eq!(engine.mark_count(), 0);
    }

    #[test]
    fn test_render_then_clear_leaves_nothing() {
        let (mut engine, _) = rendered(&housing());
        assert_eq!(engine.surface().unwrap().count_kind(ElementKind::Mark), 3);

        engine.clear();
        assert!(engine.surface().is_none());
        assert_eq!(engine.mark_count(), 0);
    }

    #[test]
    fn test_marks_keep_identity_across_renders() {
        let data = housing();
        let (mut engine, emitter) = rendered(&data);
        let before: Vec<_> = (0..3).map(|id| engine.mark_element(id).unwrap()).collect();

        engine.render(&data, &["price".to_string(), "area".to_string()], emitter.clone()).unwrap();
        let after: Vec<_> = (0..3).map(|id| engine.mark_element(id).unwrap()).collect();
        assert_eq!(before, after);
        assert!(engine.surface().unwrap().is_animating());

        let shrunk = Dataset::new(vec![
            data.records()[0].clone(),
            Record::from_pairs(7, [("area", 1200.0), ("price", 300000.0)]),
        ])
        .unwrap();
        engine.render(&shrunk, &attributes(), emitter).unwrap();

        assert_eq!(engine.mark_element(0), Some(before[0]));
        assert!(engine.mark_element(1).is_none());
        assert!(engine.mark_element(7).is_some());
        assert_eq!(engine.surface().unwrap().count_kind(ElementKind::Mark), 2);
    }

    #[test]
    fn test_highlight_restyles_without_moving() {
        let (mut engine, _) = rendered(&housing());
        let element = engine.mark_element(2).unwrap();
        let geometry = engine.surface().unwrap().get(element).unwrap().primitive().clone();

        let broker = SelectionBroker::new();
        let selection = broker.update_selected_items(&[housing().records()[2].clone()]);
        engine.highlight_selected_items(&selection).unwrap();

        let mark = engine.surface().unwrap().get(element).unwrap();
        assert_eq!(mark.primitive(), &geometry);
        assert!(!mark.is_animating());
        assert_eq!(mark.style().opacity, 1.0);
        assert_eq!(mark.style().stroke.color, colors::SELECTED_RED);
        assert_eq!(opacity(&engine, 0), 0.3);
    }

    #[test]
    fn test_click_and_double_click_emit_the_record() {
        let (mut engine, emitter) = rendered(&housing());
        let position = at(&engine, 1500.0, 250000.0);

        engine.handle_pointer(PointerEvent::Click(position)).unwrap();
        engine.handle_pointer(PointerEvent::DoubleClick(position)).unwrap();
        engine.handle_pointer(PointerEvent::Click(Pos2::new(5.0, 5.0))).unwrap();

        let events = emitter.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ViewEvent::Clicked(r) if r.id() == 2));
        assert!(matches!(&events[1], ViewEvent::DoubleClicked(r) if r.id() == 2));
    }

    #[test]
    fn test_brush_previews_then_commits_once() {
        let (mut engine, emitter) = rendered(&housing());

        engine.handle_pointer(PointerEvent::DragStart(at(&engine, 1600.0, 260000.0))).unwrap();
        engine.handle_pointer(PointerEvent::DragMove(at(&engine, 1200.0, 200000.0))).unwrap();
        engine.handle_pointer(PointerEvent::DragMove(at(&engine, 900.0, 150000.0))).unwrap();

        assert!(emitter.drain().is_empty());
        assert_eq!(opacity(&engine, 0), 1.0);
        assert_eq!(opacity(&engine, 1), 0.1);
        assert_eq!(opacity(&engine, 2), 1.0);
        assert!(engine.brush_rect().is_some());

        engine.handle_pointer(PointerEvent::DragEnd(at(&engine, 900.0, 150000.0))).unwrap();

        let events = emitter.drain();
        assert_eq!(events.len(), 1);
        let ViewEvent::BrushCommitted(records) = &events[0] else {
            panic!("expected a brush commit");
        };
        let mut ids: Vec<_> = records.iter().map(Record::id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2]);
        assert!(engine.brush_rect().is_none());
        assert_eq!(engine.surface().unwrap().count_kind(ElementKind::BrushSelection), 0);
    }

    #[test]
    fn test_zero_area_brush_commits_nothing() {
        let (mut engine, emitter) = rendered(&housing());
        let start = at(&engine, 1300.0, 300000.0);

        engine.handle_pointer(PointerEvent::DragStart(start)).unwrap();
        engine.handle_pointer(PointerEvent::DragEnd(start + Vec2::new(40.0, 0.0))).unwrap();

        assert!(emitter.drain().is_empty());
        assert_eq!(opacity(&engine, 1), 0.3);
    }

    #[test]
    fn test_collapsing_brush_drops_preview() {
        let (mut engine, emitter) = rendered(&housing());
        engine.handle_pointer(PointerEvent::DragStart(at(&engine, 1600.0, 260000.0))).unwrap();
        engine.handle_pointer(PointerEvent::DragMove(at(&engine, 900.0, 150000.0))).unwrap();
        assert_eq!(opacity(&engine, 1), 0.1);

        // Back onto the anchor's row: the rectangle has no height
        engine.handle_pointer(PointerEvent::DragMove(at(&engine, 1200.0, 260000.0))).unwrap();

        for id in 0..3 {
            assert_eq!(opacity(&engine, id), 0.3);
        }
        assert!(engine.brush_rect().is_some());
        assert!(emitter.drain().is_empty());
    }

    #[test]
    fn test_press_on_a_mark_does_not_start_a_brush() {
        let (mut engine, _) = rendered(&housing());
        engine.handle_pointer(PointerEvent::DragStart(at(&engine, 1500.0, 250000.0))).unwrap();
        assert!(engine.brush_rect().is_none());
    }

    #[test]
    fn test_clear_during_gesture_emits_nothing() {
        let (mut engine, emitter) = rendered(&housing());
        engine.handle_pointer(PointerEvent::DragStart(at(&engine, 1600.0, 260000.0))).unwrap();
        engine.handle_pointer(PointerEvent::DragMove(at(&engine, 1100.0, 210000.0))).unwrap();

        engine.clear();
        assert_eq!(
            engine.handle_pointer(PointerEvent::DragEnd(Pos2::ZERO)),
            Err(ViewError::NotCreated(VIEW_TYPE))
        );
        assert!(emitter.drain().is_empty());
    }

    #[test]
    fn test_config_round_trip() {
        let mut engine = ScatterplotEngine::new();
        engine.config.radius = 5.0;
        let saved = engine.save_config();

        let mut other = ScatterplotEngine::new();
        other.load_config(saved);
        assert_eq!(other.config.radius, 5.0);

        other.load_config(serde_json::json!({ "radius": "big" }));
        assert_eq!(other.config.radius, 5.0);
    }
}

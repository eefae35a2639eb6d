//! View container - owns one render engine and ties it to the shared selection
//!
//! The container decides *when* an engine renders and when it only
//! highlights. Data or attribute changes trigger a full render; selection
//! changes never do.

use std::sync::Arc;

use egui::{Pos2, Response, Sense, Ui, Vec2};
use parking_lot::Mutex;

use lv_core::{Dataset, EventEmitter, SelectionBroker, SelectionSet, SelectionSubscriber, SpaceViewId, ViewEvent};
use lv_render::PainterRenderer;

use crate::engine::{PointerEvent, RenderEngine, ViewError};

/// Inputs a container renders from
#[derive(Debug, Clone)]
pub struct ViewProps {
    pub data: Dataset,
    pub attributes: Vec<String>,
}

impl ViewProps {
    pub fn new<S: Into<String>>(data: Dataset, attributes: impl IntoIterator<Item = S>) -> Self {
        Self {
            data,
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// True when rendering `other` would draw something different
    fn differs_from(&self, other: &ViewProps) -> bool {
        !self.data.same_as(&other.data) || self.attributes != other.attributes
    }
}

/// How often each lifecycle entry point has run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub creates: usize,
    pub renders: usize,
    pub highlights: usize,
    pub clears: usize,
}

#[derive(Default)]
struct ContainerState {
    mounted: bool,
    props: Option<ViewProps>,
    stats: LifecycleStats,
}

/// Hosts one engine between mount and unmount
pub struct ViewContainer {
    id: SpaceViewId,
    title: String,
    engine: Mutex<Box<dyn RenderEngine>>,
    state: Mutex<ContainerState>,
    broker: Arc<SelectionBroker>,
    emitter: EventEmitter,
}

impl ViewContainer {
    /// Create the engine's surface and subscribe to the broker
    pub fn mount(
        title: impl Into<String>,
        mut engine: Box<dyn RenderEngine>,
        size: Vec2,
        broker: Arc<SelectionBroker>,
    ) -> Arc<Self> {
        engine.create(size);

        let container = Arc::new(Self {
            id: SpaceViewId::new_v4(),
            title: title.into(),
            engine: Mutex::new(engine),
            state: Mutex::new(ContainerState {
                mounted: true,
                props: None,
                stats: LifecycleStats {
                    creates: 1,
                    ..Default::default()
                },
            }),
            broker: broker.clone(),
            emitter: EventEmitter::new(),
        });

        broker.subscribe(container.clone());
        tracing::info!("Mounted {} '{}' ({})", container.view_type(), container.title, container.id);
        container
    }

    pub fn id(&self) -> SpaceViewId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn view_type(&self) -> &'static str {
        self.engine.lock().view_type()
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted
    }

    /// Props of the last accepted update
    pub fn props(&self) -> Option<ViewProps> {
        self.state.lock().props.clone()
    }

    pub fn stats(&self) -> LifecycleStats {
        self.state.lock().stats
    }

    /// Run `f` against the engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&dyn RenderEngine) -> R) -> R {
        let engine = self.engine.lock();
        f(engine.as_ref())
    }

    /// Run `f` against the engine mutably, e.g. to change its configuration
    pub fn with_engine_mut<R>(&self, f: impl FnOnce(&mut dyn RenderEngine) -> R) -> R {
        let mut engine = self.engine.lock();
        f(engine.as_mut())
    }

    /// Hand new props to the view.
    ///
    /// Renders only when the dataset identity or the attribute list changed,
    /// then re-applies the current selection. Returns whether it rendered.
    pub fn update(&self, props: ViewProps) -> Result<bool, ViewError> {
        let mut state = self.state.lock();
        if !state.mounted {
            tracing::warn!("Ignoring props for unmounted view '{}'", self.title);
            return Ok(false);
        }

        let changed = state
            .props
            .as_ref()
            .map(|previous| previous.differs_from(&props))
            .unwrap_or(true);
        if !changed {
            return Ok(false);
        }
        if props.data.is_empty() {
            state.props = Some(props);
            return Ok(false);
        }

        let mut engine = self.engine.lock();
        engine.render(&props.data, &props.attributes, self.emitter.clone())?;
        state.stats.renders += 1;

        let selection = self.broker.selection();
        engine.highlight_selected_items(&selection)?;
        state.stats.highlights += 1;

        tracing::debug!(
            "View '{}' rendered {} records on [{}]",
            self.title,
            props.data.len(),
            props.attributes.join(", ")
        );
        state.props = Some(props);
        Ok(true)
    }

    /// Forward a pointer gesture, then dispatch whatever the engine emitted
    pub fn handle_pointer(&self, event: PointerEvent) -> Result<(), ViewError> {
        if !self.is_mounted() {
            return Ok(());
        }

        // The engine lock is released before the broker calls back into any view
        self.engine.lock().handle_pointer(event)?;
        self.dispatch_events();
        Ok(())
    }

    fn dispatch_events(&self) {
        for event in self.emitter.drain() {
            match event {
                ViewEvent::Clicked(record) => {
                    tracing::debug!("View '{}' clicked record {}", self.title, record.id());
                    self.broker.update_selected_items(std::slice::from_ref(&record));
                }
                ViewEvent::BrushCommitted(records) => {
                    tracing::info!("View '{}' committed a brush of {} records", self.title, records.len());
                    self.broker.update_selected_items(&records);
                }
                ViewEvent::DoubleClicked(record) => self.broker.open_detail(&record),
            }
        }
    }

    /// Advance transitions; returns true while anything still moves
    pub fn on_frame_update(&self, dt: f32) -> bool {
        self.engine.lock().on_frame_update(dt)
    }

    /// Clear the engine and leave the broker. Safe to call twice.
    pub fn unmount(&self) {
        let mut state = self.state.lock();
        if !state.mounted {
            return;
        }
        state.mounted = false;
        state.props = None;

        self.engine.lock().clear();
        state.stats.clears += 1;
        drop(state);

        self.broker.unsubscribe(self.id);
        self.emitter.drain();
        tracing::info!("Unmounted '{}' ({})", self.title, self.id);
    }

    /// Draw the view into `ui` and feed it the pointer
    pub fn ui(&self, ui: &mut Ui) {
        let size = self
            .with_engine(|engine| engine.surface().map(|surface| surface.size()))
            .unwrap_or_else(|| ui.available_size());
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        for event in pointer_events(ui, &response, rect.min) {
            if let Err(err) = self.handle_pointer(event) {
                tracing::warn!("View '{}' rejected {:?}: {}", self.title, event, err);
            }
        }

        if self.on_frame_update(ui.input(|i| i.stable_dt)) {
            ui.ctx().request_repaint();
        }

        let painter = ui.painter_at(rect);
        self.with_engine(|engine| {
            if let Some(surface) = engine.surface() {
                surface.draw(&mut PainterRenderer::new(&painter, rect.min));
            }
        });
    }
}

/// Translate this frame's egui interaction into engine gestures
fn pointer_events(ui: &Ui, response: &Response, origin: Pos2) -> Vec<PointerEvent> {
    let local = |pos: Pos2| Pos2::ZERO + (pos - origin);
    let pointer = response
        .interact_pointer_pos()
        .or_else(|| ui.input(|i| i.pointer.latest_pos()))
        .map(local);

    let mut events = Vec::new();
    if let Some(pos) = pointer {
        if response.drag_started() {
            events.push(PointerEvent::DragStart(pos));
        } else if response.dragged() {
            events.push(PointerEvent::DragMove(pos));
        }
        if response.drag_released() {
            events.push(PointerEvent::DragEnd(pos));
        }
        if response.double_clicked() {
            events.push(PointerEvent::DoubleClick(pos));
        } else if response.clicked() {
            events.push(PointerEvent::Click(pos));
        }
    }

    match response.hover_pos() {
        Some(pos) => events.push(PointerEvent::Hover(local(pos))),
        None => events.push(PointerEvent::Leave),
    }
    events
}

impl SelectionSubscriber for ViewContainer {
    fn view_id(&self) -> SpaceViewId {
        self.id
    }

    fn on_selection_change(&self, selection: &SelectionSet) {
        let mut state = self.state.lock();
        if !state.mounted {
            return;
        }

        match self.engine.lock().highlight_selected_items(selection) {
            Ok(()) => state.stats.highlights += 1,
            Err(err) => tracing::warn!("View '{}' could not highlight: {}", self.title, err),
        }
    }
}

impl Drop for ViewContainer {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.mounted {
            state.mounted = false;
            self.engine.get_mut().clear();
            tracing::debug!("Dropped mounted view '{}'", self.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plots::{ParallelCoordinatesEngine, ScatterplotEngine};
    use lv_core::Record;

    fn housing() -> Dataset {
        Dataset::new(vec![
            Record::from_pairs(0, [("area", 1000.0), ("price", 200000.0)]),
            Record::from_pairs(1, [("area", 2000.0), ("price", 400000.0)]),
            Record::from_pairs(2, [("area", 1500.0), ("price", 250000.0)]),
        ])
        .unwrap()
    }

    fn scatter(broker: &Arc<SelectionBroker>) -> Arc<ViewContainer> {
        ViewContainer::mount(
            "Scatterplot",
            Box::new(ScatterplotEngine::new()),
            Vec2::new(500.0, 450.0),
            broker.clone(),
        )
    }

    #[test]
    fn test_mount_creates_and_subscribes() {
        let broker = Arc::new(SelectionBroker::new());
        let view = scatter(&broker);

        assert!(view.is_mounted());
        assert_eq!(view.stats().creates, 1);
        assert_eq!(broker.subscriber_count(), 1);
        assert_eq!(view.view_type(), "ScatterplotView");
    }

    #[test]
    fn test_update_renders_only_on_change() {
        let broker = Arc::new(SelectionBroker::new());
        let view = scatter(&broker);
        let data = housing();

        assert!(view.update(ViewProps::new(data.clone(), ["area", "price"])).unwrap());
        assert!(!view.update(ViewProps::new(data.clone(), ["area", "price"])).unwrap());
        assert!(view.update(ViewProps::new(data.clone(), ["price", "area"])).unwrap());

        // Same records, new load
        let reloaded = Dataset::new(data.records().to_vec()).unwrap();
        assert!(view.update(ViewProps::new(reloaded, ["price", "area"])).unwrap());

        assert_eq!(view.stats().renders, 3);
    }

    #[test]
    fn test_empty_data_does_not_render() {
        let broker = Arc::new(SelectionBroker::new());
        let view = scatter(&broker);
        assert!(!view.update(ViewProps::new(Dataset::empty(), ["area", "price"])).unwrap());
        assert_eq!(view.stats().renders, 0);
    }

    #[test]
    fn test_selection_change_only_highlights() {
        let broker = Arc::new(SelectionBroker::new());
        let view = scatter(&broker);
        let data = housing();
        view.update(ViewProps::new(data.clone(), ["area", "price"])).unwrap();
        let before = view.stats();

        broker.update_selected_items(&data.records()[..1]);

        let after = view.stats();
        assert_eq!(after.renders, before.renders);
        assert_eq!(after.highlights, before.highlights + 1);
    }

    #[test]
    fn test_render_reapplies_current_selection() {
        let broker = Arc::new(SelectionBroker::new());
        let view = ViewContainer::mount(
            "Parallel coordinates",
            Box::new(ParallelCoordinatesEngine::new()),
            Vec2::new(800.0, 400.0),
            broker.clone(),
        );
        let data = housing();
        broker.update_selected_items(&data.records()[1..2]);

        view.update(ViewProps::new(data, ["price", "area"])).unwrap();

        let opacity = view.with_engine(|engine| {
            let engine = engine.as_any().downcast_ref::<ParallelCoordinatesEngine>().unwrap();
            let element = engine.line_element(1).unwrap();
            engine.surface().unwrap().get(element).unwrap().style().opacity
        });
        assert_eq!(opacity, 1.0);
    }

    #[test]
    fn test_click_replaces_selection() {
        let broker = Arc::new(SelectionBroker::new());
        let view = scatter(&broker);
        let data = housing();
        view.update(ViewProps::new(data.clone(), ["area", "price"])).unwrap();
        broker.update_selected_items(data.records());

        let position = view.with_engine(|engine| {
            let engine = engine.as_any().downcast_ref::<ScatterplotEngine>().unwrap();
            engine.value_position(2000.0, 400000.0).unwrap()
        });
        view.handle_pointer(PointerEvent::Click(position)).unwrap();

        assert_eq!(broker.selection().sorted_ids(), vec![1]);
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let broker = Arc::new(SelectionBroker::new());
        let view = scatter(&broker);
        view.update(ViewProps::new(housing(), ["area", "price"])).unwrap();

        view.unmount();
        view.unmount();

        assert!(!view.is_mounted());
        assert_eq!(view.stats().clears, 1);
        assert_eq!(broker.subscriber_count(), 0);
        assert!(view.with_engine(|engine| engine.surface().is_none()));

        // Later broadcasts and props are ignored
        broker.clear_selection();
        assert!(!view.update(ViewProps::new(housing(), ["area", "price"])).unwrap());
    }

    #[test]
    fn test_props_errors_surface() {
        let broker = Arc::new(SelectionBroker::new());
        let view = scatter(&broker);
        let result = view.update(ViewProps::new(housing(), ["area"]));
        assert!(matches!(result, Err(ViewError::AttributeCount { .. })));
    }
}

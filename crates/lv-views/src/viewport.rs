//! Viewport - manages the mounted views as dockable tabs

use std::sync::Arc;

use egui::{Ui, Vec2};
use egui_dock::{DockArea, DockState, TabViewer};
use indexmap::IndexMap;

use lv_core::{AppState, SelectionBroker, SpaceViewId};

use crate::container::{ViewContainer, ViewProps};
use crate::engine::{RenderEngine, ViewError};
use crate::plots::{ParallelCoordinatesEngine, ScatterplotEngine};

/// The set of views sharing one selection broker
pub struct Viewport {
    broker: Arc<SelectionBroker>,
    dock_state: DockState<SpaceViewId>,
    views: IndexMap<SpaceViewId, Arc<ViewContainer>>,
}

impl Viewport {
    pub fn new(broker: Arc<SelectionBroker>) -> Self {
        Self {
            broker,
            dock_state: DockState::new(vec![]),
            views: IndexMap::new(),
        }
    }

    /// Mount the scatterplot and parallel coordinates over `state`'s dataset
    pub fn linked(state: &AppState, size: Vec2) -> Result<Self, ViewError> {
        let mut viewport = Self::new(state.broker.clone());
        let settings = state.settings.read().clone();
        let data = state.dataset();

        let scatter = viewport.add_view("Scatterplot", Box::new(ScatterplotEngine::new()), size);
        scatter.update(ViewProps::new(
            data.clone(),
            [settings.scatterplot.x_attribute, settings.scatterplot.y_attribute],
        ))?;

        let parallel = viewport.add_view(
            "Parallel Coordinates",
            Box::new(ParallelCoordinatesEngine::new()),
            size,
        );
        parallel.update(ViewProps::new(data, settings.parallel_coordinates.attributes))?;

        Ok(viewport)
    }

    pub fn broker(&self) -> &Arc<SelectionBroker> {
        &self.broker
    }

    /// Mount a view and add it as a tab
    pub fn add_view(&mut self, title: &str, engine: Box<dyn RenderEngine>, size: Vec2) -> Arc<ViewContainer> {
        let view = ViewContainer::mount(title, engine, size, self.broker.clone());
        let id = view.id();

        self.views.insert(id, view.clone());
        if self.dock_state.main_surface().is_empty() {
            // First view becomes the main surface
            self.dock_state = DockState::new(vec![id]);
        } else {
            self.dock_state.push_to_first_leaf(id);
        }
        view
    }

    /// Unmount a view and drop its tab
    pub fn remove_view(&mut self, id: SpaceViewId) -> bool {
        let Some(view) = self.views.shift_remove(&id) else {
            return false;
        };
        view.unmount();
        if let Some(location) = self.dock_state.find_tab(&id) {
            self.dock_state.remove_tab(location);
        }
        true
    }

    pub fn view(&self, id: SpaceViewId) -> Option<&Arc<ViewContainer>> {
        self.views.get(&id)
    }

    pub fn views(&self) -> impl Iterator<Item = &Arc<ViewContainer>> {
        self.views.values()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Hand `state`'s current dataset to every view, keeping each view's attributes
    pub fn refresh(&self, state: &AppState) -> Result<usize, ViewError> {
        let data = state.dataset();
        let mut rendered = 0;
        for view in self.views.values() {
            let Some(props) = view.props() else {
                continue;
            };
            if view.update(ViewProps::new(data.clone(), props.attributes))? {
                rendered += 1;
            }
        }
        Ok(rendered)
    }

    /// Advance every view's transitions; true while any is still moving
    pub fn on_frame_update(&self, dt: f32) -> bool {
        self.views
            .values()
            .fold(false, |animating, view| view.on_frame_update(dt) | animating)
    }

    /// Draw the viewport
    pub fn ui(&mut self, ui: &mut Ui) {
        let available_rect = ui.available_rect_before_wrap();
        let mut closed = Vec::new();

        ui.allocate_ui(available_rect.size(), |ui| {
            DockArea::new(&mut self.dock_state)
                .show_close_buttons(true)
                .show_inside(
                    ui,
                    &mut ViewportTabViewer {
                        views: &self.views,
                        closed: &mut closed,
                    },
                );
        });

        for id in closed {
            if let Some(view) = self.views.shift_remove(&id) {
                view.unmount();
            }
        }
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        for view in self.views.values() {
            view.unmount();
        }
    }
}

/// Tab viewer for egui_dock
struct ViewportTabViewer<'a> {
    views: &'a IndexMap<SpaceViewId, Arc<ViewContainer>>,
    closed: &'a mut Vec<SpaceViewId>,
}

impl<'a> TabViewer for ViewportTabViewer<'a> {
    type Tab = SpaceViewId;

    fn title(&mut self, tab: &mut Self::Tab) -> egui::WidgetText {
        match self.views.get(tab) {
            Some(view) => view.title().into(),
            None => "Unknown".into(),
        }
    }

    fn ui(&mut self, ui: &mut Ui, tab: &mut Self::Tab) {
        if let Some(view) = self.views.get(tab) {
            view.ui(ui);
        }
    }

    fn on_close(&mut self, tab: &mut Self::Tab) -> bool {
        self.closed.push(*tab);
        true
    }
}

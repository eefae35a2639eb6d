use std::path::Path;
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::detail::DetailSlot;
use crate::sync::SelectionBroker;
use crate::CoreError;

/// Space view identifier type
pub type SpaceViewId = uuid::Uuid;

/// Numeric housing attributes shown on the parallel-coordinates plot
pub const HOUSING_NUMERIC_ATTRIBUTES: [&str; 6] =
    ["price", "area", "bedrooms", "bathrooms", "stories", "parking"];

/// The host application's state
pub struct AppState {
    /// Owner of the shared selection
    pub broker: Arc<SelectionBroker>,

    /// Detail view fed by double activation
    pub detail: Arc<DetailSlot>,

    /// The currently loaded dataset
    pub dataset: Arc<RwLock<Dataset>>,

    /// Application settings
    pub settings: Arc<RwLock<AppSettings>>,
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Scatterplot projection
    pub scatterplot: ScatterplotSettings,

    /// Parallel-coordinates axes
    pub parallel_coordinates: ParallelCoordinatesSettings,
}

/// Attributes projected by the scatterplot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterplotSettings {
    pub x_attribute: String,
    pub y_attribute: String,
}

/// Attributes laid out on the parallel-coordinates plot, left to right
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelCoordinatesSettings {
    pub attributes: Vec<String>,
}

impl Default for ScatterplotSettings {
    fn default() -> Self {
        Self {
            x_attribute: "area".to_string(),
            y_attribute: "price".to_string(),
        }
    }
}

impl Default for ParallelCoordinatesSettings {
    fn default() -> Self {
        Self {
            attributes: HOUSING_NUMERIC_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AppSettings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl AppState {
    /// Create a new application state with an empty dataset and selection
    pub fn new() -> Self {
        let broker = Arc::new(SelectionBroker::new());
        let detail = Arc::new(DetailSlot::new());
        broker.set_detail_view(detail.clone());

        Self {
            broker,
            detail,
            dataset: Arc::new(RwLock::new(Dataset::empty())),
            settings: Arc::new(RwLock::new(AppSettings::default())),
        }
    }

    /// Install a freshly loaded dataset.
    ///
    /// The previous selection refers to the old load and is dropped.
    pub fn load_dataset(&self, dataset: Dataset) {
        tracing::info!("Dataset loaded with {} records", dataset.len());
        *self.dataset.write() = dataset;
        self.broker.clear_selection();
    }

    /// Current dataset handle
    pub fn dataset(&self) -> Dataset {
        self.dataset.read().clone()
    }

    /// Load settings from a JSON file
    pub fn load_settings(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = AppSettings::from_json(&json)?;
        tracing::info!("Loaded settings from {}", path.display());
        *self.settings.write() = settings;
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

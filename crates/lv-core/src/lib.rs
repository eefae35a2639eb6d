//! Core functionality for the linked-views platform
//!
//! This crate provides the record model, the shared selection state and the
//! event types exchanged between render engines and their hosts.

pub mod data;
pub mod detail;
pub mod events;
pub mod state;
pub mod sync;

use thiserror::Error;

// Re-export commonly used types
pub use data::{category_label, Dataset, Record, RecordId, Value, MISSING_LABEL};
pub use detail::{DetailSlot, DetailView};
pub use events::{EventEmitter, ViewEvent};
pub use state::{AppSettings, AppState, SpaceViewId};
pub use sync::{SelectionBroker, SelectionSet, SelectionSubscriber, ViewSyncSettings};

/// Errors raised by the core data model
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Duplicate record identity {0}")]
    DuplicateRecordId(RecordId),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Install a formatting `tracing` subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    if tracing_subscriber::fmt::try_init().is_ok() {
        tracing::debug!("Tracing subscriber installed");
    }
}

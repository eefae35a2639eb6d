//! Seam toward the record detail view
//!
//! The detail view itself lives outside the core. It receives exactly one
//! record on double activation.

use std::sync::Arc;
use parking_lot::RwLock;

use crate::data::Record;

/// Receiver of double-activated records
pub trait DetailView: Send + Sync {
    fn open_detail(&self, record: &Record);
}

/// Minimal detail view that remembers the record it was asked to show
#[derive(Default)]
pub struct DetailSlot {
    current: Arc<RwLock<Option<Record>>>,
}

impl DetailSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record currently open, if any
    pub fn current(&self) -> Option<Record> {
        self.current.read().clone()
    }

    pub fn is_open(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn close(&self) {
        *self.current.write() = None;
    }
}

impl DetailView for DetailSlot {
    fn open_detail(&self, record: &Record) {
        *self.current.write() = Some(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_close() {
        let slot = DetailSlot::new();
        assert!(!slot.is_open());

        slot.open_detail(&Record::from_pairs(2, [("price", 1.0)]));
        assert_eq!(slot.current().map(|r| r.id()), Some(2));

        slot.close();
        assert!(slot.current().is_none());
    }
}

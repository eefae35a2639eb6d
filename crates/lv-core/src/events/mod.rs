use std::sync::Arc;
use parking_lot::Mutex;

use crate::data::Record;

/// Events a render engine raises toward its host
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Primary click on a single mark
    Clicked(Record),

    /// Double activation on a single mark
    DoubleClicked(Record),

    /// A brush gesture ended; carries every record it covers
    BrushCommitted(Vec<Record>),
}

impl ViewEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ViewEvent::Clicked(_) => "clicked",
            ViewEvent::DoubleClicked(_) => "double_clicked",
            ViewEvent::BrushCommitted(_) => "brush_committed",
        }
    }
}

/// Queue an engine emits into and its host drains.
///
/// Engines never call back into the host while handling input; the host reads
/// the queue once the engine has returned.
#[derive(Clone, Default)]
pub struct EventEmitter {
    queue: Arc<Mutex<Vec<ViewEvent>>>,
}

impl EventEmitter {
    /// Create a new, empty emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event
    pub fn emit(&self, event: ViewEvent) {
        tracing::trace!("Queued {} event", event.kind());
        self.queue.lock().push(event);
    }

    /// Take every queued event in emission order
    pub fn drain(&self) -> Vec<ViewEvent> {
        std::mem::take(&mut *self.queue.lock())
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let emitter = EventEmitter::new();
        let record = Record::from_pairs(3, [("price", 1.0)]);

        emitter.emit(ViewEvent::Clicked(record.clone()));
        emitter.clone().emit(ViewEvent::BrushCommitted(vec![record.clone()]));

        assert_eq!(emitter.pending(), 2);
        let events = emitter.drain();
        assert_eq!(events[0], ViewEvent::Clicked(record.clone()));
        assert_eq!(events[1], ViewEvent::BrushCommitted(vec![record]));
        assert_eq!(emitter.pending(), 0);
    }
}

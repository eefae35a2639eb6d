use std::sync::{Arc, Weak};
use parking_lot::RwLock;
use ahash::{AHashMap, AHashSet};

use crate::data::{Record, RecordId};
use crate::detail::DetailView;
use crate::state::SpaceViewId;

/// The canonical set of selected record identities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    ids: AHashSet<RecordId>,

    /// Bumped on every replacement
    revision: u64,
}

impl SelectionSet {
    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn iter(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.ids.iter().copied()
    }

    /// Identities in ascending order
    pub fn sorted_ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<_> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Trait for views that follow the shared selection
pub trait SelectionSubscriber: Send + Sync {
    /// Stable id used for sync settings and unsubscription
    fn view_id(&self) -> SpaceViewId;

    /// Called after the selection has been replaced
    fn on_selection_change(&self, selection: &SelectionSet);
}

/// Synchronization settings for a specific view
#[derive(Debug, Clone)]
pub struct ViewSyncSettings {
    /// Whether this view receives selection broadcasts
    pub sync_selection: bool,
}

impl Default for ViewSyncSettings {
    fn default() -> Self {
        Self {
            sync_selection: true,
        }
    }
}

/// Owner of the shared selection, broadcasting it to every mounted view
pub struct SelectionBroker {
    selection: Arc<RwLock<SelectionSet>>,
    subscribers: Arc<RwLock<Vec<Weak<dyn SelectionSubscriber>>>>,
    view_settings: Arc<RwLock<AHashMap<SpaceViewId, ViewSyncSettings>>>,
    detail_view: Arc<RwLock<Option<Arc<dyn DetailView>>>>,
}

impl SelectionBroker {
    /// Create a broker with an empty selection
    pub fn new() -> Self {
        Self {
            selection: Arc::new(RwLock::new(SelectionSet::default())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            view_settings: Arc::new(RwLock::new(AHashMap::new())),
            detail_view: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the current selection
    pub fn selection(&self) -> SelectionSet {
        self.selection.read().clone()
    }

    /// Replace the selection with the identities of `records`.
    ///
    /// Always a full replacement: identities not in `records` are dropped.
    pub fn update_selected_items(&self, records: &[Record]) -> SelectionSet {
        self.replace(records.iter().map(Record::id).collect())
    }

    /// Replace the selection with the empty set
    pub fn clear_selection(&self) -> SelectionSet {
        self.replace(AHashSet::new())
    }

    fn replace(&self, ids: AHashSet<RecordId>) -> SelectionSet {
        let snapshot = {
            let mut selection = self.selection.write();
            selection.ids = ids;
            selection.revision += 1;
            selection.clone()
        };

        tracing::debug!(
            "Selection replaced: {} records (revision {})",
            snapshot.len(),
            snapshot.revision
        );

        // The write lock is released before any view observes the new value
        self.notify_subscribers(&snapshot);
        snapshot
    }

    /// Forward a single record to the detail view, if one is attached
    pub fn open_detail(&self, record: &Record) {
        let detail_view = self.detail_view.read().clone();
        match detail_view {
            Some(view) => {
                tracing::info!("Opening detail view for record {}", record.id());
                view.open_detail(record);
            }
            None => tracing::warn!("No detail view attached; ignoring record {}", record.id()),
        }
    }

    /// Attach the detail view collaborator
    pub fn set_detail_view(&self, view: Arc<dyn DetailView>) {
        *self.detail_view.write() = Some(view);
    }

    /// Add a subscriber; it is held weakly
    pub fn subscribe(&self, subscriber: Arc<dyn SelectionSubscriber>) {
        let view_id = subscriber.view_id();
        self.subscribers.write().push(Arc::downgrade(&subscriber));
        self.view_settings.write().entry(view_id).or_default();
    }

    /// Remove a subscriber and its sync settings
    pub fn unsubscribe(&self, view_id: SpaceViewId) {
        self.subscribers.write().retain(|weak| {
            weak.upgrade()
                .map(|subscriber| subscriber.view_id() != view_id)
                .unwrap_or(false)
        });
        self.view_settings.write().remove(&view_id);
    }

    /// Register a view with sync settings
    pub fn register_view(&self, view_id: SpaceViewId, settings: ViewSyncSettings) {
        self.view_settings.write().insert(view_id, settings);
    }

    /// Check if a view should sync selection
    pub fn should_sync_selection(&self, view_id: &SpaceViewId) -> bool {
        self.view_settings
            .read()
            .get(view_id)
            .map(|s| s.sync_selection)
            .unwrap_or(true)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Notify all live subscribers of a selection change
    fn notify_subscribers(&self, selection: &SelectionSet) {
        let live: Vec<Arc<dyn SelectionSubscriber>> = {
            let mut subscribers = self.subscribers.write();

            // Remove any dead weak references
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        for subscriber in live {
            if self.should_sync_selection(&subscriber.view_id()) {
                subscriber.on_selection_change(selection);
            }
        }
    }
}

impl Default for SelectionBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::DetailSlot;
    use parking_lot::Mutex;

    struct Recorder {
        id: SpaceViewId,
        seen: Mutex<Vec<Vec<RecordId>>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SpaceViewId::new_v4(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl SelectionSubscriber for Recorder {
        fn view_id(&self) -> SpaceViewId {
            self.id
        }

        fn on_selection_change(&self, selection: &SelectionSet) {
            self.seen.lock().push(selection.sorted_ids());
        }
    }

    fn record(id: RecordId) -> Record {
        Record::from_pairs(id, [("price", id as f64)])
    }

    #[test]
    fn test_selection_is_replaced_not_merged() {
        let broker = SelectionBroker::new();
        broker.update_selected_items(&[record(0)]);
        let selection = broker.update_selected_items(&[record(1), record(2)]);

        assert_eq!(selection.sorted_ids(), vec![1, 2]);
        assert!(!broker.selection().contains(0));
        assert_eq!(selection.revision(), 2);
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let broker = SelectionBroker::new();
        let a = Recorder::new();
        let b = Recorder::new();
        broker.subscribe(a.clone());
        broker.subscribe(b.clone());

        broker.update_selected_items(&[record(4)]);

        assert_eq!(*a.seen.lock(), vec![vec![4]]);
        assert_eq!(*b.seen.lock(), vec![vec![4]]);
    }

    #[test]
    fn test_opted_out_view_is_skipped() {
        let broker = SelectionBroker::new();
        let a = Recorder::new();
        broker.subscribe(a.clone());
        broker.register_view(a.id, ViewSyncSettings { sync_selection: false });

        broker.update_selected_items(&[record(1)]);
        assert!(a.seen.lock().is_empty());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let broker = SelectionBroker::new();
        let a = Recorder::new();
        let b = Recorder::new();
        broker.subscribe(a.clone());
        broker.subscribe(b.clone());
        drop(a);

        broker.clear_selection();
        assert_eq!(broker.subscriber_count(), 1);

        broker.unsubscribe(b.id);
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[test]
    fn test_open_detail_leaves_selection_alone() {
        let broker = SelectionBroker::new();
        let slot = Arc::new(DetailSlot::new());
        broker.set_detail_view(slot.clone());
        broker.update_selected_items(&[record(1)]);

        broker.open_detail(&record(7));

        assert_eq!(slot.current().map(|r| r.id()), Some(7));
        assert_eq!(broker.selection().sorted_ids(), vec![1]);
    }
}

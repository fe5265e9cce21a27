use super::models::{DateRange, Event};
use super::storage::StateStorage;
use crate::error::WrappedResult;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key names, prefixed per scope
pub mod keys {
    pub const EVENTS: &str = "calendarEvents";
    pub const DATE_RANGE: &str = "calendarDateRange";
    pub const DEFAULT_COLOR_ID: &str = "defaultColorId";
}

/// Storage key for `name` inside `scope`
pub fn scoped_key(scope: &str, name: &str) -> String {
    format!("wrapped:{}:{}", scope, name)
}

/// The fetched events, their date range and the fallback color for one
/// session.
///
/// Every setter writes through to the storage port. If the port fails the
/// store logs it and keeps working from memory only.
pub struct EventStore {
    scope: String,
    storage: Option<Arc<dyn StateStorage>>,
    events: Vec<Event>,
    date_range: Option<DateRange>,
    default_color_id: Option<String>,
    data_loaded: bool,
    initialized: bool,
}

impl fmt::Debug for EventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore")
            .field("scope", &self.scope)
            .field("persistent", &self.storage.is_some())
            .field("event_count", &self.events.len())
            .field("date_range", &self.date_range)
            .field("default_color_id", &self.default_color_id)
            .field("data_loaded", &self.data_loaded)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl EventStore {
    /// Create an empty, not yet initialized store
    pub fn new(scope: &str, storage: Arc<dyn StateStorage>) -> Self {
        Self {
            scope: scope.to_string(),
            storage: Some(storage),
            events: Vec::new(),
            date_range: None,
            default_color_id: None,
            data_loaded: false,
            initialized: false,
        }
    }

    /// A store that never persists anything
    pub fn in_memory(scope: &str) -> Self {
        Self {
            storage: None,
            ..Self::new(scope, Arc::new(super::storage::InMemoryStorage::new()))
        }
    }

    /// Create and rehydrate in one step
    pub async fn open(scope: &str, storage: Arc<dyn StateStorage>) -> Self {
        let mut store = Self::new(scope, storage);
        store.initialize().await;
        store
    }

    /// Rehydrate from storage. Runs once; later calls do nothing.
    pub async fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        if let Some(raw) = self.load_raw(keys::EVENTS).await {
            if let Some(events) = self.parse::<Vec<Event>>(keys::EVENTS, &raw) {
                self.events = events;
                self.data_loaded = true;
            }
        }
        if let Some(raw) = self.load_raw(keys::DATE_RANGE).await {
            self.date_range = self.parse::<DateRange>(keys::DATE_RANGE, &raw);
        }
        self.default_color_id = self.load_raw(keys::DEFAULT_COLOR_ID).await;

        debug!(
            "Initialized event store {} with {} events",
            self.scope,
            self.events.len()
        );
        self.initialized = true;
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    pub fn default_color_id(&self) -> Option<&str> {
        self.default_color_id.as_deref()
    }

    pub fn is_data_loaded(&self) -> bool {
        self.data_loaded
    }

    /// True once the rehydration attempt has finished, whatever it found
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// False after a storage failure or for [`EventStore::in_memory`]
    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Replace the event list
    pub async fn set_events(&mut self, events: Vec<Event>) {
        match serde_json::to_string(&events) {
            Ok(json) => self.save_raw(keys::EVENTS, &json).await,
            Err(e) => warn!("Failed to serialize events: {}", e),
        }
        self.events = events;
    }

    /// Replace the date range; only a present range is persisted
    pub async fn set_date_range(&mut self, date_range: Option<DateRange>) {
        if let Some(range) = &date_range {
            match serde_json::to_string(range) {
                Ok(json) => self.save_raw(keys::DATE_RANGE, &json).await,
                Err(e) => warn!("Failed to serialize date range: {}", e),
            }
        }
        self.date_range = date_range;
    }

    /// Record the fallback color selection
    pub async fn set_default_color_id(&mut self, color_id: &str) {
        self.save_raw(keys::DEFAULT_COLOR_ID, color_id).await;
        self.default_color_id = Some(color_id.to_string());
    }

    /// Setting false resets the store: events, range and color are
    /// dropped from memory and storage.
    ///
    /// Every key is cleared even when an earlier one fails. The first failure
    /// is returned, since keys left behind come back on the next open.
    pub async fn set_data_loaded(&mut self, loaded: bool) -> WrappedResult<()> {
        self.data_loaded = loaded;
        if loaded {
            return Ok(());
        }

        self.events.clear();
        self.date_range = None;
        self.default_color_id = None;

        let Some(storage) = self.storage.clone() else {
            return Ok(());
        };
        let mut failure = None;
        for name in [keys::EVENTS, keys::DATE_RANGE, keys::DEFAULT_COLOR_ID] {
            if let Err(e) = storage.clear(&scoped_key(&self.scope, name)).await {
                warn!("Failed to clear {} for {}: {}", name, self.scope, e);
                failure.get_or_insert(e);
            }
        }

        match failure {
            Some(e) => {
                self.degrade(&e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Store a fresh fetch: events and range together, plus the color
    pub async fn replace_data(
        &mut self,
        events: Vec<Event>,
        date_range: DateRange,
        default_color_id: Option<&str>,
    ) {
        self.set_events(events).await;
        self.set_date_range(Some(date_range)).await;
        if let Some(color_id) = default_color_id {
            self.set_default_color_id(color_id).await;
        }
        self.data_loaded = true;
    }

    fn parse<T: DeserializeOwned>(&self, name: &str, raw: &str) -> Option<T> {
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable {} for {}: {}", name, self.scope, e);
                None
            }
        }
    }

    async fn load_raw(&mut self, name: &str) -> Option<String> {
        let storage = self.storage.clone()?;
        match storage.load(&scoped_key(&self.scope, name)).await {
            Ok(value) => value,
            Err(e) => {
                self.degrade(&e);
                None
            }
        }
    }

    async fn save_raw(&mut self, name: &str, value: &str) {
        let Some(storage) = self.storage.clone() else {
            return;
        };
        if let Err(e) = storage.save(&scoped_key(&self.scope, name), value).await {
            self.degrade(&e);
        }
    }

    fn degrade(&mut self, error: &crate::error::Error) {
        warn!(
            "Storage unavailable for {}, continuing in memory: {}",
            self.scope, error
        );
        self.storage = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::event_store::storage::InMemoryStorage;
    use chrono::DateTime;

    fn sample_event() -> Event {
        Event::new(
            "e1",
            DateTime::parse_from_rfc3339("2024-01-05T09:00:00+00:00").unwrap(),
            DateTime::parse_from_rfc3339("2024-01-05T10:00:00+00:00").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut store = EventStore::new("s1", storage.clone());
        assert!(!store.is_initialized());

        store.initialize().await;
        assert!(store.is_initialized());
        assert!(!store.is_data_loaded());
        assert!(store.events().is_empty());

        // A second call does not reload
        storage
            .save(&scoped_key("s1", keys::DEFAULT_COLOR_ID), "4")
            .await
            .unwrap();
        store.initialize().await;
        assert_eq!(store.default_color_id(), None);
    }

    #[tokio::test]
    async fn test_scoped_keys() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut store = EventStore::open("abc", storage.clone()).await;
        store.set_events(vec![sample_event()]).await;

        assert!(storage
            .load("wrapped:abc:calendarEvents")
            .await
            .unwrap()
            .is_some());

        let other = EventStore::open("other", storage).await;
        assert!(other.events().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let mut store = EventStore::in_memory("s");
        store.initialize().await;
        store.set_events(vec![sample_event()]).await;
        assert!(!store.is_persistent());
        assert_eq!(store.events().len(), 1);
    }
}

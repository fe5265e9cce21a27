//! Session-scoped event store and its persistence port

pub mod models;
pub mod redis_storage;
pub mod storage;
pub mod store;

pub use models::{DateRange, Event, EventTime};
pub use redis_storage::RedisStorage;
pub use storage::{InMemoryStorage, StateStorage};
pub use store::EventStore;

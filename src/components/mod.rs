// Export components
pub mod event_store;
pub mod google_calendar;
pub mod wrapped;

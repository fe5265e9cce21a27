//! Google OAuth and Calendar API clients

pub mod client;
pub mod models;
pub mod token;

pub use client::{CalendarApi, GoogleCalendarClient};
pub use models::{CalendarEvent, CalendarSummary};
pub use token::{TokenData, TokenManager, TokenStatus};

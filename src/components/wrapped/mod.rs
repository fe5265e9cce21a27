//! Aggregation engine for the wrapped dashboard

pub mod palette;
pub mod stats;
pub mod summary;

pub use palette::{ChartData, PaletteColor, PALETTE};
pub use summary::{LongestEvent, WrappedSummary};

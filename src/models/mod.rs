//! Data models for AgriBoost services and views
//!
//! Each model represents the output/response of a service operation or the
//! state a view keeps between user actions.

pub mod chart;
pub mod chat;
pub mod market;

// Re-export commonly used types for convenience
pub use chart::{ChartDataset, PricePoint, Series, SeriesPoint};
pub use chat::{ChatMessage, ChatRole};
pub use market::{MarketUpdates, SourceLink};

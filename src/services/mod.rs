//! Service layer: prompt construction and provider-facing flows.
//!
//! Services catch every provider error at this boundary and convert it to
//! a user-facing display string or an empty dataset; nothing below the
//! view layer ever sees an exception from the provider.

pub mod advisory_service;
pub mod chart_service;
pub mod chat_service;
pub mod disease_service;
pub mod market_service;

/// Shown in place of model output when the provider call fails
pub(crate) const GENERATION_FALLBACK: &str =
    "Error connecting to AgriBoost AI. Please check your API Key connection.";

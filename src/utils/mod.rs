//! # Utilities Module
//!
//! Cross-cutting helpers that don't belong in domain-specific modules.
//!
//! ## Sub-modules
//! - `threading`: Rayon thread pool configuration
//! - `telemetry`: Verbose counters, trace watchlist and the run context

pub mod telemetry;
pub mod threading;

pub use telemetry::{Progress, RunContext, Watchlist};

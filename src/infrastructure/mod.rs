//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - The event bus and its worker pool
//! - Metrics recording
//! - In-memory call implementations

pub mod events;
pub mod metrics;
pub mod telephony;

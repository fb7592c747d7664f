//! Dialplan - call dispatch core for a telephony application runtime
//!
//! Resolves which dial plan entry point handles an inbound call, runs it in
//! an isolated per-call environment and always hangs the call up afterwards.
//! Lifecycle notifications flow through an in-process event bus, and route
//! rules describe which provider carries which destination pattern.

pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use domain::shared::error::DialPlanError;
pub use domain::shared::result::Result;

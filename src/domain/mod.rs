//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Call: the collaborator contract the signalling layer fulfils
//! - Dial plan: entry points, execution environments, dispatch
//! - Dialing: route rule algebra and provider definitions
//! - Shared kernel: errors, events, value objects

pub mod call;
pub mod dial_plan;
pub mod dialing;
pub mod shared;

// Re-export commonly used types
pub use shared::{DialPlanError, Result};

//! Domain result type

use super::error::DialPlanError;

/// Standard result type for dial plan operations
pub type Result<T> = std::result::Result<T, DialPlanError>;

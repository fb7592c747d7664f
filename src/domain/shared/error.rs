//! Domain errors

use thiserror::Error;

/// Errors raised while resolving or dispatching into the dial plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialPlanError {
    #[error("No dialplan entry point for call context '{context}' -- Ignoring call {call_id}!")]
    MissingEntryPoint { call_id: String, context: String },

    #[error("Entry point already registered: {0}")]
    DuplicateEntryPoint(String),

    #[error("Invalid entry point name: {0:?}")]
    InvalidEntryPointName(String),
}

/// Errors raised while composing route rules
#[derive(Error, Debug)]
pub enum RouteDefinitionError {
    #[error("Unrecognized object in route definition for `{operator}`: {operand}")]
    UnrecognizedOperand {
        operator: &'static str,
        operand: String,
    },

    #[error("Invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// The call-termination signal.
///
/// Returned (inside an `anyhow::Error`) from dial-plan code to end the call
/// cleanly. It is not a defect: the dispatch manager turns it into an
/// `after_call` notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("call {call_id} hung up")]
pub struct CallTerminated {
    pub call_id: String,
}

impl CallTerminated {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
        }
    }

    /// Check whether an error raised by a routine is the termination signal
    pub fn is_signal(error: &anyhow::Error) -> bool {
        error.is::<CallTerminated>()
    }
}

/// A routine or handler defect that escaped as a panic rather than a returned error
#[derive(Error, Debug, Clone)]
#[error("panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    /// Build from the payload handed back by `catch_unwind`
    pub fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

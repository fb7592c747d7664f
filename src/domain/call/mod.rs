//! Call bounded context - the call collaborator as seen by the dial plan

use crate::domain::shared::value_objects::{CallId, InboundRequest};
use std::sync::Arc;
use tracing::info;

/// Shared handle to a call, also the payload of `before_call`/`after_call`
pub type CallHandle = Arc<dyn Call>;

/// A live call handed over by the signalling layer
#[cfg_attr(test, mockall::automock)]
pub trait Call: Send + Sync {
    /// Unique call identifier
    fn id(&self) -> CallId;

    /// Context name declared by the signalling layer
    fn context(&self) -> String;

    /// Inbound request descriptor, when the call arrived with one
    fn request(&self) -> Option<InboundRequest>;

    /// Terminate the call. Idempotent and never fails.
    fn hangup(&self);

    /// Per-call tagged diagnostic
    fn log(&self, message: &str) {
        info!(call_id = %self.id(), "{}", message);
    }
}

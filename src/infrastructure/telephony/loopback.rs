//! In-memory call that never touches the network
use crate::domain::call::Call;
use crate::domain::shared::value_objects::{CallId, InboundRequest};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Loopback call
///
/// Keeps a transcript of per-call log lines and counts hangup requests so
/// callers can check the termination contract.
#[derive(Debug)]
pub struct LoopbackCall {
    id: CallId,
    context: String,
    request: Option<InboundRequest>,
    hung_up: AtomicBool,
    hangup_requests: AtomicUsize,
    transcript: Mutex<Vec<String>>,
}

impl LoopbackCall {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            id: CallId::new(),
            context: context.into(),
            request: None,
            hung_up: AtomicBool::new(false),
            hangup_requests: AtomicUsize::new(0),
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Attach an inbound request path such as `/sales`
    pub fn with_request(mut self, path: impl Into<String>) -> Self {
        self.request = Some(InboundRequest::new(path));
        self
    }

    pub fn is_hung_up(&self) -> bool {
        self.hung_up.load(Ordering::Acquire)
    }

    /// How many times `hangup` was invoked, including no-op repeats
    pub fn hangup_requests(&self) -> usize {
        self.hangup_requests.load(Ordering::Acquire)
    }

    pub fn transcript(&self) -> Vec<String> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Call for LoopbackCall {
    fn id(&self) -> CallId {
        self.id
    }

    fn context(&self) -> String {
        self.context.clone()
    }

    fn request(&self) -> Option<InboundRequest> {
        self.request.clone()
    }

    fn hangup(&self) {
        self.hangup_requests.fetch_add(1, Ordering::AcqRel);
        if self.hung_up.swap(true, Ordering::AcqRel) {
            debug!(call_id = %self.id, "Call already hung up");
            return;
        }
        info!(call_id = %self.id, "Call hung up");
    }

    fn log(&self, message: &str) {
        info!(call_id = %self.id, "{}", message);
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

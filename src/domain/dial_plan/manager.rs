//! Dial plan dispatch manager
//!
//! Resolves the entry point for an inbound call, runs it inside a fresh
//! execution environment and makes sure the call is hung up on every exit
//! path.

use super::entry_point::{DialPlan, EntryPoint};
use super::environment::ExecutionEnvironment;
use crate::domain::call::{Call, CallHandle};
use crate::domain::shared::error::{CallTerminated, DialPlanError, Panicked};
use crate::domain::shared::events::{EventPublisher, EventType, Payload};
use crate::domain::shared::result::Result;
use crate::infrastructure::metrics;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, info_span, warn};

/// Hangs the call up when dropped
struct HangupGuard<'a> {
    call: &'a dyn Call,
}

impl Drop for HangupGuard<'_> {
    fn drop(&mut self) {
        self.call.hangup();
    }
}

/// Dispatch manager
pub struct DispatchManager {
    dial_plan: Arc<DialPlan>,
    events: Arc<dyn EventPublisher>,
    request_override: bool,
}

impl DispatchManager {
    pub fn new(dial_plan: Arc<DialPlan>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            dial_plan,
            events,
            request_override: true,
        }
    }

    /// Enable or disable entry point selection from the inbound request path
    pub fn with_request_override(mut self, enabled: bool) -> Self {
        self.request_override = enabled;
        self
    }

    pub fn dial_plan(&self) -> &DialPlan {
        &self.dial_plan
    }

    /// Handle one call on the calling thread
    ///
    /// Only a missing entry point is reported back to the caller. Routine
    /// defects are published as `exception` events instead.
    pub fn handle(&self, call: CallHandle) -> Result<()> {
        let span = info_span!("call", call_id = %call.id(), context = %call.context());
        let _entered = span.enter();
        let _hangup = HangupGuard {
            call: call.as_ref(),
        };
        metrics::record_call_handled();

        self.events
            .trigger_immediately(EventType::BEFORE_CALL.into(), call_payload(&call));
        info!("Handling call with ID {}", call.id());

        let Some(entry_point) = self.entry_point_for(call.as_ref()).cloned() else {
            let err = DialPlanError::MissingEntryPoint {
                call_id: call.id().to_string(),
                context: call.context(),
            };
            call.log(&err.to_string());
            metrics::record_call_failed("missing_entry_point");
            return Err(err);
        };

        let mut environment = ExecutionEnvironment::new(Arc::clone(&call), entry_point);
        environment.bind_entry_points(&self.dial_plan);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| environment.run()))
            .unwrap_or_else(|payload| Err(Panicked::from_payload(payload).into()));

        match outcome {
            Ok(()) => {
                call.log(&format!("Dialplan completed for call with id {}", call.id()));
                self.events
                    .trigger_immediately(EventType::AFTER_CALL.into(), call_payload(&call));
            }
            Err(e) if CallTerminated::is_signal(&e) => {
                call.log(&format!("Hangup event for call with id {}", call.id()));
                self.events
                    .trigger_immediately(EventType::AFTER_CALL.into(), call_payload(&call));
            }
            Err(e) => {
                warn!("Dialplan routine failed for call {}: {:#}", call.id(), e);
                metrics::record_call_failed("routine_defect");
                let payload: Payload = Arc::new(e);
                self.events.trigger(EventType::EXCEPTION.into(), payload);
            }
        }

        Ok(())
    }

    /// Find the entry point by the first path segment of the inbound request,
    /// falling back to the call's own context
    pub fn entry_point_for(&self, call: &dyn Call) -> Option<&EntryPoint> {
        if self.request_override {
            if let Some(request) = call.request() {
                if let Some(requested) = request.first_segment() {
                    if let Some(entry_point) = self.dial_plan.lookup(requested) {
                        return Some(entry_point);
                    }
                    warn!(
                        "Request URI requested context \"{}\" but matching dialplan context not found! Falling back to call context.",
                        requested
                    );
                }
            }
        }

        self.dial_plan.lookup(&call.context())
    }
}

fn call_payload(call: &CallHandle) -> Payload {
    Arc::new(Arc::clone(call))
}

//! Dial plan and event bus metrics
//!
//! Recorded through the `metrics` facade; installing a recorder/exporter is
//! left to the embedding process.

use metrics::{counter, describe_counter};

/// Describe every metric this crate records
pub fn describe_metrics() {
    describe_counter!(
        "dialplan_calls_total",
        "Total number of calls handed to the dispatch manager"
    );
    describe_counter!(
        "dialplan_calls_failed",
        "Calls whose dial plan failed, by reason"
    );
    describe_counter!(
        "dialplan_events_dispatched_total",
        "Events dispatched to handlers, by event type"
    );
    describe_counter!(
        "dialplan_handler_failures_total",
        "Event handlers that returned an error or panicked, by event type"
    );
}

/// Record a call entering the dispatch manager
pub fn record_call_handled() {
    counter!("dialplan_calls_total").increment(1);
}

/// Record a call whose dial plan failed
pub fn record_call_failed(reason: &str) {
    counter!("dialplan_calls_failed", "reason" => reason.to_string()).increment(1);
}

/// Record an event dispatch
pub fn record_event_dispatched(event_type: &str) {
    counter!("dialplan_events_dispatched_total", "type" => event_type.to_string()).increment(1);
}

/// Record a failed event handler
pub fn record_handler_failure(event_type: &str) {
    counter!("dialplan_handler_failures_total", "type" => event_type.to_string()).increment(1);
}

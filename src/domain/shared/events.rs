//! Domain events infrastructure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Type-erased event payload shared between every handler of one event
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Event type tag
///
/// Tags are not unique: many events share a type and many handlers may be
/// registered for one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    pub const BEFORE_CALL: EventType = EventType(Cow::Borrowed("before_call"));
    pub const AFTER_CALL: EventType = EventType(Cow::Borrowed("after_call"));
    pub const EXCEPTION: EventType = EventType(Cow::Borrowed("exception"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// One or more type tags an event is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypes(Vec<EventType>);

impl EventTypes {
    pub fn iter(&self) -> impl Iterator<Item = &EventType> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<EventType> for EventTypes {
    fn from(event_type: EventType) -> Self {
        Self(vec![event_type])
    }
}

impl From<&'static str> for EventTypes {
    fn from(name: &'static str) -> Self {
        Self(vec![EventType::from(name)])
    }
}

impl From<String> for EventTypes {
    fn from(name: String) -> Self {
        Self(vec![EventType::from(name)])
    }
}

impl From<Vec<String>> for EventTypes {
    fn from(names: Vec<String>) -> Self {
        Self(names.into_iter().map(EventType::from).collect())
    }
}

impl From<Vec<EventType>> for EventTypes {
    fn from(types: Vec<EventType>) -> Self {
        Self(types)
    }
}

impl<const N: usize> From<[EventType; N]> for EventTypes {
    fn from(types: [EventType; N]) -> Self {
        Self(types.into())
    }
}

impl<const N: usize> From<[&'static str; N]> for EventTypes {
    fn from(types: [&'static str; N]) -> Self {
        Self(types.into_iter().map(EventType::from).collect())
    }
}

/// Event metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    pub fn new() -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Port through which the domain announces lifecycle events
///
/// `trigger` must return without waiting for handlers; `trigger_immediately`
/// must return only after every matching handler has run.
pub trait EventPublisher: Send + Sync {
    /// Queue an event for asynchronous delivery
    fn trigger(&self, types: EventTypes, payload: Payload);

    /// Deliver an event on the calling thread
    fn trigger_immediately(&self, types: EventTypes, payload: Payload);
}

//! Handler registrations and payload guards

use crate::domain::shared::events::{EventMetadata, EventType, Payload};
use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// An event as delivered to a handler
#[derive(Clone)]
pub struct Event {
    pub event_type: EventType,
    pub payload: Payload,
    pub metadata: EventMetadata,
}

impl Event {
    pub fn new(event_type: EventType, payload: Payload) -> Self {
        Self {
            event_type,
            payload,
            metadata: EventMetadata::new(),
        }
    }

    /// Downcast the payload
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Handler callback; errors are republished as `exception` events
pub type HandlerFn = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

type GuardCheck = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> bool + Send + Sync>;

/// Restricts a handler to payloads of a given type or capability
///
/// Type guards compare equal by `TypeId`, capability guards by name.
#[derive(Clone)]
pub struct Guard {
    name: Cow<'static, str>,
    type_id: Option<TypeId>,
    check: GuardCheck,
}

impl Guard {
    /// Payload must be a `T`
    pub fn of<T: Any>() -> Self {
        Self {
            name: Cow::Borrowed(type_name::<T>()),
            type_id: Some(TypeId::of::<T>()),
            check: Arc::new(|payload: &(dyn Any + Send + Sync)| payload.is::<T>()),
        }
    }

    /// Payload must satisfy `predicate`
    pub fn capability<F>(name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync)) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            type_id: None,
            check: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn admits(&self, payload: &Payload) -> bool {
        (self.check)(payload.as_ref())
    }
}

impl PartialEq for Guard {
    fn eq(&self, other: &Self) -> bool {
        match (self.type_id, other.type_id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.name == other.name,
            _ => false,
        }
    }
}

impl Eq for Guard {}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.name).finish()
    }
}

/// (type, guard, callback)
#[derive(Clone)]
pub struct HandlerRegistration {
    pub event_type: EventType,
    pub guard: Option<Guard>,
    pub callback: HandlerFn,
}

impl HandlerRegistration {
    pub fn admits(&self, payload: &Payload) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard.admits(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dtmf(char);

    #[test]
    fn test_type_guard() {
        let guard = Guard::of::<Dtmf>();
        assert!(guard.admits(&(Arc::new(Dtmf('5')) as Payload)));
        assert!(!guard.admits(&(Arc::new("5") as Payload)));
    }

    #[test]
    fn test_capability_guard() {
        let guard = Guard::capability("star_key", |payload| {
            payload
                .downcast_ref::<Dtmf>()
                .is_some_and(|dtmf| dtmf.0 == '*')
        });
        assert!(guard.admits(&(Arc::new(Dtmf('*')) as Payload)));
        assert!(!guard.admits(&(Arc::new(Dtmf('1')) as Payload)));
        assert_eq!(guard, Guard::capability("star_key", |_| true));
    }

    #[test]
    fn test_type_guard_equality_uses_type_identity() {
        assert_eq!(Guard::of::<Dtmf>(), Guard::of::<Dtmf>());
        assert_ne!(Guard::of::<Dtmf>(), Guard::of::<String>());
        assert_ne!(
            Guard::of::<Dtmf>(),
            Guard::capability(type_name::<Dtmf>(), |payload| payload.is::<Dtmf>())
        );
    }

    #[test]
    fn test_event_payload_downcast() {
        let event = Event::new(EventType::from("dtmf"), Arc::new(Dtmf('#')));
        assert_eq!(event.payload::<Dtmf>().map(|d| d.0), Some('#'));
        assert!(event.payload::<String>().is_none());
    }
}

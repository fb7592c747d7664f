//! Event bus
//!
//! Two delivery modes:
//! - `trigger` queues the event for a pool of workers and returns at once
//! - `trigger_immediately` runs every matching handler on the calling thread
//!
//! `trigger`/`trigger_immediately` come from [`EventPublisher`] and take an
//! already shared [`Payload`]; `trigger_value`/`trigger_value_immediately`
//! wrap a plain value.
//!
//! Workers hand each event to the blocking thread pool, so handlers may block
//! without stalling the runtime.
//!
//! A handler that fails (or panics) is reported as an `exception` event and
//! never stops delivery to the remaining handlers.

use super::handler::{Event, Guard, HandlerRegistration};
use crate::config::EventsConfig;
use crate::domain::shared::error::Panicked;
use crate::domain::shared::events::{EventPublisher, EventType, EventTypes, Payload};
use crate::infrastructure::metrics;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("event bus needs at least one worker, got {0}")]
    InvalidWorkerCount(usize),

    #[error("event bus must be started inside a tokio runtime")]
    NoRuntime,
}

/// State shared by the bus front end and its workers
struct Inner {
    handlers: RwLock<HashMap<EventType, Vec<HandlerRegistration>>>,
    queue: mpsc::UnboundedSender<Event>,
    running: AtomicBool,
}

impl Inner {
    fn enqueue(&self, event: Event) {
        if !self.running.load(Ordering::Acquire) {
            warn!("Event bus stopped, dropping {} event", event.event_type);
            return;
        }
        if self.queue.send(event).is_err() {
            warn!("Event queue closed, dropping event");
        }
    }

    /// Snapshot the registrations so handlers may (un)register while running
    fn handlers_for(&self, event: &Event) -> Vec<HandlerRegistration> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .get(&event.event_type)
            .map(|registrations| {
                registrations
                    .iter()
                    .filter(|registration| registration.admits(&event.payload))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn dispatch(&self, event: &Event) {
        let handlers = self.handlers_for(event);
        debug!(
            "Dispatching {} event {} to {} handler(s)",
            event.event_type,
            event.metadata.event_id,
            handlers.len()
        );
        metrics::record_event_dispatched(event.event_type.as_str());

        for registration in handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (registration.callback)(event)))
                .unwrap_or_else(|payload| Err(Panicked::from_payload(payload).into()));

            if let Err(e) = outcome {
                self.report_failure(&event.event_type, e);
            }
        }
    }

    /// Republish a handler failure as one `exception` event
    ///
    /// Failures of `exception` handlers themselves are logged and dropped.
    fn report_failure(&self, event_type: &EventType, error: anyhow::Error) {
        metrics::record_handler_failure(event_type.as_str());

        if *event_type == EventType::EXCEPTION {
            error!("Exception handler failed: {:#}", error);
            return;
        }

        warn!("Handler for {} event failed: {:#}", event_type, error);
        let payload: Payload = Arc::new(error);
        self.enqueue(Event::new(EventType::EXCEPTION, payload));
    }
}

/// Process-wide publish/subscribe facility
pub struct EventBus {
    inner: Arc<Inner>,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl EventBus {
    /// Create the bus and spawn its worker pool on the current tokio runtime
    pub fn start(config: &EventsConfig) -> Result<Self, EventBusError> {
        if config.workers == 0 {
            return Err(EventBusError::InvalidWorkerCount(config.workers));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EventBusError::NoRuntime)?;

        let (queue, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let inner = Arc::new(Inner {
            handlers: RwLock::new(HashMap::new()),
            queue,
            running: AtomicBool::new(true),
        });

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let workers = (0..config.workers)
            .map(|id| {
                runtime.spawn(run_worker(
                    id,
                    Arc::clone(&inner),
                    Arc::clone(&receiver),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        info!("Event bus started with {} worker(s)", config.workers);
        Ok(Self {
            inner,
            shutdown,
            workers: Mutex::new(workers),
        })
    }

    /// Queue a plain value for asynchronous delivery
    ///
    /// Forward an existing [`Payload`] with `trigger` instead; wrapping it
    /// here would hide its type from guards and downcasts.
    pub fn trigger_value<P>(&self, types: impl Into<EventTypes>, payload: P)
    where
        P: Any + Send + Sync,
    {
        self.publish(types.into(), Arc::new(payload));
    }

    /// Deliver a plain value to every matching handler before returning
    pub fn trigger_value_immediately<P>(&self, types: impl Into<EventTypes>, payload: P)
    where
        P: Any + Send + Sync,
    {
        self.publish_immediately(types.into(), Arc::new(payload));
    }

    /// Queue an already shared payload
    pub fn publish(&self, types: EventTypes, payload: Payload) {
        for event_type in types.iter() {
            self.inner
                .enqueue(Event::new(event_type.clone(), Arc::clone(&payload)));
        }
    }

    /// Deliver an already shared payload on the calling thread
    pub fn publish_immediately(&self, types: EventTypes, payload: Payload) {
        for event_type in types.iter() {
            self.inner
                .dispatch(&Event::new(event_type.clone(), Arc::clone(&payload)));
        }
    }

    /// Register a callback for `event_type`, optionally guarded by payload type
    ///
    /// An error or panic from the callback becomes one `exception` event,
    /// except for `exception` handlers: their failures are only logged.
    pub fn register_handler<F>(&self, event_type: impl Into<EventType>, guard: Option<Guard>, callback: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        debug!(
            "Registering {} handler (guard: {})",
            event_type,
            guard.as_ref().map_or("none", Guard::name)
        );

        let registration = HandlerRegistration {
            event_type: event_type.clone(),
            guard,
            callback: Arc::new(callback),
        };
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push(registration);
    }

    /// Remove the registrations for `event_type` whose guard equals `guard`
    ///
    /// `None` removes only unguarded handlers. Returns how many were removed.
    pub fn clear_handlers(&self, event_type: impl Into<EventType>, guard: Option<&Guard>) -> usize {
        let event_type = event_type.into();
        let mut handlers = self
            .inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(registrations) = handlers.get_mut(&event_type) else {
            return 0;
        };
        let before = registrations.len();
        registrations.retain(|registration| registration.guard.as_ref() != guard);
        let removed = before - registrations.len();
        if registrations.is_empty() {
            handlers.remove(&event_type);
        }

        debug!("Cleared {} {} handler(s)", removed, event_type);
        removed
    }

    pub fn handler_count(&self, event_type: impl Into<EventType>) -> usize {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type.into())
            .map_or(0, Vec::len)
    }

    /// Register several type-keyed handlers in one block
    pub fn draw(&self, f: impl FnOnce(&mut HandlerDrawer<'_>)) {
        let mut drawer = HandlerDrawer { bus: self };
        f(&mut drawer);
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Stop the worker pool. Events still queued are dropped.
    pub async fn shutdown(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown.send(true);

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Event worker ended abnormally: {}", e);
            }
        }
        info!("Event bus stopped");
    }
}

impl EventPublisher for EventBus {
    fn trigger(&self, types: EventTypes, payload: Payload) {
        self.publish(types, payload);
    }

    fn trigger_immediately(&self, types: EventTypes, payload: Payload) {
        self.publish_immediately(types, payload);
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::Release);
        let _ = self.shutdown.send(true);
    }
}

async fn run_worker(
    id: usize,
    inner: Arc<Inner>,
    queue: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("Event worker {} started", id);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = {
            let mut queue = queue.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.changed() => None,
                event = queue.recv() => event,
            }
        };

        let Some(event) = next else {
            break;
        };

        // Handlers are synchronous user code
        let inner = Arc::clone(&inner);
        if let Err(e) = tokio::task::spawn_blocking(move || inner.dispatch(&event)).await {
            error!("Event worker {} lost a dispatch: {}", id, e);
        }
    }

    debug!("Event worker {} stopped", id);
}

/// Declarative registration: one call per declared type
pub struct HandlerDrawer<'a> {
    bus: &'a EventBus,
}

impl HandlerDrawer<'_> {
    pub fn on<F>(&mut self, event_type: impl Into<EventType>, callback: F) -> &mut Self
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.register_handler(event_type, None, callback);
        self
    }

    pub fn on_guarded<F>(&mut self, event_type: impl Into<EventType>, guard: Guard, callback: F) -> &mut Self
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.register_handler(event_type, Some(guard), callback);
        self
    }

    pub fn before_call<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(EventType::BEFORE_CALL, callback)
    }

    pub fn after_call<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(EventType::AFTER_CALL, callback)
    }

    pub fn exception<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(EventType::EXCEPTION, callback)
    }
}

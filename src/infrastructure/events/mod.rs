//! In-process event bus for call lifecycle notifications

pub mod bus;
pub mod handler;

pub use bus::{EventBus, EventBusError, HandlerDrawer};
pub use handler::{Event, Guard, HandlerFn, HandlerRegistration};

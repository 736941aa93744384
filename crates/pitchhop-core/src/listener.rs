//! Event fan-out to registered listeners.
//!
//! Every listener call returns a `Result`. A failing or panicking listener is
//! logged and skipped; delivery to the remaining listeners continues.

use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::warn;

/// Error returned by a listener that could not handle an event.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// An event that can be published through a [`ListenerRegistry`].
pub trait Event {
    /// Whether the event carries a detected pitch.
    ///
    /// Listeners registered with [`Delivery::PitchedOnly`] only see events
    /// returning `true`.
    fn has_pitch(&self) -> bool {
        true
    }
}

/// Receiver of events of type `E`.
///
/// Implemented for any `FnMut(&E) -> Result<(), ListenerError> + Send`.
pub trait Listener<E>: Send {
    fn on_event(&mut self, event: &E) -> Result<(), ListenerError>;
}

impl<E, F> Listener<E> for F
where
    F: FnMut(&E) -> Result<(), ListenerError> + Send,
{
    fn on_event(&mut self, event: &E) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Which events a listener wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Every published event
    #[default]
    EveryEvent,
    /// Only events with a detected pitch
    PitchedOnly,
}

/// Handle used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry<E> {
    id: ListenerId,
    delivery: Delivery,
    listener: Box<dyn Listener<E>>,
}

/// Ordered list of listeners for one event type.
pub struct ListenerRegistry<E> {
    entries: Vec<Entry<E>>,
    next_id: u64,
}

impl<E: Event> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn add<L>(&mut self, delivery: Delivery, listener: L) -> ListenerId
    where
        L: Listener<E> + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            delivery,
            listener: Box::new(listener),
        });
        id
    }

    /// Remove a listener. Returns false if the id is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver `event` to every interested listener.
    ///
    /// Returns the number of listeners that handled the event successfully.
    pub fn publish(&mut self, event: &E) -> usize {
        let pitched = event.has_pitch();
        let mut delivered = 0;

        for entry in self.entries.iter_mut() {
            if entry.delivery == Delivery::PitchedOnly && !pitched {
                continue;
            }
            let listener = &mut entry.listener;
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!("Listener {:?} failed: {}", entry.id, e),
                Err(payload) => warn!(
                    "Listener {:?} panicked: {}",
                    entry.id,
                    panic_message(payload.as_ref())
                ),
            }
        }

        delivered
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl<E: Event> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

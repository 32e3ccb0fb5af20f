//! Observation hooks for chain wrappers.
//!
//! A wrapper that wants to be observable keeps an [`EventListeners`] list in
//! its configuration and hands it one event per notable moment of a call.
//! Listeners only watch: they get a shared reference to the event, return
//! nothing, and a listener that panics is skipped over instead of unwinding
//! into the chain.
//!
//! ```
//! use std::time::Instant;
//! use wrapchain_core::{ChainEvent, EventListeners};
//!
//! #[derive(Debug)]
//! struct Sent {
//!     chain: String,
//!     at: Instant,
//! }
//!
//! impl ChainEvent for Sent {
//!     fn event_type(&self) -> &'static str {
//!         "sent"
//!     }
//!     fn timestamp(&self) -> Instant {
//!         self.at
//!     }
//!     fn chain_name(&self) -> &str {
//!         &self.chain
//!     }
//! }
//!
//! let mut listeners = EventListeners::new();
//! listeners.on(|event: &Sent| println!("{} {}", event.chain_name(), event.event_type()));
//!
//! listeners.emit(&Sent { chain: "sender".into(), at: Instant::now() });
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Something a chain wrapper reports about a call.
pub trait ChainEvent: Send + Sync + fmt::Debug {
    /// Short lowercase tag, stable across releases: `"delivered"`,
    /// `"completed"` and so on.
    fn event_type(&self) -> &'static str;

    /// When the wrapper observed it.
    fn timestamp(&self) -> Instant;

    /// Name given to the chain or wrapper at build time.
    fn chain_name(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: ChainEvent>: Send + Sync {
    /// Called once per emitted event.
    fn on_event(&self, event: &E);
}

/// Shared handle to a listener.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// Listeners attached to one wrapper, notified in the order they were added.
pub struct EventListeners<E: ChainEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ChainEvent> EventListeners<E> {
    /// An empty list.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Appends `listener`.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Appends a closure as a listener.
    pub fn on<F>(&mut self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.add(FnListener::new(f));
    }

    /// Hands `event` to every listener.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            dispatch(listener.as_ref(), event);
        }
    }

    /// `true` when nothing is listening, so callers can skip building events.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

fn dispatch<E: ChainEvent>(listener: &dyn EventListener<E>, event: &E) {
    let caught = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));

    #[cfg(feature = "tracing")]
    {
        if caught.is_err() {
            tracing::warn!(
                chain = %event.chain_name(),
                event_type = event.event_type(),
                "event listener panicked"
            );
        }
    }

    #[cfg(not(feature = "tracing"))]
    let _ = caught;
}

impl<E: ChainEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: ChainEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ChainEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure to [`EventListener`].
#[derive(Clone)]
pub struct FnListener<F>(F);

impl<F> FnListener<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<E, F> EventListener<E> for FnListener<F>
where
    E: ChainEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.0)(event)
    }
}

//! Core infrastructure for wrapchain.
//!
//! Shared by the transform pipeline and the interceptor chain:
//! - [`compose`], the onion fold that nests an ordered list of wrappers
//!   around a terminal
//! - an event system used by every wrapper for observability

pub mod compose;
pub mod events;

pub use compose::compose;
pub use events::{ChainEvent, EventListener, EventListeners, FnListener};

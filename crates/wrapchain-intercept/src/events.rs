//! Events emitted by the timing interceptor.

use std::fmt;
use std::time::{Duration, Instant};
use wrapchain_core::ChainEvent;

/// How a timed call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingOutcome {
    /// The downstream chain returned a response.
    Success,
    /// The downstream chain returned an error.
    Error,
    /// The call was dropped before it completed.
    Cancelled,
}

impl TimingOutcome {
    /// Returns the outcome as a lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingOutcome::Success => "success",
            TimingOutcome::Error => "error",
            TimingOutcome::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TimingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the timing interceptor.
#[derive(Debug, Clone)]
pub enum TimingEvent {
    /// A request entered the interceptor.
    Started {
        /// Name of the timing instance.
        chain_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// A request left the interceptor.
    Completed {
        /// Name of the timing instance.
        chain_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Time spent in the downstream chain.
        duration: Duration,
        /// How the call ended.
        outcome: TimingOutcome,
    },
}

impl ChainEvent for TimingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimingEvent::Started { .. } => "started",
            TimingEvent::Completed { .. } => "completed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimingEvent::Started { timestamp, .. } | TimingEvent::Completed { timestamp, .. } => {
                *timestamp
            }
        }
    }

    fn chain_name(&self) -> &str {
        match self {
            TimingEvent::Started { chain_name, .. } | TimingEvent::Completed { chain_name, .. } => {
                chain_name
            }
        }
    }
}

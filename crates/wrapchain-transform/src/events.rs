//! Events emitted by a [`Pipeline`](crate::Pipeline).

use crate::error::TransformErrorKind;
use std::time::{Duration, Instant};
use wrapchain_core::ChainEvent;

/// Events emitted once per pipeline invocation.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Every stage succeeded and the sink accepted the payload.
    Delivered {
        /// Name of the pipeline.
        chain_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Size of the payload handed to the outermost stage.
        input_len: usize,
        /// Size of the payload returned by the sink.
        output_len: usize,
        /// Time spent in the whole chain.
        duration: Duration,
    },

    /// A stage or the sink failed; nothing past it ran.
    Failed {
        /// Name of the pipeline.
        chain_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Name of the failing stage.
        stage: &'static str,
        /// Category of the failure.
        kind: TransformErrorKind,
    },
}

impl ChainEvent for PipelineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::Delivered { .. } => "delivered",
            PipelineEvent::Failed { .. } => "failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PipelineEvent::Delivered { timestamp, .. } | PipelineEvent::Failed { timestamp, .. } => {
                *timestamp
            }
        }
    }

    fn chain_name(&self) -> &str {
        match self {
            PipelineEvent::Delivered { chain_name, .. }
            | PipelineEvent::Failed { chain_name, .. } => chain_name,
        }
    }
}

//! Terminal links of a transform chain.

use crate::error::{BoxError, TransformError};
use crate::operate::Operate;
use bytes::Bytes;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const SINK: &str = "sink";

/// A sink that records every payload it receives.
///
/// Clones share the same record, so a caller keeps one handle and moves the
/// other into the pipeline. Each delivery is returned unchanged.
#[derive(Clone, Default)]
pub struct MemorySink {
    deliveries: Arc<Mutex<Vec<Bytes>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recent delivery.
    pub fn last(&self) -> Option<Bytes> {
        self.lock().last().cloned()
    }

    /// Returns all deliveries, oldest first.
    pub fn deliveries(&self) -> Vec<Bytes> {
        self.lock().clone()
    }

    /// Returns the number of deliveries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets all deliveries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Bytes>> {
        // A panic while holding the lock cannot leave a Vec half-pushed.
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Operate for MemorySink {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        self.lock().push(input.clone());
        Ok(input)
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("deliveries", &self.len())
            .finish()
    }
}

/// A sink that hands the payload straight back.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Operate for Passthrough {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        Ok(input)
    }
}

/// Builds a sink from a closure, e.g. one that writes to a socket.
///
/// Errors returned by the closure reach the caller as
/// [`TransformErrorKind::Propagated`](crate::TransformErrorKind::Propagated)
/// with the original error as source.
pub fn sink_fn<F, E>(f: F) -> SinkFn<F>
where
    F: Fn(Bytes) -> Result<Bytes, E> + Send + Sync,
    E: Into<BoxError>,
{
    SinkFn { f }
}

/// Sink produced by [`sink_fn`].
#[derive(Clone)]
pub struct SinkFn<F> {
    f: F,
}

impl<F, E> Operate for SinkFn<F>
where
    F: Fn(Bytes) -> Result<Bytes, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        (self.f)(input).map_err(|err| TransformError::propagated(SINK, err))
    }
}

impl<F> fmt::Debug for SinkFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkFn").finish_non_exhaustive()
    }
}

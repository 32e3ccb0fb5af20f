//! The contract shared by every stage and sink.

use crate::error::TransformError;
use crate::kind::StageKind;
use crate::pipeline::StageLayer;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tower_layer::Layer;

/// A link in a transform chain.
///
/// Stages apply their own transform and hand the result to their
/// downstream; sinks accept the final bytes and return them. An
/// implementation holds no per-call state, so one chain can serve any
/// number of concurrent callers.
pub trait Operate: Send + Sync {
    /// Runs `input` through this link and everything downstream of it.
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError>;
}

/// A type-erased chain link.
pub type BoxOperate = Box<dyn Operate>;

impl<O: Operate + ?Sized> Operate for Box<O> {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        (**self).operate(input)
    }
}

impl<O: Operate + ?Sized> Operate for Arc<O> {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        (**self).operate(input)
    }
}

impl<O: Operate + ?Sized> Operate for &O {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        (**self).operate(input)
    }
}

/// Builds a custom stage from a closure.
///
/// Custom stages take part in composition like the built-in ones, but have
/// no known inverse, so [`check_mirror`](crate::check_mirror) reports them
/// as unverifiable.
///
/// ```
/// use bytes::Bytes;
/// use wrapchain_transform::{stage_fn, MemorySink, Operate, Pipeline};
///
/// let upper = stage_fn("uppercase", |input: Bytes| {
///     Ok(Bytes::from(input.to_ascii_uppercase()))
/// });
///
/// let sink = MemorySink::new();
/// let pipeline = Pipeline::builder().stage(upper).build(sink.clone());
///
/// pipeline.operate(Bytes::from_static(b"hello")).unwrap();
/// assert_eq!(sink.last().unwrap(), Bytes::from_static(b"HELLO"));
/// ```
pub fn stage_fn<F>(name: &'static str, f: F) -> FnStageLayer<F>
where
    F: Fn(Bytes) -> Result<Bytes, TransformError> + Send + Sync + 'static,
{
    FnStageLayer {
        name,
        f: Arc::new(f),
    }
}

/// Layer produced by [`stage_fn`].
pub struct FnStageLayer<F> {
    name: &'static str,
    f: Arc<F>,
}

impl<F> Clone for FnStageLayer<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            f: Arc::clone(&self.f),
        }
    }
}

impl<F> fmt::Debug for FnStageLayer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStageLayer")
            .field("name", &self.name)
            .finish()
    }
}

impl<F, S> Layer<S> for FnStageLayer<F> {
    type Service = FnStage<F, S>;

    fn layer(&self, inner: S) -> Self::Service {
        FnStage {
            name: self.name,
            f: Arc::clone(&self.f),
            inner,
        }
    }
}

impl<F> StageLayer for FnStageLayer<F>
where
    F: Fn(Bytes) -> Result<Bytes, TransformError> + Send + Sync + 'static,
{
    fn kind(&self) -> StageKind {
        StageKind::Custom(self.name)
    }

    fn wrap(&self, downstream: BoxOperate) -> BoxOperate {
        Box::new(self.layer(downstream))
    }
}

/// A closure-backed stage wrapping `S`.
pub struct FnStage<F, S> {
    name: &'static str,
    f: Arc<F>,
    inner: S,
}

impl<F, S> Operate for FnStage<F, S>
where
    F: Fn(Bytes) -> Result<Bytes, TransformError> + Send + Sync,
    S: Operate,
{
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        let output = (self.f)(input)?;
        self.inner.operate(output)
    }
}

impl<F, S: fmt::Debug> fmt::Debug for FnStage<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .finish()
    }
}

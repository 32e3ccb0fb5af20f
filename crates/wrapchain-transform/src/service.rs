//! Adapter exposing a transform chain as a `tower::Service`.

use crate::error::TransformError;
use crate::operate::Operate;
use bytes::Bytes;
use futures::future::{ready, Ready};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_service::Service;

/// A `Service<Bytes>` that runs each request through a chain.
///
/// The chain is synchronous, so the returned future is already complete.
/// Clones share the chain.
///
/// ```
/// use bytes::Bytes;
/// use tower::{Service, ServiceExt};
/// use wrapchain_transform::{CompressLayer, Passthrough, Pipeline};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut service = Pipeline::builder()
///     .stage(CompressLayer::new())
///     .build(Passthrough)
///     .into_service();
///
/// let compressed = service
///     .ready()
///     .await
///     .unwrap()
///     .call(Bytes::from_static(b"Hello World"))
///     .await
///     .unwrap();
/// assert!(!compressed.is_empty());
/// # }
/// ```
#[derive(Debug)]
pub struct OperateService<O> {
    chain: Arc<O>,
}

impl<O> OperateService<O> {
    /// Wraps `chain`.
    pub fn new(chain: O) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }

    /// Returns the wrapped chain.
    pub fn get_ref(&self) -> &O {
        &self.chain
    }
}

impl<O> Clone for OperateService<O> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<O: Operate> Service<Bytes> for OperateService<O> {
    type Response = Bytes;
    type Error = TransformError;
    type Future = Ready<Result<Bytes, TransformError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Bytes) -> Self::Future {
        ready(self.chain.operate(req))
    }
}

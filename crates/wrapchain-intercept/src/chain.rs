//! Runtime-composed handler chains.

use crate::interceptor::{Interceptor, InterceptorLayer};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::util::BoxCloneService;
use tower_layer::Layer;
use tower_service::Service;
use tracing::debug;
use wrapchain_core::compose;

type Wrap<Req, Res, E> =
    Box<dyn FnOnce(BoxCloneService<Req, Res, E>) -> BoxCloneService<Req, Res, E> + Send>;

/// A handler wrapped in an ordered list of interceptors and layers.
///
/// The first wrapper registered is the outermost: it sees the request first
/// and the response last. The chain is itself a `Service` with the
/// handler's response and error types, so it can be used anywhere the bare
/// handler could.
///
/// ```
/// use tower::{service_fn, ServiceExt};
/// use wrapchain_intercept::{interceptor_fn, HandlerChain, Next, TimingLayer};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let chain = HandlerChain::<String, String, String>::builder()
///     .name("greeter")
///     .layer(TimingLayer::named("greeter"))
///     .interceptor(interceptor_fn(|req: String, next: Next<String, String, String>| async move {
///         if req.is_empty() {
///             return Err("empty name".to_string());
///         }
///         next.run(req).await
///     }))
///     .build(service_fn(|name: String| async move { Ok::<_, String>(format!("hello {name}")) }));
///
/// assert_eq!(chain.len(), 2);
/// assert_eq!(chain.clone().oneshot("ada".to_string()).await.unwrap(), "hello ada");
/// assert!(chain.oneshot(String::new()).await.is_err());
/// # }
/// ```
pub struct HandlerChain<Req, Res, E> {
    name: Arc<str>,
    len: usize,
    service: BoxCloneService<Req, Res, E>,
}

impl<Req, Res, E> HandlerChain<Req, Res, E>
where
    Req: Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    /// Creates a new chain builder.
    pub fn builder() -> HandlerChainBuilder<Req, Res, E> {
        HandlerChainBuilder::new()
    }
}

impl<Req, Res, E> HandlerChain<Req, Res, E> {
    /// Returns the chain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of wrappers around the handler.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if requests go straight to the handler.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<Req, Res, E> Clone for HandlerChain<Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            len: self.len,
            service: self.service.clone(),
        }
    }
}

impl<Req, Res, E> fmt::Debug for HandlerChain<Req, Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<Req, Res, E> Service<Req> for HandlerChain<Req, Res, E> {
    type Response = Res;
    type Error = E;
    type Future = BoxFuture<'static, Result<Res, E>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.service.call(req)
    }
}

/// Builder for [`HandlerChain`].
pub struct HandlerChainBuilder<Req, Res, E> {
    name: String,
    wrappers: Vec<Wrap<Req, Res, E>>,
}

impl<Req, Res, E> HandlerChainBuilder<Req, Res, E>
where
    Req: Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    /// Creates a builder with no wrappers.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            wrappers: Vec::new(),
        }
    }

    /// Sets the name of this chain for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends an interceptor.
    pub fn interceptor<I>(self, interceptor: I) -> Self
    where
        I: Interceptor<Req, Res, E>,
    {
        self.layer(InterceptorLayer::new(interceptor))
    }

    /// Appends any Tower layer whose service keeps the handler's types.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxCloneService<Req, Res, E>> + Send + 'static,
        L::Service: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
        <L::Service as Service<Req>>::Future: Send + 'static,
    {
        self.wrappers
            .push(Box::new(move |inner: BoxCloneService<Req, Res, E>| {
                BoxCloneService::new(layer.layer(inner))
            }));
        self
    }

    /// Nests the wrappers around `handler` and returns the finished chain.
    pub fn build<H>(self, handler: H) -> HandlerChain<Req, Res, E>
    where
        H: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
        H::Future: Send + 'static,
    {
        let len = self.wrappers.len();
        let service = compose(self.wrappers, BoxCloneService::new(handler));

        debug!(chain = %self.name, wrappers = len, "handler chain built");

        HandlerChain {
            name: Arc::from(self.name),
            len,
            service,
        }
    }
}

impl<Req, Res, E> Default for HandlerChainBuilder<Req, Res, E>
where
    Req: Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res, E> fmt::Debug for HandlerChainBuilder<Req, Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChainBuilder")
            .field("name", &self.name)
            .field("wrappers", &self.wrappers.len())
            .finish()
    }
}

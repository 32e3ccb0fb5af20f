//! The interceptor contract and its tower adapter.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// The remainder of the chain, as seen from one interceptor.
///
/// `Next` is consumed by [`run`](Next::run), so an interceptor can forward a
/// request at most once. Dropping it without running short-circuits the
/// chain: nothing downstream is invoked.
pub struct Next<Req, Res, E> {
    run: Box<dyn FnOnce(Req) -> BoxFuture<'static, Result<Res, E>> + Send>,
}

impl<Req, Res, E> Next<Req, Res, E> {
    /// Creates a `Next` that forwards to `f`.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Req) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Res, E>> + Send + 'static,
    {
        Self {
            run: Box::new(move |req: Req| -> BoxFuture<'static, Result<Res, E>> {
                Box::pin(f(req))
            }),
        }
    }

    /// Forwards `req` to the rest of the chain.
    pub fn run(self, req: Req) -> BoxFuture<'static, Result<Res, E>> {
        (self.run)(req)
    }
}

impl<Req, Res, E> fmt::Debug for Next<Req, Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Logic that runs around the rest of a handler chain.
///
/// An interceptor may act on the request before calling `next`, act on the
/// response or error after it returns, or answer without calling it at all.
/// Whatever it returns is what its caller sees; errors from downstream
/// should be returned unchanged unless the interceptor's job is to translate
/// them.
pub trait Interceptor<Req, Res, E>: Send + Sync + 'static {
    /// Handles `req`, optionally delegating to `next`.
    fn intercept(&self, req: Req, next: Next<Req, Res, E>) -> BoxFuture<'static, Result<Res, E>>;
}

impl<I, Req, Res, E> Interceptor<Req, Res, E> for Arc<I>
where
    I: Interceptor<Req, Res, E> + ?Sized,
{
    fn intercept(&self, req: Req, next: Next<Req, Res, E>) -> BoxFuture<'static, Result<Res, E>> {
        (**self).intercept(req, next)
    }
}

/// Builds an interceptor from an async closure.
///
/// ```
/// use wrapchain_intercept::{interceptor_fn, Next};
///
/// let auth = interceptor_fn(|req: String, next: Next<String, String, &'static str>| async move {
///     if req.starts_with("token:") {
///         next.run(req).await
///     } else {
///         Err("unauthorized")
///     }
/// });
/// # let _ = auth;
/// ```
pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F> {
    FnInterceptor { f }
}

/// Interceptor produced by [`interceptor_fn`].
#[derive(Clone)]
pub struct FnInterceptor<F> {
    f: F,
}

impl<F, Fut, Req, Res, E> Interceptor<Req, Res, E> for FnInterceptor<F>
where
    F: Fn(Req, Next<Req, Res, E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, E>> + Send + 'static,
{
    fn intercept(&self, req: Req, next: Next<Req, Res, E>) -> BoxFuture<'static, Result<Res, E>> {
        Box::pin((self.f)(req, next))
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").finish_non_exhaustive()
    }
}

/// A Tower layer that places an interceptor in front of a service.
pub struct InterceptorLayer<I> {
    interceptor: Arc<I>,
}

impl<I> InterceptorLayer<I> {
    /// Creates a layer for `interceptor`.
    pub fn new(interceptor: I) -> Self {
        Self {
            interceptor: Arc::new(interceptor),
        }
    }
}

impl<I> Clone for InterceptorLayer<I> {
    fn clone(&self) -> Self {
        Self {
            interceptor: Arc::clone(&self.interceptor),
        }
    }
}

impl<I> fmt::Debug for InterceptorLayer<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorLayer").finish_non_exhaustive()
    }
}

impl<I, S> Layer<S> for InterceptorLayer<I> {
    type Service = Intercepted<I, S>;

    fn layer(&self, inner: S) -> Self::Service {
        Intercepted {
            interceptor: Arc::clone(&self.interceptor),
            inner,
        }
    }
}

/// A service whose calls pass through an interceptor first.
pub struct Intercepted<I, S> {
    interceptor: Arc<I>,
    inner: S,
}

impl<I, S> Intercepted<I, S> {
    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the wrapper and returns the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<I, S: Clone> Clone for Intercepted<I, S> {
    fn clone(&self) -> Self {
        Self {
            interceptor: Arc::clone(&self.interceptor),
            inner: self.inner.clone(),
        }
    }
}

impl<I, S: fmt::Debug> fmt::Debug for Intercepted<I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intercepted")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<I, S, Req> Service<Req> for Intercepted<I, S>
where
    I: Interceptor<Req, S::Response, S::Error>,
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // The instance that was polled ready goes downstream; keep a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let next = Next::new(move |req: Req| inner.call(req));
        self.interceptor.intercept(req, next)
    }
}

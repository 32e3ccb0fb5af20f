//! Turning downstream errors into responses.

use crate::interceptor::{Interceptor, Next};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Predicate selecting which errors a [`Recover`] handles.
pub type RecoverPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Creates an interceptor that answers with `f(error)` whenever the rest of
/// the chain fails.
///
/// Placed outermost, it gives the chain a single place where errors become
/// responses, e.g. an error page or status code.
///
/// ```
/// use tower::{service_fn, ServiceExt};
/// use wrapchain_intercept::{recover, HandlerChain};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let chain = HandlerChain::<(), String, String>::builder()
///     .interceptor(recover(|err: String| format!("500 {err}")))
///     .build(service_fn(|_req: ()| async move { Err::<String, _>("db down".to_string()) }));
///
/// assert_eq!(chain.oneshot(()).await.unwrap(), "500 db down");
/// # }
/// ```
pub fn recover<F, Res, E>(f: F) -> Recover<Res, E>
where
    F: Fn(E) -> Res + Send + Sync + 'static,
{
    Recover {
        f: Arc::new(f),
        predicate: None,
    }
}

/// Interceptor produced by [`recover`].
pub struct Recover<Res, E> {
    f: Arc<dyn Fn(E) -> Res + Send + Sync>,
    predicate: Option<RecoverPredicate<E>>,
}

impl<Res, E> Recover<Res, E> {
    /// Only recovers errors for which `predicate` returns `true`; others
    /// propagate unchanged.
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }
}

impl<Res, E> Clone for Recover<Res, E> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            predicate: self.predicate.clone(),
        }
    }
}

impl<Res, E> fmt::Debug for Recover<Res, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recover")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}

impl<Req, Res, E> Interceptor<Req, Res, E> for Recover<Res, E>
where
    Req: Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    fn intercept(&self, req: Req, next: Next<Req, Res, E>) -> BoxFuture<'static, Result<Res, E>> {
        let f = Arc::clone(&self.f);
        let predicate = self.predicate.clone();

        Box::pin(async move {
            match next.run(req).await {
                Ok(response) => Ok(response),
                Err(err) if predicate.as_ref().map_or(true, |p| p(&err)) => {
                    debug!("recovered downstream error");
                    Ok(f(err))
                }
                Err(err) => Err(err),
            }
        })
    }
}

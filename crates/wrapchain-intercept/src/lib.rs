//! Interceptor chains around Tower handlers.
//!
//! An interceptor runs around the rest of a chain: it sees each request
//! before the handler, sees the response or error afterwards, and may answer
//! on its own without calling further. A [`HandlerChain`] nests an ordered
//! list of interceptors (and any other Tower layers) around a handler and is
//! itself a `tower::Service` with the handler's types.
//!
//! Provides:
//! - The [`Interceptor`] trait, [`Next`] and [`interceptor_fn`]
//! - [`InterceptorLayer`] to use any interceptor as a plain `tower::Layer`
//! - [`TimingLayer`], which logs how long the downstream chain took
//! - [`recover`], which turns downstream errors into responses
//!
//! ## Timing a Handler
//!
//! ```rust
//! use std::time::Duration;
//! use tower::{service_fn, ServiceExt};
//! use wrapchain_intercept::{interceptor_fn, HandlerChain, Next, TimingLayer};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let timing = TimingLayer::builder()
//!     .name("orders")
//!     .slow_threshold(Duration::from_millis(500))
//!     .on_complete(|duration, outcome| println!("{outcome} after {duration:?}"))
//!     .build()
//!     .layer();
//!
//! let auth = interceptor_fn(|req: String, next: Next<String, String, String>| async move {
//!     if req.starts_with("token:") {
//!         next.run(req).await
//!     } else {
//!         Err("unauthorized".to_string())
//!     }
//! });
//!
//! let chain = HandlerChain::<String, String, String>::builder()
//!     .name("orders")
//!     .layer(timing)
//!     .interceptor(auth)
//!     .build(service_fn(|req: String| async move { Ok::<_, String>(format!("ok {req}")) }));
//!
//! let reply = chain.clone().oneshot("token:abc".to_string()).await.unwrap();
//! assert_eq!(reply, "ok token:abc");
//!
//! let denied = chain.oneshot("anonymous".to_string()).await;
//! assert_eq!(denied.unwrap_err(), "unauthorized");
//! # }
//! ```
//!
//! Timing is registered first, so it is outermost and its measurement
//! covers the auth check as well as the handler.
//!
//! ## Typed Composition
//!
//! Every piece here is also a `tower::Layer`, so `tower::ServiceBuilder` can
//! build the same chain without boxing:
//!
//! ```rust
//! use tower::{service_fn, ServiceBuilder, ServiceExt};
//! use wrapchain_intercept::{recover, InterceptorLayer, TimingLayer};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = ServiceBuilder::new()
//!     .layer(TimingLayer::named("typed"))
//!     .layer(InterceptorLayer::new(recover(|err: String| format!("recovered: {err}"))))
//!     .service(service_fn(|_req: u32| async move { Err::<String, _>("boom".to_string()) }));
//!
//! assert_eq!(service.oneshot(1).await.unwrap(), "recovered: boom");
//! # }
//! ```
//!
//! ## Logging
//!
//! Completed requests are logged through `tracing` at `info`, or at `warn`
//! when slower than the configured threshold. Install any subscriber to see
//! them.
//!
//! ## Feature Flags
//!
//! - `metrics`: `wrapchain_timing_duration_seconds` histogram, labelled by
//!   chain name and outcome

mod chain;
mod events;
mod interceptor;
mod recover;
mod timing;

pub use chain::{HandlerChain, HandlerChainBuilder};
pub use events::{TimingEvent, TimingOutcome};
pub use interceptor::{interceptor_fn, FnInterceptor, Intercepted, Interceptor, InterceptorLayer, Next};
pub use recover::{recover, Recover, RecoverPredicate};
pub use timing::{Timing, TimingConfig, TimingConfigBuilder, TimingFuture, TimingLayer};

//! Request timing.
//!
//! [`Timing`] measures how long the rest of the chain takes to answer each
//! request and reports it through `tracing` and the registered listeners.
//! The measurement starts when the request enters and ends when the
//! downstream future resolves, successfully or not. A call dropped before it
//! resolves is still reported, with [`TimingOutcome::Cancelled`].

use crate::events::{TimingEvent, TimingOutcome};
use futures::ready;
use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower_layer::Layer;
use tower_service::Service;
use tracing::{debug, info, warn};
use wrapchain_core::EventListeners;

#[cfg(feature = "metrics")]
use metrics::{describe_histogram, histogram};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// Configuration for the timing interceptor.
pub struct TimingConfig {
    pub(crate) name: String,
    pub(crate) slow_threshold: Option<Duration>,
    pub(crate) event_listeners: EventListeners<TimingEvent>,
}

impl TimingConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimingConfigBuilder {
        TimingConfigBuilder::new()
    }

    /// Creates a layer from this configuration.
    pub fn layer(self) -> TimingLayer {
        TimingLayer::new(self)
    }

    fn started(&self) {
        debug!(chain = %self.name, "request started");
        self.event_listeners.emit(&TimingEvent::Started {
            chain_name: self.name.clone(),
            timestamp: Instant::now(),
        });
    }

    fn completed(&self, duration: Duration, outcome: TimingOutcome) {
        self.event_listeners.emit(&TimingEvent::Completed {
            chain_name: self.name.clone(),
            timestamp: Instant::now(),
            duration,
            outcome,
        });

        #[cfg(feature = "metrics")]
        histogram!("wrapchain_timing_duration_seconds", "chain" => self.name.clone(), "outcome" => outcome.as_str())
            .record(duration.as_secs_f64());

        let duration_ms = duration.as_secs_f64() * 1000.0;
        match self.slow_threshold {
            Some(threshold) if duration > threshold => warn!(
                chain = %self.name,
                duration_ms,
                threshold_ms = threshold.as_millis() as u64,
                %outcome,
                "slow request"
            ),
            _ => info!(chain = %self.name, duration_ms, %outcome, "request completed"),
        }
    }
}

impl fmt::Debug for TimingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingConfig")
            .field("name", &self.name)
            .field("slow_threshold", &self.slow_threshold)
            .field("event_listeners", &self.event_listeners)
            .finish()
    }
}

/// Builder for [`TimingConfig`].
pub struct TimingConfigBuilder {
    name: String,
    slow_threshold: Option<Duration>,
    event_listeners: EventListeners<TimingEvent>,
}

impl TimingConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            slow_threshold: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name reported in logs, events and metrics.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Logs requests slower than `threshold` at `warn` instead of `info`.
    ///
    /// Default: none
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// Registers a callback invoked when a request enters, before anything
    /// downstream runs.
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &TimingEvent| {
            if matches!(event, TimingEvent::Started { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked with the elapsed time and outcome once
    /// the downstream chain has answered or the call was dropped.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration, TimingOutcome) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &TimingEvent| {
            if let TimingEvent::Completed {
                duration, outcome, ..
            } = *event
            {
                f(duration, outcome);
            }
        });
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> TimingConfig {
        TimingConfig {
            name: self.name,
            slow_threshold: self.slow_threshold,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for TimingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Tower layer that times every request passing through it.
///
/// ```
/// use std::time::Duration;
/// use tower::{service_fn, Layer, ServiceExt};
/// use wrapchain_intercept::TimingLayer;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let layer = TimingLayer::builder()
///     .name("api")
///     .slow_threshold(Duration::from_millis(250))
///     .on_complete(|duration, outcome| println!("{outcome} in {duration:?}"))
///     .build()
///     .layer();
///
/// let handler = service_fn(|req: String| async move { Ok::<_, ()>(req) });
/// let reply = layer.layer(handler).oneshot("ping".to_string()).await.unwrap();
/// assert_eq!(reply, "ping");
/// # }
/// ```
#[derive(Clone)]
pub struct TimingLayer {
    config: Arc<TimingConfig>,
}

impl TimingLayer {
    /// Creates a timing layer from the given configuration.
    pub fn new(config: impl Into<Arc<TimingConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a timing layer.
    pub fn builder() -> TimingConfigBuilder {
        TimingConfig::builder()
    }

    /// Creates a timing layer with the given name and no listeners.
    pub fn named(name: impl Into<String>) -> Self {
        TimingConfig::builder().name(name).build().layer()
    }
}

impl From<TimingConfig> for TimingLayer {
    fn from(config: TimingConfig) -> Self {
        Self::new(config)
    }
}

impl fmt::Debug for TimingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingLayer")
            .field("name", &self.config.name)
            .finish()
    }
}

impl<S> Layer<S> for TimingLayer {
    type Service = Timing<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Timing::new(inner, Arc::clone(&self.config))
    }
}

/// A service that times calls to the inner service.
#[derive(Clone)]
pub struct Timing<S> {
    inner: S,
    config: Arc<TimingConfig>,
}

impl<S> Timing<S> {
    pub(crate) fn new(inner: S, config: Arc<TimingConfig>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_histogram!(
                "wrapchain_timing_duration_seconds",
                "Time spent in the downstream chain per request"
            );
        });

        Self { inner, config }
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the wrapper and returns the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: fmt::Debug> fmt::Debug for Timing<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timing")
            .field("name", &self.config.name)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<S, Req> Service<Req> for Timing<S>
where
    S: Service<Req>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = TimingFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.config.started();
        let guard = TimingGuard {
            config: Arc::clone(&self.config),
            start: Instant::now(),
            armed: true,
        };

        TimingFuture {
            inner: self.inner.call(req),
            guard,
        }
    }
}

pin_project! {
    /// Response future for [`Timing`].
    pub struct TimingFuture<F> {
        #[pin]
        inner: F,
        guard: TimingGuard,
    }
}

impl<F, T, E> Future for TimingFuture<F>
where
    F: Future<Output = Result<T, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.inner.poll(cx));

        let outcome = match &result {
            Ok(_) => TimingOutcome::Success,
            Err(_) => TimingOutcome::Error,
        };
        this.guard.finish(outcome);

        Poll::Ready(result)
    }
}

impl<F> fmt::Debug for TimingFuture<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingFuture")
            .field("name", &self.guard.config.name)
            .finish_non_exhaustive()
    }
}

/// Reports the call exactly once: on completion, or as cancelled on drop.
struct TimingGuard {
    config: Arc<TimingConfig>,
    start: Instant,
    armed: bool,
}

impl TimingGuard {
    fn finish(&mut self, outcome: TimingOutcome) {
        if self.armed {
            self.armed = false;
            self.config.completed(self.start.elapsed(), outcome);
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        self.finish(TimingOutcome::Cancelled);
    }
}

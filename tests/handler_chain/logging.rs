//! The timing interceptor reports through `tracing`.

use super::test_utils::{handle, new_log, AppError, Request, Response};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{service_fn, ServiceExt};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use wrapchain_intercept::{HandlerChain, TimingLayer};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn chain(threshold: Duration) -> HandlerChain<Request, Response, AppError> {
    let log = new_log();
    HandlerChain::<Request, Response, AppError>::builder()
        .name("api")
        .layer(
            TimingLayer::builder()
                .name("api")
                .slow_threshold(threshold)
                .build()
                .layer(),
        )
        .build(service_fn(move |req: Request| handle(Arc::clone(&log), req)))
}

fn subscriber(captured: Captured, level: Level) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(captured)
        .with_ansi(false)
        .with_max_level(level)
        .finish()
}

#[tokio::test]
async fn completion_is_logged_at_info() {
    let captured = Captured::default();
    let _guard = tracing::subscriber::set_default(subscriber(captured.clone(), Level::INFO));

    chain(Duration::from_secs(10))
        .oneshot(Request::authed("ada"))
        .await
        .unwrap();

    let output = captured.contents();
    assert!(output.contains("INFO"), "{output}");
    assert!(output.contains("request completed"), "{output}");
    assert!(output.contains("chain=api"), "{output}");
    assert!(output.contains("outcome=success"), "{output}");
    assert!(!output.contains("request started"), "{output}");
}

#[tokio::test]
async fn start_is_logged_at_debug_before_completion() {
    let captured = Captured::default();
    let _guard = tracing::subscriber::set_default(subscriber(captured.clone(), Level::DEBUG));

    chain(Duration::from_secs(10))
        .oneshot(Request::authed("ada"))
        .await
        .unwrap();

    let output = captured.contents();
    let started = output.find("request started").expect(&output);
    let completed = output.find("request completed").expect(&output);
    assert!(started < completed, "{output}");

    let start_line = output.lines().find(|l| l.contains("request started")).unwrap();
    assert!(start_line.contains("DEBUG"), "{start_line}");
    assert!(start_line.contains("chain=api"), "{start_line}");
}

#[tokio::test]
async fn slow_request_is_logged_at_warn() {
    let captured = Captured::default();
    let _guard = tracing::subscriber::set_default(subscriber(captured.clone(), Level::INFO));

    chain(Duration::from_millis(5))
        .oneshot(Request::authed("ada").slow(Duration::from_millis(20)))
        .await
        .unwrap();

    let output = captured.contents();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("slow request"), "{output}");
}

#[tokio::test]
async fn failed_request_is_logged_with_error_outcome() {
    let captured = Captured::default();
    let _guard = tracing::subscriber::set_default(subscriber(captured.clone(), Level::INFO));

    let result = chain(Duration::from_secs(10))
        .oneshot(Request::authed("crash"))
        .await;
    assert!(result.is_err());

    let output = captured.contents();
    assert!(output.contains("outcome=error"), "{output}");
}

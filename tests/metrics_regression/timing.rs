//! Timing interceptor metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};
use wrapchain_intercept::TimingLayer;

#[tokio::test]
#[serial]
async fn timing_metrics_exist() {
    init_recorder();

    let layer = TimingLayer::named("test_timing");

    let service = tower::service_fn(|_: u64| async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, &'static str>("success")
    });

    let mut service = layer.layer(service);

    let _ = service.ready().await.unwrap().call(1).await;

    assert_histogram_exists("wrapchain_timing_duration_seconds");
    assert_metric_has_label("wrapchain_timing_duration_seconds", "chain", "test_timing");
    assert_metric_has_label("wrapchain_timing_duration_seconds", "outcome", "success");
}

#[tokio::test]
#[serial]
async fn timing_error_metrics() {
    init_recorder();

    let layer = TimingLayer::named("error_timing");

    let service = tower::service_fn(|_: u64| async { Err::<&'static str, _>("error") });

    let mut service = layer.layer(service);

    let _ = service.ready().await.unwrap().call(1).await;

    assert_metric_has_label("wrapchain_timing_duration_seconds", "chain", "error_timing");
    assert_metric_has_label("wrapchain_timing_duration_seconds", "outcome", "error");
}

#[tokio::test]
#[serial]
async fn timing_cancelled_metrics() {
    init_recorder();

    let layer = TimingLayer::named("cancelled_timing");

    let service = tower::service_fn(|_: u64| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok::<_, &'static str>("late")
    });

    let service = layer.layer(service);

    let call = service.oneshot(1);
    assert!(tokio::time::timeout(Duration::from_millis(10), call).await.is_err());

    assert_metric_has_label("wrapchain_timing_duration_seconds", "outcome", "cancelled");
}

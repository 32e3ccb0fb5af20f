//! Pipeline metrics regression tests

use super::helpers::*;
use bytes::Bytes;
use serial_test::serial;
use wrapchain_transform::{
    CipherKey, CompressLayer, DecryptLayer, EncryptLayer, MemorySink, Operate, Pipeline,
};

#[test]
#[serial]
fn pipeline_delivered_metrics() {
    init_recorder();

    let pipeline = Pipeline::builder()
        .name("metrics_sender")
        .stage(CompressLayer::new())
        .stage(EncryptLayer::new(CipherKey::from_passphrase("abcde")))
        .build(MemorySink::new());

    pipeline.operate(Bytes::from_static(b"Hello World")).unwrap();

    assert_counter_exists("wrapchain_pipeline_operations_total");
    assert_metric_has_label("wrapchain_pipeline_operations_total", "pipeline", "metrics_sender");
    assert_metric_has_label("wrapchain_pipeline_operations_total", "result", "delivered");
}

#[test]
#[serial]
fn pipeline_failed_metrics() {
    init_recorder();

    let pipeline = Pipeline::builder()
        .name("metrics_receiver")
        .stage(DecryptLayer::new(CipherKey::from_passphrase("abcde")))
        .build(MemorySink::new());

    // Too short to hold a nonce and tag
    assert!(pipeline.operate(Bytes::from_static(b"garbage")).is_err());

    assert_metric_has_label("wrapchain_pipeline_operations_total", "pipeline", "metrics_receiver");
    assert_metric_has_label("wrapchain_pipeline_operations_total", "result", "failed");
}

//! Failure handling: misordered chains, wrong keys, aborted chains.

use super::test_utils::{counting, failing, receiver, sender, HELLO};
use bytes::Bytes;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wrapchain_transform::{
    sink_fn, CipherKey, CompressLayer, DecompressLayer, DecryptLayer, EncryptLayer, MemorySink,
    MirrorError, Operate, Passthrough, Pipeline, TransformErrorKind,
};

#[test]
fn misordered_receiver_does_not_reproduce_payload() {
    let key = CipherKey::from_passphrase("abcde");
    let wire = MemorySink::new();
    let sender = sender("abcde", wire.clone());

    // Inverses applied in the same order as the sender, not mirrored.
    let inbox = MemorySink::new();
    let misordered = Pipeline::builder()
        .stage(DecompressLayer::new())
        .stage(DecryptLayer::new(key))
        .build(inbox.clone());

    assert!(matches!(
        sender.mirrors(&misordered),
        Err(MirrorError::StageMismatch { position: 0, .. })
    ));

    sender.operate(Bytes::from_static(HELLO)).unwrap();
    let result = misordered.operate(wire.last().unwrap());

    match result {
        Ok(out) => assert_ne!(out, Bytes::from_static(HELLO)),
        Err(err) => assert!(matches!(err.stage(), "decompress" | "decrypt")),
    }
    assert!(inbox.deliveries().iter().all(|b| b != &Bytes::from_static(HELLO)));
}

#[test]
fn wrong_key_is_rejected() {
    let wire = MemorySink::new();
    let inbox = MemorySink::new();
    let sender = sender("abcde", wire.clone());
    let receiver = receiver("edcba", inbox.clone());

    sender.operate(Bytes::from_static(HELLO)).unwrap();
    let err = receiver.operate(wire.last().unwrap()).unwrap_err();

    assert!(matches!(
        err.kind(),
        TransformErrorKind::BadKey | TransformErrorKind::Corrupt
    ));
    assert_eq!(err.stage(), "decrypt");
    assert!(inbox.is_empty());
}

#[test]
fn short_raw_key_is_bad_key_on_first_use() {
    let wire = MemorySink::new();
    let sender = Pipeline::builder()
        .stage(CompressLayer::new())
        .stage(EncryptLayer::new(CipherKey::from_bytes("abcde")))
        .build(wire.clone());

    let err = sender.operate(Bytes::from_static(HELLO)).unwrap_err();
    assert!(err.is_bad_key());
    assert_eq!(err.stage(), "encrypt");
    assert!(wire.is_empty());
}

#[test]
fn failing_stage_aborts_the_rest_of_the_chain() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let third = Arc::new(AtomicUsize::new(0));
    let sink = MemorySink::new();

    let pipeline = Pipeline::builder()
        .stage(counting("first", Arc::clone(&first)))
        .stage(failing("second", Arc::clone(&second)))
        .stage(counting("third", Arc::clone(&third)))
        .build(sink.clone());

    let err = pipeline.operate(Bytes::from_static(HELLO)).unwrap_err();

    assert_eq!(err.stage(), "second");
    assert_eq!(err.kind(), TransformErrorKind::Corrupt);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(third.load(Ordering::SeqCst), 0);
    assert!(sink.is_empty());
}

#[test]
fn sink_errors_are_propagated_with_source() {
    let pipeline = Pipeline::builder()
        .stage(CompressLayer::new())
        .build(sink_fn(|_bytes: Bytes| {
            Err::<Bytes, _>(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "socket closed",
            ))
        }));

    let err = pipeline.operate(Bytes::from_static(HELLO)).unwrap_err();

    assert!(err.is_propagated());
    assert_eq!(err.stage(), "sink");
    let source = err.source().expect("source error");
    assert_eq!(source.to_string(), "socket closed");
}

#[test]
fn truncated_stream_is_corrupt() {
    let compressed = Pipeline::builder()
        .stage(CompressLayer::new())
        .build(Passthrough)
        .operate(Bytes::from(HELLO.repeat(20)))
        .unwrap();

    let decode = Pipeline::builder()
        .stage(DecompressLayer::new())
        .build(Passthrough);

    let err = decode
        .operate(compressed.slice(..compressed.len() / 2))
        .unwrap_err();
    assert!(err.is_corrupt());
}

#[test]
fn failure_listener_sees_stage_and_kind() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let deliveries = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&failures);
    let d = Arc::clone(&deliveries);

    let receiver = Pipeline::builder()
        .name("receiver")
        .stage(DecryptLayer::new(CipherKey::from_passphrase("abcde")))
        .stage(DecompressLayer::new())
        .on_failure(move |stage, kind| f.lock().unwrap().push((stage, kind)))
        .on_delivered(move |_, _, _| {
            d.fetch_add(1, Ordering::SeqCst);
        })
        .build(Passthrough);

    let _ = receiver.operate(Bytes::from_static(b"not a ciphertext at all"));

    assert_eq!(
        *failures.lock().unwrap(),
        vec![("decrypt", TransformErrorKind::Corrupt)]
    );
    assert_eq!(deliveries.load(Ordering::SeqCst), 0);
}

#[test]
fn panicking_listener_does_not_break_the_pipeline() {
    let sink = MemorySink::new();
    let pipeline = Pipeline::builder()
        .stage(CompressLayer::new())
        .on_delivered(|_, _, _| panic!("listener bug"))
        .build(sink.clone());

    assert!(pipeline.operate(Bytes::from_static(HELLO)).is_ok());
    assert_eq!(sink.len(), 1);
}

#[test]
fn error_message_names_the_stage() {
    let err = Pipeline::builder()
        .stage(DecompressLayer::new())
        .build(Passthrough)
        .operate(Bytes::from_static(b"plain text"))
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("decompress stage failed"), "{message}");
}

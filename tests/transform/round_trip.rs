//! Sender/receiver round trips.

use super::test_utils::{receiver, sender, HELLO};
use bytes::Bytes;
use tower::{ServiceBuilder, ServiceExt};
use wrapchain_transform::{
    stage_fn, CipherKey, CompressLayer, CompressionFormat, DecompressLayer, DecryptLayer,
    EncryptLayer, MemorySink, Operate, Passthrough, Pipeline, StageKind,
};

#[test]
fn hello_world_through_compression() {
    let wire = MemorySink::new();
    let sender = Pipeline::builder()
        .stage(CompressLayer::new())
        .build(wire.clone());

    let inbox = MemorySink::new();
    let receiver = Pipeline::builder()
        .stage(DecompressLayer::new())
        .build(inbox.clone());

    sender.operate(Bytes::from_static(HELLO)).unwrap();
    let sent = wire.last().unwrap();
    assert_ne!(sent, Bytes::from_static(HELLO));

    receiver.operate(sent).unwrap();
    assert_eq!(inbox.last().unwrap(), Bytes::from_static(HELLO));
}

#[test]
fn hello_world_through_compression_and_encryption() {
    let wire = MemorySink::new();
    let inbox = MemorySink::new();
    let sender = sender("abcde", wire.clone());
    let receiver = receiver("abcde", inbox.clone());

    assert!(sender.mirrors(&receiver).is_ok());

    sender.operate(Bytes::from_static(HELLO)).unwrap();
    receiver.operate(wire.last().unwrap()).unwrap();

    assert_eq!(inbox.deliveries(), vec![Bytes::from_static(HELLO)]);
}

#[test]
fn operate_returns_what_the_sink_received() {
    let wire = MemorySink::new();
    let sender = sender("abcde", wire.clone());

    let returned = sender.operate(Bytes::from_static(HELLO)).unwrap();
    assert_eq!(Some(returned), wire.last());
}

#[test]
fn every_message_is_delivered_in_order() {
    let wire = MemorySink::new();
    let inbox = MemorySink::new();
    let sender = sender("abcde", wire.clone());
    let receiver = receiver("abcde", inbox.clone());

    let messages: Vec<Bytes> = (0..5)
        .map(|i| Bytes::from(format!("message {i}")))
        .collect();

    for message in &messages {
        sender.operate(message.clone()).unwrap();
    }
    for sent in wire.deliveries() {
        receiver.operate(sent).unwrap();
    }

    assert_eq!(inbox.deliveries(), messages);
}

#[test]
fn empty_payload_round_trips() {
    let wire = MemorySink::new();
    let inbox = MemorySink::new();
    let sender = sender("abcde", wire.clone());
    let receiver = receiver("abcde", inbox.clone());

    sender.operate(Bytes::new()).unwrap();
    receiver.operate(wire.last().unwrap()).unwrap();

    assert_eq!(inbox.last().unwrap(), Bytes::new());
}

#[test]
fn raw_deflate_at_every_level() {
    let payload = Bytes::from(HELLO.repeat(50));

    for level in 0..=9 {
        let encode = Pipeline::builder()
            .stage(
                CompressLayer::new()
                    .format(CompressionFormat::Deflate)
                    .level(level),
            )
            .build(Passthrough);
        let decode = Pipeline::builder()
            .stage(DecompressLayer::new().format(CompressionFormat::Deflate))
            .build(Passthrough);

        let wire = encode.operate(payload.clone()).unwrap();
        assert_eq!(decode.operate(wire).unwrap(), payload, "level {level}");
    }
}

#[test]
fn raw_key_of_full_length_round_trips() {
    let key = CipherKey::from_bytes([7u8; 32]);

    let encode = Pipeline::builder()
        .stage(EncryptLayer::new(key.clone()))
        .build(Passthrough);
    let decode = Pipeline::builder()
        .stage(DecryptLayer::new(key))
        .build(Passthrough);

    let wire = encode.operate(Bytes::from_static(HELLO)).unwrap();
    assert_eq!(decode.operate(wire).unwrap(), Bytes::from_static(HELLO));
}

#[test]
fn custom_stages_compose_with_builtin_ones() {
    let xor = |input: Bytes| Ok(Bytes::from(input.iter().map(|b| b ^ 0x5a).collect::<Vec<_>>()));

    let encode = Pipeline::builder()
        .stage(stage_fn("mask", xor))
        .stage(CompressLayer::new())
        .build(Passthrough);
    let decode = Pipeline::builder()
        .stage(DecompressLayer::new())
        .stage(stage_fn("unmask", xor))
        .build(Passthrough);

    assert_eq!(
        encode.stages(),
        &[
            StageKind::Custom("mask"),
            StageKind::Compress(CompressionFormat::Zlib)
        ]
    );

    let wire = encode.operate(Bytes::from_static(HELLO)).unwrap();
    assert_eq!(decode.operate(wire).unwrap(), Bytes::from_static(HELLO));
}

#[test]
fn typed_composition_matches_runtime_composition() {
    let key = CipherKey::from_passphrase("abcde");

    let typed_sender = ServiceBuilder::new()
        .layer(CompressLayer::new())
        .layer(EncryptLayer::new(key.clone()))
        .service(Passthrough);

    let runtime_receiver = Pipeline::builder()
        .stage(DecryptLayer::new(key))
        .stage(DecompressLayer::new())
        .build(Passthrough);

    let wire = typed_sender.operate(Bytes::from_static(HELLO)).unwrap();
    assert_eq!(
        runtime_receiver.operate(wire).unwrap(),
        Bytes::from_static(HELLO)
    );
}

#[tokio::test]
async fn pipelines_serve_as_tower_services() {
    let inbox = MemorySink::new();
    let send = sender("abcde", MemorySink::new()).into_service();
    let receive = receiver("abcde", inbox.clone()).into_service();

    let wire = send.oneshot(Bytes::from_static(HELLO)).await.unwrap();
    receive.oneshot(wire).await.unwrap();

    assert_eq!(inbox.last().unwrap(), Bytes::from_static(HELLO));
}

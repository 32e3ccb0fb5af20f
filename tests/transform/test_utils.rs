//! Shared helpers for transform pipeline tests.

use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wrapchain_transform::{
    stage_fn, CipherKey, CompressLayer, DecompressLayer, DecryptLayer, EncryptLayer, MemorySink,
    Pipeline, StageLayer, TransformError,
};

pub const HELLO: &[u8] = b"Hello World";

/// A stage that counts its invocations and passes bytes through.
pub fn counting(name: &'static str, calls: Arc<AtomicUsize>) -> impl StageLayer {
    stage_fn(name, move |input: Bytes| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    })
}

/// A stage that always fails with `Corrupt`.
pub fn failing(name: &'static str, calls: Arc<AtomicUsize>) -> impl StageLayer {
    stage_fn(name, move |_input: Bytes| {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(TransformError::corrupt(name, "rejected by test stage"))
    })
}

/// Sender that compresses then encrypts under `passphrase`.
pub fn sender(passphrase: &str, wire: MemorySink) -> Pipeline {
    Pipeline::builder()
        .name("sender")
        .stage(CompressLayer::new())
        .stage(EncryptLayer::new(CipherKey::from_passphrase(passphrase)))
        .build(wire)
}

/// Receiver mirroring [`sender`].
pub fn receiver(passphrase: &str, inbox: MemorySink) -> Pipeline {
    Pipeline::builder()
        .name("receiver")
        .stage(DecryptLayer::new(CipherKey::from_passphrase(passphrase)))
        .stage(DecompressLayer::new())
        .build(inbox)
}

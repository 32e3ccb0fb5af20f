//! Sender and receiver pipelines exchanging a message.
//!
//! The sender compresses then encrypts; the receiver mirrors it by
//! decrypting then decompressing. A third, misordered receiver shows what
//! happens when the mirror is wrong.
//!
//! Run with:
//! ```sh
//! cargo run -p wrapchain --example send_receive --features transform,tracing
//! ```

use bytes::Bytes;
use wrapchain::transform::{
    CipherKey, CompressLayer, DecompressLayer, DecryptLayer, EncryptLayer, MemorySink, Operate,
    Pipeline,
};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let key = CipherKey::from_passphrase("abcde");

    println!("Compression only");
    let wire = MemorySink::new();
    let sender = Pipeline::builder()
        .name("sender")
        .stage(CompressLayer::new())
        .build(wire.clone());
    let inbox = MemorySink::new();
    let receiver = Pipeline::builder()
        .name("receiver")
        .stage(DecompressLayer::new())
        .build(inbox.clone());

    exchange(&sender, &receiver, &wire, &inbox);

    println!("\nCompression and encryption");
    let wire = MemorySink::new();
    let sender = Pipeline::builder()
        .name("sender")
        .stage(CompressLayer::new())
        .stage(EncryptLayer::new(key.clone()))
        .build(wire.clone());
    let inbox = MemorySink::new();
    let receiver = Pipeline::builder()
        .name("receiver")
        .stage(DecryptLayer::new(key.clone()))
        .stage(DecompressLayer::new())
        .build(inbox.clone());

    match sender.mirrors(&receiver) {
        Ok(()) => println!("  receiver mirrors sender"),
        Err(err) => println!("  mirror check failed: {err}"),
    }
    exchange(&sender, &receiver, &wire, &inbox);

    println!("\nMisordered receiver");
    let misordered = Pipeline::builder()
        .name("misordered")
        .stage(DecompressLayer::new())
        .stage(DecryptLayer::new(key))
        .build(MemorySink::new());

    if let Err(err) = sender.mirrors(&misordered) {
        println!("  mirror check: {err}");
    }
    match misordered.operate(wire.last().unwrap_or_default()) {
        Ok(bytes) => println!("  unexpectedly decoded {} bytes", bytes.len()),
        Err(err) => println!("  receive failed: {err}"),
    }
}

fn exchange(sender: &Pipeline, receiver: &Pipeline, wire: &MemorySink, inbox: &MemorySink) {
    let message = Bytes::from_static(b"Hello World");

    if let Err(err) = sender.operate(message.clone()) {
        println!("  send failed: {err}");
        return;
    }
    let sent = wire.last().unwrap_or_default();
    println!("  sent {} bytes: {:02x?}", sent.len(), &sent[..]);

    match receiver.operate(sent) {
        Ok(_) => {
            let received = inbox.last().unwrap_or_default();
            println!("  received: {}", String::from_utf8_lossy(&received));
            assert_eq!(received, message);
        }
        Err(err) => println!("  receive failed: {err}"),
    }
}

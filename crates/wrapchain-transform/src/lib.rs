//! Reversible transform pipelines for byte payloads.
//!
//! A pipeline is an ordered list of stages nested around a sink. Each stage
//! transforms the bytes it is given and hands the result to the next one;
//! the sink receives whatever comes out of the innermost stage. Provides:
//! - Compression stages (zlib or raw deflate)
//! - AES-256-GCM encryption stages
//! - Closure stages via [`stage_fn`]
//! - Runtime composition with [`Pipeline`], typed composition with `tower::ServiceBuilder`
//! - Event listeners, plus optional tracing and metrics
//!
//! ## Sender and Receiver
//!
//! The receiving chain must be the mirror of the sending one: the stage
//! added last on the sender is undone first on the receiver.
//!
//! ```rust
//! use bytes::Bytes;
//! use wrapchain_transform::{
//!     CipherKey, CompressLayer, DecompressLayer, DecryptLayer, EncryptLayer, MemorySink,
//!     Operate, Pipeline,
//! };
//!
//! let key = CipherKey::from_passphrase("abcde");
//! let wire = MemorySink::new();
//! let sender = Pipeline::builder()
//!     .name("sender")
//!     .stage(CompressLayer::new())
//!     .stage(EncryptLayer::new(key.clone()))
//!     .build(wire.clone());
//!
//! let inbox = MemorySink::new();
//! let receiver = Pipeline::builder()
//!     .name("receiver")
//!     .stage(DecryptLayer::new(key))
//!     .stage(DecompressLayer::new())
//!     .build(inbox.clone());
//!
//! assert!(sender.mirrors(&receiver).is_ok());
//!
//! sender.operate(Bytes::from_static(b"Hello World")).unwrap();
//! receiver.operate(wire.last().unwrap()).unwrap();
//! assert_eq!(inbox.last().unwrap(), Bytes::from_static(b"Hello World"));
//! ```
//!
//! ## Typed Composition
//!
//! Every stage layer is also a `tower::Layer`, so a chain whose shape is
//! known at compile time can be built without boxing:
//!
//! ```rust
//! use bytes::Bytes;
//! use tower::ServiceBuilder;
//! use wrapchain_transform::{CompressLayer, DecompressLayer, Operate, Passthrough};
//!
//! let roundtrip = ServiceBuilder::new()
//!     .layer(CompressLayer::new())
//!     .layer(DecompressLayer::new())
//!     .service(Passthrough);
//!
//! let out = roundtrip.operate(Bytes::from_static(b"Hello World")).unwrap();
//! assert_eq!(out, Bytes::from_static(b"Hello World"));
//! ```
//!
//! ## Failures
//!
//! A failing stage stops the chain: nothing downstream of it runs and the
//! sink receives nothing. The error names the stage and carries one of
//! the [`TransformErrorKind`] categories.
//!
//! ## Feature Flags
//!
//! - `tracing`: debug logs per call, warnings for panicking listeners
//! - `metrics`: `wrapchain_pipeline_operations_total` counter
//! - `serde`: `Serialize`/`Deserialize` for [`CompressionFormat`]

mod cipher;
mod compress;
mod error;
mod events;
mod kind;
mod operate;
mod pipeline;
mod service;
mod sink;

pub use cipher::{CipherKey, Decrypt, DecryptLayer, Encrypt, EncryptLayer, KeyId, KEY_LEN};
pub use compress::{Compress, CompressLayer, CompressionFormat, Decompress, DecompressLayer};
pub use error::{BoxError, TransformError, TransformErrorKind};
pub use events::PipelineEvent;
pub use kind::{check_mirror, MirrorError, StageKind};
pub use operate::{stage_fn, BoxOperate, FnStage, FnStageLayer, Operate};
pub use pipeline::{Pipeline, PipelineBuilder, StageLayer};
pub use service::OperateService;
pub use sink::{sink_fn, MemorySink, Passthrough, SinkFn};

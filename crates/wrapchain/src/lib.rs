//! Composable wrapper chains.
//!
//! `wrapchain` nests an ordered list of wrappers around a terminal and
//! hands back a single callable. The first wrapper registered is always the
//! outermost. Two kinds of chain are available as features:
//!
//! - **Transform** (`transform` feature): synchronous byte pipelines whose
//!   stages compress, encrypt or apply a custom transform before passing the
//!   result to the next stage and finally to a sink
//! - **Intercept** (`intercept` feature): interceptors around an async
//!   `tower::Service` handler, including request timing
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! wrapchain = { version = "0.1", features = ["full"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "transform")]
//! # {
//! use bytes::Bytes;
//! use wrapchain::transform::{CompressLayer, DecompressLayer, MemorySink, Operate, Pipeline};
//!
//! let wire = MemorySink::new();
//! let sender = Pipeline::builder()
//!     .stage(CompressLayer::new())
//!     .build(wire.clone());
//!
//! let inbox = MemorySink::new();
//! let receiver = Pipeline::builder()
//!     .stage(DecompressLayer::new())
//!     .build(inbox.clone());
//!
//! sender.operate(Bytes::from_static(b"Hello World")).unwrap();
//! receiver.operate(wire.last().unwrap()).unwrap();
//! assert_eq!(inbox.last().unwrap(), Bytes::from_static(b"Hello World"));
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `transform`, `intercept`, or `full` for both
//! - `tracing`: log events from the transform pipeline (the interceptor
//!   chain always logs through `tracing`)
//! - `metrics`: counters and histograms for both chain kinds
//! - `serde`: serialization of pipeline settings

pub use wrapchain_core as core;
pub use wrapchain_core::compose;

#[cfg(feature = "transform")]
pub use wrapchain_transform as transform;

#[cfg(feature = "intercept")]
pub use wrapchain_intercept as intercept;

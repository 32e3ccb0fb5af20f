//! Error types for transform stages.

/// Boxed error raised by a sink or a custom downstream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Category of a transform failure.
///
/// Failures are never transient: the same input fed through the same
/// stage fails the same way, so nothing in a pipeline retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum TransformErrorKind {
    /// The configured key does not meet the cipher's required length.
    #[error("bad key")]
    BadKey,
    /// The payload is not a valid compressed stream or ciphertext.
    #[error("corrupt payload")]
    Corrupt,
    /// A sink or custom downstream returned an error, carried unchanged.
    #[error("propagated")]
    Propagated,
}

/// Error returned by [`Operate::operate`](crate::Operate::operate).
///
/// Carries the kind and the name of the stage that failed. Stages never
/// wrap errors coming from their downstream, so the error that reaches the
/// outermost caller is exactly the one the failing stage produced.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed ({kind}): {detail}")]
pub struct TransformError {
    kind: TransformErrorKind,
    stage: &'static str,
    detail: String,
    #[source]
    source: Option<BoxError>,
}

impl TransformError {
    /// The key handed to `stage` cannot be used by its cipher.
    pub fn bad_key(stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind: TransformErrorKind::BadKey,
            stage,
            detail: detail.into(),
            source: None,
        }
    }

    /// The payload handed to `stage` is malformed.
    pub fn corrupt(stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind: TransformErrorKind::Corrupt,
            stage,
            detail: detail.into(),
            source: None,
        }
    }

    /// Wraps an error raised by a sink or a custom stage.
    pub fn propagated(stage: &'static str, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self {
            kind: TransformErrorKind::Propagated,
            stage,
            detail: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns the failure category.
    pub fn kind(&self) -> TransformErrorKind {
        self.kind
    }

    /// Returns the name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Returns the human readable detail.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Returns `true` if the key was rejected.
    pub fn is_bad_key(&self) -> bool {
        self.kind == TransformErrorKind::BadKey
    }

    /// Returns `true` if the payload was malformed.
    pub fn is_corrupt(&self) -> bool {
        self.kind == TransformErrorKind::Corrupt
    }

    /// Returns `true` if the error came from a sink or custom downstream.
    pub fn is_propagated(&self) -> bool {
        self.kind == TransformErrorKind::Propagated
    }
}

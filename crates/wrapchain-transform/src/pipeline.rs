//! Runtime-composed transform chains.

use crate::error::{TransformError, TransformErrorKind};
use crate::events::PipelineEvent;
use crate::kind::{check_mirror, MirrorError, StageKind};
use crate::operate::{BoxOperate, Operate};
use crate::service::OperateService;
use bytes::Bytes;
use std::fmt;
use std::time::{Duration, Instant};
use wrapchain_core::{compose, EventListeners};

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::debug;

/// A stage that can be added to a [`Pipeline`] at runtime.
///
/// Every built-in layer implements this; custom stages come from
/// [`stage_fn`](crate::stage_fn).
pub trait StageLayer: Send + Sync + 'static {
    /// Describes the stage this layer produces.
    fn kind(&self) -> StageKind;

    /// Wraps `downstream` with this stage.
    fn wrap(&self, downstream: BoxOperate) -> BoxOperate;
}

/// An ordered chain of stages ending in a sink.
///
/// The first stage added to the builder is the outermost: it sees the
/// caller's input first. A pipeline is immutable once built and can be
/// shared across threads.
///
/// ```
/// use bytes::Bytes;
/// use wrapchain_transform::{
///     CipherKey, CompressLayer, DecompressLayer, DecryptLayer, EncryptLayer, MemorySink,
///     Operate, Pipeline,
/// };
///
/// let key = CipherKey::from_passphrase("abcde");
///
/// let sent = MemorySink::new();
/// let sender = Pipeline::builder()
///     .name("sender")
///     .stage(CompressLayer::new())
///     .stage(EncryptLayer::new(key.clone()))
///     .build(sent.clone());
///
/// let received = MemorySink::new();
/// let receiver = Pipeline::builder()
///     .name("receiver")
///     .stage(DecryptLayer::new(key))
///     .stage(DecompressLayer::new())
///     .build(received.clone());
///
/// sender.operate(Bytes::from_static(b"Hello World")).unwrap();
/// receiver.operate(sent.last().unwrap()).unwrap();
///
/// assert_eq!(received.last().unwrap(), Bytes::from_static(b"Hello World"));
/// ```
pub struct Pipeline {
    name: String,
    head: BoxOperate,
    stages: Vec<StageKind>,
    event_listeners: EventListeners<PipelineEvent>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages, outermost first.
    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }

    /// Returns the number of stages, not counting the sink.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the pipeline feeds its sink directly.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Checks that `decode` mirrors this pipeline. See [`check_mirror`].
    pub fn mirrors(&self, decode: &Pipeline) -> Result<(), MirrorError> {
        check_mirror(&self.stages, &decode.stages)
    }

    /// Turns the pipeline into a `tower::Service<Bytes>`.
    pub fn into_service(self) -> OperateService<Pipeline> {
        OperateService::new(self)
    }

    fn delivered(&self, input_len: usize, output_len: usize, duration: Duration) {
        self.event_listeners.emit(&PipelineEvent::Delivered {
            chain_name: self.name.clone(),
            timestamp: Instant::now(),
            input_len,
            output_len,
            duration,
        });

        #[cfg(feature = "metrics")]
        counter!("wrapchain_pipeline_operations_total", "pipeline" => self.name.clone(), "result" => "delivered")
            .increment(1);

        #[cfg(feature = "tracing")]
        debug!(
            pipeline = %self.name,
            input_len,
            output_len,
            duration_us = duration.as_micros() as u64,
            "payload delivered"
        );
    }

    fn failed(&self, err: &TransformError) {
        self.event_listeners.emit(&PipelineEvent::Failed {
            chain_name: self.name.clone(),
            timestamp: Instant::now(),
            stage: err.stage(),
            kind: err.kind(),
        });

        #[cfg(feature = "metrics")]
        counter!("wrapchain_pipeline_operations_total", "pipeline" => self.name.clone(), "result" => "failed")
            .increment(1);

        #[cfg(feature = "tracing")]
        debug!(
            pipeline = %self.name,
            stage = err.stage(),
            kind = %err.kind(),
            detail = err.detail(),
            "pipeline aborted"
        );
    }
}

impl Operate for Pipeline {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        let input_len = input.len();
        let start = Instant::now();

        match self.head.operate(input) {
            Ok(output) => {
                self.delivered(input_len, output.len(), start.elapsed());
                Ok(output)
            }
            Err(err) => {
                self.failed(&err);
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Box<dyn StageLayer>>,
    event_listeners: EventListeners<PipelineEvent>,
}

impl PipelineBuilder {
    /// Creates a builder with no stages.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            stages: Vec::new(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this pipeline for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a stage. Stages run in the order they are added.
    pub fn stage<L: StageLayer>(mut self, layer: L) -> Self {
        self.stages.push(Box::new(layer));
        self
    }

    /// Registers a callback invoked after a successful delivery with the
    /// input size, the output size and the time spent in the chain.
    pub fn on_delivered<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &PipelineEvent| {
            if let PipelineEvent::Delivered {
                input_len,
                output_len,
                duration,
                ..
            } = *event
            {
                f(input_len, output_len, duration);
            }
        });
        self
    }

    /// Registers a callback invoked when a stage or the sink fails, with the
    /// failing stage's name and the error kind.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str, TransformErrorKind) + Send + Sync + 'static,
    {
        self.event_listeners.on(move |event: &PipelineEvent| {
            if let PipelineEvent::Failed { stage, kind, .. } = *event {
                f(stage, kind);
            }
        });
        self
    }

    /// Nests the stages around `sink` and returns the finished pipeline.
    pub fn build<S>(self, sink: S) -> Pipeline
    where
        S: Operate + 'static,
    {
        let stages = self.stages.iter().map(|layer| layer.kind()).collect();
        let head = compose(
            self.stages
                .iter()
                .map(|layer| move |downstream: BoxOperate| layer.wrap(downstream)),
            Box::new(sink) as BoxOperate,
        );

        Pipeline {
            name: self.name,
            head,
            stages,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

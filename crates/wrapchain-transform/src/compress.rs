//! Compression stages.
//!
//! [`CompressLayer`] deflates the payload before handing it downstream and
//! [`DecompressLayer`] is its inverse. Decompression only succeeds on a
//! complete stream: a payload that ends before the end-of-stream marker, or
//! that carries bytes after it, is rejected as corrupt rather than yielding
//! whatever could be inflated.

use crate::error::TransformError;
use crate::kind::StageKind;
use crate::operate::{BoxOperate, Operate};
use crate::pipeline::StageLayer;
use bytes::Bytes;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::{Compression, Decompress as Inflater, FlushDecompress, Status};
use std::fmt;
use std::io::Write;
use tower_layer::Layer;

pub(crate) const COMPRESS: &str = "compress";
pub(crate) const DECOMPRESS: &str = "decompress";

const DEFAULT_LEVEL: u32 = 6;
const MIN_BUFFER: usize = 64;

/// Container format of the compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CompressionFormat {
    /// DEFLATE with a zlib header and Adler-32 trailer.
    #[default]
    Zlib,
    /// Raw DEFLATE blocks, no header or checksum.
    Deflate,
}

impl CompressionFormat {
    fn has_zlib_header(self) -> bool {
        matches!(self, CompressionFormat::Zlib)
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionFormat::Zlib => write!(f, "zlib"),
            CompressionFormat::Deflate => write!(f, "deflate"),
        }
    }
}

/// Layer that compresses payloads.
///
/// Defaults to zlib at level 6.
#[derive(Debug, Clone, Copy)]
pub struct CompressLayer {
    format: CompressionFormat,
    level: u32,
}

impl CompressLayer {
    /// Creates a compression layer with default settings.
    pub fn new() -> Self {
        Self {
            format: CompressionFormat::default(),
            level: DEFAULT_LEVEL,
        }
    }

    /// Sets the stream format.
    pub fn format(mut self, format: CompressionFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the compression level, 0 (store) to 9 (best). Values above 9
    /// are clamped.
    pub fn level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }
}

impl Default for CompressLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for CompressLayer {
    type Service = Compress<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Compress {
            inner,
            format: self.format,
            level: self.level,
        }
    }
}

impl StageLayer for CompressLayer {
    fn kind(&self) -> StageKind {
        StageKind::Compress(self.format)
    }

    fn wrap(&self, downstream: BoxOperate) -> BoxOperate {
        Box::new(self.layer(downstream))
    }
}

/// Stage that compresses its input, then delegates to `S`.
#[derive(Debug, Clone)]
pub struct Compress<S> {
    inner: S,
    format: CompressionFormat,
    level: u32,
}

impl<S: Operate> Operate for Compress<S> {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        let compressed = compress(&input, self.format, self.level)?;
        self.inner.operate(compressed)
    }
}

/// Layer that decompresses payloads produced by [`CompressLayer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecompressLayer {
    format: CompressionFormat,
    max_output: Option<usize>,
}

impl DecompressLayer {
    /// Creates a decompression layer for zlib streams with no output bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stream format. Must match the format used to compress.
    pub fn format(mut self, format: CompressionFormat) -> Self {
        self.format = format;
        self
    }

    /// Rejects payloads that inflate to more than `limit` bytes.
    pub fn max_output(mut self, limit: usize) -> Self {
        self.max_output = Some(limit);
        self
    }
}

impl<S> Layer<S> for DecompressLayer {
    type Service = Decompress<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Decompress {
            inner,
            format: self.format,
            max_output: self.max_output,
        }
    }
}

impl StageLayer for DecompressLayer {
    fn kind(&self) -> StageKind {
        StageKind::Decompress(self.format)
    }

    fn wrap(&self, downstream: BoxOperate) -> BoxOperate {
        Box::new(self.layer(downstream))
    }
}

/// Stage that decompresses its input, then delegates to `S`.
#[derive(Debug, Clone)]
pub struct Decompress<S> {
    inner: S,
    format: CompressionFormat,
    max_output: Option<usize>,
}

impl<S: Operate> Operate for Decompress<S> {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        let inflated = decompress(&input, self.format, self.max_output)?;
        self.inner.operate(inflated)
    }
}

fn compress(input: &[u8], format: CompressionFormat, level: u32) -> Result<Bytes, TransformError> {
    let level = Compression::new(level);
    let buffer = Vec::with_capacity(input.len() / 2 + MIN_BUFFER);

    let written = match format {
        CompressionFormat::Zlib => {
            let mut encoder = ZlibEncoder::new(buffer, level);
            encoder.write_all(input).and_then(|_| encoder.finish())
        }
        CompressionFormat::Deflate => {
            let mut encoder = DeflateEncoder::new(buffer, level);
            encoder.write_all(input).and_then(|_| encoder.finish())
        }
    };

    written
        .map(Bytes::from)
        .map_err(|err| TransformError::propagated(COMPRESS, err))
}

fn decompress(
    input: &[u8],
    format: CompressionFormat,
    max_output: Option<usize>,
) -> Result<Bytes, TransformError> {
    let mut decoder = Inflater::new(format.has_zlib_header());
    let mut output = Vec::with_capacity(input.len().saturating_mul(2).max(MIN_BUFFER));

    loop {
        if output.len() == output.capacity() {
            output.reserve(output.capacity().max(MIN_BUFFER));
        }

        let consumed_before = decoder.total_in();
        let produced_before = decoder.total_out();
        let remaining = &input[consumed_before as usize..];

        let status = decoder
            .decompress_vec(remaining, &mut output, FlushDecompress::None)
            .map_err(|err| {
                TransformError::corrupt(DECOMPRESS, format!("invalid {format} stream: {err}"))
            })?;

        if let Some(limit) = max_output {
            if output.len() > limit {
                return Err(TransformError::corrupt(
                    DECOMPRESS,
                    format!("inflated size exceeds limit of {limit} bytes"),
                ));
            }
        }

        if matches!(status, Status::StreamEnd) {
            break;
        }

        let progressed =
            decoder.total_in() != consumed_before || decoder.total_out() != produced_before;
        if !progressed && output.len() < output.capacity() {
            return Err(TransformError::corrupt(
                DECOMPRESS,
                format!("truncated {format} stream: missing end of stream"),
            ));
        }
    }

    let consumed = decoder.total_in() as usize;
    if consumed != input.len() {
        return Err(TransformError::corrupt(
            DECOMPRESS,
            format!(
                "{} trailing bytes after end of {format} stream",
                input.len() - consumed
            ),
        ));
    }

    Ok(Bytes::from(output))
}

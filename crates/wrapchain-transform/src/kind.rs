//! Stage descriptors and the mirror diagnostic.
//!
//! A decode chain must be the exact mirror of its encode chain: same length,
//! reverse order, every stage swapped for its inverse. Pipelines never check
//! or fix this on their own. [`check_mirror`] lets a caller verify a pair of
//! chains up front, typically once at startup.

use crate::cipher::KeyId;
use crate::compress::CompressionFormat;
use std::fmt;

/// Describes one stage of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Compression in the given format.
    Compress(CompressionFormat),
    /// Decompression of the given format.
    Decompress(CompressionFormat),
    /// Encryption under the identified key.
    Encrypt(KeyId),
    /// Decryption under the identified key.
    Decrypt(KeyId),
    /// A closure stage built with [`stage_fn`](crate::stage_fn).
    Custom(&'static str),
}

impl StageKind {
    /// Returns the stage that undoes this one, if known.
    pub fn inverse(&self) -> Option<StageKind> {
        match *self {
            StageKind::Compress(format) => Some(StageKind::Decompress(format)),
            StageKind::Decompress(format) => Some(StageKind::Compress(format)),
            StageKind::Encrypt(key) => Some(StageKind::Decrypt(key)),
            StageKind::Decrypt(key) => Some(StageKind::Encrypt(key)),
            StageKind::Custom(_) => None,
        }
    }

    /// Returns the stage name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match *self {
            StageKind::Compress(_) => crate::compress::COMPRESS,
            StageKind::Decompress(_) => crate::compress::DECOMPRESS,
            StageKind::Encrypt(_) => crate::cipher::ENCRYPT,
            StageKind::Decrypt(_) => crate::cipher::DECRYPT,
            StageKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Compress(format) | StageKind::Decompress(format) => {
                write!(f, "{}({})", self.name(), format)
            }
            StageKind::Encrypt(key) | StageKind::Decrypt(key) => {
                write!(f, "{}(key {})", self.name(), key)
            }
            StageKind::Custom(name) => write!(f, "custom({name})"),
        }
    }
}

/// Why a decode chain does not mirror an encode chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MirrorError {
    /// The chains have different lengths.
    #[error("encode chain has {encode} stages but decode chain has {decode}")]
    LengthMismatch {
        /// Stages in the encode chain.
        encode: usize,
        /// Stages in the decode chain.
        decode: usize,
    },
    /// A decode stage is not the inverse of its mirrored encode stage.
    #[error("decode stage {position} should be {expected} but is {found}")]
    StageMismatch {
        /// Zero-based position in the decode chain.
        position: usize,
        /// The stage the mirror requires.
        expected: StageKind,
        /// The stage actually configured.
        found: StageKind,
    },
    /// The encode stage has no known inverse, so the pair cannot be checked.
    #[error("decode stage {position} mirrors {stage}, which has no known inverse")]
    Unverifiable {
        /// Zero-based position in the decode chain.
        position: usize,
        /// The encode stage without a known inverse.
        stage: StageKind,
    },
}

/// Checks that `decode` is the mirror image of `encode`.
///
/// Reports the first mismatch found walking the decode chain from its
/// outermost stage. Nothing is reordered or repaired.
///
/// ```
/// use wrapchain_transform::{check_mirror, CompressionFormat, StageKind};
///
/// let zlib = CompressionFormat::Zlib;
/// let encode = [StageKind::Compress(zlib)];
///
/// assert!(check_mirror(&encode, &[StageKind::Decompress(zlib)]).is_ok());
/// assert!(check_mirror(&encode, &[StageKind::Compress(zlib)]).is_err());
/// ```
pub fn check_mirror(encode: &[StageKind], decode: &[StageKind]) -> Result<(), MirrorError> {
    if encode.len() != decode.len() {
        return Err(MirrorError::LengthMismatch {
            encode: encode.len(),
            decode: decode.len(),
        });
    }

    for (position, (stage, found)) in encode.iter().rev().zip(decode).enumerate() {
        let expected = stage.inverse().ok_or(MirrorError::Unverifiable {
            position,
            stage: *stage,
        })?;

        if expected != *found {
            return Err(MirrorError::StageMismatch {
                position,
                expected,
                found: *found,
            });
        }
    }

    Ok(())
}

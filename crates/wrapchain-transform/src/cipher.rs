//! Cipher stages.
//!
//! Payloads are sealed with AES-256-GCM. The wire layout is
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)`; a fresh random nonce
//! is drawn for every payload, so encrypting the same input twice yields
//! different output.
//!
//! The key length is checked when a payload is processed, not when the
//! layer is built: a chain configured with a short key fails every call
//! with [`TransformErrorKind::BadKey`](crate::TransformErrorKind::BadKey).

use crate::error::TransformError;
use crate::kind::StageKind;
use crate::operate::{BoxOperate, Operate};
use crate::pipeline::StageLayer;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tower_layer::Layer;

pub(crate) const ENCRYPT: &str = "encrypt";
pub(crate) const DECRYPT: &str = "decrypt";

/// Required key length in bytes.
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Key material for the cipher stages.
///
/// `Debug` never prints the key, only its [`KeyId`].
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey {
    bytes: Arc<[u8]>,
}

impl CipherKey {
    /// Uses `bytes` as the raw key. It must be exactly [`KEY_LEN`] bytes
    /// long, otherwise every encrypt or decrypt fails with `BadKey`.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            bytes: Arc::from(bytes.as_ref()),
        }
    }

    /// Derives a key from a passphrase of any length.
    ///
    /// The key is the lowercase hex MD5 digest of the passphrase, which is
    /// exactly [`KEY_LEN`] bytes. Both ends of a chain must use the same
    /// derivation.
    pub fn from_passphrase(passphrase: impl AsRef<str>) -> Self {
        let digest = md5::compute(passphrase.as_ref().as_bytes());
        Self::from_bytes(format!("{digest:x}"))
    }

    /// Returns the key length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty key.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a short fingerprint identifying this key.
    pub fn id(&self) -> KeyId {
        let digest = md5::compute(&self.bytes);
        let mut id = [0u8; 4];
        id.copy_from_slice(&digest.0[..4]);
        KeyId(id)
    }

    fn cipher(&self, stage: &'static str) -> Result<Aes256Gcm, TransformError> {
        if self.bytes.len() != KEY_LEN {
            return Err(TransformError::bad_key(
                stage,
                format!("key must be {KEY_LEN} bytes, got {}", self.bytes.len()),
            ));
        }

        Aes256Gcm::new_from_slice(&self.bytes)
            .map_err(|_| TransformError::bad_key(stage, "key rejected by cipher"))
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherKey")
            .field("id", &self.id())
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Fingerprint of a [`CipherKey`]: the first four bytes of the MD5 digest
/// of the key, shown as hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 4]);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({self})")
    }
}

/// Layer that encrypts payloads under a key.
#[derive(Debug, Clone)]
pub struct EncryptLayer {
    key: CipherKey,
}

impl EncryptLayer {
    /// Creates an encryption layer.
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }
}

impl<S> Layer<S> for EncryptLayer {
    type Service = Encrypt<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Encrypt {
            inner,
            key: self.key.clone(),
        }
    }
}

impl StageLayer for EncryptLayer {
    fn kind(&self) -> StageKind {
        StageKind::Encrypt(self.key.id())
    }

    fn wrap(&self, downstream: BoxOperate) -> BoxOperate {
        Box::new(self.layer(downstream))
    }
}

/// Stage that encrypts its input, then delegates to `S`.
#[derive(Debug, Clone)]
pub struct Encrypt<S> {
    inner: S,
    key: CipherKey,
}

impl<S: Operate> Operate for Encrypt<S> {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        let sealed = seal(&self.key, &input)?;
        self.inner.operate(sealed)
    }
}

/// Layer that decrypts payloads produced by [`EncryptLayer`].
#[derive(Debug, Clone)]
pub struct DecryptLayer {
    key: CipherKey,
}

impl DecryptLayer {
    /// Creates a decryption layer. The key must be the one used to encrypt.
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }
}

impl<S> Layer<S> for DecryptLayer {
    type Service = Decrypt<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Decrypt {
            inner,
            key: self.key.clone(),
        }
    }
}

impl StageLayer for DecryptLayer {
    fn kind(&self) -> StageKind {
        StageKind::Decrypt(self.key.id())
    }

    fn wrap(&self, downstream: BoxOperate) -> BoxOperate {
        Box::new(self.layer(downstream))
    }
}

/// Stage that decrypts its input, then delegates to `S`.
#[derive(Debug, Clone)]
pub struct Decrypt<S> {
    inner: S,
    key: CipherKey,
}

impl<S: Operate> Operate for Decrypt<S> {
    fn operate(&self, input: Bytes) -> Result<Bytes, TransformError> {
        let opened = open(&self.key, &input)?;
        self.inner.operate(opened)
    }
}

fn seal(key: &CipherKey, plaintext: &[u8]) -> Result<Bytes, TransformError> {
    let cipher = key.cipher(ENCRYPT)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| TransformError::corrupt(ENCRYPT, "payload too large to encrypt"))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(Bytes::from(out))
}

fn open(key: &CipherKey, data: &[u8]) -> Result<Bytes, TransformError> {
    let cipher = key.cipher(DECRYPT)?;

    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(TransformError::corrupt(
            DECRYPT,
            format!(
                "ciphertext is {} bytes, need at least {}",
                data.len(),
                NONCE_LEN + TAG_LEN
            ),
        ));
    }

    let (nonce, sealed) = data.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map(Bytes::from)
        .map_err(|_| {
            TransformError::corrupt(DECRYPT, "authentication failed: wrong key or tampered data")
        })
}

//! Error taxonomy for the hybrid KEM service.
//!
//! Every failure carries a stable [`ErrorKind`] code, a human-readable
//! message, an optional wrapped cause and the time it was raised. Callers map
//! kinds to end-user text; this crate never does.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Stable error codes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[error("initialization failed and classical fallback is disabled")]
    InitFailedNoFallback,
    #[error("post-quantum backend self-verification failed")]
    VerificationFailed,
    #[error("invalid keypair")]
    InvalidKeypair,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid public key size")]
    InvalidPublicKeySize,
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid private key size")]
    InvalidPrivateKeySize,
    #[error("invalid ciphertext")]
    InvalidCiphertext,
    #[error("invalid ciphertext size")]
    InvalidCiphertextSize,
    #[error("keypair generation failed")]
    KeypairGenerationFailed,
    #[error("encapsulation failed")]
    EncapsulationFailed,
    #[error("Kyber encapsulation failed")]
    KyberEncapsulationFailed,
    #[error("decapsulation failed")]
    DecapsulationFailed,
    #[error("Kyber decapsulation failed")]
    KyberDecapsulationFailed,
    #[error("invalid X25519 public key")]
    InvalidX25519PublicKey,
    #[error("invalid X25519 private key")]
    InvalidX25519PrivateKey,
    #[error("invalid X25519 shared secret")]
    InvalidX25519SharedSecret,
    #[error("base64 encoding failed")]
    Base64EncodingFailed,
    #[error("base64 decoding failed")]
    Base64DecodingFailed,
    #[error("invalid hex string")]
    InvalidHexString,
    #[error("classical fallback initialization failed")]
    FallbackInitFailed,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InitFailedNoFallback => "INIT_FAILED_NO_FALLBACK",
            ErrorKind::VerificationFailed => "VERIFICATION_FAILED",
            ErrorKind::InvalidKeypair => "INVALID_KEYPAIR",
            ErrorKind::InvalidPublicKey => "INVALID_PUBLIC_KEY",
            ErrorKind::InvalidPublicKeySize => "INVALID_PUBLIC_KEY_SIZE",
            ErrorKind::InvalidPrivateKey => "INVALID_PRIVATE_KEY",
            ErrorKind::InvalidPrivateKeySize => "INVALID_PRIVATE_KEY_SIZE",
            ErrorKind::InvalidCiphertext => "INVALID_CIPHERTEXT",
            ErrorKind::InvalidCiphertextSize => "INVALID_CIPHERTEXT_SIZE",
            ErrorKind::KeypairGenerationFailed => "KEYPAIR_GENERATION_FAILED",
            ErrorKind::EncapsulationFailed => "ENCAPSULATION_FAILED",
            ErrorKind::KyberEncapsulationFailed => "KYBER_ENCAPSULATION_FAILED",
            ErrorKind::DecapsulationFailed => "DECAPSULATION_FAILED",
            ErrorKind::KyberDecapsulationFailed => "KYBER_DECAPSULATION_FAILED",
            ErrorKind::InvalidX25519PublicKey => "INVALID_X25519_PUBLIC_KEY",
            ErrorKind::InvalidX25519PrivateKey => "INVALID_X25519_PRIVATE_KEY",
            ErrorKind::InvalidX25519SharedSecret => "INVALID_X25519_SHARED_SECRET",
            ErrorKind::Base64EncodingFailed => "BASE64_ENCODING_FAILED",
            ErrorKind::Base64DecodingFailed => "BASE64_DECODING_FAILED",
            ErrorKind::InvalidHexString => "INVALID_HEX_STRING",
            ErrorKind::FallbackInitFailed => "FALLBACK_INIT_FAILED",
        }
    }

    /// Argument-validation kinds. These are raised before any cryptographic
    /// work and are never wrapped by the operation-level kinds.
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidKeypair
                | ErrorKind::InvalidPublicKey
                | ErrorKind::InvalidPublicKeySize
                | ErrorKind::InvalidPrivateKey
                | ErrorKind::InvalidPrivateKeySize
                | ErrorKind::InvalidCiphertext
                | ErrorKind::InvalidCiphertextSize
                | ErrorKind::InvalidX25519PublicKey
                | ErrorKind::InvalidX25519PrivateKey
        )
    }
}

type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised by every fallible operation in this crate.
///
/// Cloneable so a single initialization outcome can be handed to every
/// caller that awaited it.
#[derive(Error, Clone)]
#[error("[{}] {}", .kind.code(), .message)]
pub struct KemError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Cause>,
    timestamp: DateTime<Utc>,
}

pub type Result<T> = std::result::Result<T, KemError>;

impl KemError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the underlying error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Wrap `self` as the cause of a new error of `kind`, unless it is a
    /// validation error, which propagates unchanged.
    pub(crate) fn wrap_unless_validation(self, kind: ErrorKind, message: &str) -> Self {
        if self.kind.is_validation() || self.kind == kind {
            self
        } else {
            KemError::new(kind, message).with_cause(self)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Debug for KemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KemError")
            .field("code", &self.code())
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

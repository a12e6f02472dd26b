/// Hybrid KEM Type Definitions
/// X25519 + Kyber-768 / ML-KEM-768 (NIST FIPS 203, security category 3)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::codec;
use crate::error::{ErrorKind, KemError, Result};

/// Kyber-768 parameter constants
pub const KYBER_PUBLIC_KEY_BYTES: usize = 1184;
pub const KYBER_SECRET_KEY_BYTES: usize = 2400;
pub const KYBER_CIPHERTEXT_BYTES: usize = 1088;
pub const KYBER_SHARED_SECRET_BYTES: usize = 32;

/// X25519 parameter constants
pub const X25519_PUBLIC_KEY_BYTES: usize = 32;
pub const X25519_SECRET_KEY_BYTES: usize = 32;
pub const X25519_SHARED_SECRET_BYTES: usize = 32;

/// Pre-hash secret material when both legs are present (PQ ‖ classical)
pub const COMBINED_SECRET_MATERIAL_BYTES: usize =
    KYBER_SHARED_SECRET_BYTES + X25519_SHARED_SECRET_BYTES;

/// Big-endian PQ length prefix in every combined frame
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Which construction produced a key, ciphertext or secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    /// Kyber-768 + X25519
    HybridPqClassical,
    /// X25519 only, secret expanded to the service output length
    ClassicalOnly,
}

impl Algorithm {
    pub fn is_quantum_resistant(self) -> bool {
        matches!(self, Algorithm::HybridPqClassical)
    }

    pub fn label(self) -> &'static str {
        match self {
            Algorithm::HybridPqClassical => "Kyber768+X25519",
            Algorithm::ClassicalOnly => "X25519",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Declared length of every shared secret the service hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SharedSecretLength {
    #[default]
    #[serde(rename = "32")]
    Bytes32,
    #[serde(rename = "64")]
    Bytes64,
}

impl SharedSecretLength {
    pub fn bytes(self) -> usize {
        match self {
            SharedSecretLength::Bytes32 => 32,
            SharedSecretLength::Bytes64 => 64,
        }
    }
}

fn check_len(bytes: &[u8], expected: usize, kind: ErrorKind, what: &str) -> Result<()> {
    if bytes.len() != expected {
        return Err(KemError::new(
            kind,
            format!("{} must be {} bytes, got {}", what, expected, bytes.len()),
        ));
    }
    Ok(())
}

// ── Post-quantum components ─────────────────────────────────────────────────

/// Kyber-768 public (encapsulation) key, exactly 1184 bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct PqPublicKey(Vec<u8>);

impl PqPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_len(
            bytes,
            KYBER_PUBLIC_KEY_BYTES,
            ErrorKind::InvalidPublicKeySize,
            "Kyber public key",
        )?;
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PqPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PqPublicKey({}…)", codec::hex_encode(&self.0[..8]))
    }
}

/// Kyber-768 secret (decapsulation) key, exactly 2400 bytes. Zeroed on drop.
#[derive(Clone)]
pub struct PqSecretKey(Zeroizing<Vec<u8>>);

impl PqSecretKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_len(
            bytes,
            KYBER_SECRET_KEY_BYTES,
            ErrorKind::InvalidPrivateKeySize,
            "Kyber secret key",
        )?;
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PqSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PqSecretKey(<redacted>)")
    }
}

/// Kyber-768 ciphertext, exactly 1088 bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct PqCiphertext(Vec<u8>);

impl PqCiphertext {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_len(
            bytes,
            KYBER_CIPHERTEXT_BYTES,
            ErrorKind::InvalidCiphertextSize,
            "Kyber ciphertext",
        )?;
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PqCiphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PqCiphertext({}…)", codec::hex_encode(&self.0[..8]))
    }
}

// ── Classical components ────────────────────────────────────────────────────

/// X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ClassicalPublicKey([u8; X25519_PUBLIC_KEY_BYTES]);

impl ClassicalPublicKey {
    pub fn from_array(bytes: [u8; X25519_PUBLIC_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_len(
            bytes,
            X25519_PUBLIC_KEY_BYTES,
            ErrorKind::InvalidX25519PublicKey,
            "X25519 public key",
        )?;
        let mut out = [0u8; X25519_PUBLIC_KEY_BYTES];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; X25519_PUBLIC_KEY_BYTES] {
        &self.0
    }
}

impl fmt::Debug for ClassicalPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassicalPublicKey({})", codec::hex_encode(&self.0))
    }
}

/// X25519 private scalar (32 bytes). Zeroed on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct ClassicalSecretKey([u8; X25519_SECRET_KEY_BYTES]);

impl ClassicalSecretKey {
    pub fn from_array(bytes: [u8; X25519_SECRET_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_len(
            bytes,
            X25519_SECRET_KEY_BYTES,
            ErrorKind::InvalidX25519PrivateKey,
            "X25519 private key",
        )?;
        let mut out = [0u8; X25519_SECRET_KEY_BYTES];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; X25519_SECRET_KEY_BYTES] {
        &self.0
    }
}

impl fmt::Debug for ClassicalSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClassicalSecretKey(<redacted>)")
    }
}

// ── Caller-facing results ───────────────────────────────────────────────────

/// Final shared secret. Length is the service's declared output length in
/// both modes. Zeroed on drop; equality is constant-time.
#[derive(Clone)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub(crate) fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        codec::hex_encode(&self.0)
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        codec::eq_slices(&self.0, &other.0)
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Keypair handed to the caller. The service keeps no copy.
#[derive(Clone)]
pub struct Keypair {
    /// Combined public key (see [`crate::kem::framing`])
    pub public_key: Vec<u8>,
    /// Combined private key, zeroed on drop
    pub private_key: Zeroizing<Vec<u8>>,
    pub algorithm: Algorithm,
    /// Combined public key length in bytes
    pub key_size: usize,
    pub created_at: DateTime<Utc>,
}

impl Keypair {
    pub fn public_key_hex(&self) -> String {
        codec::hex_encode(&self.public_key)
    }

    pub fn public_key_base64(&self) -> String {
        codec::base64_encode(&self.public_key)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("algorithm", &self.algorithm)
            .field("key_size", &self.key_size)
            .field("private_key", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Output of a hybrid encapsulation.
#[derive(Debug, Clone)]
pub struct EncapsulationResult {
    /// Combined ciphertext: PQ ciphertext (possibly empty) + X25519 ephemeral public key
    pub ciphertext: Vec<u8>,
    pub shared_secret: SharedSecret,
    pub algorithm: Algorithm,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(COMBINED_SECRET_MATERIAL_BYTES, 64);
        assert_eq!(SharedSecretLength::default().bytes(), 32);
        assert_eq!(SharedSecretLength::Bytes64.bytes(), 64);
    }

    #[test]
    fn test_pq_sizes_enforced() {
        assert!(PqPublicKey::from_bytes(&[0u8; KYBER_PUBLIC_KEY_BYTES]).is_ok());
        let err = PqPublicKey::from_bytes(&[0u8; 1568]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPublicKeySize);

        let err = PqSecretKey::from_bytes(&[0u8; 3168]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPrivateKeySize);

        let err = PqCiphertext::from_bytes(&[0u8; 10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCiphertextSize);
    }

    #[test]
    fn test_classical_sizes_enforced() {
        let err = ClassicalPublicKey::from_bytes(&[1u8; 31]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidX25519PublicKey);
        let err = ClassicalSecretKey::from_bytes(&[1u8; 33]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidX25519PrivateKey);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let sk = ClassicalSecretKey::from_array([9u8; 32]);
        assert!(!format!("{:?}", sk).contains("09"));
        let ss = SharedSecret::new(Zeroizing::new(vec![0xAB; 32]));
        assert!(!format!("{:?}", ss).contains("ab"));
    }

    #[test]
    fn test_shared_secret_eq() {
        let a = SharedSecret::new(Zeroizing::new(vec![1u8; 32]));
        let b = SharedSecret::new(Zeroizing::new(vec![1u8; 32]));
        let c = SharedSecret::new(Zeroizing::new(vec![2u8; 32]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_keypair_transport_helpers() {
        let kp = Keypair {
            public_key: vec![0x00, 0xff, 0x10],
            private_key: Zeroizing::new(vec![7u8; 3]),
            algorithm: Algorithm::ClassicalOnly,
            key_size: 3,
            created_at: Utc::now(),
        };
        assert_eq!(kp.public_key_hex(), "00ff10");
        assert_eq!(kp.public_key_base64(), "AP8Q");
        assert!(!format!("{:?}", kp).contains("07"));

        let ss = SharedSecret::new(Zeroizing::new(vec![0xab, 0x01]));
        assert_eq!(ss.to_hex(), "ab01");
    }

    #[test]
    fn test_algorithm_serializes_as_code() {
        let json = serde_json::to_string(&Algorithm::ClassicalOnly).unwrap();
        assert_eq!(json, "\"CLASSICAL_ONLY\"");
        assert!(Algorithm::HybridPqClassical.is_quantum_resistant());
    }
}

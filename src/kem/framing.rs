/// Combined key / ciphertext wire format
///
/// Every frame is:
///
/// ```text
/// [4-byte big-endian PQ length][PQ component, if length > 0][32-byte X25519 component]
/// ```
///
/// | Frame        | PQ component               | Classical component          |
/// |--------------|----------------------------|------------------------------|
/// | public key   | Kyber-768 public key 1184  | X25519 public key            |
/// | private key  | Kyber-768 secret key 2400  | X25519 private scalar        |
/// | ciphertext   | Kyber-768 ciphertext 1088  | X25519 ephemeral public key  |
///
/// A zero length prefix means classical-only. Total length is always
/// `4 + pq_len + 32`; anything else is rejected before any crypto runs.

use zeroize::Zeroizing;

use super::types::*;
use crate::error::{ErrorKind, KemError, Result};

/// Error kinds used when a frame of a given role is malformed.
#[derive(Debug, Clone, Copy)]
struct FrameRole {
    what: &'static str,
    invalid: ErrorKind,
}

const PUBLIC_KEY_ROLE: FrameRole = FrameRole {
    what: "combined public key",
    invalid: ErrorKind::InvalidPublicKey,
};

const PRIVATE_KEY_ROLE: FrameRole = FrameRole {
    what: "combined private key",
    invalid: ErrorKind::InvalidPrivateKey,
};

const CIPHERTEXT_ROLE: FrameRole = FrameRole {
    what: "combined ciphertext",
    invalid: ErrorKind::InvalidCiphertext,
};

/// Size of a frame carrying a PQ component of `pq_len` bytes.
pub fn framed_len(pq_len: usize) -> usize {
    LENGTH_PREFIX_BYTES + pq_len + X25519_PUBLIC_KEY_BYTES
}

fn encode_frame(pq: Option<&[u8]>, classical: &[u8; 32]) -> Vec<u8> {
    let pq = pq.unwrap_or(&[]);
    let mut out = Vec::with_capacity(framed_len(pq.len()));
    out.extend_from_slice(&(pq.len() as u32).to_be_bytes());
    out.extend_from_slice(pq);
    out.extend_from_slice(classical);
    out
}

/// Split a frame into its (optional) PQ slice and classical slice.
fn split_frame<'a>(bytes: &'a [u8], role: FrameRole) -> Result<(Option<&'a [u8]>, &'a [u8])> {
    if bytes.is_empty() {
        return Err(KemError::new(
            role.invalid,
            format!("{} must not be empty", role.what),
        ));
    }
    if bytes.len() < LENGTH_PREFIX_BYTES + X25519_PUBLIC_KEY_BYTES {
        return Err(KemError::new(
            role.invalid,
            format!(
                "{} too short: {} bytes (minimum {})",
                role.what,
                bytes.len(),
                LENGTH_PREFIX_BYTES + X25519_PUBLIC_KEY_BYTES
            ),
        ));
    }

    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    prefix.copy_from_slice(&bytes[..LENGTH_PREFIX_BYTES]);
    let pq_len = u32::from_be_bytes(prefix) as usize;

    let expected = LENGTH_PREFIX_BYTES
        .checked_add(pq_len)
        .and_then(|n| n.checked_add(X25519_PUBLIC_KEY_BYTES));
    if expected != Some(bytes.len()) {
        return Err(KemError::new(
            role.invalid,
            format!(
                "{} length mismatch: prefix declares {} PQ bytes, frame is {} bytes",
                role.what,
                pq_len,
                bytes.len()
            ),
        ));
    }

    let body = &bytes[LENGTH_PREFIX_BYTES..];
    let (pq, classical) = body.split_at(pq_len);
    let pq = if pq_len == 0 { None } else { Some(pq) };
    Ok((pq, classical))
}

// ── Public key ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedPublicKey {
    pub pq: Option<PqPublicKey>,
    pub classical: ClassicalPublicKey,
}

impl CombinedPublicKey {
    pub fn algorithm(&self) -> Algorithm {
        if self.pq.is_some() {
            Algorithm::HybridPqClassical
        } else {
            Algorithm::ClassicalOnly
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(self.pq.as_ref().map(|k| k.as_bytes()), self.classical.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (pq, classical) = split_frame(bytes, PUBLIC_KEY_ROLE)?;
        let pq = pq.map(PqPublicKey::from_bytes).transpose()?;
        let classical = ClassicalPublicKey::from_bytes(classical)?;
        Ok(Self { pq, classical })
    }
}

// ── Private key ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CombinedPrivateKey {
    pub pq: Option<PqSecretKey>,
    pub classical: ClassicalSecretKey,
}

impl CombinedPrivateKey {
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(encode_frame(
            self.pq.as_ref().map(|k| k.as_bytes()),
            self.classical.as_bytes(),
        ))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (pq, classical) = split_frame(bytes, PRIVATE_KEY_ROLE)?;
        let pq = pq.map(PqSecretKey::from_bytes).transpose()?;
        let classical = ClassicalSecretKey::from_bytes(classical)?;
        Ok(Self { pq, classical })
    }
}

// ── Ciphertext ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedCiphertext {
    pub pq: Option<PqCiphertext>,
    pub classical_ephemeral: ClassicalPublicKey,
}

impl CombinedCiphertext {
    pub fn algorithm(&self) -> Algorithm {
        if self.pq.is_some() {
            Algorithm::HybridPqClassical
        } else {
            Algorithm::ClassicalOnly
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(
            self.pq.as_ref().map(|c| c.as_bytes()),
            self.classical_ephemeral.as_bytes(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (pq, classical) = split_frame(bytes, CIPHERTEXT_ROLE)?;
        let pq = pq.map(PqCiphertext::from_bytes).transpose()?;
        let classical_ephemeral = ClassicalPublicKey::from_bytes(classical)?;
        Ok(Self {
            pq,
            classical_ephemeral,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hybrid_public() -> CombinedPublicKey {
        CombinedPublicKey {
            pq: Some(PqPublicKey::from_bytes(&[0x5Au8; KYBER_PUBLIC_KEY_BYTES]).unwrap()),
            classical: ClassicalPublicKey::from_array([0x11u8; 32]),
        }
    }

    #[test]
    fn test_public_key_layout() {
        let bytes = hybrid_public().to_bytes();
        assert_eq!(bytes.len(), 4 + KYBER_PUBLIC_KEY_BYTES + 32);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0x04, 0xA0]); // 1184
        assert_eq!(bytes[4], 0x5A);
        assert_eq!(&bytes[bytes.len() - 32..], &[0x11u8; 32]);

        let parsed = CombinedPublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, hybrid_public());
        assert_eq!(parsed.algorithm(), Algorithm::HybridPqClassical);
    }

    #[test]
    fn test_classical_only_frame() {
        let key = CombinedPublicKey {
            pq: None,
            classical: ClassicalPublicKey::from_array([0x22u8; 32]),
        };
        let bytes = key.to_bytes();
        assert_eq!(bytes.len(), 36);
        assert_eq!(&bytes[..4], &[0u8; 4]);

        let parsed = CombinedPublicKey::from_bytes(&bytes).unwrap();
        assert!(parsed.pq.is_none());
        assert_eq!(parsed.algorithm(), Algorithm::ClassicalOnly);
    }

    #[test]
    fn test_private_key_layout() {
        let key = CombinedPrivateKey {
            pq: Some(PqSecretKey::from_bytes(&[0x33u8; KYBER_SECRET_KEY_BYTES]).unwrap()),
            classical: ClassicalSecretKey::from_array([0x44u8; 32]),
        };
        let bytes = key.to_bytes();
        assert_eq!(bytes.len(), framed_len(KYBER_SECRET_KEY_BYTES));
        assert_eq!(&bytes[..4], &(KYBER_SECRET_KEY_BYTES as u32).to_be_bytes());

        let parsed = CombinedPrivateKey::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.classical.as_bytes(), &[0x44u8; 32]);
        assert_eq!(parsed.pq.unwrap().as_bytes(), &[0x33u8; KYBER_SECRET_KEY_BYTES][..]);
    }

    #[test]
    fn test_ciphertext_layout() {
        let ct = CombinedCiphertext {
            pq: Some(PqCiphertext::from_bytes(&[0x66u8; KYBER_CIPHERTEXT_BYTES]).unwrap()),
            classical_ephemeral: ClassicalPublicKey::from_array([0x77u8; 32]),
        };
        let bytes = ct.to_bytes();
        assert_eq!(bytes.len(), 4 + 1088 + 32);
        assert_eq!(CombinedCiphertext::from_bytes(&bytes).unwrap(), ct);
    }

    #[test]
    fn test_empty_and_truncated_rejected() {
        let err = CombinedPublicKey::from_bytes(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPublicKey);

        let err = CombinedPrivateKey::from_bytes(&[0, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPrivateKey);

        let mut bytes = hybrid_public().to_bytes();
        bytes.pop();
        let err = CombinedPublicKey::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPublicKey);
    }

    #[test]
    fn test_oversized_prefix_rejected() {
        let mut bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(&[0u8; 32]);
        let err = CombinedCiphertext::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCiphertext);
    }

    #[test]
    fn test_wrong_pq_size_is_size_error() {
        // Self-consistent frame with a 1568-byte (ML-KEM-1024) component
        let mut bytes = (1568u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 1568]);
        bytes.extend_from_slice(&[1u8; 32]);
        let err = CombinedPublicKey::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPublicKeySize);

        let err = CombinedCiphertext::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCiphertextSize);

        let err = CombinedPrivateKey::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPrivateKeySize);
    }
}

/// ML-KEM-768 backend (RustCrypto `ml-kem`, NIST FIPS 203)
///
/// Object-form source. Always compiled in, so it is the first thing the
/// prober tries.
///
/// Key sizes (ML-KEM-768):
/// - Encapsulation key (public):  1184 bytes
/// - Decapsulation key (secret):  2400 bytes
/// - Ciphertext:                  1088 bytes
/// - Shared secret:               32 bytes
use ::ml_kem::kem::{Decapsulate, DecapsulationKey, Encapsulate, EncapsulationKey};
use ::ml_kem::{Encoded, EncodedSizeUser, KemCore, MlKem768, MlKem768Params};
use rand::rngs::OsRng;
use std::sync::Arc;
use zeroize::Zeroizing;

use super::{BackendCandidate, BackendShape, KemBackend, RawEncapsulation, RawKeypair};
use crate::error::{ErrorKind, KemError, Result};

pub const BACKEND_NAME: &str = "ml-kem/ML-KEM-768";

pub struct MlKem768Backend;

impl KemBackend for MlKem768Backend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn keypair(&self) -> Result<RawKeypair> {
        let (dk, ek) = MlKem768::generate(&mut OsRng);
        Ok(RawKeypair {
            public_key: ek.as_bytes().to_vec(),
            secret_key: Zeroizing::new(dk.as_bytes().to_vec()),
        })
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<RawEncapsulation> {
        // Reconstruct ML-KEM-768 EncapsulationKey from raw bytes
        let ek_encoded = Encoded::<EncapsulationKey<MlKem768Params>>::try_from(public_key)
            .map_err(|_| {
                KemError::new(
                    ErrorKind::InvalidPublicKeySize,
                    format!("ML-KEM-768 public key has wrong length: {}", public_key.len()),
                )
            })?;
        let ek = EncapsulationKey::<MlKem768Params>::from_bytes(&ek_encoded);

        let (ct, ss) = ek.encapsulate(&mut OsRng).map_err(|_| {
            KemError::new(
                ErrorKind::KyberEncapsulationFailed,
                "ML-KEM-768 encapsulation failed",
            )
        })?;

        Ok(RawEncapsulation {
            ciphertext: ct.iter().copied().collect(),
            shared_secret: Zeroizing::new(ss.iter().copied().collect()),
        })
    }

    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let dk_encoded = Encoded::<DecapsulationKey<MlKem768Params>>::try_from(secret_key)
            .map_err(|_| {
                KemError::new(
                    ErrorKind::InvalidPrivateKeySize,
                    format!("ML-KEM-768 secret key has wrong length: {}", secret_key.len()),
                )
            })?;
        let dk = DecapsulationKey::<MlKem768Params>::from_bytes(&dk_encoded);

        let ct = ::ml_kem::Ciphertext::<MlKem768>::try_from(ciphertext).map_err(|_| {
            KemError::new(
                ErrorKind::InvalidCiphertextSize,
                format!("ML-KEM-768 ciphertext has wrong length: {}", ciphertext.len()),
            )
        })?;

        // Implicit rejection: a mismatched key yields a pseudorandom secret, not an error
        let ss = dk.decapsulate(&ct).map_err(|_| {
            KemError::new(
                ErrorKind::KyberDecapsulationFailed,
                "ML-KEM-768 decapsulation failed",
            )
        })?;

        Ok(Zeroizing::new(ss.iter().copied().collect()))
    }
}

/// Probe entry for [`MlKem768Backend`].
pub struct MlKemCandidate;

impl BackendCandidate for MlKemCandidate {
    fn source(&self) -> &'static str {
        "ml-kem"
    }

    fn probe(&self) -> Option<BackendShape> {
        Some(BackendShape::Object(Arc::new(MlKem768Backend)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kem::types::*;

    #[test]
    fn test_sizes() {
        let backend = MlKem768Backend;
        let kp = backend.keypair().unwrap();
        assert_eq!(kp.public_key.len(), KYBER_PUBLIC_KEY_BYTES);
        assert_eq!(kp.secret_key.len(), KYBER_SECRET_KEY_BYTES);

        let enc = backend.encapsulate(&kp.public_key).unwrap();
        assert_eq!(enc.ciphertext.len(), KYBER_CIPHERTEXT_BYTES);
        assert_eq!(enc.shared_secret.len(), KYBER_SHARED_SECRET_BYTES);
    }

    #[test]
    fn test_roundtrip() {
        let backend = MlKem768Backend;
        let kp = backend.keypair().unwrap();
        let enc = backend.encapsulate(&kp.public_key).unwrap();
        let ss = backend.decapsulate(&enc.ciphertext, &kp.secret_key).unwrap();
        assert_eq!(*ss, *enc.shared_secret);
    }

    #[test]
    fn test_wrong_key_implicit_rejection() {
        let backend = MlKem768Backend;
        let kp1 = backend.keypair().unwrap();
        let kp2 = backend.keypair().unwrap();
        let enc = backend.encapsulate(&kp1.public_key).unwrap();
        let ss = backend.decapsulate(&enc.ciphertext, &kp2.secret_key).unwrap();
        assert_ne!(*ss, *enc.shared_secret);
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        let backend = MlKem768Backend;
        let err = backend.encapsulate(&[0u8; 1568]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidPublicKeySize);

        let kp = backend.keypair().unwrap();
        let err = backend.decapsulate(&[0u8; 12], &kp.secret_key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCiphertextSize);
    }
}

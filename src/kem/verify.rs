//! Backend self-verification.
//!
//! One full keypair → encapsulate → decapsulate cycle against a freshly
//! acquired backend, with every length checked against the Kyber-768
//! constants. Any failure is `VERIFICATION_FAILED`; the caller must not fall
//! back to classical-only on this path.

use super::backend::KemBackend;
use super::types::*;
use crate::crypto::codec;
use crate::error::{ErrorKind, KemError, Result};

fn length_failure(backend: &dyn KemBackend, what: &str, expected: usize, got: usize) -> KemError {
    KemError::new(
        ErrorKind::VerificationFailed,
        format!(
            "{}: {} is {} bytes, expected {}",
            backend.name(),
            what,
            got,
            expected
        ),
    )
}

fn step_failure(backend: &dyn KemBackend, step: &str, cause: KemError) -> KemError {
    KemError::new(
        ErrorKind::VerificationFailed,
        format!("{}: {} failed during self-test", backend.name(), step),
    )
    .with_cause(cause)
}

pub fn self_verify(backend: &dyn KemBackend) -> Result<()> {
    let keypair = backend
        .keypair()
        .map_err(|e| step_failure(backend, "keypair", e))?;
    if keypair.public_key.len() != KYBER_PUBLIC_KEY_BYTES {
        return Err(length_failure(
            backend,
            "public key",
            KYBER_PUBLIC_KEY_BYTES,
            keypair.public_key.len(),
        ));
    }
    if keypair.secret_key.len() != KYBER_SECRET_KEY_BYTES {
        return Err(length_failure(
            backend,
            "secret key",
            KYBER_SECRET_KEY_BYTES,
            keypair.secret_key.len(),
        ));
    }

    let encapsulated = backend
        .encapsulate(&keypair.public_key)
        .map_err(|e| step_failure(backend, "encapsulate", e))?;
    if encapsulated.ciphertext.len() != KYBER_CIPHERTEXT_BYTES {
        return Err(length_failure(
            backend,
            "ciphertext",
            KYBER_CIPHERTEXT_BYTES,
            encapsulated.ciphertext.len(),
        ));
    }
    if encapsulated.shared_secret.len() != KYBER_SHARED_SECRET_BYTES {
        return Err(length_failure(
            backend,
            "shared secret",
            KYBER_SHARED_SECRET_BYTES,
            encapsulated.shared_secret.len(),
        ));
    }

    let recovered = backend
        .decapsulate(&encapsulated.ciphertext, &keypair.secret_key)
        .map_err(|e| step_failure(backend, "decapsulate", e))?;
    if !codec::eq_slices(&recovered, &encapsulated.shared_secret) {
        return Err(KemError::new(
            ErrorKind::VerificationFailed,
            format!("{}: decapsulated secret does not match", backend.name()),
        ));
    }

    log::debug!("Self-verification passed for {}", backend.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kem::backend::ml_kem::MlKem768Backend;
    use crate::kem::backend::{RawEncapsulation, RawKeypair};
    use zeroize::Zeroizing;

    /// Wraps the real backend and corrupts one step.
    enum Fault {
        ShortPublicKey,
        ShortCiphertext,
        WrongSecret,
        DecapsulateErrors,
    }

    struct Faulty(Fault);

    impl KemBackend for Faulty {
        fn name(&self) -> &'static str {
            "faulty"
        }

        fn keypair(&self) -> Result<RawKeypair> {
            let mut kp = MlKem768Backend.keypair()?;
            if matches!(self.0, Fault::ShortPublicKey) {
                kp.public_key.truncate(1000);
            }
            Ok(kp)
        }

        fn encapsulate(&self, public_key: &[u8]) -> Result<RawEncapsulation> {
            let mut enc = MlKem768Backend.encapsulate(public_key)?;
            if matches!(self.0, Fault::ShortCiphertext) {
                enc.ciphertext.pop();
            }
            Ok(enc)
        }

        fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
            match self.0 {
                Fault::WrongSecret => Ok(Zeroizing::new(vec![0u8; 32])),
                Fault::DecapsulateErrors => Err(KemError::new(
                    ErrorKind::KyberDecapsulationFailed,
                    "simulated",
                )),
                _ => MlKem768Backend.decapsulate(ciphertext, secret_key),
            }
        }
    }

    #[test]
    fn test_real_backend_passes() {
        self_verify(&MlKem768Backend).unwrap();
    }

    #[test]
    fn test_faults_are_verification_failures() {
        for fault in [
            Fault::ShortPublicKey,
            Fault::ShortCiphertext,
            Fault::WrongSecret,
            Fault::DecapsulateErrors,
        ] {
            let err = self_verify(&Faulty(fault)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::VerificationFailed);
        }
    }

    #[test]
    fn test_step_failure_keeps_cause() {
        let err = self_verify(&Faulty(Fault::DecapsulateErrors)).unwrap_err();
        assert!(err.cause().unwrap().to_string().contains("KYBER_DECAPSULATION_FAILED"));
    }
}

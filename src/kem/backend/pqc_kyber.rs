/// Kyber-768 backend (`pqc_kyber` reference port)
///
/// Flat-function-form source: the crate exposes free functions returning
/// its own fixed-size arrays, so it goes through [`super::FlatKemAdapter`].
/// Only built with the `pqc-kyber` feature.
use ::pqc_kyber::{decapsulate, encapsulate, keypair};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use super::{BackendCandidate, BackendShape, FlatKemFunctions, FlatKeypair};
use crate::error::{ErrorKind, KemError, Result};

pub const BACKEND_NAME: &str = "pqc_kyber/Kyber768";

fn kyber_keypair() -> Result<FlatKeypair> {
    let mut keys = keypair(&mut OsRng).map_err(|e| {
        KemError::new(
            ErrorKind::KeypairGenerationFailed,
            format!("Kyber key generation failed: {:?}", e),
        )
    })?;
    let out = FlatKeypair {
        public: keys.public.to_vec(),
        secret: keys.secret.to_vec(),
    };
    keys.secret.zeroize();
    Ok(out)
}

fn kyber_encapsulate(public_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let (ct, mut ss) = encapsulate(public_key, &mut OsRng).map_err(|e| {
        KemError::new(
            ErrorKind::KyberEncapsulationFailed,
            format!("Kyber encapsulation failed: {:?}", e),
        )
    })?;
    let out = (ct.to_vec(), ss.to_vec());
    ss.zeroize();
    Ok(out)
}

fn kyber_decapsulate(ciphertext: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
    let mut ss = decapsulate(ciphertext, secret_key).map_err(|e| {
        KemError::new(
            ErrorKind::KyberDecapsulationFailed,
            format!("Kyber decapsulation failed: {:?}", e),
        )
    })?;
    let out = ss.to_vec();
    ss.zeroize();
    Ok(out)
}

/// Probe entry for the flat `pqc_kyber` functions.
pub struct PqcKyberCandidate;

impl BackendCandidate for PqcKyberCandidate {
    fn source(&self) -> &'static str {
        "pqc_kyber"
    }

    fn probe(&self) -> Option<BackendShape> {
        Some(BackendShape::Flat(FlatKemFunctions {
            name: BACKEND_NAME,
            keypair: kyber_keypair,
            encapsulate: kyber_encapsulate,
            decapsulate: kyber_decapsulate,
        }))
    }
}

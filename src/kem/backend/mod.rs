//! Post-quantum backend capability and probing.
//!
//! A backend is anything that can do `{keypair, encapsulate, decapsulate}` for
//! Kyber-768. Sources are tried in a fixed order; each one may expose the
//! capability as an object ([`KemBackend`]) or as loose functions
//! ([`FlatKemFunctions`]) that get wrapped in [`FlatKemAdapter`]. The first
//! source that answers wins. Finding none is a normal outcome, not an error.

use std::sync::Arc;
use zeroize::Zeroizing;

use crate::crypto::codec;
use crate::error::Result;

pub mod ml_kem;
#[cfg(feature = "pqc-kyber")]
pub mod pqc_kyber;

/// Raw keypair bytes as produced by a backend, before size validation.
pub struct RawKeypair {
    pub public_key: Vec<u8>,
    pub secret_key: Zeroizing<Vec<u8>>,
}

/// Raw encapsulation output, before size validation.
pub struct RawEncapsulation {
    pub ciphertext: Vec<u8>,
    pub shared_secret: Zeroizing<Vec<u8>>,
}

/// Object-form capability.
pub trait KemBackend: Send + Sync {
    /// Human-readable implementation name, reported in status snapshots.
    fn name(&self) -> &'static str;

    fn keypair(&self) -> Result<RawKeypair>;

    fn encapsulate(&self, public_key: &[u8]) -> Result<RawEncapsulation>;

    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Keypair as returned by a flat-function backend. Buffers are owned by the
/// backend call and are wiped by the adapter once copied.
pub struct FlatKeypair {
    pub public: Vec<u8>,
    pub secret: Vec<u8>,
}

/// Flat-function-form capability.
#[derive(Clone, Copy)]
pub struct FlatKemFunctions {
    pub name: &'static str,
    pub keypair: fn() -> Result<FlatKeypair>,
    /// Returns `(ciphertext, shared_secret)`.
    pub encapsulate: fn(&[u8]) -> Result<(Vec<u8>, Vec<u8>)>,
    /// Takes `(ciphertext, secret_key)`.
    pub decapsulate: fn(&[u8], &[u8]) -> Result<Vec<u8>>,
}

/// Normalizes [`FlatKemFunctions`] to [`KemBackend`].
pub struct FlatKemAdapter {
    fns: FlatKemFunctions,
}

impl FlatKemAdapter {
    pub fn new(fns: FlatKemFunctions) -> Self {
        Self { fns }
    }
}

impl KemBackend for FlatKemAdapter {
    fn name(&self) -> &'static str {
        self.fns.name
    }

    fn keypair(&self) -> Result<RawKeypair> {
        let mut flat = (self.fns.keypair)()?;
        let keypair = RawKeypair {
            public_key: std::mem::take(&mut flat.public),
            secret_key: Zeroizing::new(flat.secret.clone()),
        };
        codec::wipe(&mut flat.secret);
        Ok(keypair)
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<RawEncapsulation> {
        let (ciphertext, mut shared) = (self.fns.encapsulate)(public_key)?;
        let out = RawEncapsulation {
            ciphertext,
            shared_secret: Zeroizing::new(shared.clone()),
        };
        codec::wipe(&mut shared);
        Ok(out)
    }

    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let mut shared = (self.fns.decapsulate)(ciphertext, secret_key)?;
        let out = Zeroizing::new(shared.clone());
        codec::wipe(&mut shared);
        Ok(out)
    }
}

/// What a candidate source exposes when probed.
pub enum BackendShape {
    Object(Arc<dyn KemBackend>),
    Flat(FlatKemFunctions),
}

impl BackendShape {
    pub fn into_backend(self) -> Arc<dyn KemBackend> {
        match self {
            BackendShape::Object(backend) => backend,
            BackendShape::Flat(fns) => Arc::new(FlatKemAdapter::new(fns)),
        }
    }
}

/// One entry in the ordered probe list.
pub trait BackendCandidate: Send + Sync {
    /// Where the backend comes from (crate name, plugin path, …).
    fn source(&self) -> &'static str;

    /// `None` when this source is not usable in the current build/runtime.
    fn probe(&self) -> Option<BackendShape>;
}

/// Built-in probe order: RustCrypto ML-KEM-768 first, then the reference
/// Kyber-768 port when compiled in.
pub fn default_candidates() -> Vec<Box<dyn BackendCandidate>> {
    #[allow(unused_mut)]
    let mut candidates: Vec<Box<dyn BackendCandidate>> = vec![Box::new(ml_kem::MlKemCandidate)];
    #[cfg(feature = "pqc-kyber")]
    candidates.push(Box::new(pqc_kyber::PqcKyberCandidate));
    candidates
}

/// Try each candidate in order; return the first one that exposes either shape.
pub fn acquire_backend(candidates: &[Box<dyn BackendCandidate>]) -> Option<Arc<dyn KemBackend>> {
    for candidate in candidates {
        match candidate.probe() {
            Some(shape) => {
                let kind = match &shape {
                    BackendShape::Object(_) => "object",
                    BackendShape::Flat(_) => "flat",
                };
                let backend = shape.into_backend();
                log::info!(
                    "PQ backend acquired from {} ({} form): {}",
                    candidate.source(),
                    kind,
                    backend.name()
                );
                return Some(backend);
            }
            None => log::debug!("PQ backend source {} unavailable", candidate.source()),
        }
    }
    log::warn!("No PQ backend available ({} sources probed)", candidates.len());
    None
}

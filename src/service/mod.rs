//! Hybrid KEM Service
//!
//! Root of the crate: owns backend acquisition, self-verification, the
//! classical fallback decision and metrics, and exposes the caller-facing
//! `generate_keypair` / `encapsulate` / `decapsulate` operations.
//!
//! Lifecycle:
//! ```text
//! Uninitialized → Initializing → Ready(PqAvailable | FallbackOnly)
//! ```
//! Initialization runs lazily on first use, at most once per flight no matter
//! how many tasks ask for it concurrently. `reinitialize()` is the only way to
//! repeat acquisition.

pub mod config;
pub mod metrics;

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio::sync::OnceCell;
use zeroize::Zeroizing;

use crate::crypto::{classical, codec, combiner};
use crate::error::{ErrorKind, KemError, Result};
use crate::kem::backend::{self, BackendCandidate, KemBackend};
use crate::kem::framing::{self, CombinedCiphertext, CombinedPrivateKey, CombinedPublicKey};
use crate::kem::types::*;
use crate::kem::verify;

pub use config::KemServiceConfig;
pub use metrics::{MetricsSnapshot, Operation};

use metrics::Metrics;

/// Offset of the embedded public key inside a Kyber-768 secret key
/// (`dk_pke ‖ ek ‖ H(ek) ‖ z`).
const KYBER_SECRET_KEY_EMBEDDED_PK_OFFSET: usize = 1152;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Readiness {
    /// A verified PQ backend is in use
    PqAvailable,
    /// No backend found; classical-only
    FallbackOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready(Readiness),
}

/// Status snapshot for UI polling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmInfo {
    pub state: ServiceState,
    /// `None` until the service is ready
    pub mode: Option<Algorithm>,
    pub quantum_resistant: bool,
    pub backend: Option<&'static str>,
    pub pq_public_key_bytes: usize,
    pub pq_secret_key_bytes: usize,
    pub pq_ciphertext_bytes: usize,
    pub classical_key_bytes: usize,
    pub combined_public_key_bytes: usize,
    pub shared_secret_bytes: usize,
}

struct Runtime {
    state: ServiceState,
    backend: Option<Arc<dyn KemBackend>>,
}

type Flight = Arc<OnceCell<Result<Readiness>>>;

pub struct HybridKemService {
    config: KemServiceConfig,
    candidates: Arc<Vec<Box<dyn BackendCandidate>>>,
    runtime: RwLock<Runtime>,
    inflight: Mutex<Option<Flight>>,
    reinit: tokio::sync::Mutex<()>,
    metrics: Metrics,
}

/// Probe, then verify or fall back. Blocking; runs off the async executor when it can.
fn acquire_and_verify(
    candidates: &[Box<dyn BackendCandidate>],
    config: &KemServiceConfig,
) -> Result<Option<Arc<dyn KemBackend>>> {
    let backend = if config.force_classical_only {
        log::warn!("PQ backend probing disabled by configuration");
        None
    } else {
        backend::acquire_backend(candidates)
    };

    match backend {
        Some(backend) => {
            // A backend that loads but fails its self-test is never trusted,
            // and never silently replaced by the classical path.
            if let Err(e) = verify::self_verify(backend.as_ref()) {
                log::error!("✗ PQ backend {} failed self-verification: {}", backend.name(), e);
                return Err(e);
            }
            Ok(Some(backend))
        }
        None => {
            if !config.allow_fallback {
                log::error!("✗ No PQ backend available and classical fallback is disabled");
                return Err(KemError::new(
                    ErrorKind::InitFailedNoFallback,
                    "no post-quantum backend available and fallback is disabled",
                ));
            }
            classical::self_test().map_err(|e| {
                KemError::new(
                    ErrorKind::FallbackInitFailed,
                    "X25519 self-test failed while entering classical-only mode",
                )
                .with_cause(e)
            })?;
            Ok(None)
        }
    }
}

impl HybridKemService {
    /// Service with the built-in backend probe order.
    pub fn new(config: KemServiceConfig) -> Self {
        Self::with_candidates(config, backend::default_candidates())
    }

    /// Service with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(KemServiceConfig::default())
    }

    /// Service probing `candidates` in order.
    pub fn with_candidates(
        config: KemServiceConfig,
        candidates: Vec<Box<dyn BackendCandidate>>,
    ) -> Self {
        let metrics = Metrics::new(config.smoothing());
        Self {
            config,
            candidates: Arc::new(candidates),
            runtime: RwLock::new(Runtime {
                state: ServiceState::Uninitialized,
                backend: None,
            }),
            inflight: Mutex::new(None),
            reinit: tokio::sync::Mutex::new(()),
            metrics,
        }
    }

    pub fn config(&self) -> &KemServiceConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        self.runtime.read().unwrap_or_else(|e| e.into_inner()).state
    }

    fn set_runtime(&self, state: ServiceState, backend: Option<Arc<dyn KemBackend>>) {
        let mut runtime = self.runtime.write().unwrap_or_else(|e| e.into_inner());
        runtime.state = state;
        runtime.backend = backend;
    }

    // ── Initialization ──────────────────────────────────────────────────────

    /// Acquire and verify a backend, or enter classical-only mode.
    ///
    /// Idempotent. Concurrent callers share one in-flight acquisition and all
    /// observe its outcome. A failed flight leaves the service uninitialized;
    /// the next call starts a new one.
    ///
    /// Inside a tokio runtime the acquisition runs on the blocking pool;
    /// under any other executor it runs inline on the polling thread.
    pub async fn initialize(&self) -> Result<()> {
        let result = self.ensure_initialized().await;
        if result.is_err() {
            self.metrics.record_error();
        }
        result
    }

    /// Shared by `initialize` and the operations; records no metrics so a
    /// failed call is counted once, by whichever public entry point failed.
    async fn ensure_initialized(&self) -> Result<()> {
        let flight = {
            let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            if let ServiceState::Ready(_) = self.state() {
                return Ok(());
            }
            slot.get_or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        let outcome = flight
            .get_or_init(|| self.run_initialization())
            .await
            .clone();

        {
            let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            if slot.as_ref().map_or(false, |f| Arc::ptr_eq(f, &flight)) {
                *slot = None;
            }
        }

        outcome.map(|_| ())
    }

    async fn run_initialization(&self) -> Result<Readiness> {
        self.set_runtime(ServiceState::Initializing, None);

        let result = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let candidates = Arc::clone(&self.candidates);
                let config = self.config.clone();
                let joined = handle
                    .spawn_blocking(move || acquire_and_verify(&candidates, &config))
                    .await;
                match joined {
                    Ok(result) => result,
                    Err(e) => Err(KemError::new(
                        ErrorKind::VerificationFailed,
                        "backend acquisition task aborted",
                    )
                    .with_cause(e)),
                }
            }
            Err(_) => acquire_and_verify(&self.candidates, &self.config),
        };

        match result {
            Ok(Some(backend)) => {
                log::info!("✓ Hybrid KEM ready: {} + X25519", backend.name());
                self.set_runtime(ServiceState::Ready(Readiness::PqAvailable), Some(backend));
                Ok(Readiness::PqAvailable)
            }
            Ok(None) => {
                self.metrics.record_fallback_activation();
                log::warn!("⚠️  Hybrid KEM running classical-only (X25519): NOT quantum-resistant");
                self.set_runtime(ServiceState::Ready(Readiness::FallbackOnly), None);
                Ok(Readiness::FallbackOnly)
            }
            Err(e) => {
                self.set_runtime(ServiceState::Uninitialized, None);
                Err(e)
            }
        }
    }

    /// Drop the current backend and repeat acquisition and verification.
    pub async fn reinitialize(&self) -> Result<()> {
        let _guard = self.reinit.lock().await;

        let pending = self
            .inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(flight) = pending {
            let _ = flight.get_or_init(|| self.run_initialization()).await;
        }

        {
            let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            *slot = None;
            self.set_runtime(ServiceState::Uninitialized, None);
        }
        log::info!("Hybrid KEM re-initializing");
        self.initialize().await
    }

    /// Backend to use for one operation; `None` in classical-only mode.
    async fn ready_backend(&self) -> Result<Option<Arc<dyn KemBackend>>> {
        loop {
            self.ensure_initialized().await?;
            let ready = {
                let runtime = self.runtime.read().unwrap_or_else(|e| e.into_inner());
                match runtime.state {
                    ServiceState::Ready(_) => Some(runtime.backend.clone()),
                    _ => None,
                }
            };
            if let Some(backend) = ready {
                return Ok(backend);
            }
            // reinitialize() raced us between the two steps
        }
    }

    fn finish<T>(
        &self,
        op: Operation,
        started: Instant,
        result: Result<(T, Algorithm)>,
        failure: ErrorKind,
        message: &str,
    ) -> Result<T> {
        match result {
            Ok((value, algorithm)) => {
                let elapsed = started.elapsed();
                self.metrics
                    .record_success(op, algorithm == Algorithm::ClassicalOnly, elapsed);
                log::debug!("{:?} ({}) took {:?}", op, algorithm, elapsed);
                Ok(value)
            }
            Err(e) => {
                self.metrics.record_error();
                log::debug!("{:?} failed: {}", op, e);
                Err(match e.kind() {
                    ErrorKind::InitFailedNoFallback
                    | ErrorKind::VerificationFailed
                    | ErrorKind::FallbackInitFailed => e,
                    _ => e.wrap_unless_validation(failure, message),
                })
            }
        }
    }

    // ── Keypair generation ──────────────────────────────────────────────────

    pub async fn generate_keypair(&self) -> Result<Keypair> {
        let started = Instant::now();
        let result = match self.ready_backend().await {
            Ok(backend) => build_keypair(backend.as_deref()),
            Err(e) => Err(e),
        };
        self.finish(
            Operation::KeypairGeneration,
            started,
            result,
            ErrorKind::KeypairGenerationFailed,
            "keypair generation failed",
        )
    }

    // ── Encapsulation ───────────────────────────────────────────────────────

    /// Encapsulate to a combined public key.
    pub async fn encapsulate(&self, public_key: &[u8]) -> Result<EncapsulationResult> {
        let started = Instant::now();
        let result = match CombinedPublicKey::from_bytes(public_key) {
            Ok(recipient) => match self.ready_backend().await {
                Ok(backend) => {
                    encapsulate_to(&recipient, backend.as_deref(), self.config.shared_secret_len)
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        self.finish(
            Operation::Encapsulation,
            started,
            result,
            ErrorKind::EncapsulationFailed,
            "encapsulation failed",
        )
    }

    // ── Decapsulation ───────────────────────────────────────────────────────

    /// Recover the shared secret. A mismatched private key is not an error:
    /// it yields a different secret.
    pub async fn decapsulate(&self, ciphertext: &[u8], private_key: &[u8]) -> Result<SharedSecret> {
        let started = Instant::now();
        let parsed = CombinedCiphertext::from_bytes(ciphertext)
            .and_then(|ct| CombinedPrivateKey::from_bytes(private_key).map(|sk| (ct, sk)));
        let result = match parsed {
            Ok((ct, sk)) => match self.ready_backend().await {
                Ok(backend) => {
                    decapsulate_with(&ct, &sk, backend.as_deref(), self.config.shared_secret_len)
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        self.finish(
            Operation::Decapsulation,
            started,
            result,
            ErrorKind::DecapsulationFailed,
            "decapsulation failed",
        )
    }

    // ── Keypair validation ──────────────────────────────────────────────────

    /// Check that a keypair's public and private halves belong together.
    pub fn validate_keypair(&self, keypair: &Keypair) -> Result<()> {
        let invalid = |message: &str| KemError::new(ErrorKind::InvalidKeypair, message);

        let public = CombinedPublicKey::from_bytes(&keypair.public_key)
            .map_err(|e| invalid("public key is malformed").with_cause(e))?;
        let private = CombinedPrivateKey::from_bytes(&keypair.private_key)
            .map_err(|e| invalid("private key is malformed").with_cause(e))?;

        if public.algorithm() != keypair.algorithm {
            return Err(invalid("declared algorithm does not match public key framing"));
        }
        if classical::derive_public_key(&private.classical) != public.classical {
            return Err(invalid("X25519 public key is not derived from the private scalar"));
        }
        match (&public.pq, &private.pq) {
            (None, None) => Ok(()),
            (Some(pk), Some(sk)) => {
                let embedded = &sk.as_bytes()[KYBER_SECRET_KEY_EMBEDDED_PK_OFFSET
                    ..KYBER_SECRET_KEY_EMBEDDED_PK_OFFSET + KYBER_PUBLIC_KEY_BYTES];
                if codec::eq_slices(embedded, pk.as_bytes()) {
                    Ok(())
                } else {
                    Err(invalid("Kyber secret key does not embed this public key"))
                }
            }
            _ => Err(invalid(
                "Kyber component present on only one side of the keypair",
            )),
        }
    }

    // ── Status & metrics ────────────────────────────────────────────────────

    pub fn algorithm_info(&self) -> AlgorithmInfo {
        let runtime = self.runtime.read().unwrap_or_else(|e| e.into_inner());
        let backend = runtime.backend.as_ref().map(|b| b.name());
        let mode = match runtime.state {
            ServiceState::Ready(Readiness::PqAvailable) => Some(Algorithm::HybridPqClassical),
            ServiceState::Ready(Readiness::FallbackOnly) => Some(Algorithm::ClassicalOnly),
            _ => None,
        };
        let pq = mode == Some(Algorithm::HybridPqClassical);
        let pq_public_key_bytes = if pq { KYBER_PUBLIC_KEY_BYTES } else { 0 };

        AlgorithmInfo {
            state: runtime.state,
            mode,
            quantum_resistant: pq,
            backend,
            pq_public_key_bytes,
            pq_secret_key_bytes: if pq { KYBER_SECRET_KEY_BYTES } else { 0 },
            pq_ciphertext_bytes: if pq { KYBER_CIPHERTEXT_BYTES } else { 0 },
            classical_key_bytes: X25519_PUBLIC_KEY_BYTES,
            combined_public_key_bytes: framing::framed_len(pq_public_key_bytes),
            shared_secret_bytes: self.config.shared_secret_len.bytes(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
        log::info!("Hybrid KEM metrics reset");
    }
}

fn build_keypair(backend: Option<&dyn KemBackend>) -> Result<(Keypair, Algorithm)> {
    let (classical_public, classical_secret) = classical::generate_static_keypair();

    let (pq_public, pq_secret) = match backend {
        Some(backend) => {
            let raw = backend.keypair()?;
            let public = PqPublicKey::from_bytes(&raw.public_key)?;
            let secret = PqSecretKey::from_bytes(&raw.secret_key)?;
            (Some(public), Some(secret))
        }
        None => (None, None),
    };

    let public = CombinedPublicKey {
        pq: pq_public,
        classical: classical_public,
    };
    let private = CombinedPrivateKey {
        pq: pq_secret,
        classical: classical_secret,
    };
    let algorithm = public.algorithm();
    let public_key = public.to_bytes();

    Ok((
        Keypair {
            key_size: public_key.len(),
            public_key,
            private_key: private.to_bytes(),
            algorithm,
            created_at: Utc::now(),
        },
        algorithm,
    ))
}

fn encapsulate_to(
    recipient: &CombinedPublicKey,
    backend: Option<&dyn KemBackend>,
    len: SharedSecretLength,
) -> Result<(EncapsulationResult, Algorithm)> {
    let (pq_ciphertext, pq_secret) = match (&recipient.pq, backend) {
        (Some(pq_public), Some(backend)) => {
            let raw = backend.encapsulate(pq_public.as_bytes())?;
            let ciphertext = PqCiphertext::from_bytes(&raw.ciphertext).map_err(|e| {
                KemError::new(
                    ErrorKind::KyberEncapsulationFailed,
                    "backend returned a malformed ciphertext",
                )
                .with_cause(e)
            })?;
            if raw.shared_secret.len() != KYBER_SHARED_SECRET_BYTES {
                return Err(KemError::new(
                    ErrorKind::KyberEncapsulationFailed,
                    format!(
                        "backend returned a {}-byte shared secret",
                        raw.shared_secret.len()
                    ),
                ));
            }
            (Some(ciphertext), Some(raw.shared_secret))
        }
        (Some(_), None) => {
            log::warn!("⚠️  Recipient key has a Kyber component but no PQ backend is verified; encapsulating classical-only");
            (None, None)
        }
        (None, _) => (None, None),
    };

    // Ephemeral secret is consumed (and zeroed) by the exchange
    let (ephemeral_public, ephemeral_secret) = classical::generate_ephemeral_key();
    let classical_secret =
        classical::derive_shared_secret_ephemeral(ephemeral_secret, &recipient.classical)?;

    let shared_secret =
        combiner::derive(pq_secret.as_deref().map(|s| s.as_slice()), &classical_secret[..], len);

    let ciphertext = CombinedCiphertext {
        pq: pq_ciphertext,
        classical_ephemeral: ephemeral_public,
    };
    let algorithm = ciphertext.algorithm();

    Ok((
        EncapsulationResult {
            ciphertext: ciphertext.to_bytes(),
            shared_secret,
            algorithm,
            timestamp: Utc::now(),
        },
        algorithm,
    ))
}

fn decapsulate_with(
    ciphertext: &CombinedCiphertext,
    private_key: &CombinedPrivateKey,
    backend: Option<&dyn KemBackend>,
    len: SharedSecretLength,
) -> Result<(SharedSecret, Algorithm)> {
    let pq_secret: Option<Zeroizing<Vec<u8>>> = match (&ciphertext.pq, &private_key.pq, backend) {
        (Some(pq_ct), Some(pq_sk), Some(backend)) => {
            let ss = backend.decapsulate(pq_ct.as_bytes(), pq_sk.as_bytes())?;
            if ss.len() != KYBER_SHARED_SECRET_BYTES {
                return Err(KemError::new(
                    ErrorKind::KyberDecapsulationFailed,
                    format!("backend returned a {}-byte shared secret", ss.len()),
                ));
            }
            Some(ss)
        }
        (Some(_), _, _) => {
            log::warn!("⚠️  Ciphertext has a Kyber component that cannot be used here; decapsulating classical-only");
            None
        }
        (None, _, _) => None,
    };

    let classical_secret =
        classical::derive_shared_secret(&private_key.classical, &ciphertext.classical_ephemeral)?;

    let algorithm = if pq_secret.is_some() {
        Algorithm::HybridPqClassical
    } else {
        Algorithm::ClassicalOnly
    };
    let secret = combiner::derive(
        pq_secret.as_deref().map(|s| s.as_slice()),
        &classical_secret[..],
        len,
    );
    Ok((secret, algorithm))
}

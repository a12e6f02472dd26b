//! # Shield KEM
//!
//! **Hybrid post-quantum key encapsulation: Kyber-768 / ML-KEM-768 + X25519.**
//!
//! Shield KEM wraps a post-quantum KEM backend and X25519 into one service
//! that hands out a single shared secret per exchange. The secret stays safe
//! as long as either leg is unbroken. When no PQ backend can be loaded the
//! service can keep running on X25519 alone, and says so loudly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shield_kem::HybridKemService;
//!
//! # async fn demo() -> shield_kem::Result<()> {
//! let service = HybridKemService::with_defaults();
//!
//! let keypair = service.generate_keypair().await?;
//! let sent = service.encapsulate(&keypair.public_key).await?;
//! let received = service
//!     .decapsulate(&sent.ciphertext, &keypair.private_key)
//!     .await?;
//! assert_eq!(sent.shared_secret, received);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`crypto`] | Hex/base64 codec, X25519 adapter, shared-secret combiner |
//! | [`kem`] | Backend probing, self-verification, wire framing, key types |
//! | [`service`] | Lazy initialization, fallback policy, metrics, status |
//! | [`error`] | Error kinds with stable codes |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `std` | Yes | Standard library support |
//! | `pqc-kyber` | No | Probe `pqc_kyber` as a second Kyber-768 backend |
//! | `wasm` | No | WebAssembly support (`getrandom/js`) |

#![allow(
    clippy::empty_line_after_doc_comments,
    clippy::doc_lazy_continuation,
    clippy::type_complexity
)]

// ── Public modules ──────────────────────────────────────────────────────────

/// Error kinds and the crate-wide `Result`.
pub mod error;

/// Encoding helpers, the X25519 adapter and the shared-secret combiner.
pub mod crypto;

/// PQ backends, self-verification and the combined wire format.
pub mod kem;

/// The hybrid KEM service.
pub mod service;

// ── Re-exports for convenience ──────────────────────────────────────────────

pub use error::{ErrorKind, KemError, Result};

pub use kem::{Algorithm, EncapsulationResult, Keypair, SharedSecret, SharedSecretLength};

pub use service::{
    AlgorithmInfo, HybridKemService, KemServiceConfig, MetricsSnapshot, Readiness, ServiceState,
};

// ── Library metadata ────────────────────────────────────────────────────────

/// Shield KEM version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version string.
pub fn version() -> &'static str {
    VERSION
}

// ── Tests ───────────────────────────────────────────────────────────────────

/// Hybrid KEM building blocks
/// Kyber-768 / ML-KEM-768 (NIST FIPS 203) + X25519 (RFC 7748)
///
/// Security: the combined secret holds if EITHER leg remains unbroken

pub mod backend;
pub mod framing;
pub mod types;
pub mod verify;

// Re-export main types and functions
pub use backend::{
    acquire_backend, default_candidates, BackendCandidate, BackendShape, FlatKemAdapter,
    FlatKemFunctions, FlatKeypair, KemBackend, RawEncapsulation, RawKeypair,
};
pub use framing::{CombinedCiphertext, CombinedPrivateKey, CombinedPublicKey};
pub use types::{
    Algorithm, EncapsulationResult, Keypair, SharedSecret, SharedSecretLength,
    COMBINED_SECRET_MATERIAL_BYTES, KYBER_CIPHERTEXT_BYTES, KYBER_PUBLIC_KEY_BYTES,
    KYBER_SECRET_KEY_BYTES, KYBER_SHARED_SECRET_BYTES, X25519_PUBLIC_KEY_BYTES,
    X25519_SECRET_KEY_BYTES,
};
pub use verify::self_verify;

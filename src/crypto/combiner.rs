//! Shared-secret combiner.
//!
//! Hybrid:          d = SHA-256(pq_ss ‖ x25519_ss), expanded when the declared
//!                  output is longer than one digest.
//! Classical-only:  expand(x25519_ss).
//!
//! expand(s, n) = SHA-256(s ‖ BE32(0)) ‖ SHA-256(s ‖ BE32(1)) ‖ … truncated to n.
//! Output length depends only on the declared [`SharedSecretLength`], never on mode.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::kem::types::{SharedSecret, SharedSecretLength, COMBINED_SECRET_MATERIAL_BYTES};

const DIGEST_BYTES: usize = 32;

/// Counter-mode expansion of `secret` to exactly `len` bytes.
pub fn expand(secret: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(len + DIGEST_BYTES));
    let mut counter: u32 = 0;
    while out.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(counter.to_be_bytes());
        let mut block: [u8; DIGEST_BYTES] = hasher.finalize().into();
        out.extend_from_slice(&block);
        block.zeroize();
        counter += 1;
    }
    out.truncate(len);
    out
}

/// Combine a PQ secret and a classical secret (PQ bytes first).
pub fn combine(pq_secret: &[u8], classical_secret: &[u8], len: SharedSecretLength) -> SharedSecret {
    let mut material = Zeroizing::new(Vec::with_capacity(COMBINED_SECRET_MATERIAL_BYTES));
    material.extend_from_slice(pq_secret);
    material.extend_from_slice(classical_secret);

    let mut digest: [u8; DIGEST_BYTES] = Sha256::digest(material.as_slice()).into();
    let out = match len {
        SharedSecretLength::Bytes32 => Zeroizing::new(digest.to_vec()),
        SharedSecretLength::Bytes64 => expand(&digest, len.bytes()),
    };
    digest.zeroize();
    SharedSecret::new(out)
}

/// Classical-only mode: stretch the X25519 secret to the declared length.
pub fn expand_classical(classical_secret: &[u8], len: SharedSecretLength) -> SharedSecret {
    SharedSecret::new(expand(classical_secret, len.bytes()))
}

/// Pick the construction from which legs are present.
pub fn derive(
    pq_secret: Option<&[u8]>,
    classical_secret: &[u8],
    len: SharedSecretLength,
) -> SharedSecret {
    match pq_secret {
        Some(pq) => combine(pq, classical_secret, len),
        None => expand_classical(classical_secret, len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_expand_first_block_is_counter_zero() {
        let secret = [0x11u8; 32];
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update([0u8, 0, 0, 0]);
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(expand(&secret, 32).as_slice(), &expected);
    }

    #[test]
    fn test_expand_lengths_and_prefix() {
        let secret = b"classical";
        let short = expand(secret, 20);
        let long = expand(secret, 70);
        assert_eq!(short.len(), 20);
        assert_eq!(long.len(), 70);
        assert_eq!(&long[..20], short.as_slice());
        assert!(expand(secret, 0).is_empty());
    }

    #[test]
    fn test_combine_is_sha256_of_concatenation() {
        let pq = [0x01u8; 32];
        let classical = [0x02u8; 32];
        let mut material = Vec::new();
        material.extend_from_slice(&pq);
        material.extend_from_slice(&classical);
        let expected: [u8; 32] = Sha256::digest(&material).into();
        let out = combine(&pq, &classical, SharedSecretLength::Bytes32);
        assert_eq!(out.as_bytes(), &expected);
    }

    #[test]
    fn test_combine_order_matters() {
        let a = [0x01u8; 32];
        let b = [0x02u8; 32];
        assert_ne!(
            combine(&a, &b, SharedSecretLength::Bytes32),
            combine(&b, &a, SharedSecretLength::Bytes32)
        );
    }

    #[test]
    fn test_sha256_known_answer() {
        // FIPS 180-2 "abc"
        let abc: [u8; 32] = Sha256::digest(b"abc").into();
        assert_eq!(
            abc,
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_output_length_is_mode_independent() {
        for len in [SharedSecretLength::Bytes32, SharedSecretLength::Bytes64] {
            let hybrid = derive(Some(&[3u8; 32]), &[4u8; 32], len);
            let classical = derive(None, &[4u8; 32], len);
            assert_eq!(hybrid.len(), len.bytes());
            assert_eq!(classical.len(), len.bytes());
            assert_ne!(hybrid, classical);
        }
    }
}

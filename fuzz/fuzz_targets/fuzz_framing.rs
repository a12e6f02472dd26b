#![no_main]
use libfuzzer_sys::fuzz_target;
use shield_kem::kem::framing::{CombinedCiphertext, CombinedPrivateKey, CombinedPublicKey};
use shield_kem::kem::{KYBER_CIPHERTEXT_BYTES, KYBER_PUBLIC_KEY_BYTES, KYBER_SECRET_KEY_BYTES};

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary bytes must never panic, and anything accepted must
    // re-encode to exactly the input.
    if let Ok(pk) = CombinedPublicKey::from_bytes(data) {
        if let Some(pq) = &pk.pq {
            assert_eq!(pq.as_bytes().len(), KYBER_PUBLIC_KEY_BYTES);
        }
        assert_eq!(pk.to_bytes(), data);
    }

    if let Ok(ct) = CombinedCiphertext::from_bytes(data) {
        if let Some(pq) = &ct.pq {
            assert_eq!(pq.as_bytes().len(), KYBER_CIPHERTEXT_BYTES);
        }
        assert_eq!(ct.to_bytes(), data);
    }

    if let Ok(sk) = CombinedPrivateKey::from_bytes(data) {
        if let Some(pq) = &sk.pq {
            assert_eq!(pq.as_bytes().len(), KYBER_SECRET_KEY_BYTES);
        }
        assert_eq!(sk.to_bytes().as_slice(), data);
    }
});

//! X25519 adapter. Runs on every operation regardless of PQ backend availability.

use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{ErrorKind, KemError, Result};
use crate::kem::types::{ClassicalPublicKey, ClassicalSecretKey, X25519_SHARED_SECRET_BYTES};

/// Generate a static X25519 keypair
///
/// # Returns
/// (public_key, secret_key)
pub fn generate_static_keypair() -> (ClassicalPublicKey, ClassicalSecretKey) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    (
        ClassicalPublicKey::from_array(public.to_bytes()),
        ClassicalSecretKey::from_array(secret.to_bytes()),
    )
}

/// Generate an ephemeral X25519 keypair
///
/// The secret can be used for exactly one Diffie-Hellman and is zeroed when
/// consumed or dropped.
pub fn generate_ephemeral_key() -> (ClassicalPublicKey, EphemeralSecret) {
    let secret = EphemeralSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    (ClassicalPublicKey::from_array(public.to_bytes()), secret)
}

/// Derive shared secret using a stored private scalar
///
/// # Returns
/// 32-byte shared secret, zeroed on drop
pub fn derive_shared_secret(
    our_private_key: &ClassicalSecretKey,
    their_public_key: &ClassicalPublicKey,
) -> Result<Zeroizing<[u8; X25519_SHARED_SECRET_BYTES]>> {
    let secret = StaticSecret::from(*our_private_key.as_bytes());
    let public = PublicKey::from(*their_public_key.as_bytes());

    let shared = secret.diffie_hellman(&public);
    if !shared.was_contributory() {
        return Err(KemError::new(
            ErrorKind::InvalidX25519SharedSecret,
            "X25519 produced a non-contributory shared secret (low-order public key)",
        ));
    }

    Ok(Zeroizing::new(shared.to_bytes()))
}

/// Derive shared secret using an ephemeral secret, consuming it
pub fn derive_shared_secret_ephemeral(
    ephemeral_secret: EphemeralSecret,
    their_public_key: &ClassicalPublicKey,
) -> Result<Zeroizing<[u8; X25519_SHARED_SECRET_BYTES]>> {
    let public = PublicKey::from(*their_public_key.as_bytes());

    let shared = ephemeral_secret.diffie_hellman(&public);
    if !shared.was_contributory() {
        return Err(KemError::new(
            ErrorKind::InvalidX25519SharedSecret,
            "X25519 produced a non-contributory shared secret (low-order public key)",
        ));
    }

    Ok(Zeroizing::new(shared.to_bytes()))
}

/// Derive public key from private key
pub fn derive_public_key(private_key: &ClassicalSecretKey) -> ClassicalPublicKey {
    let secret = StaticSecret::from(*private_key.as_bytes());
    ClassicalPublicKey::from_array(PublicKey::from(&secret).to_bytes())
}

/// One ephemeral-static exchange; both sides must agree.
///
/// Run once before the service enters classical-only mode.
pub fn self_test() -> Result<()> {
    let (static_public, static_secret) = generate_static_keypair();
    let (eph_public, eph_secret) = generate_ephemeral_key();

    let sender = derive_shared_secret_ephemeral(eph_secret, &static_public)?;
    let receiver = derive_shared_secret(&static_secret, &eph_public)?;

    check_agreement(&sender, &receiver)
}

fn check_agreement(
    sender: &[u8; X25519_SHARED_SECRET_BYTES],
    receiver: &[u8; X25519_SHARED_SECRET_BYTES],
) -> Result<()> {
    if !crate::crypto::codec::eq_32(sender, receiver) {
        return Err(KemError::new(
            ErrorKind::InvalidX25519SharedSecret,
            "X25519 self-test produced mismatching shared secrets",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_generate_static_keypair() {
        let (public, private) = generate_static_keypair();
        assert_eq!(derive_public_key(&private), public);
    }

    #[test]
    fn test_derive_shared_secret() {
        let (user1_public, user1_private) = generate_static_keypair();
        let (user2_public, user2_private) = generate_static_keypair();

        let user1_shared = derive_shared_secret(&user1_private, &user2_public).unwrap();
        let user2_shared = derive_shared_secret(&user2_private, &user1_public).unwrap();

        assert_eq!(*user1_shared, *user2_shared);
    }

    #[test]
    fn test_ephemeral_key_exchange() {
        let (user1_public, user1_secret) = generate_ephemeral_key();
        let (user2_public, user2_private) = generate_static_keypair();

        let user1_shared = derive_shared_secret_ephemeral(user1_secret, &user2_public).unwrap();
        let user2_shared = derive_shared_secret(&user2_private, &user1_public).unwrap();

        assert_eq!(*user1_shared, *user2_shared);
    }

    #[test]
    fn test_rfc7748_vector() {
        // RFC 7748 §6.1
        let alice_sk = ClassicalSecretKey::from_array(hex!(
            "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a"
        ));
        let bob_pk = ClassicalPublicKey::from_array(hex!(
            "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f"
        ));
        assert_eq!(
            derive_public_key(&alice_sk).as_bytes(),
            &hex!("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
        );
        let shared = derive_shared_secret(&alice_sk, &bob_pk).unwrap();
        assert_eq!(
            *shared,
            hex!("4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742")
        );
    }

    #[test]
    fn test_low_order_point_rejected() {
        let (_, private) = generate_static_keypair();
        let zero_point = ClassicalPublicKey::from_array([0u8; 32]);
        let err = derive_shared_secret(&private, &zero_point).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidX25519SharedSecret);
    }

    #[test]
    fn test_self_test_passes() {
        self_test().unwrap();
    }

    #[test]
    fn test_disagreement_is_shared_secret_error() {
        check_agreement(&[7u8; 32], &[7u8; 32]).unwrap();
        let err = check_agreement(&[7u8; 32], &[8u8; 32]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidX25519SharedSecret);
    }
}

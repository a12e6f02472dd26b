//! Byte/text codecs and constant-time helpers.
//! Use the comparison helpers for anything that could leak through timing side channels.

use base64::Engine;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{ErrorKind, KemError, Result};

/// Lowercase hex, two characters per byte.
pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string (either case).
pub fn hex_decode(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| {
        KemError::new(ErrorKind::InvalidHexString, format!("Invalid hex string: {}", e))
            .with_cause(e)
    })
}

/// Standard (padded) base64.
pub fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode standard (padded) base64.
pub fn base64_decode(s: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| {
            KemError::new(
                ErrorKind::Base64DecodingFailed,
                format!("Base64 decoding failed: {}", e),
            )
            .with_cause(e)
        })
}

/// Constant-time equality for 32-byte arrays (keys, shared secrets).
#[inline(always)]
pub fn eq_32(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.ct_eq(b).into()
}

/// Constant-time equality for slices. Lengths are not secret.
#[inline(always)]
pub fn eq_slices(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Overwrite a buffer with zeros in a way the optimizer will not elide.
pub fn wipe(buf: &mut [u8]) {
    buf.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_hex_known_answer() {
        let bytes = hex!("00ff10abcdef");
        assert_eq!(hex_encode(&bytes), "00ff10abcdef");
        assert_eq!(hex_decode("00FF10ABCDEF").unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_hex_rejects_garbage() {
        let err = hex_decode("abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHexString);
        let err = hex_decode("zz").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHexString);
    }

    #[test]
    fn test_base64_known_answer() {
        assert_eq!(base64_encode(b"Shield"), "U2hpZWxk");
        assert_eq!(base64_decode("U2hpZWxk").unwrap(), b"Shield".to_vec());
        assert_eq!(base64_encode(&[]), "");
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let err = base64_decode("not base64!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Base64DecodingFailed);
    }

    #[test]
    fn test_large_buffers_round_trip() {
        let data: Vec<u8> = (0..12_345u32).map(|i| (i * 31 % 251) as u8).collect();
        assert_eq!(hex_decode(&hex_encode(&data)).unwrap(), data);
        assert_eq!(base64_decode(&base64_encode(&data)).unwrap(), data);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(eq_32(&[7u8; 32], &[7u8; 32]));
        assert!(!eq_32(&[7u8; 32], &[8u8; 32]));
        assert!(eq_slices(b"abc", b"abc"));
        assert!(!eq_slices(b"abc", b"abd"));
        assert!(!eq_slices(b"abc", b"abcd"));
    }

    #[test]
    fn test_wipe() {
        let mut buf = [0xAAu8; 48];
        wipe(&mut buf);
        assert!(buf.iter().all(|b| *b == 0));
    }
}

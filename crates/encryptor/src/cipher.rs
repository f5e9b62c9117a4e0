//! AES-CBC primitives, IV generation, and MAC computation.
//!
//! This module is free of serializer and cookie concerns: it provides the
//! low-level operations the engine composes.
//!
//! # IV convention
//!
//! The IV for one encryption call is derived by drawing N random bytes
//! (default 8) and hex-encoding them; the ASCII bytes of the resulting
//! 2N-character hex string are the raw IV fed to the cipher. CBC mode needs a
//! 16-byte IV, so the default N = 8 is the only value that interoperates.
//! This two-step encoding is a fixed compatibility detail of the wire format,
//! not something to simplify away.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use common::{EncryptorError, Result};

use crate::key::CipherAlgorithm;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Default number of random bytes drawn per IV (8 bytes → 16 hex chars →
/// 16 raw IV bytes).
pub const DEFAULT_RANDOM_BYTES: usize = 8;

/// Draw `count` bytes from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`EncryptorError::Configuration`] if the OS random source is
/// unavailable.
pub fn secure_random_bytes(count: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    OsRng.try_fill_bytes(&mut buf).map_err(|e| {
        EncryptorError::Configuration(format!("secure random source unavailable: {e}"))
    })?;
    Ok(buf)
}

/// Generate the hex-string IV for one encryption call: `random_bytes` CSPRNG
/// bytes, hex-encoded.
pub fn generate_iv_hex(random_bytes: usize) -> Result<String> {
    Ok(hex::encode(secure_random_bytes(random_bytes)?))
}

/// Encrypt `plaintext` with the selected AES variant in CBC mode, PKCS#7
/// padded.
///
/// # Errors
///
/// Returns [`EncryptorError::Configuration`] if the key or IV length does not
/// fit the selected algorithm.
pub fn encrypt_cbc(
    algorithm: CipherAlgorithm,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    match algorithm {
        CipherAlgorithm::Aes128Cbc => Ok(Aes128CbcEnc::new_from_slices(key, iv)
            .map_err(|_| key_length_error(algorithm))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        CipherAlgorithm::Aes256Cbc => Ok(Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|_| key_length_error(algorithm))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
    }
}

/// Decrypt `ciphertext` with the selected AES variant in CBC mode and strip
/// PKCS#7 padding.
///
/// # Errors
///
/// Returns [`EncryptorError::Configuration`] if the key or IV length does not
/// fit the selected algorithm, and [`EncryptorError::Authentication`] if the
/// padding check fails — the same uniform error a MAC mismatch produces.
pub fn decrypt_cbc(
    algorithm: CipherAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    match algorithm {
        CipherAlgorithm::Aes128Cbc => Aes128CbcDec::new_from_slices(key, iv)
            .map_err(|_| key_length_error(algorithm))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| EncryptorError::Authentication),
        CipherAlgorithm::Aes256Cbc => Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|_| key_length_error(algorithm))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| EncryptorError::Authentication),
    }
}

fn key_length_error(algorithm: CipherAlgorithm) -> EncryptorError {
    EncryptorError::Configuration(format!("invalid key or IV length for {algorithm}"))
}

/// Compute the lowercase hex HMAC-SHA256 of `message` keyed by the raw secret.
///
/// # Errors
///
/// Returns [`EncryptorError::Configuration`] if the HMAC primitive rejects the
/// key (it accepts any length, so this is effectively unreachable).
pub fn compute_mac(key: &[u8], message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| EncryptorError::Configuration(format!("cannot key HMAC-SHA256: {e}")))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time equality of two MAC strings.
///
/// Never short-circuits on the first differing byte; differing lengths
/// compare unequal without revealing where.
pub fn mac_equal(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_128: [u8; 16] = [0x11; 16];
    const KEY_256: [u8; 32] = [0x22; 32];
    const IV: &[u8; 16] = b"0123456789abcdef";

    #[test]
    fn iv_hex_has_double_length() {
        let iv = generate_iv_hex(8).unwrap();
        assert_eq!(iv.len(), 16);
        assert!(iv.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn secure_random_bytes_length() {
        assert_eq!(secure_random_bytes(32).unwrap().len(), 32);
    }

    #[test]
    fn cbc_round_trip_aes128() {
        let ct = encrypt_cbc(CipherAlgorithm::Aes128Cbc, &KEY_128, IV, b"ferrets").unwrap();
        let pt = decrypt_cbc(CipherAlgorithm::Aes128Cbc, &KEY_128, IV, &ct).unwrap();
        assert_eq!(pt, b"ferrets");
    }

    #[test]
    fn cbc_round_trip_aes256() {
        let data = b"ferrets better than cats";
        let ct = encrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_256, IV, data).unwrap();
        assert_ne!(&ct[..data.len()], data);
        let pt = decrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_256, IV, &ct).unwrap();
        assert_eq!(pt, data);
    }

    #[test]
    fn ciphertext_is_padded_to_block_multiple() {
        let ct = encrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_256, IV, b"x").unwrap();
        assert_eq!(ct.len(), 16);
        // A full extra block of padding when the input is block-aligned.
        let ct = encrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_256, IV, &[0u8; 16]).unwrap();
        assert_eq!(ct.len(), 32);
    }

    #[test]
    fn wrong_key_length_is_configuration_error() {
        let err = encrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_128, IV, b"x").unwrap_err();
        assert!(matches!(err, EncryptorError::Configuration(_)));
    }

    #[test]
    fn wrong_iv_length_is_configuration_error() {
        let err = encrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_256, b"short", b"x").unwrap_err();
        assert!(matches!(err, EncryptorError::Configuration(_)));
    }

    #[test]
    fn non_block_aligned_ciphertext_fails_authentication() {
        let err = decrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_256, IV, &[0u8; 17]).unwrap_err();
        assert!(matches!(err, EncryptorError::Authentication));
    }

    #[test]
    fn empty_ciphertext_fails_authentication() {
        let err = decrypt_cbc(CipherAlgorithm::Aes256Cbc, &KEY_256, IV, &[]).unwrap_err();
        assert!(matches!(err, EncryptorError::Authentication));
    }

    #[test]
    fn mac_is_deterministic_lowercase_hex() {
        let a = compute_mac(&KEY_256, b"aXY=dmFsdWU=").unwrap();
        let b = compute_mac(&KEY_256, b"aXY=dmFsdWU=").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn mac_differs_per_key_and_message() {
        let base = compute_mac(&KEY_256, b"message").unwrap();
        assert_ne!(base, compute_mac(&KEY_128, b"message").unwrap());
        assert_ne!(base, compute_mac(&KEY_256, b"massage").unwrap());
    }

    #[test]
    fn mac_equal_cases() {
        assert!(mac_equal("abcd", "abcd"));
        assert!(!mac_equal("abcd", "abce"));
        assert!(!mac_equal("abcd", "abc"));
        assert!(!mac_equal("", "abcd"));
    }
}

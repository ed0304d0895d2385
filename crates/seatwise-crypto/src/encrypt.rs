use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use thiserror::Error;

/// AES-256 key size in bytes.
pub const KEY_LEN: usize = 32;
/// GCM nonce size in bytes, prepended to every sealed value.
pub const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key is not valid base64")]
    InvalidKeyEncoding,

    #[error("sealed value is truncated ({0} bytes)")]
    Truncated(usize),

    #[error("encryption failed")]
    Encrypt,

    /// Wrong key, tampered bytes or a corrupted nonce. GCM cannot tell these apart.
    #[error("decryption failed")]
    Decrypt,
}

/// Stateless AES-256-GCM sealer bound to one key.
#[derive(Clone)]
pub struct Cipher {
    aead: Aes256Gcm,
}

impl Cipher {
    /// Build a cipher from raw key bytes. Rejects anything that is not
    /// exactly [`KEY_LEN`] bytes.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let aead = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        Ok(Self { aead })
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    /// Returns `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a value produced by [`Cipher::encrypt`].
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Truncated(sealed.len()));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.aead
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::Decrypt)
    }
}

// Never print key material.
impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_key;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = Cipher::new(&generate_key()).unwrap();
        let token = b"eyJhbGciOiJIUzI1NiJ9.refresh.token";

        let sealed = cipher.encrypt(token).unwrap();
        assert_ne!(&sealed[NONCE_LEN..], &token[..]);
        assert_eq!(sealed.len(), NONCE_LEN + token.len() + TAG_LEN);

        let opened = cipher.decrypt(&sealed).unwrap();
        assert_eq!(opened, token);
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let cipher = Cipher::new(&generate_key()).unwrap();
        let sealed = cipher.encrypt(b"").unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap(), b"");
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let cipher = Cipher::new(&generate_key()).unwrap();
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = Cipher::new(&generate_key()).unwrap().encrypt(b"secret").unwrap();
        let other = Cipher::new(&generate_key()).unwrap();
        assert_eq!(other.decrypt(&sealed), Err(CryptoError::Decrypt));
    }

    #[test]
    fn any_flipped_bit_fails() {
        let cipher = Cipher::new(&generate_key()).unwrap();
        let sealed = cipher.encrypt(b"refresh-token").unwrap();

        for i in 0..sealed.len() {
            let mut corrupted = sealed.clone();
            corrupted[i] ^= 0x01;
            assert_eq!(cipher.decrypt(&corrupted), Err(CryptoError::Decrypt), "byte {}", i);
        }
    }

    #[test]
    fn truncated_input_fails() {
        let cipher = Cipher::new(&generate_key()).unwrap();
        let sealed = cipher.encrypt(b"refresh-token").unwrap();

        assert_eq!(cipher.decrypt(&[]), Err(CryptoError::Truncated(0)));
        assert_eq!(cipher.decrypt(&sealed[..NONCE_LEN]), Err(CryptoError::Truncated(NONCE_LEN)));
        assert_eq!(cipher.decrypt(&sealed[..sealed.len() - 1]), Err(CryptoError::Decrypt));
    }

    #[test]
    fn rejects_wrong_key_length() {
        for len in [0, 16, 24, 31, 33, 64] {
            let err = Cipher::new(&vec![7u8; len]).unwrap_err();
            assert_eq!(err, CryptoError::InvalidKeyLength { expected: KEY_LEN, actual: len });
        }
    }

    #[test]
    fn debug_hides_key() {
        let cipher = Cipher::new(&[0xAB; KEY_LEN]).unwrap();
        let shown = format!("{:?}", cipher);
        assert_eq!(shown, "Cipher { .. }");
    }
}

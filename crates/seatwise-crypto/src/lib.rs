/// Seatwise Crypto Library
///
/// Symmetric sealing of refresh tokens at rest (AES-256-GCM).
/// A sealed value is `nonce || ciphertext || tag` and can be opened with the
/// same key without any side-channel metadata.

pub mod encrypt;
pub mod keys;

pub use encrypt::{Cipher, CryptoError, KEY_LEN, NONCE_LEN};

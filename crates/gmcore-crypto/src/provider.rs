//! Trait-based provider mechanism for cryptographic algorithms.
//!
//! These traits define the abstract interfaces that algorithm
//! implementations satisfy, giving modes of operation a seam that is
//! independent of any concrete cipher.

use gmcore_types::CryptoError;

/// A block cipher (e.g., SM4).
pub trait BlockCipher: Send + Sync {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Key size in bytes.
    fn key_size(&self) -> usize;

    /// Encrypt a single block in-place.
    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;

    /// Decrypt a single block in-place.
    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;
}

/// An Authenticated Encryption with Associated Data (AEAD) algorithm.
pub trait Aead: Send + Sync {
    /// The length of the authentication tag in bytes.
    fn tag_size(&self) -> usize;

    /// The preferred nonce size in bytes.
    fn nonce_size(&self) -> usize;

    /// The key size in bytes.
    fn key_size(&self) -> usize;

    /// Replace the key.
    fn set_key(&mut self, key: &[u8]) -> Result<(), CryptoError>;

    /// Encrypt plaintext with AEAD.
    ///
    /// Returns ciphertext || tag.
    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt ciphertext with AEAD.
    ///
    /// `ciphertext` should include the appended tag.
    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

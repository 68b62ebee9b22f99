#![doc = "SM4 block cipher and SM4-GCM authenticated encryption for gmcore."]

// Core traits
pub mod provider;

// Symmetric ciphers
pub mod sm4;

// Modes of operation
pub mod modes;

pub mod cipher {
    //! Unified symmetric cipher interface.
    pub use super::provider::{Aead, BlockCipher};
}

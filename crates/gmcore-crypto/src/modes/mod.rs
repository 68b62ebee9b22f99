//! Block cipher modes of operation.
//!
//! GCM operates on top of a block cipher through the
//! [`BlockCipher`](crate::provider::BlockCipher) trait.

pub mod gcm;

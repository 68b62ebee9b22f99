#![forbid(unsafe_code)]
#![doc = "Common types and error codes for gmcore."]

pub mod error;

pub use error::*;

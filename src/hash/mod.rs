//! Weak rolling checksum and strong digest capabilities.
//!
//! The weak hash filters candidate blocks cheaply while scanning; a strong
//! hash confirms every weak hit before a match is emitted.

pub mod rolling;
pub mod strong;

pub use rolling::RollingChecksum;
pub use strong::{blake3_factory, md5_factory, sha256_factory, StrongHasher, StrongHasherFactory};

//! Strong digest capability used to confirm weak-hash hits.
//!
//! The engine owns one hasher instance and reuses it for every block, so
//! implementations must make a reset bit-identical to a fresh instance.

use digest::Digest;
use md5::Md5;
use sha2::Sha256;

/// A resettable, fixed-output digest.
pub trait StrongHasher: Send {
    /// Discard any absorbed input.
    fn reset(&mut self);

    /// Absorb `data`.
    fn write(&mut self, data: &[u8]);

    /// Digest of everything absorbed since the last reset; leaves the
    /// hasher reset.
    fn finalize(&mut self) -> Vec<u8>;

    /// Digest length in bytes.
    fn output_len(&self) -> usize;
}

/// Factory producing fresh hasher instances.
///
/// The engine constructs its own hashers from this at build time; handing
/// out a factory rather than an instance keeps the mutable digest state
/// private to each engine.
pub type StrongHasherFactory = Box<dyn Fn() -> Box<dyn StrongHasher> + Send + Sync>;

impl StrongHasher for Md5 {
    fn reset(&mut self) {
        Digest::reset(self);
    }

    fn write(&mut self, data: &[u8]) {
        Digest::update(self, data);
    }

    fn finalize(&mut self) -> Vec<u8> {
        self.finalize_reset().to_vec()
    }

    fn output_len(&self) -> usize {
        <Self as Digest>::output_size()
    }
}

impl StrongHasher for Sha256 {
    fn reset(&mut self) {
        Digest::reset(self);
    }

    fn write(&mut self, data: &[u8]) {
        Digest::update(self, data);
    }

    fn finalize(&mut self) -> Vec<u8> {
        self.finalize_reset().to_vec()
    }

    fn output_len(&self) -> usize {
        <Self as Digest>::output_size()
    }
}

impl StrongHasher for blake3::Hasher {
    fn reset(&mut self) {
        blake3::Hasher::reset(self);
    }

    fn write(&mut self, data: &[u8]) {
        self.update(data);
    }

    fn finalize(&mut self) -> Vec<u8> {
        let digest = blake3::Hasher::finalize(self);
        blake3::Hasher::reset(self);
        digest.as_bytes().to_vec()
    }

    fn output_len(&self) -> usize {
        blake3::OUT_LEN
    }
}

/// Factory for the default MD5 hasher.
pub fn md5_factory() -> StrongHasherFactory {
    Box::new(|| Box::new(Md5::new()))
}

/// Factory for SHA-256 hashers.
pub fn sha256_factory() -> StrongHasherFactory {
    Box::new(|| Box::new(Sha256::new()))
}

/// Factory for BLAKE3 hashers.
pub fn blake3_factory() -> StrongHasherFactory {
    Box::new(|| Box::new(blake3::Hasher::new()))
}

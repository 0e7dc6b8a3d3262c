//! Rolling weak checksum for block matching.
//!
//! A modified Adler-32 over a sliding window, similar to rsync's rolling
//! checksum: cheap to compute, O(1) to slide by one byte, and used only to
//! filter candidates before a strong hash confirms a match.

/// Modulus shared by both accumulators, the largest prime below 2^16.
const MOD_ADLER: u32 = 65521;

/// Weak rolling checksum over a window of bytes.
///
/// Two accumulators are kept modulo 65521: `a` is the plain byte sum and
/// `b` weights each byte by its distance from the window end. The 32-bit
/// digest is `(b << 16) | a`. Because `b` depends on the window length, a
/// shorter trailing window hashes differently from a full block.
#[derive(Debug, Clone, Default)]
pub struct RollingChecksum {
    a: u32,
    b: u32,
    window_len: usize,
}

impl RollingChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checksum of `data` in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut rolling = Self::new();
        rolling.update_block(data);
        rolling.digest()
    }

    /// Recompute both accumulators from scratch over a full window.
    pub fn update_block(&mut self, data: &[u8]) {
        self.a = 0;
        self.b = 0;
        self.window_len = data.len();

        for &byte in data {
            self.a = (self.a + u32::from(byte)) % MOD_ADLER;
            self.b = (self.b + self.a) % MOD_ADLER;
        }
    }

    /// Slide the window one byte forward in O(1).
    ///
    /// The state must describe a window starting with `old_byte`; the
    /// result is bit-identical to [`update_block`](Self::update_block) over
    /// the slid window.
    pub fn roll_byte(&mut self, old_byte: u8, new_byte: u8) {
        let old = u32::from(old_byte);
        let new = u32::from(new_byte);
        let len = self.window_len as u32;

        self.a = (self.a + MOD_ADLER - old + new) % MOD_ADLER;
        self.b = (self.b + self.a + MOD_ADLER - len * old % MOD_ADLER) % MOD_ADLER;
    }

    /// Current 32-bit digest.
    pub fn digest(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Length of the window the current state describes.
    pub fn window_len(&self) -> usize {
        self.window_len
    }
}

//! Seeded pseudo-random number generator
//!
//! Strategies that need randomness own one of these so that a match
//! replays identically from the same seed.

/// xorshift64* generator
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        // xorshift never leaves the all-zero state
        let state = (seed ^ 0x9e3779b97f4a7c15).max(1);
        let mut rng = Self { state };
        for _ in 0..8 {
            rng.next_u64();
        }
        rng
    }

    /// Derive an independent stream, e.g. one per seat
    pub fn fork(&self, stream: u64) -> Self {
        Self::new(self.state ^ stream.wrapping_mul(0x517cc1b727220a95))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545f4914f6cdd1d)
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// A value 0-99 (for percentage checks)
    pub fn next_percent(&mut self) -> u8 {
        (self.next_u32() % 100) as u8
    }

    /// True with probability `percent`/100; 0 never, 100 or more always
    pub fn chance(&mut self, percent: u8) -> bool {
        self.next_percent() < percent
    }
}

use rand::{rngs::StdRng, RngCore, SeedableRng};

/// random bytes for Cxkk. seeded once for the life of the interpreter; tests
/// can hand in whatever RngCore they like
pub struct ByteSource {
    rng: Box<dyn RngCore>,
}

impl ByteSource {
    pub fn new(rng: impl RngCore + 'static) -> Self {
        ByteSource { rng: Box::new(rng) }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn next_byte(&mut self) -> u8 {
        (self.rng.next_u32() & 0xff) as u8
    }
}

impl Default for ByteSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

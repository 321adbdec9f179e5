use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Deterministic PRNG with 256-bit state, suitable for snapshots/replays.
///
/// This is `xoshiro256**` seeded via SplitMix64. It implements
/// [`rand::RngCore`] so the `rand` sampling helpers work on top of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    state: [u64; 4],
}

impl GameRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64 { state: seed };
        Self {
            state: [sm.next(), sm.next(), sm.next(), sm.next()],
        }
    }

    fn step(&mut self) -> u64 {
        // xoshiro256**
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;

        self.state[3] = self.state[3].rotate_left(45);

        result
    }

    /// Uniform value in `[min, max)`. Returns `min` for empty or inverted ranges.
    pub fn random_between(&mut self, min: f32, max: f32) -> f32 {
        if !(max > min) {
            return min;
        }
        self.gen_range(min..max)
    }

    /// Mean of two uniform draws; biased toward the middle of the range.
    pub fn avg_random_between(&mut self, min: f32, max: f32) -> f32 {
        (self.random_between(min, max) + self.random_between(min, max)) * 0.5
    }

    /// True with `percent` chance (0..=100).
    pub fn roll_dice(&mut self, percent: f32) -> bool {
        self.random_between(0.0, 100.0) < percent
    }

    /// Uniform index in `0..len`; `None` when `len` is zero.
    pub fn index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.gen_range(0..len))
    }
}

impl RngCore for GameRng {
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = GameRng::seed_from_u64(7);
        let mut b = GameRng::seed_from_u64(7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn random_between_stays_in_range() {
        let mut rng = GameRng::seed_from_u64(99);
        for _ in 0..1000 {
            let v = rng.random_between(2.0, 3.0);
            assert!((2.0..3.0).contains(&v));
            let avg = rng.avg_random_between(0.0, 10.0);
            assert!((0.0..10.0).contains(&avg));
        }
    }

    #[test]
    fn degenerate_ranges_return_min() {
        let mut rng = GameRng::seed_from_u64(1);
        assert_eq!(rng.random_between(4.0, 4.0), 4.0);
        assert_eq!(rng.random_between(5.0, -1.0), 5.0);
        assert_eq!(rng.index(0), None);
    }
}

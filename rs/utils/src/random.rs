use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator that picks one random index from each of a number of equal, contiguous
/// segments. Owned by the caller so independent runs never share generator state.
pub struct SegmentSampler {
    seed: u64,
    rng: StdRng,
}

impl SegmentSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the stream from `seed`. Does nothing if `seed` is the current seed, so callers
    /// passing the same seed keep drawing from the same stream.
    pub fn reseed(&mut self, seed: u64) {
        if self.seed != seed {
            debug!("Reseeding sampler {} -> {}", self.seed, seed);
            self.seed = seed;
            self.rng = StdRng::seed_from_u64(seed);
        }
    }

    /// Uniform index in `[0, max)`. `max` must be positive.
    pub fn random_index(&mut self, max: usize) -> usize {
        self.rng.gen_range(0..max)
    }

    /// Split `total` items into `num_segments` segments of `total / num_segments` items and
    /// draw one index from each. Items past the last full segment are never picked.
    pub fn sample_segments(&mut self, total: usize, num_segments: usize) -> Vec<usize> {
        let segment_size = total / num_segments;
        (0..num_segments)
            .map(|segment| segment * segment_size + self.random_index(segment_size))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_samples() {
        let mut a = SegmentSampler::new(1024);
        let mut b = SegmentSampler::new(1024);
        assert_eq!(a.sample_segments(1000, 10), b.sample_segments(1000, 10));
    }

    #[test]
    fn test_samples_stay_in_their_segment() {
        let mut sampler = SegmentSampler::new(7);
        for _ in 0..100 {
            let picks = sampler.sample_segments(103, 4);
            assert_eq!(picks.len(), 4);
            for (segment, pick) in picks.iter().enumerate() {
                assert!(*pick >= segment * 25);
                assert!(*pick < (segment + 1) * 25);
            }
        }
    }

    #[test]
    fn test_reseed_only_on_change() {
        let mut sampler = SegmentSampler::new(32);
        let first = sampler.random_index(1 << 30);

        // Same seed continues the stream.
        sampler.reseed(32);
        let mut fresh = SegmentSampler::new(32);
        assert_eq!(fresh.random_index(1 << 30), first);
        assert_eq!(sampler.random_index(1 << 30), fresh.random_index(1 << 30));

        // A different seed restarts it.
        sampler.reseed(33);
        assert_eq!(sampler.seed(), 33);
        let mut other = SegmentSampler::new(33);
        assert_eq!(sampler.random_index(1 << 30), other.random_index(1 << 30));
    }
}

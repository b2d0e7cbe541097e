//! Key and value generators for synthetic workloads.
//!
//! Every generator draws from a seeded [`StdRng`], so a run is reproducible
//! from its seed alone.

use rand::distributions::Alphanumeric;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Monotonic counter handing out never-reused key numbers.
///
/// Used for the loading phase and for INSERT operations, which must target
/// keys no earlier operation has touched.
#[derive(Clone, Debug)]
pub struct SequentialGenerator {
    next: u64,
}

impl SequentialGenerator {
    /// Start counting at `start`.
    pub fn new(start: u64) -> Self {
        Self { next: start }
    }

    /// Return the current key number and advance the cursor.
    pub fn next(&mut self) -> u64 {
        let n = self.next;
        self.next += 1;
        n
    }

    /// The key number the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// Uniform draws over an inclusive integer range.
#[derive(Clone, Debug)]
pub struct UniformGenerator {
    rng: StdRng,
    lo: u64,
    hi: u64,
}

impl UniformGenerator {
    /// Draw uniformly from `[lo, hi]` inclusive.
    pub fn new(lo: u64, hi: u64, seed: u64) -> Self {
        assert!(lo <= hi, "empty range {}..={}", lo, hi);
        Self {
            rng: StdRng::seed_from_u64(seed),
            lo,
            hi,
        }
    }

    pub fn next(&mut self) -> u64 {
        self.rng.gen_range(self.lo..=self.hi)
    }
}

/// Hot/cold composite generator producing an 80/20 access skew.
///
/// The key space `[1, n]` is split so the top `hot_start` fraction of key
/// numbers forms the hot set; a permille judge draw routes `hot_share` of
/// all accesses there. Defaults approximate the usual Zipfian-like pattern:
/// 20% of the keys take 80% of the traffic.
#[derive(Clone, Debug)]
pub struct SkewedGenerator {
    rng: StdRng,
    cold_lo: u64,
    cold_hi: u64,
    hot_lo: u64,
    hot_hi: u64,
    hot_permille: u32,
}

impl SkewedGenerator {
    /// 80/20 skew over `[1, key_space]`.
    pub fn new(key_space: u64, seed: u64) -> Self {
        Self::with_bias(key_space, 0.8, 0.8, seed)
    }

    /// Skew with an explicit hot-set boundary and traffic share.
    ///
    /// `hot_start` is the fraction of the key space below the hot set;
    /// `hot_share` is the fraction of draws routed into the hot set.
    pub fn with_bias(key_space: u64, hot_start: f64, hot_share: f64, seed: u64) -> Self {
        assert!(key_space >= 2, "key space {} too small to split", key_space);
        assert!((0.0..1.0).contains(&hot_start), "hot_start out of range");
        assert!((0.0..=1.0).contains(&hot_share), "hot_share out of range");
        let split = ((key_space as f64 * hot_start) as u64).clamp(2, key_space);
        Self {
            rng: StdRng::seed_from_u64(seed),
            cold_lo: 1,
            cold_hi: split - 1,
            hot_lo: split,
            hot_hi: key_space,
            hot_permille: (hot_share * 1000.0) as u32,
        }
    }

    /// First key number of the hot set.
    pub fn hot_start(&self) -> u64 {
        self.hot_lo
    }

    pub fn next(&mut self) -> u64 {
        if self.rng.gen_range(0..1000) < self.hot_permille {
            self.rng.gen_range(self.hot_lo..=self.hot_hi)
        } else {
            self.rng.gen_range(self.cold_lo..=self.cold_hi)
        }
    }
}

/// Fixed-length random alphanumeric payloads.
#[derive(Clone, Debug)]
pub struct ValueGenerator {
    rng: StdRng,
    len: usize,
}

impl ValueGenerator {
    pub fn new(len: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            len,
        }
    }

    pub fn next(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(self.len)
            .map(char::from)
            .collect()
    }
}

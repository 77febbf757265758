//! Random number generators.
//!
//! Mersenne-Twister (MT19937-64) uniforms from `rand_mt`, turned into
//! standard normals either by inverting the cumulative distribution or by
//! `rand_distr`'s ziggurat sampler. [`substream_seed`] derives independent,
//! reproducible seeds for parallel workers from one user seed.

use ol_core::Real;
use rand::Rng;
use rand_distr::StandardNormal;
use rand_mt::Mt19937GenRand64;

use crate::distributions::normal::inverse_unchecked;

/// A uniform pseudo-random number generator based on MT19937-64.
#[derive(Clone)]
pub struct MersenneTwisterUniformRng {
    rng: Mt19937GenRand64,
}

impl MersenneTwisterUniformRng {
    /// Create a new generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mt19937GenRand64::new(seed),
        }
    }

    /// Next uniform deviate in the open interval (0, 1).
    pub fn next_real(&mut self) -> Real {
        // 53 random bits, shifted off zero by half an ulp of the lattice.
        let bits = self.rng.next_u64() >> 11;
        (bits as Real + 0.5) / (1u64 << 53) as Real
    }
}

/// Standard normals by inversion of the cumulative distribution.
///
/// Inversion preserves the monotone map from uniforms to normals, so the
/// same seed yields the same normals on every platform.
#[derive(Clone)]
pub struct InverseCumulativeNormalRng {
    inner: MersenneTwisterUniformRng,
}

impl InverseCumulativeNormalRng {
    /// Create a new generator backed by a Mersenne Twister with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: MersenneTwisterUniformRng::new(seed),
        }
    }

    /// Next standard-normal deviate.
    pub fn next_real(&mut self) -> Real {
        inverse_unchecked(self.inner.next_real())
    }
}

/// Standard normals from the ziggurat sampler of `rand_distr`.
#[derive(Clone)]
pub struct ZigguratNormalRng {
    rng: Mt19937GenRand64,
}

impl ZigguratNormalRng {
    /// Create a new generator backed by a Mersenne Twister with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mt19937GenRand64::new(seed),
        }
    }

    /// Next standard-normal deviate.
    pub fn next_real(&mut self) -> Real {
        self.rng.sample(StandardNormal)
    }
}

/// How uniforms are turned into normals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NormalMethod {
    /// Acklam inversion refined by one Halley step.
    #[default]
    InverseCumulative,
    /// Ziggurat rejection sampling.
    Ziggurat,
}

/// A normal generator selected at runtime by [`NormalMethod`].
#[derive(Clone)]
pub enum NormalRng {
    /// See [`InverseCumulativeNormalRng`].
    InverseCumulative(InverseCumulativeNormalRng),
    /// See [`ZigguratNormalRng`].
    Ziggurat(ZigguratNormalRng),
}

impl NormalRng {
    /// Create a generator of the given kind.
    pub fn new(method: NormalMethod, seed: u64) -> Self {
        match method {
            NormalMethod::InverseCumulative => {
                Self::InverseCumulative(InverseCumulativeNormalRng::new(seed))
            }
            NormalMethod::Ziggurat => Self::Ziggurat(ZigguratNormalRng::new(seed)),
        }
    }

    /// Next standard-normal deviate.
    #[inline]
    pub fn next_real(&mut self) -> Real {
        match self {
            Self::InverseCumulative(rng) => rng.next_real(),
            Self::Ziggurat(rng) => rng.next_real(),
        }
    }

    /// Fill `out` with standard-normal deviates.
    pub fn fill(&mut self, out: &mut [Real]) {
        for z in out.iter_mut() {
            *z = self.next_real();
        }
    }
}

/// Seed for sub-stream `stream` of the user seed `seed`.
///
/// Two rounds of the SplitMix64 finaliser over the seed and the stream index,
/// so neighbouring streams start from unrelated generator states while the
/// mapping stays a pure function of `(seed, stream)`.
pub fn substream_seed(seed: u64, stream: u64) -> u64 {
    let mixed = splitmix64(seed) ^ splitmix64(stream.wrapping_add(0x632B_E59B_D9B4_E019));
    splitmix64(mixed)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

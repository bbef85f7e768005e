#[cfg(feature = "insecure-rng")]
use rand::rngs::StdRng;
#[cfg(not(feature = "insecure-rng"))]
use rand::rngs::ThreadRng;
#[cfg(feature = "insecure-rng")]
use rand::SeedableRng;
use rand::Rng;

pub const DEFAULT_SEED: u64 = 42;

// Correlation deltas are drawn from 1..=MAX_CORRELATION_DELTA.
pub const MAX_CORRELATION_DELTA: u32 = 1_000_000;

#[cfg(not(feature = "insecure-rng"))]
pub fn get_rng() -> ThreadRng {
    rand::thread_rng()
}

#[cfg(feature = "insecure-rng")]
pub fn get_rng() -> StdRng {
    rand::rngs::StdRng::seed_from_u64(DEFAULT_SEED)
}

/// Uniform 32-bit value, used for the COT pads and the MTA blinding.
#[must_use]
pub fn random_u32() -> u32 {
    get_rng().gen()
}

/// Uniform value in `1..=1_000_000`.
///
/// It is used both for the correlation delta sent on connection and for
/// the share picked by the binary when none is given.
#[must_use]
pub fn random_small_share() -> u32 {
    get_rng().gen_range(1..=MAX_CORRELATION_DELTA)
}

//! Additive jitter applied on top of exponential backoff delays.

use rand::Rng;
use std::time::Duration;

/// Adds `uniform(0, base/2)` on top of `base` (§4.4). Unlike a
/// full-jitter-replaces-the-delay scheme, the base delay is always honored and
/// jitter only ever adds to it, so retries never get faster than the
/// unjittered backoff curve.
pub fn apply(base: Duration) -> Duration {
    apply_with_rng(base, &mut rand::rng())
}

/// Same as [`apply`] but with an injectable RNG, for deterministic tests.
pub fn apply_with_rng<R: Rng>(base: Duration, rng: &mut R) -> Duration {
    let half_millis = (base.as_millis() / 2) as u64;
    let jitter_millis = if half_millis == 0 { 0 } else { rng.random_range(0..=half_millis) };
    base + Duration::from_millis(jitter_millis)
}

use rand::Rng;
use std::time::Duration;

/// Computes the pause before the next presence query.
///
/// `max(0, interval + uniform(-jitter, +jitter))`, sampled at nanosecond
/// resolution so the result always lies in `[interval - jitter, interval + jitter]`
/// clamped at zero.
pub fn next_delay<R>(interval: Duration, jitter: Duration, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let jitter_ns = u64::try_from(jitter.as_nanos()).unwrap_or(u64::MAX);
    if jitter_ns == 0 {
        return interval;
    }

    let span = rng.random_range(0..=jitter_ns.saturating_mul(2));
    let shifted = interval.as_nanos() + u128::from(span);
    let delay = shifted.saturating_sub(u128::from(jitter_ns));

    Duration::from_nanos(u64::try_from(delay).unwrap_or(u64::MAX))
}

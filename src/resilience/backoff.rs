//! Linear backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before retry number `attempt` (1-based): `base_ms * attempt`.
///
/// `jitter_ratio` adds up to that fraction of the delay on top; `0.0` gives
/// the exact linear schedule.
pub fn calculate_backoff(attempt: u32, base_ms: u64, jitter_ratio: f64) -> Duration {
    if attempt == 0 || base_ms == 0 {
        return Duration::from_millis(0);
    }

    let delay_ms = base_ms.saturating_mul(u64::from(attempt));

    let jitter_range = (delay_ms as f64 * jitter_ratio.clamp(0.0, 1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_schedule() {
        assert_eq!(calculate_backoff(0, 100, 0.0), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 100, 0.0), Duration::from_millis(100));
        assert_eq!(calculate_backoff(2, 100, 0.0), Duration::from_millis(200));
        assert_eq!(calculate_backoff(3, 250, 0.0), Duration::from_millis(750));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..100 {
            let delay = calculate_backoff(2, 100, 0.1).as_millis();
            assert!((200..220).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_saturates() {
        assert_eq!(
            calculate_backoff(u32::MAX, u64::MAX, 0.0),
            Duration::from_millis(u64::MAX)
        );
    }
}

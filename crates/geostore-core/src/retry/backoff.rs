//! Backoff delays for primary and secondary attempts.

use super::options::RetryPolicyKind;
use rand::Rng;
use std::time::Duration;

/// Base delay before an attempt against the secondary host.
pub const SECONDARY_BASE_DELAY: Duration = Duration::from_secs(1);

const SECONDARY_JITTER_LOW: f64 = 0.8;
const SECONDARY_JITTER_HIGH: f64 = 1.2;

impl RetryPolicyKind {
    /// Delay before the primary attempt numbered `primary_try` (1-based).
    ///
    /// # Formula
    ///
    /// ```text
    /// Exponential: (2^(primary_try - 1) - 1) * retry_delay
    /// Fixed:       retry_delay
    /// ```
    ///
    /// The exponential result is zero for the first try and is not clamped to
    /// the configured maximum delay. Arithmetic saturates instead of overflowing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geostore_core::retry::RetryPolicyKind;
    /// use std::time::Duration;
    ///
    /// let d = Duration::from_secs(4);
    /// let delays: Vec<_> = (1..=4)
    ///     .map(|k| RetryPolicyKind::Exponential.primary_delay(d, k).as_secs())
    ///     .collect();
    /// assert_eq!(delays, vec![0, 4, 12, 28]);
    /// ```
    pub fn primary_delay(self, retry_delay: Duration, primary_try: u32) -> Duration {
        match self {
            RetryPolicyKind::Exponential => {
                let exponent = primary_try.saturating_sub(1);
                let factor = if exponent >= u32::BITS {
                    u32::MAX
                } else {
                    ((1u64 << exponent) - 1) as u32
                };
                retry_delay.saturating_mul(factor)
            }
            RetryPolicyKind::Fixed => retry_delay,
        }
    }
}

/// Jittered delay before a secondary attempt, in `[0.8s, 1.2s)`.
///
/// Secondary attempts are fast fallbacks, so this ignores the configured
/// policy kind and delays.
pub fn secondary_delay() -> Duration {
    secondary_delay_from(&mut rand::thread_rng())
}

/// [`secondary_delay`] with a caller-supplied random source.
pub fn secondary_delay_from<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    SECONDARY_BASE_DELAY.mul_f64(rng.gen_range(SECONDARY_JITTER_LOW..SECONDARY_JITTER_HIGH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_exponential_delay_calculation() {
        let d = Duration::from_secs(4);
        let kind = RetryPolicyKind::Exponential;

        assert_eq!(kind.primary_delay(d, 1), Duration::ZERO);
        assert_eq!(kind.primary_delay(d, 2), Duration::from_secs(4));
        assert_eq!(kind.primary_delay(d, 3), Duration::from_secs(12));
        assert_eq!(kind.primary_delay(d, 4), Duration::from_secs(28));
        assert_eq!(kind.primary_delay(d, 5), Duration::from_secs(60));
    }

    #[test]
    fn test_exponential_is_not_clamped() {
        // 2^6 - 1 = 63 * 4s = 252s, above the 120s default maximum
        let delay = RetryPolicyKind::Exponential.primary_delay(Duration::from_secs(4), 7);
        assert_eq!(delay, Duration::from_secs(252));
    }

    #[test]
    fn test_exponential_saturates() {
        let delay = RetryPolicyKind::Exponential.primary_delay(Duration::from_secs(4), u32::MAX);
        assert_eq!(delay, Duration::from_secs(4).saturating_mul(u32::MAX));

        let huge = RetryPolicyKind::Exponential.primary_delay(Duration::MAX, 3);
        assert_eq!(huge, Duration::MAX);
    }

    #[test]
    fn test_zero_try_treated_as_first() {
        let delay = RetryPolicyKind::Exponential.primary_delay(Duration::from_secs(4), 0);
        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn test_fixed_delay_independent_of_try() {
        let d = Duration::from_millis(1500);
        for primary_try in [1, 2, 3, 10, 100] {
            assert_eq!(RetryPolicyKind::Fixed.primary_delay(d, primary_try), d);
        }
    }

    #[test]
    fn test_secondary_delay_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut delays = Vec::new();
        for _ in 0..200 {
            delays.push(secondary_delay_from(&mut rng));
        }

        for delay in &delays {
            assert!(
                (800..1200).contains(&delay.as_millis()),
                "secondary delay out of range: {:?}",
                delay
            );
        }

        let all_same = delays.windows(2).all(|w| w[0] == w[1]);
        assert!(!all_same, "secondary delays should be jittered");
    }

    #[test]
    fn test_secondary_delay_thread_rng() {
        let delay = secondary_delay();
        assert!(delay >= Duration::from_millis(800));
        assert!(delay < Duration::from_millis(1200));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn exponential_matches_formula(millis in 1u64..10_000, primary_try in 1u32..=20) {
                let d = Duration::from_millis(millis);
                let expected = d * ((1u32 << (primary_try - 1)) - 1);
                prop_assert_eq!(RetryPolicyKind::Exponential.primary_delay(d, primary_try), expected);
            }

            #[test]
            fn fixed_ignores_try(millis in 1u64..600_000, primary_try in any::<u32>()) {
                let d = Duration::from_millis(millis);
                prop_assert_eq!(RetryPolicyKind::Fixed.primary_delay(d, primary_try), d);
            }

            #[test]
            fn secondary_delay_stays_in_band(seed in any::<u64>()) {
                let mut rng = StdRng::seed_from_u64(seed);
                let delay = secondary_delay_from(&mut rng);
                prop_assert!(delay >= Duration::from_millis(800), "{:?}", delay);
                prop_assert!(delay < Duration::from_millis(1200), "{:?}", delay);
            }
        }
    }
}

//! Reload delay computation for crash recovery.

use crate::constants::{FAILSAFE_JITTER, MAX_RELOADS, RELOAD_JITTER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
	pub delay_ms: u32,
	/// Set once the consecutive failure count exceeds the threshold.
	pub is_failsafe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
	/// Inclusive.
	pub min_ms: u32,
	/// Inclusive.
	pub max_ms: u32,
	pub max_reloads: u32,
	pub failsafe_ms: u32,
}

impl Default for BackoffPolicy {
	fn default() -> Self {
		Self {
			min_ms: RELOAD_JITTER.0,
			max_ms: RELOAD_JITTER.1,
			max_reloads: MAX_RELOADS,
			failsafe_ms: FAILSAFE_JITTER,
		}
	}
}

impl BackoffPolicy {
	/// `random` is a uniform sample from `[0, 1)`, as returned by `Math.random()`.
	///
	/// Values outside that range are clamped, so the result always stays within the window.
	#[must_use]
	pub fn delay(&self, failures: u32, random: f64) -> Backoff {
		if failures > self.max_reloads {
			return Backoff {
				delay_ms: self.failsafe_ms,
				is_failsafe: true,
			};
		}

		let (min, max) = if self.min_ms <= self.max_ms {
			(self.min_ms, self.max_ms)
		} else {
			(self.max_ms, self.min_ms)
		};
		let span = f64::from(max - min) + 1.0;
		let random = if random.is_finite() { random.clamp(0.0, 1.0) } else { 0.0 };
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let offset = ((random * span).floor() as u32).min(max - min);
		Backoff {
			delay_ms: min + offset,
			is_failsafe: false,
		}
	}

	/// [`delay`](`BackoffPolicy::delay`) with a sample from `Math.random()`. Browser only.
	#[must_use]
	pub fn jittered(&self, failures: u32) -> Backoff {
		self.delay(failures, js_sys::Math::random())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn window_bounds_are_inclusive() {
		let policy = BackoffPolicy::default();
		assert_eq!(policy.delay(0, 0.0).delay_ms, 1000);
		assert_eq!(policy.delay(0, 0.999_999_9).delay_ms, 3000);
		assert_eq!(policy.delay(0, 1.0).delay_ms, 3000);
	}

	#[test]
	fn counts_up_to_threshold_stay_random() {
		let policy = BackoffPolicy::default();
		for failures in 0..=MAX_RELOADS {
			for &random in &[0.0, 0.25, 0.5, 0.75, 0.99] {
				let backoff = policy.delay(failures, random);
				assert!(!backoff.is_failsafe);
				assert!((1000..=3000).contains(&backoff.delay_ms), "{:?}", backoff);
			}
		}
	}

	#[test]
	fn counts_above_threshold_are_fixed() {
		let policy = BackoffPolicy::default();
		for failures in MAX_RELOADS + 1..MAX_RELOADS + 20 {
			assert_eq!(
				policy.delay(failures, 0.3),
				Backoff {
					delay_ms: FAILSAFE_JITTER,
					is_failsafe: true
				}
			);
		}
	}

	#[test]
	fn nonsense_samples_are_clamped() {
		let policy = BackoffPolicy::default();
		assert_eq!(policy.delay(1, f64::NAN).delay_ms, 1000);
		assert_eq!(policy.delay(1, -4.0).delay_ms, 1000);
		assert_eq!(policy.delay(1, 12.0).delay_ms, 3000);
	}
}

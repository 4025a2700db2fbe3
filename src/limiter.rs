//! Per-second request pacing keyed on wall-clock seconds.
//!
//! [`RequestLimiter::limit`] counts calls inside the current one-second bucket. The first
//! call observed in a new second resets the count and proceeds; later calls increment it and,
//! once the count reaches the configured maximum, suspend until the next second boundary.
//! Fractional maximums (`< 1`) therefore suspend every call after the first in a second.
//!
//! Buckets follow the system clock ([`OffsetDateTime::now_utc`]) while the suspension itself runs
//! on tokio's timer. A paused tokio clock therefore never moves a call into the next bucket; use
//! [`RequestLimiter::reserve_at`] to drive the bucket decision from an explicit instant.

// self
use crate::_prelude::*;

/// Snapshot of the limiter's bucket bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LimiterState {
	/// Current bucket as whole Unix seconds.
	pub bucket: i64,
	/// Calls counted in the bucket after the one that opened it.
	pub requests_in_bucket: u64,
}

/// Limits outbound requests to a maximum per wall-clock second.
#[derive(Debug)]
pub struct RequestLimiter {
	max_per_second: f64,
	state: Mutex<LimiterState>,
}
impl RequestLimiter {
	/// Creates a limiter allowing `max_per_second` requests per second.
	pub fn new(max_per_second: f64) -> Self {
		Self { max_per_second, state: Mutex::new(LimiterState::default()) }
	}

	/// Configured per-second maximum.
	pub fn max_per_second(&self) -> f64 {
		self.max_per_second
	}

	/// Current bucket bookkeeping.
	pub fn state(&self) -> LimiterState {
		*self.state.lock()
	}

	/// Suspends the caller until the next request may be issued.
	///
	/// Returns the suspension that was applied, if any. Never fails.
	pub async fn limit(&self) -> Option<Duration> {
		let wait = self.reserve_at(OffsetDateTime::now_utc());

		if let Some(wait) = wait {
			tokio::time::sleep(wait.unsigned_abs()).await;
		}

		wait
	}

	/// Records a call at `now` and returns how long the caller must wait before proceeding.
	///
	/// The bucket lock is released before any suspension happens.
	pub fn reserve_at(&self, now: OffsetDateTime) -> Option<Duration> {
		let now_ms = i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
		let second = now_ms.div_euclid(1_000);
		let mut state = self.state.lock();

		if state.bucket != second {
			state.bucket = second;
			state.requests_in_bucket = 0;

			return None;
		}

		state.requests_in_bucket = state.requests_in_bucket.saturating_add(1);

		if (state.requests_in_bucket as f64) < self.max_per_second {
			return None;
		}

		let next_second_ms = state.bucket.saturating_add(1).saturating_mul(1_000);

		Some(Duration::milliseconds(next_second_ms - now_ms))
	}
}

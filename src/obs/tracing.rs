// self
use crate::{_prelude::*, obs::RequestKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// Span wrapping one logical request.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a span tagged with the request kind, method, and address.
	///
	/// Disabled logs yield a no-op span.
	pub fn new(log: RequestLog, kind: RequestKind, method: &str, address: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = if log.is_enabled() {
				tracing::info_span!("paced_api.request", kind = kind.as_str(), method, address)
			} else {
				tracing::Span::none()
			};

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (log, kind, method, address);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Event sink gated by [`ClientConfig::logging`](crate::config::ClientConfig::logging).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestLog {
	enabled: bool,
}
impl RequestLog {
	/// Creates a sink that emits only when `enabled`.
	pub const fn new(enabled: bool) -> Self {
		Self { enabled }
	}

	/// Whether events are emitted.
	pub const fn is_enabled(self) -> bool {
		self.enabled
	}

	/// Outgoing physical attempt.
	pub fn outgoing(self, method: &str, address: &str, attempt: u32) {
		#[cfg(feature = "tracing")]
		{
			if self.enabled {
				tracing::info!(method, address, attempt, "Sending request.");
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, address, attempt);
		}
	}

	/// Upstream answered 429 and the request will be retried after `wait`.
	pub fn rate_limited(self, address: &str, attempt: u32, wait: Duration) {
		#[cfg(feature = "tracing")]
		{
			if self.enabled {
				tracing::warn!(address, attempt, wait = %wait, "Rate limited; retrying after cooldown.");
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (address, attempt, wait);
		}
	}

	/// Local limiter suspended the caller for `wait`.
	pub fn limiter_wait(self, wait: Duration) {
		#[cfg(feature = "tracing")]
		{
			if self.enabled {
				tracing::debug!(wait = %wait, "Request limiter suspended the caller.");
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = wait;
		}
	}

	/// Token renewal is about to run; `remaining` is the old token's validity, if any.
	pub fn token_renewal(self, remaining: Option<Duration>) {
		#[cfg(feature = "tracing")]
		{
			if self.enabled {
				match remaining {
					Some(remaining) =>
						tracing::info!(remaining = %remaining, "Renewing access token near expiry."),
					None => tracing::info!("Requesting initial access token."),
				}
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = remaining;
		}
	}

	/// A non-empty page was appended to a paginated fetch.
	pub fn page(self, address: &str, page: u64, items: usize) {
		#[cfg(feature = "tracing")]
		{
			if self.enabled {
				tracing::debug!(address, page, items, "Fetched page.");
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (address, page, items);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn disabled_log_is_silent_noop() {
		let log = RequestLog::new(false);
		let _span = RequestSpan::new(log, RequestKind::Api, "GET", "https://example.test/v2/me");

		log.outgoing("GET", "https://example.test/v2/me", 1);
		log.rate_limited("https://example.test/v2/me", 1, Duration::milliseconds(1_500));

		assert!(!log.is_enabled());
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = RequestSpan::new(RequestLog::new(true), RequestKind::Token, "POST", "token");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}

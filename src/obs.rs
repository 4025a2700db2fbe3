//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `paced_api.request` (fields `kind`,
//!   `method`, `address`) plus events for outgoing attempts, 429 retries, limiter suspensions,
//!   and token renewals. Events are only emitted when [`ClientConfig::logging`] is set.
//! - Enable `metrics` to increment the `paced_api_request_total` counter for every
//!   attempt/success/failure/rate-limited outcome, labeled by `kind` + `outcome`.
//!
//! [`ClientConfig::logging`]: crate::config::ClientConfig::logging

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Request kinds observed by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
	/// Caller-initiated API request.
	Api,
	/// Client-credentials grant.
	Token,
	/// One page of a paginated fetch.
	Page,
}
impl RequestKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestKind::Api => "api",
			RequestKind::Token => "token",
			RequestKind::Page => "page",
		}
	}
}
impl Display for RequestKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Physical attempt handed to the transport.
	Attempt,
	/// Upstream answered 429.
	RateLimited,
	/// Logical request resolved with a response.
	Success,
	/// Logical request failed with an error.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::RateLimited => "rate_limited",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

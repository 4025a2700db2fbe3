//! Immutable client configuration and its defaults.
//!
//! [`ClientConfig`] is fixed at construction; use [`ClientConfig::builder`] to assemble and
//! validate one. Durations are [`time::Duration`] values, and "no timeout" is `None` rather
//! than a sentinel.

/// Builder API for assembling client configuration.
pub mod builder;

pub use builder::*;

// crates.io
use backon::ExponentialBuilder;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, Secret},
	error::ConfigError,
};

/// Production API root used when none is configured.
pub const DEFAULT_API_ROOT: &str = "https://api.intra.42.fr";
/// Default pacing: one request every three seconds.
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: f64 = 1. / 3.;
/// Scopes requested by default.
pub const DEFAULT_SCOPES: [&str; 2] = ["public", "projects"];
/// Token endpoint path relative to the API root.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Cooldown policy applied to consecutive 429 responses within one logical request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Sleep before the first retry.
	pub base_cooldown: Duration,
	/// Multiplier applied to the cooldown after every consecutive 429.
	pub factor: u32,
}
impl RetryPolicy {
	/// Default base cooldown.
	pub const DEFAULT_BASE_COOLDOWN: Duration = Duration::milliseconds(1_500);
	/// Default growth factor.
	pub const DEFAULT_FACTOR: u32 = 2;

	/// Creates a policy with the provided base cooldown and growth factor.
	pub const fn new(base_cooldown: Duration, factor: u32) -> Self {
		Self { base_cooldown, factor }
	}

	/// Unbounded exponential schedule without jitter: `base`, `base * factor`, and so on.
	///
	/// The number of retries is bounded by [`ClientConfig::timeout`] instead of a retry count.
	pub fn backoff(&self) -> ExponentialBuilder {
		ExponentialBuilder::default()
			.with_min_delay(self.base_cooldown.unsigned_abs())
			.with_factor(self.factor as f32)
			.without_max_delay()
			.without_max_times()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if !self.base_cooldown.is_positive() {
			return Err(ConfigError::NonPositiveCooldown { cooldown: self.base_cooldown });
		}
		if self.factor == 0 {
			return Err(ConfigError::ZeroRetryFactor);
		}

		Ok(())
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_BASE_COOLDOWN, Self::DEFAULT_FACTOR)
	}
}

/// Validated, immutable settings for one client instance.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// OAuth client identifier.
	pub client_uid: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Requests allowed per wall-clock second; fractional values space requests out.
	pub max_requests_per_second: f64,
	/// Emits request/retry events when the `tracing` feature is enabled.
	pub logging: bool,
	/// Base URL every request path is appended to.
	pub api_root: Url,
	/// Cumulative wall-clock budget per logical request; `None` means unbounded.
	pub timeout: Option<Duration>,
	/// Scopes requested by the client-credentials grant.
	pub scopes: ScopeSet,
	/// 429 cooldown policy.
	pub retry: RetryPolicy,
}
impl ClientConfig {
	/// Creates a new builder for the provided credentials.
	pub fn builder(
		client_uid: impl Into<String>,
		client_secret: impl Into<Secret>,
	) -> ClientConfigBuilder {
		ClientConfigBuilder::new(client_uid, client_secret)
	}

	/// Joins a request path (with optional query) onto the API root.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let root = self.api_root.as_str().trim_end_matches('/');
		let address = if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
			format!("{root}{path}")
		} else {
			format!("{root}/{path}")
		};

		Url::parse(&address).map_err(|source| ConfigError::InvalidAddress { address, source })
	}

	/// Absolute token endpoint URL.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		self.resolve(TOKEN_PATH)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn resolve_joins_paths_onto_root() {
		let config = ClientConfig::builder("uid", "secret")
			.api_root(Url::parse("https://example.test/").expect("Root fixture should parse."))
			.build()
			.expect("Config fixture should build.");

		assert_eq!(
			config.resolve("/v2/users?filter[x]=1").expect("Path should resolve.").as_str(),
			"https://example.test/v2/users?filter[x]=1"
		);
		assert_eq!(
			config.resolve("v2/me").expect("Relative path should resolve.").as_str(),
			"https://example.test/v2/me"
		);
		assert_eq!(
			config.token_url().expect("Token URL should resolve.").as_str(),
			"https://example.test/oauth/token"
		);
	}

	#[test]
	fn backoff_grows_geometrically_without_a_cap() {
		// crates.io
		use backon::BackoffBuilder;

		let delays = RetryPolicy::default().backoff().build().take(5).collect::<Vec<_>>();

		assert_eq!(
			delays,
			[1_500, 3_000, 6_000, 12_000, 24_000].map(std::time::Duration::from_millis).to_vec()
		);

		let tripled = RetryPolicy::new(Duration::seconds(1), 3).backoff().build().take(3);

		assert_eq!(tripled.map(|delay| delay.as_secs()).collect::<Vec<_>>(), [1, 3, 9]);
	}

	#[test]
	fn retry_policy_rejects_degenerate_values() {
		assert!(RetryPolicy::default().validate().is_ok());
		assert!(matches!(
			RetryPolicy::new(Duration::ZERO, 2).validate(),
			Err(ConfigError::NonPositiveCooldown { .. })
		));
		assert!(matches!(
			RetryPolicy::new(Duration::seconds(1), 0).validate(),
			Err(ConfigError::ZeroRetryFactor)
		));
	}
}

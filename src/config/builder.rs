// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, Secret},
	config::{
		ClientConfig, DEFAULT_API_ROOT, DEFAULT_MAX_REQUESTS_PER_SECOND, DEFAULT_SCOPES,
		RetryPolicy,
	},
	error::ConfigError,
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// OAuth client identifier.
	pub client_uid: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Requests allowed per wall-clock second.
	pub max_requests_per_second: f64,
	/// Request/retry event emission toggle.
	pub logging: bool,
	/// API root override; `None` selects [`DEFAULT_API_ROOT`].
	pub api_root: Option<Url>,
	/// Cumulative per-request budget.
	pub timeout: Option<Duration>,
	/// Scope override; `None` selects [`DEFAULT_SCOPES`].
	pub scopes: Option<ScopeSet>,
	/// 429 cooldown policy.
	pub retry: RetryPolicy,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided credentials and defaults.
	pub fn new(client_uid: impl Into<String>, client_secret: impl Into<Secret>) -> Self {
		Self {
			client_uid: client_uid.into(),
			client_secret: client_secret.into(),
			max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
			logging: false,
			api_root: None,
			timeout: None,
			scopes: None,
			retry: RetryPolicy::default(),
		}
	}

	/// Sets the per-second request budget.
	pub fn max_requests_per_second(mut self, rate: f64) -> Self {
		self.max_requests_per_second = rate;

		self
	}

	/// Enables or disables request/retry logging.
	pub fn logging(mut self, enabled: bool) -> Self {
		self.logging = enabled;

		self
	}

	/// Overrides the API root.
	pub fn api_root(mut self, url: Url) -> Self {
		self.api_root = Some(url);

		self
	}

	/// Sets the cumulative per-request budget.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets or clears the cumulative per-request budget.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the requested scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}

	/// Overrides the 429 cooldown policy.
	pub fn retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let api_root = match self.api_root {
			Some(url) => url,
			None => Url::parse(DEFAULT_API_ROOT)
				.map_err(|_| ConfigError::InvalidApiRoot { url: DEFAULT_API_ROOT.into() })?,
		};
		let scopes = match self.scopes {
			Some(scopes) => scopes,
			None => ScopeSet::new(DEFAULT_SCOPES)?,
		};
		let config = ClientConfig {
			client_uid: self.client_uid,
			client_secret: self.client_secret,
			max_requests_per_second: self.max_requests_per_second,
			logging: self.logging,
			api_root,
			timeout: self.timeout,
			scopes,
			retry: self.retry,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.client_uid.is_empty() {
			return Err(ConfigError::MissingClientUid);
		}
		if self.client_secret.is_empty() {
			return Err(ConfigError::MissingClientSecret);
		}
		if !self.max_requests_per_second.is_finite() || self.max_requests_per_second <= 0. {
			return Err(ConfigError::InvalidRate { value: self.max_requests_per_second });
		}
		if let Some(timeout) = self.timeout.filter(|timeout| !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveTimeout { timeout });
		}

		validate_api_root(&self.api_root)?;

		self.retry.validate()
	}
}

fn validate_api_root(url: &Url) -> Result<(), ConfigError> {
	if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() {
		Ok(())
	} else {
		Err(ConfigError::InvalidApiRoot { url: url.to_string() })
	}
}

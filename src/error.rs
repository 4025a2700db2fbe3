//! Client-level error types shared across the pipeline, the token grant, and configuration.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or request-construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); never retried.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Cumulative request budget exhausted.
	#[error(transparent)]
	Timeout(#[from] TimeoutError),
	/// Token grant failed; the protected request was not attempted.
	#[error(transparent)]
	Grant(#[from] GrantError),
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Client UID is empty.
	#[error("Client UID must not be empty.")]
	MissingClientUid,
	/// Client secret is empty.
	#[error("Client secret must not be empty.")]
	MissingClientSecret,
	/// Request rate is zero, negative, or not finite.
	#[error("Maximum requests per second must be a positive finite number, got {value}.")]
	InvalidRate {
		/// Rejected rate.
		value: f64,
	},
	/// Timeout is zero or negative.
	#[error("Timeout must be positive, got {timeout}.")]
	NonPositiveTimeout {
		/// Rejected timeout.
		timeout: Duration,
	},
	/// Retry cooldown is zero or negative.
	#[error("Retry base cooldown must be positive, got {cooldown}.")]
	NonPositiveCooldown {
		/// Rejected cooldown.
		cooldown: Duration,
	},
	/// Retry factor of zero would collapse the cooldown.
	#[error("Retry factor must be at least 1.")]
	ZeroRetryFactor,
	/// API root is not an HTTP(S) base URL.
	#[error("API root must be an http(s) base URL: {url}.")]
	InvalidApiRoot {
		/// Offending URL.
		url: String,
	},
	/// Path could not be joined onto the API root.
	#[error("Request address `{address}` is invalid.")]
	InvalidAddress {
		/// Joined address that failed to parse.
		address: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token endpoint URL was rejected by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenUrl {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	RequestBody(#[from] serde_json::Error),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Cumulative-deadline failures; fatal to the logical request.
#[derive(Debug, ThisError)]
pub enum TimeoutError {
	/// Transport call did not finish before the cumulative deadline.
	#[error("Request to {address} timed out after {timeout}.")]
	Deadline {
		/// Target address of the logical request.
		address: String,
		/// Configured cumulative budget.
		timeout: Duration,
	},
	/// Upstream kept answering 429 until the cumulative deadline passed.
	#[error("Request to {address} is still rate-limited after the {timeout} timeout.")]
	RateLimited {
		/// Target address of the logical request.
		address: String,
		/// Configured cumulative budget.
		timeout: Duration,
	},
}
impl TimeoutError {
	/// Target address carried by the error.
	pub fn address(&self) -> &str {
		match self {
			Self::Deadline { address, .. } | Self::RateLimited { address, .. } => address,
		}
	}
}

/// Client-credentials grant failures.
#[derive(Debug, ThisError)]
pub enum GrantError {
	/// Token endpoint returned an OAuth error response.
	#[error("Token endpoint rejected the grant: {reason}.")]
	Rejected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Provider-supplied error code or description.
		reason: String,
	},
	/// Token endpoint responded with JSON that does not describe a token.
	#[error("Token endpoint returned malformed JSON.")]
	Malformed {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint answered in a way the OAuth client could not interpret.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Description reported by the OAuth client.
		message: String,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up on its own timer.
	#[error("HTTP client timed out while calling the API.")]
	TimedOut {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timed_out(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::TimedOut { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timed_out(e) } else { Self::network(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

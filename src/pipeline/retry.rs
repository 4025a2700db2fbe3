//! Pace-send-retry loop shared by API calls and the token grant.

// std
use std::sync::atomic::{AtomicU32, Ordering};
// crates.io
use backon::Retryable;
use oauth2::http::{HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts};
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, TimeoutError, TransportError},
	http::ApiTransport,
	limiter::RequestLimiter,
	oauth::oauth2::{HttpRequest, HttpResponse},
	obs::{self, RequestKind, RequestLog, RequestOutcome, RequestSpan},
	pipeline::{ApiRequest, AuthMode, TokenManager},
	response::ApiResponse,
};

/// Why a single attempt did not produce a final response.
#[derive(Debug)]
enum AttemptError {
	/// Upstream answered 429; eligible for another attempt after the cooldown.
	RateLimited,
	/// Anything else; ends the logical request.
	Fatal(Error),
}
impl AttemptError {
	fn is_rate_limited(&self) -> bool {
		matches!(self, Self::RateLimited)
	}
}

/// Start instant and budget of one logical request.
#[derive(Clone, Copy, Debug)]
struct Deadline {
	started: Instant,
	budget: Option<Duration>,
}
impl Deadline {
	fn start(budget: Option<Duration>) -> Self {
		Self { started: Instant::now(), budget }
	}

	fn remaining(&self) -> Option<std::time::Duration> {
		self.budget.map(|budget| budget.unsigned_abs().saturating_sub(self.started.elapsed()))
	}

	fn is_exceeded(&self) -> bool {
		self.budget.is_some_and(|budget| self.started.elapsed() > budget.unsigned_abs())
	}
}

/// Sends requests through the limiter and retries 429 responses under the cumulative deadline.
pub struct RetryingRequester<T>
where
	T: ?Sized + ApiTransport,
{
	transport: Arc<T>,
	limiter: RequestLimiter,
	tokens: TokenManager,
	config: ClientConfig,
	log: RequestLog,
}
impl<T> RetryingRequester<T>
where
	T: ?Sized + ApiTransport,
{
	/// Wires a requester over `transport` for `config`.
	pub fn new(config: ClientConfig, transport: Arc<T>) -> Result<Self> {
		let log = RequestLog::new(config.logging);
		let tokens = TokenManager::new(&config, log)?;

		Ok(Self {
			transport,
			limiter: RequestLimiter::new(config.max_requests_per_second),
			tokens,
			config,
			log,
		})
	}

	/// Configuration the requester was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Limiter pacing every outbound attempt.
	pub fn limiter(&self) -> &RequestLimiter {
		&self.limiter
	}

	/// Token manager backing bearer injection.
	pub fn tokens(&self) -> &TokenManager {
		&self.tokens
	}

	/// Executes one logical request and wraps the final response in an envelope.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.send_as(request, RequestKind::Api).await
	}

	pub(crate) async fn send_as(&self, request: ApiRequest, kind: RequestKind) -> Result<ApiResponse> {
		let address = self.config.resolve(&request.path)?;
		let span = RequestSpan::new(self.log, kind, request.method.as_str(), address.as_str());

		span.instrument(async move {
			let mut builder =
				oauth2::http::Request::builder().method(request.method).uri(address.as_str());

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}

			let mut http_request =
				builder.body(request.body.unwrap_or_default()).map_err(ConfigError::from)?;

			if request.auth == AuthMode::Bearer {
				let token = self.tokens.ensure_valid_token(self).await?;
				let mut value = HeaderValue::from_str(&token.bearer())
					.map_err(|e| ConfigError::from(oauth2::http::Error::from(e)))?;

				value.set_sensitive(true);
				http_request.headers_mut().insert(AUTHORIZATION, value);
			}

			let response = self.dispatch(http_request, kind).await?;

			Ok(ApiResponse::from_http(&response))
		})
		.await
	}

	/// Runs the pace-send-retry loop for a fully built request without touching the token.
	///
	/// Each attempt waits on the limiter, then sends. A 429 sleeps the next cooldown from
	/// [`RetryPolicy::backoff`](crate::config::RetryPolicy::backoff) and tries again; any other
	/// status is returned as-is. Once the configured
	/// timeout elapses the loop fails with [`TimeoutError::RateLimited`] if it was waiting out
	/// a 429, or [`TimeoutError::Deadline`] otherwise. Transport failures are never retried.
	pub async fn dispatch(&self, request: HttpRequest, kind: RequestKind) -> Result<HttpResponse> {
		let result = self.dispatch_inner(request, kind).await;

		match &result {
			Ok(_) => obs::record_request_outcome(kind, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(kind, RequestOutcome::Failure),
		}

		result
	}

	async fn dispatch_inner(&self, request: HttpRequest, kind: RequestKind) -> Result<HttpResponse> {
		let (parts, body) = request.into_parts();
		let address = parts.uri.to_string();
		let deadline = Deadline::start(self.config.timeout);
		let attempts = AtomicU32::new(0);
		let result = (|| async {
			let attempt = attempts.fetch_add(1, Ordering::Relaxed).saturating_add(1);

			self.attempt(&parts, &body, &address, kind, attempt, &deadline).await
		})
		.retry(self.config.retry.backoff())
		.sleep(tokio::time::sleep)
		.when(|e: &AttemptError| e.is_rate_limited() && !deadline.is_exceeded())
		.notify(|_, wait: std::time::Duration| {
			let wait = Duration::try_from(wait).unwrap_or(Duration::MAX);

			self.log.rate_limited(&address, attempts.load(Ordering::Relaxed), wait);
		})
		.await;

		match result {
			Ok(response) => Ok(response),
			Err(AttemptError::RateLimited) => Err(self.timeout_error(&address, true).into()),
			Err(AttemptError::Fatal(e)) => Err(e),
		}
	}

	/// One paced, deadline-bounded exchange; a 429 surfaces as [`AttemptError::RateLimited`].
	async fn attempt(
		&self,
		parts: &Parts,
		body: &[u8],
		address: &str,
		kind: RequestKind,
		attempt: u32,
		deadline: &Deadline,
	) -> Result<HttpResponse, AttemptError> {
		if let Some(wait) = self.limiter.limit().await {
			self.log.limiter_wait(wait);
		}

		let remaining = deadline.remaining();

		// Only 429s are retried, so a later attempt means the budget ran out while cooling down.
		if remaining.is_some_and(|remaining| remaining.is_zero()) {
			return Err(AttemptError::Fatal(self.timeout_error(address, attempt > 1).into()));
		}

		obs::record_request_outcome(kind, RequestOutcome::Attempt);
		self.log.outgoing(parts.method.as_str(), address, attempt);

		let exchange = self.transport.execute(rebuild(parts, body));
		let outcome = match remaining {
			Some(remaining) => match tokio::time::timeout(remaining, exchange).await {
				Ok(outcome) => outcome,
				Err(_) =>
					return Err(AttemptError::Fatal(self.timeout_error(address, false).into())),
			},
			None => exchange.await,
		};
		let response = match outcome {
			Ok(response) => response,
			Err(TransportError::TimedOut { source }) => {
				let e = match self.config.timeout {
					Some(timeout) =>
						TimeoutError::Deadline { address: address.to_owned(), timeout }.into(),
					None => TransportError::TimedOut { source }.into(),
				};

				return Err(AttemptError::Fatal(e));
			},
			Err(e) => return Err(AttemptError::Fatal(e.into())),
		};

		if response.status() == StatusCode::TOO_MANY_REQUESTS {
			obs::record_request_outcome(kind, RequestOutcome::RateLimited);

			return Err(AttemptError::RateLimited);
		}

		Ok(response)
	}

	fn timeout_error(&self, address: &str, rate_limited: bool) -> TimeoutError {
		let address = address.to_owned();
		let timeout = self.config.timeout.unwrap_or(Duration::ZERO);

		if rate_limited {
			TimeoutError::RateLimited { address, timeout }
		} else {
			TimeoutError::Deadline { address, timeout }
		}
	}
}
impl<T> Debug for RetryingRequester<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryingRequester")
			.field("config", &self.config)
			.field("limiter", &self.limiter)
			.field("tokens", &self.tokens)
			.finish()
	}
}

fn rebuild(parts: &Parts, body: &[u8]) -> HttpRequest {
	let mut request = HttpRequest::new(body.to_vec());

	*request.method_mut() = parts.method.clone();
	*request.uri_mut() = parts.uri.clone();
	*request.version_mut() = parts.version;
	*request.headers_mut() = parts.headers.clone();

	request
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, error::GrantError};

	fn timed_config(timeout: Duration) -> ClientConfig {
		let mut config = test_config();

		config.timeout = Some(timeout);

		config
	}

	#[tokio::test(start_paused = true)]
	async fn rate_limited_attempts_sleep_growing_cooldowns() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[
				ScriptedReply::token("tok", 7_200),
				ScriptedReply::rate_limited(),
				ScriptedReply::rate_limited(),
				ScriptedReply::json(200, serde_json::json!({ "login": "paced" })),
				ScriptedReply::rate_limited(),
				ScriptedReply::json(200, serde_json::json!({ "login": "again" })),
			],
		);
		let first = client.get("/v2/me").await.expect("Request should eventually succeed.");

		assert!(first.ok);
		assert_eq!(first.body, Some(serde_json::json!({ "login": "paced" })));

		let second = client.get("/v2/me").await.expect("Second request should succeed.");

		assert_eq!(second.body, Some(serde_json::json!({ "login": "again" })));

		let attempts = transport.requests_to("/v2/me");

		assert_eq!(attempts.len(), 5);
		assert_eq!(attempts[1].at - attempts[0].at, std::time::Duration::from_millis(1_500));
		assert_eq!(attempts[2].at - attempts[1].at, std::time::Duration::from_millis(3_000));
		// The next logical request starts over from the base cooldown.
		assert_eq!(attempts[4].at - attempts[3].at, std::time::Duration::from_millis(1_500));
		assert_eq!(transport.requests_to("/oauth/token").len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn persistent_rate_limit_fails_after_timeout() {
		let (client, transport) = build_scripted_client(
			timed_config(Duration::seconds(5)),
			[
				ScriptedReply::token("tok", 7_200),
				ScriptedReply::rate_limited(),
				ScriptedReply::rate_limited(),
				ScriptedReply::rate_limited(),
				ScriptedReply::rate_limited(),
			],
		);
		let err = client.get("/v2/me").await.expect_err("Request must time out.");

		match err {
			Error::Timeout(TimeoutError::RateLimited { address, timeout }) => {
				assert_eq!(address, "https://example.test/v2/me");
				assert_eq!(timeout, Duration::seconds(5));
			},
			other => panic!("Unexpected error: {other:?}"),
		}

		// Attempts at 0s, 1.5s and 4.5s; the cooldown after the third runs past the budget.
		assert_eq!(transport.requests_to("/v2/me").len(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn stalled_transport_hits_deadline() {
		let (client, _) = build_scripted_client(
			timed_config(Duration::seconds(2)),
			[ScriptedReply::token("tok", 7_200), ScriptedReply::Stall],
		);
		let err = client.get("/v2/slow").await.expect_err("Stalled request must time out.");

		assert!(matches!(
			err,
			Error::Timeout(TimeoutError::Deadline { ref address, .. }) if address == "https://example.test/v2/slow"
		));
	}

	#[tokio::test]
	async fn transport_failures_are_not_retried() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[ScriptedReply::token("tok", 7_200), ScriptedReply::Fail("connection reset".into())],
		);
		let err = client.get("/v2/me").await.expect_err("Transport failure must surface.");

		assert!(matches!(err, Error::Transport(TransportError::Io(_))));
		assert_eq!(transport.requests_to("/v2/me").len(), 1);
	}

	#[tokio::test]
	async fn non_success_statuses_are_returned_not_raised() {
		let (client, _) = build_scripted_client(
			test_config(),
			[
				ScriptedReply::token("tok", 7_200),
				ScriptedReply::json(404, serde_json::json!({})),
				ScriptedReply::raw(204, ""),
			],
		);
		let missing = client.get("/v2/users/0").await.expect("404 should resolve.");
		let deleted = client.delete("/v2/users/1").await.expect("204 should resolve.");

		assert!(!missing.ok);
		assert_eq!(missing.status, Some(404));
		assert!(deleted.ok);
		assert_eq!(deleted.status, Some(204));
		assert_eq!(deleted.body, None);
	}

	#[tokio::test(start_paused = true)]
	async fn token_grant_is_retried_through_the_same_loop() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[
				ScriptedReply::rate_limited(),
				ScriptedReply::token("tok", 7_200),
				ScriptedReply::json(200, serde_json::json!([])),
			],
		);
		let response = client.get("/v2/me").await.expect("Request should succeed.");
		let grants = transport.requests_to("/oauth/token");

		assert!(response.ok);
		assert_eq!(grants.len(), 2);
		assert_eq!(grants[1].at - grants[0].at, std::time::Duration::from_millis(1_500));
		assert_eq!(transport.requests_to("/v2/me")[0].authorization(), Some("Bearer tok"));
	}

	#[tokio::test]
	async fn grant_failure_aborts_the_protected_request() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[ScriptedReply::json(401, serde_json::json!({ "error": "invalid_client" }))],
		);
		let err = client.get("/v2/me").await.expect_err("Grant failure must surface.");

		assert!(matches!(err, Error::Grant(GrantError::Rejected { status: Some(401), .. })));
		assert!(transport.requests_to("/v2/me").is_empty());
	}
}

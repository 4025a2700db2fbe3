//! Cached client-credentials token with single-flight renewal.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::ClientConfig,
	http::ApiTransport,
	oauth::GrantFacade,
	obs::RequestLog,
	pipeline::RetryingRequester,
};

/// Holds the current access token and renews it when it is missing or within
/// [`AccessToken::REFRESH_MARGIN`] of expiry.
///
/// Concurrent callers that find the token stale wait on one in-flight grant instead of each
/// issuing their own.
pub struct TokenManager {
	grant: GrantFacade,
	current: Mutex<Option<AccessToken>>,
	renewal: AsyncMutex<()>,
	log: RequestLog,
}
impl TokenManager {
	pub(crate) fn new(config: &ClientConfig, log: RequestLog) -> Result<Self> {
		Ok(Self {
			grant: GrantFacade::from_config(config)?,
			current: Mutex::new(None),
			renewal: AsyncMutex::new(()),
			log,
		})
	}

	/// Snapshot of the cached token, usable or not.
	pub fn cached(&self) -> Option<AccessToken> {
		self.current.lock().clone()
	}

	/// Drops the cached token so the next protected request performs a fresh grant.
	pub fn invalidate(&self) {
		self.current.lock().take();
	}

	/// Returns a token that stays valid past the refresh margin, running the grant through
	/// `requester` when the cached one does not.
	///
	/// A failed grant leaves the cache untouched and is returned to the caller.
	pub async fn ensure_valid_token<T>(&self, requester: &RetryingRequester<T>) -> Result<AccessToken>
	where
		T: ?Sized + ApiTransport,
	{
		if let Some(token) = self.usable_at(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let _singleflight = self.renewal.lock().await;
		let now = OffsetDateTime::now_utc();

		// Another caller may have renewed while this one waited.
		if let Some(token) = self.usable_at(now) {
			return Ok(token);
		}

		self.log.token_renewal(self.current.lock().as_ref().map(|token| token.remaining_at(now)));

		let token = self.grant.exchange(requester).await?;

		*self.current.lock() = Some(token.clone());

		Ok(token)
	}

	fn usable_at(&self, now: OffsetDateTime) -> Option<AccessToken> {
		self.current.lock().as_ref().filter(|token| token.is_usable_at(now)).cloned()
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("grant", &self.grant)
			.field("current", &self.current.lock().as_ref())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, auth::Secret};

	fn seeded(client: &ScriptedClient, expires_in: Duration) {
		let token = AccessToken {
			access_token: Secret::new("seeded"),
			token_type: "bearer".into(),
			expires_in,
			scope: client.config().scopes.clone(),
			created_at: OffsetDateTime::now_utc(),
		};

		*client.token_manager().current.lock() = Some(token);
	}

	#[tokio::test]
	async fn fresh_token_skips_the_grant() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[ScriptedReply::json(200, serde_json::json!({ "id": 1 }))],
		);

		seeded(&client, Duration::minutes(10));

		let response = client.get("/v2/me").await.expect("Request should succeed.");
		let requests = transport.requests();

		assert!(response.ok);
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].authorization(), Some("Bearer seeded"));
	}

	#[tokio::test]
	async fn token_inside_refresh_margin_is_renewed_once() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[
				ScriptedReply::token("renewed", 7_200),
				ScriptedReply::json(200, serde_json::json!({ "id": 1 })),
				ScriptedReply::json(200, serde_json::json!({ "id": 2 })),
			],
		);

		seeded(&client, Duration::seconds(30));

		client.get("/v2/me").await.expect("First request should succeed.");
		client.get("/v2/me").await.expect("Second request should succeed.");

		let calls = transport.requests_to("/v2/me");

		assert_eq!(transport.requests_to("/oauth/token").len(), 1);
		assert_eq!(calls[0].authorization(), Some("Bearer renewed"));
		assert_eq!(calls[1].authorization(), Some("Bearer renewed"));
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_grant() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[
				ScriptedReply::token("shared", 7_200),
				ScriptedReply::json(200, serde_json::json!([])),
				ScriptedReply::json(200, serde_json::json!([])),
			],
		);
		let (first, second) = tokio::join!(client.get("/v2/a"), client.get("/v2/b"));

		first.expect("First request should succeed.");
		second.expect("Second request should succeed.");

		assert_eq!(transport.requests_to("/oauth/token").len(), 1);
	}

	#[tokio::test]
	async fn invalidate_forces_a_new_grant() {
		let (client, transport) = build_scripted_client(
			test_config(),
			[
				ScriptedReply::token("one", 7_200),
				ScriptedReply::json(200, serde_json::json!({})),
				ScriptedReply::token("two", 7_200),
				ScriptedReply::json(200, serde_json::json!({})),
			],
		);

		client.get("/v2/me").await.expect("First request should succeed.");
		client.invalidate_token();
		client.get("/v2/me").await.expect("Second request should succeed.");

		let calls = transport.requests_to("/v2/me");

		assert_eq!(transport.requests_to("/oauth/token").len(), 2);
		assert_eq!(calls[1].authorization(), Some("Bearer two"));
	}
}

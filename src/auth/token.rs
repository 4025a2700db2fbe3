//! Cached access token issued by the client-credentials grant.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, Secret},
};

/// Access token returned by the token endpoint.
///
/// Tokens are replaced wholesale on renewal and never persisted; `created_at` is the local
/// instant the grant response was received, so the expiry is `created_at + expires_in`.
#[derive(Clone)]
pub struct AccessToken {
	/// Bearer value; callers must avoid logging it.
	pub access_token: Secret,
	/// Token type reported by the endpoint (usually `bearer`).
	pub token_type: String,
	/// Lifetime granted by the endpoint.
	pub expires_in: Duration,
	/// Scopes granted by the endpoint.
	pub scope: ScopeSet,
	/// Local instant the token was received.
	pub created_at: OffsetDateTime,
}
impl AccessToken {
	/// Remaining validity below which a cached token is renewed before use.
	pub const REFRESH_MARGIN: Duration = Duration::seconds(60);

	/// Absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.created_at + self.expires_in
	}

	/// Validity left at `now`; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at() - now
	}

	/// Returns true when the token outlives `now` by more than [`Self::REFRESH_MARGIN`].
	pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at() > now + Self::REFRESH_MARGIN
	}

	/// Formats the `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.field("created_at", &self.created_at)
			.finish()
	}
}

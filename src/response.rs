//! Response envelope surfaced to callers once a logical request resolves.

// self
use crate::{_prelude::*, oauth::oauth2::HttpResponse};

/// Outcome of one logical request (after retries) or of a paginated fetch.
///
/// `ok` mirrors the HTTP success class of the final status. `body` holds the parsed JSON
/// payload; it is `None` both for empty payloads (e.g. `204 No Content`) and for payloads
/// that are not valid JSON, which additionally set `body_error`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApiResponse {
	/// Whether the final HTTP status indicates success.
	pub ok: bool,
	/// Final HTTP status, when one was received.
	pub status: Option<u16>,
	/// Parsed JSON body.
	pub body: Option<Value>,
	/// Parse failure description for a non-empty payload that was not JSON.
	pub body_error: Option<String>,
}
impl ApiResponse {
	/// Builds the envelope from a final (non-429) transport response.
	pub fn from_http(response: &HttpResponse) -> Self {
		let status = response.status();
		let ok = status.is_success();
		let payload = response.body();

		if payload.iter().all(u8::is_ascii_whitespace) {
			return Self { ok, status: Some(status.as_u16()), body: None, body_error: None };
		}

		match serde_json::from_slice::<Value>(payload) {
			Ok(Value::Null) =>
				Self { ok, status: Some(status.as_u16()), body: None, body_error: None },
			Ok(body) => Self { ok, status: Some(status.as_u16()), body: Some(body), body_error: None },
			Err(e) => Self {
				ok,
				status: Some(status.as_u16()),
				body: None,
				body_error: Some(e.to_string()),
			},
		}
	}

	/// Returns true when a non-empty payload failed to parse as JSON.
	pub fn is_malformed(&self) -> bool {
		self.body_error.is_some()
	}

	/// Returns true when the body is absent or an empty JSON array.
	pub fn is_empty_page(&self) -> bool {
		match &self.body {
			None => true,
			Some(Value::Array(items)) => items.is_empty(),
			Some(_) => false,
		}
	}

	/// Deserializes the body into `T`; `None` when there is no body.
	pub fn json<T>(&self) -> Option<serde_json::Result<T>>
	where
		T: serde::de::DeserializeOwned,
	{
		self.body.clone().map(serde_json::from_value)
	}
}

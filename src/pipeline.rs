//! Request pipeline: bearer injection, pacing, rate-limit retries, and pagination.
//!
//! A logical request flows through [`RetryingRequester::send`]: the [`TokenManager`] supplies
//! a bearer token (unless the request is [`AuthMode::Exempt`]), then
//! [`RetryingRequester::dispatch`] runs the pace-send-retry loop under the cumulative deadline.
//! The token grant enters directly at `dispatch`, so it is paced and retried like any other call
//! without re-entering the token manager.

pub mod pagination;
pub mod retry;
pub mod token;

pub use pagination::*;
pub use retry::*;
pub use token::*;

// crates.io
use oauth2::http::{
	HeaderMap, HeaderValue, Method,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{_prelude::*, error::ConfigError};

/// How a request authenticates against the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
	/// Attach `Authorization: Bearer <token>`, renewing the token first when needed.
	#[default]
	Bearer,
	/// Send without a bearer header.
	Exempt,
}

/// One logical API request, relative to the configured API root.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path (and optional query) appended to the API root.
	pub path: String,
	/// Extra headers sent with every attempt.
	pub headers: HeaderMap,
	/// Encoded request payload.
	pub body: Option<Vec<u8>>,
	/// Authentication mode.
	pub auth: AuthMode,
}
impl ApiRequest {
	/// Creates a bodyless request for `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		let mut headers = HeaderMap::new();

		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		Self { method, path: path.into(), headers, body: None, auth: AuthMode::Bearer }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Encodes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body)?);

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Merges `headers`, replacing existing values with the same name.
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		let mut last = None;

		for (name, value) in headers {
			let name = match name {
				Some(name) => {
					self.headers.remove(&name);
					last = Some(name.clone());

					name
				},
				None => match &last {
					Some(name) => name.clone(),
					None => continue,
				},
			};

			self.headers.append(name, value);
		}

		self
	}

	/// Overrides the authentication mode.
	pub fn with_auth(mut self, auth: AuthMode) -> Self {
		self.auth = auth;

		self
	}
}

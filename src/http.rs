//! Transport seam for outbound API calls.
//!
//! The pipeline depends on HTTP only through [`ApiTransport`]: one request in, one response
//! (or [`TransportError`]) out. Requests and responses are the `http` crate types the
//! `oauth2` crate re-exports, so the same transport serves both API calls and the token grant.

// std
use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	error::TransportError,
	oauth::oauth2::{HttpRequest, HttpResponse},
};

/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Executes a single HTTP exchange.
///
/// Implementations perform exactly one attempt; pacing, retries, and deadlines live in the
/// pipeline. They must be `Send + Sync + 'static` so a client can be shared behind `Arc`.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with the full response body.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request: reqwest::Request = request.try_into()?;
			let response = self.0.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

//! Rate-paced REST client for OAuth 2.0 client-credentials APIs: per-second request pacing,
//! 429-aware backoff under a cumulative deadline, and page-number pagination in one crate.
//!
//! Every outbound call, including the token grant itself, leaves through the same pipeline:
//! bearer injection (skipped for the grant), the [`limiter::RequestLimiter`], the transport,
//! and the rate-limit retry loop in [`pipeline::RetryingRequester`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod limiter;
pub mod oauth;
pub mod obs;
pub mod pipeline;
pub mod response;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and a scripted transport for tests; enabled via `cfg(test)` or
	//! the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use oauth2::http::{HeaderMap, Method, StatusCode};
	use tokio::time::Instant;
	// self
	use crate::{
		client::ApiClient,
		config::{ClientConfig, RetryPolicy},
		error::TransportError,
		http::{ApiTransport, TransportFuture},
		oauth::oauth2::{HttpRequest, HttpResponse},
	};

	/// Client type alias used by scripted-transport tests.
	pub type ScriptedClient = ApiClient<ScriptedTransport>;

	/// Reply queued on a [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub enum ScriptedReply {
		/// Responds with the given status and raw body.
		Respond {
			/// HTTP status code.
			status: u16,
			/// Raw response payload.
			body: Vec<u8>,
		},
		/// Never resolves; exercises the cumulative deadline.
		Stall,
		/// Fails with an I/O transport error.
		Fail(String),
	}
	impl ScriptedReply {
		/// JSON reply with the provided status.
		pub fn json(status: u16, body: serde_json::Value) -> Self {
			Self::Respond { status, body: body.to_string().into_bytes() }
		}

		/// Raw reply with the provided status.
		pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
			Self::Respond { status, body: body.into() }
		}

		/// Empty 429 reply.
		pub fn rate_limited() -> Self {
			Self::Respond { status: 429, body: Vec::new() }
		}

		/// Successful token grant reply.
		pub fn token(access_token: &str, expires_in: i64) -> Self {
			Self::json(
				200,
				serde_json::json!({
					"access_token": access_token,
					"token_type": "bearer",
					"expires_in": expires_in,
					"scope": "public projects",
					"created_at": 1_700_000_000,
				}),
			)
		}
	}

	/// Request captured by a [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: Method,
		/// Absolute request URI.
		pub uri: String,
		/// Request headers.
		pub headers: HeaderMap,
		/// Raw request body.
		pub body: Vec<u8>,
		/// Tokio instant the transport observed the request at.
		pub at: Instant,
	}
	impl RecordedRequest {
		/// Returns the `Authorization` header value, if any.
		pub fn authorization(&self) -> Option<&str> {
			self.headers.get("authorization").and_then(|value| value.to_str().ok())
		}

		/// Returns the body decoded as UTF-8.
		pub fn body_text(&self) -> String {
			String::from_utf8_lossy(&self.body).into_owned()
		}
	}

	/// In-memory transport that replays queued replies in order and records every request.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		replies: Mutex<VecDeque<ScriptedReply>>,
		requests: Mutex<Vec<RecordedRequest>>,
	}
	impl ScriptedTransport {
		/// Creates a transport that will answer with `replies` in order.
		pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
			Self { replies: Mutex::new(replies.into_iter().collect()), requests: Default::default() }
		}

		/// Queues another reply.
		pub fn push(&self, reply: ScriptedReply) {
			self.replies.lock().push_back(reply);
		}

		/// Snapshot of the recorded requests.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}

		/// Recorded requests whose URI contains `needle`.
		pub fn requests_to(&self, needle: &str) -> Vec<RecordedRequest> {
			self.requests.lock().iter().filter(|request| request.uri.contains(needle)).cloned().collect()
		}
	}
	impl ApiTransport for ScriptedTransport {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				self.requests.lock().push(RecordedRequest {
					method: request.method().clone(),
					uri: request.uri().to_string(),
					headers: request.headers().clone(),
					body: request.body().clone(),
					at: Instant::now(),
				});

				let reply = self.replies.lock().pop_front();

				match reply {
					Some(ScriptedReply::Respond { status, body }) => {
						let mut response = HttpResponse::new(body);

						*response.status_mut() =
							StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

						Ok(response)
					},
					Some(ScriptedReply::Stall) => std::future::pending().await,
					Some(ScriptedReply::Fail(message)) =>
						Err(TransportError::Io(std::io::Error::other(message))),
					None => Err(TransportError::Io(std::io::Error::other(
						"Scripted transport has no replies left.",
					))),
				}
			})
		}
	}

	/// Builds a config pointed at `https://example.test` with a fast retry policy.
	pub fn test_config() -> ClientConfig {
		ClientConfig::builder("test-uid", "test-secret")
			.api_root(Url::parse("https://example.test").expect("Test API root should parse."))
			.max_requests_per_second(1_000.)
			.retry(RetryPolicy::new(Duration::milliseconds(1_500), 2))
			.build()
			.expect("Test config should be valid.")
	}

	/// Builds a scripted client from `config` answering with `replies`.
	pub fn build_scripted_client(
		config: ClientConfig,
		replies: impl IntoIterator<Item = ScriptedReply>,
	) -> (ScriptedClient, Arc<ScriptedTransport>) {
		let transport = Arc::new(ScriptedTransport::new(replies));
		let client = ApiClient::with_transport(config, transport.clone())
			.expect("Scripted client should build.");

		(client, transport)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::Serialize;
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

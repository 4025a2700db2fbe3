//! Public client facade.

// crates.io
use oauth2::http::{HeaderMap, Method};
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	http::ApiTransport,
	limiter::RequestLimiter,
	pipeline::{ApiRequest, PaginatedFetcher, RetryingRequester, TokenManager},
	response::ApiResponse,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Rate-paced, token-managing client for one API root and one set of credentials.
///
/// Every call resolves its path against [`ClientConfig::api_root`], attaches a bearer token
/// (renewing it first when it is missing or about to expire), waits on the shared request
/// limiter, and retries 429 responses with a growing cooldown until the configured timeout.
/// Non-success statuses are returned in the [`ApiResponse`] envelope rather than as errors.
///
/// Cloning is cheap; clones share the limiter, the cached token, and the transport.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	requester: Arc<RetryingRequester<T>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that sends through the caller-provided transport.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<T>>) -> Result<Self> {
		Ok(Self { requester: Arc::new(RetryingRequester::new(config, transport.into())?) })
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		self.requester.config()
	}

	/// Shared request limiter.
	pub fn limiter(&self) -> &RequestLimiter {
		self.requester.limiter()
	}

	/// Token manager backing bearer injection.
	pub fn token_manager(&self) -> &TokenManager {
		self.requester.tokens()
	}

	/// Underlying pipeline, for callers composing custom [`ApiRequest`]s.
	pub fn requester(&self) -> &RetryingRequester<T> {
		&self.requester
	}

	/// Drops the cached token; the next call performs a fresh grant.
	pub fn invalidate_token(&self) {
		self.requester.tokens().invalidate();
	}

	/// `GET path`.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.requester.send(ApiRequest::get(path)).await
	}

	/// `POST path` with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.requester.send(ApiRequest::new(Method::POST, path).json(body)?).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.requester.send(ApiRequest::new(Method::PUT, path).json(body)?).await
	}

	/// `PATCH path` with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.requester.send(ApiRequest::new(Method::PATCH, path).json(body)?).await
	}

	/// `DELETE path`.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.requester.send(ApiRequest::new(Method::DELETE, path)).await
	}

	/// Sends an arbitrary method with extra headers and an optional JSON body.
	pub async fn send(
		&self,
		method: Method,
		path: &str,
		headers: HeaderMap,
		body: Option<&Value>,
	) -> Result<ApiResponse> {
		let mut request = ApiRequest::new(method, path).headers(headers);

		if let Some(body) = body {
			request = request.json(body)?;
		}

		self.requester.send(request).await
	}

	/// Fetches and concatenates every page of `path`.
	pub async fn get_paged(&self, path: &str) -> Result<ApiResponse> {
		self.get_paged_with(path, |_| {}).await
	}

	/// Fetches every page of `path`, invoking `on_page` for each non-empty page in order.
	pub async fn get_paged_with<F>(&self, path: &str, on_page: F) -> Result<ApiResponse>
	where
		F: FnMut(&ApiResponse),
	{
		PaginatedFetcher::new(&self.requester).get_all_pages(path, on_page).await
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client backed by a default reqwest transport.
	///
	/// When the config carries a timeout the same value bounds each reqwest exchange, on top
	/// of the cumulative deadline the pipeline enforces.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout.unsigned_abs());
		}

		let client = builder.build().map_err(crate::error::ConfigError::from)?;

		Self::with_transport(config, ReqwestHttpClient::with_client(client))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self { requester: self.requester.clone() }
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient").field("requester", &self.requester).finish()
	}
}

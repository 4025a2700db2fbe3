//! Client-credentials grant built on the `oauth2` crate.
//!
//! The `oauth2` crate assembles the form body and parses the token response, but the HTTP
//! exchange itself is handed to [`RetryingRequester::dispatch`], so the grant is paced by the
//! same limiter and retried on 429 under the same cumulative deadline as every other call.
//! The grant authenticates through its form body (`client_id`/`client_secret`), never through a
//! bearer header, and never triggers a token refresh of its own.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpRequest,
	HttpResponse, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, Secret},
	config::ClientConfig,
	error::{ConfigError, GrantError},
	http::ApiTransport,
	obs::RequestKind,
	pipeline::RetryingRequester,
};

type GrantClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Pre-configured client-credentials exchange for one set of credentials.
pub(crate) struct GrantFacade {
	oauth_client: GrantClient,
	scopes: ScopeSet,
}
impl GrantFacade {
	pub(crate) fn from_config(config: &ClientConfig) -> Result<Self> {
		let token_url = TokenUrl::new(config.token_url()?.to_string())
			.map_err(|source| ConfigError::InvalidTokenUrl { source })?;
		let oauth_client = BasicClient::new(ClientId::new(config.client_uid.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);

		Ok(Self { oauth_client, scopes: config.scopes.clone() })
	}

	/// Runs the grant through `requester`'s dispatch path and maps the response.
	pub(crate) async fn exchange<T>(&self, requester: &RetryingRequester<T>) -> Result<AccessToken>
	where
		T: ?Sized + ApiTransport,
	{
		let handle = PipelineHandle::new(requester);
		let scopes = self.scopes.joined(',');
		let mut request = self.oauth_client.exchange_client_credentials();

		if !scopes.is_empty() {
			request = request.add_extra_param("scopes", scopes);
		}

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(err, handle.last_status()))?;

		map_token_response(&self.scopes, response)
	}
}
impl Debug for GrantFacade {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GrantFacade")
			.field("token_url", &self.oauth_client.token_uri().as_str())
			.field("scopes", &self.scopes)
			.finish()
	}
}

/// [`AsyncHttpClient`] adapter that routes `oauth2` exchanges through the pipeline and
/// remembers the final status for error reporting.
struct PipelineHandle<'r, T>
where
	T: ?Sized + ApiTransport,
{
	requester: &'r RetryingRequester<T>,
	last_status: Mutex<Option<u16>>,
}
impl<'r, T> PipelineHandle<'r, T>
where
	T: ?Sized + ApiTransport,
{
	fn new(requester: &'r RetryingRequester<T>) -> Self {
		Self { requester, last_status: Mutex::new(None) }
	}

	fn last_status(&self) -> Option<u16> {
		*self.last_status.lock()
	}
}
impl<'c, 'r, T> AsyncHttpClient<'c> for PipelineHandle<'r, T>
where
	'r: 'c,
	T: ?Sized + ApiTransport,
{
	type Error = Error;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			*self.last_status.lock() = None;

			let response = self.requester.dispatch(request, RequestKind::Token).await?;

			*self.last_status.lock() = Some(response.status().as_u16());

			Ok(response)
		})
	}
}

fn map_token_response(requested: &ScopeSet, response: BasicTokenResponse) -> Result<AccessToken> {
	let expires_in = response.expires_in().ok_or(GrantError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| GrantError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(GrantError::NonPositiveExpiresIn.into());
	}

	let scope = match response.scopes() {
		Some(scopes) => ScopeSet::new(scopes.iter().map(|scope| (**scope).clone()))
			.map_err(ConfigError::from)?,
		None => requested.clone(),
	};

	Ok(AccessToken {
		access_token: Secret::new(response.access_token().secret().to_owned()),
		token_type: response.token_type().as_ref().to_owned(),
		expires_in: Duration::seconds(expires_in),
		scope,
		created_at: OffsetDateTime::now_utc(),
	})
}

fn map_request_error(err: BasicRequestTokenError<Error>, status: Option<u16>) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => {
			let code = response.error().as_ref().to_owned();
			let reason = match response.error_description() {
				Some(description) => format!("{code}: {description}"),
				None => code,
			};

			GrantError::Rejected { status, reason }.into()
		},
		RequestTokenError::Request(error) => error,
		RequestTokenError::Parse(source, _body) => GrantError::Malformed { status, source }.into(),
		RequestTokenError::Other(message) => GrantError::Unexpected { message }.into(),
	}
}

#![cfg(feature = "reqwest")]

// std
use std::net::TcpListener;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use paced_api::{
	client::ReqwestApiClient,
	config::{ClientConfig, RetryPolicy},
	error::{Error, TimeoutError},
	url::Url,
};

fn build_client(root: &str, timeout: Duration) -> ReqwestApiClient {
	let config = ClientConfig::builder("uid-retry", "secret-retry")
		.api_root(Url::parse(root).expect("API root should parse."))
		.max_requests_per_second(1_000.)
		.timeout(timeout)
		.retry(RetryPolicy::new(Duration::milliseconds(100), 2))
		.build()
		.expect("Client config should build.");

	ReqwestApiClient::new(config).expect("Reqwest client should build.")
}

#[tokio::test]
async fn persistent_rate_limit_surfaces_timeout() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"retry-token\",\"token_type\":\"bearer\",\"expires_in\":7200}",
			);
		})
		.await;
	let limited = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/me");
			then.status(429);
		})
		.await;
	let client = build_client(&server.base_url(), Duration::seconds(1));
	let err = client.get("/v2/me").await.expect_err("Endless 429 must time out.");

	match err {
		Error::Timeout(TimeoutError::RateLimited { address, timeout }) => {
			assert_eq!(address, server.url("/v2/me"));
			assert_eq!(timeout, Duration::seconds(1));
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	// Cooldowns of 100, 200, and 400 ms fit inside the budget; the 800 ms one does not.
	limited.assert_calls_async(4).await;
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
	let listener = TcpListener::bind("127.0.0.1:0").expect("Ephemeral port should bind.");
	let address = listener.local_addr().expect("Listener should expose its address.");
	let root = format!("http://{address}");

	drop(listener);

	let client = build_client(&root, Duration::seconds(5));
	let err = client.get("/v2/me").await.expect_err("Closed port must fail.");

	assert!(matches!(err, Error::Transport(_)), "Unexpected error: {err:?}");
}

#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use paced_api::{
	client::ReqwestApiClient,
	config::ClientConfig,
	error::{Error, GrantError},
	url::Url,
};

const CLIENT_UID: &str = "uid-it";
const CLIENT_SECRET: &str = "secret-it";

fn build_client(server: &MockServer) -> ReqwestApiClient {
	let config = ClientConfig::builder(CLIENT_UID, CLIENT_SECRET)
		.api_root(Url::parse(&server.base_url()).expect("Mock server URL should parse."))
		.max_requests_per_second(1_000.)
		.build()
		.expect("Client config should build.");

	ReqwestApiClient::new(config).expect("Reqwest client should build.")
}

#[tokio::test]
async fn token_is_granted_once_and_reused_as_bearer() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=client_credentials")
				.body_includes("client_id=uid-it")
				.body_includes("client_secret=secret-it")
				.body_includes("scopes=public%2Cprojects");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"it-token\",\"token_type\":\"bearer\",\"expires_in\":7200,\"scope\":\"public projects\",\"created_at\":1700000000}",
			);
		})
		.await;
	let me_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/me").header("authorization", "Bearer it-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"login\":\"paced\"}");
		})
		.await;
	let client = build_client(&server);
	let first = client.get("/v2/me").await.expect("First call should resolve.");
	let second = client.get("/v2/me").await.expect("Second call should resolve.");

	assert!(first.ok);
	assert_eq!(first.body, Some(serde_json::json!({ "login": "paced" })));
	assert_eq!(second.status, Some(200));

	token_mock.assert_calls_async(1).await;
	me_mock.assert_calls_async(2).await;

	let token = client.token_manager().cached().expect("Token should be cached.");

	assert_eq!(token.access_token.expose(), "it-token");
	assert!(token.scope.contains("projects"));
}

#[tokio::test]
async fn rejected_grant_aborts_the_request() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"Client authentication failed due to unknown client.\"}",
			);
		})
		.await;
	let me_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/me");
			then.status(200);
		})
		.await;
	let client = build_client(&server);
	let err = client.get("/v2/me").await.expect_err("Rejected grant must fail the call.");

	assert!(matches!(err, Error::Grant(GrantError::Rejected { status: Some(401), .. })));

	token_mock.assert_calls_async(1).await;
	me_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn non_json_and_empty_bodies_resolve_without_body() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"it-token\",\"token_type\":\"bearer\",\"expires_in\":7200}",
			);
		})
		.await;
	let _delete_mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/v2/teams/1");
			then.status(204);
		})
		.await;
	let _html_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/status");
			then.status(502).header("content-type", "text/html").body("<html>Bad gateway</html>");
		})
		.await;
	let client = build_client(&server);
	let deleted = client.delete("/v2/teams/1").await.expect("DELETE should resolve.");
	let gateway = client.get("/v2/status").await.expect("Failed status should resolve.");

	assert!(deleted.ok);
	assert_eq!(deleted.status, Some(204));
	assert_eq!(deleted.body, None);
	assert!(!gateway.ok);
	assert_eq!(gateway.status, Some(502));
	assert_eq!(gateway.body, None);
	assert!(gateway.is_malformed());
}

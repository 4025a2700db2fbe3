//! Demonstrates a paced client against a mock API: one token grant, bearer reuse, and a
//! paginated walk that stops at the first empty page.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::Duration;
// self
use paced_api::{client::ReqwestApiClient, config::ClientConfig, url::Url};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":7200,\"scope\":\"public projects\"}",
			);
		})
		.await;

	for (number, body) in [(1, "[{\"login\":\"alice\"},{\"login\":\"bob\"}]"), (2, "[]")] {
		server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/v2/campus/1/users")
					.query_param("page[number]", number.to_string())
					.header("authorization", "Bearer demo-access");
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await;
	}

	let config = ClientConfig::builder("demo-uid", "demo-secret")
		.api_root(Url::parse(&server.base_url())?)
		.max_requests_per_second(2.)
		.timeout(Duration::seconds(30))
		.logging(true)
		.build()?;
	let client = ReqwestApiClient::new(config)?;
	let users = client
		.get_paged_with("/v2/campus/1/users", |page| {
			println!("Fetched page with status {:?}.", page.status);
		})
		.await?;

	println!("Collected users: {}.", users.body.unwrap_or_default());

	token_mock.assert_async().await;

	Ok(())
}

//! Page-number pagination over collection endpoints.
//!
//! Pages are requested as `page[number]=1, 2, ...` and concatenated until a page comes back
//! empty. A page that fails ends the walk early; the items gathered so far are still returned,
//! flagged with `ok: false` and the failing status.

// self
use crate::{
	_prelude::*,
	http::ApiTransport,
	obs::{RequestKind, RequestLog},
	pipeline::{ApiRequest, RetryingRequester},
	response::ApiResponse,
};

/// Query parameter carrying the 1-based page number.
pub const PAGE_PARAM: &str = "page[number]";

/// Walks a paginated collection through a [`RetryingRequester`].
pub struct PaginatedFetcher<'r, T>
where
	T: ?Sized + ApiTransport,
{
	requester: &'r RetryingRequester<T>,
	log: RequestLog,
}
impl<'r, T> PaginatedFetcher<'r, T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a fetcher bound to `requester`.
	pub fn new(requester: &'r RetryingRequester<T>) -> Self {
		Self { requester, log: RequestLog::new(requester.config().logging) }
	}

	/// Fetches every page of `path` (which may already carry a query string).
	///
	/// `on_page` observes each non-empty page before its items are appended. The returned
	/// envelope's body is always a JSON array of the accumulated items. Errors raised by the
	/// pipeline (timeouts, transport, grant) abort the walk and discard partial results.
	pub async fn get_all_pages<F>(&self, path: &str, mut on_page: F) -> Result<ApiResponse>
	where
		F: FnMut(&ApiResponse),
	{
		let mut items = Vec::new();
		let mut page = 1_u64;

		loop {
			let response = self
				.requester
				.send_as(ApiRequest::get(with_page_param(path, page)), RequestKind::Page)
				.await?;

			if !response.ok || response.is_malformed() {
				return Ok(ApiResponse {
					ok: false,
					status: response.status,
					body: Some(Value::Array(items)),
					body_error: response.body_error,
				});
			}
			if response.is_empty_page() {
				return Ok(ApiResponse {
					ok: true,
					status: response.status,
					body: Some(Value::Array(items)),
					body_error: None,
				});
			}

			on_page(&response);

			let added = append_page(&mut items, response.body);

			self.log.page(path, page, added);

			page = page.saturating_add(1);
		}
	}
}

/// Appends `page` to `path`, respecting an existing query string.
pub fn with_page_param(path: &str, page: u64) -> String {
	let separator = if path.contains('?') { '&' } else { '?' };

	format!("{path}{separator}{PAGE_PARAM}={page}")
}

fn append_page(items: &mut Vec<Value>, body: Option<Value>) -> usize {
	match body {
		Some(Value::Array(page)) => {
			let added = page.len();

			items.extend(page);

			added
		},
		Some(item) => {
			items.push(item);

			1
		},
		None => 0,
	}
}

use super::types::FetchOptions;
use crate::error::{Result, SubcountError};
use reqwest::blocking::Client;
use reqwest::redirect;

const REDIRECT_LIMIT: usize = 10;

/// Build a cookie-persisting blocking client for one `fetch` call.
///
/// The warm-up and every data attempt share this client so session cookies carry over.
pub(crate) fn build_client(options: &FetchOptions) -> Result<Client> {
    let builder = Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
        .gzip(true)
        .brotli(true)
        .deflate(true);

    let builder = match options.request_timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };

    builder
        .build()
        .map_err(|e| SubcountError::Client(format!("failed to build client: {}", e)))
}

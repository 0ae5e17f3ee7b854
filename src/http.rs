//! Shared construction of outbound HTTP clients.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};

/// Maximum redirect hops followed for downloads and searches.
const MAX_REDIRECTS: usize = 10;

/// Build a client with compression, a cookie jar, redirect following and an
/// optional proxy applied to every scheme (`socks5h://` included).
pub fn build_client(
    timeout: Duration,
    user_agent: Option<&str>,
    proxy: Option<&str>,
) -> reqwest::Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .cookie_store(true)
        .redirect(Policy::limited(MAX_REDIRECTS));

    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

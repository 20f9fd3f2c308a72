use super::profile::FetchPolicy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};

const PLAIN_USER_AGENT: &str = "member_counter/1.0";

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Headers for the about.json request.
///
/// `referer` is the community's own page; plain requests don't send it.
pub(crate) fn data_headers(policy: FetchPolicy, referer: &str) -> HeaderMap {
    match policy {
        FetchPolicy::Plain => {
            let mut headers = HeaderMap::new();
            headers.insert(USER_AGENT, HeaderValue::from_static(PLAIN_USER_AGENT));
            headers
        }
        FetchPolicy::Hardened => {
            let mut headers = header_map(&[
                ("Accept", "application/json, text/plain, */*"),
                ("Accept-Language", "en-US,en;q=0.9"),
                ("Accept-Encoding", "gzip, deflate, br"),
                ("DNT", "1"),
                ("Connection", "keep-alive"),
                ("Sec-Fetch-Dest", "empty"),
                ("Sec-Fetch-Mode", "cors"),
                ("Sec-Fetch-Site", "same-origin"),
            ]);
            headers.insert(USER_AGENT, HeaderValue::from_static(CHROME_USER_AGENT));
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, value);
            }
            headers
        }
    }
}

/// Headers for the warm-up page visit (a top-level navigation).
pub(crate) fn warmup_headers() -> HeaderMap {
    let mut headers = header_map(&[
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("DNT", "1"),
        ("Connection", "keep-alive"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
    ]);
    headers.insert(USER_AGENT, HeaderValue::from_static(CHROME_USER_AGENT));
    headers
}

fn header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(k, v) in pairs {
        // Static tables: names and values are known-valid
        if let Ok(name) = HeaderName::from_bytes(k.to_ascii_lowercase().as_bytes()) {
            headers.insert(name, HeaderValue::from_static(v));
        }
    }
    headers
}

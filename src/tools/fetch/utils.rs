use crate::error::{Result, SubcountError};
use reqwest::StatusCode;

/// Short reason attached to a non-success status.
///
/// 429 and 403 are told apart so the activity log shows rate limiting vs. blocking.
pub(super) fn status_reason(status: StatusCode) -> &'static str {
    match status.as_u16() {
        429 => "rate limited",
        403 => "forbidden",
        404 => "not found",
        401 => "unauthorized",
        400 => "bad request",
        500..=599 => "server error",
        300..=399 => "unexpected redirect",
        _ => "unknown error",
    }
}

/// Ok for 2xx, `HttpStatus` otherwise.
pub(super) fn check_status(url: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(SubcountError::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
        reason: status_reason(status),
    })
}

//! HTTP status → neutral error mapping (§4.1.4), shared by every adapter.

use std::io;
use std::time::Duration;

use relay_types::ProviderError;

/// Map an HTTP status and response body to a [`ProviderError`].
///
/// `body` is inspected only for the 400 family, to distinguish
/// token-limit and content-filter errors from generic bad requests.
/// `retry_after_header` is the raw `Retry-After` response header value, if
/// any; it takes precedence over body text for 429s, per §4.1.4.
#[must_use]
pub fn map_http_status(status: u16, body: &str, retry_after_header: Option<&str>) -> ProviderError {
    let lower = body.to_lowercase();
    match status {
        401 => ProviderError::Authentication(body.to_string()),
        403 => ProviderError::Authorization(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        429 => ProviderError::RateLimit {
            retry_after: parse_retry_after_header(retry_after_header).or_else(|| parse_retry_after_seconds(body)),
        },
        400 if lower.contains("token") && lower.contains("limit") => {
            ProviderError::TokenLimitExceeded(body.to_string())
        }
        400 if lower.contains("safety") || lower.contains("filter") => {
            ProviderError::ContentFiltered(body.to_string())
        }
        400 => ProviderError::InvalidRequest(body.to_string()),
        500..=599 => ProviderError::ServiceUnavailable(body.to_string()),
        _ => ProviderError::Other(Box::new(io::Error::other(format!("HTTP {status}: {body}")))),
    }
}

/// Parse a `Retry-After` header value as whole seconds (the only form
/// §4.1.4 requires us to honor; HTTP-date `Retry-After` values are left
/// for `body`-based best-effort parsing).
fn parse_retry_after_header(header: Option<&str>) -> Option<Duration> {
    header.and_then(|value| value.trim().parse::<u64>().ok()).map(Duration::from_secs)
}

/// Map a [`reqwest::Error`] (connection failure, timeout, decode failure)
/// to a [`ProviderError`].
#[must_use]
pub fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(Duration::from_secs(60))
    } else {
        ProviderError::Network(Box::new(err))
    }
}

/// Best-effort extraction of a retry delay, from either a numeric
/// `Retry-After` header value or a "retry after N seconds"-shaped body.
fn parse_retry_after_seconds(body: &str) -> Option<Duration> {
    let lower = body.to_lowercase();
    let idx = lower.find("retry after ")?;
    let digits: String = lower[idx + "retry after ".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<u64>().ok().map(Duration::from_secs)
}

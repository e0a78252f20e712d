//! Shared HTTP status mapping for both vendor clients.

use reqwest::Response;

use crate::error::PlatformError;

/// Maps a vendor response's status code onto the adapter error taxonomy.
///
/// 401/403 become [`PlatformError::Auth`], 404 [`PlatformError::NotFound`],
/// 429 [`PlatformError::RateLimited`] (honoring `Retry-After` when present).
/// Other non-2xx statuses fall through to `error_for_status` so 5xx stays a
/// retriable [`PlatformError::Http`].
///
/// # Errors
///
/// Returns the mapped error for any non-2xx status.
pub(crate) fn check_status(response: Response, resource: &str) -> Result<Response, PlatformError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(PlatformError::Auth(format!(
            "{resource}: HTTP {status}"
        )));
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(PlatformError::NotFound {
            resource: resource.to_owned(),
        });
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(PlatformError::RateLimited { retry_after_secs });
    }
    Ok(response.error_for_status()?)
}

/// Parses a response body as JSON into `T`, attaching `context` on failure.
pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, PlatformError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| PlatformError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

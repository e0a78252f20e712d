use thiserror::Error;

/// Errors returned by the platform API adapters.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Credentials rejected (HTTP 401/403) or missing. Fatal for this
    /// platform's fetch; the pipeline records it and continues with the
    /// other platform.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 from the vendor; retried after back-off.
    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// A channel, user, or video no longer exists. Absorbed at the adapter;
    /// the missing entry is skipped, never fatal.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

//! Platform adapters for the video statistics pipeline.
//!
//! One adapter per vendor (YouTube Data API, Vimeo API). Each adapter fetches
//! raw vendor payloads over HTTP, applies a fixed metric-name translation
//! table, and emits normalized [`VideoStatRecord`]s — vendor schemas never
//! cross this crate's boundary.

use std::future::Future;
use std::pin::Pin;

use vidstats_core::{DateRange, Platform, VideoStatRecord};

mod error;
mod http;
mod retry;
pub mod vimeo;
pub mod youtube;

pub use error::PlatformError;
pub use vimeo::VimeoClient;
pub use youtube::YoutubeClient;

/// A platform's statistics-fetching capability.
///
/// `fetch_stats` returns one record per (video, day) pair observed within the
/// range. The result is finite and not restartable: calling it again re-issues
/// network calls. Retries with back-off happen inside the adapter; an `Err`
/// here means retries are exhausted or the failure is not retriable.
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    fn fetch_stats<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VideoStatRecord>, PlatformError>> + Send + 'a>>;
}

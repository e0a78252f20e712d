//! Run command: builds adapters and sinks from config and drives one
//! pipeline execution.
//!
//! Two modes: `--process` fetches fresh data from every configured platform
//! and publishes it; without it, records are read from the intermediate CSV
//! file and published to Postgres only.

use std::path::Path;

use vidstats_core::{AppConfig, DateRange, Platform, PublishPolicy, RunSummary, SinkReport};
use vidstats_db::PoolConfig;
use vidstats_pipeline::{publish, CsvSink, Orchestrator, PgSink, StatSink};
use vidstats_platforms::{PlatformAdapter, VimeoClient, YoutubeClient};

pub(crate) async fn execute(
    config: &AppConfig,
    range: &DateRange,
    policy: PublishPolicy,
    process: bool,
    csv_path: &Path,
) -> anyhow::Result<RunSummary> {
    let pool = match &config.database_url {
        Some(url) => {
            let pool = vidstats_db::connect_pool(url, PoolConfig::from_app_config(config)).await?;
            vidstats_db::run_migrations(&pool).await?;
            Some(pool)
        }
        None => None,
    };

    if process {
        run_full_pipeline(config, range, policy, pool, csv_path).await
    } else {
        publish_from_file(range, policy, pool, csv_path).await
    }
}

async fn run_full_pipeline(
    config: &AppConfig,
    range: &DateRange,
    policy: PublishPolicy,
    pool: Option<sqlx::PgPool>,
    csv_path: &Path,
) -> anyhow::Result<RunSummary> {
    let mut orchestrator = Orchestrator::new();
    for adapter in build_adapters(config)? {
        orchestrator = orchestrator.with_adapter(adapter);
    }
    orchestrator = orchestrator.with_sink(Box::new(CsvSink::new(csv_path)));
    if let Some(pool) = pool {
        orchestrator = orchestrator
            .with_sink(Box::new(PgSink::new(pool.clone())))
            .with_run_bookkeeping(pool);
    }

    Ok(orchestrator.run(range, policy, "cli").await)
}

/// Publishes records already sitting in the CSV file to Postgres.
async fn publish_from_file(
    range: &DateRange,
    policy: PublishPolicy,
    pool: Option<sqlx::PgPool>,
    csv_path: &Path,
) -> anyhow::Result<RunSummary> {
    let Some(pool) = pool else {
        anyhow::bail!("publish-only mode requires DATABASE_URL to be set");
    };

    let records = CsvSink::new(csv_path).read_range(range)?;
    tracing::info!(
        path = %csv_path.display(),
        records = records.len(),
        "loaded records from csv for publish-only run"
    );

    let mut summary = RunSummary {
        reconciled: records.len(),
        ..RunSummary::default()
    };

    let sink = PgSink::new(pool);
    match publish(&sink, &records, range, policy).await {
        Ok(report) => {
            summary.written = report.written;
            summary.skipped = report.skipped;
            summary.overwritten = report.overwritten;
            summary.sink_reports.push(SinkReport {
                sink: sink.name().to_string(),
                written: report.written,
                skipped: report.skipped,
                overwritten: report.overwritten,
            });
        }
        Err(e) => {
            summary.written = e.committed.len();
            summary.fatal = Some(e.to_string());
            summary.committed_before_failure = e.committed;
        }
    }
    Ok(summary)
}

/// Builds one adapter per platform that has credentials configured.
/// Unconfigured platforms are skipped with a warning; no platforms at all is
/// an error.
fn build_adapters(config: &AppConfig) -> anyhow::Result<Vec<Box<dyn PlatformAdapter>>> {
    let mut adapters: Vec<Box<dyn PlatformAdapter>> = Vec::new();

    match (&config.youtube_api_key, &config.youtube_channel_id) {
        (Some(api_key), Some(channel_id)) => {
            let client = YoutubeClient::new(
                api_key,
                channel_id,
                config.request_timeout_secs,
                config.max_retries,
                config.retry_backoff_base_ms,
            )
            .map_err(|e| anyhow::anyhow!("failed to build YouTube client: {e}"))?;
            adapters.push(Box::new(client));
        }
        _ => {
            tracing::warn!(platform = %Platform::Youtube, "credentials not configured; skipping");
        }
    }

    if let Some(token) = &config.vimeo_access_token {
        let client = VimeoClient::new(
            token,
            config.vimeo_user_id.as_deref(),
            config.request_timeout_secs,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
        .map_err(|e| anyhow::anyhow!("failed to build Vimeo client: {e}"))?;
        adapters.push(Box::new(client));
    } else {
        tracing::warn!(platform = %Platform::Vimeo, "credentials not configured; skipping");
    }

    if adapters.is_empty() {
        anyhow::bail!("no platform credentials configured; nothing to fetch");
    }
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::path::PathBuf;

    fn config_with(
        youtube: Option<(&str, &str)>,
        vimeo_token: Option<&str>,
    ) -> AppConfig {
        AppConfig {
            database_url: None,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            log_level: "info".to_string(),
            youtube_api_key: youtube.map(|(k, _)| k.to_string()),
            youtube_channel_id: youtube.map(|(_, c)| c.to_string()),
            vimeo_access_token: vimeo_token.map(str::to_string),
            vimeo_user_id: None,
            default_csv_path: PathBuf::from("./video_stats.csv"),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_backoff_base_ms: 1000,
        }
    }

    #[test]
    fn both_platforms_build_when_configured() {
        let config = config_with(Some(("key", "UC123")), Some("token"));
        let adapters = build_adapters(&config).expect("adapters should build");
        let platforms: Vec<Platform> = adapters.iter().map(|a| a.platform()).collect();
        assert_eq!(platforms, vec![Platform::Youtube, Platform::Vimeo]);
    }

    #[test]
    fn missing_youtube_credentials_skip_the_platform() {
        let config = config_with(None, Some("token"));
        let adapters = build_adapters(&config).expect("vimeo alone is enough");
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].platform(), Platform::Vimeo);
    }

    #[test]
    fn no_credentials_at_all_is_an_error() {
        let config = config_with(None, None);
        assert!(build_adapters(&config).is_err());
    }

    #[tokio::test]
    async fn publish_only_without_database_url_is_an_error() {
        let range = DateRange::parse("2024-01-01", "2024-01-03").expect("valid range");
        let result = publish_from_file(
            &range,
            PublishPolicy::default(),
            None,
            Path::new("./video_stats.csv"),
        )
        .await;
        assert!(result.is_err());
    }
}

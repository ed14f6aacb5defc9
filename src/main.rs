use anyhow::Result;
use clap::Parser;
use gridingest::{
    config::Config,
    poller::Poller,
    schema::AliasTable,
    store::{FsObjectStore, SqliteRecordStore},
};
use std::{sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Ingest poller: watches the incoming prefix for tabular files and loads
/// plant-level generation records into the store.
#[derive(Parser, Debug)]
#[command(name = "gridingest")]
struct Args {
    /// Run a single discovery pass and exit instead of polling.
    #[arg(long)]
    once: bool,

    /// Override the poll interval between passes.
    #[arg(long)]
    poll_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load configuration ───────────────────────────────────────
    let args = Args::parse();
    let config = Config::from_env()?;

    let aliases = match &config.alias_file {
        Some(path) => AliasTable::from_yaml_file(path)?,
        None => AliasTable::default(),
    };

    // ─── 3) build collaborators ──────────────────────────────────────
    let objects = Arc::new(FsObjectStore::new(&config.data_root, &config.bucket));
    let records = Arc::new(SqliteRecordStore::open(
        &config.db_path,
        &config.table_name,
    )?);

    let poller = Poller::new(
        objects,
        records,
        aliases,
        config.incoming_prefix.clone(),
        config.processed_prefix.clone(),
    );
    poller.ensure_collaborators().await?;
    info!(
        bucket = %config.bucket,
        prefix = %config.incoming_prefix,
        "watching incoming objects"
    );

    // ─── 4) run ──────────────────────────────────────────────────────
    if args.once {
        let summary = poller.run_pass().await?;
        info!(
            seen = summary.objects_seen,
            processed = summary.objects_processed,
            failed = summary.objects_failed,
            written = summary.records_written,
            skipped = summary.rows_skipped,
            "single pass complete"
        );
        return Ok(());
    }

    let interval = Duration::from_secs(args.poll_seconds.unwrap_or(config.poll_seconds));
    poller.run(interval).await
}

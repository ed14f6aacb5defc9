use anyhow::Result;
use gridingest::{
    config::Config,
    serve,
    store::{RecordStore, SqliteRecordStore},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Query API server over the plant record store. Read-only; the ingest
/// poller is the only writer.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    let config = Config::from_env()?;
    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(
        &config.db_path,
        &config.table_name,
    )?);
    store.ensure_table().await?;

    serve::serve(config.api_addr, store).await
}

use eduapi::config::ApiConfig;
use eduapi::entities;
use eduapi::server::{ServerBuilder, init_tracing};
use eduapi::storage::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;
    init_tracing(&config.server.log_level);

    let builder = entities::register_all(ServerBuilder::new(config));
    let builder = with_configured_store(builder).await?;
    builder.serve().await
}

#[cfg(feature = "postgres")]
async fn with_configured_store(builder: ServerBuilder) -> anyhow::Result<ServerBuilder> {
    use eduapi::storage::PostgresStore;

    match builder.config().database.clone() {
        Some(database) => {
            let store = PostgresStore::connect(&database.url, database.max_connections).await?;
            store.ensure_schema(&entities::catalogue()).await?;
            Ok(builder.with_store(store))
        }
        None => {
            tracing::info!("no database configured, keeping records in memory");
            Ok(builder.with_store(InMemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn with_configured_store(builder: ServerBuilder) -> anyhow::Result<ServerBuilder> {
    if builder.config().database.is_some() {
        tracing::warn!("database configured but the postgres feature is disabled, using memory");
    }
    Ok(builder.with_store(InMemoryStore::new()))
}

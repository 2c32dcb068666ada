use anyhow::Result;
use presence_core::MatchPolicy;
use presence_model::OnnxAnalyzer;
use presence_store::sqlite::SqliteStore;
use presence_store::IdentityStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod attendance;
mod config;
mod dbus_interface;
mod engine;
mod registry;
mod service;
#[cfg(test)]
mod testutil;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("presenced starting");
    let cfg = config::Config::from_env();

    if let Some(parent) = cfg.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store: Arc<dyn IdentityStore> = Arc::new(SqliteStore::open(&cfg.db_path).await?);

    // Models load fail-fast: a daemon that cannot analyze faces has
    // nothing to offer.
    let analyzer = OnnxAnalyzer::load(&cfg.model_dir)?;
    let engine = engine::spawn_engine(Box::new(analyzer));

    let registry = Arc::new(registry::Registry::new(store.clone(), cfg.reload_limit));
    match registry.reload().await {
        Ok(count) => tracing::info!(count, "descriptor cache loaded"),
        Err(err) => {
            tracing::warn!(error = %err, "initial cache load failed; starting with an empty registry")
        }
    }

    let service = Arc::new(service::Service::new(
        registry,
        store,
        engine,
        MatchPolicy {
            kind: cfg.score_kind,
            threshold: cfg.match_threshold,
        },
    ));

    let _conn = zbus::connection::Builder::session()?
        .name("org.presence.Attendance1")?
        .serve_at(
            "/org/presence/Attendance1",
            dbus_interface::PresenceService::new(service),
        )?
        .build()
        .await?;

    tracing::info!("presenced ready");
    tokio::signal::ctrl_c().await?;
    tracing::info!("presenced shutting down");

    Ok(())
}

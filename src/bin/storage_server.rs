//! Storage service (C7) entry point.

use std::panic;
use std::sync::Arc;

use zonevault::config::StoreConfig;
use zonevault::registry::ZoneRegistry;
use zonevault::storage_service::{router, AppState};
use zonevault::{blacklist::Blacklist, token::TokenCodec};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("zonevault storage service fatal error:");
        eprintln!("{panic_info}");
    }));

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("zonevault storage service v{}", zonevault::VERSION);

    let config = StoreConfig::from_env()?;
    log::info!(
        "opening {} zone(s) under {}",
        config.zones.len(),
        config.db_dir.display()
    );

    let token_codec = Arc::new(TokenCodec::load_or_generate(&config.key_file)?);
    let blacklist = Arc::new(Blacklist::load(&config.blacklist_file));
    let registry = Arc::new(
        ZoneRegistry::open(
            &config.db_dir,
            &config.zones,
            config.pool_size,
            config.lru_cache_size,
            config.flush_interval_secs,
            config.max_queue_rows,
        )
        .await?,
    );

    let state = AppState {
        registry: registry.clone(),
        token_codec,
        blacklist: blacklist.clone(),
    };

    let listener = tokio::net::TcpListener::bind("0.0.0.0:9401").await?;
    log::info!("storage service listening on {}", listener.local_addr()?);

    let app = router(state);
    let shutdown_registry = registry.clone();
    let shutdown_blacklist = blacklist.clone();

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("storage service shutting down");
            shutdown_registry.shutdown().await;
            shutdown_blacklist.flush();
        })
        .await?;

    Ok(())
}

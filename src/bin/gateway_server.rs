//! Edge gateway (C8) entry point.

use std::net::SocketAddr;
use std::panic;
use std::sync::Arc;

use zonevault::config::GatewayConfig;
use zonevault::gateway::client::StorageClient;
use zonevault::gateway::{router, AppState};
use zonevault::ratelimit::RateLimiter;
use zonevault::{blacklist::Blacklist, token::TokenCodec};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("zonevault gateway fatal error:");
        eprintln!("{panic_info}");
    }));

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("zonevault edge gateway v{}", zonevault::VERSION);

    let config = GatewayConfig::from_env()?;
    log::info!("routing requests to storage service at {}", config.db_server);

    let token_codec = Arc::new(TokenCodec::load_or_generate(&config.key_file)?);
    let blacklist = Arc::new(Blacklist::load(&config.blacklist_file));
    let limiter = Arc::new(RateLimiter::with_default_policies());
    let client = StorageClient::new(config.db_server.clone(), config.db_api_key.clone());

    let state = AppState {
        client,
        token_codec,
        blacklist: blacklist.clone(),
        limiter,
        zones: config.zones.clone(),
    };

    let listener = tokio::net::TcpListener::bind("0.0.0.0:9400").await?;
    log::info!("edge gateway listening on {}", listener.local_addr()?);

    let app = router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("edge gateway shutting down");
        blacklist.flush();
    })
    .await?;

    Ok(())
}

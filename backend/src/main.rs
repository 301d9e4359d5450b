use std::sync::Arc;

use anyhow::Context;
use backend::{
    config::ServerConfig,
    registry::GameRegistry,
    server::Server,
    session::SessionRegistry,
    store::{MemoryAuth, MemoryGameStore},
    Handler,
};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("backend=info".parse()?))
        .init();

    let config = ServerConfig::parse();
    config.validate()?;

    let auth = Arc::new(MemoryAuth::new());
    for user in &config.users {
        let token = auth.issue(user.as_str());
        info!(%user, %token, "issued auth token");
    }
    let store = Arc::new(MemoryGameStore::new());
    for seed in &config.games {
        let game_id = store.create(seed.name.as_str(), seed.white.clone(), seed.black.clone());
        info!(%game_id, name = %seed.name, %seed, "created game");
    }

    let handler = Arc::new(Handler::new(
        auth,
        GameRegistry::new(store),
        Arc::new(SessionRegistry::new()),
    ));
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
                shutdown.cancel();
            }
        }
    });

    Server::new(handler, &config).run(listener, shutdown).await?;
    Ok(())
}

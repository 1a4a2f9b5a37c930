use axum::Router;
use configs::AppConfig;
use service::StoreService;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::{self, ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load configuration from `CONFIG_PATH` / `config.toml`, falling back to
/// environment variables when no such file exists.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let path = configs::config_path();
    if std::path::Path::new(&path).exists() {
        AppConfig::load_and_validate()
    } else {
        info!(%path, "no config file, using environment");
        AppConfig::from_env()
    }
}

/// Connect the store and assemble the router.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let store = StoreService::from_config(&cfg.store).await?;
    info!(backend = ?cfg.store.backend, lookup = ?cfg.store.key_lookup, "store access layer ready");
    Ok(routes::build_router(ServerState::new(store), build_cors()))
}

/// Serve until Ctrl+C.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;
    // host may be a name; bind resolves it
    let listener = TcpListener::bind((cfg.server.host.as_str(), cfg.server.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");
    serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use configs::StoreBackend;

    #[tokio::test]
    async fn build_app_with_memory_backend() -> anyhow::Result<()> {
        let mut cfg = AppConfig::default();
        cfg.store.backend = StoreBackend::Memory;
        let app = build_app(&cfg).await?;

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, app).await });

        let res = tokio::net::TcpStream::connect(addr).await;
        assert!(res.is_ok());
        Ok(())
    }
}

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use lightblog::config::Config;
use lightblog::controllers;
use lightblog::db::DatabaseGateway;
use lightblog::http::AppState;
use lightblog::http::server;
use lightblog::routing::{Dispatcher, RouteConfig};
use lightblog::session::SessionManager;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .init();

    info!("lightblog v{}", env!("CARGO_PKG_VERSION"));

    let db_path = if config.in_memory {
        info!("Using in-memory SQLite database (testing mode)");
        ":memory:".to_string()
    } else {
        config.database.clone()
    };

    let db = Arc::new(
        DatabaseGateway::open(&db_path, config.error_notification_address.clone())
            .map_err(|e| anyhow::anyhow!("failed to open database: {e}"))?,
    );
    ensure_schema(&db)?;

    let sessions = Arc::new(SessionManager::new(
        config.session_prefix.clone(),
        config.session_timeout(),
    ));

    let dispatcher = Dispatcher::new(
        controllers::default_registry(),
        RouteConfig::from_config(&config),
        config.debug_display,
    );

    let state = Arc::new(AppState {
        dispatcher,
        db,
        sessions,
        cookie_name: config.session_cookie_name(),
    });

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("HTTP server listening on port {}", config.port);

    server::run(listener, state).await
}

fn ensure_schema(db: &DatabaseGateway) -> Result<()> {
    if !db.table_exists("posts") {
        db.query(
            "CREATE TABLE posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .map_err(|e| anyhow::anyhow!("failed to create schema: {e}"))?;
        info!("created posts table");
    }
    Ok(())
}

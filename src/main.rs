use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use testdrive::config::AppConfig;
use testdrive::db;
use testdrive::routes;
use testdrive::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    tracing::info!("database ready at {}", config.database_url);

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(conn, config));
    let app = routes::router(state);

    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::env;
use std::sync::Arc;

use page_sensor::{HandlerRegistry, Instrumentation, SensorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod handlers;
mod mock_data;
mod redis_client;
mod server;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Cloneable async Redis connection (auto-reconnects).
    pub redis: redis::aio::ConnectionManager,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 1. Sensor configuration ──────────────────────────────────
    let config = SensorConfig::from_env()?;
    let instrumentation = Instrumentation::new(config, HandlerRegistry::with_defaults());
    let instrumentation = match instrumentation.validate() {
        Ok(()) => {
            tracing::info!(config = ?instrumentation.config(), "page sensor enabled");
            Some(Arc::new(instrumentation))
        }
        Err(err) => {
            tracing::error!(error = %err, "page sensor disabled");
            None
        }
    };

    // ── 2. Connect to Redis ──────────────────────────────────────
    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.into());
    tracing::info!(%redis_url, "connecting to redis");
    let redis_conn = redis_client::connect(&redis_url).await.map_err(|e| {
        tracing::error!(error = %e, "cannot connect to redis, is redis-server running?");
        e
    })?;

    // ── 3. Seed mock data ────────────────────────────────────────
    mock_data::seed(&redis_conn).await?;

    // ── 4. Build router ──────────────────────────────────────────
    let state = Arc::new(AppState { redis: redis_conn });
    let app = server::create_router(state, instrumentation);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

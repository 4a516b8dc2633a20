//! Companion HTTP server binary.
//!
//! # Environment Variables
//!
//! - `PORT` - HTTP port (default: 5000)
//! - `OPENROUTER_API_KEY` - upstream key; without it every reply is the fallback
//! - `RUST_LOG` - Tracing filter (default: "info,companion=debug")
//!
//! See [`companion::config`] for the full list.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_API_KEY=sk-or-... cargo run --bin server
//! ```

use anyhow::Context;
use companion::server::{app_router, AppState};
use companion::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,companion=debug".into()),
        )
        .init();

    let config = AppConfig::from_env();
    if config.upstream.api_key.is_none() {
        tracing::warn!("OPENROUTER_API_KEY is not set; replies will use the fallback message");
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(&config);
    let app = app_router(state);

    tracing::info!(
        companion = %config.companion_name,
        model = %config.upstream.model,
        "companion server starting on {}",
        bind_addr
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

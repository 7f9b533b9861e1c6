//! # Charge Desk RS
//!
//! Virtual terminal for manual card payments and payment links.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export DESK_ADMIN_PASSWORD=...
//! export SQUARE_ACCESS_TOKEN=EAAA...
//! export SQUARE_APPLICATION_ID=sandbox-sq0idb-...
//! export SQUARE_LOCATION_ID=L...
//!
//! # Run the server
//! charge-desk
//! ```

use desk_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!(
        "OAuth onboarding: {}",
        if state.oauth.is_some() { "enabled" } else { "disabled" }
    );

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("💳 Charge-Desk starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("🔑 Login: POST http://{}/api/v1/login", addr);
        info!("💰 Charge: POST http://{}/api/v1/charge", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  💳 Charge Desk RS 💳
  ━━━━━━━━━━━━━━━━━━━━━━━
  Virtual payment terminal
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}

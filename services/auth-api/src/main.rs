//! Prospect Auth API
//!
//! Authentication service: loads configuration, applies migrations, seeds
//! built-in roles and permissions, then serves liveness and readiness checks.

mod config;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use prospect_auth_core::GoogleIdentityProvider;
use prospect_db::{create_pool, run_migrations, Repositories};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::{build_auth_service, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Prospect Auth API");

    // Database
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let mut auth = build_auth_service(&config, Repositories::new(pool.clone()));
    if let Some(google) = config.google.clone() {
        auth = auth.with_identity_provider(Arc::new(GoogleIdentityProvider::new(google)));
        tracing::info!("Google federated login enabled");
    }

    // Bootstrap roles, permissions and the default superadmin
    auth.bootstrap().seed_roles_permissions().await?;
    if let Some(seed) = &config.superadmin {
        auth.bootstrap().seed_default_superadmin(seed).await?;
    }

    let app = handlers::router(AppState::new(auth, pool));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

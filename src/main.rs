//! trainee-graphql server.
//!
//! ```bash
//! JWT_SECRET=change-me GRAPHQL_PORT=4000 trainee-graphql
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trainee_graphql::server::serve_with_shutdown;
use trainee_graphql::{
    build_schema, Config, MemoryRevocationStore, MemoryStore, RevocationStore, Store, TokenIssuer,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let revocations: Arc<dyn RevocationStore> = Arc::new(MemoryRevocationStore::new());
    let issuer = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl);
    let schema = build_schema(store.clone(), issuer, revocations);

    if let Err(e) = serve_with_shutdown(schema, store, config.server, shutdown_signal()).await {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    info!("shut down gracefully");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

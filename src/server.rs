//! GraphQL HTTP server.

use std::future::Future;
use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::EmptySubscription;
use axum::{
    extract::Extension,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tracing::info;

use crate::auth::graphql_handler;
use crate::schema::{MutationRoot, QueryRoot, TraineeSchema};
use crate::store::Store;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_playground: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            enable_playground: true,
        }
    }
}

/// Routes: `POST /graphql`, GraphiQL on `GET /graphql` and `GET /` when
/// enabled, and `GET /health`.
pub fn router(schema: TraineeSchema, store: Arc<dyn Store>, enable_playground: bool) -> Router {
    let graphql = if enable_playground {
        get(graphql_playground).post(graphql_handler::<QueryRoot, MutationRoot, EmptySubscription>)
    } else {
        axum::routing::post(graphql_handler::<QueryRoot, MutationRoot, EmptySubscription>)
    };

    let mut app = Router::new()
        .route("/graphql", graphql)
        .route("/health", get(health_check));

    if enable_playground {
        app = app.route("/", get(graphql_playground));
    }

    app.layer(Extension(schema)).layer(Extension(store))
}

/// Serve until `shutdown_signal` resolves.
pub async fn serve_with_shutdown<F>(
    schema: TraineeSchema,
    store: Arc<dyn Store>,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(schema, store, config.enable_playground);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "GraphQL server listening on http://{}/graphql", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

/// GraphQL Playground UI.
async fn graphql_playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryRevocationStore, TokenIssuer, DEFAULT_TOKEN_TTL};
    use crate::schema::build_schema;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt as _;

    fn app(enable_playground: bool) -> Router {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let schema = build_schema(
            store.clone(),
            TokenIssuer::new(b"test-secret", DEFAULT_TOKEN_TTL),
            Arc::new(MemoryRevocationStore::new()),
        );
        router(schema, store, enable_playground)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(false)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_graphql_post_without_token() {
        let body = r#"{"query":"{ trainees { data { id } } }"}"#;
        let response = app(false)
            .oneshot(
                Request::post("/graphql")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["errors"][0]["message"], "Authorization token missing");
    }

    #[tokio::test]
    async fn test_playground_toggle() {
        let enabled = app(true)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(enabled.status(), StatusCode::OK);

        let disabled = app(false)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(disabled.status(), StatusCode::NOT_FOUND);
    }
}

//! Authentication: JWT sessions, token revocation and request context
//!
//! Provides helpers for:
//! - Issuing and verifying HS256 session tokens
//! - Revoking tokens through an injected [`RevocationStore`]
//! - Extracting the bearer token from HTTP headers into the GraphQL request
//! - The Axum handler for the GraphQL endpoint

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_graphql::{Context, ObjectType, Request, Response, Schema, SubscriptionType};
use async_trait::async_trait;
use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dataloaders::TraineeLoader;
use crate::models::Trainee;
use crate::store::{Store, StoreError, StoreResult};

/// Session lifetime used when none is configured.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization token missing")]
    MissingToken,

    #[error("Token is revoked")]
    Revoked,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub trainee_id: String,
    pub email: String,
    /// Unique per issued token, so revoking one session leaves others intact.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Raw bearer token attached to a GraphQL request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, trainee: &Trainee) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            trainee_id: trainee.id.to_string(),
            email: trainee.email.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                AuthError::InvalidToken
            })
    }
}

/// Set of tokens that must no longer authenticate
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Return true if the given token has been revoked.
    async fn is_revoked(&self, token: &str) -> StoreResult<bool>;

    /// Revoke the given token (e.g. on logout).
    async fn revoke(&self, token: &str) -> StoreResult<()>;
}

/// In-process [`RevocationStore`]
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    revoked: RwLock<HashSet<String>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn is_revoked(&self, token: &str) -> StoreResult<bool> {
        Ok(self.revoked.read().await.contains(token))
    }

    async fn revoke(&self, token: &str) -> StoreResult<()> {
        self.revoked.write().await.insert(token.to_owned());
        Ok(())
    }
}

/// Check a presented token: present, not revoked, correctly signed and unexpired.
pub async fn check_token(
    token: Option<&str>,
    issuer: &TokenIssuer,
    revocations: &dyn RevocationStore,
) -> Result<Claims, AuthError> {
    let token = token.ok_or(AuthError::MissingToken)?;

    if revocations.is_revoked(token).await? {
        return Err(AuthError::Revoked);
    }

    issuer.verify(token)
}

/// Authenticate the current GraphQL request.
pub async fn authenticate(ctx: &Context<'_>) -> async_graphql::Result<Claims> {
    let issuer = ctx.data::<TokenIssuer>()?;
    let revocations = ctx.data::<Arc<dyn RevocationStore>>()?;
    let token = get_bearer_token(ctx);

    Ok(check_token(token, issuer, revocations.as_ref()).await?)
}

/// Extract the token from the Authorization header
///
/// A `Bearer ` prefix is stripped when present; an empty header counts as absent.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|auth| auth.strip_prefix("Bearer ").unwrap_or(auth).trim())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

/// Attach per-request data: the bearer token (if any) and a fresh trainee loader.
pub fn prepare_request(mut request: Request, token: Option<String>, store: Arc<dyn Store>) -> Request {
    if let Some(token) = token {
        request = request.data(BearerToken(token));
    }

    request.data(TraineeLoader::for_store(store))
}

/// Standard GraphQL handler with authentication context injection
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use async_graphql::EmptySubscription;
/// use axum::{routing::post, Extension, Router};
/// use trainee_graphql::auth::graphql_handler;
/// use trainee_graphql::schema::{MutationRoot, QueryRoot, TraineeSchema};
/// use trainee_graphql::store::Store;
///
/// # fn example(schema: TraineeSchema, store: Arc<dyn Store>) -> Router {
/// Router::new()
///     .route("/graphql", post(graphql_handler::<QueryRoot, MutationRoot, EmptySubscription>))
///     .layer(Extension(schema))
///     .layer(Extension(store))
/// # }
/// ```
pub async fn graphql_handler<Query, Mutation, Subscription>(
    Extension(schema): Extension<Schema<Query, Mutation, Subscription>>,
    Extension(store): Extension<Arc<dyn Store>>,
    headers: HeaderMap,
    req: Json<Request>,
) -> Json<Response>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    let request = prepare_request(req.0, extract_bearer_token(&headers), store);

    Json(schema.execute(request).await)
}

/// Get the raw bearer token from GraphQL context
pub fn get_bearer_token<'a>(ctx: &'a Context<'_>) -> Option<&'a str> {
    ctx.data_opt::<BearerToken>().map(|t| t.0.as_str())
}

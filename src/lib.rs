//! # trainee-graphql
//!
//! GraphQL API for trainees, workouts, routines and registrations.
//!
//! ## Features
//!
//! - **Dual-mode pagination** - legacy `page`/`pageSize` and Relay
//!   `first`/`after`/`last`/`before` resolved to one offset window, with both
//!   result shapes always present
//! - **Sessions** - JWT issuance, revocation through an injected store
//! - **DataLoader** - batched trainee lookups for nested fields
//! - **Pluggable storage** - resolvers talk to a [`store::Store`] trait
//!
//! ## Usage
//!
//! ```rust
//! use trainee_graphql::pagination::{CursorCodec, PaginationArgs, Window};
//!
//! let args = PaginationArgs {
//!     first: Some(10),
//!     after: Some(CursorCodec::encode(9)),
//!     ..Default::default()
//! };
//! assert_eq!(args.window().0, Window { offset: 10, limit: 10 });
//! ```

pub mod auth;
pub mod config;
pub mod dataloaders;
pub mod models;
pub mod pagination;
pub mod password;
pub mod schema;
pub mod server;
pub mod store;
pub mod types;

pub use auth::{
    extract_bearer_token, graphql_handler, prepare_request, MemoryRevocationStore,
    RevocationStore, TokenIssuer,
};
pub use config::Config;
pub use dataloaders::{BatchLoader, DataLoader, TraineeLoader};
pub use pagination::{Connection, CursorCodec, Edge, Page, PageInfo, PaginationArgs, Window};
pub use schema::{build_schema, MutationRoot, QueryRoot, TraineeSchema};
pub use store::{MemoryStore, Store};
pub use types::DateTime;

use thiserror::Error;

/// Errors surfaced to GraphQL clients
///
/// The `Display` text is the message clients see.
#[derive(Error, Debug)]
pub enum GraphQLError {
    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Required input missing or empty.
    #[error("{0}")]
    Validation(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email is already in use")]
    EmailInUse,

    #[error(transparent)]
    Password(#[from] password::PasswordError),

    #[error(transparent)]
    Store(store::StoreError),
}

impl From<store::StoreError> for GraphQLError {
    fn from(err: store::StoreError) -> Self {
        match err {
            store::StoreError::UniqueViolation("email") => GraphQLError::EmailInUse,
            other => GraphQLError::Store(other),
        }
    }
}

/// Result type for GraphQL operations
pub type Result<T> = std::result::Result<T, GraphQLError>;

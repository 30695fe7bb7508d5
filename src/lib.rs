//! # controlplane-graphql
//!
//! GraphQL resolver layer of the infrastructure automation control plane.
//!
//! ## Features
//!
//! - **Cursor Pagination** - Relay-style connections over service pages
//! - **DataLoader** - Per-request batch loading for N+1 prevention
//! - **Resource IDs** - Global IDs and typed resource names (TRNs)
//! - **Mutation Problems** - Service failures reported inside payloads
//! - **Auth Handler** - Axum handler building the request state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use controlplane_graphql::{build_schema, ApiConfig};
//!
//! let schema = build_schema(&ApiConfig::default());
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod dataloaders;
pub mod errors;
pub mod gid;
pub mod loaders;
pub mod models;
pub mod pagination;
pub mod problem;
pub mod resolvers;
pub mod services;
pub mod types;

pub use auth::{graphql_handler, Authenticator, Caller};
pub use config::ApiConfig;
pub use context::{RequestState, Services};
pub use dataloaders::{BatchLoader, DataLoader};
pub use errors::{error_code, ErrorCode, ServiceError};
pub use gid::{to_global_id, ResourceType, Trn};
pub use pagination::{Connection, ConnectionArgs, CursorCodec, Edge, PageInfo};
pub use problem::{build_problem, Problem, ProblemType};
pub use resolvers::{build_schema, ApiSchema, MutationRoot, QueryRoot};
pub use types::DateTime;

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// GraphQL errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphQLError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Pagination error: {0}")]
    PaginationError(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl GraphQLError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GraphQLError::InvalidCursor(_)
            | GraphQLError::PaginationError(_)
            | GraphQLError::InvalidId(_)
            | GraphQLError::InvalidArgument(_) => ErrorCode::Invalid,
            GraphQLError::Config(_) => ErrorCode::Internal,
            GraphQLError::Service(err) => err.code(),
        }
    }

    /// Convert into a GraphQL error carrying the code as an extension
    pub fn to_field_error(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code.as_str()))
    }
}

/// Result type for GraphQL operations
pub type Result<T> = std::result::Result<T, GraphQLError>;

/// Map crate errors onto GraphQL field errors at resolver boundaries
pub trait ResultExt<T> {
    fn into_field(self) -> async_graphql::Result<T>;
}

impl<T, E: Into<GraphQLError>> ResultExt<T> for std::result::Result<T, E> {
    fn into_field(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.into().to_field_error())
    }
}

//! GraphQL authentication and request state injection
//!
//! Provides helpers for:
//! - Extracting the bearer token from HTTP headers
//! - Resolving the token to a caller through the external authenticator
//! - Standard Axum handler for the GraphQL endpoint

use std::sync::Arc;

use async_graphql::{Pos, Request, Response};
use async_trait::async_trait;
use axum::{extract::Extension, http::HeaderMap, Json};

use crate::config::ApiConfig;
use crate::context::{RequestState, Services};
use crate::errors::ServiceError;
use crate::models::{ServiceAccount, User};
use crate::resolvers::ApiSchema;
use crate::GraphQLError;

/// Subject a request runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    User(User),
    ServiceAccount(ServiceAccount),
    Anonymous,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::User(user) if user.admin)
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Caller::Anonymous)
    }
}

/// Verifies bearer tokens
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Caller, ServiceError>;
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller of a request from its headers
pub async fn resolve_caller(
    authenticator: &dyn Authenticator,
    headers: &HeaderMap,
) -> Result<Caller, ServiceError> {
    match extract_bearer_token(headers) {
        Some(token) => authenticator.authenticate(token).await,
        None => Ok(Caller::Anonymous),
    }
}

/// Standard GraphQL handler with request state injection
///
/// Authenticates the caller, builds the per-request state (services,
/// loaders, config) and attaches it to the request before execution.
///
/// # Example
///
/// ```rust,no_run
/// use axum::{Router, routing::post};
/// use controlplane_graphql::auth::graphql_handler;
///
/// let app: Router = Router::new().route("/graphql", post(graphql_handler));
/// ```
pub async fn graphql_handler(
    Extension(schema): Extension<ApiSchema>,
    Extension(services): Extension<Arc<Services>>,
    Extension(authenticator): Extension<Arc<dyn Authenticator>>,
    Extension(config): Extension<Arc<ApiConfig>>,
    headers: HeaderMap,
    req: Json<Request>,
) -> Json<Response> {
    let caller = match resolve_caller(authenticator.as_ref(), &headers).await {
        Ok(caller) => caller,
        Err(err) => {
            tracing::warn!(error = %err, "rejected GraphQL request credentials");
            let error = GraphQLError::from(err)
                .to_field_error()
                .into_server_error(Pos::default());
            return Json(Response::from_errors(vec![error]));
        }
    };

    let state = RequestState::new(services, caller, config);
    let response = schema.execute(req.0.data(state)).await;

    Json(response)
}

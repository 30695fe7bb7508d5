//! Request-scoped state handed to every resolver

use std::sync::Arc;

use async_graphql::Context;
use uuid::Uuid;

use crate::auth::Caller;
use crate::config::ApiConfig;
use crate::gid::{ResourceRef, ResourceType};
use crate::loaders::Loaders;
use crate::services::{
    AnnouncementService, FederatedRegistryService, GroupService, ManagedIdentityService,
    ResourceResolver, RunnerService, ServiceAccountService, TeamService, UserService,
    WorkspaceService,
};
use crate::GraphQLError;

/// Handles to every service the resolvers call
#[derive(Clone)]
pub struct Services {
    pub groups: Arc<dyn GroupService>,
    pub workspaces: Arc<dyn WorkspaceService>,
    pub users: Arc<dyn UserService>,
    pub service_accounts: Arc<dyn ServiceAccountService>,
    pub teams: Arc<dyn TeamService>,
    pub managed_identities: Arc<dyn ManagedIdentityService>,
    pub runners: Arc<dyn RunnerService>,
    pub announcements: Arc<dyn AnnouncementService>,
    pub federated_registries: Arc<dyn FederatedRegistryService>,
    pub resources: Arc<dyn ResourceResolver>,
}

/// Everything one GraphQL request needs
///
/// Root resolvers take it from the request data once and pass it on to
/// each node they construct.
pub struct RequestState {
    pub services: Arc<Services>,
    pub loaders: Loaders,
    pub caller: Caller,
    pub config: Arc<ApiConfig>,
}

impl RequestState {
    pub fn new(services: Arc<Services>, caller: Caller, config: Arc<ApiConfig>) -> Arc<Self> {
        let loaders = Loaders::new(&services, &config.dataloader);
        Arc::new(Self {
            services,
            loaders,
            caller,
            config,
        })
    }

    /// Fetch the request state attached to the GraphQL request
    pub fn from_context(ctx: &Context<'_>) -> async_graphql::Result<Arc<Self>> {
        ctx.data::<Arc<RequestState>>().cloned().map_err(|_| {
            GraphQLError::Config("request state missing from GraphQL request".to_string()).to_field_error()
        })
    }

    /// Resolve an ID argument given as TRN or global ID to a model ID
    pub async fn resolve_id(&self, value: &str, expected: ResourceType) -> crate::Result<Uuid> {
        match ResourceRef::parse(value)?.expect_type(expected)? {
            ResourceRef::Global(gid) => {
                tracing::debug!(resource_type = %expected, "resolving deprecated global id");
                Ok(gid.id)
            }
            ResourceRef::Trn(trn) => Ok(self.services.resources.resolve_trn(&trn).await?),
        }
    }

    /// Like [`RequestState::resolve_id`] for optional arguments
    pub async fn resolve_optional_id(
        &self,
        value: Option<&str>,
        expected: ResourceType,
    ) -> crate::Result<Option<Uuid>> {
        match value {
            Some(value) => self.resolve_id(value, expected).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn page_size(&self) -> i32 {
        self.config.default_page_size
    }
}

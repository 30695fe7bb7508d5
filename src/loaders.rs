//! Per-request loaders for every model resolvers look up by ID

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::DataLoaderConfig;
use crate::context::Services;
use crate::dataloaders::{BatchLoader, DataLoader};
use crate::errors::ServiceError;
use crate::models::{Group, ManagedIdentity, ServiceAccount, Team, User, Workspace};
use crate::services::{
    GroupService, ManagedIdentityService, ServiceAccountService, TeamService, UserService,
    WorkspaceService,
};

pub struct GroupBatchLoader(Arc<dyn GroupService>);

#[async_trait]
impl BatchLoader<Uuid, Group> for GroupBatchLoader {
    async fn load_batch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Group>, ServiceError> {
        let groups = self.0.get_groups_by_ids(keys).await?;
        Ok(groups.into_iter().map(|g| (g.metadata.id, g)).collect())
    }
}

pub struct WorkspaceBatchLoader(Arc<dyn WorkspaceService>);

#[async_trait]
impl BatchLoader<Uuid, Workspace> for WorkspaceBatchLoader {
    async fn load_batch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Workspace>, ServiceError> {
        let workspaces = self.0.get_workspaces_by_ids(keys).await?;
        Ok(workspaces.into_iter().map(|w| (w.metadata.id, w)).collect())
    }
}

pub struct UserBatchLoader(Arc<dyn UserService>);

#[async_trait]
impl BatchLoader<Uuid, User> for UserBatchLoader {
    async fn load_batch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, User>, ServiceError> {
        let users = self.0.get_users_by_ids(keys).await?;
        Ok(users.into_iter().map(|u| (u.metadata.id, u)).collect())
    }
}

pub struct ServiceAccountBatchLoader(Arc<dyn ServiceAccountService>);

#[async_trait]
impl BatchLoader<Uuid, ServiceAccount> for ServiceAccountBatchLoader {
    async fn load_batch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, ServiceAccount>, ServiceError> {
        let accounts = self.0.get_service_accounts_by_ids(keys).await?;
        Ok(accounts.into_iter().map(|sa| (sa.metadata.id, sa)).collect())
    }
}

pub struct TeamBatchLoader(Arc<dyn TeamService>);

#[async_trait]
impl BatchLoader<Uuid, Team> for TeamBatchLoader {
    async fn load_batch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Team>, ServiceError> {
        let teams = self.0.get_teams_by_ids(keys).await?;
        Ok(teams.into_iter().map(|t| (t.metadata.id, t)).collect())
    }
}

pub struct ManagedIdentityBatchLoader(Arc<dyn ManagedIdentityService>);

#[async_trait]
impl BatchLoader<Uuid, ManagedIdentity> for ManagedIdentityBatchLoader {
    async fn load_batch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, ManagedIdentity>, ServiceError> {
        let identities = self.0.get_managed_identities_by_ids(keys).await?;
        Ok(identities.into_iter().map(|m| (m.metadata.id, m)).collect())
    }
}

/// The loaders of one request
#[derive(Clone)]
pub struct Loaders {
    pub groups: DataLoader<Uuid, Group, GroupBatchLoader>,
    pub workspaces: DataLoader<Uuid, Workspace, WorkspaceBatchLoader>,
    pub users: DataLoader<Uuid, User, UserBatchLoader>,
    pub service_accounts: DataLoader<Uuid, ServiceAccount, ServiceAccountBatchLoader>,
    pub teams: DataLoader<Uuid, Team, TeamBatchLoader>,
    pub managed_identities: DataLoader<Uuid, ManagedIdentity, ManagedIdentityBatchLoader>,
}

impl Loaders {
    pub fn new(services: &Services, config: &DataLoaderConfig) -> Self {
        let delay = config.batch_delay();
        let max_batch_size = config.max_batch_size as usize;

        Self {
            groups: DataLoader::new("group", GroupBatchLoader(services.groups.clone()))
                .with_delay(delay)
                .with_max_batch_size(max_batch_size),
            workspaces: DataLoader::new("workspace", WorkspaceBatchLoader(services.workspaces.clone()))
                .with_delay(delay)
                .with_max_batch_size(max_batch_size),
            users: DataLoader::new("user", UserBatchLoader(services.users.clone()))
                .with_delay(delay)
                .with_max_batch_size(max_batch_size),
            service_accounts: DataLoader::new(
                "service_account",
                ServiceAccountBatchLoader(services.service_accounts.clone()),
            )
            .with_delay(delay)
            .with_max_batch_size(max_batch_size),
            teams: DataLoader::new("team", TeamBatchLoader(services.teams.clone()))
                .with_delay(delay)
                .with_max_batch_size(max_batch_size),
            managed_identities: DataLoader::new(
                "managed_identity",
                ManagedIdentityBatchLoader(services.managed_identities.clone()),
            )
            .with_delay(delay)
            .with_max_batch_size(max_batch_size),
        }
    }
}

/// Load a model that another model references by ID
///
/// A dangling reference is a service-side inconsistency, so it surfaces as
/// an internal error rather than `null`.
pub async fn load_required<V, L>(
    loader: &DataLoader<Uuid, V, L>,
    id: Uuid,
) -> crate::Result<V>
where
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<Uuid, V> + 'static,
{
    loader.load(id).await?.ok_or_else(|| {
        ServiceError::internal(format!("{} with id {} could not be loaded", loader.name(), id)).into()
    })
}

/// Load several referenced models, keeping the order of `ids`
pub async fn load_all<V, L>(loader: &DataLoader<Uuid, V, L>, ids: &[Uuid]) -> crate::Result<Vec<V>>
where
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<Uuid, V> + 'static,
{
    let found = loader.load_many(ids.to_vec()).await?;
    Ok(ids.iter().filter_map(|id| found.get(id).cloned()).collect())
}

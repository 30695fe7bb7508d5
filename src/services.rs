//! Service traits consumed by the resolvers
//!
//! Implementations live in the service layer; this crate only calls them.
//! Each trait is object safe so a request can hold them as `Arc<dyn _>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::gid::Trn;
use crate::models::*;
use crate::pagination::{PaginationOptions, ResultPage};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Resolves typed resource names to model IDs
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve_trn(&self, trn: &Trn) -> ServiceResult<Uuid>;
}

#[derive(Debug, Clone, Default)]
pub struct GetGroupsInput {
    pub sort: Option<GroupSort>,
    pub pagination: PaginationOptions,
    /// Only direct children of this group; top-level groups when `None`
    pub parent_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateGroupInput {
    pub name: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
}

#[async_trait]
pub trait GroupService: Send + Sync {
    async fn get_group_by_id(&self, id: Uuid) -> ServiceResult<Group>;
    async fn get_groups_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<Group>>;
    async fn get_groups(&self, input: GetGroupsInput) -> ServiceResult<ResultPage<Group>>;
    async fn create_group(&self, input: CreateGroupInput) -> ServiceResult<Group>;
    async fn update_group(&self, group: Group) -> ServiceResult<Group>;
    async fn delete_group(&self, group: &Group, force: bool) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct GetWorkspacesInput {
    pub sort: Option<WorkspaceSort>,
    pub pagination: PaginationOptions,
    pub group_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkspaceInput {
    pub name: String,
    pub description: String,
    pub group_id: Uuid,
    pub max_job_duration: Option<i32>,
    pub terraform_version: Option<String>,
    pub prevent_destroy_plan: bool,
}

#[async_trait]
pub trait WorkspaceService: Send + Sync {
    async fn get_workspace_by_id(&self, id: Uuid) -> ServiceResult<Workspace>;
    async fn get_workspaces_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<Workspace>>;
    async fn get_workspaces(&self, input: GetWorkspacesInput) -> ServiceResult<ResultPage<Workspace>>;
    async fn create_workspace(&self, input: CreateWorkspaceInput) -> ServiceResult<Workspace>;
    async fn update_workspace(&self, workspace: Workspace) -> ServiceResult<Workspace>;
    async fn delete_workspace(&self, workspace: &Workspace, force: bool) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct GetUsersInput {
    pub sort: Option<UserSort>,
    pub pagination: PaginationOptions,
    pub search: Option<String>,
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_user_by_id(&self, id: Uuid) -> ServiceResult<User>;
    async fn get_users_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<User>>;
    async fn get_users(&self, input: GetUsersInput) -> ServiceResult<ResultPage<User>>;
}

#[derive(Debug, Clone, Default)]
pub struct GetServiceAccountsInput {
    pub sort: Option<NameSort>,
    pub pagination: PaginationOptions,
    pub group_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateServiceAccountInput {
    pub name: String,
    pub description: String,
    pub group_id: Uuid,
}

#[async_trait]
pub trait ServiceAccountService: Send + Sync {
    async fn get_service_account_by_id(&self, id: Uuid) -> ServiceResult<ServiceAccount>;
    async fn get_service_accounts_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<ServiceAccount>>;
    async fn get_service_accounts(
        &self,
        input: GetServiceAccountsInput,
    ) -> ServiceResult<ResultPage<ServiceAccount>>;
    async fn create_service_account(&self, input: CreateServiceAccountInput) -> ServiceResult<ServiceAccount>;
    async fn delete_service_account(&self, service_account: &ServiceAccount) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct GetTeamsInput {
    pub sort: Option<NameSort>,
    pub pagination: PaginationOptions,
    pub search: Option<String>,
    /// Only teams this user belongs to
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct GetTeamMembersInput {
    pub pagination: PaginationOptions,
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateTeamInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct AddUserToTeamInput {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub is_maintainer: bool,
}

#[async_trait]
pub trait TeamService: Send + Sync {
    async fn get_team_by_id(&self, id: Uuid) -> ServiceResult<Team>;
    async fn get_teams_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<Team>>;
    async fn get_teams(&self, input: GetTeamsInput) -> ServiceResult<ResultPage<Team>>;
    async fn get_team_members(&self, input: GetTeamMembersInput) -> ServiceResult<ResultPage<TeamMember>>;
    async fn create_team(&self, input: CreateTeamInput) -> ServiceResult<Team>;
    async fn delete_team(&self, team: &Team) -> ServiceResult<()>;
    async fn add_user_to_team(&self, input: AddUserToTeamInput) -> ServiceResult<TeamMember>;
}

#[derive(Debug, Clone, Default)]
pub struct GetManagedIdentitiesInput {
    pub sort: Option<NameSort>,
    pub pagination: PaginationOptions,
    pub group_id: Option<Uuid>,
    pub search: Option<String>,
    /// Also return identities defined in ancestor groups
    pub include_inherited: bool,
}

/// One access rule with its principals already resolved to IDs
#[derive(Debug, Clone)]
pub struct AccessRuleSpec {
    pub rule_type: AccessRuleType,
    pub run_stage: JobStage,
    pub allowed_user_ids: Vec<Uuid>,
    pub allowed_service_account_ids: Vec<Uuid>,
    pub allowed_team_ids: Vec<Uuid>,
    pub verify_state_lineage: bool,
}

#[derive(Debug, Clone)]
pub struct CreateAccessRuleInput {
    pub managed_identity_id: Uuid,
    pub rule: AccessRuleSpec,
}

#[derive(Debug, Clone)]
pub struct CreateManagedIdentityInput {
    pub name: String,
    pub description: String,
    pub identity_type: ManagedIdentityType,
    pub group_id: Uuid,
    pub data: String,
    /// Rules stored together with the identity; none are kept if any fails
    pub access_rules: Vec<AccessRuleSpec>,
}

#[async_trait]
pub trait ManagedIdentityService: Send + Sync {
    async fn get_managed_identity_by_id(&self, id: Uuid) -> ServiceResult<ManagedIdentity>;
    async fn get_managed_identities_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<ManagedIdentity>>;
    async fn get_managed_identities(
        &self,
        input: GetManagedIdentitiesInput,
    ) -> ServiceResult<ResultPage<ManagedIdentity>>;
    async fn create_managed_identity(
        &self,
        input: CreateManagedIdentityInput,
    ) -> ServiceResult<ManagedIdentity>;
    async fn update_managed_identity(&self, identity: ManagedIdentity) -> ServiceResult<ManagedIdentity>;
    async fn delete_managed_identity(&self, identity: &ManagedIdentity, force: bool) -> ServiceResult<()>;
    async fn get_access_rule_by_id(&self, id: Uuid) -> ServiceResult<ManagedIdentityAccessRule>;
    async fn get_access_rules(&self, managed_identity_id: Uuid) -> ServiceResult<Vec<ManagedIdentityAccessRule>>;
    async fn create_access_rule(&self, input: CreateAccessRuleInput) -> ServiceResult<ManagedIdentityAccessRule>;
    async fn delete_access_rule(&self, rule: &ManagedIdentityAccessRule) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct GetRunnersInput {
    pub sort: Option<NameSort>,
    pub pagination: PaginationOptions,
    pub group_id: Option<Uuid>,
    pub runner_type: Option<RunnerType>,
}

#[derive(Debug, Clone)]
pub struct CreateRunnerInput {
    pub name: String,
    pub description: String,
    /// Shared runner when `None`
    pub group_id: Option<Uuid>,
    pub disabled: bool,
    pub tags: Vec<String>,
    pub run_untagged_jobs: bool,
}

#[async_trait]
pub trait RunnerService: Send + Sync {
    async fn get_runner_by_id(&self, id: Uuid) -> ServiceResult<Runner>;
    async fn get_runners(&self, input: GetRunnersInput) -> ServiceResult<ResultPage<Runner>>;
    async fn create_runner(&self, input: CreateRunnerInput) -> ServiceResult<Runner>;
    async fn update_runner(&self, runner: Runner) -> ServiceResult<Runner>;
    async fn delete_runner(&self, runner: &Runner) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct GetAnnouncementsInput {
    pub sort: Option<AnnouncementSort>,
    pub pagination: PaginationOptions,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct CreateAnnouncementInput {
    pub message: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub announcement_type: AnnouncementType,
    pub dismissible: bool,
}

#[async_trait]
pub trait AnnouncementService: Send + Sync {
    async fn get_announcement_by_id(&self, id: Uuid) -> ServiceResult<Announcement>;
    async fn get_announcements(&self, input: GetAnnouncementsInput) -> ServiceResult<ResultPage<Announcement>>;
    async fn create_announcement(&self, input: CreateAnnouncementInput) -> ServiceResult<Announcement>;
    async fn update_announcement(&self, announcement: Announcement) -> ServiceResult<Announcement>;
    async fn delete_announcement(&self, announcement: &Announcement) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct GetFederatedRegistriesInput {
    pub pagination: PaginationOptions,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateFederatedRegistryInput {
    pub hostname: String,
    pub group_id: Uuid,
    pub audience: String,
}

#[async_trait]
pub trait FederatedRegistryService: Send + Sync {
    async fn get_federated_registry_by_id(&self, id: Uuid) -> ServiceResult<FederatedRegistry>;
    async fn get_federated_registries(
        &self,
        input: GetFederatedRegistriesInput,
    ) -> ServiceResult<ResultPage<FederatedRegistry>>;
    async fn create_federated_registry(
        &self,
        input: CreateFederatedRegistryInput,
    ) -> ServiceResult<FederatedRegistry>;
    async fn update_federated_registry(&self, registry: FederatedRegistry) -> ServiceResult<FederatedRegistry>;
    async fn delete_federated_registry(&self, registry: &FederatedRegistry) -> ServiceResult<()>;
}

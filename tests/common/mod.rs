//! In-memory service layer for schema tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use controlplane_graphql::models::*;
use controlplane_graphql::pagination::{CursorPosition, PaginationOptions, ResultPage, ResultPageInfo};
use controlplane_graphql::services::*;
use controlplane_graphql::{build_schema, ApiConfig, Caller, RequestState, ResourceType, ServiceError, Services, Trn};

pub trait Model: Clone {
    fn metadata(&self) -> &ResourceMetadata;
}

macro_rules! impl_model {
    ($($ty:ty),*) => {
        $(impl Model for $ty {
            fn metadata(&self) -> &ResourceMetadata {
                &self.metadata
            }
        })*
    };
}

impl_model!(
    Group,
    Workspace,
    User,
    ServiceAccount,
    Team,
    TeamMember,
    ManagedIdentity,
    ManagedIdentityAccessRule,
    Runner,
    Announcement,
    FederatedRegistry
);

pub fn metadata(resource_type: ResourceType, path: &str) -> ResourceMetadata {
    let now = Utc::now();
    ResourceMetadata {
        id: Uuid::new_v4(),
        version: 1,
        trn: Trn::new(resource_type, path).to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn find<T: Model>(table: &Mutex<Vec<T>>, id: Uuid, kind: &str) -> ServiceResult<T> {
    table
        .lock()
        .unwrap()
        .iter()
        .find(|item| item.metadata().id == id)
        .cloned()
        .ok_or_else(|| ServiceError::not_found(format!("{} {} not found", kind, id)))
}

fn find_many<T: Model>(table: &Mutex<Vec<T>>, ids: &[Uuid]) -> Vec<T> {
    table
        .lock()
        .unwrap()
        .iter()
        .filter(|item| ids.contains(&item.metadata().id))
        .cloned()
        .collect()
}

fn filtered<T: Model>(table: &Mutex<Vec<T>>, keep: impl Fn(&T) -> bool) -> Vec<T> {
    table.lock().unwrap().iter().filter(|item| keep(item)).cloned().collect()
}

fn replace<T: Model>(table: &Mutex<Vec<T>>, mut item: T, kind: &str, bump: impl FnOnce(&mut T)) -> ServiceResult<T> {
    let mut items = table.lock().unwrap();
    let slot = items
        .iter_mut()
        .find(|existing| existing.metadata().id == item.metadata().id)
        .ok_or_else(|| ServiceError::not_found(format!("{} not found", kind)))?;
    if slot.metadata().version != item.metadata().version {
        return Err(ServiceError::optimistic_lock(format!("{} was modified concurrently", kind)));
    }
    bump(&mut item);
    *slot = item.clone();
    Ok(item)
}

fn remove<T: Model>(table: &Mutex<Vec<T>>, item: &T, kind: &str) -> ServiceResult<()> {
    let mut items = table.lock().unwrap();
    let index = items
        .iter()
        .position(|existing| existing.metadata().id == item.metadata().id)
        .ok_or_else(|| ServiceError::not_found(format!("{} not found", kind)))?;
    if items[index].metadata().version != item.metadata().version {
        return Err(ServiceError::optimistic_lock(format!("{} was modified concurrently", kind)));
    }
    items.remove(index);
    Ok(())
}

/// Page through `items` in their stored order
pub fn paginate<T: Model>(items: Vec<T>, options: &PaginationOptions) -> ServiceResult<ResultPage<T>> {
    let position = |cursor: &Option<String>| -> ServiceResult<Option<usize>> {
        match cursor {
            Some(cursor) => {
                let cursor = CursorPosition::decode(cursor).map_err(|e| ServiceError::invalid(e.to_string()))?;
                Ok(items.iter().position(|item| item.metadata().id == cursor.id))
            }
            None => Ok(None),
        }
    };

    let start = position(&options.after)?.map(|i| i + 1).unwrap_or(0);
    let end = position(&options.before)?.unwrap_or(items.len()).max(start);
    let window = &items[start..end];

    let (selected, has_next_page, has_previous_page) = match (options.first, options.last) {
        (_, Some(last)) => {
            let from = window.len().saturating_sub(last as usize);
            (window[from..].to_vec(), end < items.len(), from > 0)
        }
        (first, None) => {
            let count = first.map(|f| f as usize).unwrap_or(window.len()).min(window.len());
            (window[..count].to_vec(), count < window.len(), start > 0)
        }
    };

    Ok(ResultPage::new(
        selected,
        ResultPageInfo {
            has_next_page,
            has_previous_page,
            total_count: items.len() as i32,
        },
    ))
}

#[derive(Default)]
pub struct CallCounts {
    pub groups_by_ids: AtomicUsize,
    pub users_by_ids: AtomicUsize,
    pub service_accounts_by_ids: AtomicUsize,
    pub teams_by_ids: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Backs every service trait with in-memory tables
#[derive(Default)]
pub struct FakeBackend {
    pub groups: Mutex<Vec<Group>>,
    pub workspaces: Mutex<Vec<Workspace>>,
    pub users: Mutex<Vec<User>>,
    pub service_accounts: Mutex<Vec<ServiceAccount>>,
    pub teams: Mutex<Vec<Team>>,
    pub team_members: Mutex<Vec<TeamMember>>,
    pub managed_identities: Mutex<Vec<ManagedIdentity>>,
    pub access_rules: Mutex<Vec<ManagedIdentityAccessRule>>,
    pub runners: Mutex<Vec<Runner>>,
    pub announcements: Mutex<Vec<Announcement>>,
    pub federated_registries: Mutex<Vec<FederatedRegistry>>,
    pub calls: CallCounts,
}

fn bump_version(metadata: &mut ResourceMetadata) {
    metadata.version += 1;
    metadata.updated_at = Utc::now();
}

impl FakeBackend {
    pub fn add_group(&self, name: &str, parent: Option<&Group>) -> Group {
        let full_path = match parent {
            Some(parent) => format!("{}/{}", parent.full_path, name),
            None => name.to_string(),
        };
        let group = Group {
            metadata: metadata(ResourceType::Group, &full_path),
            name: name.to_string(),
            description: String::new(),
            parent_id: parent.map(|p| p.metadata.id),
            full_path,
        };
        self.groups.lock().unwrap().push(group.clone());
        group
    }

    pub fn add_workspace(&self, name: &str, group: &Group) -> Workspace {
        let full_path = format!("{}/{}", group.full_path, name);
        let workspace = Workspace {
            metadata: metadata(ResourceType::Workspace, &full_path),
            name: name.to_string(),
            description: String::new(),
            group_id: group.metadata.id,
            full_path,
            max_job_duration: 720,
            prevent_destroy_plan: false,
            terraform_version: "1.5.7".to_string(),
            locked: false,
        };
        self.workspaces.lock().unwrap().push(workspace.clone());
        workspace
    }

    pub fn add_user(&self, username: &str, admin: bool) -> User {
        let user = User {
            metadata: metadata(ResourceType::User, username),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            admin,
            active: true,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn add_service_account(&self, name: &str, group: &Group) -> ServiceAccount {
        let resource_path = format!("{}/{}", group.full_path, name);
        let service_account = ServiceAccount {
            metadata: metadata(ResourceType::ServiceAccount, &resource_path),
            name: name.to_string(),
            description: String::new(),
            group_id: group.metadata.id,
            resource_path,
            created_by: "admin".to_string(),
        };
        self.service_accounts.lock().unwrap().push(service_account.clone());
        service_account
    }

    pub fn add_team(&self, name: &str) -> Team {
        let team = Team {
            metadata: metadata(ResourceType::Team, name),
            name: name.to_string(),
            description: String::new(),
            scim_external_id: None,
        };
        self.teams.lock().unwrap().push(team.clone());
        team
    }

    pub fn add_managed_identity(&self, name: &str, group: &Group) -> ManagedIdentity {
        let resource_path = format!("{}/{}", group.full_path, name);
        let identity = ManagedIdentity {
            metadata: metadata(ResourceType::ManagedIdentity, &resource_path),
            name: name.to_string(),
            description: String::new(),
            identity_type: ManagedIdentityType::AwsFederated,
            group_id: group.metadata.id,
            resource_path,
            data: "eyJyb2xlIjoiYXJuOmF3czppYW06OjEyMzQ6cm9sZS9kZXBsb3kifQ".to_string(),
            created_by: "admin".to_string(),
            alias_source_id: None,
        };
        self.managed_identities.lock().unwrap().push(identity.clone());
        identity
    }

    pub fn add_access_rule(
        &self,
        identity: &ManagedIdentity,
        run_stage: JobStage,
        users: &[&User],
    ) -> ManagedIdentityAccessRule {
        let rule = ManagedIdentityAccessRule {
            metadata: metadata(
                ResourceType::ManagedIdentityAccessRule,
                &format!("{}/{}", identity.resource_path, Uuid::new_v4()),
            ),
            managed_identity_id: identity.metadata.id,
            rule_type: AccessRuleType::EligiblePrincipals,
            run_stage,
            allowed_user_ids: users.iter().map(|u| u.metadata.id).collect(),
            allowed_service_account_ids: Vec::new(),
            allowed_team_ids: Vec::new(),
            verify_state_lineage: false,
        };
        self.access_rules.lock().unwrap().push(rule.clone());
        rule
    }

    fn insert_access_rule(&self, identity: &ManagedIdentity, spec: AccessRuleSpec) -> ManagedIdentityAccessRule {
        let mut rule = self.add_access_rule(identity, spec.run_stage, &[]);
        rule.rule_type = spec.rule_type;
        rule.allowed_user_ids = spec.allowed_user_ids;
        rule.allowed_service_account_ids = spec.allowed_service_account_ids;
        rule.allowed_team_ids = spec.allowed_team_ids;
        rule.verify_state_lineage = spec.verify_state_lineage;

        let mut rules = self.access_rules.lock().unwrap();
        if let Some(stored) = rules.iter_mut().find(|r| r.metadata.id == rule.metadata.id) {
            *stored = rule.clone();
        }
        rule
    }

    pub fn add_announcement(&self, message: &str, end_time: Option<chrono::DateTime<Utc>>) -> Announcement {
        let announcement = Announcement {
            metadata: metadata(ResourceType::Announcement, &Uuid::new_v4().to_string()),
            message: message.to_string(),
            start_time: Utc::now() - chrono::Duration::hours(1),
            end_time,
            announcement_type: AnnouncementType::Info,
            dismissible: true,
            created_by: "admin".to_string(),
        };
        self.announcements.lock().unwrap().push(announcement.clone());
        announcement
    }

    fn all_metadata(&self) -> Vec<ResourceMetadata> {
        fn collect<T: Model>(table: &Mutex<Vec<T>>, out: &mut Vec<ResourceMetadata>) {
            out.extend(table.lock().unwrap().iter().map(|item| item.metadata().clone()));
        }

        let mut out = Vec::new();
        collect(&self.groups, &mut out);
        collect(&self.workspaces, &mut out);
        collect(&self.users, &mut out);
        collect(&self.service_accounts, &mut out);
        collect(&self.teams, &mut out);
        collect(&self.managed_identities, &mut out);
        collect(&self.access_rules, &mut out);
        collect(&self.runners, &mut out);
        collect(&self.announcements, &mut out);
        collect(&self.federated_registries, &mut out);
        out
    }
}

#[async_trait]
impl ResourceResolver for FakeBackend {
    async fn resolve_trn(&self, trn: &Trn) -> ServiceResult<Uuid> {
        let trn = trn.to_string();
        self.all_metadata()
            .into_iter()
            .find(|metadata| metadata.trn == trn)
            .map(|metadata| metadata.id)
            .ok_or_else(|| ServiceError::not_found(format!("resource {} not found", trn)))
    }
}

#[async_trait]
impl GroupService for FakeBackend {
    async fn get_group_by_id(&self, id: Uuid) -> ServiceResult<Group> {
        find(&self.groups, id, "group")
    }

    async fn get_groups_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<Group>> {
        self.calls.groups_by_ids.fetch_add(1, Ordering::SeqCst);
        Ok(find_many(&self.groups, ids))
    }

    async fn get_groups(&self, input: GetGroupsInput) -> ServiceResult<ResultPage<Group>> {
        let groups = filtered(&self.groups, |g| {
            g.parent_id == input.parent_id
                && input.search.as_ref().map_or(true, |s| g.full_path.contains(s.as_str()))
        });
        paginate(groups, &input.pagination)
    }

    async fn create_group(&self, input: CreateGroupInput) -> ServiceResult<Group> {
        let parent = match input.parent_id {
            Some(id) => Some(find(&self.groups, id, "group")?),
            None => None,
        };
        let taken = self
            .groups
            .lock()
            .unwrap()
            .iter()
            .any(|g| g.parent_id == input.parent_id && g.name == input.name);
        if taken {
            return Err(ServiceError::conflict(format!("group {} already exists", input.name)));
        }
        let mut group = self.add_group(&input.name, parent.as_ref());
        group.description = input.description;
        replace(&self.groups, group, "group", |_| {})
    }

    async fn update_group(&self, group: Group) -> ServiceResult<Group> {
        replace(&self.groups, group, "group", |g| bump_version(&mut g.metadata))
    }

    async fn delete_group(&self, group: &Group, force: bool) -> ServiceResult<()> {
        let has_children = self
            .workspaces
            .lock()
            .unwrap()
            .iter()
            .any(|w| w.group_id == group.metadata.id);
        if has_children && !force {
            return Err(ServiceError::conflict("group is not empty"));
        }
        remove(&self.groups, group, "group")
    }
}

#[async_trait]
impl WorkspaceService for FakeBackend {
    async fn get_workspace_by_id(&self, id: Uuid) -> ServiceResult<Workspace> {
        find(&self.workspaces, id, "workspace")
    }

    async fn get_workspaces_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<Workspace>> {
        Ok(find_many(&self.workspaces, ids))
    }

    async fn get_workspaces(&self, input: GetWorkspacesInput) -> ServiceResult<ResultPage<Workspace>> {
        let workspaces = filtered(&self.workspaces, |w| {
            input.group_id.map_or(true, |id| w.group_id == id)
                && input.search.as_ref().map_or(true, |s| w.full_path.contains(s.as_str()))
        });
        paginate(workspaces, &input.pagination)
    }

    async fn create_workspace(&self, input: CreateWorkspaceInput) -> ServiceResult<Workspace> {
        let group = find(&self.groups, input.group_id, "group")?;
        let mut workspace = self.add_workspace(&input.name, &group);
        workspace.description = input.description;
        workspace.prevent_destroy_plan = input.prevent_destroy_plan;
        if let Some(duration) = input.max_job_duration {
            workspace.max_job_duration = duration;
        }
        if let Some(version) = input.terraform_version {
            workspace.terraform_version = version;
        }
        replace(&self.workspaces, workspace, "workspace", |_| {})
    }

    async fn update_workspace(&self, workspace: Workspace) -> ServiceResult<Workspace> {
        replace(&self.workspaces, workspace, "workspace", |w| bump_version(&mut w.metadata))
    }

    async fn delete_workspace(&self, workspace: &Workspace, _force: bool) -> ServiceResult<()> {
        remove(&self.workspaces, workspace, "workspace")
    }
}

#[async_trait]
impl UserService for FakeBackend {
    async fn get_user_by_id(&self, id: Uuid) -> ServiceResult<User> {
        find(&self.users, id, "user")
    }

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<User>> {
        self.calls.users_by_ids.fetch_add(1, Ordering::SeqCst);
        Ok(find_many(&self.users, ids))
    }

    async fn get_users(&self, input: GetUsersInput) -> ServiceResult<ResultPage<User>> {
        let users = filtered(&self.users, |u| {
            input.search.as_ref().map_or(true, |s| u.username.contains(s.as_str()))
        });
        paginate(users, &input.pagination)
    }
}

#[async_trait]
impl ServiceAccountService for FakeBackend {
    async fn get_service_account_by_id(&self, id: Uuid) -> ServiceResult<ServiceAccount> {
        find(&self.service_accounts, id, "service account")
    }

    async fn get_service_accounts_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<ServiceAccount>> {
        self.calls.service_accounts_by_ids.fetch_add(1, Ordering::SeqCst);
        Ok(find_many(&self.service_accounts, ids))
    }

    async fn get_service_accounts(
        &self,
        input: GetServiceAccountsInput,
    ) -> ServiceResult<ResultPage<ServiceAccount>> {
        let accounts = filtered(&self.service_accounts, |sa| {
            input.group_id.map_or(true, |id| sa.group_id == id)
        });
        paginate(accounts, &input.pagination)
    }

    async fn create_service_account(&self, input: CreateServiceAccountInput) -> ServiceResult<ServiceAccount> {
        let group = find(&self.groups, input.group_id, "group")?;
        Ok(self.add_service_account(&input.name, &group))
    }

    async fn delete_service_account(&self, service_account: &ServiceAccount) -> ServiceResult<()> {
        remove(&self.service_accounts, service_account, "service account")
    }
}

#[async_trait]
impl TeamService for FakeBackend {
    async fn get_team_by_id(&self, id: Uuid) -> ServiceResult<Team> {
        find(&self.teams, id, "team")
    }

    async fn get_teams_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<Team>> {
        self.calls.teams_by_ids.fetch_add(1, Ordering::SeqCst);
        Ok(find_many(&self.teams, ids))
    }

    async fn get_teams(&self, input: GetTeamsInput) -> ServiceResult<ResultPage<Team>> {
        let member_of: Option<Vec<Uuid>> = input.user_id.map(|user_id| {
            filtered(&self.team_members, |m| m.user_id == user_id)
                .into_iter()
                .map(|m| m.team_id)
                .collect()
        });
        let teams = filtered(&self.teams, |t| {
            member_of.as_ref().map_or(true, |ids| ids.contains(&t.metadata.id))
        });
        paginate(teams, &input.pagination)
    }

    async fn get_team_members(&self, input: GetTeamMembersInput) -> ServiceResult<ResultPage<TeamMember>> {
        let members = filtered(&self.team_members, |m| {
            input.team_id.map_or(true, |id| m.team_id == id) && input.user_id.map_or(true, |id| m.user_id == id)
        });
        paginate(members, &input.pagination)
    }

    async fn create_team(&self, input: CreateTeamInput) -> ServiceResult<Team> {
        let mut team = self.add_team(&input.name);
        team.description = input.description;
        replace(&self.teams, team, "team", |_| {})
    }

    async fn delete_team(&self, team: &Team) -> ServiceResult<()> {
        remove(&self.teams, team, "team")
    }

    async fn add_user_to_team(&self, input: AddUserToTeamInput) -> ServiceResult<TeamMember> {
        let team = find(&self.teams, input.team_id, "team")?;
        let user = find(&self.users, input.user_id, "user")?;
        let member = TeamMember {
            metadata: metadata(
                ResourceType::TeamMember,
                &format!("{}/{}", team.name, user.username),
            ),
            user_id: input.user_id,
            team_id: input.team_id,
            is_maintainer: input.is_maintainer,
        };
        self.team_members.lock().unwrap().push(member.clone());
        Ok(member)
    }
}

#[async_trait]
impl ManagedIdentityService for FakeBackend {
    async fn get_managed_identity_by_id(&self, id: Uuid) -> ServiceResult<ManagedIdentity> {
        find(&self.managed_identities, id, "managed identity")
    }

    async fn get_managed_identities_by_ids(&self, ids: &[Uuid]) -> ServiceResult<Vec<ManagedIdentity>> {
        Ok(find_many(&self.managed_identities, ids))
    }

    async fn get_managed_identities(
        &self,
        input: GetManagedIdentitiesInput,
    ) -> ServiceResult<ResultPage<ManagedIdentity>> {
        let identities = filtered(&self.managed_identities, |mi| {
            input.group_id.map_or(true, |id| mi.group_id == id)
        });
        paginate(identities, &input.pagination)
    }

    async fn create_managed_identity(
        &self,
        input: CreateManagedIdentityInput,
    ) -> ServiceResult<ManagedIdentity> {
        let group = find(&self.groups, input.group_id, "group")?;
        let mut identity = self.add_managed_identity(&input.name, &group);
        identity.description = input.description;
        identity.identity_type = input.identity_type;
        identity.data = input.data;
        let identity = replace(&self.managed_identities, identity, "managed identity", |_| {})?;
        for rule in input.access_rules {
            self.insert_access_rule(&identity, rule);
        }
        Ok(identity)
    }

    async fn update_managed_identity(&self, identity: ManagedIdentity) -> ServiceResult<ManagedIdentity> {
        replace(&self.managed_identities, identity, "managed identity", |mi| {
            bump_version(&mut mi.metadata)
        })
    }

    async fn delete_managed_identity(&self, identity: &ManagedIdentity, _force: bool) -> ServiceResult<()> {
        remove(&self.managed_identities, identity, "managed identity")
    }

    async fn get_access_rule_by_id(&self, id: Uuid) -> ServiceResult<ManagedIdentityAccessRule> {
        find(&self.access_rules, id, "access rule")
    }

    async fn get_access_rules(&self, managed_identity_id: Uuid) -> ServiceResult<Vec<ManagedIdentityAccessRule>> {
        Ok(filtered(&self.access_rules, |r| r.managed_identity_id == managed_identity_id))
    }

    async fn create_access_rule(&self, input: CreateAccessRuleInput) -> ServiceResult<ManagedIdentityAccessRule> {
        let identity = find(&self.managed_identities, input.managed_identity_id, "managed identity")?;
        Ok(self.insert_access_rule(&identity, input.rule))
    }

    async fn delete_access_rule(&self, rule: &ManagedIdentityAccessRule) -> ServiceResult<()> {
        remove(&self.access_rules, rule, "access rule")
    }
}

#[async_trait]
impl RunnerService for FakeBackend {
    async fn get_runner_by_id(&self, id: Uuid) -> ServiceResult<Runner> {
        find(&self.runners, id, "runner")
    }

    async fn get_runners(&self, input: GetRunnersInput) -> ServiceResult<ResultPage<Runner>> {
        let runners = filtered(&self.runners, |r| {
            input.group_id.map_or(true, |id| r.group_id == Some(id))
                && input.runner_type.map_or(true, |t| r.runner_type == t)
        });
        paginate(runners, &input.pagination)
    }

    async fn create_runner(&self, input: CreateRunnerInput) -> ServiceResult<Runner> {
        let (runner_type, resource_path) = match input.group_id {
            Some(id) => {
                let group = find(&self.groups, id, "group")?;
                (RunnerType::Group, format!("{}/{}", group.full_path, input.name))
            }
            None => (RunnerType::Shared, input.name.clone()),
        };
        let runner = Runner {
            metadata: metadata(ResourceType::Runner, &resource_path),
            name: input.name,
            description: input.description,
            runner_type,
            group_id: input.group_id,
            resource_path,
            disabled: input.disabled,
            tags: input.tags,
            run_untagged_jobs: input.run_untagged_jobs,
            created_by: "admin".to_string(),
        };
        self.runners.lock().unwrap().push(runner.clone());
        Ok(runner)
    }

    async fn update_runner(&self, runner: Runner) -> ServiceResult<Runner> {
        replace(&self.runners, runner, "runner", |r| bump_version(&mut r.metadata))
    }

    async fn delete_runner(&self, runner: &Runner) -> ServiceResult<()> {
        remove(&self.runners, runner, "runner")
    }
}

#[async_trait]
impl AnnouncementService for FakeBackend {
    async fn get_announcement_by_id(&self, id: Uuid) -> ServiceResult<Announcement> {
        find(&self.announcements, id, "announcement")
    }

    async fn get_announcements(&self, input: GetAnnouncementsInput) -> ServiceResult<ResultPage<Announcement>> {
        let now = Utc::now();
        let announcements = filtered(&self.announcements, |a| {
            input.active.map_or(true, |active| a.is_active(now) == active)
        });
        paginate(announcements, &input.pagination)
    }

    async fn create_announcement(&self, input: CreateAnnouncementInput) -> ServiceResult<Announcement> {
        let start_time = input.start_time.unwrap_or_else(Utc::now);
        if input.end_time.is_some_and(|end| end <= start_time) {
            return Err(ServiceError::invalid("end time must be after start time"));
        }
        let mut announcement = self.add_announcement(&input.message, input.end_time);
        announcement.start_time = start_time;
        announcement.announcement_type = input.announcement_type;
        announcement.dismissible = input.dismissible;
        replace(&self.announcements, announcement, "announcement", |_| {})
    }

    async fn update_announcement(&self, announcement: Announcement) -> ServiceResult<Announcement> {
        replace(&self.announcements, announcement, "announcement", |a| {
            bump_version(&mut a.metadata)
        })
    }

    async fn delete_announcement(&self, announcement: &Announcement) -> ServiceResult<()> {
        remove(&self.announcements, announcement, "announcement")
    }
}

#[async_trait]
impl FederatedRegistryService for FakeBackend {
    async fn get_federated_registry_by_id(&self, id: Uuid) -> ServiceResult<FederatedRegistry> {
        find(&self.federated_registries, id, "federated registry")
    }

    async fn get_federated_registries(
        &self,
        input: GetFederatedRegistriesInput,
    ) -> ServiceResult<ResultPage<FederatedRegistry>> {
        let registries = filtered(&self.federated_registries, |r| {
            input.group_id.map_or(true, |id| r.group_id == id)
        });
        paginate(registries, &input.pagination)
    }

    async fn create_federated_registry(
        &self,
        input: CreateFederatedRegistryInput,
    ) -> ServiceResult<FederatedRegistry> {
        let group = find(&self.groups, input.group_id, "group")?;
        let registry = FederatedRegistry {
            metadata: metadata(
                ResourceType::FederatedRegistry,
                &format!("{}/{}", group.full_path, input.hostname),
            ),
            hostname: input.hostname,
            group_id: input.group_id,
            audience: input.audience,
        };
        self.federated_registries.lock().unwrap().push(registry.clone());
        Ok(registry)
    }

    async fn update_federated_registry(&self, registry: FederatedRegistry) -> ServiceResult<FederatedRegistry> {
        replace(&self.federated_registries, registry, "federated registry", |r| {
            bump_version(&mut r.metadata)
        })
    }

    async fn delete_federated_registry(&self, registry: &FederatedRegistry) -> ServiceResult<()> {
        remove(&self.federated_registries, registry, "federated registry")
    }
}

pub fn services(backend: &Arc<FakeBackend>) -> Arc<Services> {
    Arc::new(Services {
        groups: backend.clone(),
        workspaces: backend.clone(),
        users: backend.clone(),
        service_accounts: backend.clone(),
        teams: backend.clone(),
        managed_identities: backend.clone(),
        runners: backend.clone(),
        announcements: backend.clone(),
        federated_registries: backend.clone(),
        resources: backend.clone(),
    })
}

/// Execute `query` as `caller` and return the response as JSON
pub async fn execute_with(
    backend: &Arc<FakeBackend>,
    config: ApiConfig,
    caller: Caller,
    query: &str,
) -> (Value, Vec<async_graphql::ServerError>) {
    let schema = build_schema(&config);
    let state = RequestState::new(services(backend), caller, Arc::new(config));
    let response = schema.execute(async_graphql::Request::new(query).data(state)).await;
    let data = serde_json::to_value(&response.data).unwrap();
    (data, response.errors)
}

pub async fn execute(backend: &Arc<FakeBackend>, caller: Caller, query: &str) -> (Value, Vec<async_graphql::ServerError>) {
    execute_with(backend, ApiConfig::default(), caller, query).await
}

use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};

use super::group::GroupNode;
use super::member::Member;
use super::service_account::ServiceAccountNode;
use super::team::TeamNode;
use super::user::UserNode;
use super::{apply_version, name_sort_value, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::loaders::{load_all, load_required};
use crate::models::{
    AccessRuleType, JobStage, ManagedIdentity, ManagedIdentityAccessRule, ManagedIdentityType,
};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{
    AccessRuleSpec, CreateAccessRuleInput, CreateManagedIdentityInput, GetManagedIdentitiesInput,
};
use crate::ResultExt;

#[derive(Clone)]
pub struct ManagedIdentityNode {
    model: ManagedIdentity,
    state: Arc<RequestState>,
}

impl ManagedIdentityNode {
    pub(crate) fn new(model: ManagedIdentity, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &ManagedIdentity {
        &self.model
    }
}

#[Object(name = "ManagedIdentity")]
impl ManagedIdentityNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::ManagedIdentity, self.model.metadata.id))
    }

    async fn metadata(&self) -> MetadataNode {
        MetadataNode::from(&self.model.metadata)
    }

    async fn name(&self) -> &str {
        &self.model.name
    }

    async fn description(&self) -> &str {
        &self.model.description
    }

    #[graphql(name = "type")]
    async fn identity_type(&self) -> ManagedIdentityType {
        self.model.identity_type
    }

    async fn resource_path(&self) -> &str {
        &self.model.resource_path
    }

    /// Base64 encoded provider settings
    async fn data(&self) -> &str {
        &self.model.data
    }

    async fn created_by(&self) -> &str {
        &self.model.created_by
    }

    async fn is_alias(&self) -> bool {
        self.model.is_alias()
    }

    async fn group(&self) -> async_graphql::Result<GroupNode> {
        let group = load_required(&self.state.loaders.groups, self.model.group_id)
            .await
            .into_field()?;
        Ok(GroupNode::new(group, self.state.clone()))
    }

    /// Identity this alias points at, `null` unless this is an alias
    async fn alias_source(&self) -> async_graphql::Result<Option<ManagedIdentityNode>> {
        let Some(source_id) = self.model.alias_source_id else {
            return Ok(None);
        };
        let source = load_required(&self.state.loaders.managed_identities, source_id)
            .await
            .into_field()?;
        Ok(Some(ManagedIdentityNode::new(source, self.state.clone())))
    }

    async fn access_rules(&self) -> async_graphql::Result<Vec<ManagedIdentityAccessRuleNode>> {
        // Aliases share the rules of their source identity
        let identity_id = self.model.alias_source_id.unwrap_or(self.model.metadata.id);
        let rules = self
            .state
            .services
            .managed_identities
            .get_access_rules(identity_id)
            .await
            .into_field()?;
        Ok(rules
            .into_iter()
            .map(|rule| ManagedIdentityAccessRuleNode::new(rule, self.state.clone()))
            .collect())
    }
}

#[derive(Clone)]
pub struct ManagedIdentityAccessRuleNode {
    model: ManagedIdentityAccessRule,
    state: Arc<RequestState>,
}

impl ManagedIdentityAccessRuleNode {
    pub(crate) fn new(model: ManagedIdentityAccessRule, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    async fn users(&self) -> crate::Result<Vec<UserNode>> {
        let users = load_all(&self.state.loaders.users, &self.model.allowed_user_ids).await?;
        Ok(users.into_iter().map(|u| UserNode::new(u, self.state.clone())).collect())
    }

    async fn service_accounts(&self) -> crate::Result<Vec<ServiceAccountNode>> {
        let accounts = load_all(
            &self.state.loaders.service_accounts,
            &self.model.allowed_service_account_ids,
        )
        .await?;
        Ok(accounts
            .into_iter()
            .map(|sa| ServiceAccountNode::new(sa, self.state.clone()))
            .collect())
    }

    async fn teams(&self) -> crate::Result<Vec<TeamNode>> {
        let teams = load_all(&self.state.loaders.teams, &self.model.allowed_team_ids).await?;
        Ok(teams.into_iter().map(|t| TeamNode::new(t, self.state.clone())).collect())
    }
}

#[Object(name = "ManagedIdentityAccessRule")]
impl ManagedIdentityAccessRuleNode {
    async fn id(&self) -> ID {
        ID(to_global_id(
            ResourceType::ManagedIdentityAccessRule,
            self.model.metadata.id,
        ))
    }

    async fn metadata(&self) -> MetadataNode {
        MetadataNode::from(&self.model.metadata)
    }

    #[graphql(name = "type")]
    async fn rule_type(&self) -> AccessRuleType {
        self.model.rule_type
    }

    async fn run_stage(&self) -> JobStage {
        self.model.run_stage
    }

    async fn verify_state_lineage(&self) -> bool {
        self.model.verify_state_lineage
    }

    async fn managed_identity(&self) -> async_graphql::Result<ManagedIdentityNode> {
        let identity = load_required(&self.state.loaders.managed_identities, self.model.managed_identity_id)
            .await
            .into_field()?;
        Ok(ManagedIdentityNode::new(identity, self.state.clone()))
    }

    async fn allowed_users(&self) -> async_graphql::Result<Vec<UserNode>> {
        self.users().await.into_field()
    }

    async fn allowed_service_accounts(&self) -> async_graphql::Result<Vec<ServiceAccountNode>> {
        self.service_accounts().await.into_field()
    }

    async fn allowed_teams(&self) -> async_graphql::Result<Vec<TeamNode>> {
        self.teams().await.into_field()
    }

    /// Every principal the rule allows, users first, then service accounts, then teams
    async fn allowed_principals(&self) -> async_graphql::Result<Vec<Member>> {
        let (users, service_accounts, teams) =
            tokio::try_join!(self.users(), self.service_accounts(), self.teams()).into_field()?;

        Ok(users
            .into_iter()
            .map(Member::User)
            .chain(service_accounts.into_iter().map(Member::ServiceAccount))
            .chain(teams.into_iter().map(Member::Team))
            .collect())
    }
}

pub(crate) async fn managed_identity_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetManagedIdentitiesInput,
) -> crate::Result<Connection<ManagedIdentityNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let sort = input.sort;
    let page = state.services.managed_identities.get_managed_identities(input).await?;
    Connection::from_page(
        page,
        |identity: &ManagedIdentity| {
            let sort_value =
                sort.map(|sort| name_sort_value(sort, &identity.name, identity.metadata.updated_at));
            CursorPosition::new(identity.metadata.id, sort_value).encode()
        },
        |identity| ManagedIdentityNode::new(identity, state.clone()),
    )
}

pub(crate) async fn fetch_managed_identity(state: &RequestState, id: &str) -> crate::Result<ManagedIdentity> {
    let identity_id = state.resolve_id(id, ResourceType::ManagedIdentity).await?;
    Ok(state
        .services
        .managed_identities
        .get_managed_identity_by_id(identity_id)
        .await?)
}

pub(crate) async fn fetch_access_rule(state: &RequestState, id: &str) -> crate::Result<ManagedIdentityAccessRule> {
    let rule_id = state
        .resolve_id(id, ResourceType::ManagedIdentityAccessRule)
        .await?;
    Ok(state.services.managed_identities.get_access_rule_by_id(rule_id).await?)
}

#[derive(Default)]
pub struct ManagedIdentityQuery;

#[Object]
impl ManagedIdentityQuery {
    /// Look up a managed identity by TRN or global ID
    async fn managed_identity(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<Option<ManagedIdentityNode>> {
        let state = RequestState::from_context(ctx)?;
        let identity = not_found_as_none(fetch_managed_identity(&state, &id).await).into_field()?;
        Ok(identity.map(|identity| ManagedIdentityNode::new(identity, state.clone())))
    }

    async fn managed_identity_access_rule(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<Option<ManagedIdentityAccessRuleNode>> {
        let state = RequestState::from_context(ctx)?;
        let rule = not_found_as_none(fetch_access_rule(&state, &id).await).into_field()?;
        Ok(rule.map(|rule| ManagedIdentityAccessRuleNode::new(rule, state.clone())))
    }
}

#[derive(InputObject)]
#[graphql(name = "ManagedIdentityAccessRuleInput")]
pub struct AccessRuleArgs {
    #[graphql(name = "type")]
    pub rule_type: AccessRuleType,
    pub run_stage: JobStage,
    pub allowed_users: Option<Vec<String>>,
    pub allowed_service_accounts: Option<Vec<String>>,
    pub allowed_teams: Option<Vec<String>>,
    pub verify_state_lineage: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "CreateManagedIdentityInput")]
pub struct CreateManagedIdentityArgs {
    pub client_mutation_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[graphql(name = "type")]
    pub identity_type: ManagedIdentityType,
    pub group_id: String,
    pub data: String,
    pub access_rules: Option<Vec<AccessRuleArgs>>,
}

#[derive(InputObject)]
#[graphql(name = "UpdateManagedIdentityInput")]
pub struct UpdateManagedIdentityArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub data: Option<String>,
}

#[derive(InputObject)]
#[graphql(name = "DeleteManagedIdentityInput")]
pub struct DeleteManagedIdentityArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub force: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "CreateManagedIdentityAccessRuleInput")]
pub struct CreateAccessRuleArgs {
    pub client_mutation_id: Option<String>,
    pub managed_identity_id: String,
    #[graphql(flatten)]
    pub rule: AccessRuleArgs,
}

#[derive(InputObject)]
#[graphql(name = "DeleteManagedIdentityAccessRuleInput")]
pub struct DeleteAccessRuleArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
}

#[derive(SimpleObject)]
pub struct ManagedIdentityMutationPayload {
    pub client_mutation_id: Option<String>,
    pub managed_identity: Option<ManagedIdentityNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for ManagedIdentityMutationPayload {
    type Node = ManagedIdentityNode;

    fn build(
        client_mutation_id: Option<String>,
        managed_identity: Option<ManagedIdentityNode>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            client_mutation_id,
            managed_identity,
            problems,
        }
    }
}

#[derive(SimpleObject)]
pub struct ManagedIdentityAccessRuleMutationPayload {
    pub client_mutation_id: Option<String>,
    pub access_rule: Option<ManagedIdentityAccessRuleNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for ManagedIdentityAccessRuleMutationPayload {
    type Node = ManagedIdentityAccessRuleNode;

    fn build(
        client_mutation_id: Option<String>,
        access_rule: Option<ManagedIdentityAccessRuleNode>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            client_mutation_id,
            access_rule,
            problems,
        }
    }
}

#[derive(Default)]
pub struct ManagedIdentityMutation;

#[Object]
impl ManagedIdentityMutation {
    async fn create_managed_identity(
        &self,
        ctx: &Context<'_>,
        input: CreateManagedIdentityArgs,
    ) -> async_graphql::Result<ManagedIdentityMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(ManagedIdentityMutationPayload::from_result(
            client_mutation_id,
            create_managed_identity(&state, input).await,
        ))
    }

    async fn update_managed_identity(
        &self,
        ctx: &Context<'_>,
        input: UpdateManagedIdentityArgs,
    ) -> async_graphql::Result<ManagedIdentityMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(ManagedIdentityMutationPayload::from_result(
            client_mutation_id,
            update_managed_identity(&state, input).await,
        ))
    }

    async fn delete_managed_identity(
        &self,
        ctx: &Context<'_>,
        input: DeleteManagedIdentityArgs,
    ) -> async_graphql::Result<ManagedIdentityMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(ManagedIdentityMutationPayload::from_result(
            client_mutation_id,
            delete_managed_identity(&state, input).await,
        ))
    }

    async fn create_managed_identity_access_rule(
        &self,
        ctx: &Context<'_>,
        input: CreateAccessRuleArgs,
    ) -> async_graphql::Result<ManagedIdentityAccessRuleMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(ManagedIdentityAccessRuleMutationPayload::from_result(
            client_mutation_id,
            create_access_rule(&state, input).await,
        ))
    }

    async fn delete_managed_identity_access_rule(
        &self,
        ctx: &Context<'_>,
        input: DeleteAccessRuleArgs,
    ) -> async_graphql::Result<ManagedIdentityAccessRuleMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(ManagedIdentityAccessRuleMutationPayload::from_result(
            client_mutation_id,
            delete_access_rule(&state, input).await,
        ))
    }
}

async fn resolve_ids(state: &RequestState, values: Option<Vec<String>>, expected: ResourceType) -> crate::Result<Vec<uuid::Uuid>> {
    let mut ids = Vec::new();
    for value in values.unwrap_or_default() {
        ids.push(state.resolve_id(&value, expected).await?);
    }
    Ok(ids)
}

async fn access_rule_spec(state: &RequestState, rule: AccessRuleArgs) -> crate::Result<AccessRuleSpec> {
    Ok(AccessRuleSpec {
        rule_type: rule.rule_type,
        run_stage: rule.run_stage,
        allowed_user_ids: resolve_ids(state, rule.allowed_users, ResourceType::User).await?,
        allowed_service_account_ids: resolve_ids(state, rule.allowed_service_accounts, ResourceType::ServiceAccount)
            .await?,
        allowed_team_ids: resolve_ids(state, rule.allowed_teams, ResourceType::Team).await?,
        verify_state_lineage: rule.verify_state_lineage.unwrap_or(false),
    })
}

async fn create_managed_identity(
    state: &Arc<RequestState>,
    input: CreateManagedIdentityArgs,
) -> crate::Result<ManagedIdentityNode> {
    let group_id = state.resolve_id(&input.group_id, ResourceType::Group).await?;

    // Every principal resolves before anything is written
    let mut access_rules = Vec::new();
    for rule in input.access_rules.unwrap_or_default() {
        access_rules.push(access_rule_spec(state, rule).await?);
    }

    let identity = state
        .services
        .managed_identities
        .create_managed_identity(CreateManagedIdentityInput {
            name: input.name,
            description: input.description.unwrap_or_default(),
            identity_type: input.identity_type,
            group_id,
            data: input.data,
            access_rules,
        })
        .await?;

    Ok(ManagedIdentityNode::new(identity, state.clone()))
}

async fn update_managed_identity(
    state: &Arc<RequestState>,
    input: UpdateManagedIdentityArgs,
) -> crate::Result<ManagedIdentityNode> {
    let mut identity = fetch_managed_identity(state, &input.id).await?;
    apply_version(&mut identity.metadata, input.version)?;

    if let Some(description) = input.description {
        identity.description = description;
    }
    if let Some(data) = input.data {
        identity.data = data;
    }

    let identity = state
        .services
        .managed_identities
        .update_managed_identity(identity)
        .await?;
    Ok(ManagedIdentityNode::new(identity, state.clone()))
}

async fn delete_managed_identity(
    state: &Arc<RequestState>,
    input: DeleteManagedIdentityArgs,
) -> crate::Result<ManagedIdentityNode> {
    let mut identity = fetch_managed_identity(state, &input.id).await?;
    apply_version(&mut identity.metadata, input.version)?;

    state
        .services
        .managed_identities
        .delete_managed_identity(&identity, input.force.unwrap_or(false))
        .await?;
    Ok(ManagedIdentityNode::new(identity, state.clone()))
}

async fn create_access_rule(
    state: &Arc<RequestState>,
    input: CreateAccessRuleArgs,
) -> crate::Result<ManagedIdentityAccessRuleNode> {
    let identity = fetch_managed_identity(state, &input.managed_identity_id).await?;
    if identity.is_alias() {
        return Err(crate::ServiceError::invalid("access rules cannot be added to an alias").into());
    }

    let rule = CreateAccessRuleInput {
        managed_identity_id: identity.metadata.id,
        rule: access_rule_spec(state, input.rule).await?,
    };
    let rule = state.services.managed_identities.create_access_rule(rule).await?;
    Ok(ManagedIdentityAccessRuleNode::new(rule, state.clone()))
}

async fn delete_access_rule(
    state: &Arc<RequestState>,
    input: DeleteAccessRuleArgs,
) -> crate::Result<ManagedIdentityAccessRuleNode> {
    let rule = fetch_access_rule(state, &input.id).await?;
    state.services.managed_identities.delete_access_rule(&rule).await?;
    Ok(ManagedIdentityAccessRuleNode::new(rule, state.clone()))
}

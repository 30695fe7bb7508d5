use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};

use super::federated_registry::{federated_registry_connection, FederatedRegistryNode};
use super::managed_identity::{managed_identity_connection, ManagedIdentityNode};
use super::runner::{runner_connection, RunnerNode};
use super::service_account::{service_account_connection, ServiceAccountNode};
use super::workspace::{workspace_connection, WorkspaceNode};
use super::{apply_version, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::loaders::load_required;
use crate::models::{Group, GroupSort, NameSort, WorkspaceSort};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{
    CreateGroupInput, GetFederatedRegistriesInput, GetGroupsInput, GetManagedIdentitiesInput,
    GetRunnersInput, GetServiceAccountsInput, GetWorkspacesInput,
};
use crate::ResultExt;

#[derive(Clone)]
pub struct GroupNode {
    model: Group,
    state: Arc<RequestState>,
}

impl GroupNode {
    pub(crate) fn new(model: Group, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &Group {
        &self.model
    }
}

#[Object(name = "Group")]
impl GroupNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::Group, self.model.metadata.id))
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

    async fn full_path(&self) -> &str {
        &self.model.full_path
    }

    /// Parent group, `null` for top-level groups
    async fn parent(&self) -> async_graphql::Result<Option<GroupNode>> {
        let Some(parent_id) = self.model.parent_id else {
            return Ok(None);
        };
        let parent = load_required(&self.state.loaders.groups, parent_id).await.into_field()?;
        Ok(Some(GroupNode::new(parent, self.state.clone())))
    }

    /// Direct child groups
    async fn child_groups(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<GroupSort>,
    ) -> async_graphql::Result<Connection<GroupNode>> {
        let input = GetGroupsInput {
            sort,
            parent_id: Some(self.model.metadata.id),
            ..Default::default()
        };
        group_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }

    async fn workspaces(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<WorkspaceSort>,
    ) -> async_graphql::Result<Connection<WorkspaceNode>> {
        let input = GetWorkspacesInput {
            sort,
            group_id: Some(self.model.metadata.id),
            ..Default::default()
        };
        workspace_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }

    async fn service_accounts(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
    ) -> async_graphql::Result<Connection<ServiceAccountNode>> {
        let input = GetServiceAccountsInput {
            sort,
            group_id: Some(self.model.metadata.id),
            ..Default::default()
        };
        service_account_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }

    async fn managed_identities(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
        include_inherited: Option<bool>,
    ) -> async_graphql::Result<Connection<ManagedIdentityNode>> {
        let input = GetManagedIdentitiesInput {
            sort,
            group_id: Some(self.model.metadata.id),
            include_inherited: include_inherited.unwrap_or(false),
            ..Default::default()
        };
        managed_identity_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }

    async fn runners(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
    ) -> async_graphql::Result<Connection<RunnerNode>> {
        let input = GetRunnersInput {
            sort,
            group_id: Some(self.model.metadata.id),
            ..Default::default()
        };
        runner_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }

    async fn federated_registries(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
    ) -> async_graphql::Result<Connection<FederatedRegistryNode>> {
        let input = GetFederatedRegistriesInput {
            group_id: Some(self.model.metadata.id),
            ..Default::default()
        };
        federated_registry_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

fn group_cursor(sort: Option<GroupSort>) -> impl Fn(&Group) -> crate::Result<String> {
    move |group: &Group| {
        let sort_value = sort.map(|sort| match sort {
            GroupSort::FullPathAsc | GroupSort::FullPathDesc => group.full_path.clone(),
            GroupSort::UpdatedAtAsc | GroupSort::UpdatedAtDesc => group.metadata.updated_at.to_rfc3339(),
        });
        CursorPosition::new(group.metadata.id, sort_value).encode()
    }
}

pub(crate) async fn group_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetGroupsInput,
) -> crate::Result<Connection<GroupNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let cursor = group_cursor(input.sort);
    let page = state.services.groups.get_groups(input).await?;
    Connection::from_page(page, cursor, |group| GroupNode::new(group, state.clone()))
}

pub(crate) async fn fetch_group(state: &RequestState, id: &str) -> crate::Result<Group> {
    let group_id = state.resolve_id(id, ResourceType::Group).await?;
    Ok(state.services.groups.get_group_by_id(group_id).await?)
}

#[tracing::instrument(skip(state))]
pub(crate) async fn get_group(state: &Arc<RequestState>, id: &str) -> crate::Result<Option<GroupNode>> {
    let group = not_found_as_none(fetch_group(state, id).await)?;
    Ok(group.map(|group| GroupNode::new(group, state.clone())))
}

#[derive(Default)]
pub struct GroupQuery;

#[Object]
impl GroupQuery {
    /// Look up a group by TRN or global ID
    async fn group(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<GroupNode>> {
        let state = RequestState::from_context(ctx)?;
        get_group(&state, &id).await.into_field()
    }

    /// List groups; top-level groups unless `parentId` is given
    async fn groups(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<GroupSort>,
        parent_id: Option<String>,
        search: Option<String>,
    ) -> async_graphql::Result<Connection<GroupNode>> {
        let state = RequestState::from_context(ctx)?;
        let parent_id = state
            .resolve_optional_id(parent_id.as_deref(), ResourceType::Group)
            .await
            .into_field()?;
        let input = GetGroupsInput {
            sort,
            parent_id,
            search,
            ..Default::default()
        };
        group_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(InputObject)]
#[graphql(name = "CreateGroupInput")]
pub struct CreateGroupArgs {
    pub client_mutation_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// TRN or global ID of the parent; top-level group when omitted
    pub parent_id: Option<String>,
}

#[derive(InputObject)]
#[graphql(name = "UpdateGroupInput")]
pub struct UpdateGroupArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub description: String,
}

#[derive(InputObject)]
#[graphql(name = "DeleteGroupInput")]
pub struct DeleteGroupArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub force: Option<bool>,
}

#[derive(SimpleObject)]
pub struct GroupMutationPayload {
    pub client_mutation_id: Option<String>,
    pub group: Option<GroupNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for GroupMutationPayload {
    type Node = GroupNode;

    fn build(client_mutation_id: Option<String>, group: Option<GroupNode>, problems: Vec<Problem>) -> Self {
        Self {
            client_mutation_id,
            group,
            problems,
        }
    }
}

#[derive(Default)]
pub struct GroupMutation;

#[Object]
impl GroupMutation {
    async fn create_group(
        &self,
        ctx: &Context<'_>,
        input: CreateGroupArgs,
    ) -> async_graphql::Result<GroupMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(GroupMutationPayload::from_result(
            client_mutation_id,
            create_group(&state, input).await,
        ))
    }

    async fn update_group(
        &self,
        ctx: &Context<'_>,
        input: UpdateGroupArgs,
    ) -> async_graphql::Result<GroupMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(GroupMutationPayload::from_result(
            client_mutation_id,
            update_group(&state, input).await,
        ))
    }

    async fn delete_group(
        &self,
        ctx: &Context<'_>,
        input: DeleteGroupArgs,
    ) -> async_graphql::Result<GroupMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(GroupMutationPayload::from_result(
            client_mutation_id,
            delete_group(&state, input).await,
        ))
    }
}

async fn create_group(state: &Arc<RequestState>, input: CreateGroupArgs) -> crate::Result<GroupNode> {
    let parent_id = state
        .resolve_optional_id(input.parent_id.as_deref(), ResourceType::Group)
        .await?;
    let group = state
        .services
        .groups
        .create_group(CreateGroupInput {
            name: input.name,
            description: input.description.unwrap_or_default(),
            parent_id,
        })
        .await?;
    Ok(GroupNode::new(group, state.clone()))
}

async fn update_group(state: &Arc<RequestState>, input: UpdateGroupArgs) -> crate::Result<GroupNode> {
    let mut group = fetch_group(state, &input.id).await?;
    apply_version(&mut group.metadata, input.version)?;
    group.description = input.description;

    let group = state.services.groups.update_group(group).await?;
    Ok(GroupNode::new(group, state.clone()))
}

async fn delete_group(state: &Arc<RequestState>, input: DeleteGroupArgs) -> crate::Result<GroupNode> {
    let mut group = fetch_group(state, &input.id).await?;
    apply_version(&mut group.metadata, input.version)?;

    state
        .services
        .groups
        .delete_group(&group, input.force.unwrap_or(false))
        .await?;
    Ok(GroupNode::new(group, state.clone()))
}

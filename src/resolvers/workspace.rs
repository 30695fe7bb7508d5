use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};

use super::group::GroupNode;
use super::managed_identity::{managed_identity_connection, ManagedIdentityNode};
use super::{apply_version, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::loaders::load_required;
use crate::models::{NameSort, Workspace, WorkspaceSort};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{CreateWorkspaceInput, GetManagedIdentitiesInput, GetWorkspacesInput};
use crate::ResultExt;

#[derive(Clone)]
pub struct WorkspaceNode {
    model: Workspace,
    state: Arc<RequestState>,
}

impl WorkspaceNode {
    pub(crate) fn new(model: Workspace, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &Workspace {
        &self.model
    }
}

#[Object(name = "Workspace")]
impl WorkspaceNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::Workspace, self.model.metadata.id))
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

    async fn group_path(&self) -> &str {
        self.model.group_path()
    }

    async fn group(&self) -> async_graphql::Result<GroupNode> {
        let group = load_required(&self.state.loaders.groups, self.model.group_id)
            .await
            .into_field()?;
        Ok(GroupNode::new(group, self.state.clone()))
    }

    /// Minutes a job may run before it is cancelled
    async fn max_job_duration(&self) -> i32 {
        self.model.max_job_duration
    }

    async fn prevent_destroy_plan(&self) -> bool {
        self.model.prevent_destroy_plan
    }

    async fn terraform_version(&self) -> &str {
        &self.model.terraform_version
    }

    async fn locked(&self) -> bool {
        self.model.locked
    }

    /// Managed identities available to runs in this workspace
    async fn managed_identities(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
    ) -> async_graphql::Result<Connection<ManagedIdentityNode>> {
        let input = GetManagedIdentitiesInput {
            sort,
            group_id: Some(self.model.group_id),
            include_inherited: true,
            ..Default::default()
        };
        managed_identity_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

fn workspace_cursor(sort: Option<WorkspaceSort>) -> impl Fn(&Workspace) -> crate::Result<String> {
    move |workspace: &Workspace| {
        let sort_value = sort.map(|sort| match sort {
            WorkspaceSort::FullPathAsc | WorkspaceSort::FullPathDesc => workspace.full_path.clone(),
            WorkspaceSort::UpdatedAtAsc | WorkspaceSort::UpdatedAtDesc => {
                workspace.metadata.updated_at.to_rfc3339()
            }
        });
        CursorPosition::new(workspace.metadata.id, sort_value).encode()
    }
}

pub(crate) async fn workspace_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetWorkspacesInput,
) -> crate::Result<Connection<WorkspaceNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let cursor = workspace_cursor(input.sort);
    let page = state.services.workspaces.get_workspaces(input).await?;
    Connection::from_page(page, cursor, |workspace| WorkspaceNode::new(workspace, state.clone()))
}

pub(crate) async fn fetch_workspace(state: &RequestState, id: &str) -> crate::Result<Workspace> {
    let workspace_id = state.resolve_id(id, ResourceType::Workspace).await?;
    Ok(state.services.workspaces.get_workspace_by_id(workspace_id).await?)
}

#[tracing::instrument(skip(state))]
pub(crate) async fn get_workspace(
    state: &Arc<RequestState>,
    id: &str,
) -> crate::Result<Option<WorkspaceNode>> {
    let workspace = not_found_as_none(fetch_workspace(state, id).await)?;
    Ok(workspace.map(|workspace| WorkspaceNode::new(workspace, state.clone())))
}

#[derive(Default)]
pub struct WorkspaceQuery;

#[Object]
impl WorkspaceQuery {
    /// Look up a workspace by TRN or global ID
    async fn workspace(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<WorkspaceNode>> {
        let state = RequestState::from_context(ctx)?;
        get_workspace(&state, &id).await.into_field()
    }

    async fn workspaces(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<WorkspaceSort>,
        group_id: Option<String>,
        search: Option<String>,
    ) -> async_graphql::Result<Connection<WorkspaceNode>> {
        let state = RequestState::from_context(ctx)?;
        let group_id = state
            .resolve_optional_id(group_id.as_deref(), ResourceType::Group)
            .await
            .into_field()?;
        let input = GetWorkspacesInput {
            sort,
            group_id,
            search,
            ..Default::default()
        };
        workspace_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(InputObject)]
#[graphql(name = "CreateWorkspaceInput")]
pub struct CreateWorkspaceArgs {
    pub client_mutation_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// TRN or global ID of the group the workspace is created in
    pub group_id: String,
    pub max_job_duration: Option<i32>,
    pub terraform_version: Option<String>,
    pub prevent_destroy_plan: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "UpdateWorkspaceInput")]
pub struct UpdateWorkspaceArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub max_job_duration: Option<i32>,
    pub terraform_version: Option<String>,
    pub prevent_destroy_plan: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "DeleteWorkspaceInput")]
pub struct DeleteWorkspaceArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub force: Option<bool>,
}

#[derive(SimpleObject)]
pub struct WorkspaceMutationPayload {
    pub client_mutation_id: Option<String>,
    pub workspace: Option<WorkspaceNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for WorkspaceMutationPayload {
    type Node = WorkspaceNode;

    fn build(
        client_mutation_id: Option<String>,
        workspace: Option<WorkspaceNode>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            client_mutation_id,
            workspace,
            problems,
        }
    }
}

#[derive(Default)]
pub struct WorkspaceMutation;

#[Object]
impl WorkspaceMutation {
    async fn create_workspace(
        &self,
        ctx: &Context<'_>,
        input: CreateWorkspaceArgs,
    ) -> async_graphql::Result<WorkspaceMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(WorkspaceMutationPayload::from_result(
            client_mutation_id,
            create_workspace(&state, input).await,
        ))
    }

    async fn update_workspace(
        &self,
        ctx: &Context<'_>,
        input: UpdateWorkspaceArgs,
    ) -> async_graphql::Result<WorkspaceMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(WorkspaceMutationPayload::from_result(
            client_mutation_id,
            update_workspace(&state, input).await,
        ))
    }

    async fn delete_workspace(
        &self,
        ctx: &Context<'_>,
        input: DeleteWorkspaceArgs,
    ) -> async_graphql::Result<WorkspaceMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(WorkspaceMutationPayload::from_result(
            client_mutation_id,
            delete_workspace(&state, input).await,
        ))
    }
}

async fn create_workspace(state: &Arc<RequestState>, input: CreateWorkspaceArgs) -> crate::Result<WorkspaceNode> {
    let group_id = state.resolve_id(&input.group_id, ResourceType::Group).await?;
    let workspace = state
        .services
        .workspaces
        .create_workspace(CreateWorkspaceInput {
            name: input.name,
            description: input.description.unwrap_or_default(),
            group_id,
            max_job_duration: input.max_job_duration,
            terraform_version: input.terraform_version,
            prevent_destroy_plan: input.prevent_destroy_plan.unwrap_or(false),
        })
        .await?;
    Ok(WorkspaceNode::new(workspace, state.clone()))
}

async fn update_workspace(state: &Arc<RequestState>, input: UpdateWorkspaceArgs) -> crate::Result<WorkspaceNode> {
    let mut workspace = fetch_workspace(state, &input.id).await?;
    apply_version(&mut workspace.metadata, input.version)?;

    if let Some(description) = input.description {
        workspace.description = description;
    }
    if let Some(max_job_duration) = input.max_job_duration {
        workspace.max_job_duration = max_job_duration;
    }
    if let Some(terraform_version) = input.terraform_version {
        workspace.terraform_version = terraform_version;
    }
    if let Some(prevent_destroy_plan) = input.prevent_destroy_plan {
        workspace.prevent_destroy_plan = prevent_destroy_plan;
    }

    let workspace = state.services.workspaces.update_workspace(workspace).await?;
    Ok(WorkspaceNode::new(workspace, state.clone()))
}

async fn delete_workspace(state: &Arc<RequestState>, input: DeleteWorkspaceArgs) -> crate::Result<WorkspaceNode> {
    let mut workspace = fetch_workspace(state, &input.id).await?;
    apply_version(&mut workspace.metadata, input.version)?;

    state
        .services
        .workspaces
        .delete_workspace(&workspace, input.force.unwrap_or(false))
        .await?;
    Ok(WorkspaceNode::new(workspace, state.clone()))
}

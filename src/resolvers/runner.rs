use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};

use super::group::GroupNode;
use super::{apply_version, name_sort_value, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::loaders::load_required;
use crate::models::{NameSort, Runner, RunnerType};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{CreateRunnerInput, GetRunnersInput};
use crate::ResultExt;

#[derive(Clone)]
pub struct RunnerNode {
    model: Runner,
    state: Arc<RequestState>,
}

impl RunnerNode {
    pub(crate) fn new(model: Runner, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &Runner {
        &self.model
    }
}

#[Object(name = "Runner")]
impl RunnerNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::Runner, self.model.metadata.id))
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
    async fn runner_type(&self) -> RunnerType {
        self.model.runner_type
    }

    async fn resource_path(&self) -> &str {
        &self.model.resource_path
    }

    async fn disabled(&self) -> bool {
        self.model.disabled
    }

    async fn tags(&self) -> &[String] {
        &self.model.tags
    }

    /// Whether the runner picks up jobs that carry no tags
    async fn run_untagged_jobs(&self) -> bool {
        self.model.run_untagged_jobs
    }

    async fn created_by(&self) -> &str {
        &self.model.created_by
    }

    /// Owning group, `null` for shared runners
    async fn group(&self) -> async_graphql::Result<Option<GroupNode>> {
        let Some(group_id) = self.model.group_id else {
            return Ok(None);
        };
        let group = load_required(&self.state.loaders.groups, group_id)
            .await
            .into_field()?;
        Ok(Some(GroupNode::new(group, self.state.clone())))
    }
}

pub(crate) async fn runner_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetRunnersInput,
) -> crate::Result<Connection<RunnerNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let sort = input.sort;
    let page = state.services.runners.get_runners(input).await?;
    Connection::from_page(
        page,
        |runner: &Runner| {
            let sort_value = sort.map(|sort| name_sort_value(sort, &runner.name, runner.metadata.updated_at));
            CursorPosition::new(runner.metadata.id, sort_value).encode()
        },
        |runner| RunnerNode::new(runner, state.clone()),
    )
}

pub(crate) async fn fetch_runner(state: &RequestState, id: &str) -> crate::Result<Runner> {
    let runner_id = state.resolve_id(id, ResourceType::Runner).await?;
    Ok(state.services.runners.get_runner_by_id(runner_id).await?)
}

#[derive(Default)]
pub struct RunnerQuery;

#[Object]
impl RunnerQuery {
    async fn runner(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<RunnerNode>> {
        let state = RequestState::from_context(ctx)?;
        let runner = not_found_as_none(fetch_runner(&state, &id).await).into_field()?;
        Ok(runner.map(|runner| RunnerNode::new(runner, state.clone())))
    }

    /// Runners available to every group
    async fn shared_runners(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
    ) -> async_graphql::Result<Connection<RunnerNode>> {
        let state = RequestState::from_context(ctx)?;
        let input = GetRunnersInput {
            sort,
            runner_type: Some(RunnerType::Shared),
            ..Default::default()
        };
        runner_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(InputObject)]
#[graphql(name = "CreateRunnerInput")]
pub struct CreateRunnerArgs {
    pub client_mutation_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Creates a shared runner when omitted
    pub group_id: Option<String>,
    pub disabled: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub run_untagged_jobs: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "UpdateRunnerInput")]
pub struct UpdateRunnerArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub disabled: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub run_untagged_jobs: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "DeleteRunnerInput")]
pub struct DeleteRunnerArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
}

#[derive(SimpleObject)]
pub struct RunnerMutationPayload {
    pub client_mutation_id: Option<String>,
    pub runner: Option<RunnerNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for RunnerMutationPayload {
    type Node = RunnerNode;

    fn build(client_mutation_id: Option<String>, runner: Option<RunnerNode>, problems: Vec<Problem>) -> Self {
        Self {
            client_mutation_id,
            runner,
            problems,
        }
    }
}

#[derive(Default)]
pub struct RunnerMutation;

#[Object]
impl RunnerMutation {
    async fn create_runner(&self, ctx: &Context<'_>, input: CreateRunnerArgs) -> async_graphql::Result<RunnerMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(RunnerMutationPayload::from_result(
            client_mutation_id,
            create_runner(&state, input).await,
        ))
    }

    async fn update_runner(&self, ctx: &Context<'_>, input: UpdateRunnerArgs) -> async_graphql::Result<RunnerMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(RunnerMutationPayload::from_result(
            client_mutation_id,
            update_runner(&state, input).await,
        ))
    }

    async fn delete_runner(&self, ctx: &Context<'_>, input: DeleteRunnerArgs) -> async_graphql::Result<RunnerMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(RunnerMutationPayload::from_result(
            client_mutation_id,
            delete_runner(&state, input).await,
        ))
    }
}

async fn create_runner(state: &Arc<RequestState>, input: CreateRunnerArgs) -> crate::Result<RunnerNode> {
    let group_id = state
        .resolve_optional_id(input.group_id.as_deref(), ResourceType::Group)
        .await?;
    let runner = state
        .services
        .runners
        .create_runner(CreateRunnerInput {
            name: input.name,
            description: input.description.unwrap_or_default(),
            group_id,
            disabled: input.disabled.unwrap_or(false),
            tags: input.tags.unwrap_or_default(),
            run_untagged_jobs: input.run_untagged_jobs.unwrap_or(true),
        })
        .await?;
    Ok(RunnerNode::new(runner, state.clone()))
}

async fn update_runner(state: &Arc<RequestState>, input: UpdateRunnerArgs) -> crate::Result<RunnerNode> {
    let mut runner = fetch_runner(state, &input.id).await?;
    apply_version(&mut runner.metadata, input.version)?;

    if let Some(description) = input.description {
        runner.description = description;
    }
    if let Some(disabled) = input.disabled {
        runner.disabled = disabled;
    }
    if let Some(tags) = input.tags {
        runner.tags = tags;
    }
    if let Some(run_untagged_jobs) = input.run_untagged_jobs {
        runner.run_untagged_jobs = run_untagged_jobs;
    }

    let runner = state.services.runners.update_runner(runner).await?;
    Ok(RunnerNode::new(runner, state.clone()))
}

async fn delete_runner(state: &Arc<RequestState>, input: DeleteRunnerArgs) -> crate::Result<RunnerNode> {
    let mut runner = fetch_runner(state, &input.id).await?;
    apply_version(&mut runner.metadata, input.version)?;

    state.services.runners.delete_runner(&runner).await?;
    Ok(RunnerNode::new(runner, state.clone()))
}

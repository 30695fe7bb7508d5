use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};

use super::user::UserNode;
use super::{apply_version, name_sort_value, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::loaders::load_required;
use crate::models::{NameSort, Team, TeamMember};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{AddUserToTeamInput, CreateTeamInput, GetTeamMembersInput, GetTeamsInput};
use crate::ResultExt;

#[derive(Clone)]
pub struct TeamNode {
    model: Team,
    state: Arc<RequestState>,
}

impl TeamNode {
    pub(crate) fn new(model: Team, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &Team {
        &self.model
    }
}

#[Object(name = "Team")]
impl TeamNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::Team, self.model.metadata.id))
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

    /// Set when the team is managed through SCIM
    async fn scim_external_id(&self) -> Option<&str> {
        self.model.scim_external_id.as_deref()
    }

    async fn members(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
    ) -> async_graphql::Result<Connection<TeamMemberNode>> {
        let input = GetTeamMembersInput {
            team_id: Some(self.model.metadata.id),
            ..Default::default()
        };
        team_member_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(Clone)]
pub struct TeamMemberNode {
    model: TeamMember,
    state: Arc<RequestState>,
}

impl TeamMemberNode {
    pub(crate) fn new(model: TeamMember, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }
}

#[Object(name = "TeamMember")]
impl TeamMemberNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::TeamMember, self.model.metadata.id))
    }

    async fn metadata(&self) -> MetadataNode {
        MetadataNode::from(&self.model.metadata)
    }

    async fn is_maintainer(&self) -> bool {
        self.model.is_maintainer
    }

    async fn user(&self) -> async_graphql::Result<UserNode> {
        let user = load_required(&self.state.loaders.users, self.model.user_id)
            .await
            .into_field()?;
        Ok(UserNode::new(user, self.state.clone()))
    }

    async fn team(&self) -> async_graphql::Result<TeamNode> {
        let team = load_required(&self.state.loaders.teams, self.model.team_id)
            .await
            .into_field()?;
        Ok(TeamNode::new(team, self.state.clone()))
    }
}

pub(crate) async fn team_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetTeamsInput,
) -> crate::Result<Connection<TeamNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let sort = input.sort;
    let page = state.services.teams.get_teams(input).await?;
    Connection::from_page(
        page,
        |team: &Team| {
            let sort_value = sort.map(|sort| name_sort_value(sort, &team.name, team.metadata.updated_at));
            CursorPosition::new(team.metadata.id, sort_value).encode()
        },
        |team| TeamNode::new(team, state.clone()),
    )
}

pub(crate) async fn team_member_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetTeamMembersInput,
) -> crate::Result<Connection<TeamMemberNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let page = state.services.teams.get_team_members(input).await?;
    Connection::from_page(
        page,
        |member: &TeamMember| CursorPosition::new(member.metadata.id, None).encode(),
        |member| TeamMemberNode::new(member, state.clone()),
    )
}

pub(crate) async fn fetch_team(state: &RequestState, id: &str) -> crate::Result<Team> {
    let team_id = state.resolve_id(id, ResourceType::Team).await?;
    Ok(state.services.teams.get_team_by_id(team_id).await?)
}

#[derive(Default)]
pub struct TeamQuery;

#[Object]
impl TeamQuery {
    /// Look up a team by TRN or global ID
    async fn team(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<TeamNode>> {
        let state = RequestState::from_context(ctx)?;
        let team = not_found_as_none(fetch_team(&state, &id).await).into_field()?;
        Ok(team.map(|team| TeamNode::new(team, state.clone())))
    }

    async fn teams(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
        search: Option<String>,
    ) -> async_graphql::Result<Connection<TeamNode>> {
        let state = RequestState::from_context(ctx)?;
        let input = GetTeamsInput {
            sort,
            search,
            ..Default::default()
        };
        team_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(InputObject)]
#[graphql(name = "CreateTeamInput")]
pub struct CreateTeamArgs {
    pub client_mutation_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(InputObject)]
#[graphql(name = "DeleteTeamInput")]
pub struct DeleteTeamArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
}

#[derive(InputObject)]
#[graphql(name = "AddUserToTeamInput")]
pub struct AddUserToTeamArgs {
    pub client_mutation_id: Option<String>,
    pub team_id: String,
    pub user_id: String,
    pub is_maintainer: Option<bool>,
}

#[derive(SimpleObject)]
pub struct TeamMutationPayload {
    pub client_mutation_id: Option<String>,
    pub team: Option<TeamNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for TeamMutationPayload {
    type Node = TeamNode;

    fn build(client_mutation_id: Option<String>, team: Option<TeamNode>, problems: Vec<Problem>) -> Self {
        Self {
            client_mutation_id,
            team,
            problems,
        }
    }
}

#[derive(SimpleObject)]
pub struct TeamMemberMutationPayload {
    pub client_mutation_id: Option<String>,
    pub team_member: Option<TeamMemberNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for TeamMemberMutationPayload {
    type Node = TeamMemberNode;

    fn build(
        client_mutation_id: Option<String>,
        team_member: Option<TeamMemberNode>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            client_mutation_id,
            team_member,
            problems,
        }
    }
}

#[derive(Default)]
pub struct TeamMutation;

#[Object]
impl TeamMutation {
    async fn create_team(&self, ctx: &Context<'_>, input: CreateTeamArgs) -> async_graphql::Result<TeamMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(TeamMutationPayload::from_result(
            client_mutation_id,
            create_team(&state, input).await,
        ))
    }

    async fn delete_team(&self, ctx: &Context<'_>, input: DeleteTeamArgs) -> async_graphql::Result<TeamMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(TeamMutationPayload::from_result(
            client_mutation_id,
            delete_team(&state, input).await,
        ))
    }

    async fn add_user_to_team(
        &self,
        ctx: &Context<'_>,
        input: AddUserToTeamArgs,
    ) -> async_graphql::Result<TeamMemberMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(TeamMemberMutationPayload::from_result(
            client_mutation_id,
            add_user_to_team(&state, input).await,
        ))
    }
}

async fn create_team(state: &Arc<RequestState>, input: CreateTeamArgs) -> crate::Result<TeamNode> {
    let team = state
        .services
        .teams
        .create_team(CreateTeamInput {
            name: input.name,
            description: input.description.unwrap_or_default(),
        })
        .await?;
    Ok(TeamNode::new(team, state.clone()))
}

async fn delete_team(state: &Arc<RequestState>, input: DeleteTeamArgs) -> crate::Result<TeamNode> {
    let mut team = fetch_team(state, &input.id).await?;
    apply_version(&mut team.metadata, input.version)?;

    state.services.teams.delete_team(&team).await?;
    Ok(TeamNode::new(team, state.clone()))
}

async fn add_user_to_team(state: &Arc<RequestState>, input: AddUserToTeamArgs) -> crate::Result<TeamMemberNode> {
    let team_id = state.resolve_id(&input.team_id, ResourceType::Team).await?;
    let user_id = state.resolve_id(&input.user_id, ResourceType::User).await?;

    let member = state
        .services
        .teams
        .add_user_to_team(AddUserToTeamInput {
            team_id,
            user_id,
            is_maintainer: input.is_maintainer.unwrap_or(false),
        })
        .await?;
    Ok(TeamMemberNode::new(member, state.clone()))
}

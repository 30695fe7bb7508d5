use std::sync::Arc;

use async_graphql::{Context, Object, ID};

use super::team::{team_connection, TeamNode};
use super::MetadataNode;
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::models::{NameSort, User, UserSort};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::services::{GetTeamsInput, GetUsersInput};
use crate::ResultExt;

#[derive(Clone)]
pub struct UserNode {
    model: User,
    state: Arc<RequestState>,
}

impl UserNode {
    pub(crate) fn new(model: User, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &User {
        &self.model
    }
}

#[Object(name = "User")]
impl UserNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::User, self.model.metadata.id))
    }

    async fn metadata(&self) -> MetadataNode {
        MetadataNode::from(&self.model.metadata)
    }

    async fn username(&self) -> &str {
        &self.model.username
    }

    async fn email(&self) -> &str {
        &self.model.email
    }

    async fn admin(&self) -> bool {
        self.model.admin
    }

    async fn active(&self) -> bool {
        self.model.active
    }

    /// Teams the user is a member of
    async fn teams(
        &self,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
    ) -> async_graphql::Result<Connection<TeamNode>> {
        let input = GetTeamsInput {
            sort,
            user_id: Some(self.model.metadata.id),
            ..Default::default()
        };
        team_connection(&self.state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

fn user_cursor(sort: Option<UserSort>) -> impl Fn(&User) -> crate::Result<String> {
    move |user: &User| {
        let sort_value = sort.map(|sort| match sort {
            UserSort::UsernameAsc | UserSort::UsernameDesc => user.username.clone(),
            UserSort::UpdatedAtAsc | UserSort::UpdatedAtDesc => user.metadata.updated_at.to_rfc3339(),
        });
        CursorPosition::new(user.metadata.id, sort_value).encode()
    }
}

pub(crate) async fn user_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetUsersInput,
) -> crate::Result<Connection<UserNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let cursor = user_cursor(input.sort);
    let page = state.services.users.get_users(input).await?;
    Connection::from_page(page, cursor, |user| UserNode::new(user, state.clone()))
}

pub(crate) async fn fetch_user(state: &RequestState, id: &str) -> crate::Result<User> {
    let user_id = state.resolve_id(id, ResourceType::User).await?;
    Ok(state.services.users.get_user_by_id(user_id).await?)
}

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    /// Look up a user by TRN or global ID
    async fn user(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<UserNode>> {
        let state = RequestState::from_context(ctx)?;
        let user = not_found_as_none(fetch_user(&state, &id).await).into_field()?;
        Ok(user.map(|user| UserNode::new(user, state.clone())))
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<UserSort>,
        search: Option<String>,
    ) -> async_graphql::Result<Connection<UserNode>> {
        let state = RequestState::from_context(ctx)?;
        let input = GetUsersInput {
            sort,
            search,
            ..Default::default()
        };
        user_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

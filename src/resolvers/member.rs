use async_graphql::{Context, Object, Union};

use super::service_account::ServiceAccountNode;
use super::team::TeamNode;
use super::user::UserNode;
use crate::auth::Caller;
use crate::context::RequestState;

/// A principal that can be granted access
#[derive(Union, Clone)]
pub enum Member {
    User(UserNode),
    ServiceAccount(ServiceAccountNode),
    Team(TeamNode),
}

#[derive(Default)]
pub struct MeQuery;

#[Object]
impl MeQuery {
    /// The user or service account making the request
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Member>> {
        let state = RequestState::from_context(ctx)?;
        let me = match &state.caller {
            Caller::User(user) => Some(Member::User(UserNode::new(user.clone(), state.clone()))),
            Caller::ServiceAccount(sa) => Some(Member::ServiceAccount(ServiceAccountNode::new(
                sa.clone(),
                state.clone(),
            ))),
            Caller::Anonymous => None,
        };
        Ok(me)
    }
}

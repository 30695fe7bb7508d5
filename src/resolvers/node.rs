use std::sync::Arc;

use async_graphql::{Context, Object, Union};

use super::announcement::{fetch_announcement, AnnouncementNode};
use super::federated_registry::{fetch_federated_registry, FederatedRegistryNode};
use super::group::{fetch_group, GroupNode};
use super::managed_identity::{
    fetch_access_rule, fetch_managed_identity, ManagedIdentityAccessRuleNode, ManagedIdentityNode,
};
use super::runner::{fetch_runner, RunnerNode};
use super::service_account::{fetch_service_account, ServiceAccountNode};
use super::team::{fetch_team, TeamNode};
use super::user::{fetch_user, UserNode};
use super::workspace::{fetch_workspace, WorkspaceNode};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{ResourceRef, ResourceType};
use crate::{GraphQLError, ResultExt};

/// Any resource addressable by TRN or global ID
#[derive(Union, Clone)]
pub enum Node {
    Group(GroupNode),
    Workspace(WorkspaceNode),
    User(UserNode),
    ServiceAccount(ServiceAccountNode),
    Team(TeamNode),
    ManagedIdentity(ManagedIdentityNode),
    ManagedIdentityAccessRule(ManagedIdentityAccessRuleNode),
    Runner(RunnerNode),
    Announcement(AnnouncementNode),
    FederatedRegistry(FederatedRegistryNode),
}

#[tracing::instrument(skip(state))]
async fn fetch_node(state: &Arc<RequestState>, id: &str) -> crate::Result<Node> {
    let state = state.clone();
    let node = match ResourceRef::parse(id)?.resource_type() {
        ResourceType::Group => Node::Group(GroupNode::new(fetch_group(&state, id).await?, state)),
        ResourceType::Workspace => Node::Workspace(WorkspaceNode::new(fetch_workspace(&state, id).await?, state)),
        ResourceType::User => Node::User(UserNode::new(fetch_user(&state, id).await?, state)),
        ResourceType::ServiceAccount => Node::ServiceAccount(ServiceAccountNode::new(
            fetch_service_account(&state, id).await?,
            state,
        )),
        ResourceType::Team => Node::Team(TeamNode::new(fetch_team(&state, id).await?, state)),
        ResourceType::ManagedIdentity => Node::ManagedIdentity(ManagedIdentityNode::new(
            fetch_managed_identity(&state, id).await?,
            state,
        )),
        ResourceType::ManagedIdentityAccessRule => Node::ManagedIdentityAccessRule(
            ManagedIdentityAccessRuleNode::new(fetch_access_rule(&state, id).await?, state),
        ),
        ResourceType::Runner => Node::Runner(RunnerNode::new(fetch_runner(&state, id).await?, state)),
        ResourceType::Announcement => Node::Announcement(AnnouncementNode::new(fetch_announcement(&state, id).await?)),
        ResourceType::FederatedRegistry => Node::FederatedRegistry(FederatedRegistryNode::new(
            fetch_federated_registry(&state, id).await?,
            state,
        )),
        ResourceType::TeamMember => {
            return Err(GraphQLError::InvalidId(
                "team members cannot be looked up by id".to_string(),
            ))
        }
    };
    Ok(node)
}

#[derive(Default)]
pub struct NodeQuery;

#[Object]
impl NodeQuery {
    /// Look up any resource by TRN or global ID
    async fn node(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<Node>> {
        let state = RequestState::from_context(ctx)?;
        not_found_as_none(fetch_node(&state, &id).await).into_field()
    }
}

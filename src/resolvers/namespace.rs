use std::sync::Arc;

use async_graphql::{Context, Object, Union};

use super::group::{get_group, GroupNode};
use super::workspace::{get_workspace, WorkspaceNode};
use crate::context::RequestState;
use crate::gid::{ResourceType, Trn};
use crate::ResultExt;

/// A group or a workspace
#[derive(Union, Clone)]
pub enum Namespace {
    Group(GroupNode),
    Workspace(WorkspaceNode),
}

impl Namespace {
    pub fn full_path(&self) -> &str {
        match self {
            Namespace::Group(group) => &group.model().full_path,
            Namespace::Workspace(workspace) => &workspace.model().full_path,
        }
    }
}

/// Groups and workspaces share one path space, so a path names at most one
/// of them. Groups are checked first.
#[tracing::instrument(skip(state))]
pub(crate) async fn get_namespace(state: &Arc<RequestState>, full_path: &str) -> crate::Result<Option<Namespace>> {
    let group_trn = Trn::from_full_path(ResourceType::Group, full_path)?.to_string();
    if let Some(group) = get_group(state, &group_trn).await? {
        return Ok(Some(Namespace::Group(group)));
    }

    let workspace_trn = Trn::from_full_path(ResourceType::Workspace, full_path)?.to_string();
    Ok(get_workspace(state, &workspace_trn).await?.map(Namespace::Workspace))
}

#[derive(Default)]
pub struct NamespaceQuery;

#[Object]
impl NamespaceQuery {
    /// Look up the group or workspace at a full path
    async fn namespace(&self, ctx: &Context<'_>, full_path: String) -> async_graphql::Result<Option<Namespace>> {
        let state = RequestState::from_context(ctx)?;
        get_namespace(&state, &full_path).await.into_field()
    }
}

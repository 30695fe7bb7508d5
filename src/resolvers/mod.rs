//! GraphQL resolvers, one module per domain
//!
//! Every root field reads the [`crate::RequestState`] once and hands it to the
//! nodes it builds; nodes never look at the GraphQL context themselves.

mod announcement;
mod config;
mod federated_registry;
mod group;
mod managed_identity;
mod member;
mod namespace;
mod node;
mod runner;
mod service_account;
mod team;
mod user;
mod workspace;

use async_graphql::{EmptySubscription, MergedObject, Schema, SimpleObject};

use crate::config::ApiConfig;
use crate::models::{NameSort, ResourceMetadata};
use crate::problem::{build_problem, Problem};
use crate::types::DateTime;

pub use announcement::AnnouncementNode;
pub use federated_registry::FederatedRegistryNode;
pub use group::GroupNode;
pub use managed_identity::{ManagedIdentityAccessRuleNode, ManagedIdentityNode};
pub use member::Member;
pub use namespace::Namespace;
pub use node::Node;
pub use runner::RunnerNode;
pub use service_account::ServiceAccountNode;
pub use team::{TeamMemberNode, TeamNode};
pub use user::UserNode;
pub use workspace::WorkspaceNode;

pub type ApiSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(Default, MergedObject)]
pub struct QueryRoot(
    node::NodeQuery,
    member::MeQuery,
    config::ConfigQuery,
    namespace::NamespaceQuery,
    group::GroupQuery,
    workspace::WorkspaceQuery,
    user::UserQuery,
    service_account::ServiceAccountQuery,
    team::TeamQuery,
    managed_identity::ManagedIdentityQuery,
    runner::RunnerQuery,
    announcement::AnnouncementQuery,
    federated_registry::FederatedRegistryQuery,
);

#[derive(Default, MergedObject)]
pub struct MutationRoot(
    group::GroupMutation,
    workspace::WorkspaceMutation,
    service_account::ServiceAccountMutation,
    team::TeamMutation,
    managed_identity::ManagedIdentityMutation,
    runner::RunnerMutation,
    announcement::AnnouncementMutation,
    federated_registry::FederatedRegistryMutation,
);

/// Build the API schema
///
/// Requests executed on it must carry an `Arc<RequestState>` in their data.
pub fn build_schema(config: &ApiConfig) -> ApiSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .limit_complexity(config.max_graphql_complexity as usize)
        .limit_depth(config.max_graphql_depth as usize)
        .finish()
}

/// Metadata shared by every node
#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "ResourceMetadata")]
pub struct MetadataNode {
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub version: String,
    pub trn: String,
}

impl From<&ResourceMetadata> for MetadataNode {
    fn from(metadata: &ResourceMetadata) -> Self {
        Self {
            created_at: metadata.created_at.into(),
            updated_at: metadata.updated_at.into(),
            version: metadata.version.to_string(),
            trn: metadata.trn.clone(),
        }
    }
}

/// Payload returned by a mutation
///
/// A failed mutation carries no node and exactly the problems built from
/// its error.
pub(crate) trait MutationPayload: Sized {
    type Node;

    fn build(client_mutation_id: Option<String>, node: Option<Self::Node>, problems: Vec<Problem>) -> Self;

    fn from_result(client_mutation_id: Option<String>, result: crate::Result<Self::Node>) -> Self {
        match result {
            Ok(node) => Self::build(client_mutation_id, Some(node), Vec::new()),
            Err(err) => Self::build(client_mutation_id, None, vec![build_problem(&err)]),
        }
    }
}

/// Apply the optimistic lock version a client sent with an update or delete
pub(crate) fn apply_version(metadata: &mut ResourceMetadata, version: Option<String>) -> crate::Result<()> {
    if let Some(version) = version {
        metadata.version = version.parse().map_err(|_| {
            crate::ServiceError::invalid(format!("version '{}' is not a valid integer", version))
        })?;
    }
    Ok(())
}

/// Sort value of a model in a list sorted by [`NameSort`]
pub(crate) fn name_sort_value(
    sort: NameSort,
    name: &str,
    updated_at: chrono::DateTime<chrono::Utc>,
) -> String {
    match sort {
        NameSort::NameAsc | NameSort::NameDesc => name.to_string(),
        NameSort::UpdatedAtAsc | NameSort::UpdatedAtDesc => updated_at.to_rfc3339(),
    }
}

use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};

use super::group::GroupNode;
use super::{apply_version, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::loaders::load_required;
use crate::models::FederatedRegistry;
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{CreateFederatedRegistryInput, GetFederatedRegistriesInput};
use crate::ResultExt;

/// A remote registry whose modules a group may consume
#[derive(Clone)]
pub struct FederatedRegistryNode {
    model: FederatedRegistry,
    state: Arc<RequestState>,
}

impl FederatedRegistryNode {
    pub(crate) fn new(model: FederatedRegistry, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &FederatedRegistry {
        &self.model
    }
}

#[Object(name = "FederatedRegistry")]
impl FederatedRegistryNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::FederatedRegistry, self.model.metadata.id))
    }

    async fn metadata(&self) -> MetadataNode {
        MetadataNode::from(&self.model.metadata)
    }

    async fn hostname(&self) -> &str {
        &self.model.hostname
    }

    async fn audience(&self) -> &str {
        &self.model.audience
    }

    async fn group(&self) -> async_graphql::Result<GroupNode> {
        let group = load_required(&self.state.loaders.groups, self.model.group_id)
            .await
            .into_field()?;
        Ok(GroupNode::new(group, self.state.clone()))
    }
}

pub(crate) async fn federated_registry_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetFederatedRegistriesInput,
) -> crate::Result<Connection<FederatedRegistryNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let page = state.services.federated_registries.get_federated_registries(input).await?;
    Connection::from_page(
        page,
        |registry: &FederatedRegistry| CursorPosition::new(registry.metadata.id, None).encode(),
        |registry| FederatedRegistryNode::new(registry, state.clone()),
    )
}

pub(crate) async fn fetch_federated_registry(state: &RequestState, id: &str) -> crate::Result<FederatedRegistry> {
    let registry_id = state.resolve_id(id, ResourceType::FederatedRegistry).await?;
    Ok(state
        .services
        .federated_registries
        .get_federated_registry_by_id(registry_id)
        .await?)
}

#[derive(Default)]
pub struct FederatedRegistryQuery;

#[Object]
impl FederatedRegistryQuery {
    async fn federated_registry(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<Option<FederatedRegistryNode>> {
        let state = RequestState::from_context(ctx)?;
        let registry = not_found_as_none(fetch_federated_registry(&state, &id).await).into_field()?;
        Ok(registry.map(|registry| FederatedRegistryNode::new(registry, state.clone())))
    }

    async fn federated_registries(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        group_id: Option<String>,
    ) -> async_graphql::Result<Connection<FederatedRegistryNode>> {
        let state = RequestState::from_context(ctx)?;
        let group_id = state
            .resolve_optional_id(group_id.as_deref(), ResourceType::Group)
            .await
            .into_field()?;
        let input = GetFederatedRegistriesInput {
            group_id,
            ..Default::default()
        };
        federated_registry_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(InputObject)]
#[graphql(name = "CreateFederatedRegistryInput")]
pub struct CreateFederatedRegistryArgs {
    pub client_mutation_id: Option<String>,
    pub hostname: String,
    pub group_id: String,
    pub audience: String,
}

#[derive(InputObject)]
#[graphql(name = "UpdateFederatedRegistryInput")]
pub struct UpdateFederatedRegistryArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub hostname: Option<String>,
    pub audience: Option<String>,
}

#[derive(InputObject)]
#[graphql(name = "DeleteFederatedRegistryInput")]
pub struct DeleteFederatedRegistryArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
}

#[derive(SimpleObject)]
pub struct FederatedRegistryMutationPayload {
    pub client_mutation_id: Option<String>,
    pub federated_registry: Option<FederatedRegistryNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for FederatedRegistryMutationPayload {
    type Node = FederatedRegistryNode;

    fn build(
        client_mutation_id: Option<String>,
        federated_registry: Option<FederatedRegistryNode>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            client_mutation_id,
            federated_registry,
            problems,
        }
    }
}

#[derive(Default)]
pub struct FederatedRegistryMutation;

#[Object]
impl FederatedRegistryMutation {
    async fn create_federated_registry(
        &self,
        ctx: &Context<'_>,
        input: CreateFederatedRegistryArgs,
    ) -> async_graphql::Result<FederatedRegistryMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(FederatedRegistryMutationPayload::from_result(
            client_mutation_id,
            create_federated_registry(&state, input).await,
        ))
    }

    async fn update_federated_registry(
        &self,
        ctx: &Context<'_>,
        input: UpdateFederatedRegistryArgs,
    ) -> async_graphql::Result<FederatedRegistryMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(FederatedRegistryMutationPayload::from_result(
            client_mutation_id,
            update_federated_registry(&state, input).await,
        ))
    }

    async fn delete_federated_registry(
        &self,
        ctx: &Context<'_>,
        input: DeleteFederatedRegistryArgs,
    ) -> async_graphql::Result<FederatedRegistryMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(FederatedRegistryMutationPayload::from_result(
            client_mutation_id,
            delete_federated_registry(&state, input).await,
        ))
    }
}

async fn create_federated_registry(
    state: &Arc<RequestState>,
    input: CreateFederatedRegistryArgs,
) -> crate::Result<FederatedRegistryNode> {
    let group_id = state.resolve_id(&input.group_id, ResourceType::Group).await?;
    let registry = state
        .services
        .federated_registries
        .create_federated_registry(CreateFederatedRegistryInput {
            hostname: input.hostname,
            group_id,
            audience: input.audience,
        })
        .await?;
    Ok(FederatedRegistryNode::new(registry, state.clone()))
}

async fn update_federated_registry(
    state: &Arc<RequestState>,
    input: UpdateFederatedRegistryArgs,
) -> crate::Result<FederatedRegistryNode> {
    let mut registry = fetch_federated_registry(state, &input.id).await?;
    apply_version(&mut registry.metadata, input.version)?;

    if let Some(hostname) = input.hostname {
        registry.hostname = hostname;
    }
    if let Some(audience) = input.audience {
        registry.audience = audience;
    }

    let registry = state
        .services
        .federated_registries
        .update_federated_registry(registry)
        .await?;
    Ok(FederatedRegistryNode::new(registry, state.clone()))
}

async fn delete_federated_registry(
    state: &Arc<RequestState>,
    input: DeleteFederatedRegistryArgs,
) -> crate::Result<FederatedRegistryNode> {
    let mut registry = fetch_federated_registry(state, &input.id).await?;
    apply_version(&mut registry.metadata, input.version)?;

    state
        .services
        .federated_registries
        .delete_federated_registry(&registry)
        .await?;
    Ok(FederatedRegistryNode::new(registry, state.clone()))
}

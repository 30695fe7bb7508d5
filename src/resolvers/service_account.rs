use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};

use super::group::GroupNode;
use super::{name_sort_value, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::loaders::load_required;
use crate::models::{NameSort, ServiceAccount};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{CreateServiceAccountInput, GetServiceAccountsInput};
use crate::ResultExt;

#[derive(Clone)]
pub struct ServiceAccountNode {
    model: ServiceAccount,
    state: Arc<RequestState>,
}

impl ServiceAccountNode {
    pub(crate) fn new(model: ServiceAccount, state: Arc<RequestState>) -> Self {
        Self { model, state }
    }

    pub fn model(&self) -> &ServiceAccount {
        &self.model
    }
}

#[Object(name = "ServiceAccount")]
impl ServiceAccountNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::ServiceAccount, self.model.metadata.id))
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

    async fn resource_path(&self) -> &str {
        &self.model.resource_path
    }

    async fn created_by(&self) -> &str {
        &self.model.created_by
    }

    async fn group(&self) -> async_graphql::Result<GroupNode> {
        let group = load_required(&self.state.loaders.groups, self.model.group_id)
            .await
            .into_field()?;
        Ok(GroupNode::new(group, self.state.clone()))
    }
}

pub(crate) async fn service_account_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetServiceAccountsInput,
) -> crate::Result<Connection<ServiceAccountNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let sort = input.sort;
    let page = state.services.service_accounts.get_service_accounts(input).await?;
    Connection::from_page(
        page,
        |sa: &ServiceAccount| {
            let sort_value = sort.map(|sort| name_sort_value(sort, &sa.name, sa.metadata.updated_at));
            CursorPosition::new(sa.metadata.id, sort_value).encode()
        },
        |sa| ServiceAccountNode::new(sa, state.clone()),
    )
}

pub(crate) async fn fetch_service_account(state: &RequestState, id: &str) -> crate::Result<ServiceAccount> {
    let service_account_id = state.resolve_id(id, ResourceType::ServiceAccount).await?;
    Ok(state
        .services
        .service_accounts
        .get_service_account_by_id(service_account_id)
        .await?)
}

#[derive(Default)]
pub struct ServiceAccountQuery;

#[Object]
impl ServiceAccountQuery {
    /// Look up a service account by TRN or global ID
    async fn service_account(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> async_graphql::Result<Option<ServiceAccountNode>> {
        let state = RequestState::from_context(ctx)?;
        let service_account = not_found_as_none(fetch_service_account(&state, &id).await).into_field()?;
        Ok(service_account.map(|sa| ServiceAccountNode::new(sa, state.clone())))
    }

    async fn service_accounts(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<NameSort>,
        group_id: Option<String>,
        search: Option<String>,
    ) -> async_graphql::Result<Connection<ServiceAccountNode>> {
        let state = RequestState::from_context(ctx)?;
        let group_id = state
            .resolve_optional_id(group_id.as_deref(), ResourceType::Group)
            .await
            .into_field()?;
        let input = GetServiceAccountsInput {
            sort,
            group_id,
            search,
            ..Default::default()
        };
        service_account_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(InputObject)]
#[graphql(name = "CreateServiceAccountInput")]
pub struct CreateServiceAccountArgs {
    pub client_mutation_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub group_id: String,
}

#[derive(InputObject)]
#[graphql(name = "DeleteServiceAccountInput")]
pub struct DeleteServiceAccountArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
}

#[derive(SimpleObject)]
pub struct ServiceAccountMutationPayload {
    pub client_mutation_id: Option<String>,
    pub service_account: Option<ServiceAccountNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for ServiceAccountMutationPayload {
    type Node = ServiceAccountNode;

    fn build(
        client_mutation_id: Option<String>,
        service_account: Option<ServiceAccountNode>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            client_mutation_id,
            service_account,
            problems,
        }
    }
}

#[derive(Default)]
pub struct ServiceAccountMutation;

#[Object]
impl ServiceAccountMutation {
    async fn create_service_account(
        &self,
        ctx: &Context<'_>,
        input: CreateServiceAccountArgs,
    ) -> async_graphql::Result<ServiceAccountMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(ServiceAccountMutationPayload::from_result(
            client_mutation_id,
            create_service_account(&state, input).await,
        ))
    }

    async fn delete_service_account(
        &self,
        ctx: &Context<'_>,
        input: DeleteServiceAccountArgs,
    ) -> async_graphql::Result<ServiceAccountMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(ServiceAccountMutationPayload::from_result(
            client_mutation_id,
            delete_service_account(&state, input).await,
        ))
    }
}

async fn create_service_account(
    state: &Arc<RequestState>,
    input: CreateServiceAccountArgs,
) -> crate::Result<ServiceAccountNode> {
    let group_id = state.resolve_id(&input.group_id, ResourceType::Group).await?;
    let service_account = state
        .services
        .service_accounts
        .create_service_account(CreateServiceAccountInput {
            name: input.name,
            description: input.description.unwrap_or_default(),
            group_id,
        })
        .await?;
    Ok(ServiceAccountNode::new(service_account, state.clone()))
}

async fn delete_service_account(
    state: &Arc<RequestState>,
    input: DeleteServiceAccountArgs,
) -> crate::Result<ServiceAccountNode> {
    let mut service_account = fetch_service_account(state, &input.id).await?;
    super::apply_version(&mut service_account.metadata, input.version)?;

    state
        .services
        .service_accounts
        .delete_service_account(&service_account)
        .await?;
    Ok(ServiceAccountNode::new(service_account, state.clone()))
}

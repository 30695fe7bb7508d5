use std::sync::Arc;

use async_graphql::{Context, InputObject, MaybeUndefined, Object, SimpleObject, ID};
use chrono::Utc;

use super::{apply_version, MetadataNode, MutationPayload};
use crate::context::RequestState;
use crate::errors::not_found_as_none;
use crate::gid::{to_global_id, ResourceType};
use crate::models::{Announcement, AnnouncementSort, AnnouncementType};
use crate::pagination::{Connection, ConnectionArgs, CursorPosition};
use crate::problem::Problem;
use crate::services::{CreateAnnouncementInput, GetAnnouncementsInput};
use crate::types::DateTime;
use crate::ResultExt;

#[derive(Clone)]
pub struct AnnouncementNode {
    model: Announcement,
}

impl AnnouncementNode {
    pub(crate) fn new(model: Announcement) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Announcement {
        &self.model
    }
}

#[Object(name = "Announcement")]
impl AnnouncementNode {
    async fn id(&self) -> ID {
        ID(to_global_id(ResourceType::Announcement, self.model.metadata.id))
    }

    async fn metadata(&self) -> MetadataNode {
        MetadataNode::from(&self.model.metadata)
    }

    async fn message(&self) -> &str {
        &self.model.message
    }

    async fn start_time(&self) -> DateTime {
        self.model.start_time.into()
    }

    async fn end_time(&self) -> Option<DateTime> {
        self.model.end_time.map(DateTime::from)
    }

    #[graphql(name = "type")]
    async fn announcement_type(&self) -> AnnouncementType {
        self.model.announcement_type
    }

    async fn dismissible(&self) -> bool {
        self.model.dismissible
    }

    async fn created_by(&self) -> &str {
        &self.model.created_by
    }

    async fn active(&self) -> bool {
        self.model.is_active(Utc::now())
    }

    async fn expired(&self) -> bool {
        self.model.is_expired(Utc::now())
    }
}

fn announcement_cursor(sort: Option<AnnouncementSort>) -> impl Fn(&Announcement) -> crate::Result<String> {
    move |announcement: &Announcement| {
        let sort_value = sort.map(|sort| match sort {
            AnnouncementSort::StartTimeAsc | AnnouncementSort::StartTimeDesc => {
                announcement.start_time.to_rfc3339()
            }
            AnnouncementSort::CreatedAtAsc | AnnouncementSort::CreatedAtDesc => {
                announcement.metadata.created_at.to_rfc3339()
            }
        });
        CursorPosition::new(announcement.metadata.id, sort_value).encode()
    }
}

pub(crate) async fn announcement_connection(
    state: &Arc<RequestState>,
    args: ConnectionArgs,
    mut input: GetAnnouncementsInput,
) -> crate::Result<Connection<AnnouncementNode>> {
    input.pagination = args.into_options(state.page_size())?;
    let cursor = announcement_cursor(input.sort);
    let page = state.services.announcements.get_announcements(input).await?;
    Connection::from_page(page, cursor, AnnouncementNode::new)
}

pub(crate) async fn fetch_announcement(state: &RequestState, id: &str) -> crate::Result<Announcement> {
    let announcement_id = state.resolve_id(id, ResourceType::Announcement).await?;
    Ok(state
        .services
        .announcements
        .get_announcement_by_id(announcement_id)
        .await?)
}

#[derive(Default)]
pub struct AnnouncementQuery;

#[Object]
impl AnnouncementQuery {
    async fn announcement(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<AnnouncementNode>> {
        let state = RequestState::from_context(ctx)?;
        let announcement = not_found_as_none(fetch_announcement(&state, &id).await).into_field()?;
        Ok(announcement.map(AnnouncementNode::new))
    }

    /// List announcements, optionally only those currently displayed
    async fn announcements(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        sort: Option<AnnouncementSort>,
        active: Option<bool>,
    ) -> async_graphql::Result<Connection<AnnouncementNode>> {
        let state = RequestState::from_context(ctx)?;
        let input = GetAnnouncementsInput {
            sort,
            active,
            ..Default::default()
        };
        announcement_connection(&state, ConnectionArgs::new(first, last, after, before), input)
            .await
            .into_field()
    }
}

#[derive(InputObject)]
#[graphql(name = "CreateAnnouncementInput")]
pub struct CreateAnnouncementArgs {
    pub client_mutation_id: Option<String>,
    pub message: String,
    /// Defaults to the time of creation
    pub start_time: Option<DateTime>,
    pub end_time: Option<DateTime>,
    #[graphql(name = "type")]
    pub announcement_type: AnnouncementType,
    pub dismissible: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "UpdateAnnouncementInput")]
pub struct UpdateAnnouncementArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
    pub message: Option<String>,
    pub start_time: Option<DateTime>,
    /// An explicit `null` removes the end time
    pub end_time: MaybeUndefined<DateTime>,
    #[graphql(name = "type")]
    pub announcement_type: Option<AnnouncementType>,
    pub dismissible: Option<bool>,
}

#[derive(InputObject)]
#[graphql(name = "DeleteAnnouncementInput")]
pub struct DeleteAnnouncementArgs {
    pub client_mutation_id: Option<String>,
    pub id: String,
    pub version: Option<String>,
}

#[derive(SimpleObject)]
pub struct AnnouncementMutationPayload {
    pub client_mutation_id: Option<String>,
    pub announcement: Option<AnnouncementNode>,
    pub problems: Vec<Problem>,
}

impl MutationPayload for AnnouncementMutationPayload {
    type Node = AnnouncementNode;

    fn build(
        client_mutation_id: Option<String>,
        announcement: Option<AnnouncementNode>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            client_mutation_id,
            announcement,
            problems,
        }
    }
}

#[derive(Default)]
pub struct AnnouncementMutation;

#[Object]
impl AnnouncementMutation {
    async fn create_announcement(
        &self,
        ctx: &Context<'_>,
        input: CreateAnnouncementArgs,
    ) -> async_graphql::Result<AnnouncementMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(AnnouncementMutationPayload::from_result(
            client_mutation_id,
            create_announcement(&state, input).await,
        ))
    }

    async fn update_announcement(
        &self,
        ctx: &Context<'_>,
        input: UpdateAnnouncementArgs,
    ) -> async_graphql::Result<AnnouncementMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(AnnouncementMutationPayload::from_result(
            client_mutation_id,
            update_announcement(&state, input).await,
        ))
    }

    async fn delete_announcement(
        &self,
        ctx: &Context<'_>,
        input: DeleteAnnouncementArgs,
    ) -> async_graphql::Result<AnnouncementMutationPayload> {
        let state = RequestState::from_context(ctx)?;
        let client_mutation_id = input.client_mutation_id.clone();
        Ok(AnnouncementMutationPayload::from_result(
            client_mutation_id,
            delete_announcement(&state, input).await,
        ))
    }
}

async fn create_announcement(state: &RequestState, input: CreateAnnouncementArgs) -> crate::Result<AnnouncementNode> {
    let announcement = state
        .services
        .announcements
        .create_announcement(CreateAnnouncementInput {
            message: input.message,
            start_time: input.start_time.map(Into::into),
            end_time: input.end_time.map(Into::into),
            announcement_type: input.announcement_type,
            dismissible: input.dismissible.unwrap_or(false),
        })
        .await?;
    Ok(AnnouncementNode::new(announcement))
}

async fn update_announcement(state: &RequestState, input: UpdateAnnouncementArgs) -> crate::Result<AnnouncementNode> {
    let mut announcement = fetch_announcement(state, &input.id).await?;
    apply_version(&mut announcement.metadata, input.version)?;

    if let Some(message) = input.message {
        announcement.message = message;
    }
    if let Some(start_time) = input.start_time {
        announcement.start_time = start_time.into();
    }
    match input.end_time {
        MaybeUndefined::Value(end_time) => announcement.end_time = Some(end_time.into()),
        MaybeUndefined::Null => announcement.end_time = None,
        MaybeUndefined::Undefined => {}
    }
    if let Some(announcement_type) = input.announcement_type {
        announcement.announcement_type = announcement_type;
    }
    if let Some(dismissible) = input.dismissible {
        announcement.dismissible = dismissible;
    }

    let announcement = state.services.announcements.update_announcement(announcement).await?;
    Ok(AnnouncementNode::new(announcement))
}

async fn delete_announcement(state: &RequestState, input: DeleteAnnouncementArgs) -> crate::Result<AnnouncementNode> {
    let mut announcement = fetch_announcement(state, &input.id).await?;
    apply_version(&mut announcement.metadata, input.version)?;

    state.services.announcements.delete_announcement(&announcement).await?;
    Ok(AnnouncementNode::new(announcement))
}

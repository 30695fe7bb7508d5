//! Domain models returned by the service layer
//!
//! These are plain data shapes. Their lifecycle and invariants belong to the
//! services; resolvers only hold them for the duration of one request.

use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata every model carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub id: Uuid,
    pub version: i32,
    pub trn: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub metadata: ResourceMetadata,
    pub name: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    pub full_path: String,
}

impl Group {
    /// Path of the parent group, if this is not a top-level group
    pub fn parent_path(&self) -> Option<&str> {
        self.full_path.rsplit_once('/').map(|(parent, _)| parent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub metadata: ResourceMetadata,
    pub name: String,
    pub description: String,
    pub group_id: Uuid,
    pub full_path: String,
    /// Minutes a job may run before it is cancelled
    pub max_job_duration: i32,
    pub prevent_destroy_plan: bool,
    pub terraform_version: String,
    pub locked: bool,
}

impl Workspace {
    pub fn group_path(&self) -> &str {
        self.full_path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub metadata: ResourceMetadata,
    pub username: String,
    pub email: String,
    pub admin: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub metadata: ResourceMetadata,
    pub name: String,
    pub description: String,
    pub group_id: Uuid,
    pub resource_path: String,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub metadata: ResourceMetadata,
    pub name: String,
    pub description: String,
    pub scim_external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub metadata: ResourceMetadata,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub is_maintainer: bool,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagedIdentityType {
    AwsFederated,
    AzureFederated,
    KubernetesFederated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedIdentity {
    pub metadata: ResourceMetadata,
    pub name: String,
    pub description: String,
    pub identity_type: ManagedIdentityType,
    pub group_id: Uuid,
    pub resource_path: String,
    /// Base64 encoded provider-specific settings
    pub data: String,
    pub created_by: String,
    pub alias_source_id: Option<Uuid>,
}

impl ManagedIdentity {
    pub fn is_alias(&self) -> bool {
        self.alias_source_id.is_some()
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRuleType {
    EligiblePrincipals,
    ModuleAttestation,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStage {
    Plan,
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedIdentityAccessRule {
    pub metadata: ResourceMetadata,
    pub managed_identity_id: Uuid,
    pub rule_type: AccessRuleType,
    pub run_stage: JobStage,
    pub allowed_user_ids: Vec<Uuid>,
    pub allowed_service_account_ids: Vec<Uuid>,
    pub allowed_team_ids: Vec<Uuid>,
    pub verify_state_lineage: bool,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerType {
    Shared,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    pub metadata: ResourceMetadata,
    pub name: String,
    pub description: String,
    pub runner_type: RunnerType,
    /// Only set for group runners
    pub group_id: Option<Uuid>,
    pub resource_path: String,
    pub disabled: bool,
    pub tags: Vec<String>,
    pub run_untagged_jobs: bool,
    pub created_by: String,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnouncementType {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub metadata: ResourceMetadata,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub announcement_type: AnnouncementType,
    pub dismissible: bool,
    pub created_by: String,
}

impl Announcement {
    /// Whether the announcement should be displayed at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && !self.is_expired(now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| end <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedRegistry {
    pub metadata: ResourceMetadata,
    pub hostname: String,
    pub group_id: Uuid,
    pub audience: String,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupSort {
    FullPathAsc,
    FullPathDesc,
    UpdatedAtAsc,
    UpdatedAtDesc,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceSort {
    FullPathAsc,
    FullPathDesc,
    UpdatedAtAsc,
    UpdatedAtDesc,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserSort {
    UsernameAsc,
    UsernameDesc,
    UpdatedAtAsc,
    UpdatedAtDesc,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameSort {
    NameAsc,
    NameDesc,
    UpdatedAtAsc,
    UpdatedAtDesc,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnouncementSort {
    StartTimeAsc,
    StartTimeDesc,
    CreatedAtAsc,
    CreatedAtDesc,
}

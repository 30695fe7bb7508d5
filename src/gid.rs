//! Resource identifiers: opaque global IDs and typed resource names (TRNs)
//!
//! A global ID is the URL-safe base64 form of `<code>_<uuid>`. A TRN reads
//! `trn:<type>:<path>` (`trn:workspace:top/sub/prod`). TRNs are the
//! canonical form; global IDs are still accepted wherever an ID argument
//! is taken.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use uuid::Uuid;

use crate::GraphQLError;

const TRN_PREFIX: &str = "trn:";

/// Every resource type addressable through the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Group,
    Workspace,
    User,
    ServiceAccount,
    Team,
    TeamMember,
    ManagedIdentity,
    ManagedIdentityAccessRule,
    Runner,
    Announcement,
    FederatedRegistry,
}

impl ResourceType {
    const ALL: [ResourceType; 11] = [
        ResourceType::Group,
        ResourceType::Workspace,
        ResourceType::User,
        ResourceType::ServiceAccount,
        ResourceType::Team,
        ResourceType::TeamMember,
        ResourceType::ManagedIdentity,
        ResourceType::ManagedIdentityAccessRule,
        ResourceType::Runner,
        ResourceType::Announcement,
        ResourceType::FederatedRegistry,
    ];

    /// Short code used inside global IDs
    pub fn code(&self) -> &'static str {
        match self {
            ResourceType::Group => "G",
            ResourceType::Workspace => "W",
            ResourceType::User => "U",
            ResourceType::ServiceAccount => "SA",
            ResourceType::Team => "T",
            ResourceType::TeamMember => "TM",
            ResourceType::ManagedIdentity => "M",
            ResourceType::ManagedIdentityAccessRule => "MAR",
            ResourceType::Runner => "R",
            ResourceType::Announcement => "AN",
            ResourceType::FederatedRegistry => "FR",
        }
    }

    /// Type segment of a TRN
    pub fn trn_type(&self) -> &'static str {
        match self {
            ResourceType::Group => "group",
            ResourceType::Workspace => "workspace",
            ResourceType::User => "user",
            ResourceType::ServiceAccount => "service_account",
            ResourceType::Team => "team",
            ResourceType::TeamMember => "team_member",
            ResourceType::ManagedIdentity => "managed_identity",
            ResourceType::ManagedIdentityAccessRule => "managed_identity_access_rule",
            ResourceType::Runner => "runner",
            ResourceType::Announcement => "announcement",
            ResourceType::FederatedRegistry => "federated_registry",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn from_trn_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.trn_type() == value)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trn_type())
    }
}

/// Encode a model ID as a global ID
pub fn to_global_id(resource_type: ResourceType, id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}_{}", resource_type.code(), id))
}

/// Decoded global ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalId {
    pub resource_type: ResourceType,
    pub id: Uuid,
}

impl GlobalId {
    pub fn parse(value: &str) -> crate::Result<Self> {
        let invalid = || GraphQLError::InvalidId(format!("invalid global id '{}'", value));

        let bytes = URL_SAFE_NO_PAD.decode(value).map_err(|_| invalid())?;
        let decoded = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (code, id) = decoded.split_once('_').ok_or_else(invalid)?;

        Ok(Self {
            resource_type: ResourceType::from_code(code).ok_or_else(invalid)?,
            id: Uuid::parse_str(id).map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_global_id(self.resource_type, self.id))
    }
}

/// Typed resource name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trn {
    pub resource_type: ResourceType,
    pub path: String,
}

impl Trn {
    pub fn new(resource_type: ResourceType, path: impl Into<String>) -> Self {
        Self {
            resource_type,
            path: path.into(),
        }
    }

    pub fn parse(value: &str) -> crate::Result<Self> {
        let invalid = |reason: &str| GraphQLError::InvalidId(format!("invalid TRN '{}': {}", value, reason));

        let rest = value
            .strip_prefix(TRN_PREFIX)
            .ok_or_else(|| invalid("missing trn prefix"))?;
        let (type_name, path) = rest
            .split_once(':')
            .ok_or_else(|| invalid("expected trn:<type>:<path>"))?;
        let resource_type = ResourceType::from_trn_type(type_name)
            .ok_or_else(|| invalid("unknown resource type"))?;

        let path = normalize_path(path).ok_or_else(|| invalid("resource path is empty"))?;
        Ok(Self::new(resource_type, path))
    }

    /// Build a TRN from a full path argument such as `top/sub/prod`
    pub fn from_full_path(resource_type: ResourceType, full_path: &str) -> crate::Result<Self> {
        let path = normalize_path(full_path).ok_or_else(|| {
            GraphQLError::InvalidArgument(format!("fullPath '{}' is not a valid resource path", full_path))
        })?;
        Ok(Self::new(resource_type, path))
    }
}

/// Strip outer slashes, rejecting empty paths and empty segments
fn normalize_path(path: &str) -> Option<&str> {
    let path = path.trim_matches('/');
    if path.is_empty() || path.split('/').any(str::is_empty) {
        None
    } else {
        Some(path)
    }
}

impl fmt::Display for Trn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", TRN_PREFIX, self.resource_type.trn_type(), self.path)
    }
}

/// An ID argument in either encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    Trn(Trn),
    Global(GlobalId),
}

impl ResourceRef {
    pub fn parse(value: &str) -> crate::Result<Self> {
        if value.starts_with(TRN_PREFIX) {
            Trn::parse(value).map(ResourceRef::Trn)
        } else {
            GlobalId::parse(value).map(ResourceRef::Global)
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceRef::Trn(trn) => trn.resource_type,
            ResourceRef::Global(gid) => gid.resource_type,
        }
    }

    /// Fail unless the reference points at a resource of `expected` type
    pub fn expect_type(self, expected: ResourceType) -> crate::Result<Self> {
        if self.resource_type() != expected {
            return Err(GraphQLError::InvalidId(format!(
                "expected a {} id, got a {} id",
                expected,
                self.resource_type()
            )));
        }
        Ok(self)
    }
}

//! Relay-style cursor pagination

use std::borrow::Cow;

use async_graphql::{OutputType, SimpleObject, TypeName};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i32 = 100;

/// Page size used when neither `first` nor `last` is given
pub const DEFAULT_PAGE_SIZE: i32 = 20;

/// Page information
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Edge in a connection
#[derive(SimpleObject, Debug, Clone)]
#[graphql(name_type)]
pub struct Edge<T: OutputType> {
    pub cursor: String,
    pub node: T,
}

impl<T: OutputType> TypeName for Edge<T> {
    fn type_name() -> Cow<'static, str> {
        format!("{}Edge", <T as OutputType>::type_name()).into()
    }
}

/// Connection (paginated result)
#[derive(SimpleObject, Debug, Clone)]
#[graphql(name_type)]
pub struct Connection<T: OutputType> {
    pub total_count: i32,
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T: OutputType> TypeName for Connection<T> {
    fn type_name() -> Cow<'static, str> {
        format!("{}Connection", <T as OutputType>::type_name()).into()
    }
}

impl<T: OutputType> Connection<T> {
    /// Build a connection from a page returned by a service
    ///
    /// `cursor` computes the opaque cursor of each model before it is turned
    /// into a node by `into_node`. A cursor failure aborts the whole
    /// connection, since it means the page and the cursor function disagree
    /// about the model type.
    pub fn from_page<M, C, N>(page: ResultPage<M>, cursor: C, mut into_node: N) -> crate::Result<Self>
    where
        C: Fn(&M) -> crate::Result<String>,
        N: FnMut(M) -> T,
    {
        let edges = page
            .items
            .into_iter()
            .map(|item| {
                let cursor = cursor(&item)?;
                Ok(Edge {
                    cursor,
                    node: into_node(item),
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());

        Ok(Self {
            total_count: page.page_info.total_count,
            edges,
            page_info: PageInfo {
                has_next_page: page.page_info.has_next_page,
                has_previous_page: page.page_info.has_previous_page,
                start_cursor,
                end_cursor,
            },
        })
    }

    /// Create empty connection
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }
}

/// Page metadata reported by a service alongside its items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultPageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub total_count: i32,
}

/// One page of models returned by a service list call
#[derive(Debug, Clone)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub page_info: ResultPageInfo,
}

impl<T> ResultPage<T> {
    pub fn new(items: Vec<T>, page_info: ResultPageInfo) -> Self {
        Self { items, page_info }
    }
}

/// Pagination handed to a service list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationOptions {
    pub first: Option<i32>,
    pub last: Option<i32>,
    pub after: Option<String>,
    pub before: Option<String>,
}

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> crate::Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))
    }

    /// Encode structured cursor (e.g., sort value + ID)
    pub fn encode_structured<T: Serialize>(value: &T) -> crate::Result<String> {
        let json = serde_json::to_string(value)
            .map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))?;
        Ok(BASE64.encode(json.as_bytes()))
    }

    /// Decode structured cursor
    pub fn decode_structured<T: for<'de> Deserialize<'de>>(cursor: &str) -> crate::Result<T> {
        let json = Self::decode(cursor)?;
        serde_json::from_str(&json).map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))
    }
}

/// Position of a model within a sorted list
///
/// Every connection in the API encodes its cursors this way so services can
/// resume a listing from either side of a known item.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CursorPosition {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_value: Option<String>,
}

impl CursorPosition {
    pub fn new(id: Uuid, sort_value: Option<String>) -> Self {
        Self { id, sort_value }
    }

    pub fn encode(&self) -> crate::Result<String> {
        CursorCodec::encode_structured(self)
    }

    pub fn decode(cursor: &str) -> crate::Result<Self> {
        CursorCodec::decode_structured(cursor)
    }
}

/// Connection arguments of a list field
///
/// Follows the Relay Cursor Connections Specification:
/// https://relay.dev/graphql/connections.htm
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionArgs {
    /// Number of items to return (forward pagination)
    pub first: Option<i32>,

    /// Number of items to return (backward pagination)
    pub last: Option<i32>,

    /// Cursor to start from (forward pagination)
    pub after: Option<String>,

    /// Cursor to start from (backward pagination)
    pub before: Option<String>,
}

impl ConnectionArgs {
    pub fn new(
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
    ) -> Self {
        Self {
            first,
            last,
            after,
            before,
        }
    }

    /// Reject contradictory or out of range arguments
    pub fn validate(&self) -> crate::Result<()> {
        if self.first.is_some() && self.last.is_some() {
            return Err(crate::GraphQLError::PaginationError(
                "Cannot specify both 'first' and 'last'".to_string(),
            ));
        }

        if self.after.is_some() && self.last.is_some() {
            return Err(crate::GraphQLError::PaginationError(
                "'after' cannot be combined with 'last'".to_string(),
            ));
        }

        if self.before.is_some() && self.first.is_some() {
            return Err(crate::GraphQLError::PaginationError(
                "'before' cannot be combined with 'first'".to_string(),
            ));
        }

        for (name, count) in [("first", self.first), ("last", self.last)] {
            if let Some(count) = count {
                if count < 0 {
                    return Err(crate::GraphQLError::PaginationError(format!(
                        "'{}' must be non-negative",
                        name
                    )));
                }
                if count > MAX_PAGE_SIZE {
                    return Err(crate::GraphQLError::PaginationError(format!(
                        "'{}' cannot exceed {}",
                        name, MAX_PAGE_SIZE
                    )));
                }
            }
        }

        for cursor in [&self.after, &self.before].into_iter().flatten() {
            CursorPosition::decode(cursor)?;
        }

        Ok(())
    }

    /// Check if backward pagination
    pub fn is_backward(&self) -> bool {
        self.last.is_some() || self.before.is_some()
    }

    /// Validate and convert into service pagination options
    pub fn into_options(self, default_page_size: i32) -> crate::Result<PaginationOptions> {
        self.validate()?;

        let page_size = default_page_size.clamp(1, MAX_PAGE_SIZE);
        let (first, last) = match (self.first, self.last) {
            (None, None) if self.is_backward() => (None, Some(page_size)),
            (None, None) => (Some(page_size), None),
            other => other,
        };

        Ok(PaginationOptions {
            first,
            last,
            after: self.after,
            before: self.before,
        })
    }
}

//! API configuration
//!
//! The configuration is loaded from TOML and exposed read-only through the
//! `config` query. Non-admin callers receive [`ApiConfig::redacted`].

use std::path::Path;
use std::time::Duration;

use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::GraphQLError;

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[graphql(name = "Config")]
#[serde(default)]
pub struct ApiConfig {
    pub public_api_url: String,
    pub tfe_login_enabled: bool,
    pub max_graphql_complexity: u32,
    pub max_graphql_depth: u32,
    pub default_page_size: i32,
    pub dataloader: DataLoaderConfig,
    pub oauth_providers: Vec<OAuthProviderConfig>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_username: Option<String>,
    pub db_password: Option<String>,
    pub jwt_signing_key_arn: Option<String>,
    pub object_store_bucket: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            public_api_url: "http://localhost:8000".to_string(),
            tfe_login_enabled: false,
            max_graphql_complexity: 500,
            max_graphql_depth: 15,
            default_page_size: DEFAULT_PAGE_SIZE,
            dataloader: DataLoaderConfig::default(),
            oauth_providers: Vec::new(),
            db_host: None,
            db_port: None,
            db_name: None,
            db_username: None,
            db_password: None,
            jwt_signing_key_arn: None,
            object_store_bucket: None,
        }
    }
}

impl ApiConfig {
    pub fn from_toml_str(source: &str) -> crate::Result<Self> {
        toml::from_str(source).map_err(|e| GraphQLError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| GraphQLError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Copy of the config with every sensitive field cleared
    pub fn redacted(&self) -> Self {
        Self {
            db_host: None,
            db_port: None,
            db_name: None,
            db_username: None,
            db_password: None,
            jwt_signing_key_arn: None,
            object_store_bucket: None,
            oauth_providers: self
                .oauth_providers
                .iter()
                .map(|provider| OAuthProviderConfig {
                    client_id: None,
                    ..provider.clone()
                })
                .collect(),
            ..self.clone()
        }
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataLoaderConfig {
    /// Milliseconds a loader waits for more keys before dispatching
    pub batch_delay_ms: u64,
    pub max_batch_size: u32,
}

impl DataLoaderConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: 1,
            max_batch_size: 100,
        }
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProviderConfig {
    pub issuer_url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_username_claim")]
    pub username_claim: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub logout_url: Option<String>,
}

fn default_username_claim() -> String {
    "sub".to_string()
}

use async_graphql::{Context, Object};

use crate::config::ApiConfig;
use crate::context::RequestState;

#[derive(Default)]
pub struct ConfigQuery;

#[Object]
impl ConfigQuery {
    /// API configuration, with sensitive values cleared unless the caller is an admin
    async fn config(&self, ctx: &Context<'_>) -> async_graphql::Result<ApiConfig> {
        let state = RequestState::from_context(ctx)?;
        Ok(exposed_config(&state))
    }
}

fn exposed_config(state: &RequestState) -> ApiConfig {
    if state.caller.is_admin() {
        state.config.as_ref().clone()
    } else {
        tracing::debug!("returning redacted config to non-admin caller");
        state.config.redacted()
    }
}

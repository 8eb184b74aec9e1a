//! Request injection middleware.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::handler::RequestContext;
use crate::pipeline::RequestMiddleware;
use crate::registry::HandlerRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, debug_span, Instrument};

/// Hands every outgoing request to the handler for the active profile's
/// auth server.
///
/// Installed by [`AuthSystem::register`](crate::AuthSystem::register); this
/// is the only place credentials are attached to requests.
pub struct AuthMiddleware {
    registry: Arc<HandlerRegistry>,
    config: Arc<AuthConfig>,
}

impl AuthMiddleware {
    pub fn new(registry: Arc<HandlerRegistry>, config: Arc<AuthConfig>) -> Self {
        Self { registry, config }
    }
}

#[async_trait]
impl RequestMiddleware for AuthMiddleware {
    async fn on_request(&self, request: &mut reqwest::Request) -> AuthResult<()> {
        let settings = self.config.settings().await?;
        let profile = settings.profile(self.config.profile_name());
        let server_name = profile.auth_server_name.as_str();
        let auth_server = settings.auth_servers.get(server_name);

        let handler = self
            .registry
            .resolve(server_name, auth_server)
            .ok_or_else(|| AuthError::no_handler(server_name))?;

        let secrets = self.config.secrets().await?;
        let ctx = RequestContext {
            profile: &profile,
            auth_server,
            credential: secrets.credential_for(&profile),
        };

        let span = debug_span!(
            "auth_request",
            profile = %profile.name,
            auth_server = %server_name,
            credential = ctx.credential.map(|(name, _)| name).unwrap_or(""),
        );
        handler.on_request(&ctx, request).instrument(span).await?;

        debug!(profile = %profile.name, url = %request.url(), "Request authorized");
        Ok(())
    }
}

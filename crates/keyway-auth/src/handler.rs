//! The capability every auth scheme implements.

use crate::error::{FlowError, RequestAuthError};
use crate::model::{AuthServer, Credential, Profile, TokenPayload};
use async_trait::async_trait;
use std::sync::Arc;

/// Inputs to a credential acquisition flow.
#[derive(Debug, Clone, Copy)]
pub struct FlowContext<'a> {
    /// Sanitized name the credential will be stored under.
    pub credential_name: &'a str,
    pub auth_server_name: &'a str,
    /// The server definition, if one is configured under that name.
    pub auth_server: Option<&'a AuthServer>,
}

/// Inputs to request decoration.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub profile: &'a Profile,
    pub auth_server: Option<&'a AuthServer>,
    /// The credential selected for the profile, with its name.
    pub credential: Option<(&'a str, &'a Credential)>,
}

impl RequestContext<'_> {
    /// The selected credential's token, or a missing-credential error.
    pub fn require_token(&self) -> Result<(&str, &TokenPayload), RequestAuthError> {
        self.credential
            .map(|(name, credential)| (name, &credential.token_payload))
            .ok_or_else(|| RequestAuthError::MissingCredential {
                profile: self.profile.name.clone(),
            })
    }
}

/// An authentication scheme.
///
/// Handlers are registered once at startup with
/// [`AuthSystem::register`](crate::AuthSystem::register) and live for the
/// rest of the process.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Acquire a new credential.
    ///
    /// May block on user interaction for as long as it takes.
    async fn execute_flow(&self, ctx: &FlowContext<'_>) -> Result<TokenPayload, FlowError>;

    /// Profile fields this scheme reads, in display order.
    fn profile_keys(&self) -> Vec<String>;

    /// Attach credentials to an outgoing request.
    ///
    /// Called once per request, before it goes out on the wire.
    async fn on_request(
        &self,
        ctx: &RequestContext<'_>,
        request: &mut reqwest::Request,
    ) -> Result<(), RequestAuthError>;
}

/// Shared handler reference.
pub type BoxedAuthHandler = Arc<dyn AuthHandler>;

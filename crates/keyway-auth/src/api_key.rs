//! Built-in API key handler.
//!
//! The flow takes a key from an environment variable or prompts for one on
//! the terminal. Requests carry it as a bearer token, or in the header named
//! by the profile's `header` parameter.

use crate::error::{FlowError, RequestAuthError};
use crate::handler::{AuthHandler, FlowContext, RequestContext};
use crate::model::TokenPayload;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use std::io::{self, BufRead, Write};

/// Type name the handler is registered under.
pub const API_KEY_TYPE: &str = "api-key";

/// Environment variable checked before prompting.
pub const DEFAULT_API_KEY_ENV: &str = "KEYWAY_API_KEY";

/// Profile key naming a custom header for the key.
pub const HEADER_PARAM: &str = "header";

/// API key authentication.
#[derive(Debug, Clone)]
pub struct ApiKeyHandler {
    env_var: String,
}

impl ApiKeyHandler {
    pub fn new() -> Self {
        Self::with_env_var(DEFAULT_API_KEY_ENV)
    }

    /// Read the key from a different environment variable.
    pub fn with_env_var(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    fn prompt(auth_server_name: &str) -> Result<String, FlowError> {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "Enter API key for {auth_server_name}: ");
        let _ = stderr.flush();

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| FlowError::failed(format!("could not read API key: {e}")))?;
        Ok(line.trim().to_string())
    }
}

impl Default for ApiKeyHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthHandler for ApiKeyHandler {
    async fn execute_flow(&self, ctx: &FlowContext<'_>) -> Result<TokenPayload, FlowError> {
        let key = match std::env::var(&self.env_var) {
            Ok(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => Self::prompt(ctx.auth_server_name)?,
        };

        if key.is_empty() {
            return Err(FlowError::Cancelled);
        }

        let (client_id, issuer) = ctx
            .auth_server
            .map(|s| (s.client_id.as_str(), s.issuer.as_str()))
            .unwrap_or(("", ctx.auth_server_name));

        Ok(TokenPayload::new(client_id, issuer, key).with_token_type("Bearer"))
    }

    fn profile_keys(&self) -> Vec<String> {
        vec![HEADER_PARAM.to_string()]
    }

    async fn on_request(
        &self,
        ctx: &RequestContext<'_>,
        request: &mut reqwest::Request,
    ) -> Result<(), RequestAuthError> {
        let (name, token) = ctx.require_token()?;
        if token.is_expired() {
            return Err(RequestAuthError::Expired {
                credential: name.to_string(),
            });
        }

        let (header, raw) = match ctx.profile.param(HEADER_PARAM) {
            Some(header) => {
                let header = HeaderName::from_bytes(header.as_bytes())
                    .map_err(|e| RequestAuthError::Invalid(format!("header '{header}': {e}")))?;
                (header, token.access_token.clone())
            }
            None => {
                let scheme = token.token_type.as_deref().unwrap_or("Bearer");
                (AUTHORIZATION, format!("{scheme} {}", token.access_token))
            }
        };

        let mut value = HeaderValue::from_str(&raw).map_err(|_| {
            RequestAuthError::Invalid(format!("credential '{name}' is not a valid header value"))
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(header, value);
        Ok(())
    }
}

//! Pluggable authentication for keyway.
//!
//! Auth handlers are registered by type name on an [`AuthSystem`]. The first
//! registration installs [`AuthMiddleware`] into the request pipeline, and
//! from then on every outgoing request is handed to the handler that serves
//! the active profile's auth server.
//!
//! Configuration lives in two JSON documents:
//!
//! - `settings.json`: `auth_servers` and `profiles`
//! - `secrets.json`: `credentials`, created with 0600 permissions on Unix
//!
//! # Example
//!
//! ```no_run
//! use keyway_auth::{ApiKeyHandler, AuthConfig, AuthSystem, HttpPipeline, API_KEY_TYPE};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(AuthConfig::in_dir(Path::new("/tmp/keyway"), "default"));
//!     let pipeline = Arc::new(HttpPipeline::default());
//!     let system = AuthSystem::new(config, pipeline.clone());
//!     system.register(API_KEY_TYPE, Arc::new(ApiKeyHandler::new()));
//!
//!     let response = pipeline.get("https://api.example.com/items").await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```

mod api_key;
pub mod commands;
mod config;
mod error;
mod handler;
mod middleware;
pub mod mock;
mod model;
mod pipeline;
mod registry;

pub use api_key::{ApiKeyHandler, API_KEY_TYPE, DEFAULT_API_KEY_ENV, HEADER_PARAM};
pub use commands::Listing;
pub use config::{default_config_dir, AuthConfig, DEFAULT_PROFILE, SECRETS_FILE, SETTINGS_FILE};
pub use error::{AuthError, AuthResult, FlowError, NameKind, RequestAuthError};
pub use handler::{AuthHandler, BoxedAuthHandler, FlowContext, RequestContext};
pub use middleware::AuthMiddleware;
pub use model::{
    sanitize_name, AuthServer, Credential, Profile, Secrets, Settings, TokenPayload,
    AUTH_SERVERS_KEY, CREDENTIALS_KEY, PROFILES_KEY,
};
pub use pipeline::{HttpPipeline, MiddlewareChain, RequestMiddleware, RequestPipeline};
pub use registry::{AuthSystem, HandlerRegistry};

/// Current time in seconds since the Unix epoch.
pub fn current_time_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

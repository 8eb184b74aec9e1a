//! Error types for authentication operations.

use keyway_store::StoreError;
use thiserror::Error;

/// Which named collection a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    AuthServer,
    Credential,
    Profile,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::AuthServer => f.write_str("auth server"),
            NameKind::Credential => f.write_str("credential"),
            NameKind::Profile => f.write_str("profile"),
        }
    }
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A server, credential or profile with this name already exists.
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: NameKind, name: String },

    /// The name is empty after sanitizing.
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: NameKind, name: String },

    /// No handler can serve the auth server.
    #[error("no handler for auth server '{auth_server}'")]
    NoHandler { auth_server: String },

    /// The credential acquisition flow failed.
    #[error("auth flow failed: {0}")]
    Flow(#[from] FlowError),

    /// The handler could not decorate the request.
    #[error(transparent)]
    RequestAuth(#[from] RequestAuthError),

    /// Settings or secrets could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored document does not have the expected shape.
    #[error("malformed {document} document: {source}")]
    Malformed {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The request could not be sent.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AuthError {
    /// Create a duplicate name error.
    pub fn duplicate(kind: NameKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Create a missing handler error.
    pub fn no_handler(auth_server: impl Into<String>) -> Self {
        Self::NoHandler {
            auth_server: auth_server.into(),
        }
    }
}

/// Why a credential acquisition flow could not complete.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The user aborted the flow.
    #[error("cancelled by user")]
    Cancelled,

    /// The auth server could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The auth server refused to issue a token.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl FlowError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Why a handler could not attach credentials to a request.
#[derive(Debug, Error)]
pub enum RequestAuthError {
    /// No credential is stored for the profile.
    #[error("no credential available for profile '{profile}'")]
    MissingCredential { profile: String },

    /// The stored credential has expired.
    #[error("credential '{credential}' has expired")]
    Expired { credential: String },

    /// The stored credential cannot be used.
    #[error("invalid credential: {0}")]
    Invalid(String),
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_formats_kind() {
        let err = AuthError::duplicate(NameKind::AuthServer, "a-b");
        assert_eq!(err.to_string(), "auth server 'a-b' already exists");
    }

    #[test]
    fn no_handler_names_server() {
        let err = AuthError::no_handler("example-com");
        assert_eq!(err.to_string(), "no handler for auth server 'example-com'");
    }

    #[test]
    fn request_auth_error_is_transparent() {
        let err = AuthError::from(RequestAuthError::Expired {
            credential: "work".to_string(),
        });
        assert_eq!(err.to_string(), "credential 'work' has expired");
    }
}

//! Settings and secrets data model.
//!
//! Settings (non-secret) hold auth server definitions and profiles. Secrets
//! hold credentials, each pairing a token payload with the name of the auth
//! server it was obtained from.

use crate::error::{AuthError, AuthResult, NameKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level key for auth servers in the settings document.
pub const AUTH_SERVERS_KEY: &str = "auth_servers";
/// Top-level key for profiles in the settings document.
pub const PROFILES_KEY: &str = "profiles";
/// Top-level key for credentials in the secrets document.
pub const CREDENTIALS_KEY: &str = "credentials";

/// Turn user input into a storage key.
///
/// Dots separate path segments in the store, so they are replaced with
/// dashes: `example.com` and `example-com` name the same entry.
///
/// Surrounding whitespace is trimmed, so `" work"` and `"work"` are the
/// same name.
pub fn sanitize_name(raw: &str, kind: NameKind) -> AuthResult<String> {
    let name = storage_key(raw);
    if name.is_empty() {
        return Err(AuthError::InvalidName {
            kind,
            name: raw.to_string(),
        });
    }
    Ok(name)
}

fn storage_key(raw: &str) -> String {
    raw.trim().replace('.', "-")
}

/// An authentication endpoint definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthServer {
    pub issuer: String,
    pub client_id: String,
    /// Handler type to use for this server, if not the server name itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
}

/// Opaque credential material produced by a handler's flow.
///
/// Fields a handler does not know about round-trip through `extra`.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPayload {
    pub client_id: String,
    pub issuer: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) when the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenPayload {
    pub fn new(
        client_id: impl Into<String>,
        issuer: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            issuer: issuer.into(),
            access_token: access_token.into(),
            token_type: None,
            refresh_token: None,
            expires_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Whether the token had expired at `now` (unix seconds).
    ///
    /// Tokens without an expiry never expire.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(crate::current_time_secs())
    }
}

impl std::fmt::Debug for TokenPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPayload")
            .field("client_id", &self.client_id)
            .field("issuer", &self.issuer)
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// A named, persisted secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    /// The auth server this credential was obtained from.
    pub auth_server_name: String,
    pub token_payload: TokenPayload,
}

/// A named operating context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Profile {
    /// The profile's name (the settings key, not serialized).
    #[serde(skip)]
    pub name: String,
    /// Auth server whose handler decorates requests for this profile.
    pub auth_server_name: String,
    /// Credential to use. Defaults to the first one for the auth server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_name: Option<String>,
    /// Handler-specific values, keyed by the handler's profile keys.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl Profile {
    /// A profile that is not bound to any auth server.
    pub fn unbound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get a handler parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// The non-secret settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub auth_servers: BTreeMap<String, AuthServer>,
    pub profiles: BTreeMap<String, Profile>,
}

impl Settings {
    /// Parse the settings document.
    pub fn from_document(doc: Value) -> AuthResult<Self> {
        let mut settings: Settings =
            serde_json::from_value(doc).map_err(|source| AuthError::Malformed {
                document: "settings",
                source,
            })?;
        for (name, profile) in settings.profiles.iter_mut() {
            profile.name = name.clone();
        }
        Ok(settings)
    }

    /// Look up a profile, falling back to an unbound one.
    ///
    /// `name` is matched the way profiles are stored, so `ci.prod` finds
    /// the profile added as `ci.prod`.
    pub fn profile(&self, name: &str) -> Profile {
        let key = storage_key(name);
        self.profiles
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Profile::unbound(key))
    }
}

/// The secrets document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Secrets {
    pub credentials: BTreeMap<String, Credential>,
}

impl Secrets {
    /// Parse the secrets document.
    pub fn from_document(doc: Value) -> AuthResult<Self> {
        serde_json::from_value(doc).map_err(|source| AuthError::Malformed {
            document: "secrets",
            source,
        })
    }

    /// Pick the credential a profile should use.
    ///
    /// An explicit `credential_name` wins; otherwise the first credential
    /// (by name) issued by the profile's auth server.
    pub fn credential_for(&self, profile: &Profile) -> Option<(&str, &Credential)> {
        if let Some(name) = &profile.credential_name {
            return self
                .credentials
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v));
        }

        self.credentials
            .iter()
            .find(|(_, c)| c.auth_server_name == profile.auth_server_name)
            .map(|(k, v)| (k.as_str(), v))
    }
}

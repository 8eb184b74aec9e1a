//! Access to the settings and secrets documents for one invocation.

use crate::error::{AuthError, AuthResult, NameKind};
use crate::model::{
    AuthServer, Credential, Profile, Secrets, Settings, AUTH_SERVERS_KEY, CREDENTIALS_KEY,
    PROFILES_KEY,
};
use keyway_store::{DocumentStore, JsonFileStore, MemoryStore, StoreError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE: &str = "settings.json";
/// Secrets file name inside the config directory.
pub const SECRETS_FILE: &str = "secrets.json";
/// Profile used when none is selected.
pub const DEFAULT_PROFILE: &str = "default";

/// Get the default config directory.
///
/// On Unix, prefers `~/.config/keyway` when it exists over the
/// platform-specific directory.
pub fn default_config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("keyway");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }
    }

    dirs::config_dir().map(|d| d.join("keyway"))
}

/// The settings and secrets stores plus the active profile name.
pub struct AuthConfig {
    settings: Arc<dyn DocumentStore>,
    secrets: Arc<dyn DocumentStore>,
    profile_name: String,
}

impl AuthConfig {
    pub fn new(
        settings: Arc<dyn DocumentStore>,
        secrets: Arc<dyn DocumentStore>,
        profile_name: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            secrets,
            profile_name: profile_name.into(),
        }
    }

    /// Use `settings.json` and `secrets.json` in `dir`.
    ///
    /// The secrets file is written with owner-only permissions.
    pub fn in_dir(dir: &Path, profile_name: impl Into<String>) -> Self {
        Self::new(
            Arc::new(JsonFileStore::new(dir.join(SETTINGS_FILE))),
            Arc::new(JsonFileStore::owner_only(dir.join(SECRETS_FILE))),
            profile_name,
        )
    }

    /// Keep both documents in memory.
    pub fn in_memory(profile_name: impl Into<String>) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            profile_name,
        )
    }

    /// Name of the active profile.
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// Read the settings document.
    pub async fn settings(&self) -> AuthResult<Settings> {
        Settings::from_document(self.settings.read().await?)
    }

    /// Read the secrets document.
    pub async fn secrets(&self) -> AuthResult<Secrets> {
        Secrets::from_document(self.secrets.read().await?)
    }

    /// Resolve the active profile.
    pub async fn active_profile(&self) -> AuthResult<Profile> {
        Ok(self.settings().await?.profile(&self.profile_name))
    }

    /// Add an auth server under an already-sanitized name.
    ///
    /// Fails with `DuplicateName` if the name is taken; the check and the
    /// write are one store operation.
    pub async fn insert_auth_server(&self, name: &str, server: &AuthServer) -> AuthResult<()> {
        debug!(auth_server = %name, "Adding auth server");
        let value = serde_json::to_value(server).map_err(StoreError::from)?;
        insert_new(
            self.settings.as_ref(),
            NameKind::AuthServer,
            &format!("{AUTH_SERVERS_KEY}.{name}"),
            name,
            value,
        )
        .await
    }

    /// Add a profile under an already-sanitized name.
    pub async fn insert_profile(&self, name: &str, profile: &Profile) -> AuthResult<()> {
        debug!(profile = %name, "Adding profile");
        let value = serde_json::to_value(profile).map_err(StoreError::from)?;
        insert_new(
            self.settings.as_ref(),
            NameKind::Profile,
            &format!("{PROFILES_KEY}.{name}"),
            name,
            value,
        )
        .await
    }

    /// Store a newly acquired credential.
    ///
    /// The existence check and the write are a single store operation; an
    /// existing credential is never overwritten.
    pub async fn update_credentials_token(
        &self,
        name: &str,
        credential: &Credential,
    ) -> AuthResult<()> {
        debug!(credential = %name, auth_server = %credential.auth_server_name, "Storing credential");
        let value = serde_json::to_value(credential).map_err(StoreError::from)?;
        insert_new(
            self.secrets.as_ref(),
            NameKind::Credential,
            &format!("{CREDENTIALS_KEY}.{name}"),
            name,
            value,
        )
        .await
    }
}

async fn insert_new(
    store: &dyn DocumentStore,
    kind: NameKind,
    path: &str,
    name: &str,
    value: Value,
) -> AuthResult<()> {
    match store.insert(path, value).await {
        Ok(()) => Ok(()),
        Err(StoreError::AlreadyExists(_)) => Err(AuthError::duplicate(kind, name)),
        Err(e) => Err(e.into()),
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("profile_name", &self.profile_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenPayload;
    use serde_json::json;
    use tempfile::TempDir;

    fn credential(server: &str) -> Credential {
        Credential {
            auth_server_name: server.to_string(),
            token_payload: TokenPayload::new("c", "i", "t"),
        }
    }

    #[tokio::test]
    async fn test_insert_auth_server_document_shape() {
        let settings = Arc::new(MemoryStore::new());
        let config = AuthConfig::new(settings.clone(), Arc::new(MemoryStore::new()), "default");

        let server = AuthServer {
            issuer: "https://id.example.com".into(),
            client_id: "cli".into(),
            auth_type: None,
        };
        config.insert_auth_server("example-com", &server).await.unwrap();

        assert_eq!(
            settings.read().await.unwrap(),
            json!({"auth_servers": {"example-com": {
                "issuer": "https://id.example.com",
                "client_id": "cli",
            }}})
        );
        assert_eq!(config.settings().await.unwrap().auth_servers["example-com"], server);
    }

    #[tokio::test]
    async fn test_insert_auth_server_rejects_existing() {
        let config = AuthConfig::in_memory("default");
        let server = |issuer: &str| AuthServer {
            issuer: issuer.into(),
            client_id: "c".into(),
            auth_type: None,
        };

        config.insert_auth_server("a-b", &server("first")).await.unwrap();
        let err = config
            .insert_auth_server("a-b", &server("second"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthError::DuplicateName { kind: NameKind::AuthServer, ref name } if name == "a-b"
        ));
        let settings = config.settings().await.unwrap();
        assert_eq!(settings.auth_servers["a-b"].issuer, "first");
    }

    #[tokio::test]
    async fn test_update_credentials_token_rejects_existing() {
        let config = AuthConfig::in_memory("default");

        config
            .update_credentials_token("work", &credential("a"))
            .await
            .unwrap();
        let err = config
            .update_credentials_token("work", &credential("b"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthError::DuplicateName { kind: NameKind::Credential, ref name } if name == "work"
        ));
        let secrets = config.secrets().await.unwrap();
        assert_eq!(secrets.credentials["work"].auth_server_name, "a");
    }

    #[tokio::test]
    async fn test_active_profile_defaults_to_unbound() {
        let config = AuthConfig::in_memory("ci");
        let profile = config.active_profile().await.unwrap();
        assert_eq!(profile, Profile::unbound("ci"));
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let config = AuthConfig::in_memory("ci");
        let mut profile = Profile {
            auth_server_name: "example-com".into(),
            credential_name: Some("work".into()),
            ..Profile::unbound("ci")
        };
        profile.params.insert("header".into(), "X-Api-Key".into());

        config.insert_profile("ci", &profile).await.unwrap();
        assert_eq!(config.active_profile().await.unwrap(), profile);
    }

    #[tokio::test]
    async fn test_in_dir_uses_separate_files() {
        let dir = TempDir::new().unwrap();
        let config = AuthConfig::in_dir(dir.path(), "default");

        config
            .insert_auth_server(
                "a",
                &AuthServer {
                    issuer: "i".into(),
                    client_id: "c".into(),
                    auth_type: Some("oidc".into()),
                },
            )
            .await
            .unwrap();
        config
            .update_credentials_token("work", &credential("a"))
            .await
            .unwrap();

        let settings = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let secrets = std::fs::read_to_string(dir.path().join(SECRETS_FILE)).unwrap();
        assert!(settings.contains("oidc"));
        assert!(!settings.contains("credentials"));
        assert!(secrets.contains("\"work\""));
        assert!(!secrets.contains("auth_servers"));
    }
}

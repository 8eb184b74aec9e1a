//! Operations behind the `auth` subcommands.
//!
//! Each function runs one command to completion and returns a result; the
//! caller decides how to report errors and what exit status to use.

use crate::error::{AuthError, AuthResult, NameKind};
use crate::handler::FlowContext;
use crate::model::{sanitize_name, AuthServer, Credential, Profile, Secrets, Settings};
use crate::registry::{AuthSystem, HandlerRegistry};
use comfy_table::Table;
use tracing::{info, info_span, warn, Instrument};

/// Register a new auth server.
///
/// Returns the sanitized name it was stored under.
pub async fn add_server(
    system: &AuthSystem,
    raw_name: &str,
    server: AuthServer,
) -> AuthResult<String> {
    let name = sanitize_name(raw_name, NameKind::AuthServer)?;
    let config = system.config();

    config.insert_auth_server(&name, &server).await?;
    info!(
        profile = %config.profile_name(),
        auth_server = %name,
        issuer = %server.issuer,
        "Added auth server"
    );
    Ok(name)
}

/// Run a handler's flow and store the resulting credential.
///
/// An existing credential name is rejected before the flow starts. The auth
/// server is not required to exist; only a handler must be resolvable.
pub async fn add_credentials(
    system: &AuthSystem,
    raw_name: &str,
    auth_server_name: &str,
) -> AuthResult<String> {
    let name = sanitize_name(raw_name, NameKind::Credential)?;
    let server_name = sanitize_name(auth_server_name, NameKind::AuthServer)?;
    let config = system.config();

    let span = info_span!(
        "add_credentials",
        profile = %config.profile_name(),
        credential = %name,
        auth_server = %server_name,
    );

    acquire_credential(system, &name, &server_name)
        .instrument(span)
        .await?;
    Ok(name)
}

async fn acquire_credential(
    system: &AuthSystem,
    name: &str,
    server_name: &str,
) -> AuthResult<()> {
    let config = system.config();

    let secrets = config.secrets().await?;
    if secrets.credentials.contains_key(name) {
        return Err(AuthError::duplicate(NameKind::Credential, name));
    }

    let settings = config.settings().await?;
    let auth_server = settings.auth_servers.get(server_name);
    let handler = system
        .registry()
        .resolve(server_name, auth_server)
        .ok_or_else(|| AuthError::no_handler(server_name))?;

    let token_payload = handler
        .execute_flow(&FlowContext {
            credential_name: name,
            auth_server_name: server_name,
            auth_server,
        })
        .await?;

    let credential = Credential {
        auth_server_name: server_name.to_string(),
        token_payload,
    };
    config.update_credentials_token(name, &credential).await?;

    info!("Stored credential");
    Ok(())
}

/// Create a profile bound to an auth server.
///
/// Params the resolved handler does not declare are kept but warned about.
pub async fn add_profile(
    system: &AuthSystem,
    raw_name: &str,
    profile: Profile,
) -> AuthResult<String> {
    let name = sanitize_name(raw_name, NameKind::Profile)?;
    let config = system.config();

    let settings = config.settings().await?;
    if settings.profiles.contains_key(&name) {
        return Err(AuthError::duplicate(NameKind::Profile, name));
    }

    let auth_server_name = if profile.auth_server_name.is_empty() {
        String::new()
    } else {
        sanitize_name(&profile.auth_server_name, NameKind::AuthServer)?
    };
    let profile = Profile {
        name: name.clone(),
        auth_server_name,
        ..profile
    };

    let auth_server = settings.auth_servers.get(&profile.auth_server_name);
    if let Some(handler) = system
        .registry()
        .resolve(&profile.auth_server_name, auth_server)
    {
        let keys = handler.profile_keys();
        for param in profile.params.keys().filter(|p| !keys.contains(p)) {
            warn!(profile = %name, param = %param, "Param is not used by the auth handler");
        }
    }

    config.insert_profile(&name, &profile).await?;
    info!(profile = %name, auth_server = %profile.auth_server_name, "Added profile");
    Ok(name)
}

/// Rendered output of a listing command.
#[derive(Debug)]
pub enum Listing {
    Table(Table),
    /// Nothing to list; a hint on how to add something.
    Empty(String),
}

impl Listing {
    /// Number of data rows (zero for an empty listing).
    pub fn row_count(&self) -> usize {
        match self {
            Listing::Table(table) => table.row_iter().count(),
            Listing::Empty(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::Empty(_))
    }
}

impl std::fmt::Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listing::Table(table) => write!(f, "{table}"),
            Listing::Empty(hint) => f.write_str(hint),
        }
    }
}

fn table(header: [&str; 3]) -> Table {
    let mut table = Table::new();
    table.set_header(header.to_vec());
    table
}

/// Tabulate auth servers as name, client ID, issuer.
pub fn servers_listing(settings: &Settings, command_path: &str) -> Listing {
    if settings.auth_servers.is_empty() {
        return Listing::Empty(format!(
            "No authentication servers configured. Use `{command_path} auth add-server` to add one."
        ));
    }

    let mut table = table(["Name", "Client ID", "Issuer"]);
    for (name, server) in &settings.auth_servers {
        table.add_row(vec![
            name.as_str(),
            server.client_id.as_str(),
            server.issuer.as_str(),
        ]);
    }
    Listing::Table(table)
}

/// Tabulate credentials as name, client ID, issuer.
pub fn credentials_listing(secrets: &Secrets, command_path: &str) -> Listing {
    if secrets.credentials.is_empty() {
        return Listing::Empty(format!(
            "No credentials configured. Use `{command_path} auth add-credentials` to add one."
        ));
    }

    let mut table = table(["Name", "Client ID", "Issuer"]);
    for (name, credential) in &secrets.credentials {
        let token = &credential.token_payload;
        table.add_row(vec![name.as_str(), token.client_id(), token.issuer()]);
    }
    Listing::Table(table)
}

/// Tabulate registered handlers with the profile keys each one reads.
pub fn handlers_listing(registry: &HandlerRegistry) -> Listing {
    let handlers = registry.list();
    if handlers.is_empty() {
        return Listing::Empty("No auth handlers registered.".to_string());
    }

    let mut table = Table::new();
    table.set_header(vec!["Type", "Profile Keys"]);
    for (type_name, handler) in handlers {
        let type_name = if type_name.is_empty() {
            "(default)".to_string()
        } else {
            type_name
        };
        table.add_row(vec![type_name, handler.profile_keys().join(", ")]);
    }
    Listing::Table(table)
}

pub async fn list_servers(system: &AuthSystem, command_path: &str) -> AuthResult<Listing> {
    let settings = system.config().settings().await?;
    Ok(servers_listing(&settings, command_path))
}

pub async fn list_credentials(system: &AuthSystem, command_path: &str) -> AuthResult<Listing> {
    let secrets = system.config().secrets().await?;
    Ok(credentials_listing(&secrets, command_path))
}

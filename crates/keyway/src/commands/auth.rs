//! Authentication command handlers.

use anyhow::Context;
use clap::Subcommand;
use keyway_auth::commands::{
    add_credentials, add_profile, add_server, handlers_listing, list_credentials, list_servers,
};
use keyway_auth::{AuthServer, AuthSystem, Profile};
use std::collections::BTreeMap;

/// Authentication subcommands.
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Register an auth server
    AddServer {
        /// Server name (dots become dashes)
        name: String,
        /// OAuth client ID
        #[arg(long)]
        client_id: String,
        /// Token issuer URL
        #[arg(long)]
        issuer: String,
        /// Handler type serving this server
        #[arg(long)]
        auth_type: Option<String>,
    },
    /// Acquire and store a credential
    AddCredentials {
        /// Credential name
        name: String,
        /// Auth server to authenticate against
        #[arg(long)]
        auth_server_name: String,
    },
    /// Create a profile bound to an auth server
    AddProfile {
        /// Profile name
        name: String,
        /// Auth server whose handler decorates requests
        #[arg(long)]
        auth_server_name: String,
        /// Credential to use instead of the first one for the server
        #[arg(long)]
        credential: Option<String>,
        /// Handler parameter (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// List auth servers
    ListServers,
    /// List stored credentials
    ListCredentials,
    /// List registered auth handlers
    ListHandlers,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Handle authentication commands.
pub async fn handle_auth(
    system: &AuthSystem,
    command: AuthCommands,
    command_path: &str,
) -> anyhow::Result<()> {
    match command {
        AuthCommands::AddServer {
            name,
            client_id,
            issuer,
            auth_type,
        } => {
            let server = AuthServer {
                issuer,
                client_id,
                auth_type,
            };
            let stored = add_server(system, &name, server)
                .await
                .with_context(|| format!("Failed to add auth server '{name}'"))?;
            println!("Added auth server '{stored}'");
        }
        AuthCommands::AddCredentials {
            name,
            auth_server_name,
        } => {
            let stored = add_credentials(system, &name, &auth_server_name)
                .await
                .with_context(|| {
                    format!(
                        "Failed to add credentials '{name}' (profile '{}')",
                        system.config().profile_name()
                    )
                })?;
            println!("Stored credentials '{stored}'");
        }
        AuthCommands::AddProfile {
            name,
            auth_server_name,
            credential,
            params,
        } => {
            let profile = Profile {
                auth_server_name,
                credential_name: credential,
                params: params.into_iter().collect::<BTreeMap<_, _>>(),
                ..Profile::default()
            };
            let stored = add_profile(system, &name, profile)
                .await
                .with_context(|| format!("Failed to add profile '{name}'"))?;
            println!("Added profile '{stored}'");
        }
        AuthCommands::ListServers => {
            let listing = list_servers(system, command_path)
                .await
                .context("Failed to read settings")?;
            println!("{listing}");
        }
        AuthCommands::ListCredentials => {
            let listing = list_credentials(system, command_path)
                .await
                .context("Failed to read secrets")?;
            println!("{listing}");
        }
        AuthCommands::ListHandlers => {
            println!("{}", handlers_listing(system.registry()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("header=X-Api-Key").unwrap(),
            ("header".to_string(), "X-Api-Key".to_string())
        );
        assert_eq!(
            parse_param("audience=a=b").unwrap(),
            ("audience".to_string(), "a=b".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }
}

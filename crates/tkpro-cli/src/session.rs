//! Session command handlers: role, API key and avatar.

use clap::Subcommand;
use tkpro_core::{AppConfig, Role};
use tkpro_generate::GeminiClient;
use tkpro_store::LocalStore;

/// Sub-commands available under `session`.
#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    /// Switch between the user and admin role
    Role {
        /// `user` or `admin`
        role: Role,
    },
    /// Store the API key used for generation (an empty value removes it)
    Key {
        key: String,
    },
    /// Store the avatar image as inline data
    Avatar {
        data: String,
    },
    /// Forget the role and API key
    Logout,
    /// Show the current session
    Show,
}

/// Builds the generation client with the key the session resolves to.
///
/// A missing key is not an error here; the first generation call reports it.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the client cannot be
/// built.
pub(crate) async fn generation_client(
    config: &AppConfig,
    store: &LocalStore,
) -> anyhow::Result<GeminiClient> {
    let key = store
        .resolve_api_key(config.system_api_key.as_deref())
        .await?;
    if key.is_none() {
        tracing::debug!("no API key resolved for this session");
    }
    let client = GeminiClient::with_base_url(
        key.as_deref(),
        &config.gemini_model,
        config.connect_timeout_secs,
        &config.gemini_base_url,
    )?;
    Ok(client)
}

/// Hint appended to credential errors.
pub(crate) const MISSING_KEY_HINT: &str =
    "set one with `tkpro session key <KEY>`, or switch to `tkpro session role admin` when a system key is configured";

/// Run a `session` sub-command.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub(crate) async fn run_session(
    config: &AppConfig,
    store: &LocalStore,
    command: SessionCommands,
) -> anyhow::Result<()> {
    match command {
        SessionCommands::Role { role } => {
            store.set_role(role).await?;
            println!("role set to {role}");
            if role == Role::Admin && config.system_api_key.is_none() {
                println!("note: no system key is configured; the stored key will be used");
            }
        }
        SessionCommands::Key { key } => {
            store.set_api_key(&key).await?;
            if key.trim().is_empty() {
                println!("stored API key removed");
            } else {
                println!("API key stored");
            }
        }
        SessionCommands::Avatar { data } => {
            store.set_avatar(&data).await?;
            println!("avatar stored ({} bytes)", data.len());
        }
        SessionCommands::Logout => {
            store.logout().await?;
            println!("logged out; role reset to {}", Role::default());
        }
        SessionCommands::Show => {
            let session = store.session().await?;
            let resolved = store
                .resolve_api_key(config.system_api_key.as_deref())
                .await?;

            let avatar = session
                .avatar
                .as_ref()
                .map_or_else(|| "none".to_string(), |a| format!("{} bytes", a.len()));

            println!("{:<14}{}", "role:", session.role);
            println!("{:<14}{}", "stored key:", yes_no(session.has_stored_key));
            println!("{:<14}{}", "system key:", yes_no(config.system_api_key.is_some()));
            println!("{:<14}{}", "can generate:", yes_no(resolved.is_some()));
            println!("{:<14}{avatar}", "avatar:");
        }
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

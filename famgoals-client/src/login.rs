use std::io::{self, Write};
use std::path::{Path, PathBuf};

use famgoals_shared::api;

use crate::AgentError;
use crate::config::{AgentConfig, TokenStorage, load_config, normalize_server_url, save_config};
use crate::token::TokenStore;

/// Logs in as a family, stores the family token and writes the config.
/// Existing settings are kept unless overridden on the command line.
pub async fn login(
    server_arg: Option<String>,
    family_arg: Option<String>,
    health_export_arg: Option<PathBuf>,
    token_file: bool,
    cfg_path: &Path,
) -> Result<(), AgentError> {
    let existing = load_config(cfg_path).ok();

    let server_url = match (server_arg, &existing) {
        (Some(s), _) => normalize_server_url(&s),
        (None, Some(cfg)) => normalize_server_url(&cfg.server_url),
        (None, None) => normalize_server_url(&prompt("Server URL (e.g., 127.0.0.1:5151): ")?),
    };
    let family_name = match family_arg {
        Some(f) => f,
        None => prompt("Family name: ")?,
    };
    let password = rpassword::prompt_password("Family password: ")?;

    let resp = api::rest::login(
        &server_url,
        &api::LoginReq {
            family_name,
            password,
        },
    )
    .await
    .map_err(|e| AgentError::Http(format!("login failed: {e}")))?;

    let health_export = match (health_export_arg, &existing) {
        (Some(p), _) => p,
        (None, Some(cfg)) => cfg.health_export.clone(),
        (None, None) => cfg_path.with_file_name("health.yaml"),
    };
    let token_storage = if token_file {
        TokenStorage::File
    } else {
        existing.as_ref().map(|c| c.token_storage).unwrap_or_default()
    };
    let cfg = AgentConfig {
        server_url: server_url.clone(),
        // A new family token has no member attached
        member_id: None,
        interval_secs: existing.as_ref().map_or(300, |c| c.interval_secs),
        health_export,
        token_storage,
    };
    TokenStore::open(cfg_path, &cfg)?.save(&resp.token)?;
    save_config(cfg_path, &cfg)?;

    println!("Logged in to {} as family {}", server_url, resp.family.name);
    println!("Members:");
    for m in &resp.members {
        println!("  {}  {}", m.id, m.name);
    }
    println!("Run `famgoals-client select-member --member-id <ID>` to choose whose data to sync.");
    Ok(())
}

/// Verifies a member PIN and swaps the stored token for the member token.
pub async fn select_member(member_id: String, cfg_path: &Path) -> Result<(), AgentError> {
    let mut cfg = load_config(cfg_path)?;
    let store = TokenStore::open(cfg_path, &cfg)?;
    let token = store.read()?;
    let pin = rpassword::prompt_password("Member PIN: ")?;

    let resp = api::rest::verify_pin(
        &cfg.server_url,
        &token,
        &api::VerifyPinReq {
            member_id,
            pin,
        },
    )
    .await
    .map_err(|e| AgentError::Http(format!("PIN verification failed: {e}")))?;

    store.save(&resp.token)?;
    cfg.member_id = Some(resp.member.id);
    save_config(cfg_path, &cfg)?;
    println!("Syncing health data for {}", resp.member.name);
    Ok(())
}

fn prompt(msg: &str) -> Result<String, AgentError> {
    print!("{msg}");
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

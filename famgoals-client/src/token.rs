use std::io::Write;
use std::path::{Path, PathBuf};

use crate::AgentError;
use crate::config::{AgentConfig, TokenStorage, normalize_server_url};

const KEYRING_SERVICE: &str = "famgoals-client";
const TOKEN_FILE: &str = "token";

pub fn token_path(config_path: &Path) -> PathBuf {
    config_path.with_file_name(TOKEN_FILE)
}

fn keyring_entry(server_url: &str) -> Result<keyring::Entry, AgentError> {
    keyring::Entry::new(KEYRING_SERVICE, &normalize_server_url(server_url))
        .map_err(|e| AgentError::Keyring(e.to_string()))
}

/// Session token storage selected by [`AgentConfig::token_storage`].
pub enum TokenStore {
    Keyring(keyring::Entry),
    File(PathBuf),
}

impl TokenStore {
    pub fn open(config_path: &Path, cfg: &AgentConfig) -> Result<Self, AgentError> {
        match cfg.token_storage {
            TokenStorage::Keyring => keyring_entry(&cfg.server_url).map(TokenStore::Keyring),
            TokenStorage::File => Ok(TokenStore::File(token_path(config_path))),
        }
    }

    pub fn read(&self) -> Result<String, AgentError> {
        match self {
            TokenStore::Keyring(entry) => match entry.get_password() {
                Ok(token) => Ok(token.trim().to_string()),
                Err(keyring::Error::NoEntry) => Err(AgentError::Auth(
                    "no token in keyring; run `famgoals-client login`".into(),
                )),
                Err(e) => Err(AgentError::Keyring(e.to_string())),
            },
            TokenStore::File(path) => {
                let token = std::fs::read_to_string(path).map_err(|e| {
                    AgentError::Auth(format!(
                        "no token at {} ({e}); run `famgoals-client login`",
                        path.display()
                    ))
                })?;
                Ok(token.trim().to_string())
            }
        }
    }

    pub fn save(&self, token: &str) -> Result<(), AgentError> {
        match self {
            TokenStore::Keyring(entry) => {
                entry
                    .set_password(token)
                    .map_err(|e| AgentError::Keyring(e.to_string()))?;
                // Read back so a keyring that silently drops writes fails here
                entry
                    .get_password()
                    .map_err(|e| AgentError::Keyring(e.to_string()))?;
                Ok(())
            }
            TokenStore::File(path) => write_private(path, token),
        }
    }

    pub fn forget(&self) -> Result<(), AgentError> {
        match self {
            TokenStore::Keyring(entry) => match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(AgentError::Keyring(e.to_string())),
            },
            TokenStore::File(path) => match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }
}

/// Writes `token` to a file only the owner can read. On unix the file is
/// created with mode 0600, and an existing file is narrowed before writing.
fn write_private(path: &Path, token: &str) -> Result<(), AgentError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(token.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

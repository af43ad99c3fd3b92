//! Persisted token pair
//!
//! When `auth.token_file` is configured, every successful refresh rewrites
//! the file so a restart picks up the latest pair instead of the (by then
//! revoked) tokens from the config file. Writes use temp file + rename and
//! mode 0600 since the file holds live tokens.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gateway_auth::RefreshHook;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// On-disk shape of the token file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Read the token file. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> common::Result<Option<StoredTokens>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "token file not found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let tokens = serde_json::from_str(&contents)?;
    Ok(Some(tokens))
}

/// Write the token file atomically with owner-only permissions.
pub fn save(path: &Path, tokens: &StoredTokens) -> common::Result<()> {
    let json = serde_json::to_string_pretty(tokens)?;

    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    // Unique per write: concurrent refreshes may each persist their pair.
    let tmp_path = dir.join(format!(
        ".tokens.tmp.{}.{}",
        std::process::id(),
        uuid::Uuid::new_v4().as_simple()
    ));

    std::fs::write(&tmp_path, json.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), "persisted token pair");
    Ok(())
}

/// A refresh hook that persists each new pair to `path`.
///
/// A failed write is logged; the refreshed tokens stay in memory either way.
pub fn persist_hook(path: PathBuf) -> RefreshHook {
    Arc::new(move |access_token: &str, refresh_token: &str| {
        let tokens = StoredTokens {
            access_token: access_token.to_owned(),
            refresh_token: refresh_token.to_owned(),
        };
        match save(&path, &tokens) {
            Ok(()) => info!(path = %path.display(), "refreshed tokens saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to save refreshed tokens"),
        }
    })
}

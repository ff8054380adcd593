//! Control-plane bearer-token resolution (spec §4.I, §6, §8).
//!
//! The token file lives at `<home>/secrets/internal-api.token`, mode 0600,
//! 32 random bytes hex-encoded with a trailing newline. Generated once on
//! first start and reused across restarts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use rand::RngCore;

const TOKEN_BYTES: usize = 32;

fn token_path(home: &Path) -> PathBuf {
    home.join("secrets").join("internal-api.token")
}

/// Read the existing token for `home`, generating and persisting a fresh
/// one on first call. Idempotent: subsequent calls against the same home
/// return the same value.
pub fn resolve_internal_api_config(home: &Path) -> io::Result<String> {
    let path = token_path(home);

    if let Ok(existing) = fs::read_to_string(&path) {
        let trimmed = existing.trim_end_matches('\n');
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, format!("{token}\n"))?;

    #[cfg(unix)]
    {
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolution_is_idempotent_across_calls() {
        let dir = tempdir().unwrap();
        let first = resolve_internal_api_config(dir.path()).unwrap();
        let second = resolve_internal_api_config(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn token_file_is_newline_terminated() {
        let dir = tempdir().unwrap();
        let token = resolve_internal_api_config(dir.path()).unwrap();
        let raw = fs::read_to_string(dir.path().join("secrets").join("internal-api.token")).unwrap();
        assert_eq!(raw, format!("{token}\n"));
    }

    #[test]
    fn token_is_64_hex_chars() {
        let dir = tempdir().unwrap();
        let token = resolve_internal_api_config(dir.path()).unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_owner_only() {
        let dir = tempdir().unwrap();
        resolve_internal_api_config(dir.path()).unwrap();
        let meta = fs::metadata(dir.path().join("secrets").join("internal-api.token")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}

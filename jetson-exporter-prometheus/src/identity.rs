//! Process identity reported alongside the board information.
//!
//! The user name and hostname are resolved once during startup and never
//! re-read, so every scrape reports the same values.

use std::path::{Path, PathBuf};

use nix::unistd::{Uid, User};
use thiserror::Error;
use tracing::debug;

/// Environment variables consulted for the user name, in order.
const USER_ENV_VARS: &[&str] = &["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Identity resolution errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Failed to read hostname from {path}: {source}")]
    HostnameRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Hostname file {0} is empty")]
    HostnameEmpty(PathBuf),

    #[error("Cannot determine user name for uid {0}")]
    UnknownUser(u32),
}

/// User name and hostname of the exporter process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub username: String,
    pub hostname: String,
}

impl HostIdentity {
    pub fn new(username: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            hostname: hostname.into(),
        }
    }

    /// Resolve the identity of the running process.
    pub fn detect(hostname_file: &Path) -> Result<Self, IdentityError> {
        let hostname = read_hostname(hostname_file)?;
        let username = current_username()?;

        debug!(username = %username, hostname = %hostname, "Resolved host identity");
        Ok(Self { username, hostname })
    }
}

/// Read the hostname from a file such as `/etc/hostname`.
pub fn read_hostname(path: &Path) -> Result<String, IdentityError> {
    let content = std::fs::read_to_string(path).map_err(|source| IdentityError::HostnameRead {
        path: path.to_path_buf(),
        source,
    })?;

    let hostname = content.trim();
    if hostname.is_empty() {
        return Err(IdentityError::HostnameEmpty(path.to_path_buf()));
    }
    Ok(hostname.to_string())
}

/// Name of the user running the process.
///
/// The login environment wins, then the password database entry for the
/// effective uid.
pub fn current_username() -> Result<String, IdentityError> {
    if let Some(name) = username_from_env(|key| std::env::var(key).ok()) {
        return Ok(name);
    }

    let uid = nix::unistd::geteuid();
    lookup_user(uid)
}

fn username_from_env<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    USER_ENV_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}

fn lookup_user(uid: Uid) -> Result<String, IdentityError> {
    match User::from_uid(uid) {
        Ok(Some(user)) => Ok(user.name),
        Ok(None) => Err(IdentityError::UnknownUser(uid.as_raw())),
        Err(e) => {
            debug!(uid = uid.as_raw(), error = %e, "Password database lookup failed");
            Err(IdentityError::UnknownUser(uid.as_raw()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_read_hostname_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostname");
        std::fs::write(&path, "jetson-orin\n").unwrap();

        assert_eq!(read_hostname(&path).unwrap(), "jetson-orin");
    }

    #[test]
    fn test_read_hostname_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_hostname(&dir.path().join("hostname"));

        assert!(matches!(result, Err(IdentityError::HostnameRead { .. })));
    }

    #[test]
    fn test_read_hostname_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostname");
        std::fs::write(&path, " \n").unwrap();

        assert!(matches!(
            read_hostname(&path),
            Err(IdentityError::HostnameEmpty(_))
        ));
    }

    #[test]
    fn test_username_env_order() {
        let env: HashMap<&str, &str> = [("USER", "nvidia"), ("USERNAME", "other")].into();
        let name = username_from_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(name.as_deref(), Some("nvidia"));

        let env: HashMap<&str, &str> = [("LOGNAME", ""), ("LNAME", "jetson")].into();
        let name = username_from_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(name.as_deref(), Some("jetson"));

        assert_eq!(username_from_env(|_| None), None);
    }

    #[test]
    fn test_detect_with_hostname_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostname");
        std::fs::write(&path, "orin-01\n").unwrap();

        // The user name depends on the test environment
        if let Ok(identity) = HostIdentity::detect(&path) {
            assert_eq!(identity.hostname, "orin-01");
            assert!(!identity.username.is_empty());
        }
    }
}

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;

pub const PASSWORD_ENV_VAR: &str = "SIA_API_PASSWORD";
const PASSWORD_FILE: &str = "apipassword";

/// Default siad data directory for the current platform.
pub fn default_sia_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir().map(|p| p.join("Sia"))
    } else if cfg!(target_os = "macos") {
        dirs::home_dir().map(|p| p.join("Library").join("Application Support").join("Sia"))
    } else {
        dirs::home_dir().map(|p| p.join(".sia"))
    }
}

/// One place an API password may come from.
#[derive(Debug, Clone)]
pub enum PasswordSource {
    Explicit(String),
    Env(String),
    File(PathBuf),
}

impl PasswordSource {
    fn resolve(&self) -> Option<String> {
        match self {
            PasswordSource::Explicit(password) => {
                Some(password.clone()).filter(|p| !p.trim().is_empty())
            }
            PasswordSource::Env(var) => std::env::var(var).ok().filter(|p| !p.is_empty()),
            PasswordSource::File(path) => match std::fs::read(path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => Some(text.trim().to_string()).filter(|p| !p.is_empty()),
                    Err(e) => {
                        tracing::warn!(?path, error = %e, "API password file is not valid UTF-8");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(?path, error = %e, "Unable to read API password file");
                    None
                }
            },
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PasswordSource::Explicit(_) => "config",
            PasswordSource::Env(_) => "environment",
            PasswordSource::File(_) => "password file",
        }
    }
}

/// Ordered password lookup; the first non-empty result is memoized.
#[derive(Debug)]
pub struct PasswordResolver {
    sources: Vec<PasswordSource>,
    resolved: OnceCell<String>,
    warned_missing: AtomicBool,
}

impl PasswordResolver {
    pub fn new(sources: Vec<PasswordSource>) -> Self {
        Self {
            sources,
            resolved: OnceCell::new(),
            warned_missing: AtomicBool::new(false),
        }
    }

    /// Config password, then `SIA_API_PASSWORD`, then `<sia dir>/apipassword`.
    pub fn with_defaults(explicit: Option<&str>) -> Self {
        let mut sources = Vec::new();
        if let Some(password) = explicit {
            sources.push(PasswordSource::Explicit(password.to_string()));
        }
        sources.push(PasswordSource::Env(PASSWORD_ENV_VAR.to_string()));
        if let Some(dir) = default_sia_dir() {
            sources.push(PasswordSource::File(dir.join(PASSWORD_FILE)));
        }
        Self::new(sources)
    }

    /// Resolved password, or an empty string when no source has one. Misses
    /// are not cached so a password file created later is still picked up.
    pub async fn password(&self) -> String {
        let resolved = self
            .resolved
            .get_or_try_init(|| async {
                for source in &self.sources {
                    if let Some(password) = source.resolve() {
                        tracing::debug!(source = source.label(), "Resolved API password");
                        return Ok(password);
                    }
                }
                Err(())
            })
            .await;

        match resolved {
            Ok(password) => password.clone(),
            Err(()) => {
                if !self.warned_missing.swap(true, Ordering::Relaxed) {
                    tracing::warn!("No API password found, sending requests without one");
                } else {
                    tracing::debug!("Still no API password found");
                }
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sia-host-monitor-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_explicit_password_wins() {
        let file = temp_file("explicit-apipassword", b"from-file\n");
        let resolver = PasswordResolver::new(vec![
            PasswordSource::Explicit("from-config".to_string()),
            PasswordSource::File(file.clone()),
        ]);

        assert_eq!(resolver.password().await, "from-config");
        let _ = std::fs::remove_file(file);
    }

    #[tokio::test]
    async fn test_blank_explicit_falls_through_to_file() {
        let file = temp_file("blank-apipassword", b"  secret-token \r\n");
        let resolver = PasswordResolver::new(vec![
            PasswordSource::Explicit("   ".to_string()),
            PasswordSource::Env("SIA_HOST_MONITOR_TEST_UNSET_VAR".to_string()),
            PasswordSource::File(file.clone()),
        ]);

        assert_eq!(resolver.password().await, "secret-token");
        let _ = std::fs::remove_file(file);
    }

    #[tokio::test]
    async fn test_resolved_password_is_cached() {
        let file = temp_file("cached-apipassword", b"first");
        let resolver = PasswordResolver::new(vec![PasswordSource::File(file.clone())]);

        assert_eq!(resolver.password().await, "first");
        std::fs::write(&file, b"second").unwrap();
        assert_eq!(resolver.password().await, "first");
        let _ = std::fs::remove_file(file);
    }

    #[tokio::test]
    async fn test_missing_password_is_empty_and_not_cached() {
        let path = std::env::temp_dir().join(format!(
            "sia-host-monitor-{}-late-apipassword",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let resolver = PasswordResolver::new(vec![PasswordSource::File(path.clone())]);

        assert_eq!(resolver.password().await, "");
        assert!(resolver.warned_missing.load(Ordering::Relaxed));
        assert_eq!(resolver.password().await, "");

        std::fs::write(&path, b"late").unwrap();
        assert_eq!(resolver.password().await, "late");
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_invalid_utf8_file_is_a_miss() {
        let bad = temp_file("invalid-apipassword", &[0x70, 0x77, 0xff, 0xfe]);
        let good = temp_file("fallback-apipassword", b"fallback");
        let resolver = PasswordResolver::new(vec![
            PasswordSource::File(bad.clone()),
            PasswordSource::File(good.clone()),
        ]);

        assert_eq!(resolver.password().await, "fallback");
        let _ = std::fs::remove_file(bad);
        let _ = std::fs::remove_file(good);
    }
}

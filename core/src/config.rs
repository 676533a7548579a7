//! Process configuration for the mathanGO backend.
//!
//! The backend reads four settings at startup: where to bind, which port to
//! listen on, which environment it runs in, and the Gemini API key. Values
//! are taken verbatim from the environment; the first three fall back to
//! defaults and the API key is simply absent when unset.

use crate::env::{Environment, Origin};
use crate::error::ConfigError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the bind address.
pub const SERVER_URL_KEY: &str = "SERVER_URL";
/// Environment variable holding the listen port.
pub const PORT_KEY: &str = "PORT";
/// Environment variable holding the environment name.
pub const ENV_KEY: &str = "ENV";
/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_KEY: &str = "GEMINI_API_KEY";

/// Bind address used when `SERVER_URL` is unset.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: &str = "8000";
/// Environment name used when `ENV` is unset.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Environment name that enables development behaviour.
const DEVELOPMENT_ENVIRONMENT: &str = "dev";

/// Settings resolved once at startup and shared read-only afterwards.
///
/// Build one with [`ProcessConfig::from_env`] at process entry and pass it
/// by reference (or in an `Arc`) to whatever needs it. Tests can resolve
/// against an injected [`Environment`] instead.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[allow(clippy::module_name_repetitions)]
pub struct ProcessConfig {
    /// Interface to bind
    bind_address: String,
    /// Listen port, kept as text
    port: String,
    /// Environment name, conventionally `dev` or `prod`
    environment: String,
    /// Gemini API key
    #[serde(serialize_with = "serialize_masked")]
    api_key: Option<String>,
}

impl ProcessConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the current directory or one of its ancestors is
    /// merged first, best effort: variables already set in the process
    /// environment take precedence, and a missing or malformed file is
    /// ignored. This never fails.
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(&Environment::capture().with_dotenv())
    }

    /// Resolve configuration from an environment snapshot.
    #[must_use]
    pub fn resolve(env: &Environment) -> Self {
        let lookup = |key: &str, default: &str| {
            env.get(key).map_or_else(|| default.to_string(), str::to_string)
        };

        Self {
            bind_address: lookup(SERVER_URL_KEY, DEFAULT_BIND_ADDRESS),
            port: lookup(PORT_KEY, DEFAULT_PORT),
            environment: lookup(ENV_KEY, DEFAULT_ENVIRONMENT),
            api_key: env.get(GEMINI_API_KEY_KEY).map(str::to_string),
        }
    }

    /// Interface the service should bind to.
    #[must_use]
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Listen port as text.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Environment name.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Gemini API key, if one was provided.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Whether the service runs in the development environment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT_ENVIRONMENT
    }

    /// `address:port` string for a listener.
    #[must_use]
    pub fn bind_target(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get masked API key for display (shows only first and last 4 chars).
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        mask_key(self.api_key())
    }

    /// Parse the port as a TCP port number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] if the text is not a `u16`.
    pub fn port_number(&self) -> Result<u16, ConfigError> {
        self.port.parse().map_err(|source| ConfigError::InvalidPort {
            value: self.port.clone(),
            source,
        })
    }

    /// Get the API key, treating an unset or empty key as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if no usable key is present.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Describe each setting and where its value came from.
    ///
    /// `env` should be the snapshot this configuration was resolved from.
    #[must_use]
    pub fn report(&self, env: &Environment) -> Vec<SettingReport> {
        let source = |key: &str, has_default: bool| match env.origin(key) {
            Some(Origin::Process) => Source::Process,
            Some(Origin::EnvFile(path)) => Source::EnvFile(path.clone()),
            None if has_default => Source::Default,
            None => Source::Unset,
        };

        vec![
            SettingReport {
                key: SERVER_URL_KEY,
                value: self.bind_address.clone(),
                source: source(SERVER_URL_KEY, true),
            },
            SettingReport {
                key: PORT_KEY,
                value: self.port.clone(),
                source: source(PORT_KEY, true),
            },
            SettingReport {
                key: ENV_KEY,
                value: self.environment.clone(),
                source: source(ENV_KEY, true),
            },
            SettingReport {
                key: GEMINI_API_KEY_KEY,
                value: self.masked_api_key(),
                source: source(GEMINI_API_KEY_KEY, false),
            },
        ]
    }
}

impl fmt::Debug for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConfig")
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("api_key", &self.masked_api_key())
            .finish()
    }
}

/// Where a resolved setting came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Source {
    /// Process environment
    Process,
    /// Env file at this path
    EnvFile(PathBuf),
    /// Built-in default
    Default,
    /// Not set and no default
    Unset,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => f.write_str("environment"),
            Self::EnvFile(path) => write!(f, "env file {}", path.display()),
            Self::Default => f.write_str("default"),
            Self::Unset => f.write_str("unset"),
        }
    }
}

/// One line of [`ProcessConfig::report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingReport {
    /// Environment variable name
    pub key: &'static str,
    /// Display value (the API key is masked)
    pub value: String,
    /// Where the value came from
    pub source: Source,
}

/// Display form of an optional API key.
fn mask_key(key: Option<&str>) -> String {
    let Some(key) = key else {
        return "(no key)".to_string();
    };

    let len = key.chars().count();
    if len > 8 {
        let head: String = key.chars().take(4).collect();
        let tail: String = key.chars().skip(len - 4).collect();
        format!("{head}...{tail}")
    } else if len > 0 {
        "*".repeat(len)
    } else {
        "(empty)".to_string()
    }
}

/// Serialize the API key in masked form.
#[allow(clippy::ref_option)]
fn serialize_masked<S: Serializer>(
    key: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&mask_key(key.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn resolve<const N: usize>(pairs: [(&str, &str); N]) -> ProcessConfig {
        ProcessConfig::resolve(&Environment::from_pairs(pairs))
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = resolve([]);

        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.port(), "8000");
        assert_eq!(config.environment(), "dev");
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_values_used_verbatim() {
        let config = resolve([
            ("SERVER_URL", " 127.0.0.1 "),
            ("PORT", "not-a-port"),
            ("ENV", "Prod"),
            ("GEMINI_API_KEY", "abc123"),
        ]);

        assert_eq!(config.bind_address(), " 127.0.0.1 ");
        assert_eq!(config.port(), "not-a-port");
        assert_eq!(config.environment(), "Prod");
        assert_eq!(config.api_key(), Some("abc123"));
    }

    #[test]
    fn test_partial_override() {
        let config = resolve([("PORT", "3000"), ("ENV", "prod")]);

        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.port(), "3000");
        assert_eq!(config.environment(), "prod");
        assert_eq!(config.api_key(), None);
        assert!(!config.is_development());
    }

    #[test]
    fn test_empty_api_key_is_not_absent() {
        let config = resolve([("GEMINI_API_KEY", "")]);

        assert_eq!(config.api_key(), Some(""));
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let env = Environment::from_pairs([("ENV", "prod"), ("GEMINI_API_KEY", "abc123")]);
        assert_eq!(ProcessConfig::resolve(&env), ProcessConfig::resolve(&env));
    }

    #[test]
    fn test_bind_target_and_development_flag() {
        let config = resolve([]);
        assert_eq!(config.bind_target(), "0.0.0.0:8000");
        assert!(config.is_development());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_port_number() {
        assert_eq!(resolve([("PORT", "3000")]).port_number().unwrap(), 3000);

        let err = resolve([("PORT", "70000")]).port_number().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { ref value, .. } if value == "70000"));
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_require_api_key() {
        assert_eq!(
            resolve([("GEMINI_API_KEY", "abc123")]).require_api_key().unwrap(),
            "abc123"
        );
        assert!(matches!(
            resolve([]).require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_masked_api_key() {
        assert_eq!(
            resolve([("GEMINI_API_KEY", "sk-test1234abcd")]).masked_api_key(),
            "sk-t...abcd"
        );
        assert_eq!(resolve([("GEMINI_API_KEY", "short")]).masked_api_key(), "*****");
        assert_eq!(resolve([("GEMINI_API_KEY", "")]).masked_api_key(), "(empty)");
        assert_eq!(resolve([]).masked_api_key(), "(no key)");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_debug_and_serialize_mask_key() {
        let config = resolve([("GEMINI_API_KEY", "AIzaSecretValue9876")]);

        let debug = format!("{config:?}");
        assert!(!debug.contains("SecretValue"));
        assert!(debug.contains("AIza...9876"));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["api_key"], "AIza...9876");
        assert_eq!(json["port"], "8000");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_missing_and_empty_env_file_resolve_alike() {
        let dir = tempfile::TempDir::new().unwrap();
        let empty = dir.path().join("empty.env");
        std::fs::write(&empty, "").unwrap();

        let missing = dir.path().join("missing.env");
        let from_missing = ProcessConfig::resolve(&Environment::default().with_env_file(missing));
        let from_empty = ProcessConfig::resolve(&Environment::default().with_env_file(&empty));

        assert_eq!(from_missing, from_empty);
        assert_eq!(from_missing, resolve([]));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_report_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "ENV=prod\n").unwrap();
        let env = Environment::from_pairs([("PORT", "3000")]).with_env_file(&path);

        let report = ProcessConfig::resolve(&env).report(&env);

        let sources: Vec<_> = report.iter().map(|r| (r.key, r.source.clone())).collect();
        assert_eq!(
            sources,
            vec![
                ("SERVER_URL", Source::Default),
                ("PORT", Source::Process),
                ("ENV", Source::EnvFile(path)),
                ("GEMINI_API_KEY", Source::Unset),
            ]
        );
        assert_eq!(report.last().map(|r| r.value.as_str()), Some("(no key)"));
    }

    /// Sets process variables for one test and restores them on drop.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(name, _)| (*name, std::env::var(name).ok()))
                .collect();
            for (name, value) in vars {
                apply(name, *value);
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                apply(name, value.as_deref());
            }
        }
    }

    fn apply(name: &str, value: Option<&str>) {
        // SAFETY: callers are #[serial], so no other test thread touches the environment.
        unsafe {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }

    #[test]
    #[serial]
    fn test_capture_reads_process_environment() {
        let _guard = EnvGuard::set(&[
            ("SERVER_URL", None),
            ("PORT", Some("3000")),
            ("ENV", Some("prod")),
            ("GEMINI_API_KEY", None),
        ]);

        let config = ProcessConfig::resolve(&Environment::capture());

        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.port(), "3000");
        assert_eq!(config.environment(), "prod");
        assert_eq!(config.api_key(), None);
    }

    #[test]
    #[serial]
    fn test_capture_api_key() {
        let _guard = EnvGuard::set(&[("GEMINI_API_KEY", Some("abc123"))]);

        let config = ProcessConfig::resolve(&Environment::capture());

        assert_eq!(config.api_key(), Some("abc123"));
    }

    #[test]
    #[serial]
    fn test_from_env_is_idempotent() {
        assert_eq!(ProcessConfig::from_env(), ProcessConfig::from_env());
    }
}

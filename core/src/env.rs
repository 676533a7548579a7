//! Environment variable snapshot with best-effort `.env` merging.
//!
//! An [`Environment`] is the variable table configuration is resolved from.
//! It starts as a copy of the process environment (or an injected set of
//! pairs) and may be topped up from a dotenv file. File entries only fill
//! gaps: a name already present is never overwritten. The process
//! environment itself is never modified.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File name looked up by [`Environment::with_dotenv`].
pub const ENV_FILE_NAME: &str = ".env";

/// Where a variable in an [`Environment`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Present in the process environment (or injected directly).
    Process,
    /// Filled in from the env file at this path.
    EnvFile(PathBuf),
}

/// Snapshot of environment variables used for configuration resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Variable name to value and origin
    vars: HashMap<String, (String, Origin)>,
    /// Env file merged into this snapshot, if any
    env_file: Option<PathBuf>,
}

impl Environment {
    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    #[must_use]
    pub fn capture() -> Self {
        Self::from_pairs(
            std::env::vars_os().filter_map(|(name, value)| {
                Some((name.into_string().ok()?, value.into_string().ok()?))
            }),
        )
    }

    /// Build an environment from explicit name/value pairs.
    ///
    /// Every entry is treated as if it came from the process environment.
    /// When a name repeats, the last value wins.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), (value.into(), Origin::Process)))
            .collect();

        Self {
            vars,
            env_file: None,
        }
    }

    /// Merge entries from the env file at `path`, best effort.
    ///
    /// Entries are only added for names that are not already set. If the file
    /// cannot be opened or any line fails to parse, nothing is merged and the
    /// environment is returned unchanged.
    ///
    /// `${VAR}` references inside the file are expanded by `dotenvy` against
    /// the real process environment and earlier lines of the same file, not
    /// against this snapshot.
    #[must_use]
    pub fn with_env_file(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match dotenvy::from_path_iter(path) {
            Ok(entries) => self.merge_entries(entries, path),
            Err(_) => self,
        }
    }

    /// Search the current directory and its ancestors for `.env` and merge
    /// the first one found, best effort.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        match std::env::current_dir() {
            Ok(dir) => self.with_dotenv_from(&dir),
            Err(_) => self,
        }
    }

    /// Like [`Environment::with_dotenv`], starting the search at `dir`.
    #[must_use]
    pub fn with_dotenv_from(self, dir: &Path) -> Self {
        match find_env_file(dir) {
            Some(path) => self.with_env_file(path),
            None => self,
        }
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|(value, _)| value.as_str())
    }

    /// Where a variable came from, if it is set.
    #[must_use]
    pub fn origin(&self, name: &str) -> Option<&Origin> {
        self.vars.get(name).map(|(_, origin)| origin)
    }

    /// The env file that was merged into this snapshot.
    #[must_use]
    pub fn env_file_path(&self) -> Option<&Path> {
        self.env_file.as_deref()
    }

    /// Apply parsed file entries, all or nothing.
    fn merge_entries<I>(mut self, entries: I, path: &Path) -> Self
    where
        I: IntoIterator<Item = Result<(String, String), dotenvy::Error>>,
    {
        let Ok(entries) = entries.into_iter().collect::<Result<Vec<_>, _>>() else {
            return self;
        };

        for (name, value) in entries {
            // First definition wins, same as a non-overriding dotenv load.
            self.vars
                .entry(name)
                .or_insert_with(|| (value, Origin::EnvFile(path.to_path_buf())));
        }
        self.env_file = Some(path.to_path_buf());
        self
    }
}

/// Find the nearest `.env` file at or above `start`.
fn find_env_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(ENV_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

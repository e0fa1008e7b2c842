//! Wiki location and runtime settings.
//!
//! # Responsibility
//! - Resolve the data root from explicit flags, environment and defaults.
//! - Derive the notes and log directories from that root.
//!
//! # Invariants
//! - Precedence: explicit value, then environment, then default.
//! - Resolved roots are absolute, so logging and file paths never depend on
//!   a later change of working directory.

use crate::editor::DEFAULT_EDITOR;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data root.
pub const HOME_ENV: &str = "NOTEWIKI_HOME";
/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "NOTEWIKI_LOG";
/// Standard editor variable.
pub const EDITOR_ENV: &str = "EDITOR";

const DEFAULT_ROOT_DIR_NAME: &str = ".notewiki";
const NOTES_DIR_NAME: &str = "wiki";
const LOGS_DIR_NAME: &str = "logs";

/// Configuration resolution failure.
#[derive(Debug)]
pub enum ConfigError {
    /// No explicit root, no environment override, and no home directory.
    NoHomeDirectory,
    /// A relative root could not be anchored to the working directory.
    CurrentDir(io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHomeDirectory => write!(
                f,
                "cannot locate a home directory; pass --data or set {HOME_ENV}"
            ),
            Self::CurrentDir(err) => write!(f, "cannot resolve working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoHomeDirectory => None,
            Self::CurrentDir(err) => Some(err),
        }
    }
}

/// Explicit overrides, usually from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub log_level: Option<String>,
    pub editor: Option<String>,
}

/// Resolved wiki settings threaded through the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiConfig {
    /// Absolute data root.
    pub root: PathBuf,
    /// Editor command line.
    pub editor: String,
    /// Log level name.
    pub log_level: String,
}

impl WikiConfig {
    /// Resolves settings from overrides, an environment lookup and the home dir.
    ///
    /// `env` is injected so resolution stays testable without touching the
    /// process environment.
    pub fn resolve(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
        home_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let non_blank = |value: String| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        };

        let root = match overrides
            .root
            .or_else(|| env(HOME_ENV).and_then(non_blank).map(PathBuf::from))
        {
            Some(root) => root,
            None => home_dir
                .ok_or(ConfigError::NoHomeDirectory)?
                .join(DEFAULT_ROOT_DIR_NAME),
        };

        let editor = overrides
            .editor
            .and_then(non_blank)
            .or_else(|| env(EDITOR_ENV).and_then(non_blank))
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());

        let log_level = overrides
            .log_level
            .and_then(non_blank)
            .or_else(|| env(LOG_LEVEL_ENV).and_then(non_blank))
            .unwrap_or_else(|| default_log_level().to_string());

        Ok(Self {
            root: absolutize(&root)?,
            editor,
            log_level,
        })
    }

    /// Directory holding note files.
    pub fn notes_dir(&self) -> PathBuf {
        self.root.join(NOTES_DIR_NAME)
    }

    /// Directory holding rolling log files.
    pub fn log_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR_NAME)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConfigOverrides, WikiConfig, EDITOR_ENV, HOME_ENV};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_root_wins_over_environment() {
        let overrides = ConfigOverrides {
            root: Some(PathBuf::from("/data/flag")),
            ..ConfigOverrides::default()
        };
        let config = WikiConfig::resolve(
            overrides,
            env_from(&[(HOME_ENV, "/data/env")]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(config.root, PathBuf::from("/data/flag"));
        assert_eq!(config.notes_dir(), PathBuf::from("/data/flag/wiki"));
        assert_eq!(config.log_dir(), PathBuf::from("/data/flag/logs"));
    }

    #[test]
    fn environment_then_home_default() {
        let from_env = WikiConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[(HOME_ENV, "/data/env"), (EDITOR_ENV, "nano")]),
            None,
        )
        .unwrap();
        assert_eq!(from_env.root, PathBuf::from("/data/env"));
        assert_eq!(from_env.editor, "nano");

        let from_home = WikiConfig::resolve(
            ConfigOverrides::default(),
            env_from(&[(HOME_ENV, "  ")]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(from_home.root, PathBuf::from("/home/u/.notewiki"));
        assert_eq!(from_home.editor, "vi");
    }

    #[test]
    fn missing_home_is_reported() {
        let err = WikiConfig::resolve(ConfigOverrides::default(), env_from(&[]), None).unwrap_err();
        assert!(matches!(err, ConfigError::NoHomeDirectory));
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let overrides = ConfigOverrides {
            root: Some(PathBuf::from("relative-wiki")),
            ..ConfigOverrides::default()
        };
        let config = WikiConfig::resolve(overrides, env_from(&[]), None).unwrap();
        assert!(config.root.is_absolute());
        assert!(config.root.ends_with("relative-wiki"));
    }
}

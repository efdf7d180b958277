//! Configuration file lookup.
//!
//! Order:
//!
//! 1. `--config` flag
//! 2. `blocklint.toml` or `.blocklint.toml` in the working directory
//! 3. `config.toml` in `$BLOCKLINT_CONFIG_DIR`, else in `~/.blocklint/`
//! 4. built-in defaults

use anyhow::{Context, Result};
use blocklint::Config;
use std::path::{Path, PathBuf};

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found in the working directory.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// The resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Reads and parses the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn load(&self) -> Result<Config> {
        let Some(path) = self.path() else {
            tracing::debug!("No configuration file, using defaults");
            return Ok(Config::default());
        };
        tracing::debug!("Loading configuration from {}", path.display());
        Config::from_file(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))
    }
}

const PROJECT_CONFIG_NAMES: &[&str] = &["blocklint.toml", ".blocklint.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Environment variable replacing `~/.blocklint` as global directory.
pub const CONFIG_DIR_ENV: &str = "BLOCKLINT_CONFIG_DIR";

/// Resolves the configuration for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(project_dir, explicit, global_config_dir())
}

fn resolve_inner(
    project_dir: &Path,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    for name in PROJECT_CONFIG_NAMES {
        let candidate = project_dir.join(name);
        if candidate.exists() {
            tracing::debug!("Found project config: {}", candidate.display());
            return ConfigSource::Project(candidate);
        }
    }

    if let Some(dir) = global_dir {
        let candidate = dir.join(GLOBAL_CONFIG_NAME);
        if candidate.exists() {
            tracing::debug!("Found global config: {}", candidate.display());
            return ConfigSource::Global(candidate);
        }
    }

    ConfigSource::Default
}

/// The global configuration directory.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".blocklint"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint::EngineMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_wins_without_existence_check() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("blocklint.toml"), "").unwrap();

        let result = resolve_inner(project.path(), Some(Path::new("/nonexistent.toml")), None);
        assert_eq!(result, ConfigSource::Explicit(PathBuf::from("/nonexistent.toml")));
    }

    #[test]
    fn plain_name_preferred_over_dot_prefix() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".blocklint.toml"), "").unwrap();
        assert_eq!(
            resolve_inner(tmp.path(), None, None),
            ConfigSource::Project(tmp.path().join(".blocklint.toml"))
        );

        fs::write(tmp.path().join("blocklint.toml"), "").unwrap();
        assert_eq!(
            resolve_inner(tmp.path(), None, None),
            ConfigSource::Project(tmp.path().join("blocklint.toml"))
        );
    }

    #[test]
    fn global_is_the_fallback() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let global_dir = Some(global.path().to_path_buf());
        assert_eq!(
            resolve_inner(project.path(), None, global_dir.clone()),
            ConfigSource::Default
        );

        fs::write(global.path().join("config.toml"), "").unwrap();
        assert_eq!(
            resolve_inner(project.path(), None, global_dir.clone()),
            ConfigSource::Global(global.path().join("config.toml"))
        );

        fs::write(project.path().join("blocklint.toml"), "").unwrap();
        assert!(matches!(
            resolve_inner(project.path(), None, global_dir),
            ConfigSource::Project(_)
        ));
    }

    #[test]
    fn load_reads_the_resolved_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blocklint.toml");
        fs::write(&path, "[engine]\nmode = \"rules\"\n").unwrap();

        let config = ConfigSource::Project(path).load().unwrap();
        assert_eq!(config.engine.mode, EngineMode::Rules);
        assert!(ConfigSource::Default.load().unwrap().classifiers.is_empty());
    }

    #[test]
    fn load_errors_name_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.toml");
        fs::write(&path, "[engine\n").unwrap();

        let err = ConfigSource::Explicit(path.clone()).load().unwrap_err();
        assert!(format!("{err:#}").contains(&path.display().to_string()));
    }
}

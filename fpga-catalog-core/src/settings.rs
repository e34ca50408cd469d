//! Application settings: where the catalog database lives, where artifacts
//! are downloaded to, which key signs platform releases.
//!
//! Values come from, in priority order, a command-line override, an
//! environment variable, `~/.config/fpga-catalog/settings.toml`, and a
//! built-in default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_DB: &str = "FPGA_CATALOG_DB";
pub const ENV_ROOT: &str = "FPGA_CATALOG_ROOT";
pub const ENV_PUBLIC_KEY: &str = "FPGA_CATALOG_PUBLIC_KEY";
pub const ENV_TIMEOUT: &str = "FPGA_CATALOG_TIMEOUT_SECS";

/// Download root on the device when nothing else is configured.
pub const DEFAULT_ROOT: &str = "/media/fat/1fpga";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Canonical path to the settings file.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("fpga-catalog").join("settings.toml")
}

fn default_database() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("fpga-catalog").join("catalogs.sqlite")
}

/// The on-disk format. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    pub database: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub public_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl SettingsFile {
    /// Read a settings file. A missing file is the same as an empty one.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where a setting's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    EnvVar(&'static str),
    ConfigFile,
    Default,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandLine => write!(f, "command line"),
            Self::EnvVar(var) => write!(f, "env ${var}"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// A resolved value and its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting<T> {
    pub value: T,
    pub source: SettingSource,
}

impl<T> Setting<T> {
    fn new(value: T, source: SettingSource) -> Self {
        Self { value, source }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: Setting<PathBuf>,
    pub root: Setting<PathBuf>,
    /// Base64 ed25519 public key that platform releases must be signed with.
    pub public_key: Setting<Option<String>>,
    pub timeout: Setting<Duration>,
}

impl Settings {
    /// Load settings from the process environment and the default file.
    pub fn load(overrides: Overrides) -> Result<Self, SettingsError> {
        let file = SettingsFile::load(&settings_path())?;
        Self::resolve(overrides, |key| std::env::var(key).ok(), file)
    }

    /// Merge the layers. `env` looks up an environment variable.
    pub fn resolve(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
        file: SettingsFile,
    ) -> Result<Self, SettingsError> {
        let env = |key: &'static str| env(key).filter(|v| !v.is_empty()).map(|v| (key, v));

        let database = layer(overrides.database, env(ENV_DB).map(|(k, v)| (k, v.into())), file.database)
            .unwrap_or_else(|| Setting::new(default_database(), SettingSource::Default));

        let root = layer(overrides.root, env(ENV_ROOT).map(|(k, v)| (k, v.into())), file.root)
            .unwrap_or_else(|| Setting::new(PathBuf::from(DEFAULT_ROOT), SettingSource::Default));

        let public_key = match layer(None, env(ENV_PUBLIC_KEY), file.public_key) {
            Some(s) => Setting::new(Some(s.value), s.source),
            None => Setting::new(None, SettingSource::Default),
        };

        let timeout_env = match env(ENV_TIMEOUT) {
            Some((key, value)) => match value.trim().parse::<u64>() {
                Ok(secs) => Some((key, secs)),
                Err(_) => return Err(SettingsError::Invalid { key, value }),
            },
            None => None,
        };
        let timeout = layer(None, timeout_env, file.timeout_secs)
            .unwrap_or_else(|| Setting::new(DEFAULT_TIMEOUT_SECS, SettingSource::Default));
        let timeout = Setting::new(Duration::from_secs(timeout.value), timeout.source);

        Ok(Self {
            database,
            root,
            public_key,
            timeout,
        })
    }
}

fn layer<T>(
    cli: Option<T>,
    env: Option<(&'static str, T)>,
    file: Option<T>,
) -> Option<Setting<T>> {
    cli.map(|v| Setting::new(v, SettingSource::CommandLine))
        .or_else(|| env.map(|(key, v)| Setting::new(v, SettingSource::EnvVar(key))))
        .or_else(|| file.map(|v| Setting::new(v, SettingSource::ConfigFile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = Settings::resolve(Overrides::default(), env(&[]), SettingsFile::default()).unwrap();
        assert_eq!(s.root.value, PathBuf::from(DEFAULT_ROOT));
        assert_eq!(s.root.source, SettingSource::Default);
        assert_eq!(s.timeout.value, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(s.public_key.value.is_none());
    }

    #[test]
    fn command_line_beats_env_beats_file() {
        let file = SettingsFile {
            database: Some("/file/db.sqlite".into()),
            root: Some("/file/root".into()),
            public_key: Some("file-key".into()),
            timeout_secs: Some(5),
        };
        let overrides = Overrides {
            database: Some("/cli/db.sqlite".into()),
            root: None,
        };
        let s = Settings::resolve(
            overrides,
            env(&[(ENV_ROOT, "/env/root"), (ENV_PUBLIC_KEY, "")]),
            file,
        )
        .unwrap();

        assert_eq!(s.database.value, PathBuf::from("/cli/db.sqlite"));
        assert_eq!(s.database.source, SettingSource::CommandLine);
        assert_eq!(s.root.value, PathBuf::from("/env/root"));
        assert_eq!(s.root.source, SettingSource::EnvVar(ENV_ROOT));
        // An empty variable does not count as set.
        assert_eq!(s.public_key.value.as_deref(), Some("file-key"));
        assert_eq!(s.public_key.source, SettingSource::ConfigFile);
        assert_eq!(s.timeout.value, Duration::from_secs(5));
    }

    #[test]
    fn bad_timeout_is_reported() {
        let err = Settings::resolve(
            Overrides::default(),
            env(&[(ENV_TIMEOUT, "soon")]),
            SettingsFile::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: ENV_TIMEOUT, .. }));
    }

    #[test]
    fn settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        assert_eq!(SettingsFile::load(&path).unwrap(), SettingsFile::default());

        std::fs::write(&path, "root = \"/mnt/sd\"\ntimeout_secs = 12\n").unwrap();
        let file = SettingsFile::load(&path).unwrap();
        assert_eq!(file.root, Some(PathBuf::from("/mnt/sd")));
        assert_eq!(file.timeout_secs, Some(12));

        std::fs::write(&path, "root = [").unwrap();
        assert!(matches!(
            SettingsFile::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }
}

//! Where the schema registry comes from.
//!
//! Settings are layered: command line over `hl7-check.toml` over defaults.

use crate::registry::{
    self, CollectionSource, DirectorySource, HttpSource, RegistryError, RegistryLoad,
    DEFAULT_REGISTRY_URL,
};
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::instrument;

pub const CONFIG_FILE_NAME: &str = "hl7-check.toml";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub url: Option<String>,
    /// Relative paths are resolved against the config file's directory.
    pub directory: Option<PathBuf>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
    pub offline: Option<bool>,
}

impl Config {
    #[instrument(level = "debug")]
    pub fn load<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        if let (Some(directory), Some(parent)) = (&config.registry.directory, path.parent()) {
            if directory.is_relative() {
                config.registry.directory = Some(parent.join(directory));
            }
        }
        tracing::trace!(?config, "loaded config");
        Ok(config)
    }

    /// Load the first `hl7-check.toml` found in `folders`, if any.
    pub fn discover<I, P>(folders: I) -> Result<Option<Self>, ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        folders
            .into_iter()
            .map(|folder| folder.as_ref().join(CONFIG_FILE_NAME))
            .find(|path| path.is_file())
            .map(Config::load)
            .transpose()
    }
}

/// Registry settings given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryOverrides {
    pub url: Option<String>,
    pub directory: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub offline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySettings {
    Offline,
    Directory(PathBuf),
    Http { url: String, timeout: Duration },
}

impl RegistrySettings {
    /// Merge command line overrides with the config file.
    ///
    /// The first layer that names a source decides it, and within a layer a
    /// directory beats a URL. Timeout and offline are merged key by key.
    pub fn resolve(overrides: &RegistryOverrides, config: Option<&RegistryConfig>) -> Self {
        let file = config.cloned().unwrap_or_default();
        if overrides.offline || file.offline.unwrap_or(false) {
            return RegistrySettings::Offline;
        }

        let timeout = overrides.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT);
        Self::from_layer(overrides.directory.as_ref(), overrides.url.as_ref(), timeout)
            .or_else(|| Self::from_layer(file.directory.as_ref(), file.url.as_ref(), timeout))
            .unwrap_or_else(|| RegistrySettings::Http {
                url: DEFAULT_REGISTRY_URL.to_string(),
                timeout,
            })
    }

    fn from_layer(
        directory: Option<&PathBuf>,
        url: Option<&String>,
        timeout: Duration,
    ) -> Option<Self> {
        match (directory, url) {
            (Some(directory), _) => Some(RegistrySettings::Directory(directory.clone())),
            (None, Some(url)) => Some(RegistrySettings::Http {
                url: url.clone(),
                timeout,
            }),
            (None, None) => None,
        }
    }

    fn source(&self) -> Result<Option<Box<dyn CollectionSource>>, RegistryError> {
        let source: Box<dyn CollectionSource> = match self {
            RegistrySettings::Offline => return Ok(None),
            RegistrySettings::Directory(directory) => Box::new(DirectorySource::new(directory)),
            RegistrySettings::Http { url, timeout } => {
                Box::new(HttpSource::new(url.as_str(), Some(*timeout))?)
            }
        };
        Ok(Some(source))
    }

    /// Build the registry these settings describe. Never fails: anything that
    /// can't be loaded is replaced by the built-in definitions.
    pub fn load(&self) -> RegistryLoad {
        match self.source() {
            Ok(Some(source)) => registry::load(source.as_ref()),
            Ok(None) => registry::load_offline(),
            Err(error) => {
                tracing::warn!(
                    %error,
                    "failed to set up registry source, using built-in definitions"
                );
                registry::load_offline()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn can_load_config_with_relative_directory() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[registry]
url = "https://example.org/hl7"
directory = "schemas"
timeout = 5
"#,
        )
        .expect("can write config");

        let config = Config::load(&path).expect("config is valid");
        assert_eq!(
            config.registry,
            RegistryConfig {
                url: Some("https://example.org/hl7".to_string()),
                directory: Some(dir.path().join("schemas")),
                timeout: Some(Duration::from_secs(5)),
                offline: None,
            }
        );
    }

    #[test]
    fn empty_config_is_default() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "").expect("can write config");
        assert_eq!(Config::load(&path).expect("config is valid"), Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[registry]\nuri = \"oops\"\n").expect("can write config");
        assert!(matches!(Config::load(&path), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn discover_finds_the_first_config() {
        let empty = tempfile::tempdir().expect("can create temp dir");
        let with_config = tempfile::tempdir().expect("can create temp dir");
        fs::write(
            with_config.path().join(CONFIG_FILE_NAME),
            "[registry]\noffline = true\n",
        )
        .expect("can write config");

        let config = Config::discover([empty.path(), with_config.path()])
            .expect("config is valid")
            .expect("config was found");
        assert_eq!(config.registry.offline, Some(true));
        assert_eq!(Config::discover([empty.path()]).expect("no error"), None);
    }

    #[test]
    fn command_line_beats_config_file() {
        let file = RegistryConfig {
            url: Some("https://file.example.org".to_string()),
            directory: Some(PathBuf::from("/schemas")),
            timeout: Some(Duration::from_secs(5)),
            offline: None,
        };

        assert_eq!(
            RegistrySettings::resolve(&RegistryOverrides::default(), Some(&file)),
            RegistrySettings::Directory(PathBuf::from("/schemas"))
        );

        let overrides = RegistryOverrides {
            url: Some("https://cli.example.org".to_string()),
            ..Default::default()
        };
        assert_eq!(
            RegistrySettings::resolve(&overrides, Some(&file)),
            RegistrySettings::Http {
                url: "https://cli.example.org".to_string(),
                timeout: Duration::from_secs(5),
            }
        );

        let overrides = RegistryOverrides {
            offline: true,
            ..overrides
        };
        assert_eq!(
            RegistrySettings::resolve(&overrides, Some(&file)),
            RegistrySettings::Offline
        );
    }

    #[test]
    fn defaults_to_the_public_registry() {
        assert_eq!(
            RegistrySettings::resolve(&RegistryOverrides::default(), None),
            RegistrySettings::Http {
                url: DEFAULT_REGISTRY_URL.to_string(),
                timeout: DEFAULT_TIMEOUT,
            }
        );
    }

    #[test]
    fn offline_settings_load_the_builtin_registry() {
        let load = RegistrySettings::Offline.load();
        assert_eq!(load.registry, crate::SchemaRegistry::fallback());
    }
}

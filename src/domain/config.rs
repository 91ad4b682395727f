use std::{io, path::Path};

use serde::{Deserialize, Serialize};

/// Name of the configuration file at the documentation root.
pub const CONFIG_FILE: &str = "reqlock.toml";

/// Configuration for requirement discovery and locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Path of the lock file, relative to the root.
    lockfile: String,

    /// File extensions (without the dot) of documents to scan.
    extensions: Vec<String>,

    /// Relative path prefixes skipped during discovery.
    ///
    /// For example, `drafts` skips `drafts/a.md` and `drafts/old/b.md` but not
    /// `docs/drafts.md`.
    exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lockfile: default_lockfile(),
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

/// Errors raised while reading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid configuration TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads `reqlock.toml` from the root, falling back to the defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        match Self::load(&path) {
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the lock file path, relative to the root.
    #[must_use]
    pub fn lockfile(&self) -> &str {
        &self.lockfile
    }

    /// Returns the document file extensions.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Returns the excluded path prefixes.
    #[must_use]
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Whether a file with this path should be scanned for requirements.
    #[must_use]
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Whether a path relative to the root falls under an excluded prefix.
    #[must_use]
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude
            .iter()
            .any(|prefix| relative.starts_with(prefix.trim_end_matches('/')))
    }

    /// Adds an excluded path prefix.
    ///
    /// Returns `true` if the prefix was added, `false` if it already existed.
    pub fn add_exclude(&mut self, prefix: String) -> bool {
        if self.exclude.contains(&prefix) {
            false
        } else {
            self.exclude.push(prefix);
            true
        }
    }
}

fn default_lockfile() -> String {
    "requirements.lock".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_lockfile")]
        lockfile: String,

        #[serde(default = "default_extensions")]
        extensions: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                lockfile,
                extensions,
                exclude,
            } => Self {
                lockfile,
                extensions,
                exclude,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            lockfile: config.lockfile,
            extensions: config.extensions,
            exclude: config.exclude,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nlockfile = \"docs/reqs.lock\"\nextensions = [\"md\", \"markdown\"]\nexclude = [\"drafts\"]\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.lockfile(), "docs/reqs.lock");
        assert_eq!(
            config.extensions(),
            &["md".to_string(), "markdown".to_string()]
        );
        assert_eq!(config.exclude(), &["drafts".to_string()]);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_or_default(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let error = Config::load(&tmp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io(_)));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nextensions = \"md\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_file_returns_default() {
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, Config::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        let mut config = Config::default();
        config.add_exclude("drafts".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn document_extensions() {
        let config = Config::default();
        assert!(config.is_document(Path::new("docs/a.md")));
        assert!(!config.is_document(Path::new("docs/a.txt")));
        assert!(!config.is_document(Path::new("docs/md")));
    }

    #[test]
    fn exclusion_is_by_path_component() {
        let mut config = Config::default();
        assert!(config.add_exclude("drafts/".to_string()));
        assert!(!config.add_exclude("drafts/".to_string()));

        assert!(config.is_excluded(Path::new("drafts/a.md")));
        assert!(config.is_excluded(Path::new("drafts/old/b.md")));
        assert!(!config.is_excluded(Path::new("drafts.md")));
        assert!(!config.is_excluded(Path::new("docs/drafts/a.md")));
    }
}

//! Registry configuration.
//!
//! # Responsibility
//! - Load capability declarations and extension search dirs from JSON.
//! - Provide the built-in face-analysis defaults.
//!
//! # Invariants
//! - Relative `extension_dirs` are anchored at the config file directory.
//! - A config only builds a registry when every matcher and id is valid.

use crate::capability::error::RegistryError;
use crate::capability::matcher::{MatcherConfig, MatcherError};
use crate::capability::model::{CapabilityDefinition, EntryPointDescriptor};
use crate::capability::registry::CapabilityRegistry;
use crate::loader::{ModuleLoader, NativeModuleLoader};
use crate::package::PackageSource;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Capability id for the face filter overlays extension.
pub const FACE_FILTERS_CAPABILITY: &str = "face-filters";
/// Capability id for the age estimation extension.
pub const AGE_ANALYSIS_CAPABILITY: &str = "age-analysis";

/// Declaration of one capability in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub id: String,
    /// Which package family backs this capability.
    pub package: MatcherConfig,
    #[serde(default)]
    pub entry_point: Option<EntryPointDescriptor>,
    #[serde(default)]
    pub content_dir: Option<String>,
}

impl CapabilityConfig {
    fn definition(&self) -> Result<CapabilityDefinition, ConfigError> {
        let matcher = self
            .package
            .build()
            .map_err(|source| ConfigError::Matcher {
                capability_id: self.id.clone(),
                source,
            })?;
        let mut definition = CapabilityDefinition::new(self.id.clone(), matcher);
        definition.entry_point = self.entry_point.clone();
        definition.content_dir = self.content_dir.clone();
        Ok(definition)
    }
}

/// Top-level registry config.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub capabilities: Vec<CapabilityConfig>,
    /// Directories searched for extension modules before the system path.
    #[serde(default)]
    pub extension_dirs: Vec<PathBuf>,
}

impl RegistryConfig {
    /// Built-in declarations for the face-analysis host.
    pub fn builtin() -> Self {
        Self {
            capabilities: vec![
                CapabilityConfig {
                    id: FACE_FILTERS_CAPABILITY.to_string(),
                    package: MatcherConfig::contains("FabrikamFaceFilters"),
                    entry_point: None,
                    content_dir: Some("Content".to_string()),
                },
                CapabilityConfig {
                    id: AGE_ANALYSIS_CAPABILITY.to_string(),
                    package: MatcherConfig::contains("FabrikamAgeAnalysis"),
                    entry_point: Some(EntryPointDescriptor::new("age_analysis_ext", "GetAge")),
                    content_dir: None,
                },
            ],
            extension_dirs: vec![],
        }
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    /// - `Io` when the file cannot be read.
    /// - `Parse` when the content is not a valid config document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let mut config: RegistryConfig =
            serde_json::from_str(&text).map_err(|err| ConfigError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.extension_dirs = config
            .extension_dirs
            .into_iter()
            .map(|dir| if dir.is_absolute() { dir } else { base.join(dir) })
            .collect();
        Ok(config)
    }

    /// Builds runtime capability definitions.
    pub fn definitions(&self) -> Result<Vec<CapabilityDefinition>, ConfigError> {
        self.capabilities
            .iter()
            .map(CapabilityConfig::definition)
            .collect()
    }

    /// Native loader searching this config's extension dirs.
    pub fn native_loader(&self) -> NativeModuleLoader {
        NativeModuleLoader::with_search_dirs(self.extension_dirs.clone())
    }
}

impl CapabilityRegistry {
    /// Builds a registry with every capability declared in `config`.
    pub fn from_config(
        config: &RegistryConfig,
        source: Arc<dyn PackageSource>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Result<Self, ConfigError> {
        let mut registry = CapabilityRegistry::new(source, loader);
        for definition in config.definitions()? {
            registry.register(definition)?;
        }
        Ok(registry)
    }
}

/// Config load/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        message: String,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Matcher {
        capability_id: String,
        source: MatcherError,
    },
    Registry(RegistryError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "failed to parse config `{}`: {message}", path.display())
            }
            Self::Matcher {
                capability_id,
                source,
            } => write!(f, "capability {capability_id} has an invalid matcher: {source}"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Matcher { source, .. } => Some(source),
            Self::Registry(err) => Some(err),
            Self::Io { .. } | Self::Parse { .. } => None,
        }
    }
}

impl From<RegistryError> for ConfigError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RegistryConfig, AGE_ANALYSIS_CAPABILITY, FACE_FILTERS_CAPABILITY};
    use crate::capability::error::RegistryError;
    use crate::capability::registry::CapabilityRegistry;
    use crate::loader::NativeModuleLoader;
    use crate::package::StaticPackageSource;
    use std::sync::Arc;

    #[test]
    fn builtin_config_builds_face_analysis_registry() {
        let registry = CapabilityRegistry::from_config(
            &RegistryConfig::builtin(),
            Arc::new(StaticPackageSource::default()),
            Arc::new(NativeModuleLoader::new()),
        )
        .expect("builtin config is valid");

        assert_eq!(
            registry.capability_ids(),
            vec![
                AGE_ANALYSIS_CAPABILITY.to_string(),
                FACE_FILTERS_CAPABILITY.to_string()
            ]
        );
    }

    #[test]
    fn loads_json_and_anchors_extension_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capabilities.json");
        std::fs::write(
            &path,
            r#"{
                "capabilities": [
                    {
                        "id": "age-analysis",
                        "package": { "kind": "pattern", "value": "^FabrikamAgeAnalysis_" },
                        "entry_point": { "library": "age_analysis_ext", "symbol": "GetAge" }
                    }
                ],
                "extension_dirs": ["ext", "/opt/optpkg/ext"]
            }"#,
        )
        .unwrap();

        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config.extension_dirs[0], dir.path().join("ext"));
        assert_eq!(
            config.extension_dirs[1],
            std::path::PathBuf::from("/opt/optpkg/ext")
        );

        let definitions = config.definitions().unwrap();
        assert!(definitions[0].matcher.matches("FabrikamAgeAnalysis_abc"));
        assert!(!definitions[0].matcher.matches("xFabrikamAgeAnalysis_abc"));
    }

    #[test]
    fn reports_invalid_matcher_and_duplicate_ids() {
        let mut config = RegistryConfig::builtin();
        config.capabilities[0].package.value = "  ".to_string();
        assert!(matches!(
            config.definitions(),
            Err(ConfigError::Matcher { .. })
        ));

        let mut config = RegistryConfig::builtin();
        config.capabilities[1].id = FACE_FILTERS_CAPABILITY.to_string();
        let err = CapabilityRegistry::from_config(
            &config,
            Arc::new(StaticPackageSource::default()),
            Arc::new(NativeModuleLoader::new()),
        )
        .err()
        .expect("duplicate ids must fail");
        assert_eq!(
            err,
            ConfigError::Registry(RegistryError::DuplicateCapabilityId(
                FACE_FILTERS_CAPABILITY.to_string()
            ))
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegistryConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

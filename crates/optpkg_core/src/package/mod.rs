//! Package metadata source contracts.
//!
//! # Responsibility
//! - Describe the host's declared dependency packages and their install events.
//! - Provide in-memory and manifest-file backed sources.
//!
//! # Invariants
//! - Sources only report metadata; they never change capability state directly.
//! - Absence of optional packages is a normal result, not an error.

mod manifest_source;

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::RwLock;

pub use manifest_source::{DependencyManifest, ManifestPackageSource};

/// One dependency declared by the host application package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPackage {
    /// Package family name, e.g. `FabrikamAgeAnalysis_8wekyb3d8bbwe`.
    pub family_name: String,
    /// Declared as optional by the host.
    pub is_optional: bool,
    /// Fully installed on this machine.
    #[serde(default)]
    pub installed: bool,
    /// Install directory when installed.
    #[serde(default)]
    pub installed_location: Option<PathBuf>,
}

impl DependencyPackage {
    /// Declares an optional package that is already installed.
    pub fn installed_optional(family_name: impl Into<String>) -> Self {
        Self {
            family_name: family_name.into(),
            is_optional: true,
            installed: true,
            installed_location: None,
        }
    }

    /// Declares an optional package that is not installed yet.
    pub fn pending_optional(family_name: impl Into<String>) -> Self {
        Self {
            family_name: family_name.into(),
            is_optional: true,
            installed: false,
            installed_location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.installed_location = Some(location.into());
        self
    }
}

/// Install progress notification delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallProgressEvent {
    pub family_name: String,
    /// Completion percentage in `0..=100`.
    pub progress: u32,
    pub is_complete: bool,
    pub is_optional: bool,
    #[serde(default)]
    pub installed_location: Option<PathBuf>,
}

impl InstallProgressEvent {
    /// Final event of a successful optional install.
    pub fn completed(family_name: impl Into<String>) -> Self {
        Self {
            family_name: family_name.into(),
            progress: 100,
            is_complete: true,
            is_optional: true,
            installed_location: None,
        }
    }

    /// Intermediate progress event of an optional install.
    pub fn progress(family_name: impl Into<String>, progress: u32) -> Self {
        Self {
            family_name: family_name.into(),
            progress,
            is_complete: false,
            is_optional: true,
            installed_location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.installed_location = Some(location.into());
        self
    }

    /// Whether this event reports a finished install.
    pub fn is_finished(&self) -> bool {
        self.progress == 100 && self.is_complete
    }
}

/// Source of the host's declared dependency packages.
pub trait PackageSource: Send + Sync {
    /// Enumerates declared dependency packages.
    fn dependencies(&self) -> Result<Vec<DependencyPackage>, PackageSourceError>;
}

/// Package enumeration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSourceError {
    Unavailable(String),
    InvalidData(String),
}

impl Display for PackageSourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "package metadata unavailable: {message}"),
            Self::InvalidData(message) => write!(f, "package metadata is invalid: {message}"),
        }
    }
}

impl Error for PackageSourceError {}

/// In-memory package source.
///
/// The host (or a test) replaces the dependency list as the platform reports
/// changes.
#[derive(Debug, Default)]
pub struct StaticPackageSource {
    packages: RwLock<Vec<DependencyPackage>>,
}

impl StaticPackageSource {
    pub fn new(packages: Vec<DependencyPackage>) -> Self {
        Self {
            packages: RwLock::new(packages),
        }
    }

    /// Replaces the declared dependency list.
    pub fn set_packages(&self, packages: Vec<DependencyPackage>) {
        let mut guard = self
            .packages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = packages;
    }

    /// Adds or replaces one package by family name.
    pub fn upsert(&self, package: DependencyPackage) {
        let mut guard = self
            .packages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard
            .iter_mut()
            .find(|existing| existing.family_name == package.family_name)
        {
            Some(existing) => *existing = package,
            None => guard.push(package),
        }
    }
}

impl PackageSource for StaticPackageSource {
    fn dependencies(&self) -> Result<Vec<DependencyPackage>, PackageSourceError> {
        let guard = self
            .packages
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.clone())
    }
}

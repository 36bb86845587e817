//! Package source backed by a JSON dependency manifest.
//!
//! The file is re-read on every enumeration so out-of-band installs become
//! visible to the next `refresh()`.

use super::{DependencyPackage, PackageSource, PackageSourceError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk manifest shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManifest {
    #[serde(default)]
    pub dependencies: Vec<DependencyPackage>,
}

/// Reads declared dependencies from a JSON file.
#[derive(Debug, Clone)]
pub struct ManifestPackageSource {
    path: PathBuf,
}

impl ManifestPackageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PackageSource for ManifestPackageSource {
    fn dependencies(&self) -> Result<Vec<DependencyPackage>, PackageSourceError> {
        let text = std::fs::read_to_string(&self.path).map_err(|err| {
            PackageSourceError::Unavailable(format!("{}: {err}", self.path.display()))
        })?;
        let manifest: DependencyManifest = serde_json::from_str(&text).map_err(|err| {
            PackageSourceError::InvalidData(format!("{}: {err}", self.path.display()))
        })?;

        // Relative install locations are anchored at the manifest directory.
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        let packages = manifest
            .dependencies
            .into_iter()
            .map(|mut package| {
                if let Some(location) = package.installed_location.take() {
                    package.installed_location = Some(if location.is_absolute() {
                        location
                    } else {
                        base.join(location)
                    });
                }
                package
            })
            .collect::<Vec<_>>();

        debug!(
            "event=package_enumerate module=package status=ok source=manifest count={}",
            packages.len()
        );
        Ok(packages)
    }
}

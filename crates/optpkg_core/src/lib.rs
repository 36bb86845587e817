//! Optional package capabilities for the face-analysis host.
//!
//! The host declares optional extension packages, learns which of them are
//! installed, and calls functions they export without linking against them.

pub mod capability;
pub mod config;
pub mod loader;
pub mod logging;
pub mod package;

pub use capability::error::{CapabilityError, InvocationStage, RegistryError};
pub use capability::listener::spawn_install_listener;
pub use capability::matcher::{MatcherConfig, MatcherError, MatcherKind, PackageMatcher};
pub use capability::model::{
    CapabilityDefinition, CapabilitySnapshot, CapabilityState, CapabilityTransition,
    EntryPointDescriptor,
};
pub use capability::registry::CapabilityRegistry;
pub use config::{
    CapabilityConfig, ConfigError, RegistryConfig, AGE_ANALYSIS_CAPABILITY,
    FACE_FILTERS_CAPABILITY,
};
pub use loader::{EntryPoint, LoadedModule, LoaderError, ModuleLoader, NativeModuleLoader};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use package::{
    DependencyPackage, InstallProgressEvent, ManifestPackageSource, PackageSource,
    PackageSourceError, StaticPackageSource,
};

/// Minimal health-check API for host wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

//! Optional capability registry.
//!
//! # Responsibility
//! - Track which optional capabilities are installed for this host.
//! - Gate and perform scoped entry-point invocation (load, resolve, call, release).
//! - Resolve assets shipped inside installed extension packages.
//!
//! # Invariants
//! - Capability state is monotonic: `absent -> installing -> available`.
//! - Nothing is loaded for a capability that is not `available`.
//! - A loaded module never outlives the `invoke` call that loaded it.
//! - No operation panics or returns a fatal error because an extension is
//!   absent or broken.

use crate::capability::error::{CapabilityError, InvocationStage, RegistryError};
use crate::capability::model::{
    is_valid_capability_id, CapabilityDefinition, CapabilitySnapshot, CapabilityState,
    CapabilityStatus, CapabilityTransition, EntryPointDescriptor,
};
use crate::loader::{LoadedModule, ModuleLoader};
use crate::package::{InstallProgressEvent, PackageSource};
use log::{debug, info, warn};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Instant;

const MAX_FAULT_MESSAGE_CHARS: usize = 160;

struct CapabilityEntry {
    definition: CapabilityDefinition,
    status: RwLock<CapabilityStatus>,
}

impl CapabilityEntry {
    fn status(&self) -> RwLockReadGuard<'_, CapabilityStatus> {
        // Status is plain data; a poisoned lock still holds a consistent value.
        self.status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn advance(
        &self,
        next: CapabilityState,
        installed_location: Option<PathBuf>,
    ) -> Option<CapabilityTransition> {
        let mut status = self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = status.advance(next, installed_location)?;
        Some(CapabilityTransition {
            capability_id: self.definition.id.clone(),
            from: previous,
            to: status.state,
        })
    }
}

/// Registry of optional capabilities owned by the host composition root.
///
/// Capabilities are registered up front with `&mut self`; afterwards the
/// registry is shared (typically behind `Arc`) and all operations take `&self`.
pub struct CapabilityRegistry {
    entries: BTreeMap<String, CapabilityEntry>,
    source: Arc<dyn PackageSource>,
    loader: Arc<dyn ModuleLoader>,
}

impl CapabilityRegistry {
    pub fn new(source: Arc<dyn PackageSource>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            entries: BTreeMap::new(),
            source,
            loader,
        }
    }

    /// Registers one capability in `absent` state.
    pub fn register(&mut self, definition: CapabilityDefinition) -> Result<(), RegistryError> {
        let id = definition.id.trim().to_string();
        if !is_valid_capability_id(&id) {
            return Err(RegistryError::InvalidCapabilityId(definition.id));
        }
        if self.entries.contains_key(id.as_str()) {
            return Err(RegistryError::DuplicateCapabilityId(id));
        }

        let mut definition = definition;
        definition.id = id.clone();
        self.entries.insert(
            id,
            CapabilityEntry {
                definition,
                status: RwLock::new(CapabilityStatus::absent()),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns sorted capability ids.
    pub fn capability_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Re-enumerates declared dependencies and promotes installed optional ones.
    ///
    /// Enumeration failures leave the registry unchanged and are only logged.
    pub fn refresh(&self) -> Vec<CapabilityTransition> {
        let started_at = Instant::now();
        let packages = match panic::catch_unwind(AssertUnwindSafe(|| self.source.dependencies()))
        {
            Ok(Ok(packages)) => packages,
            Ok(Err(err)) => {
                warn!(
                    "event=capability_refresh module=capability status=skipped duration_ms={} error_code=package_enumeration_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return vec![];
            }
            Err(payload) => {
                warn!(
                    "event=capability_refresh module=capability status=skipped duration_ms={} error_code=package_enumeration_panicked error={}",
                    started_at.elapsed().as_millis(),
                    fault_message(payload.as_ref())
                );
                return vec![];
            }
        };

        let mut transitions = vec![];
        for package in packages.iter().filter(|package| package.is_optional) {
            if !package.installed {
                continue;
            }
            for entry in self.matching_entries(&package.family_name) {
                if let Some(transition) = entry.advance(
                    CapabilityState::Available,
                    package.installed_location.clone(),
                ) {
                    log_transition(&transition, "refresh");
                    transitions.push(transition);
                }
            }
        }

        debug!(
            "event=capability_refresh module=capability status=ok duration_ms={} packages={} transitions={}",
            started_at.elapsed().as_millis(),
            packages.len(),
            transitions.len()
        );
        transitions
    }

    /// Applies one install-progress notification.
    ///
    /// Only optional packages matching a tracked capability are considered.
    /// A finished install (`progress == 100 && is_complete`) makes the
    /// capability available; earlier events mark it as installing.
    pub fn on_install_progress(&self, event: &InstallProgressEvent) -> Vec<CapabilityTransition> {
        if !event.is_optional {
            return vec![];
        }
        if event.progress > 100 {
            warn!(
                "event=install_progress module=capability status=rejected error_code=progress_out_of_range progress={}",
                event.progress
            );
            return vec![];
        }

        let next = if event.is_finished() {
            CapabilityState::Available
        } else {
            CapabilityState::Installing
        };
        let location = if event.is_finished() {
            event.installed_location.clone()
        } else {
            None
        };

        self.matching_entries(&event.family_name)
            .filter_map(|entry| entry.advance(next, location.clone()))
            .inspect(|transition| log_transition(transition, "install_progress"))
            .collect()
    }

    /// Returns the last known availability. Unknown ids are unavailable.
    pub fn is_available(&self, capability_id: &str) -> bool {
        self.state(capability_id) == Some(CapabilityState::Available)
    }

    /// Returns the last known state, or `None` for unknown ids.
    pub fn state(&self, capability_id: &str) -> Option<CapabilityState> {
        self.entries
            .get(capability_id.trim())
            .map(|entry| entry.status().state)
    }

    /// Returns a view of every registered capability, sorted by id.
    pub fn snapshot(&self) -> Vec<CapabilitySnapshot> {
        self.entries
            .values()
            .map(|entry| {
                let status = entry.status();
                CapabilitySnapshot {
                    id: entry.definition.id.clone(),
                    state: status.state,
                    invocable: entry.definition.entry_point.is_some(),
                    installed_location: status.installed_location.clone(),
                }
            })
            .collect()
    }

    /// Invokes the capability's native entry point.
    ///
    /// The module is loaded, the symbol resolved and called, and the module
    /// released again within this call, on every path.
    ///
    /// # Errors
    /// - `NotInstalled` when the capability is unknown or not available; no
    ///   load is attempted.
    /// - `NotInvocable` when the capability declares no entry point.
    /// - `EntryPointMissing` when the module lacks the declared symbol.
    /// - `InvocationFailed` when loading fails, or resolution or the call panics.
    pub fn invoke(&self, capability_id: &str) -> Result<i32, CapabilityError> {
        let started_at = Instant::now();
        let result = self.invoke_scoped(capability_id.trim());
        match &result {
            Ok(value) => info!(
                "event=capability_invoke module=capability status=ok capability={} duration_ms={} result={}",
                capability_id.trim(),
                started_at.elapsed().as_millis(),
                value
            ),
            Err(err) if err.is_warning() => warn!(
                "event=capability_invoke module=capability status=error capability={} duration_ms={} error_code={} error={}",
                capability_id.trim(),
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
            Err(err) => debug!(
                "event=capability_invoke module=capability status=unavailable capability={} error_code={}",
                capability_id.trim(),
                err.code()
            ),
        }
        result
    }

    /// Resolves one asset file inside the capability's content directory.
    ///
    /// `name` must be a single file name, e.g. `sunglasses.png`.
    pub fn asset_path(&self, capability_id: &str, name: &str) -> Result<PathBuf, CapabilityError> {
        let name = name.trim();
        if !is_plain_file_name(name) {
            return Err(CapabilityError::InvalidAssetName(name.to_string()));
        }
        let content_dir = self.content_dir(capability_id.trim())?;
        let path = content_dir.join(name);
        if !path.is_file() {
            return Err(CapabilityError::AssetMissing {
                capability_id: capability_id.trim().to_string(),
                asset: name.to_string(),
            });
        }
        Ok(path)
    }

    /// Lists asset file names in the capability's content directory, sorted.
    pub fn list_assets(&self, capability_id: &str) -> Result<Vec<String>, CapabilityError> {
        let capability_id = capability_id.trim();
        let content_dir = self.content_dir(capability_id)?;
        let read_dir = std::fs::read_dir(&content_dir).map_err(|_| CapabilityError::AssetMissing {
            capability_id: capability_id.to_string(),
            asset: content_dir.display().to_string(),
        })?;

        let mut names = read_dir
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    fn matching_entries<'a>(
        &'a self,
        family_name: &'a str,
    ) -> impl Iterator<Item = &'a CapabilityEntry> + 'a {
        self.entries
            .values()
            .filter(move |entry| entry.definition.matcher.matches(family_name))
    }

    fn available_entry(&self, capability_id: &str) -> Result<&CapabilityEntry, CapabilityError> {
        match self.entries.get(capability_id) {
            Some(entry) if entry.status().state == CapabilityState::Available => Ok(entry),
            _ => Err(CapabilityError::NotInstalled(capability_id.to_string())),
        }
    }

    fn content_dir(&self, capability_id: &str) -> Result<PathBuf, CapabilityError> {
        let entry = self.available_entry(capability_id)?;
        let missing = || CapabilityError::AssetMissing {
            capability_id: capability_id.to_string(),
            asset: entry
                .definition
                .content_dir
                .clone()
                .unwrap_or_else(|| "<content>".to_string()),
        };
        let content_dir = entry.definition.content_dir.as_deref().ok_or_else(missing)?;
        let location = entry
            .status()
            .installed_location
            .clone()
            .ok_or_else(missing)?;
        Ok(location.join(content_dir))
    }

    fn invoke_scoped(&self, capability_id: &str) -> Result<i32, CapabilityError> {
        let entry = self.available_entry(capability_id)?;
        let descriptor = entry
            .definition
            .entry_point
            .as_ref()
            .ok_or_else(|| CapabilityError::NotInvocable(capability_id.to_string()))?;

        let module = match panic::catch_unwind(AssertUnwindSafe(|| {
            self.loader.load(&descriptor.library)
        })) {
            Ok(Ok(module)) => module,
            Ok(Err(err)) => {
                return Err(invocation_failed(
                    capability_id,
                    InvocationStage::Load,
                    err.to_string(),
                ))
            }
            Err(payload) => {
                return Err(invocation_failed(
                    capability_id,
                    InvocationStage::Load,
                    fault_message(payload.as_ref()),
                ))
            }
        };

        let result = call_entry_point(capability_id, descriptor, module.as_ref());
        drop(module);
        result
    }
}

fn call_entry_point(
    capability_id: &str,
    descriptor: &EntryPointDescriptor,
    module: &dyn LoadedModule,
) -> Result<i32, CapabilityError> {
    let entry = match panic::catch_unwind(AssertUnwindSafe(|| module.resolve(&descriptor.symbol)))
    {
        Ok(Ok(entry)) => entry,
        Ok(Err(err)) => {
            debug!(
                "event=entry_point_resolve module=capability status=error capability={} library={} error={}",
                capability_id,
                module.name(),
                err
            );
            return Err(CapabilityError::EntryPointMissing {
                capability_id: capability_id.to_string(),
                library: descriptor.library.clone(),
                symbol: descriptor.symbol.clone(),
            });
        }
        Err(payload) => {
            return Err(invocation_failed(
                capability_id,
                InvocationStage::Resolve,
                fault_message(payload.as_ref()),
            ))
        }
    };

    panic::catch_unwind(AssertUnwindSafe(|| entry.call())).map_err(|payload| {
        invocation_failed(
            capability_id,
            InvocationStage::Call,
            fault_message(payload.as_ref()),
        )
    })
}

fn invocation_failed(
    capability_id: &str,
    stage: InvocationStage,
    message: String,
) -> CapabilityError {
    CapabilityError::InvocationFailed {
        capability_id: capability_id.to_string(),
        stage,
        message,
    }
}

fn log_transition(transition: &CapabilityTransition, trigger: &str) {
    info!(
        "event=capability_state module=capability status=ok capability={} from={} to={} trigger={}",
        transition.capability_id, transition.from, transition.to, trigger
    );
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn fault_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    crate::logging::sanitize_message(&message, MAX_FAULT_MESSAGE_CHARS)
}

#[cfg(test)]
mod tests {
    use super::{is_plain_file_name, CapabilityRegistry};
    use crate::capability::error::RegistryError;
    use crate::capability::matcher::PackageMatcher;
    use crate::capability::model::{CapabilityDefinition, CapabilityState};
    use crate::loader::NativeModuleLoader;
    use crate::package::{DependencyPackage, InstallProgressEvent, StaticPackageSource};
    use std::sync::Arc;

    fn registry_with(source: Arc<StaticPackageSource>) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new(source, Arc::new(NativeModuleLoader::new()));
        registry
            .register(CapabilityDefinition::new(
                "face-filters",
                PackageMatcher::contains("FabrikamFaceFilters"),
            ))
            .expect("face-filters registration");
        registry
    }

    #[test]
    fn rejects_invalid_or_duplicate_ids() {
        let mut registry = registry_with(Arc::new(StaticPackageSource::default()));
        let invalid = registry.register(CapabilityDefinition::new(
            "Face Filters",
            PackageMatcher::contains("x"),
        ));
        assert!(matches!(
            invalid,
            Err(RegistryError::InvalidCapabilityId(_))
        ));

        let duplicate = registry.register(CapabilityDefinition::new(
            "  face-filters ",
            PackageMatcher::contains("x"),
        ));
        assert!(matches!(
            duplicate,
            Err(RegistryError::DuplicateCapabilityId(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn refresh_ignores_non_optional_and_pending_packages() {
        let source = Arc::new(StaticPackageSource::new(vec![
            DependencyPackage {
                family_name: "FabrikamFaceFilters_1".to_string(),
                is_optional: false,
                installed: true,
                installed_location: None,
            },
            DependencyPackage::pending_optional("FabrikamFaceFilters_2"),
        ]));
        let registry = registry_with(source);

        assert!(registry.refresh().is_empty());
        assert_eq!(
            registry.state("face-filters"),
            Some(CapabilityState::Absent)
        );
    }

    #[test]
    fn progress_events_mark_installing_then_available() {
        let registry = registry_with(Arc::new(StaticPackageSource::default()));

        let installing =
            registry.on_install_progress(&InstallProgressEvent::progress("FabrikamFaceFilters_1", 40));
        assert_eq!(installing.len(), 1);
        assert_eq!(installing[0].to, CapabilityState::Installing);

        let repeated =
            registry.on_install_progress(&InstallProgressEvent::progress("FabrikamFaceFilters_1", 80));
        assert!(repeated.is_empty());

        let done =
            registry.on_install_progress(&InstallProgressEvent::completed("FabrikamFaceFilters_1"));
        assert_eq!(done[0].from, CapabilityState::Installing);
        assert_eq!(done[0].to, CapabilityState::Available);
        assert!(registry.is_available("face-filters"));
    }

    #[test]
    fn rejects_out_of_range_and_non_optional_events() {
        let registry = registry_with(Arc::new(StaticPackageSource::default()));

        let mut overflow = InstallProgressEvent::completed("FabrikamFaceFilters_1");
        overflow.progress = 101;
        assert!(registry.on_install_progress(&overflow).is_empty());

        let mut required = InstallProgressEvent::completed("FabrikamFaceFilters_1");
        required.is_optional = false;
        assert!(registry.on_install_progress(&required).is_empty());

        assert!(!registry.is_available("face-filters"));
    }

    #[test]
    fn plain_file_names_only() {
        assert!(is_plain_file_name("sunglasses.png"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../secret.png"));
        assert!(!is_plain_file_name("nested/hat.png"));
        assert!(!is_plain_file_name("/etc/passwd"));
        assert!(!is_plain_file_name(".."));
    }
}

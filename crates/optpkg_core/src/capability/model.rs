//! Capability declarations and installation state.
//!
//! # Responsibility
//! - Describe one optional capability the host may use when its package exists.
//! - Model the monotonic installation lifecycle `absent -> installing -> available`.
//!
//! # Invariants
//! - `CapabilityState` ordering matches lifecycle order; state never moves backwards.
//! - Capability ids are lowercase ASCII segments joined by `-`, `_` or `.`.

use crate::capability::matcher::PackageMatcher;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Installation state for one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityState {
    /// Backing package is not installed.
    Absent,
    /// Install notifications arrived but the package is not complete yet.
    Installing,
    /// Package is fully installed; capability may be used.
    Available,
}

impl CapabilityState {
    /// Stable string id used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Installing => "installing",
            Self::Available => "available",
        }
    }
}

impl Display for CapabilityState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Native entry point exported by an extension module.
///
/// The calling contract is fixed: `extern "C" fn() -> i32`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointDescriptor {
    /// Module name, either a bare library name (`age_analysis_ext`) or a file name.
    pub library: String,
    /// Exported symbol name, e.g. `GetAge`.
    pub symbol: String,
}

impl EntryPointDescriptor {
    pub fn new(library: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            symbol: symbol.into(),
        }
    }
}

/// Static declaration of one optional capability.
#[derive(Debug, Clone)]
pub struct CapabilityDefinition {
    /// Stable capability id, e.g. `age-analysis`.
    pub id: String,
    /// Rule deciding which package family names back this capability.
    pub matcher: PackageMatcher,
    /// Callable entry point, when the capability exposes one.
    pub entry_point: Option<EntryPointDescriptor>,
    /// Asset directory relative to the package install location.
    pub content_dir: Option<String>,
}

impl CapabilityDefinition {
    pub fn new(id: impl Into<String>, matcher: PackageMatcher) -> Self {
        Self {
            id: id.into(),
            matcher,
            entry_point: None,
            content_dir: None,
        }
    }

    pub fn with_entry_point(mut self, entry_point: EntryPointDescriptor) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    pub fn with_content_dir(mut self, content_dir: impl Into<String>) -> Self {
        self.content_dir = Some(content_dir.into());
        self
    }
}

/// Mutable per-capability status guarded by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CapabilityStatus {
    pub(crate) state: CapabilityState,
    pub(crate) installed_location: Option<PathBuf>,
}

impl CapabilityStatus {
    pub(crate) fn absent() -> Self {
        Self {
            state: CapabilityState::Absent,
            installed_location: None,
        }
    }

    /// Moves to `next` when it is later in the lifecycle.
    ///
    /// Returns the previous state when a transition happened.
    pub(crate) fn advance(
        &mut self,
        next: CapabilityState,
        installed_location: Option<PathBuf>,
    ) -> Option<CapabilityState> {
        if next <= self.state {
            if self.installed_location.is_none() && installed_location.is_some() {
                self.installed_location = installed_location;
            }
            return None;
        }
        let previous = self.state;
        self.state = next;
        if installed_location.is_some() {
            self.installed_location = installed_location;
        }
        Some(previous)
    }
}

/// One observed state change, reported to the host for UI updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityTransition {
    pub capability_id: String,
    pub from: CapabilityState,
    pub to: CapabilityState,
}

/// Read-only view of one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySnapshot {
    pub id: String,
    pub state: CapabilityState,
    pub invocable: bool,
    pub installed_location: Option<PathBuf>,
}

pub(crate) fn is_valid_capability_id(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

#[cfg(test)]
mod tests {
    use super::{is_valid_capability_id, CapabilityState, CapabilityStatus};
    use std::path::PathBuf;

    #[test]
    fn state_order_follows_lifecycle() {
        assert!(CapabilityState::Absent < CapabilityState::Installing);
        assert!(CapabilityState::Installing < CapabilityState::Available);
    }

    #[test]
    fn advance_is_monotonic() {
        let mut status = CapabilityStatus::absent();
        assert_eq!(
            status.advance(CapabilityState::Installing, None),
            Some(CapabilityState::Absent)
        );
        assert_eq!(
            status.advance(CapabilityState::Available, None),
            Some(CapabilityState::Installing)
        );
        assert_eq!(status.advance(CapabilityState::Installing, None), None);
        assert_eq!(status.advance(CapabilityState::Absent, None), None);
        assert_eq!(status.state, CapabilityState::Available);
    }

    #[test]
    fn advance_backfills_missing_location_without_transition() {
        let mut status = CapabilityStatus::absent();
        status.advance(CapabilityState::Available, None);
        assert_eq!(
            status.advance(CapabilityState::Available, Some(PathBuf::from("/pkg"))),
            None
        );
        assert_eq!(status.installed_location, Some(PathBuf::from("/pkg")));
    }

    #[test]
    fn validates_capability_ids() {
        assert!(is_valid_capability_id("age-analysis"));
        assert!(is_valid_capability_id("face_filters.v2"));
        assert!(!is_valid_capability_id(""));
        assert!(!is_valid_capability_id("Age Analysis"));
        assert!(!is_valid_capability_id("age--analysis"));
        assert!(!is_valid_capability_id("age-"));
    }
}

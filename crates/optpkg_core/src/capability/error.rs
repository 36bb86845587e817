//! Capability registration and invocation errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Phase of an invocation in which a fault was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStage {
    Load,
    Resolve,
    Call,
}

impl InvocationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Resolve => "resolve",
            Self::Call => "call",
        }
    }
}

/// Errors returned to the host by capability queries and invocations.
///
/// None of these are fatal; the host keeps running with the feature treated
/// as unavailable for the failing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Capability is unknown or its package is not installed.
    NotInstalled(String),
    /// Capability is installed but declares no entry point.
    NotInvocable(String),
    /// Module loaded but the expected symbol is absent.
    EntryPointMissing {
        capability_id: String,
        library: String,
        symbol: String,
    },
    /// Module load failed, or a fault was raised during resolution or the call.
    InvocationFailed {
        capability_id: String,
        stage: InvocationStage,
        message: String,
    },
    /// Asset name is empty or escapes the content directory.
    InvalidAssetName(String),
    /// Asset or content directory does not exist in the installed package.
    AssetMissing {
        capability_id: String,
        asset: String,
    },
}

impl CapabilityError {
    /// Whether the host should surface this error as a user-visible warning.
    ///
    /// `NotInstalled` only disables the feature.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::EntryPointMissing { .. } | Self::InvocationFailed { .. }
        )
    }

    /// Stable error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInstalled(_) => "not_installed",
            Self::NotInvocable(_) => "not_invocable",
            Self::EntryPointMissing { .. } => "entry_point_missing",
            Self::InvocationFailed { .. } => "invocation_failed",
            Self::InvalidAssetName(_) => "invalid_asset_name",
            Self::AssetMissing { .. } => "asset_missing",
        }
    }
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInstalled(id) => write!(f, "capability is not installed: {id}"),
            Self::NotInvocable(id) => write!(f, "capability has no entry point: {id}"),
            Self::EntryPointMissing {
                capability_id,
                library,
                symbol,
            } => write!(
                f,
                "entry point `{symbol}` not found in `{library}` for capability {capability_id}"
            ),
            Self::InvocationFailed {
                capability_id,
                stage,
                message,
            } => write!(
                f,
                "capability {capability_id} failed during {}: {message}",
                stage.as_str()
            ),
            Self::InvalidAssetName(value) => write!(f, "asset name is invalid: {value}"),
            Self::AssetMissing {
                capability_id,
                asset,
            } => write!(f, "asset `{asset}` not found for capability {capability_id}"),
        }
    }
}

impl Error for CapabilityError {}

/// Registration errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidCapabilityId(String),
    DuplicateCapabilityId(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCapabilityId(value) => write!(f, "capability id is invalid: {value}"),
            Self::DuplicateCapabilityId(value) => {
                write!(f, "capability id already registered: {value}")
            }
        }
    }
}

impl Error for RegistryError {}

//! Dynamic module loading contracts.
//!
//! # Responsibility
//! - Load an extension module by name and resolve its exported entry point.
//! - Tie resolved entry points to the lifetime of the loaded module.
//!
//! # Invariants
//! - A loaded module is released when its box is dropped, exactly once.
//! - An `EntryPoint` borrows its module and cannot outlive it.

mod native;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub use native::NativeModuleLoader;

/// Loads extension modules by name.
pub trait ModuleLoader: Send + Sync {
    /// Loads `library` and returns an owned module handle.
    fn load(&self, library: &str) -> Result<Box<dyn LoadedModule>, LoaderError>;
}

/// A loaded extension module. Dropping it releases the module.
pub trait LoadedModule {
    /// Name the module was loaded with.
    fn name(&self) -> &str;

    /// Resolves an exported `extern "C" fn() -> i32` entry point.
    fn resolve(&self, symbol: &str) -> Result<EntryPoint<'_>, LoaderError>;
}

/// Resolved zero-argument entry point returning a 32-bit integer.
pub struct EntryPoint<'m> {
    symbol: String,
    call: Box<dyn Fn() -> i32 + 'm>,
}

impl<'m> EntryPoint<'m> {
    pub fn new(symbol: impl Into<String>, call: impl Fn() -> i32 + 'm) -> Self {
        Self {
            symbol: symbol.into(),
            call: Box::new(call),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Calls the entry point.
    pub fn call(&self) -> i32 {
        (self.call)()
    }
}

impl std::fmt::Debug for EntryPoint<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoint")
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

/// Module load and symbol resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    LoadFailed {
        library: String,
        message: String,
    },
    SymbolNotFound {
        library: String,
        symbol: String,
        message: String,
    },
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadFailed { library, message } => {
                write!(f, "failed to load module `{library}`: {message}")
            }
            Self::SymbolNotFound {
                library,
                symbol,
                message,
            } => write!(
                f,
                "symbol `{symbol}` not found in module `{library}`: {message}"
            ),
        }
    }
}

impl Error for LoaderError {}

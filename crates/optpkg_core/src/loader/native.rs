//! Native shared-library loader built on `libloading`.

use super::{EntryPoint, LoadedModule, LoaderError, ModuleLoader};
use libloading::Library;
use log::debug;
use std::path::{Path, PathBuf};

type NativeEntryFn = unsafe extern "C" fn() -> i32;

/// Loads extension modules from configured directories or the system path.
///
/// Bare names (`age_analysis_ext`) are mapped to the platform file name
/// (`libage_analysis_ext.so`, `age_analysis_ext.dll`, ...). Names with an
/// extension or a path are used as given.
#[derive(Debug, Clone, Default)]
pub struct NativeModuleLoader {
    search_dirs: Vec<PathBuf>,
}

impl NativeModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Returns load candidates in priority order.
    ///
    /// Existing files in search dirs come first; the bare file name is always
    /// last so the platform's own search rules apply.
    pub fn candidates(&self, library: &str) -> Vec<PathBuf> {
        let requested = Path::new(library);
        let file_name = if requested.extension().is_some() || requested.components().count() > 1
        {
            requested.to_path_buf()
        } else {
            PathBuf::from(libloading::library_filename(library))
        };
        if file_name.is_absolute() {
            return vec![file_name];
        }

        let mut candidates = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        candidates.push(file_name);
        candidates
    }
}

impl ModuleLoader for NativeModuleLoader {
    fn load(&self, library: &str) -> Result<Box<dyn LoadedModule>, LoaderError> {
        let mut last_error = String::from("no load candidates");
        for candidate in self.candidates(library) {
            // SAFETY: extension modules are trusted optional packages declared
            // by the host; their initializers run on load.
            match unsafe { Library::new(&candidate) } {
                Ok(handle) => {
                    debug!(
                        "event=module_load module=loader status=ok library={} path={}",
                        library,
                        candidate.display()
                    );
                    return Ok(Box::new(NativeModule {
                        name: library.to_string(),
                        handle,
                    }));
                }
                Err(err) => last_error = err.to_string(),
            }
        }
        Err(LoaderError::LoadFailed {
            library: library.to_string(),
            message: last_error,
        })
    }
}

struct NativeModule {
    name: String,
    handle: Library,
}

impl LoadedModule for NativeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, symbol: &str) -> Result<EntryPoint<'_>, LoaderError> {
        // SAFETY: the descriptor declares the symbol as `extern "C" fn() -> i32`.
        let resolved = unsafe { self.handle.get::<NativeEntryFn>(symbol.as_bytes()) }.map_err(
            |err| LoaderError::SymbolNotFound {
                library: self.name.clone(),
                symbol: symbol.to_string(),
                message: err.to_string(),
            },
        )?;
        let raw: NativeEntryFn = *resolved;
        // SAFETY: the returned entry point borrows `self`, so the library stays
        // loaded for as long as `raw` can be called.
        Ok(EntryPoint::new(symbol, move || unsafe { raw() }))
    }
}

impl Drop for NativeModule {
    fn drop(&mut self) {
        debug!(
            "event=module_release module=loader status=ok library={}",
            self.name
        );
    }
}

#![allow(dead_code)]

use optpkg_core::{EntryPoint, LoadedModule, LoaderError, ModuleLoader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the stub extension module does when exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    Returns(i32),
    MissingSymbol,
    LoadFails,
    PanicsOnLoad,
    PanicsOnResolve,
    PanicsOnCall,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub loads: AtomicUsize,
    pub resolves: AtomicUsize,
    pub calls: AtomicUsize,
    pub releases: AtomicUsize,
}

/// In-process module loader standing in for native extension modules.
pub struct StubLoader {
    behavior: Mutex<StubBehavior>,
    symbol: String,
    counters: Arc<Counters>,
}

impl StubLoader {
    pub fn new(symbol: &str, behavior: StubBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            symbol: symbol.to_string(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn set_behavior(&self, behavior: StubBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn loads(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub fn resolves(&self) -> usize {
        self.counters.resolves.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }
}

impl ModuleLoader for StubLoader {
    fn load(&self, library: &str) -> Result<Box<dyn LoadedModule>, LoaderError> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            StubBehavior::LoadFails => Err(LoaderError::LoadFailed {
                library: library.to_string(),
                message: "module file not found".to_string(),
            }),
            StubBehavior::PanicsOnLoad => panic!("stub loader crashed while loading {library}"),
            behavior => Ok(Box::new(StubModule {
                name: library.to_string(),
                symbol: self.symbol.clone(),
                behavior,
                counters: Arc::clone(&self.counters),
            })),
        }
    }
}

struct StubModule {
    name: String,
    symbol: String,
    behavior: StubBehavior,
    counters: Arc<Counters>,
}

impl LoadedModule for StubModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, symbol: &str) -> Result<EntryPoint<'_>, LoaderError> {
        self.counters.resolves.fetch_add(1, Ordering::SeqCst);
        let not_found = || LoaderError::SymbolNotFound {
            library: self.name.clone(),
            symbol: symbol.to_string(),
            message: "undefined symbol".to_string(),
        };
        if symbol != self.symbol {
            return Err(not_found());
        }

        let counters = &self.counters;
        match self.behavior {
            StubBehavior::Returns(value) => Ok(EntryPoint::new(symbol, move || {
                counters.calls.fetch_add(1, Ordering::SeqCst);
                value
            })),
            StubBehavior::MissingSymbol => Err(not_found()),
            StubBehavior::PanicsOnResolve => panic!("stub module crashed while resolving"),
            StubBehavior::PanicsOnCall => Ok(EntryPoint::new(symbol, move || {
                counters.calls.fetch_add(1, Ordering::SeqCst);
                panic!("stub entry point crashed")
            })),
            StubBehavior::LoadFails | StubBehavior::PanicsOnLoad => {
                unreachable!("load-stage behaviors never produce a module")
            }
        }
    }
}

impl Drop for StubModule {
    fn drop(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

//! Optional capability registry.
//!
//! This module decides which optional extension packages are usable by the
//! host and invokes their native entry points without any build-time link to
//! the extension.

pub mod error;
pub mod listener;
pub mod matcher;
pub mod model;
pub mod registry;

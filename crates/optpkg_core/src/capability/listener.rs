//! Background delivery of install-progress notifications.

use crate::capability::model::CapabilityTransition;
use crate::capability::registry::CapabilityRegistry;
use crate::package::InstallProgressEvent;
use log::info;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const LISTENER_THREAD_NAME: &str = "optpkg-install-listener";

/// Spawns a thread that applies install events to `registry`.
///
/// Every resulting state change is passed to `on_transition`, e.g. to let the
/// host dispatch a UI update. The thread exits once all senders are dropped
/// and yields the number of transitions it reported.
///
/// # Errors
/// - Returns the OS error when the thread cannot be spawned.
pub fn spawn_install_listener<F>(
    registry: Arc<CapabilityRegistry>,
    events: Receiver<InstallProgressEvent>,
    mut on_transition: F,
) -> std::io::Result<JoinHandle<usize>>
where
    F: FnMut(&CapabilityTransition) + Send + 'static,
{
    thread::Builder::new()
        .name(LISTENER_THREAD_NAME.to_string())
        .spawn(move || {
            info!("event=install_listener module=capability status=start");
            let mut reported = 0;
            for event in events {
                for transition in registry.on_install_progress(&event) {
                    on_transition(&transition);
                    reported += 1;
                }
            }
            info!(
                "event=install_listener module=capability status=stop transitions={}",
                reported
            );
            reported
        })
}

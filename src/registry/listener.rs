//! Reload notifications.

use std::fmt;

use crate::registry::snapshot::RegistrySnapshot;

/// Observer of whole-registry reloads.
///
/// Callbacks run synchronously on the thread that performed the reload (a
/// request thread for explicit reloads, the watcher thread for file-driven
/// ones) after the registry's writer lock has been released, so a listener
/// may call mutating operations on the same registry.
///
/// `snapshot` is the registry as it stands when the callback is invoked, not
/// necessarily the one the triggering reload published. Callbacks for
/// reloads on different threads may interleave or arrive out of publish
/// order; each still sees contents at least as new as its own reload.
pub trait ConfigurationListener: Send + Sync {
    fn on_configuration_reloaded(&self, snapshot: &RegistrySnapshot);
}

impl<F> ConfigurationListener for F
where
    F: Fn(&RegistrySnapshot) + Send + Sync,
{
    fn on_configuration_reloaded(&self, snapshot: &RegistrySnapshot) {
        self(snapshot)
    }
}

/// Handle returned by `add_listener`, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

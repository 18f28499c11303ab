use std::time::Duration;

use crate::backend::{self, NativeEvent, SharedBackend};
use crate::error::ShortcutError;

/// Interception glue the manager installs into the host's native event loop.
/// The host feeds raw events through [`NativeEventFilter::process`]; matching
/// ones run their callback synchronously and are reported as consumed.
#[derive(Clone)]
pub struct NativeEventFilter {
    backend: SharedBackend,
}

impl NativeEventFilter {
    pub(crate) fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Feed one decoded native event to the backend. True when the event
    /// matched a live registration and its callback ran.
    pub fn process(&self, event: &NativeEvent) -> bool {
        backend::lock(&self.backend).handle_event(event)
    }

    /// Pull one pending event from the backend's native source.
    pub fn poll(&self) -> Option<NativeEvent> {
        backend::lock(&self.backend).poll_event()
    }

    /// Block for at most `max_wait` while the native source idles.
    pub fn idle(&self, max_wait: Duration) {
        backend::lock(&self.backend).pump_idle(max_wait);
    }
}

/// The host application's hook point for native event interception.
pub trait HostEventLoop {
    fn install_filter(&self, filter: NativeEventFilter) -> Result<(), ShortcutError>;

    /// Best-effort removal; detaching a filter that was never attached is
    /// not an error.
    fn remove_filter(&self);
}

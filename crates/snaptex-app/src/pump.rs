use std::sync::Mutex;
use std::time::Duration;

use snaptex_hotkeys::{HostEventLoop, NativeEventFilter, ShortcutError};
use tokio_util::sync::CancellationToken;

const IDLE_WAIT: Duration = Duration::from_millis(10);

/// The app's native event loop hook. The shortcut manager installs its
/// filter here; [`EventPump::run`] then drives the platform event source on
/// the calling thread.
pub struct EventPump {
    filter: Mutex<Option<NativeEventFilter>>,
}

impl EventPump {
    pub fn new() -> Self {
        Self {
            filter: Mutex::new(None),
        }
    }

    fn current_filter(&self) -> Option<NativeEventFilter> {
        match self.filter.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drive the native source until cancelled. Must run on the thread that
    /// initialized the shortcut manager: Win32 posts WM_HOTKEY to the
    /// registering thread's message queue.
    pub fn run(&self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            let Some(filter) = self.current_filter() else {
                std::thread::sleep(IDLE_WAIT);
                continue;
            };
            while let Some(event) = filter.poll() {
                filter.process(&event);
            }
            filter.idle(IDLE_WAIT);
        }
    }
}

impl HostEventLoop for EventPump {
    fn install_filter(&self, filter: NativeEventFilter) -> Result<(), ShortcutError> {
        match self.filter.lock() {
            Ok(mut slot) => {
                *slot = Some(filter);
                Ok(())
            }
            Err(_) => Err(ShortcutError::FilterInstall(
                "event filter slot poisoned".to_string(),
            )),
        }
    }

    fn remove_filter(&self) {
        if let Ok(mut slot) = self.filter.lock() {
            *slot = None;
        }
    }
}

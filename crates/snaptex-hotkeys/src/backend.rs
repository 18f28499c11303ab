use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::ShortcutError;

/// Callback bound to one registered shortcut. Invoked synchronously on the
/// thread that pumps native events, so it must return quickly.
pub type ShortcutCallback = Box<dyn Fn() + Send>;

/// Typed view of one native event, decoded at the event-filter boundary.
/// Each variant carries exactly the fields that platform's translation reads;
/// anything else in the raw event is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// Win32 thread message: the message id and the hotkey id from `wParam`.
    Message { message: u32, hotkey_id: usize },
    /// Carbon hotkey event: the application-defined id blob recovered from
    /// the event's direct-object parameter.
    HotKeyFired { signature: u32, id: u32 },
    /// X11 key press: raw keycode plus the reported modifier state.
    KeyPress { keycode: u8, state: u16 },
}

/// OS-specific half of shortcut handling. One long-lived instance per
/// process; it owns the identifier-to-callback table and the native handles.
pub trait ShortcutBackend: Send {
    /// Register one combination under `id`. `Err` means the caller's key or
    /// modifier names are outside this platform's tables; `Ok(false)` means
    /// the OS refused (typically already bound elsewhere).
    fn install(
        &mut self,
        modifiers: &[String],
        key: &str,
        id: u32,
        callback: ShortcutCallback,
    ) -> Result<bool, ShortcutError>;

    /// Reverse of `install`. False when `id` is unknown or the OS refuses.
    fn remove(&mut self, id: u32) -> bool;

    /// Decode one native event; `Some(id)` when it is this backend's
    /// hotkey-fired event for a live registration.
    fn translate_event(&self, event: &NativeEvent) -> Option<u32>;

    /// Invoke the callback stored for `id`.
    fn dispatch(&self, id: u32) -> bool;

    /// Translate and synchronously run the matching callback.
    fn handle_event(&self, event: &NativeEvent) -> bool {
        match self.translate_event(event) {
            Some(id) => self.dispatch(id),
            None => false,
        }
    }

    /// Pull one pending event from the backend's own native source, if it
    /// has one. Backends whose OS delivers through an installed handler
    /// (Carbon) return `None` here.
    fn poll_event(&mut self) -> Option<NativeEvent>;

    /// Let the native event source make progress while idle, for at most
    /// `max_wait`. The default is a plain sleep between polls; Carbon runs
    /// its event loop instead, which is what fires the installed handler.
    fn pump_idle(&self, max_wait: Duration) {
        std::thread::sleep(max_wait);
    }

    /// Unregister every remaining shortcut and release native handles.
    /// Best-effort: partial failures are swallowed, repeat calls are no-ops.
    fn teardown(&mut self);
}

pub(crate) type SharedBackend = Arc<Mutex<Box<dyn ShortcutBackend>>>;

/// Lock the shared backend, recovering the guard if a prior holder panicked.
pub(crate) fn lock(backend: &SharedBackend) -> MutexGuard<'_, Box<dyn ShortcutBackend>> {
    match backend.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Build the backend for the running OS. Construction failures (missing
/// native library, no display, handler installation refused) surface as
/// [`ShortcutError::BackendUnavailable`] so the host can degrade gracefully.
pub fn create_backend() -> Result<Box<dyn ShortcutBackend>, ShortcutError> {
    #[cfg(target_os = "windows")]
    {
        use crate::platform::windows::{User32, WindowsBackend};
        return Ok(Box::new(WindowsBackend::new(User32::new())));
    }

    #[cfg(target_os = "macos")]
    {
        use crate::platform::macos::{CarbonLink, MacBackend, SharedCallbacks};
        let callbacks = SharedCallbacks::default();
        let link = CarbonLink::install(callbacks.clone())?;
        return Ok(Box::new(MacBackend::new(link, callbacks)));
    }

    #[cfg(target_os = "linux")]
    {
        use crate::platform::linux::{LinuxBackend, XDisplay};
        return Ok(Box::new(LinuxBackend::new(XDisplay::open()?)));
    }

    #[allow(unreachable_code)]
    Err(ShortcutError::UnsupportedPlatform(
        std::env::consts::OS.to_string(),
    ))
}

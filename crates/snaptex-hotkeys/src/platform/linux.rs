//! X11 backend: key grabs on the root window. X has no per-grab opaque id,
//! so fired key presses are matched back by (keycode, normalized modifier
//! mask). Lock keys pollute the reported state, which forces four grabs per
//! logical shortcut and lock-bit masking on translation.

use std::collections::HashMap;

use crate::backend::{NativeEvent, ShortcutBackend, ShortcutCallback};
use crate::error::ShortcutError;

const SHIFT_MASK: u32 = 1 << 0;
const LOCK_MASK: u32 = 1 << 1;
const CONTROL_MASK: u32 = 1 << 2;
const MOD1_MASK: u32 = 1 << 3;
const MOD2_MASK: u32 = 1 << 4;
const MOD4_MASK: u32 = 1 << 6;

fn modifier_mask(name: &str) -> Option<u32> {
    match name {
        "shift" => Some(SHIFT_MASK),
        "ctrl" | "control" => Some(CONTROL_MASK),
        "alt" | "mod1" => Some(MOD1_MASK),
        "win" | "super" => Some(MOD4_MASK),
        _ => None,
    }
}

/// The four grab masks covering every CapsLock/NumLock state.
fn grab_masks(base: u32) -> [u32; 4] {
    [
        base,
        base | LOCK_MASK,
        base | MOD2_MASK,
        base | LOCK_MASK | MOD2_MASK,
    ]
}

/// The Xlib calls the backend makes. The real implementation traps X errors
/// around a sync so a denied grab reports as `false` instead of killing the
/// connection.
pub trait XlibCalls {
    /// Resolve a key name to a keycode via keysym lookup, retrying the
    /// upper-cased name.
    fn resolve_keycode(&self, key: &str) -> Option<u8>;
    /// Issue one grab on the root window; false when the server refuses.
    fn grab(&mut self, keycode: u8, mask: u32) -> bool;
    fn ungrab(&mut self, keycode: u8, mask: u32);
    fn flush(&self);
    /// Pull one pending key-press event off the grabbing connection.
    fn poll_event(&mut self) -> Option<NativeEvent>;
    /// Close the display connection.
    fn close(&mut self);
}

struct Registration {
    callback: ShortcutCallback,
    keycode: u8,
    modifiers: u32,
}

pub struct LinuxBackend<A: XlibCalls> {
    api: A,
    shortcuts: HashMap<u32, Registration>,
}

impl<A: XlibCalls> LinuxBackend<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            shortcuts: HashMap::new(),
        }
    }
}

impl<A: XlibCalls + Send> ShortcutBackend for LinuxBackend<A> {
    fn install(
        &mut self,
        modifiers: &[String],
        key: &str,
        id: u32,
        callback: ShortcutCallback,
    ) -> Result<bool, ShortcutError> {
        let unknown: Vec<String> = modifiers
            .iter()
            .filter(|m| modifier_mask(m).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ShortcutError::UnsupportedModifiers(unknown));
        }
        let base = modifiers
            .iter()
            .filter_map(|m| modifier_mask(m))
            .fold(0, |acc, mask| acc | mask);
        let keycode = self
            .api
            .resolve_keycode(key)
            .ok_or_else(|| ShortcutError::UnsupportedKey(key.to_string()))?;

        // All four grabs or none: a failure rolls back whatever succeeded.
        let mut granted = Vec::new();
        let mut refused = false;
        for mask in grab_masks(base) {
            if self.api.grab(keycode, mask) {
                granted.push(mask);
            } else {
                refused = true;
                break;
            }
        }
        if refused {
            for mask in granted {
                self.api.ungrab(keycode, mask);
            }
            self.api.flush();
            return Ok(false);
        }
        self.api.flush();
        self.shortcuts.insert(
            id,
            Registration {
                callback,
                keycode,
                modifiers: base,
            },
        );
        Ok(true)
    }

    fn remove(&mut self, id: u32) -> bool {
        let Some(registration) = self.shortcuts.get(&id) else {
            return false;
        };
        let keycode = registration.keycode;
        for mask in grab_masks(registration.modifiers) {
            self.api.ungrab(keycode, mask);
        }
        self.api.flush();
        self.shortcuts.remove(&id);
        true
    }

    fn translate_event(&self, event: &NativeEvent) -> Option<u32> {
        let NativeEvent::KeyPress { keycode, state } = event else {
            return None;
        };
        let normalized = u32::from(*state) & !(LOCK_MASK | MOD2_MASK);
        self.shortcuts
            .iter()
            .find(|(_, r)| r.keycode == *keycode && r.modifiers == normalized)
            .map(|(id, _)| *id)
    }

    fn dispatch(&self, id: u32) -> bool {
        match self.shortcuts.get(&id) {
            Some(registration) => {
                (registration.callback)();
                true
            }
            None => false,
        }
    }

    fn poll_event(&mut self) -> Option<NativeEvent> {
        self.api.poll_event()
    }

    fn teardown(&mut self) {
        let ids: Vec<u32> = self.shortcuts.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
        self.api.close();
    }
}

#[cfg(target_os = "linux")]
pub use native::XDisplay;

#[cfg(target_os = "linux")]
mod native {
    use std::ffi::{CString, c_int};
    use std::ptr;
    use std::sync::atomic::{AtomicU8, Ordering};

    use x11_dl::xlib;

    use super::XlibCalls;
    use crate::backend::NativeEvent;
    use crate::error::ShortcutError;

    /// Error code recorded by the trap handler during a guarded call; X
    /// error handlers are process-global, hence the static.
    static TRAPPED_ERROR: AtomicU8 = AtomicU8::new(0);

    unsafe extern "C" fn record_error(
        _display: *mut xlib::Display,
        event: *mut xlib::XErrorEvent,
    ) -> c_int {
        let code = unsafe { (*event).error_code };
        TRAPPED_ERROR.store(code, Ordering::SeqCst);
        0
    }

    /// Real Xlib surface over a runtime-loaded libX11. Loading failure or an
    /// unopenable display surfaces as `BackendUnavailable`.
    pub struct XDisplay {
        lib: xlib::Xlib,
        display: *mut xlib::Display,
        root: xlib::Window,
    }

    // The display pointer is only touched from the event-loop thread; the
    // trait object it sits behind is shared under a mutex.
    unsafe impl Send for XDisplay {}

    impl XDisplay {
        pub fn open() -> Result<Self, ShortcutError> {
            let lib = xlib::Xlib::open().map_err(|e| {
                ShortcutError::BackendUnavailable(format!("X11 library not found: {e}"))
            })?;
            let display = unsafe { (lib.XOpenDisplay)(ptr::null()) };
            if display.is_null() {
                return Err(ShortcutError::BackendUnavailable(
                    "unable to open X11 display".to_string(),
                ));
            }
            let root = unsafe { (lib.XDefaultRootWindow)(display) };
            Ok(Self { lib, display, root })
        }

        /// Run `call` with an error trap installed and sync the connection;
        /// true when the server reported no error for it.
        fn trapped(&self, call: impl FnOnce()) -> bool {
            TRAPPED_ERROR.store(0, Ordering::SeqCst);
            let previous = unsafe { (self.lib.XSetErrorHandler)(Some(record_error)) };
            call();
            unsafe {
                (self.lib.XSync)(self.display, xlib::False);
                (self.lib.XSetErrorHandler)(previous);
            }
            TRAPPED_ERROR.load(Ordering::SeqCst) == 0
        }
    }

    impl XlibCalls for XDisplay {
        fn resolve_keycode(&self, key: &str) -> Option<u8> {
            if self.display.is_null() {
                return None;
            }
            let name = CString::new(key).ok()?;
            let mut keysym = unsafe { (self.lib.XStringToKeysym)(name.as_ptr()) };
            if keysym == 0 {
                let upper = CString::new(key.to_uppercase()).ok()?;
                keysym = unsafe { (self.lib.XStringToKeysym)(upper.as_ptr()) };
            }
            if keysym == 0 {
                return None;
            }
            let keycode = unsafe { (self.lib.XKeysymToKeycode)(self.display, keysym) };
            (keycode != 0).then_some(keycode)
        }

        fn grab(&mut self, keycode: u8, mask: u32) -> bool {
            if self.display.is_null() {
                return false;
            }
            self.trapped(|| unsafe {
                (self.lib.XGrabKey)(
                    self.display,
                    c_int::from(keycode),
                    mask,
                    self.root,
                    xlib::True,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                );
            })
        }

        fn ungrab(&mut self, keycode: u8, mask: u32) {
            if self.display.is_null() {
                return;
            }
            self.trapped(|| unsafe {
                (self.lib.XUngrabKey)(self.display, c_int::from(keycode), mask, self.root);
            });
        }

        fn flush(&self) {
            if self.display.is_null() {
                return;
            }
            unsafe { (self.lib.XFlush)(self.display) };
        }

        fn poll_event(&mut self) -> Option<NativeEvent> {
            if self.display.is_null() {
                return None;
            }
            unsafe {
                if (self.lib.XPending)(self.display) == 0 {
                    return None;
                }
                let mut event: xlib::XEvent = std::mem::zeroed();
                (self.lib.XNextEvent)(self.display, &mut event);
                if event.get_type() != xlib::KeyPress {
                    return None;
                }
                let key = event.key;
                Some(NativeEvent::KeyPress {
                    keycode: key.keycode as u8,
                    state: key.state as u16,
                })
            }
        }

        fn close(&mut self) {
            if !self.display.is_null() {
                unsafe { (self.lib.XCloseDisplay)(self.display) };
                self.display = ptr::null_mut();
            }
        }
    }
}

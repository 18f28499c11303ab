//! Carbon backend: one process-wide application event handler plus an opaque
//! hotkey reference per registration. Fired events carry an
//! application-defined id blob, which is what translation recovers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::{NativeEvent, ShortcutBackend, ShortcutCallback};
use crate::error::ShortcutError;

/// Four-character tag stamped into every hotkey id so fired events from
/// other processes' registrations are ignored. 'sntx'.
pub const SIGNATURE: u32 = 0x736E_7478;

const CMD_KEY: u32 = 1 << 8;
const SHIFT_KEY: u32 = 1 << 9;
const OPTION_KEY: u32 = 1 << 11;
const CONTROL_KEY: u32 = 1 << 12;

fn modifier_flag(name: &str) -> Option<u32> {
    match name {
        "ctrl" | "control" => Some(CONTROL_KEY),
        "alt" | "option" => Some(OPTION_KEY),
        "shift" => Some(SHIFT_KEY),
        "cmd" | "win" | "super" => Some(CMD_KEY),
        _ => None,
    }
}

/// ANSI virtual key codes for the letter and digit keys.
fn key_code(key: &str) -> Option<u32> {
    let code = match key {
        "a" => 0x00,
        "b" => 0x0B,
        "c" => 0x08,
        "d" => 0x02,
        "e" => 0x0E,
        "f" => 0x03,
        "g" => 0x05,
        "h" => 0x04,
        "i" => 0x22,
        "j" => 0x26,
        "k" => 0x28,
        "l" => 0x25,
        "m" => 0x2E,
        "n" => 0x2D,
        "o" => 0x1F,
        "p" => 0x23,
        "q" => 0x0C,
        "r" => 0x0F,
        "s" => 0x01,
        "t" => 0x11,
        "u" => 0x20,
        "v" => 0x09,
        "w" => 0x0D,
        "x" => 0x07,
        "y" => 0x10,
        "z" => 0x06,
        "0" => 0x1D,
        "1" => 0x12,
        "2" => 0x13,
        "3" => 0x14,
        "4" => 0x15,
        "5" => 0x17,
        "6" => 0x16,
        "7" => 0x1A,
        "8" => 0x1C,
        "9" => 0x19,
        _ => return None,
    };
    Some(code)
}

/// Callback table shared between the backend and the installed Carbon
/// handler; the handler reads it when a hotkey event fires.
pub type SharedCallbacks = Arc<Mutex<HashMap<u32, ShortcutCallback>>>;

/// The Carbon calls the backend makes. The real implementation retains the
/// per-registration `EventHotKeyRef` values internally for unregistration.
pub trait CarbonHotkeys {
    fn register(&mut self, id: u32, key_code: u32, modifiers: u32) -> bool;
    fn unregister(&mut self, id: u32) -> bool;
    /// Run the current event loop for up to `seconds`, firing the installed
    /// handler for any pending hotkey events.
    fn run_event_loop(&self, seconds: f64);
    /// Remove the installed application event handler.
    fn remove_handler(&mut self);
}

pub struct MacBackend<A: CarbonHotkeys> {
    api: A,
    shortcuts: SharedCallbacks,
}

impl<A: CarbonHotkeys> MacBackend<A> {
    /// `callbacks` is the same table the api's installed handler reads.
    pub fn new(api: A, callbacks: SharedCallbacks) -> Self {
        Self {
            api,
            shortcuts: callbacks,
        }
    }

    fn callback_ids(&self) -> Vec<u32> {
        match self.shortcuts.lock() {
            Ok(map) => map.keys().copied().collect(),
            Err(poisoned) => poisoned.into_inner().keys().copied().collect(),
        }
    }
}

impl<A: CarbonHotkeys + Send> ShortcutBackend for MacBackend<A> {
    fn install(
        &mut self,
        modifiers: &[String],
        key: &str,
        id: u32,
        callback: ShortcutCallback,
    ) -> Result<bool, ShortcutError> {
        let unknown: Vec<String> = modifiers
            .iter()
            .filter(|m| modifier_flag(m).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ShortcutError::UnsupportedModifiers(unknown));
        }
        let code = key_code(key).ok_or_else(|| ShortcutError::UnsupportedKey(key.to_string()))?;
        let mods = modifiers
            .iter()
            .filter_map(|m| modifier_flag(m))
            .fold(0, |acc, flag| acc | flag);

        if !self.api.register(id, code, mods) {
            return Ok(false);
        }
        if let Ok(mut map) = self.shortcuts.lock() {
            map.insert(id, callback);
        }
        Ok(true)
    }

    fn remove(&mut self, id: u32) -> bool {
        if !self.api.unregister(id) {
            return false;
        }
        if let Ok(mut map) = self.shortcuts.lock() {
            map.remove(&id);
        }
        true
    }

    fn translate_event(&self, event: &NativeEvent) -> Option<u32> {
        let NativeEvent::HotKeyFired { signature, id } = event else {
            return None;
        };
        if *signature != SIGNATURE {
            return None;
        }
        let map = self.shortcuts.lock().ok()?;
        map.contains_key(id).then_some(*id)
    }

    fn dispatch(&self, id: u32) -> bool {
        match self.shortcuts.lock() {
            Ok(map) => match map.get(&id) {
                Some(callback) => {
                    callback();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    fn poll_event(&mut self) -> Option<NativeEvent> {
        // Delivery happens inside the installed Carbon handler.
        None
    }

    fn pump_idle(&self, max_wait: std::time::Duration) {
        self.api.run_event_loop(max_wait.as_secs_f64());
    }

    fn teardown(&mut self) {
        for id in self.callback_ids() {
            self.remove(id);
        }
        self.api.remove_handler();
    }
}

#[cfg(target_os = "macos")]
pub use native::CarbonLink;

#[cfg(target_os = "macos")]
mod native {
    use std::collections::HashMap;
    use std::ffi::c_void;
    use std::ptr;
    use std::sync::{Arc, Mutex};

    use super::{CarbonHotkeys, SIGNATURE, SharedCallbacks};
    use crate::backend::ShortcutCallback;
    use crate::error::ShortcutError;

    type EventTargetRef = *mut c_void;
    type EventHandlerRef = *mut c_void;
    type EventHandlerCallRef = *mut c_void;
    type EventRef = *mut c_void;
    type EventHotKeyRef = *mut c_void;
    type EventHandlerUPP =
        extern "C" fn(EventHandlerCallRef, EventRef, *mut c_void) -> i32;

    #[repr(C)]
    #[derive(Copy, Clone)]
    struct EventTypeSpec {
        event_class: u32,
        event_kind: u32,
    }

    #[repr(C)]
    #[derive(Copy, Clone)]
    struct EventHotKeyID {
        signature: u32,
        id: u32,
    }

    const NO_ERR: i32 = 0;
    const EVENT_CLASS_KEYBOARD: u32 = 0x6B65_7962; // 'keyb'
    const EVENT_HOTKEY_PRESSED: u32 = 6;
    const EVENT_PARAM_DIRECT_OBJECT: u32 = 0x2D2D_2D2D; // '----'
    const TYPE_EVENT_HOTKEY_ID: u32 = 0x686B_6964; // 'hkid'

    #[link(name = "Carbon", kind = "framework")]
    unsafe extern "C" {
        fn GetApplicationEventTarget() -> EventTargetRef;

        fn InstallEventHandler(
            in_target: EventTargetRef,
            in_handler: EventHandlerUPP,
            in_num_types: u32,
            in_list: *const EventTypeSpec,
            in_user_data: *mut c_void,
            out_ref: *mut EventHandlerRef,
        ) -> i32;

        fn RemoveEventHandler(in_handler_ref: EventHandlerRef) -> i32;

        fn RegisterEventHotKey(
            in_hotkey_code: u32,
            in_hotkey_modifiers: u32,
            in_hotkey_id: EventHotKeyID,
            in_target: EventTargetRef,
            in_options: u32,
            out_ref: *mut EventHotKeyRef,
        ) -> i32;

        fn UnregisterEventHotKey(in_hotkey_ref: EventHotKeyRef) -> i32;

        fn GetEventParameter(
            in_event: EventRef,
            in_name: u32,
            in_desired_type: u32,
            out_actual_type: *mut u32,
            in_buffer_size: u32,
            out_actual_size: *mut u32,
            out_data: *mut c_void,
        ) -> i32;

        fn RunCurrentEventLoop(in_timeout: f64) -> i32;
    }

    /// Recover the application-defined hotkey id from a fired event and run
    /// the matching callback. Events carrying a foreign signature or an
    /// unreadable parameter are ignored.
    extern "C" fn hotkey_fired(
        _call_ref: EventHandlerCallRef,
        event: EventRef,
        user_data: *mut c_void,
    ) -> i32 {
        let mut hotkey_id = EventHotKeyID {
            signature: 0,
            id: 0,
        };
        let status = unsafe {
            GetEventParameter(
                event,
                EVENT_PARAM_DIRECT_OBJECT,
                TYPE_EVENT_HOTKEY_ID,
                ptr::null_mut(),
                size_of::<EventHotKeyID>() as u32,
                ptr::null_mut(),
                (&raw mut hotkey_id).cast(),
            )
        };
        if status != NO_ERR || hotkey_id.signature != SIGNATURE {
            return NO_ERR;
        }
        let callbacks =
            unsafe { &*(user_data as *const Mutex<HashMap<u32, ShortcutCallback>>) };
        if let Ok(map) = callbacks.lock()
            && let Some(callback) = map.get(&hotkey_id.id)
        {
            callback();
        }
        NO_ERR
    }

    /// Real Carbon surface. Holds the installed handler, the retained
    /// per-registration hotkey references and the leaked callback-table
    /// pointer handed to the handler as user data.
    pub struct CarbonLink {
        target: EventTargetRef,
        handler: EventHandlerRef,
        refs: HashMap<u32, EventHotKeyRef>,
        user_data: *mut c_void,
    }

    // Raw Carbon references are only touched from the event-loop thread;
    // the trait object they sit behind is shared under a mutex.
    unsafe impl Send for CarbonLink {}

    impl CarbonLink {
        /// Install the process-wide hotkey-pressed handler. Failure here
        /// means the backend cannot function at all.
        pub fn install(callbacks: SharedCallbacks) -> Result<Self, ShortcutError> {
            let target = unsafe { GetApplicationEventTarget() };
            let spec = EventTypeSpec {
                event_class: EVENT_CLASS_KEYBOARD,
                event_kind: EVENT_HOTKEY_PRESSED,
            };
            let user_data = Arc::into_raw(callbacks) as *mut c_void;
            let mut handler: EventHandlerRef = ptr::null_mut();
            let status = unsafe {
                InstallEventHandler(target, hotkey_fired, 1, &spec, user_data, &mut handler)
            };
            if status != NO_ERR {
                unsafe {
                    drop(Arc::from_raw(
                        user_data as *const Mutex<HashMap<u32, ShortcutCallback>>,
                    ));
                }
                return Err(ShortcutError::BackendUnavailable(format!(
                    "InstallEventHandler failed (status {status})"
                )));
            }
            Ok(Self {
                target,
                handler,
                refs: HashMap::new(),
                user_data,
            })
        }
    }

    impl CarbonHotkeys for CarbonLink {
        fn register(&mut self, id: u32, key_code: u32, modifiers: u32) -> bool {
            let hotkey_id = EventHotKeyID {
                signature: SIGNATURE,
                id,
            };
            let mut hotkey_ref: EventHotKeyRef = ptr::null_mut();
            let status = unsafe {
                RegisterEventHotKey(key_code, modifiers, hotkey_id, self.target, 0, &mut hotkey_ref)
            };
            if status != NO_ERR {
                return false;
            }
            self.refs.insert(id, hotkey_ref);
            true
        }

        fn unregister(&mut self, id: u32) -> bool {
            let Some(&hotkey_ref) = self.refs.get(&id) else {
                return false;
            };
            if unsafe { UnregisterEventHotKey(hotkey_ref) } != NO_ERR {
                return false;
            }
            self.refs.remove(&id);
            true
        }

        fn run_event_loop(&self, seconds: f64) {
            unsafe { RunCurrentEventLoop(seconds) };
        }

        fn remove_handler(&mut self) {
            if !self.handler.is_null() {
                unsafe { RemoveEventHandler(self.handler) };
                self.handler = ptr::null_mut();
            }
            // Release the callback table only after the handler is gone so a
            // late event cannot observe a dropped table.
            if !self.user_data.is_null() {
                unsafe {
                    drop(Arc::from_raw(
                        self.user_data as *const Mutex<HashMap<u32, ShortcutCallback>>,
                    ));
                }
                self.user_data = ptr::null_mut();
            }
        }
    }
}

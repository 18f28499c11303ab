//! Recording stand-ins for the native call surfaces and the host event
//! loop, so registration and translation logic runs without an OS.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::NativeEvent;
use crate::error::ShortcutError;
use crate::filter::{HostEventLoop, NativeEventFilter};
use crate::manager::Dispatch;
use crate::platform::linux::XlibCalls;
use crate::platform::macos::CarbonHotkeys;
use crate::platform::windows::Win32Hotkeys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterCall {
    pub id: u32,
    pub modifiers: u32,
    pub key: u32,
}

/// user32 stand-in recording registration arguments.
#[derive(Clone, Default)]
pub struct FakeWin32 {
    pub registered: Arc<Mutex<Vec<RegisterCall>>>,
    pub unregistered: Arc<Mutex<Vec<u32>>>,
    pub reject: Arc<AtomicBool>,
}

impl FakeWin32 {
    pub fn rejecting() -> Self {
        let fake = Self::default();
        fake.reject.store(true, Ordering::SeqCst);
        fake
    }
}

impl Win32Hotkeys for FakeWin32 {
    fn register_hotkey(&self, id: u32, modifiers: u32, vk: u32) -> bool {
        if self.reject.load(Ordering::SeqCst) {
            return false;
        }
        self.registered.lock().unwrap().push(RegisterCall {
            id,
            modifiers,
            key: vk,
        });
        true
    }

    fn unregister_hotkey(&self, id: u32) -> bool {
        self.unregistered.lock().unwrap().push(id);
        true
    }

    fn poll_message(&self) -> Option<NativeEvent> {
        None
    }
}

/// Carbon stand-in recording registrations keyed by hotkey id. Tracks the
/// set of live hotkey references the way the real link retains them.
#[derive(Clone, Default)]
pub struct FakeCarbon {
    pub registered: Arc<Mutex<Vec<RegisterCall>>>,
    pub unregistered: Arc<Mutex<Vec<u32>>>,
    active: Arc<Mutex<std::collections::HashSet<u32>>>,
    pub handler_removed: Arc<AtomicBool>,
    pub reject: Arc<AtomicBool>,
}

impl CarbonHotkeys for FakeCarbon {
    fn register(&mut self, id: u32, key_code: u32, modifiers: u32) -> bool {
        if self.reject.load(Ordering::SeqCst) {
            return false;
        }
        self.registered.lock().unwrap().push(RegisterCall {
            id,
            modifiers,
            key: key_code,
        });
        self.active.lock().unwrap().insert(id);
        true
    }

    fn unregister(&mut self, id: u32) -> bool {
        if !self.active.lock().unwrap().remove(&id) {
            return false;
        }
        self.unregistered.lock().unwrap().push(id);
        true
    }

    fn run_event_loop(&self, _seconds: f64) {}

    fn remove_handler(&mut self) {
        self.handler_removed.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabCall {
    pub keycode: u8,
    pub mask: u32,
}

/// Xlib stand-in tracking live grabs; optionally fails the nth grab call.
#[derive(Clone, Default)]
pub struct FakeXlib {
    pub grabs: Arc<Mutex<Vec<GrabCall>>>,
    pub ungrabs: Arc<Mutex<Vec<GrabCall>>>,
    pub fail_on_call: Arc<Mutex<Option<usize>>>,
    calls_seen: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
}

impl FakeXlib {
    /// Fail the nth grab call (1-based), succeeding the ones before it.
    pub fn failing_on(call: usize) -> Self {
        let fake = Self::default();
        *fake.fail_on_call.lock().unwrap() = Some(call);
        fake
    }

    /// Grabs issued and not yet ungrabbed.
    pub fn active_grabs(&self) -> Vec<GrabCall> {
        let ungrabs = self.ungrabs.lock().unwrap();
        self.grabs
            .lock()
            .unwrap()
            .iter()
            .filter(|grab| !ungrabs.contains(grab))
            .copied()
            .collect()
    }
}

impl XlibCalls for FakeXlib {
    fn resolve_keycode(&self, key: &str) -> Option<u8> {
        // One fixed keycode for 'a', like a server with a us layout.
        (key == "a").then_some(38)
    }

    fn grab(&mut self, keycode: u8, mask: u32) -> bool {
        let call = self.calls_seen.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_on_call.lock().unwrap() == Some(call) {
            return false;
        }
        self.grabs.lock().unwrap().push(GrabCall { keycode, mask });
        true
    }

    fn ungrab(&mut self, keycode: u8, mask: u32) {
        self.ungrabs.lock().unwrap().push(GrabCall { keycode, mask });
    }

    fn flush(&self) {}

    fn poll_event(&mut self) -> Option<NativeEvent> {
        None
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Host stand-in retaining the installed filter for event simulation.
#[derive(Default)]
pub struct RecordingHost {
    pub filter: Mutex<Option<NativeEventFilter>>,
    pub removals: AtomicUsize,
}

impl RecordingHost {
    pub fn filter(&self) -> NativeEventFilter {
        self.filter
            .lock()
            .unwrap()
            .clone()
            .expect("no filter installed")
    }
}

impl HostEventLoop for RecordingHost {
    fn install_filter(&self, filter: NativeEventFilter) -> Result<(), ShortcutError> {
        *self.filter.lock().unwrap() = Some(filter);
        Ok(())
    }

    fn remove_filter(&self) {
        self.removals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dispatch recording fired action names.
pub fn recording_dispatch() -> (Dispatch, Arc<Mutex<Vec<String>>>) {
    let calls: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let dispatch: Dispatch = Arc::new(move |action: &str| {
        recorded.lock().unwrap().push(action.to_string());
    });
    (dispatch, calls)
}

/// Callback counting its invocations.
pub fn counting_callback() -> (crate::backend::ShortcutCallback, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let callback: crate::backend::ShortcutCallback =
        Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
    (callback, count)
}

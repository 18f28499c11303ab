//! Win32 backend: RegisterHotKey against the calling thread, WM_HOTKEY
//! translation off the thread message queue.

use std::collections::HashMap;

use crate::backend::{NativeEvent, ShortcutBackend, ShortcutCallback};
use crate::error::ShortcutError;

/// Hotkey-fired thread message.
pub const WM_HOTKEY: u32 = 0x0312;

const MOD_ALT: u32 = 0x0001;
const MOD_CONTROL: u32 = 0x0002;
const MOD_SHIFT: u32 = 0x0004;
const MOD_WIN: u32 = 0x0008;

fn modifier_flag(name: &str) -> Option<u32> {
    match name {
        "ctrl" => Some(MOD_CONTROL),
        "alt" => Some(MOD_ALT),
        "shift" => Some(MOD_SHIFT),
        "win" => Some(MOD_WIN),
        _ => None,
    }
}

/// Lowercase ASCII letters and digits map straight onto virtual-key codes.
fn virtual_key(key: &str) -> Option<u32> {
    let mut chars = key.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };
    match c {
        'a'..='z' => Some(c as u32 - 'a' as u32 + 0x41),
        '0'..='9' => Some(c as u32 - '0' as u32 + 0x30),
        _ => None,
    }
}

/// The user32 calls the backend makes, kept minimal so the registration
/// logic can run against a recording stand-in.
pub trait Win32Hotkeys {
    fn register_hotkey(&self, id: u32, modifiers: u32, vk: u32) -> bool;
    fn unregister_hotkey(&self, id: u32) -> bool;
    /// Drain one pending thread message, surfacing hotkey messages only.
    fn poll_message(&self) -> Option<NativeEvent>;
}

pub struct WindowsBackend<A: Win32Hotkeys> {
    api: A,
    shortcuts: HashMap<u32, ShortcutCallback>,
}

impl<A: Win32Hotkeys> WindowsBackend<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            shortcuts: HashMap::new(),
        }
    }
}

impl<A: Win32Hotkeys + Send> ShortcutBackend for WindowsBackend<A> {
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
        let vk =
            virtual_key(key).ok_or_else(|| ShortcutError::UnsupportedKey(key.to_string()))?;
        let mods = modifiers
            .iter()
            .filter_map(|m| modifier_flag(m))
            .fold(0, |acc, flag| acc | flag);

        if !self.api.register_hotkey(id, mods, vk) {
            return Ok(false);
        }
        self.shortcuts.insert(id, callback);
        Ok(true)
    }

    fn remove(&mut self, id: u32) -> bool {
        if !self.shortcuts.contains_key(&id) {
            return false;
        }
        if !self.api.unregister_hotkey(id) {
            return false;
        }
        self.shortcuts.remove(&id);
        true
    }

    fn translate_event(&self, event: &NativeEvent) -> Option<u32> {
        let NativeEvent::Message { message, hotkey_id } = event else {
            return None;
        };
        if *message != WM_HOTKEY {
            return None;
        }
        let id = u32::try_from(*hotkey_id).ok()?;
        self.shortcuts.contains_key(&id).then_some(id)
    }

    fn dispatch(&self, id: u32) -> bool {
        match self.shortcuts.get(&id) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    fn poll_event(&mut self) -> Option<NativeEvent> {
        self.api.poll_message()
    }

    fn teardown(&mut self) {
        let ids: Vec<u32> = self.shortcuts.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
    }
}

#[cfg(target_os = "windows")]
pub use native::User32;

#[cfg(target_os = "windows")]
mod native {
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        HOT_KEY_MODIFIERS, RegisterHotKey, UnregisterHotKey,
    };
    use windows::Win32::UI::WindowsAndMessaging::{MSG, PM_REMOVE, PeekMessageW};

    use super::{WM_HOTKEY, Win32Hotkeys};
    use crate::backend::NativeEvent;

    /// Real user32 surface. Registration passes a null window handle, so
    /// WM_HOTKEY is posted to the registering thread's message queue; the
    /// pump must therefore run on the same thread that installs shortcuts.
    pub struct User32;

    impl User32 {
        pub fn new() -> Self {
            Self
        }
    }

    impl Win32Hotkeys for User32 {
        fn register_hotkey(&self, id: u32, modifiers: u32, vk: u32) -> bool {
            unsafe { RegisterHotKey(None, id as i32, HOT_KEY_MODIFIERS(modifiers), vk) }.is_ok()
        }

        fn unregister_hotkey(&self, id: u32) -> bool {
            unsafe { UnregisterHotKey(None, id as i32) }.is_ok()
        }

        fn poll_message(&self) -> Option<NativeEvent> {
            let mut msg = MSG::default();
            if !unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE) }.as_bool() {
                return None;
            }
            if msg.message != WM_HOTKEY {
                return None;
            }
            Some(NativeEvent::Message {
                message: msg.message,
                hotkey_id: msg.wParam.0,
            })
        }
    }
}

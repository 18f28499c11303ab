//! System-wide keyboard shortcuts behind one platform-agnostic interface.
//!
//! The manager parses human-readable combinations ("ctrl+alt+z"), hands them
//! to the backend for the running OS (Win32 RegisterHotKey, Carbon event
//! hotkeys, X11 key grabs) and routes fired events back to the callback bound
//! at registration time. The host application installs a [`NativeEventFilter`]
//! into its native event loop and drives it; no threads are spawned here.

mod backend;
mod error;
mod filter;
mod manager;
pub mod platform;

pub use backend::{NativeEvent, ShortcutBackend, ShortcutCallback, create_backend};
pub use error::ShortcutError;
pub use filter::{HostEventLoop, NativeEventFilter};
pub use manager::{Dispatch, ShortcutManager, ShortcutSpec, ShortcutTable};
pub use platform::windows::WM_HOTKEY;

#[cfg(test)]
mod tests;

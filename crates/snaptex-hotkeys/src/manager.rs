use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::backend::{self, SharedBackend, ShortcutBackend, ShortcutCallback, create_backend};
use crate::error::ShortcutError;
use crate::filter::{HostEventLoop, NativeEventFilter};

/// One configured key combination and the action it triggers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortcutSpec {
    pub shortcut: String,
    pub action: String,
}

/// Platform name -> shortcuts configured for it.
pub type ShortcutTable = HashMap<String, Vec<ShortcutSpec>>;

/// Host-supplied dispatch invoked with the action name of a fired shortcut.
pub type Dispatch = Arc<dyn Fn(&str) + Send + Sync>;

/// Platform-agnostic facade over the OS backends. Owns the backend lifecycle
/// and the identifier counter; identifiers are unique for the backend's
/// lifetime and the counter only moves on successful registration.
pub struct ShortcutManager {
    backend: SharedBackend,
    host: Arc<dyn HostEventLoop + Send + Sync>,
    next_id: u32,
    action_ids: HashMap<String, Vec<u32>>,
}

impl ShortcutManager {
    /// Select the backend for the running OS, install the event filter into
    /// the host and register the configured shortcuts for this platform.
    ///
    /// An unsupported platform or unavailable backend is fatal here;
    /// individual shortcut failures are logged and skipped.
    pub fn initialize(
        host: Arc<dyn HostEventLoop + Send + Sync>,
        table: &ShortcutTable,
        dispatch: Dispatch,
    ) -> Result<Self, ShortcutError> {
        let backend = create_backend()?;
        Self::with_backend(backend, host, table, dispatch, std::env::consts::OS)
    }

    /// Backend-injected constructor behind `initialize`.
    pub(crate) fn with_backend(
        backend: Box<dyn ShortcutBackend>,
        host: Arc<dyn HostEventLoop + Send + Sync>,
        table: &ShortcutTable,
        dispatch: Dispatch,
        os: &str,
    ) -> Result<Self, ShortcutError> {
        let backend: SharedBackend = Arc::new(Mutex::new(backend));
        host.install_filter(NativeEventFilter::new(backend.clone()))?;

        let mut manager = Self {
            backend,
            host,
            next_id: 1,
            action_ids: HashMap::new(),
        };
        manager.install_configured(table, dispatch, os);
        Ok(manager)
    }

    /// Walk the candidate platform keys in order and register every spec not
    /// already seen as the same (shortcut, action) pair.
    fn install_configured(&mut self, table: &ShortcutTable, dispatch: Dispatch, os: &str) {
        let mut seen = HashSet::new();
        for key in platform_candidates(os) {
            let Some(specs) = table.get(key) else {
                continue;
            };
            for spec in specs {
                if !seen.insert((spec.shortcut.clone(), spec.action.clone())) {
                    continue;
                }
                // Bind the action name by value, one binding per spec.
                let action = spec.action.clone();
                let dispatch = dispatch.clone();
                let callback: ShortcutCallback = Box::new(move || dispatch(&action));
                match self.assign_shortcut(&spec.shortcut, callback) {
                    Ok(id) => {
                        tracing::info!(
                            "registered shortcut '{}' for action '{}' (id {})",
                            spec.shortcut,
                            spec.action,
                            id
                        );
                        self.action_ids
                            .entry(spec.action.clone())
                            .or_default()
                            .push(id);
                    }
                    Err(e) => {
                        tracing::warn!("could not register shortcut '{}': {}", spec.shortcut, e);
                    }
                }
            }
        }
    }

    /// Parse `combo` and register it with the backend. Returns the assigned
    /// identifier; a malformed string, unsupported names or an OS refusal
    /// fail this shortcut only and leave the identifier counter untouched.
    pub fn assign_shortcut(
        &mut self,
        combo: &str,
        callback: ShortcutCallback,
    ) -> Result<u32, ShortcutError> {
        let (modifiers, key) = parse_combo(combo)?;
        let id = self.next_id;
        let installed = backend::lock(&self.backend).install(&modifiers, &key, id, callback)?;
        if !installed {
            return Err(ShortcutError::Rejected(combo.to_string()));
        }
        self.next_id += 1;
        Ok(id)
    }

    /// Remove one registration. Idempotent: a second call for the same
    /// identifier returns false with no side effects.
    pub fn unassign_shortcut(&mut self, id: u32) -> bool {
        let removed = backend::lock(&self.backend).remove(id);
        if removed {
            for ids in self.action_ids.values_mut() {
                if let Some(pos) = ids.iter().position(|&known| known == id) {
                    ids.remove(pos);
                    break;
                }
            }
        }
        removed
    }

    /// Remove everything this manager installed, tear the backend down and
    /// detach the event filter. Safe to call more than once; attach it to
    /// the host's shutdown path so it runs exactly once in normal operation.
    pub fn cleanup(&mut self) {
        {
            let mut backend = backend::lock(&self.backend);
            for ids in self.action_ids.values() {
                for &id in ids {
                    backend.remove(id);
                }
            }
            backend.teardown();
        }
        self.action_ids.clear();
        self.host.remove_filter();
        self.next_id = 1;
    }
}

/// Candidate keys for looking up the current platform's shortcut list, most
/// specific first, ending in the generic "default" bucket.
fn platform_candidates(os: &str) -> Vec<&'static str> {
    match os {
        "windows" => vec!["windows", "win32", "win", "default"],
        "macos" => vec!["macos", "darwin", "default"],
        "linux" => vec!["linux", "unix", "default"],
        _ => vec!["default"],
    }
}

/// Split on `+` after lower-casing; every token but the last is a modifier
/// name, the last is the key.
fn parse_combo(combo: &str) -> Result<(Vec<String>, String), ShortcutError> {
    let lowered = combo.to_lowercase();
    let mut parts: Vec<String> = lowered.split('+').map(str::to_string).collect();
    let key = parts.pop().unwrap_or_default();
    if key.is_empty() {
        return Err(ShortcutError::EmptyShortcut);
    }
    Ok((parts, key))
}

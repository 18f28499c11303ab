use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::support::{FakeWin32, RecordingHost, recording_dispatch};
use crate::backend::NativeEvent;
use crate::manager::{ShortcutManager, ShortcutSpec, ShortcutTable};
use crate::platform::windows::{WM_HOTKEY, WindowsBackend};

fn spec(shortcut: &str, action: &str) -> ShortcutSpec {
    ShortcutSpec {
        shortcut: shortcut.to_string(),
        action: action.to_string(),
    }
}

fn manager_for(
    api: FakeWin32,
    table: &ShortcutTable,
    os: &str,
) -> (ShortcutManager, Arc<RecordingHost>, Arc<std::sync::Mutex<Vec<String>>>) {
    let host = Arc::new(RecordingHost::default());
    let (dispatch, calls) = recording_dispatch();
    let manager = ShortcutManager::with_backend(
        Box::new(WindowsBackend::new(api)),
        host.clone(),
        table,
        dispatch,
        os,
    )
    .unwrap();
    (manager, host, calls)
}

#[test]
fn configured_table_to_fired_message_to_dispatch() {
    let table: ShortcutTable = HashMap::from([(
        "windows".to_string(),
        vec![spec("ctrl+alt+z", "math2latex")],
    )]);
    let (_manager, host, calls) = manager_for(FakeWin32::default(), &table, "windows");

    let filter = host.filter();
    assert!(filter.process(&NativeEvent::Message {
        message: WM_HOTKEY,
        hotkey_id: 1,
    }));
    assert_eq!(*calls.lock().unwrap(), vec!["math2latex".to_string()]);
}

#[test]
fn duplicate_pairs_are_installed_once() {
    let api = FakeWin32::default();
    let table: ShortcutTable = HashMap::from([(
        "windows".to_string(),
        vec![spec("ctrl+alt+z", "math2latex"), spec("ctrl+alt+z", "math2latex")],
    )]);
    let (_manager, _, _) = manager_for(api.clone(), &table, "windows");
    assert_eq!(api.registered.lock().unwrap().len(), 1);
}

#[test]
fn platform_aliases_and_default_bucket_are_consulted() {
    let api = FakeWin32::default();
    let table: ShortcutTable = HashMap::from([
        ("win32".to_string(), vec![spec("ctrl+alt+z", "math2latex")]),
        ("default".to_string(), vec![spec("ctrl+alt+x", "math2text")]),
    ]);
    let (_manager, _, _) = manager_for(api.clone(), &table, "windows");
    assert_eq!(api.registered.lock().unwrap().len(), 2);
}

#[test]
fn bad_entries_do_not_stop_the_rest() {
    let api = FakeWin32::default();
    let table: ShortcutTable = HashMap::from([(
        "windows".to_string(),
        vec![
            spec("hyper+z", "broken"),
            spec("ctrl+", "broken"),
            spec("ctrl+alt+z", "math2latex"),
        ],
    )]);
    let (_manager, host, calls) = manager_for(api.clone(), &table, "windows");

    let registered = api.registered.lock().unwrap().clone();
    assert_eq!(registered.len(), 1);
    // Failed attempts do not consume identifiers.
    assert_eq!(registered[0].id, 1);

    assert!(host.filter().process(&NativeEvent::Message {
        message: WM_HOTKEY,
        hotkey_id: 1,
    }));
    assert_eq!(*calls.lock().unwrap(), vec!["math2latex".to_string()]);
}

#[test]
fn assigned_identifiers_are_unique_and_monotonic() {
    let table = ShortcutTable::new();
    let (mut manager, _, _) = manager_for(FakeWin32::default(), &table, "windows");

    let first = manager
        .assign_shortcut("ctrl+alt+a", Box::new(|| {}))
        .unwrap();
    let second = manager
        .assign_shortcut("ctrl+alt+b", Box::new(|| {}))
        .unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 2);

    assert!(manager.assign_shortcut("hyper+c", Box::new(|| {})).is_err());
    let third = manager
        .assign_shortcut("ctrl+alt+c", Box::new(|| {}))
        .unwrap();
    assert_eq!(third, 3);
}

#[test]
fn unassign_twice_returns_true_then_false() {
    let table = ShortcutTable::new();
    let (mut manager, host, _) = manager_for(FakeWin32::default(), &table, "windows");

    let fired = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = fired.clone();
    let id = manager
        .assign_shortcut(
            "ctrl+alt+a",
            Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    assert!(manager.unassign_shortcut(id));
    assert!(!manager.unassign_shortcut(id));

    assert!(!host.filter().process(&NativeEvent::Message {
        message: WM_HOTKEY,
        hotkey_id: id as usize,
    }));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn cleanup_silences_everything_and_is_repeatable() {
    let table: ShortcutTable = HashMap::from([(
        "windows".to_string(),
        vec![spec("ctrl+alt+z", "math2latex"), spec("ctrl+alt+x", "math2text")],
    )]);
    let (mut manager, host, calls) = manager_for(FakeWin32::default(), &table, "windows");
    let filter = host.filter();

    manager.cleanup();
    for id in 1..=2usize {
        assert!(!filter.process(&NativeEvent::Message {
            message: WM_HOTKEY,
            hotkey_id: id,
        }));
    }
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(host.removals.load(Ordering::SeqCst), 1);

    manager.cleanup();
    assert_eq!(host.removals.load(Ordering::SeqCst), 2);
}

#[test]
fn unknown_platform_bucket_falls_back_to_default_only() {
    let api = FakeWin32::default();
    let table: ShortcutTable = HashMap::from([
        ("windows".to_string(), vec![spec("ctrl+alt+z", "math2latex")]),
        ("default".to_string(), vec![spec("ctrl+alt+x", "math2text")]),
    ]);
    let (_manager, _, _) = manager_for(api.clone(), &table, "haiku");
    let registered = api.registered.lock().unwrap();
    assert_eq!(registered.len(), 1);
    // Only the default bucket applies on an unrecognized platform name.
    assert_eq!(registered[0].key, 0x58);
}

use std::sync::atomic::Ordering;

use super::support::{FakeXlib, GrabCall, counting_callback};
use crate::backend::{NativeEvent, ShortcutBackend};
use crate::error::ShortcutError;
use crate::platform::linux::LinuxBackend;

const CONTROL_ALT: u32 = (1 << 2) | (1 << 3);
const LOCK: u32 = 1 << 1;
const MOD2: u32 = 1 << 4;

fn modifiers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn one_shortcut_issues_four_grabs_in_lock_mask_order() {
    let api = FakeXlib::default();
    let mut backend = LinuxBackend::new(api.clone());
    let (callback, _) = counting_callback();

    let installed = backend
        .install(&modifiers(&["ctrl", "alt"]), "a", 3, callback)
        .unwrap();
    assert!(installed);

    let masks: Vec<u32> = api.grabs.lock().unwrap().iter().map(|g| g.mask).collect();
    assert_eq!(
        masks,
        vec![CONTROL_ALT, CONTROL_ALT | LOCK, CONTROL_ALT | MOD2, CONTROL_ALT | LOCK | MOD2]
    );
    assert!(api.grabs.lock().unwrap().iter().all(|g| g.keycode == 38));
}

#[test]
fn failed_grab_rolls_back_leaving_zero_residual_grabs() {
    let api = FakeXlib::failing_on(3);
    let mut backend = LinuxBackend::new(api.clone());
    let (callback, _) = counting_callback();

    let installed = backend
        .install(&modifiers(&["ctrl", "alt"]), "a", 1, callback)
        .unwrap();
    assert!(!installed);

    // The first two grabs succeeded and must both be undone.
    assert_eq!(api.grabs.lock().unwrap().len(), 2);
    assert!(api.active_grabs().is_empty());

    // The refused combination never fires.
    assert!(!backend.handle_event(&NativeEvent::KeyPress {
        keycode: 38,
        state: CONTROL_ALT as u16,
    }));
}

#[test]
fn lock_key_state_is_normalized_away_on_translation() {
    let api = FakeXlib::default();
    let mut backend = LinuxBackend::new(api);
    let (callback, count) = counting_callback();
    backend
        .install(&modifiers(&["ctrl", "alt"]), "a", 4, callback)
        .unwrap();

    for state in [
        CONTROL_ALT,
        CONTROL_ALT | LOCK,
        CONTROL_ALT | MOD2,
        CONTROL_ALT | LOCK | MOD2,
    ] {
        assert!(backend.handle_event(&NativeEvent::KeyPress {
            keycode: 38,
            state: state as u16,
        }));
    }
    assert_eq!(count.load(Ordering::SeqCst), 4);

    // A different held modifier is a different combination.
    assert!(!backend.handle_event(&NativeEvent::KeyPress {
        keycode: 38,
        state: (CONTROL_ALT | 1) as u16,
    }));
}

#[test]
fn unresolvable_key_is_an_input_error() {
    let api = FakeXlib::default();
    let mut backend = LinuxBackend::new(api.clone());
    let (callback, _) = counting_callback();
    let err = backend
        .install(&modifiers(&["ctrl"]), "kanji", 1, callback)
        .unwrap_err();
    assert!(matches!(err, ShortcutError::UnsupportedKey(_)));
    assert!(api.grabs.lock().unwrap().is_empty());
}

#[test]
fn remove_ungrabs_all_four_masks() {
    let api = FakeXlib::default();
    let mut backend = LinuxBackend::new(api.clone());
    let (callback, _) = counting_callback();
    backend
        .install(&modifiers(&["ctrl", "alt"]), "a", 2, callback)
        .unwrap();

    assert!(backend.remove(2));
    assert!(!backend.remove(2));

    let expected: Vec<GrabCall> = [
        CONTROL_ALT,
        CONTROL_ALT | LOCK,
        CONTROL_ALT | MOD2,
        CONTROL_ALT | LOCK | MOD2,
    ]
    .into_iter()
    .map(|mask| GrabCall { keycode: 38, mask })
    .collect();
    assert_eq!(*api.ungrabs.lock().unwrap(), expected);
    assert!(api.active_grabs().is_empty());
}

#[test]
fn teardown_ungrabs_and_closes_the_display() {
    let api = FakeXlib::default();
    let mut backend = LinuxBackend::new(api.clone());
    let (callback, _) = counting_callback();
    backend
        .install(&modifiers(&["super"]), "a", 1, callback)
        .unwrap();

    backend.teardown();
    assert!(api.active_grabs().is_empty());
    assert!(api.closed.load(Ordering::SeqCst));
}

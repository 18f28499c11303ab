use thiserror::Error;

/// Failure modes of shortcut registration and backend setup.
///
/// The first three are caller-input errors and `Rejected` is an OS-level
/// refusal; all four are recoverable per shortcut. `UnsupportedPlatform` and
/// `BackendUnavailable` are fatal at initialization.
#[derive(Debug, Error)]
pub enum ShortcutError {
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("unsupported modifiers: {0:?}")]
    UnsupportedModifiers(Vec<String>),

    #[error("shortcut string has no key")]
    EmptyShortcut,

    #[error("combination rejected by the operating system: {0}")]
    Rejected(String),

    #[error("no shortcut backend for platform: {0}")]
    UnsupportedPlatform(String),

    #[error("shortcut backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("failed to install native event filter: {0}")]
    FilterInstall(String),
}

use std::sync::{Mutex, OnceLock};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Serializes tests that touch `LLOAD_*` or `HF_TOKEN` for the whole body.
pub(crate) fn with_locked_env<R>(run: impl FnOnce() -> R) -> R {
    let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    run()
}

/// Sets an environment variable from a test.
///
/// # Safety
/// `std::env::set_var` is unsafe in edition 2024. Call sites hold the lock
/// from [`with_locked_env`] so parallel tests never race on the environment.
pub(crate) fn set_env_var(key: &str, value: &str) {
    // SAFETY: callers hold the env lock.
    unsafe {
        std::env::set_var(key, value);
    }
}

/// Removes an environment variable from a test. See [`set_env_var`].
pub(crate) fn remove_env_var(key: &str) {
    // SAFETY: callers hold the env lock.
    unsafe {
        std::env::remove_var(key);
    }
}

#![allow(unused_macros)]

/// Helper macro for locking items
///
/// A poisoned lock is recovered.
///
/// ```rust, ignore
///  let mut subscribers = lock!(self.subscribers);
///  subscribers.clear();
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

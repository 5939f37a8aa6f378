//! Change detection
//!
//! A resource seen for the first time is always reported as changed. That
//! first event seeds the change log and is how consumers infer "first seen".

/// Compare the stored digest against a freshly computed one
pub fn is_changed(previous: Option<&str>, current: &str) -> bool {
    match previous {
        None => true,
        Some(previous) => previous != current,
    }
}

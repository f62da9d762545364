//! Incremental object cache
//!
//! Remembers which object names already had full geometry delivered on the
//! current connection. Delivery is at-least-once: names committed for a send
//! that fails are rolled back and go out in full again next frame.

use std::collections::HashSet;

use tracing::debug;

/// Names whose full geometry has been sent on this connection
#[derive(Debug, Clone, Default)]
pub struct ObjectCache {
    sent: HashSet<String>,
}

impl ObjectCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `name` has not been marked sent yet
    pub fn should_send_full_geometry(&self, name: &str) -> bool {
        !self.sent.contains(name)
    }

    /// Mark `name` sent; returns true if it was not already marked
    pub fn mark_sent(&mut self, name: &str) -> bool {
        if self.sent.contains(name) {
            return false;
        }
        self.sent.insert(name.to_string())
    }

    /// Un-mark every name in `names`
    pub fn rollback<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.sent.remove(name.as_ref());
        }
        if !names.is_empty() {
            debug!("Rolled back {} cache entries", names.len());
        }
    }

    /// Forget everything (the remote end starts with no state)
    pub fn clear(&mut self) {
        self.sent.clear();
    }

    /// Number of names marked sent
    pub fn len(&self) -> usize {
        self.sent.len()
    }

    /// Whether nothing is marked sent
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

//! Anonymous-name allocator for inline entity extensions.
//!
//! `spec.md` §9 flags the original's process-wide global counter map as a
//! design smell ("do not use hidden global state... counters unique per
//! interpreter suffice") — this moves the map onto the `Interpreter`
//! instance instead, following that note.

use std::collections::HashMap;

/// Monotonic counters keyed by parent-entity symbol (or `"$"` for the
/// rootless anonymous case), owned by a single interpretation.
#[derive(Debug, Default)]
pub struct AnonCounter(HashMap<String, u32>);

impl AnonCounter {
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Returns and increments the counter for `key`, starting at 1.
    pub fn next(&mut self, key: &str) -> u32 {
        let counter = self.0.entry(key.to_owned()).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_extensions_of_the_same_parent_get_sequential_names() {
        let mut counter = AnonCounter::new();
        assert_eq!(counter.next("Parent"), 1);
        assert_eq!(counter.next("Parent"), 2);
    }

    #[test]
    fn different_parents_have_independent_counters() {
        let mut counter = AnonCounter::new();
        assert_eq!(counter.next("A"), 1);
        assert_eq!(counter.next("B"), 1);
        assert_eq!(counter.next("A"), 2);
    }
}

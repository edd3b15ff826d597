//! Shared value cells.
//!
//! [`Property<T>`] is the simplest thing a binding can target: a value
//! behind a lock, shared by `Arc` between the owning model and any
//! [`Formatter`](crate::Formatter) that edits it. Each accepted write bumps
//! a revision so a model can tell whether an inspector touched it, and a
//! cell can be locked to refuse edits without rebuilding the inspector.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_inspect_core::{Data, Formatter, Property};
//!
//! let opacity = Arc::new(Property::new(0.5f32));
//! let binding = Formatter::from_properties(vec![opacity.clone()]);
//! binding.set(1.0, None);
//! assert_eq!(opacity.get(), 1.0);
//! assert_eq!(opacity.revision(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

/// A value cell that counts accepted writes and can refuse them.
pub struct Property<T> {
    cell: RwLock<T>,
    revision: AtomicU64,
    locked: AtomicBool,
}

impl<T> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: RwLock::new(value),
            revision: AtomicU64::new(0),
            locked: AtomicBool::new(false),
        }
    }

    /// Run `f` against the current value without cloning it.
    pub fn inspect<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.read())
    }

    /// Number of writes this cell has accepted.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Refuse (or accept again) writes arriving through [`store`](Self::store).
    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Write the value unless the cell is locked. Returns whether the write
    /// was accepted; an accepted write bumps the revision even when the value
    /// is unchanged.
    pub fn store(&self, value: T) -> bool {
        if self.is_locked() {
            return false;
        }
        *self.cell.write() = value;
        self.revision.fetch_add(1, Ordering::AcqRel);
        true
    }
}

impl<T: Clone> Property<T> {
    pub fn get(&self) -> T {
        self.cell.read().clone()
    }
}

impl<T: PartialEq> Property<T> {
    /// Write only when the value differs. Returns the displaced value.
    pub fn update(&self, value: T) -> Option<T> {
        if self.is_locked() {
            return None;
        }
        let mut current = self.cell.write();
        if *current == value {
            return None;
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
        Some(std::mem::replace(&mut *current, value))
    }
}

impl<T: Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Property");
        out.field("value", &*self.cell.read());
        out.field("revision", &self.revision());
        if self.is_locked() {
            out.field("locked", &true);
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_counts_revisions() {
        let cell = Property::new(String::from("cube"));
        assert_eq!(cell.revision(), 0);
        assert!(cell.store("sphere".into()));
        assert!(cell.store("sphere".into()));
        assert_eq!(cell.get(), "sphere");
        assert_eq!(cell.revision(), 2);
    }

    #[test]
    fn test_update_skips_equal_values() {
        let cell = Property::new(3u8);
        assert_eq!(cell.update(3), None);
        assert_eq!(cell.update(7), Some(3));
        assert_eq!(cell.revision(), 1);
        assert_eq!(cell.inspect(|v| *v * 2), 14);
    }

    #[test]
    fn test_locked_cell_refuses_writes() {
        let cell = Property::new(0.5f32);
        cell.set_locked(true);
        assert!(!cell.store(1.0));
        assert_eq!(cell.update(1.0), None);
        assert_eq!(cell.get(), 0.5);
        assert_eq!(cell.revision(), 0);

        cell.set_locked(false);
        assert!(cell.store(1.0));
        assert_eq!(cell.get(), 1.0);
    }

    #[test]
    fn test_debug_output() {
        let cell: Property<String> = Property::default();
        assert_eq!(format!("{cell:?}"), "Property { value: \"\", revision: 0 }");
        cell.set_locked(true);
        assert_eq!(
            format!("{cell:?}"),
            "Property { value: \"\", revision: 0, locked: true }"
        );
    }
}

//! Owner-thread checks.
//!
//! A control tree is driven from the thread that owns its windowing
//! resources. [`ThreadAffinity`] records that thread and lets tree
//! operations assert they are running on it.
//!
//! ```
//! use horizon_inspect_core::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! affinity.debug_assert_same_thread();
//! assert!(affinity.is_same_thread());
//! ```

use std::thread::ThreadId;

/// The thread an object is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// The bound thread.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Move the binding to the current thread.
    ///
    /// Used when ownership of a whole tree is handed to another thread.
    pub fn rebind(&mut self) {
        self.thread_id = std::thread::current().id();
    }

    /// Whether the current thread is the bound one.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Panic unless on the bound thread.
    ///
    /// # Panics
    ///
    /// Panics if called from a different thread.
    pub fn assert_same_thread(&self, operation: &str) {
        if !self.is_same_thread() {
            self.panic_wrong_thread(operation);
        }
    }

    /// Debug-only [`assert_same_thread`](Self::assert_same_thread).
    #[inline]
    pub fn debug_assert_same_thread(&self) {
        #[cfg(debug_assertions)]
        self.assert_same_thread("control tree accessed from a thread that does not own it");
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, operation: &str) -> ! {
        let current = std::thread::current();
        panic!(
            "{operation}: current thread \"{}\" ({:?}), owner {:?}",
            current.name().unwrap_or("<unnamed>"),
            current.id(),
            self.thread_id
        )
    }
}

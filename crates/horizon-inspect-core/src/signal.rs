//! Signal system for Horizon Inspect.
//!
//! Two flavours of observer list are provided:
//!
//! - [`Signal<Args>`] - side-effect-only notification ("changed")
//! - [`VetoSignal<Args>`] - every listener returns `true` to accept or
//!   `false` to reject ("changing")
//!
//! Both are invoked directly on the emitting thread. Slots are cloned out
//! of the connection table before they run, so a slot may connect or
//! disconnect other slots (or itself) while the signal is being emitted.
//!
//! # Example
//!
//! ```
//! use horizon_inspect_core::{Signal, VetoSignal};
//!
//! let changed = Signal::<String>::new();
//! let id = changed.connect(|text| println!("now {text}"));
//! changed.emit("Hello".to_string());
//! changed.disconnect(id);
//!
//! let changing = VetoSignal::<i32>::new();
//! changing.connect(|value| *value >= 0);
//! assert!(changing.emit(&5));
//! assert!(!changing.emit(&-1));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Identifies one connected listener of a [`Signal`] or [`VetoSignal`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;
type VetoSlot<Args> = Arc<dyn Fn(&Args) -> bool + Send + Sync>;

/// Connection table shared by both signal flavours.
///
/// Freed slots are reused by the slot map, so each entry carries the
/// sequence number it was connected with to keep listeners in connection
/// order.
struct Slots<S> {
    table: Mutex<SlotTable<S>>,
    blocked: AtomicBool,
}

struct SlotTable<S> {
    entries: SlotMap<ConnectionId, (u64, S)>,
    next_seq: u64,
}

impl<S: Clone> Slots<S> {
    fn new() -> Self {
        Self {
            table: Mutex::new(SlotTable {
                entries: SlotMap::with_key(),
                next_seq: 0,
            }),
            blocked: AtomicBool::new(false),
        }
    }

    fn insert(&self, slot: S) -> ConnectionId {
        let mut table = self.table.lock();
        let seq = table.next_seq;
        table.next_seq += 1;
        table.entries.insert((seq, slot))
    }

    fn remove(&self, id: ConnectionId) -> bool {
        self.table.lock().entries.remove(id).is_some()
    }

    fn clear(&self) {
        self.table.lock().entries.clear();
    }

    fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Listeners in connection order, copied out so they may reconnect
    /// while running.
    fn snapshot(&self) -> Vec<S> {
        let mut listeners: Vec<(u64, S)> = self.table.lock().entries.values().cloned().collect();
        listeners.sort_unstable_by_key(|(seq, _)| *seq);
        listeners.into_iter().map(|(_, slot)| slot).collect()
    }
}

/// Notification fired after something happened.
///
/// `Args` is passed by reference to every listener; use `()` for bare
/// notifications and a tuple for several values.
pub struct Signal<Args> {
    slots: Slots<Slot<Args>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self { slots: Slots::new() }
    }

    /// Connect a listener. Keep the returned id to disconnect it later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.insert(Arc::new(slot))
    }

    /// Returns `false` if `id` was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.remove(id)
    }

    pub fn disconnect_all(&self) {
        self.slots.clear();
    }

    pub fn connection_count(&self) -> usize {
        self.slots.len()
    }

    /// While blocked, `emit()` does nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.slots.set_blocked(blocked);
    }

    pub fn is_blocked(&self) -> bool {
        self.slots.is_blocked()
    }

    /// Invoke every listener in connection order.
    #[tracing::instrument(skip_all, target = "horizon_inspect_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let listeners = self.slots.snapshot();
        tracing::trace!(target: targets::SIGNAL, listeners = listeners.len(), "emitting signal");
        for listener in listeners {
            listener(&args);
        }
    }
}

/// A signal whose listeners may reject the pending change.
///
/// Listeners are asked in connection order; the first one that returns
/// `false` vetoes the change and the rest are not asked.
pub struct VetoSignal<Args> {
    slots: Slots<VetoSlot<Args>>,
}

impl<Args: 'static> Default for VetoSignal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> VetoSignal<Args> {
    pub fn new() -> Self {
        Self { slots: Slots::new() }
    }

    /// Connect a listener that accepts (`true`) or rejects (`false`) a change.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) -> bool + Send + Sync + 'static,
    {
        self.slots.insert(Arc::new(slot))
    }

    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.remove(id)
    }

    pub fn disconnect_all(&self) {
        self.slots.clear();
    }

    pub fn connection_count(&self) -> usize {
        self.slots.len()
    }

    /// While blocked, `emit()` accepts every change without asking anyone.
    pub fn set_blocked(&self, blocked: bool) {
        self.slots.set_blocked(blocked);
    }

    pub fn is_blocked(&self) -> bool {
        self.slots.is_blocked()
    }

    /// Ask every listener about the change. Returns `false` if one vetoed.
    #[tracing::instrument(skip_all, target = "horizon_inspect_core::signal", level = "trace")]
    pub fn emit(&self, args: &Args) -> bool {
        if self.is_blocked() {
            return true;
        }

        let vetoed = self.slots.snapshot().into_iter().any(|listener| !listener(args));
        if vetoed {
            tracing::debug!(target: targets::SIGNAL, "change vetoed by listener");
        }
        !vetoed
    }
}

//! Undo/redo for data bindings.
//!
//! A [`DataCommand`] snapshots every target of a binding when it is created.
//! Undoing writes the snapshot back and keeps the values it replaced, so the
//! next redo restores them; the two operations are the same swap.
//!
//! [`UndoQueue`] keeps a bounded history. Commands from bindings marked
//! insignificant are coalesced into the next significant step: one
//! [`undo`](UndoQueue::undo) walks back until it has undone a significant
//! command.

use std::sync::Arc;

use crate::data::{Data, DataBinding};
use crate::logging::targets;

/// A reversible step.
pub trait UndoCommand: Send {
    /// Revert the step.
    fn undo(&mut self);

    /// Re-apply the step.
    fn redo(&mut self);

    /// Whether the step counts as a separate user-visible change.
    fn is_significant(&self) -> bool {
        true
    }
}

/// Snapshot of a binding's values.
pub struct DataCommand<T> {
    data: Arc<dyn Data<T>>,
    values: Vec<T>,
    significant: bool,
}

impl<T: Clone + Send + 'static> DataCommand<T> {
    /// Capture the current values of every target of `data`.
    pub fn new(data: Arc<dyn Data<T>>) -> Self {
        let values = data.get_all();
        let significant = data.is_significant();
        Self {
            data,
            values,
            significant,
        }
    }

    /// The captured values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    fn swap(&mut self) {
        let current = self.data.get_all();
        let expected = self.data.len();
        if current.len() != expected || self.values.len() != expected {
            tracing::warn!(
                target: targets::UNDO,
                expected,
                captured = self.values.len(),
                current = current.len(),
                "binding lost targets, skipping undo step"
            );
            return;
        }
        let previous = std::mem::replace(&mut self.values, current);
        self.data.set_all(previous, None);
    }
}

impl<T: Clone + Send + 'static> UndoCommand for DataCommand<T> {
    fn undo(&mut self) {
        self.swap();
    }

    fn redo(&mut self) {
        self.swap();
    }

    fn is_significant(&self) -> bool {
        self.significant
    }
}

/// Several commands applied as one step.
#[derive(Default)]
pub struct BatchUndoCommand {
    commands: Vec<Box<dyn UndoCommand>>,
}

impl BatchUndoCommand {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    pub fn push(&mut self, command: Box<dyn UndoCommand>) {
        self.commands.push(command);
    }

    /// Number of grouped commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl UndoCommand for BatchUndoCommand {
    fn undo(&mut self) {
        for command in self.commands.iter_mut().rev() {
            command.undo();
        }
    }

    fn redo(&mut self) {
        for command in &mut self.commands {
            command.redo();
        }
    }

    fn is_significant(&self) -> bool {
        self.commands.iter().any(|command| command.is_significant())
    }
}

/// Bounded undo/redo history.
pub struct UndoQueue {
    commands: Vec<Box<dyn UndoCommand>>,
    /// Number of commands currently applied.
    index: usize,
    max_len: usize,
}

impl Default for UndoQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LEN)
    }
}

impl UndoQueue {
    /// History length used by [`Default`].
    pub const DEFAULT_MAX_LEN: usize = 100;

    /// A queue keeping at most `max_len` commands.
    pub fn new(max_len: usize) -> Self {
        Self {
            commands: Vec::new(),
            index: 0,
            max_len: max_len.max(1),
        }
    }

    /// Record a command that has already been applied.
    ///
    /// Anything that was undone and not redone is discarded.
    pub fn push(&mut self, command: Box<dyn UndoCommand>) {
        self.commands.truncate(self.index);
        self.commands.push(command);
        if self.commands.len() > self.max_len {
            let excess = self.commands.len() - self.max_len;
            self.commands.drain(..excess);
            crate::inspect_trace!(dropped = excess, "undo history trimmed");
        }
        self.index = self.commands.len();
    }

    /// Undo back to and including the most recent significant command.
    ///
    /// Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let start = self.index;
        while self.index > 0 {
            self.index -= 1;
            let command = &mut self.commands[self.index];
            command.undo();
            if command.is_significant() {
                break;
            }
        }
        crate::inspect_debug!(steps = start - self.index, "undo");
        self.index != start
    }

    /// Redo forward to and including the next significant command.
    ///
    /// Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let start = self.index;
        while self.index < self.commands.len() {
            let command = &mut self.commands[self.index];
            command.redo();
            self.index += 1;
            if command.is_significant() {
                break;
            }
        }
        crate::inspect_debug!(steps = self.index - start, "redo");
        self.index != start
    }

    /// Whether [`undo`](Self::undo) would do anything.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether [`redo`](Self::redo) would do anything.
    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forget the whole history.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
    }
}

static_assertions::assert_impl_all!(UndoQueue: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataBinding, Formatter};
    use crate::property::Property;

    fn binding(values: &[i32]) -> (Vec<Arc<Property<i32>>>, Arc<Formatter<i32>>) {
        let cells: Vec<_> = values.iter().map(|v| Arc::new(Property::new(*v))).collect();
        let data = Arc::new(Formatter::from_properties(cells.clone()));
        (cells, data)
    }

    fn record(queue: &mut UndoQueue, data: &Arc<Formatter<i32>>, value: i32) {
        let command = data.clone().undo_command();
        data.set(value, None);
        queue.push(command);
    }

    #[test]
    fn test_data_command_swaps() {
        let (cells, data) = binding(&[1, 2]);
        let mut command = DataCommand::new(data.clone() as Arc<dyn Data<i32>>);
        assert_eq!(command.values(), &[1, 2]);

        data.set(5, None);
        command.undo();
        assert_eq!(cells[0].get(), 1);
        assert_eq!(cells[1].get(), 2);

        command.redo();
        assert_eq!(data.get_all(), vec![5, 5]);
    }

    #[test]
    fn test_queue_undo_redo() {
        let (_, data) = binding(&[0]);
        let mut queue = UndoQueue::default();
        record(&mut queue, &data, 1);
        record(&mut queue, &data, 2);

        assert!(queue.undo());
        assert_eq!(data.get_all(), vec![1]);
        assert!(queue.undo());
        assert_eq!(data.get_all(), vec![0]);
        assert!(!queue.undo());

        assert!(queue.redo());
        assert!(queue.redo());
        assert_eq!(data.get_all(), vec![2]);
        assert!(!queue.can_redo());
    }

    #[test]
    fn test_push_discards_redo_tail() {
        let (_, data) = binding(&[0]);
        let mut queue = UndoQueue::default();
        record(&mut queue, &data, 1);
        record(&mut queue, &data, 2);
        queue.undo();
        record(&mut queue, &data, 3);
        assert_eq!(queue.len(), 2);
        assert!(!queue.can_redo());
    }

    #[test]
    fn test_max_len() {
        let (_, data) = binding(&[0]);
        let mut queue = UndoQueue::new(2);
        for value in 1..=4 {
            record(&mut queue, &data, value);
        }
        assert_eq!(queue.len(), 2);
        queue.undo();
        queue.undo();
        assert_eq!(data.get_all(), vec![2]);
        assert!(!queue.can_undo());
    }

    #[test]
    fn test_insignificant_commands_coalesce() {
        let (_, data) = binding(&[0]);
        let mut queue = UndoQueue::default();
        record(&mut queue, &data, 1);
        data.set_significant(false);
        record(&mut queue, &data, 2);
        record(&mut queue, &data, 3);

        // Two insignificant steps then the significant one.
        assert!(queue.undo());
        assert_eq!(data.get_all(), vec![0]);
        assert!(!queue.can_undo());
    }

    #[test]
    fn test_batch_undoes_in_reverse() {
        let (_, data) = binding(&[0]);
        let mut batch = BatchUndoCommand::new();
        for value in [1, 2] {
            let command = data.clone().undo_command();
            data.set(value, None);
            batch.push(command);
        }
        assert_eq!(batch.len(), 2);

        batch.undo();
        assert_eq!(data.get_all(), vec![0]);
        batch.redo();
        assert_eq!(data.get_all(), vec![2]);
        assert!(batch.is_significant());
    }
}

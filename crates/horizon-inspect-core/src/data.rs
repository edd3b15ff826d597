//! Data binding between controls and live values.
//!
//! A binding spans exactly `N` targets fixed at construction. Reading merges
//! the `N` values: equal values read as that value, differing values read as
//! [`Merged::Multi`] and an empty binding reads as [`Merged::Undef`].
//! Targets that no longer exist, such as an element removed from its array,
//! are left out of the merge.
//!
//! Writing asks the vetoable [`changing`](Data::changing) signal once per
//! target; vetoed targets are skipped while accepted targets are written,
//! then [`changed`](DataBinding::changed) fires once with the emitter token
//! of whoever wrote.
//!
//! # Key Types
//!
//! - [`DataBinding`] - type-erased endpoint shared by controls and undo
//! - [`Data<T>`] - typed Get/GetAll/Set/SetAll
//! - [`Formatter<T>`] - the concrete binding over a list of [`Accessor`]s
//! - [`Merged<T>`] - result of a merged read

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{MetaError, MetaResult};
use crate::logging::targets;
use crate::meta::{FieldEntry, Instance};
use crate::property::Property;
use crate::signal::{Signal, VetoSignal};
use crate::undo::{DataCommand, UndoCommand};
use crate::value::{FieldValue, MULTI_VALUE, UNDEF_VALUE};

/// Token identifying whoever performed a write.
///
/// Listeners compare it against their own token to ignore changes they
/// caused themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterId(u64);

impl EmitterId {
    /// Create a token from a raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// Arguments of the post-change signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChanged {
    /// Who wrote, or `None` for refreshes and anonymous writes.
    pub emitter: Option<EmitterId>,
}

/// Arguments of the vetoable pre-change signal.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChanging<T> {
    /// Index of the target about to be written.
    pub target: usize,
    /// The value about to be stored.
    pub value: T,
}

/// The merged value of all targets of a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Merged<T> {
    /// Every target holds this value.
    Uniform(T),
    /// The targets disagree.
    Multi,
    /// There are no targets.
    Undef,
}

impl<T> Merged<T> {
    /// The uniform value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Uniform(value) => Some(value),
            _ => None,
        }
    }

    /// Consume into the uniform value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Uniform(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the targets disagree.
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi)
    }
}

impl<T: FieldValue> Merged<T> {
    /// Text shown by a control: the value, `"Multi"` or `"Undef"`.
    pub fn to_text(&self) -> String {
        match self {
            Self::Uniform(value) => value.to_text(),
            Self::Multi => MULTI_VALUE.to_string(),
            Self::Undef => UNDEF_VALUE.to_string(),
        }
    }
}

/// Type-erased binding endpoint.
///
/// Shared by reference between controls and undo commands; it lives as long
/// as any of them holds it.
pub trait DataBinding: Send + Sync {
    /// Number of bound targets.
    fn len(&self) -> usize;

    /// Whether no target is bound.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Post-change signal.
    fn changed(&self) -> &Signal<DataChanged>;

    /// Tell every listener to re-read.
    fn refresh(&self) {
        self.changed().emit(DataChanged { emitter: None });
    }

    /// Whether undo entries for this binding are significant.
    fn is_significant(&self) -> bool;

    /// Mark undo entries for this binding as (in)significant.
    fn set_significant(&self, significant: bool);

    /// Snapshot the current values into an undo command.
    fn undo_command(self: Arc<Self>) -> Box<dyn UndoCommand>;

    /// Name of the bound value type, for diagnostics.
    fn value_type_name(&self) -> &'static str;

    /// Get this as Any for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Typed access to a binding.
pub trait Data<T>: DataBinding {
    /// Vetoable pre-change signal, raised once per target.
    fn changing(&self) -> &VetoSignal<DataChanging<T>>;

    /// Merged value of all targets that can still be read.
    fn get(&self) -> Merged<T>;

    /// Value of every readable target, in target order. Shorter than
    /// [`len`](DataBinding::len) when a target no longer exists.
    fn get_all(&self) -> Vec<T>;

    /// Write one value to every accepting target.
    ///
    /// Returns `true` if at least one target was written.
    fn set(&self, value: T, emitter: Option<EmitterId>) -> bool;

    /// Write one value per target.
    ///
    /// # Panics
    ///
    /// Panics without writing anything if `values.len()` differs from
    /// [`len`](DataBinding::len).
    fn set_all(&self, values: Vec<T>, emitter: Option<EmitterId>) -> bool;
}

/// One bound target.
pub trait Accessor<T>: Send + Sync {
    /// Read the target, or `None` if it no longer exists.
    fn read(&self) -> Option<T>;

    /// Write the target. Returns `false` if the target refused the value.
    fn write(&self, value: T) -> bool;
}

impl<T: Clone + Send + Sync> Accessor<T> for Arc<Property<T>> {
    fn read(&self) -> Option<T> {
        Some(Property::get(self))
    }

    fn write(&self, value: T) -> bool {
        self.store(value)
    }
}

/// A target reached through a getter/setter pair.
pub struct PropertyAccessor<T> {
    getter: Box<dyn Fn() -> T + Send + Sync>,
    setter: Box<dyn Fn(T) + Send + Sync>,
}

impl<T> PropertyAccessor<T> {
    /// Wrap a getter/setter pair.
    pub fn new<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self {
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }
}

impl<T> Accessor<T> for PropertyAccessor<T> {
    fn read(&self) -> Option<T> {
        Some((self.getter)())
    }

    fn write(&self, value: T) -> bool {
        (self.setter)(value);
        true
    }
}

fn check_owner(instance: &Instance, entry: &FieldEntry) -> MetaResult<()> {
    if instance.read().meta_class().is_a(entry.owner) {
        Ok(())
    } else {
        Err(MetaError::WrongOwner {
            class: entry.owner.name,
            field: entry.field.name,
        })
    }
}

/// A reflected field of one instance, accessed as its own type.
pub struct FieldAccessor<T> {
    instance: Instance,
    entry: FieldEntry,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: FieldValue> FieldAccessor<T> {
    /// Bind `entry` of `instance`, checking the field really holds a `T`.
    pub fn new(instance: Instance, entry: FieldEntry) -> MetaResult<Self> {
        if (entry.field.type_id)() != TypeId::of::<T>() {
            return Err(MetaError::TypeMismatch {
                expected: entry.field.type_name,
                field: entry.field.name,
            });
        }
        check_owner(&instance, &entry)?;
        Ok(Self {
            instance,
            entry,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<T: FieldValue> Accessor<T> for FieldAccessor<T> {
    fn read(&self) -> Option<T> {
        let value = self.entry.get(&*self.instance.read());
        match value.and_then(|boxed| boxed.downcast::<T>().ok()) {
            Some(value) => Some(*value),
            None => {
                tracing::warn!(target: targets::DATA, field = ?self.entry, ty = type_name::<T>(), "field unreadable");
                None
            }
        }
    }

    fn write(&self, value: T) -> bool {
        let result = self.entry.set(&mut *self.instance.write(), Box::new(value));
        if let Err(err) = &result {
            tracing::warn!(target: targets::DATA, field = ?self.entry, %err, "field write refused");
        }
        result.is_ok()
    }
}

/// A reflected field of one instance, accessed through its text form.
pub struct FieldTextAccessor {
    instance: Instance,
    entry: FieldEntry,
}

impl FieldTextAccessor {
    /// Bind `entry` of `instance`.
    pub fn new(instance: Instance, entry: FieldEntry) -> MetaResult<Self> {
        check_owner(&instance, &entry)?;
        Ok(Self { instance, entry })
    }
}

impl Accessor<String> for FieldTextAccessor {
    fn read(&self) -> Option<String> {
        self.entry.get_text(&*self.instance.read())
    }

    fn write(&self, value: String) -> bool {
        let result = self.entry.set_text(&mut *self.instance.write(), &value);
        if let Err(err) = &result {
            tracing::warn!(target: targets::DATA, field = ?self.entry, %err, "field write refused");
        }
        result.is_ok()
    }
}

/// One element of a reflected `Vec<T>` field.
pub struct ElementAccessor<T> {
    array: FieldAccessor<Vec<T>>,
    index: usize,
}

impl<T: FieldValue> ElementAccessor<T> {
    /// Bind element `index` of the array field `entry` of `instance`.
    pub fn new(instance: Instance, entry: FieldEntry, index: usize) -> MetaResult<Self> {
        Ok(Self {
            array: FieldAccessor::new(instance, entry)?,
            index,
        })
    }
}

impl<T: FieldValue> Accessor<T> for ElementAccessor<T> {
    fn read(&self) -> Option<T> {
        let mut elements = self.array.read()?;
        if self.index >= elements.len() {
            tracing::debug!(target: targets::DATA, index = self.index, len = elements.len(), "element no longer exists");
            return None;
        }
        Some(elements.swap_remove(self.index))
    }

    fn write(&self, value: T) -> bool {
        let Some(mut elements) = self.array.read() else {
            return false;
        };
        match elements.get_mut(self.index) {
            Some(slot) => {
                *slot = value;
                self.array.write(elements)
            }
            None => false,
        }
    }
}

/// Presents a typed target as text.
pub struct TextAdapter<T> {
    inner: Box<dyn Accessor<T>>,
}

impl<T: FieldValue> TextAdapter<T> {
    /// Wrap a typed target.
    pub fn new(inner: Box<dyn Accessor<T>>) -> Self {
        Self { inner }
    }
}

impl<T: FieldValue> Accessor<String> for TextAdapter<T> {
    fn read(&self) -> Option<String> {
        self.inner.read().map(|value| value.to_text())
    }

    fn write(&self, value: String) -> bool {
        match T::from_text(&value) {
            Some(parsed) => self.inner.write(parsed),
            None => {
                tracing::debug!(target: targets::DATA, text = %value, ty = type_name::<T>(), "text not convertible");
                false
            }
        }
    }
}

/// The concrete binding: `N` targets fixed at construction.
pub struct Formatter<T> {
    targets: Vec<Box<dyn Accessor<T>>>,
    changing: VetoSignal<DataChanging<T>>,
    changed: Signal<DataChanged>,
    significant: AtomicBool,
}

impl<T> fmt::Debug for Formatter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("type", &type_name::<T>())
            .field("targets", &self.targets.len())
            .field("significant", &self.significant.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Formatter<T> {
    /// Bind the given targets.
    pub fn new(targets: Vec<Box<dyn Accessor<T>>>) -> Self {
        Self {
            targets,
            changing: VetoSignal::new(),
            changed: Signal::new(),
            significant: AtomicBool::new(true),
        }
    }

    /// Bind shared value cells.
    pub fn from_properties(cells: Vec<Arc<Property<T>>>) -> Self {
        Self::new(
            cells
                .into_iter()
                .map(|cell| Box::new(cell) as Box<dyn Accessor<T>>)
                .collect(),
        )
    }

    /// Bind a single getter/setter pair.
    pub fn from_accessor<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self::new(vec![Box::new(PropertyAccessor::new(getter, setter))])
    }
}

impl<T: FieldValue> Formatter<T> {
    /// Bind one field across several instances as its own type.
    pub fn from_fields(instances: &[Instance], entry: &FieldEntry) -> MetaResult<Self> {
        let targets = instances
            .iter()
            .map(|instance| {
                FieldAccessor::<T>::new(instance.clone(), entry.clone())
                    .map(|accessor| Box::new(accessor) as Box<dyn Accessor<T>>)
            })
            .collect::<MetaResult<Vec<_>>>()?;
        Ok(Self::new(targets))
    }

    /// Bind element `index` of an array field across several instances.
    pub fn from_elements(instances: &[Instance], entry: &FieldEntry, index: usize) -> MetaResult<Self> {
        let targets = instances
            .iter()
            .map(|instance| {
                ElementAccessor::<T>::new(instance.clone(), entry.clone(), index)
                    .map(|accessor| Box::new(accessor) as Box<dyn Accessor<T>>)
            })
            .collect::<MetaResult<Vec<_>>>()?;
        Ok(Self::new(targets))
    }
}

impl Formatter<String> {
    /// Bind one field across several instances through its text form.
    pub fn text_from_fields(instances: &[Instance], entry: &FieldEntry) -> MetaResult<Self> {
        let targets = instances
            .iter()
            .map(|instance| {
                FieldTextAccessor::new(instance.clone(), entry.clone())
                    .map(|accessor| Box::new(accessor) as Box<dyn Accessor<String>>)
            })
            .collect::<MetaResult<Vec<_>>>()?;
        Ok(Self::new(targets))
    }

    /// Present typed targets as text.
    pub fn text<T: FieldValue>(targets: Vec<Box<dyn Accessor<T>>>) -> Self {
        Self::new(
            targets
                .into_iter()
                .map(|inner| Box::new(TextAdapter::new(inner)) as Box<dyn Accessor<String>>)
                .collect(),
        )
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> DataBinding for Formatter<T> {
    fn len(&self) -> usize {
        self.targets.len()
    }

    fn changed(&self) -> &Signal<DataChanged> {
        &self.changed
    }

    fn is_significant(&self) -> bool {
        self.significant.load(Ordering::SeqCst)
    }

    fn set_significant(&self, significant: bool) {
        self.significant.store(significant, Ordering::SeqCst);
    }

    fn undo_command(self: Arc<Self>) -> Box<dyn UndoCommand> {
        Box::new(DataCommand::new(self))
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Data<T> for Formatter<T> {
    fn changing(&self) -> &VetoSignal<DataChanging<T>> {
        &self.changing
    }

    fn get(&self) -> Merged<T> {
        let mut values = self.targets.iter().filter_map(|target| target.read());
        let Some(first) = values.next() else {
            return Merged::Undef;
        };
        if values.all(|value| value == first) {
            Merged::Uniform(first)
        } else {
            Merged::Multi
        }
    }

    fn get_all(&self) -> Vec<T> {
        self.targets.iter().filter_map(|target| target.read()).collect()
    }

    #[tracing::instrument(skip_all, target = "horizon_inspect_core::data", level = "trace")]
    fn set(&self, value: T, emitter: Option<EmitterId>) -> bool {
        let mut written = false;
        for (index, target) in self.targets.iter().enumerate() {
            let change = DataChanging {
                target: index,
                value: value.clone(),
            };
            if !self.changing.emit(&change) {
                tracing::debug!(target: targets::DATA, index, "write vetoed");
                continue;
            }
            written |= target.write(change.value);
        }

        if written {
            self.changed.emit(DataChanged { emitter });
        }
        written
    }

    #[tracing::instrument(skip_all, target = "horizon_inspect_core::data", level = "trace")]
    fn set_all(&self, values: Vec<T>, emitter: Option<EmitterId>) -> bool {
        assert_eq!(
            values.len(),
            self.targets.len(),
            "set_all on a {} binding: {} values for {} targets",
            type_name::<T>(),
            values.len(),
            self.targets.len()
        );

        let mut written = false;
        for (index, (target, value)) in self.targets.iter().zip(values).enumerate() {
            let change = DataChanging {
                target: index,
                value,
            };
            if !self.changing.emit(&change) {
                tracing::debug!(target: targets::DATA, index, "write vetoed");
                continue;
            }
            written |= target.write(change.value);
        }

        if written {
            self.changed.emit(DataChanged { emitter });
        }
        written
    }
}

/// Downcast a type-erased binding to the concrete typed formatter.
pub fn downcast_data<T: 'static>(binding: &dyn DataBinding) -> Option<&Formatter<T>> {
    binding.as_any().downcast_ref::<Formatter<T>>()
}

static_assertions::assert_impl_all!(Formatter<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn cells(values: &[i32]) -> Vec<Arc<Property<i32>>> {
        values.iter().map(|v| Arc::new(Property::new(*v))).collect()
    }

    #[test]
    fn test_get_merges_values() {
        let equal = Formatter::from_properties(cells(&[3, 3, 3]));
        assert_eq!(equal.get(), Merged::Uniform(3));

        let differing = Formatter::from_properties(cells(&[3, 4]));
        assert_eq!(differing.get(), Merged::Multi);

        let empty = Formatter::<i32>::from_properties(Vec::new());
        assert_eq!(empty.get(), Merged::Undef);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_sentinel_text() {
        assert_eq!(Merged::<i32>::Multi.to_text(), "Multi");
        assert_eq!(Merged::<i32>::Undef.to_text(), "Undef");
        assert_eq!(Merged::Uniform(2.5f32).to_text(), "2.500000");
    }

    #[test]
    fn test_set_writes_every_target_and_signals_once() {
        let targets = cells(&[1, 2]);
        let data = Formatter::from_properties(targets.clone());
        let changes = Arc::new(Mutex::new(Vec::new()));

        let changes_clone = changes.clone();
        data.changed().connect(move |args| changes_clone.lock().push(args.emitter));

        assert!(data.set(9, Some(EmitterId::new(7))));
        assert_eq!(targets[0].get(), 9);
        assert_eq!(targets[1].get(), 9);
        assert_eq!(*changes.lock(), vec![Some(EmitterId::new(7))]);
    }

    #[test]
    fn test_veto_skips_only_that_target() {
        let targets = cells(&[1, 2, 3]);
        let data = Formatter::from_properties(targets.clone());
        data.changing().connect(|change| change.target != 1);

        assert!(data.set_all(vec![10, 20, 30], None));
        assert_eq!(data.get_all(), vec![10, 2, 30]);
    }

    #[test]
    fn test_full_veto_returns_false_without_signal() {
        let data = Formatter::from_properties(cells(&[1]));
        let fired = Arc::new(Mutex::new(0));
        let fired_clone = fired.clone();
        data.changed().connect(move |_| *fired_clone.lock() += 1);
        data.changing().connect(|_| false);

        assert!(!data.set(5, None));
        assert_eq!(data.get(), Merged::Uniform(1));
        assert_eq!(*fired.lock(), 0);
    }

    #[test]
    #[should_panic(expected = "2 values for 3 targets")]
    fn test_set_all_length_mismatch_panics() {
        let data = Formatter::from_properties(cells(&[1, 2, 3]));
        data.set_all(vec![1, 2], None);
    }

    #[test]
    fn test_set_all_length_mismatch_writes_nothing() {
        let targets = cells(&[1, 2, 3]);
        let data = Formatter::from_properties(targets.clone());
        let result = catch_unwind(AssertUnwindSafe(|| data.set_all(vec![7, 7], None)));
        assert!(result.is_err());
        assert_eq!(data.get_all(), vec![1, 2, 3]);
    }

    #[test]
    fn test_get_all_then_set_all_round_trips() {
        let data = Formatter::from_properties(cells(&[4, 5, 6]));
        let before = data.get();
        data.set_all(data.get_all(), None);
        assert_eq!(data.get(), before);
        assert_eq!(data.get_all(), vec![4, 5, 6]);
    }

    #[test]
    fn test_getter_setter_pair() {
        let cell = Arc::new(Mutex::new(String::from("a")));
        let (get_cell, set_cell) = (cell.clone(), cell.clone());
        let data = Formatter::from_accessor(
            move || get_cell.lock().clone(),
            move |value| *set_cell.lock() = value,
        );
        data.set("b".to_string(), None);
        assert_eq!(*cell.lock(), "b");
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_text_formatter_converts() {
        let floats = vec![Arc::new(Property::new(1.0f32)), Arc::new(Property::new(1.0f32))];
        let data = Formatter::text(
            floats
                .iter()
                .map(|cell| Box::new(cell.clone()) as Box<dyn Accessor<f32>>)
                .collect(),
        );
        assert_eq!(data.get(), Merged::Uniform("1.000000".to_string()));

        assert!(data.set("2.5".to_string(), None));
        assert_eq!(floats[1].get(), 2.5);

        // Unparseable text leaves the values alone.
        assert!(!data.set("abc".to_string(), None));
        assert_eq!(floats[0].get(), 2.5);
    }

    #[test]
    fn test_refresh_emits_without_emitter() {
        let data = Formatter::from_properties(cells(&[1]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        data.changed().connect(move |args| seen_clone.lock().push(*args));
        data.refresh();
        assert_eq!(*seen.lock(), vec![DataChanged { emitter: None }]);
    }

    #[test]
    fn test_downcast_data() {
        let data: Arc<dyn DataBinding> = Arc::new(Formatter::from_properties(cells(&[1])));
        assert!(downcast_data::<i32>(data.as_ref()).is_some());
        assert!(downcast_data::<u32>(data.as_ref()).is_none());
        assert_eq!(data.value_type_name(), "i32");
    }
}

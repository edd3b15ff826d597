//! Core systems for Horizon Inspect.
//!
//! This crate provides the toolkit-independent half of the inspector:
//!
//! - **Signals**: observer signals and vetoable pre-change signals
//! - **Properties**: shared value cells
//! - **Value types**: descriptors and text conversion for field values
//! - **Reflection**: static class/field metadata produced by `#[derive(Reflect)]`
//! - **Data binding**: [`Formatter<T>`] binds `N` live targets as one value
//! - **Undo**: snapshot commands and a bounded history
//!
//! # Binding Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_inspect_core::{Data, DataBinding, Formatter, Merged, Property};
//!
//! let a = Arc::new(Property::new(1));
//! let b = Arc::new(Property::new(2));
//! let binding = Formatter::from_properties(vec![a.clone(), b.clone()]);
//! assert_eq!(binding.get(), Merged::Multi);
//!
//! binding.changed().connect(|args| println!("written by {:?}", args.emitter));
//! binding.set(7, None);
//! assert_eq!(binding.get(), Merged::Uniform(7));
//! ```
//!
//! # Veto Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_inspect_core::{Data, Formatter, Property};
//!
//! let level = Arc::new(Property::new(3u8));
//! let binding = Formatter::from_properties(vec![level.clone()]);
//! binding.changing().connect(|change| change.value <= 10);
//!
//! assert!(!binding.set(11, None));
//! assert_eq!(level.get(), 3);
//! ```

mod error;
pub mod data;
pub mod logging;
pub mod meta;
pub mod property;
pub mod signal;
pub mod thread_check;
pub mod undo;
pub mod value;

pub use data::{
    Accessor, Data, DataBinding, DataChanged, DataChanging, ElementAccessor, EmitterId,
    FieldAccessor, FieldTextAccessor, Formatter, Merged, PropertyAccessor, TextAdapter,
    downcast_data,
};
pub use error::{MetaError, MetaResult};
pub use logging::PerfSpan;
pub use meta::{
    BaseLink, FieldAccess, FieldEntry, FieldFlags, FieldGetter, FieldSetter, Instance, MetaClass,
    MetaField, Reflect, Shared, TypeRegistry, as_instance, share,
};
pub use property::Property;
pub use signal::{ConnectionId, Signal, VetoSignal};
pub use thread_check::ThreadAffinity;
pub use undo::{BatchUndoCommand, DataCommand, UndoCommand, UndoQueue};
pub use value::{FieldValue, ITEM_DELIMITER, MULTI_VALUE, UNDEF_VALUE, ValueKind, ValueType};

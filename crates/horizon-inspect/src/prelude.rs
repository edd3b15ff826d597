//! Prelude module for Horizon Inspect.
//!
//! ```ignore
//! use horizon_inspect::prelude::*;
//! ```

// ============================================================================
// Reflection and data binding
// ============================================================================

pub use horizon_inspect_core::{
    Data, DataBinding, FieldFlags, FieldValue, Formatter, Instance, Merged, MetaClass, Reflect,
    Shared, UndoQueue, as_instance, share,
};
pub use horizon_inspect_macros::{Reflect, ReflectEnum};

// ============================================================================
// Control tree
// ============================================================================

pub use crate::canvas::Canvas;
pub use crate::config::CanvasConfig;
pub use crate::control::{Binding, ControlId, ControlKind, CustomControl, KindTag};
pub use crate::panel::PanelStates;
pub use crate::platform::{HeadlessBackend, WindowingBackend};

// ============================================================================
// Builders
// ============================================================================

pub use crate::interpreter::Interpreter;
pub use crate::reflect::{FieldContext, FieldInterpreter, ReflectInterpreter, ReflectOptions};
pub use crate::registry::InspectRegistry;
pub use crate::script::ScriptEngine;

//! Horizon Inspect - reflective property inspectors.
//!
//! Given one or more live objects of a reflected type, Horizon Inspect
//! synthesizes a tree of editable controls, keeps it synchronized with the
//! objects through data bindings and records every edit for undo. Authors
//! can replace the generated controls of a field or type with a small
//! attribute script.
//!
//! This is the umbrella crate: it re-exports the core data-binding and
//! reflection APIs alongside the control tree and the builders.
//!
//! # Example
//!
//! ```
//! use horizon_inspect::{Canvas, InspectRegistry, Interpreter, ReflectInterpreter};
//! use horizon_inspect_core::{as_instance, share};
//! use horizon_inspect_macros::Reflect;
//!
//! #[derive(Default, Reflect)]
//! struct Camera {
//!     #[field(default = "60")]
//!     fov: u32,
//!     orthographic: bool,
//! }
//!
//! let registry = InspectRegistry::with_defaults();
//! let (mut canvas, _log) = Canvas::headless();
//! let cameras = [as_instance(share(Camera::default())), as_instance(share(Camera::default()))];
//! {
//!     let mut interp = Interpreter::new(&mut canvas, &registry);
//!     ReflectInterpreter::default().interpret(&mut interp, &cameras);
//! }
//! canvas.realize(canvas.root());
//!
//! let fov = canvas.find_child(canvas.root(), "fov").unwrap();
//! assert!(canvas.edit(fov, "75"));
//! assert_eq!(canvas.text(fov), Some("75"));
//! ```

pub use horizon_inspect_core::*;
pub use horizon_inspect_macros::*;

pub mod canvas;
pub mod config;
pub mod control;
mod error;
pub mod interpreter;
pub mod panel;
pub mod platform;
pub mod prelude;
pub mod reflect;
pub mod registry;
pub mod script;
pub mod tree_debug;

pub use canvas::{Canvas, ControlChanging};
pub use config::{CanvasConfig, Metrics};
pub use control::{
    Attributes, Binding, ButtonAction, ChoiceItem, ChoiceState, ControlId, ControlKind, ControlNode,
    CustomControl, KindTag, ListState, PanelState, SliderState,
};
pub use error::{InspectError, Result, ScriptError};
pub use interpreter::{BuildStack, BuildStacks, Interpreter};
pub use panel::{Expansion, PanelStates};
pub use platform::{
    Color, HandleLog, HandleOp, HandleRequest, HeadlessBackend, PlatformHandle, RawHandle,
    WindowingBackend,
};
pub use reflect::{
    ContainerInterpreter, FieldContext, FieldInterpreter, FieldInterpreterFactory,
    FileContainerInterpreter, FileFilter, ReflectInterpreter, ReflectOptions, ValueInterpreter,
};
pub use registry::{InspectRegistry, KindFactory};
pub use script::{SCRIPT_BEGIN, SCRIPT_END, ScriptEngine, Statement};
pub use tree_debug::{ControlTreeDebug, TreeFormatOptions, TreeStyle};

//! Tree building.
//!
//! An [`Interpreter`] builds controls into a [`Canvas`] against a stack of
//! "current" containers: [`push`](Interpreter::push) a container, add
//! controls to the [`top`](Interpreter::top), [`pop`](Interpreter::pop) it.
//!
//! Each thread has its own stack, looked up in the registry's
//! [`BuildStacks`]. The map lock is held only to find or create a thread's
//! stack, never while building, so threads building independent canvases do
//! not contend. Interpreters nested on one thread share the thread's stack;
//! each only sees and pops the entries it pushed itself.
//!
//! ```
//! use horizon_inspect::{Canvas, InspectRegistry, Interpreter};
//!
//! let registry = InspectRegistry::with_defaults();
//! let (mut canvas, _log) = Canvas::headless();
//! {
//!     let mut interp = Interpreter::new(&mut canvas, &registry);
//!     interp.push_panel("Transform");
//!     interp.add_label("Position");
//!     interp.pop(true);
//! }
//! let panel = canvas.children(canvas.root())[0];
//! assert_eq!(canvas.title(panel), Some("Transform"));
//! assert_eq!(canvas.children(panel).len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use horizon_inspect_core::logging::targets;
use parking_lot::Mutex;

use crate::canvas::Canvas;
use crate::control::{Binding, ButtonAction, ControlId, ControlKind};
use crate::registry::InspectRegistry;

/// One thread's container stack.
pub type BuildStack = Arc<Mutex<Vec<ControlId>>>;

/// Map from building thread to its container stack.
#[derive(Debug, Default)]
pub struct BuildStacks {
    stacks: Mutex<HashMap<ThreadId, BuildStack>>,
}

impl BuildStacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The calling thread's stack, created on first use.
    pub fn current(&self) -> BuildStack {
        let mut stacks = self.stacks.lock();
        Arc::clone(stacks.entry(thread::current().id()).or_default())
    }

    /// Forget the calling thread's stack once nobody builds on it.
    fn release(&self, stack: &BuildStack) {
        let mut stacks = self.stacks.lock();
        // One reference held by the map, one by the caller.
        if Arc::strong_count(stack) <= 2 && stack.lock().is_empty() {
            stacks.remove(&thread::current().id());
        }
    }

    /// Number of threads with a live stack.
    pub fn active(&self) -> usize {
        self.stacks.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.stacks.lock().clear();
    }
}

/// Builder over one canvas.
pub struct Interpreter<'a> {
    canvas: &'a mut Canvas,
    registry: &'a InspectRegistry,
    stack: BuildStack,
    /// Stack depth when this interpreter was created.
    base_depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(canvas: &'a mut Canvas, registry: &'a InspectRegistry) -> Self {
        let stack = registry.build_stacks().current();
        let base_depth = stack.lock().len();
        Self {
            canvas,
            registry,
            stack,
            base_depth,
        }
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        &mut *self.canvas
    }

    pub fn canvas_ref(&self) -> &Canvas {
        &*self.canvas
    }

    pub fn registry(&self) -> &'a InspectRegistry {
        self.registry
    }

    /// Number of containers this interpreter has pushed and not popped.
    pub fn depth(&self) -> usize {
        self.stack.lock().len().saturating_sub(self.base_depth)
    }

    /// The container new controls are added to; the canvas root when
    /// nothing is pushed.
    pub fn top(&self) -> ControlId {
        let stack = self.stack.lock();
        if stack.len() > self.base_depth {
            stack[stack.len() - 1]
        } else {
            self.canvas.root()
        }
    }

    /// Make `container` the target of subsequent additions.
    ///
    /// # Panics
    ///
    /// Panics if `container` is not a container control.
    pub fn push(&mut self, container: ControlId) {
        let tag = self.canvas.kind(container);
        assert!(
            tag.is_some_and(|tag| tag.is_container()),
            "pushing a {} control as a build container",
            tag.map_or("destroyed", |tag| tag.name())
        );
        self.stack.lock().push(container);
    }

    /// Create a detached container and push it.
    pub fn push_container(&mut self, name: impl Into<String>) -> ControlId {
        let container = self.canvas.create(ControlKind::Container, name);
        self.push(container);
        container
    }

    /// Create a detached panel and push it.
    pub fn push_panel(&mut self, title: impl Into<String>) -> ControlId {
        let title = title.into();
        let panel = self.canvas.create(ControlKind::panel(title.clone()), title);
        self.push(panel);
        panel
    }

    /// Pop the top container. With `set_parent`, it is appended to the new
    /// top.
    ///
    /// Returns `None`, and logs, if this interpreter has nothing pushed.
    pub fn pop(&mut self, set_parent: bool) -> Option<ControlId> {
        let popped = {
            let mut stack = self.stack.lock();
            if stack.len() <= self.base_depth {
                None
            } else {
                stack.pop()
            }
        };
        let Some(popped) = popped else {
            tracing::warn!(target: targets::INTERPRETER, "pop without matching push");
            return None;
        };
        if set_parent {
            let parent = self.top();
            self.canvas.add_child(parent, popped);
        }
        Some(popped)
    }

    /// Append a control to the top container.
    pub fn add(&mut self, control: ControlId) -> ControlId {
        let parent = self.top();
        self.canvas.add_child(parent, control);
        control
    }

    /// Create a control, bind it and append it to the top container.
    pub fn add_kind(&mut self, kind: ControlKind, name: impl Into<String>, binding: Option<Binding>) -> ControlId {
        let control = self.canvas.create(kind, name);
        if let Some(binding) = binding {
            self.canvas.bind(control, binding);
        }
        self.add(control)
    }

    /// Add a static label.
    pub fn add_label(&mut self, text: impl Into<String>) -> ControlId {
        let text = text.into();
        let label = self.canvas.create(ControlKind::Label, text.clone());
        self.canvas.set_visual_text(label, text);
        self.add(label)
    }

    pub fn add_value(&mut self, name: impl Into<String>, binding: Option<Binding>) -> ControlId {
        self.add_kind(ControlKind::Value, name, binding)
    }

    pub fn add_check_box(&mut self, name: impl Into<String>, binding: Option<Binding>) -> ControlId {
        self.add_kind(ControlKind::CheckBox, name, binding)
    }

    /// Add a choice over `(label, data)` items.
    pub fn add_choice(
        &mut self,
        name: impl Into<String>,
        items: &[(&str, &str)],
        binding: Option<Binding>,
    ) -> ControlId {
        let choice = self.canvas.create(ControlKind::choice(), name);
        for (label, data) in items {
            self.canvas.add_choice_item(choice, *label, *data);
        }
        if let Some(binding) = binding {
            self.canvas.bind(choice, binding);
        }
        self.add(choice)
    }

    pub fn add_list(&mut self, name: impl Into<String>, binding: Option<Binding>) -> ControlId {
        self.add_kind(ControlKind::list(), name, binding)
    }

    pub fn add_slider(&mut self, name: impl Into<String>, min: f64, max: f64, binding: Option<Binding>) -> ControlId {
        self.add_kind(ControlKind::slider(min, max), name, binding)
    }

    /// Add a button labelled `text` running `action` when clicked.
    pub fn add_button(&mut self, text: impl Into<String>, action: Option<ButtonAction>) -> ControlId {
        let text = text.into();
        let button = self.canvas.create(ControlKind::button(), text.clone());
        self.canvas.set_visual_text(button, text);
        if let Some(action) = action {
            self.canvas.add_action(button, action);
        }
        self.add(button)
    }
}

impl Drop for Interpreter<'_> {
    fn drop(&mut self) {
        {
            let mut stack = self.stack.lock();
            if stack.len() > self.base_depth {
                tracing::warn!(
                    target: targets::INTERPRETER,
                    unpopped = stack.len() - self.base_depth,
                    "interpreter dropped with containers still pushed"
                );
                stack.truncate(self.base_depth);
            }
        }
        self.registry.build_stacks().release(&self.stack);
    }
}

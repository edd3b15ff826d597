//! The control tree.
//!
//! A [`Canvas`] owns every control of one tree in a slot map arena and is the
//! only way to create them. Controls go through a fixed lifecycle:
//!
//! 1. [`create`](Canvas::create) a detached control and
//!    [`add_child`](Canvas::add_child) it to a container
//! 2. optionally [`bind`](Canvas::bind) it to data and
//!    [`process`](Canvas::process) static attributes
//! 3. [`realize`](Canvas::realize) it, which allocates its platform handle
//!    and performs the first [`read`](Canvas::read)
//! 4. any number of [`read`](Canvas::read) and [`write`](Canvas::write)
//!    cycles
//! 5. [`unrealize`](Canvas::unrealize) it (it may be realized again) and
//!    finally [`destroy`](Canvas::destroy) it
//!
//! # Change propagation
//!
//! A bound control listens to its data's `changed` signal. Notifications are
//! queued and applied by [`dispatch_data_changes`](Canvas::dispatch_data_changes),
//! which the canvas also calls at the end of every write. While a control is
//! writing, notifications addressed to it are dropped so it never re-reads
//! its own write.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_inspect::{Binding, Canvas, ControlKind};
//! use horizon_inspect_core::{Data, Formatter, Property};
//!
//! let (mut canvas, _log) = Canvas::headless();
//! let cell = Arc::new(Property::new(String::from("cube")));
//! let data: Arc<dyn Data<String>> = Arc::new(Formatter::from_properties(vec![cell.clone()]));
//!
//! let value = canvas.create(ControlKind::Value, "name");
//! canvas.add_child(canvas.root(), value);
//! canvas.bind(value, Binding::text(data));
//! canvas.realize(canvas.root());
//! assert_eq!(canvas.text(value), Some("cube"));
//!
//! assert!(canvas.edit(value, "sphere"));
//! assert_eq!(cell.get(), "sphere");
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use horizon_inspect_core::logging::targets;
use horizon_inspect_core::{
    DataChanged, EmitterId, FieldValue, MULTI_VALUE, Signal, ThreadAffinity, UndoCommand,
    UndoQueue, VetoSignal,
};
use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::config::{CanvasConfig, Metrics};
use crate::control::{
    Binding, ButtonAction, ChoiceItem, ControlId, ControlKind, ControlNode, Inherited, KindTag,
};
use crate::panel::{Expansion, PanelStates, join_path};
use crate::platform::{Color, HandleLog, HandleRequest, HeadlessBackend, RawHandle, WindowingBackend};

/// Payload of [`Canvas::control_changing`].
#[derive(Debug, Clone, PartialEq)]
pub struct ControlChanging {
    /// The control about to write.
    pub control: ControlId,
    /// The text it is about to write.
    pub text: String,
}

type PendingQueue = Arc<Mutex<VecDeque<(ControlId, Option<EmitterId>)>>>;

/// Root of a control tree and owner of all its controls.
pub struct Canvas {
    nodes: SlotMap<ControlId, ControlNode>,
    root: ControlId,
    config: CanvasConfig,
    panel_states: PanelStates,
    backend: Box<dyn WindowingBackend>,
    /// Native parent of the root's handle.
    host: Option<RawHandle>,
    pending: PendingQueue,
    undo: Option<UndoQueue>,
    affinity: ThreadAffinity,
    control_changing: VetoSignal<ControlChanging>,
    control_changed: Signal<ControlId>,
    control_realized: Signal<ControlId>,
    control_unrealized: Signal<ControlId>,
}

static_assertions::assert_impl_all!(Canvas: Send);

impl Canvas {
    /// Create an empty canvas drawing through `backend`.
    pub fn new(config: CanvasConfig, backend: impl WindowingBackend + 'static) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(ControlNode::new(ControlKind::Canvas, "canvas".to_string()));
        Self {
            nodes,
            root,
            config,
            panel_states: PanelStates::new(),
            backend: Box::new(backend),
            host: None,
            pending: Arc::new(Mutex::new(VecDeque::new())),
            undo: None,
            affinity: ThreadAffinity::current(),
            control_changing: VetoSignal::new(),
            control_changed: Signal::new(),
            control_realized: Signal::new(),
            control_unrealized: Signal::new(),
        }
    }

    /// A canvas with default configuration over a [`HeadlessBackend`].
    pub fn headless() -> (Self, HandleLog) {
        let backend = HeadlessBackend::new();
        let log = backend.log();
        (Self::new(CanvasConfig::default(), backend), log)
    }

    /// The root control.
    pub fn root(&self) -> ControlId {
        self.root
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Shared layout metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.config.metrics
    }

    /// Persisted panel expansion, keyed by panel path.
    pub fn panel_states(&self) -> &PanelStates {
        &self.panel_states
    }

    pub fn panel_states_mut(&mut self) -> &mut PanelStates {
        &mut self.panel_states
    }

    /// Replace the persisted panel states. Realized panels keep their state
    /// until realized again.
    pub fn set_panel_states(&mut self, states: PanelStates) {
        self.panel_states = states;
    }

    /// Set the native parent of the root's handle.
    pub fn set_host_handle(&mut self, host: Option<RawHandle>) {
        self.host = host;
    }

    /// Take ownership on the calling thread after the canvas was moved.
    pub fn rebind_thread(&mut self) {
        self.affinity.rebind();
    }

    /// Vetoable notification raised before a control writes its binding.
    pub fn control_changing(&self) -> &VetoSignal<ControlChanging> {
        &self.control_changing
    }

    /// Raised after a control wrote its binding.
    pub fn control_changed(&self) -> &Signal<ControlId> {
        &self.control_changed
    }

    /// Raised after a control was realized.
    pub fn control_realized(&self) -> &Signal<ControlId> {
        &self.control_realized
    }

    /// Raised after a control was unrealized.
    pub fn control_unrealized(&self) -> &Signal<ControlId> {
        &self.control_unrealized
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    /// Create a detached control.
    pub fn create(&mut self, kind: ControlKind, name: impl Into<String>) -> ControlId {
        let name = name.into();
        let tag = kind.tag();
        let id = self.nodes.insert(ControlNode::new(kind, name));
        tracing::trace!(target: targets::CANVAS, ?id, kind = tag.name(), "control created");
        id
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of controls, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ControlId) -> Option<&ControlNode> {
        self.nodes.get(id)
    }

    pub fn kind(&self, id: ControlId) -> Option<KindTag> {
        self.nodes.get(id).map(ControlNode::tag)
    }

    pub fn name(&self, id: ControlId) -> Option<&str> {
        self.nodes.get(id).map(ControlNode::name)
    }

    pub fn set_name(&mut self, id: ControlId, name: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.name = name.into();
        }
    }

    /// Visual state of a control in text form.
    pub fn text(&self, id: ControlId) -> Option<&str> {
        self.nodes.get(id).map(ControlNode::text)
    }

    pub fn parent(&self, id: ControlId) -> Option<ControlId> {
        self.nodes.get(id).and_then(ControlNode::parent)
    }

    pub fn children(&self, id: ControlId) -> &[ControlId] {
        self.nodes.get(id).map(ControlNode::children).unwrap_or(&[])
    }

    /// `id` and every descendant, parents before children.
    pub fn descendants(&self, id: ControlId) -> Vec<ControlId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: ControlId, id: ControlId) -> bool {
        std::iter::successors(Some(id), |&current| self.parent(current)).any(|current| current == ancestor)
    }

    /// Append a detached or re-parented control to `parent`.
    ///
    /// The child takes on the parent's disabled, read-only, hidden and frozen
    /// state until it is detached again, and is realized if the parent is.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a container or if the move would create a
    /// cycle.
    pub fn add_child(&mut self, parent: ControlId, child: ControlId) {
        self.insert_child(parent, usize::MAX, child);
    }

    /// Insert a control at `index` among `parent`'s children.
    pub fn insert_child(&mut self, parent: ControlId, index: usize, child: ControlId) {
        self.affinity.debug_assert_same_thread();
        let tag = self.nodes[parent].tag();
        assert!(tag.is_container(), "cannot add children to a {} control", tag.name());
        assert!(child != self.root, "the canvas root cannot be re-parented");
        assert!(
            !self.is_ancestor(child, parent),
            "adding a control to its own subtree"
        );

        if self.nodes[child].parent.is_some() {
            self.detach(child);
        }

        let restrictions = self.nodes[parent].attributes.clone();
        for id in self.descendants(child) {
            let node = &mut self.nodes[id];
            if let Some(inherited) = Inherited::apply(child, &restrictions, &mut node.attributes) {
                node.inherited.push(inherited);
            }
        }

        let siblings = &mut self.nodes[parent].children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.nodes[child].parent = Some(parent);

        if self.nodes[parent].realized {
            self.realize(child);
        }
    }

    /// Remove a control from its parent without destroying it.
    ///
    /// The control is unrealized; it keeps its binding. Restrictions it took
    /// from the old parent when it was added are dropped again.
    pub fn detach(&mut self, id: ControlId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.unrealize(id);
        self.nodes[parent].children.retain(|&child| child != id);
        self.nodes[id].parent = None;

        for current in self.descendants(id) {
            let node = &mut self.nodes[current];
            if let Some(index) = node.inherited.iter().position(|inherited| inherited.via == id) {
                let inherited = node.inherited.remove(index);
                inherited.revert(&mut node.attributes);
            }
        }
    }

    /// Destroy `child` if it is a child of `parent`.
    pub fn remove_child(&mut self, parent: ControlId, child: ControlId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.destroy(child);
        true
    }

    /// Unrealize, unbind and free a control and its subtree.
    ///
    /// The root cannot be destroyed; use [`clear`](Self::clear).
    pub fn destroy(&mut self, id: ControlId) -> bool {
        if id == self.root || !self.nodes.contains_key(id) {
            return false;
        }
        self.detach(id);
        self.unrealize(id);
        for current in self.descendants(id) {
            self.unbind(current);
            self.nodes.remove(current);
        }
        tracing::trace!(target: targets::CANVAS, ?id, "control destroyed");
        true
    }

    /// Destroy every child of `container`.
    pub fn clear(&mut self, container: ControlId) {
        let children = self.children(container).to_vec();
        for child in children {
            self.destroy(child);
        }
    }

    /// Find a control named `name` below `container`.
    ///
    /// Direct children are searched before nested containers; every nested
    /// container is searched.
    pub fn find_child(&self, container: ControlId, name: &str) -> Option<ControlId> {
        let children = self.children(container);
        if let Some(&found) = children.iter().find(|&&child| self.nodes[child].name == name) {
            return Some(found);
        }
        children
            .iter()
            .filter(|&&child| self.nodes[child].tag().is_container())
            .find_map(|&child| self.find_child(child, name))
    }

    // =========================================================================
    // Binding and data flow
    // =========================================================================

    /// Bind a control to data, replacing any previous binding.
    ///
    /// # Panics
    ///
    /// Standard controls edit text and panic when given a typed binding.
    pub fn bind(&mut self, id: ControlId, binding: Binding) {
        self.unbind(id);
        let node = &mut self.nodes[id];
        if matches!(binding, Binding::Typed(_)) && node.tag() != KindTag::Custom {
            panic!(
                "{} control '{}' needs a text binding, got {:?}",
                node.tag().name(),
                node.name,
                binding
            );
        }

        let pending = Arc::clone(&self.pending);
        let connection = binding.erased().changed().connect(move |args: &DataChanged| {
            pending.lock().push_back((id, args.emitter));
        });
        node.connection = Some(connection);
        node.binding = Some(binding);
        let realized = node.realized;

        if realized {
            self.read_node(id);
        }
    }

    /// Drop a control's binding.
    pub fn unbind(&mut self, id: ControlId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if let (Some(binding), Some(connection)) = (node.binding.take(), node.connection.take()) {
            binding.erased().changed().disconnect(connection);
        }
    }

    /// Pull bound values into `id` and its subtree.
    ///
    /// Safe to call any number of times.
    pub fn read(&mut self, id: ControlId) {
        for current in self.descendants(id) {
            self.read_node(current);
        }
    }

    fn read_node(&mut self, id: ControlId) {
        let delimiter = self.config.item_delimiter;
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.writing {
            return;
        }
        let text = match (&mut node.kind, node.binding.as_ref()) {
            (_, None) => return,
            (ControlKind::Custom(custom), Some(binding)) => custom.read(binding),
            (_, Some(Binding::Text(data))) => Some(data.get().to_text()),
            (_, Some(Binding::Typed(_))) => None,
        };
        if let Some(text) = text {
            node.apply_text(text, delimiter);
            node.show();
        }
    }

    /// Push the visual state of `id` into its binding.
    ///
    /// Returns `false`, without effect, when the control is unbound or read
    /// only. Returns `false` after re-reading when the change is vetoed or no
    /// target accepts it.
    ///
    /// # Panics
    ///
    /// Panics when a custom control is written without a binding.
    pub fn write(&mut self, id: ControlId) -> bool {
        self.affinity.debug_assert_same_thread();
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let Some(binding) = node.binding.clone() else {
            assert!(
                node.tag() != KindTag::Custom,
                "custom control '{}' written without a binding",
                node.name
            );
            return false;
        };
        if node.attributes.read_only {
            return false;
        }

        let text = node.text.clone();
        if let Binding::Text(data) = &binding
            && node.tag() != KindTag::Custom
        {
            let current = data.get();
            if current.value() == Some(&text) || (current.is_multi() && text == MULTI_VALUE) {
                return true;
            }
        }

        let changing = ControlChanging {
            control: id,
            text: text.clone(),
        };
        if !self.control_changing.emit(&changing) {
            tracing::debug!(target: targets::CANVAS, ?id, "write vetoed by canvas listener");
            self.read_node(id);
            return false;
        }

        let command: Option<Box<dyn UndoCommand>> =
            self.undo.is_some().then(|| binding.erased().undo_command());
        let emitter = id.emitter();

        let node = &mut self.nodes[id];
        node.writing = true;
        let accepted = match (&mut node.kind, &binding) {
            (ControlKind::Custom(custom), binding) => custom.write(binding, emitter),
            (_, Binding::Text(data)) => data.set(text, Some(emitter)),
            (_, Binding::Typed(_)) => false,
        };
        self.dispatch_data_changes();
        self.nodes[id].writing = false;

        if !accepted {
            tracing::debug!(target: targets::CANVAS, ?id, "write rejected, re-reading");
            self.read_node(id);
            return false;
        }

        self.control_changed.emit(id);
        if let (Some(queue), Some(command)) = (self.undo.as_mut(), command) {
            queue.push(command);
        }
        true
    }

    /// Set the visual state of a control and write it.
    pub fn edit(&mut self, id: ControlId, text: impl Into<String>) -> bool {
        if !self.set_visual_text(id, text) {
            return false;
        }
        self.write(id)
    }

    /// Set the visual state of a control without writing it.
    pub fn set_visual_text(&mut self, id: ControlId, text: impl Into<String>) -> bool {
        let delimiter = self.config.item_delimiter;
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.apply_text(text.into(), delimiter);
        node.show();
        true
    }

    /// Apply queued data notifications. Returns the number of controls read.
    pub fn dispatch_data_changes(&mut self) -> usize {
        let mut count = 0;
        loop {
            let next = self.pending.lock().pop_front();
            let Some((id, emitter)) = next else {
                break;
            };
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if node.writing || emitter == Some(id.emitter()) {
                continue;
            }
            self.read_node(id);
            count += 1;
        }
        count
    }

    /// Number of queued data notifications.
    pub fn pending_changes(&self) -> usize {
        self.pending.lock().len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Allocate platform handles for `id` and its subtree, parents first.
    ///
    /// Already realized controls are skipped, so realizing twice only
    /// reaches descendants added since. Each newly realized control applies
    /// its attributes and reads its binding.
    ///
    /// # Panics
    ///
    /// Panics if the backend supplies no handle for a leaf control.
    #[tracing::instrument(skip_all, target = "horizon_inspect::canvas", level = "trace")]
    pub fn realize(&mut self, id: ControlId) {
        self.affinity.debug_assert_same_thread();
        let parent_handle = self.ancestor_handle(id);
        self.realize_node(id, parent_handle);
    }

    fn ancestor_handle(&self, id: ControlId) -> Option<RawHandle> {
        std::iter::successors(self.parent(id), |&current| self.parent(current))
            .find_map(|ancestor| self.nodes[ancestor].raw_handle())
            .or(self.host)
    }

    fn realize_node(&mut self, id: ControlId, parent_handle: Option<RawHandle>) {
        if !self.nodes[id].realized {
            let metrics = &self.config.metrics;
            let node = &self.nodes[id];
            let request = HandleRequest {
                kind: node.tag(),
                name: &node.name,
                parent: parent_handle,
                width: node.attributes.width.unwrap_or(metrics.standard_width),
                height: node.attributes.height.unwrap_or(metrics.standard_height),
            };
            let handle = self.backend.create_handle(&request);
            if handle.is_none() && !node.tag().is_container() {
                panic!(
                    "windowing backend supplied no handle for {} control '{}'",
                    node.tag().name(),
                    node.name
                );
            }

            let expanded = self.restored_expansion(id);
            let node = &mut self.nodes[id];
            node.handle = handle;
            node.realized = true;
            if let (ControlKind::Panel(panel), Some(expanded)) = (&mut node.kind, expanded) {
                panel.expanded = expanded;
            }
            node.apply_attributes();
            node.show();
            tracing::trace!(target: targets::CANVAS, ?id, name = %node.name, "control realized");
            self.control_realized.emit(id);
            self.read_node(id);
        }

        let own = self.nodes[id].raw_handle().or(parent_handle);
        let children = self.nodes[id].children.clone();
        for child in children {
            self.realize_node(child, own);
        }
    }

    /// Persisted expansion of a panel, else its default.
    fn restored_expansion(&self, id: ControlId) -> Option<bool> {
        let ControlKind::Panel(panel) = &self.nodes[id].kind else {
            return None;
        };
        let path = self.panel_path(id)?;
        Some(match self.panel_states.get(&path) {
            Some(state) => state.is_expanded(),
            None => panel
                .default_expanded
                .unwrap_or(self.config.panels_expanded_by_default),
        })
    }

    /// Release the platform handles of `id` and its subtree, children first.
    pub fn unrealize(&mut self, id: ControlId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for child in node.children.clone() {
            self.unrealize(child);
        }
        let node = &mut self.nodes[id];
        if !node.realized {
            return;
        }
        node.realized = false;
        if let Some(handle) = node.handle.take() {
            self.backend.release_handle(handle);
        }
        tracing::trace!(target: targets::CANVAS, ?id, "control unrealized");
        self.control_unrealized.emit(id);
    }

    pub fn is_realized(&self, id: ControlId) -> bool {
        self.nodes.get(id).is_some_and(ControlNode::is_realized)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn for_subtree(&mut self, id: ControlId, mut f: impl FnMut(&mut ControlNode)) {
        for current in self.descendants(id) {
            f(&mut self.nodes[current]);
        }
    }

    /// Enable or disable a control and its subtree.
    pub fn set_enabled(&mut self, id: ControlId, enabled: bool) {
        self.for_subtree(id, |node| {
            node.attributes.enabled = enabled;
            if let Some(handle) = node.handle.as_mut() {
                handle.set_enabled(enabled);
            }
        });
    }

    /// Make a control and its subtree read only, or editable.
    pub fn set_read_only(&mut self, id: ControlId, read_only: bool) {
        self.for_subtree(id, |node| {
            node.attributes.read_only = read_only;
            if let Some(handle) = node.handle.as_mut() {
                handle.set_read_only(read_only);
            }
        });
    }

    /// Hide or show a control and its subtree.
    pub fn set_hidden(&mut self, id: ControlId, hidden: bool) {
        self.for_subtree(id, |node| {
            node.attributes.hidden = hidden;
            if let Some(handle) = node.handle.as_mut() {
                handle.set_visible(!hidden);
            }
        });
    }

    /// Switch the "value equals default" appearance of a control and its
    /// subtree.
    pub fn set_default_appearance(&mut self, id: ControlId, default: bool) {
        self.for_subtree(id, |node| node.attributes.default_appearance = default);
    }

    /// Suspend redrawing of a control and its subtree.
    ///
    /// Calls nest; each must be paired with a [`thaw`](Self::thaw).
    pub fn freeze(&mut self, id: ControlId) {
        self.for_subtree(id, |node| {
            node.attributes.frozen += 1;
            if node.attributes.frozen == 1
                && let Some(handle) = node.handle.as_mut()
            {
                handle.set_redraw(false);
            }
        });
    }

    /// Undo one [`freeze`](Self::freeze).
    pub fn thaw(&mut self, id: ControlId) {
        self.for_subtree(id, |node| {
            if node.attributes.frozen == 0 {
                tracing::warn!(target: targets::CANVAS, name = %node.name, "thaw without freeze");
                return;
            }
            node.attributes.frozen -= 1;
            if node.attributes.frozen == 0
                && let Some(handle) = node.handle.as_mut()
            {
                handle.set_redraw(true);
            }
        });
    }

    pub fn is_frozen(&self, id: ControlId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.attributes.frozen > 0)
    }

    /// Set the tooltip text.
    pub fn set_help(&mut self, id: ControlId, help: Option<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            if let Some(handle) = node.handle.as_mut() {
                handle.set_tooltip(help.as_deref());
            }
            node.attributes.help = help;
        }
    }

    pub fn set_foreground(&mut self, id: ControlId, color: Option<Color>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.foreground = color;
            if let Some(handle) = node.handle.as_mut() {
                handle.set_foreground(color);
            }
        }
    }

    pub fn set_background(&mut self, id: ControlId, color: Option<Color>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.background = color;
            if let Some(handle) = node.handle.as_mut() {
                handle.set_background(color);
            }
        }
    }

    pub fn set_drop_target(&mut self, id: ControlId, accept: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.drop_target = accept;
            if let Some(handle) = node.handle.as_mut() {
                handle.set_drop_target(accept);
            }
        }
    }

    /// Fix the size requested at realize time. `None` uses the standard metric.
    pub fn set_size(&mut self, id: ControlId, width: Option<u32>, height: Option<u32>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.width = width;
            node.attributes.height = height;
        }
    }

    /// Store a free-form string property.
    pub fn set_property(&mut self, id: ControlId, key: impl Into<String>, value: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.properties.insert(key.into(), value.into());
        }
    }

    pub fn property(&self, id: ControlId, key: &str) -> Option<&str> {
        self.nodes
            .get(id)
            .and_then(|node| node.attributes.properties.get(key))
            .map(String::as_str)
    }

    // =========================================================================
    // Panels
    // =========================================================================

    /// The persistence key of a panel: its panel ancestors' titles and its
    /// own, outermost first.
    pub fn panel_path(&self, id: ControlId) -> Option<String> {
        if self.kind(id) != Some(KindTag::Panel) {
            return None;
        }
        let mut titles: Vec<&str> = std::iter::successors(Some(id), |&current| self.parent(current))
            .filter_map(|current| match &self.nodes[current].kind {
                ControlKind::Panel(panel) => Some(panel.title.as_str()),
                _ => None,
            })
            .collect();
        titles.reverse();
        Some(join_path(titles))
    }

    /// Expand or collapse a panel. Returns the state applied.
    ///
    /// Without `force`, a persisted state for the panel's path wins over
    /// `expanded`. With `force`, `expanded` is applied and persisted.
    pub fn set_expanded(&mut self, id: ControlId, expanded: bool, force: bool) -> Option<bool> {
        let path = self.panel_path(id)?;
        let state = if force {
            self.panel_states.set(path, Expansion::from_expanded(expanded));
            expanded
        } else {
            self.panel_states
                .get(&path)
                .map_or(expanded, Expansion::is_expanded)
        };

        let node = &mut self.nodes[id];
        if let ControlKind::Panel(panel) = &mut node.kind {
            panel.expanded = state;
        }
        if let Some(handle) = node.handle.as_mut() {
            handle.set_expanded(state);
        }
        Some(state)
    }

    /// Flip a panel as a user would, persisting the result.
    pub fn toggle_expanded(&mut self, id: ControlId) -> Option<bool> {
        let expanded = self.is_expanded(id)?;
        self.set_expanded(id, !expanded, true)
    }

    pub fn is_expanded(&self, id: ControlId) -> Option<bool> {
        match &self.nodes.get(id)?.kind {
            ControlKind::Panel(panel) => Some(panel.expanded),
            _ => None,
        }
    }

    /// Expansion used for a panel with no persisted state.
    pub fn set_default_expanded(&mut self, id: ControlId, expanded: bool) {
        if let Some(ControlKind::Panel(panel)) = self.nodes.get_mut(id).map(|node| &mut node.kind) {
            panel.default_expanded = Some(expanded);
        }
    }

    pub fn set_title(&mut self, id: ControlId, title: impl Into<String>) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if let ControlKind::Panel(panel) = &mut node.kind {
            panel.title = title.into();
            node.show();
        }
    }

    pub fn title(&self, id: ControlId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            ControlKind::Panel(panel) => Some(&panel.title),
            _ => None,
        }
    }

    // =========================================================================
    // Item controls
    // =========================================================================

    /// Append an item to a choice.
    pub fn add_choice_item(&mut self, id: ControlId, label: impl Into<String>, data: impl Into<String>) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let ControlKind::Choice(choice) = &mut node.kind else {
            return false;
        };
        choice.push(ChoiceItem::new(label, data));
        let text = std::mem::take(&mut node.text);
        node.apply_text(text, self.config.item_delimiter);
        node.show();
        true
    }

    /// Select a choice item by index and write it.
    pub fn choose(&mut self, id: ControlId, index: usize) -> bool {
        let value = match self.nodes.get(id).map(|node| &node.kind) {
            Some(ControlKind::Choice(choice)) => match choice.items.get(index) {
                Some(item) => item.value().to_string(),
                None => return false,
            },
            _ => return false,
        };
        self.edit(id, value)
    }

    /// Sort the items of a choice or list.
    pub fn set_sorted(&mut self, id: ControlId, sorted: bool) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        match &mut node.kind {
            ControlKind::Choice(choice) => {
                choice.sorted = sorted;
                if sorted {
                    choice.items.sort_by(|a, b| a.label.cmp(&b.label));
                }
            }
            ControlKind::List(list) => {
                list.sorted = sorted;
                if sorted {
                    list.items.sort();
                }
            }
            _ => return,
        }
        node.show();
    }

    /// Items of a list.
    pub fn list_items(&self, id: ControlId) -> Vec<String> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(ControlKind::List(list)) => list.items.clone(),
            _ => Vec::new(),
        }
    }

    /// Selected item of a choice or list.
    pub fn selection(&self, id: ControlId) -> Option<usize> {
        match &self.nodes.get(id)?.kind {
            ControlKind::Choice(choice) => choice.selected,
            ControlKind::List(list) => list.selected,
            _ => None,
        }
    }

    /// Select a list item.
    pub fn select(&mut self, id: ControlId, index: Option<usize>) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if let ControlKind::List(list) = &mut node.kind {
            list.selected = index.filter(|&i| i < list.items.len());
            node.show();
        }
    }

    /// Replace the items of a list, updating its visual text. Not written.
    pub fn set_list_items(&mut self, id: ControlId, items: Vec<String>) {
        let default_delimiter = self.config.item_delimiter;
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let ControlKind::List(list) = &mut node.kind else {
            return;
        };
        let delimiter = list.delimiter.unwrap_or(default_delimiter);
        let mut items = items;
        if list.sorted {
            items.sort();
        }
        let text = items.join(&delimiter.to_string());
        node.apply_text(text, default_delimiter);
        node.show();
    }

    /// Move the selected list item one place up or down and write the list.
    pub fn move_selected(&mut self, id: ControlId, up: bool) -> bool {
        let (mut items, selected) = match self.nodes.get(id).map(|node| &node.kind) {
            Some(ControlKind::List(list)) => (list.items.clone(), list.selected),
            _ => return false,
        };
        let Some(index) = selected else {
            return false;
        };
        let target = if up { index.checked_sub(1) } else { Some(index + 1) };
        let Some(target) = target.filter(|&t| t < items.len()) else {
            return false;
        };
        items.swap(index, target);
        self.set_list_items(id, items);
        self.select(id, Some(target));
        self.write(id)
    }

    /// Set the range of a slider.
    pub fn set_range(&mut self, id: ControlId, min: f64, max: f64) {
        if let Some(ControlKind::Slider(slider)) = self.nodes.get_mut(id).map(|node| &mut node.kind) {
            slider.min = min.min(max);
            slider.max = max.max(min);
        }
    }

    /// Add an action run when a button is clicked.
    pub fn add_action(&mut self, id: ControlId, action: ButtonAction) -> bool {
        match self.nodes.get_mut(id).map(|node| &mut node.kind) {
            Some(ControlKind::Button(actions)) => {
                actions.push(action);
                true
            }
            _ => false,
        }
    }

    /// Run a button's actions. Disabled buttons do nothing.
    pub fn click(&mut self, id: ControlId) -> bool {
        let actions = match self.nodes.get(id) {
            Some(node) if node.attributes.enabled => match &node.kind {
                ControlKind::Button(actions) => actions.clone(),
                _ => return false,
            },
            _ => return false,
        };
        for action in actions {
            action(self, id);
        }
        true
    }

    // =========================================================================
    // Defaults and static attributes
    // =========================================================================

    /// Record the default value of a control in text form.
    pub fn set_default_value(&mut self, id: ControlId, default: Option<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.default_appearance = default.as_deref() == Some(node.text.as_str());
            node.default = default;
        }
    }

    /// Write the recorded default value. `false` if none is recorded.
    pub fn reset_to_default(&mut self, id: ControlId) -> bool {
        let Some(default) = self.nodes.get(id).and_then(|node| node.default.clone()) else {
            return false;
        };
        self.edit(id, default)
    }

    /// Apply one static attribute, as given by an attribute script.
    ///
    /// The control's kind handles the key first, then the attributes every
    /// control shares. Keys nobody recognizes are stored as string
    /// properties. Returns `false` if the value could not be parsed.
    pub fn process(&mut self, id: ControlId, key: &str, value: &str) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        if let Some(handled) = self.process_kind(id, key, value) {
            return handled;
        }
        match self.process_common(id, key, value) {
            Some(handled) => handled,
            None => {
                self.set_property(id, key, value);
                true
            }
        }
    }

    /// `None` when the kind does not handle `key`.
    fn process_kind(&mut self, id: ControlId, key: &str, value: &str) -> Option<bool> {
        let tag = self.nodes[id].tag();
        if let ControlKind::Custom(custom) = &mut self.nodes[id].kind
            && custom.process(key, value)
        {
            return Some(true);
        }

        match (tag, key) {
            (KindTag::Label | KindTag::Value | KindTag::CheckBox | KindTag::Button | KindTag::Slider, "text") => {
                Some(self.set_visual_text(id, value))
            }
            (KindTag::Choice, "item") => {
                let (label, data) = value.split_once(',').unwrap_or((value, ""));
                Some(self.add_choice_item(id, label.trim(), data.trim()))
            }
            (KindTag::Choice, "dropdown") => {
                let Some(drop_down) = parse_bool(key, value) else {
                    return Some(false);
                };
                if let ControlKind::Choice(choice) = &mut self.nodes[id].kind {
                    choice.drop_down = drop_down;
                }
                Some(true)
            }
            (KindTag::Choice | KindTag::List, "sorted") => {
                let Some(sorted) = parse_bool(key, value) else {
                    return Some(false);
                };
                self.set_sorted(id, sorted);
                Some(true)
            }
            (KindTag::List, "delimiter") => {
                let Some(delimiter) = value.chars().next() else {
                    return Some(invalid(key, value));
                };
                if let ControlKind::List(list) = &mut self.nodes[id].kind {
                    list.delimiter = Some(delimiter);
                }
                Some(true)
            }
            (KindTag::Slider, "min" | "max") => {
                let Ok(bound) = value.trim().parse::<f64>() else {
                    return Some(invalid(key, value));
                };
                if let ControlKind::Slider(slider) = &mut self.nodes[id].kind {
                    if key == "min" {
                        slider.min = bound;
                    } else {
                        slider.max = bound;
                    }
                }
                Some(true)
            }
            (KindTag::Panel, "title" | "text") => {
                self.set_title(id, value);
                Some(true)
            }
            (KindTag::Panel, "expanded") => {
                let Some(expanded) = parse_bool(key, value) else {
                    return Some(false);
                };
                self.set_default_expanded(id, expanded);
                Some(true)
            }
            _ => None,
        }
    }

    fn process_common(&mut self, id: ControlId, key: &str, value: &str) -> Option<bool> {
        match key {
            "name" => self.set_name(id, value),
            "help" => self.set_help(id, Some(value.to_string())),
            "enabled" | "readonly" | "hidden" => {
                let Some(flag) = parse_bool(key, value) else {
                    return Some(false);
                };
                match key {
                    "enabled" => self.set_enabled(id, flag),
                    "readonly" => self.set_read_only(id, flag),
                    _ => self.set_hidden(id, flag),
                }
            }
            "width" | "height" => {
                let Ok(size) = value.trim().parse::<u32>() else {
                    return Some(invalid(key, value));
                };
                let attributes = &self.nodes[id].attributes;
                let (width, height) = if key == "width" {
                    (Some(size), attributes.height)
                } else {
                    (attributes.width, Some(size))
                };
                self.set_size(id, width, height);
            }
            "foreground" | "background" => {
                let Some(color) = Color::parse(value) else {
                    return Some(invalid(key, value));
                };
                if key == "foreground" {
                    self.set_foreground(id, Some(color));
                } else {
                    self.set_background(id, Some(color));
                }
            }
            "default" => self.set_default_value(id, Some(value.to_string())),
            _ => return None,
        }
        Some(true)
    }

    // =========================================================================
    // Undo
    // =========================================================================

    /// Record every successful write in `queue`.
    pub fn attach_undo(&mut self, queue: UndoQueue) {
        self.undo = Some(queue);
    }

    /// Record writes in a queue sized by the configured undo limit.
    pub fn enable_undo(&mut self) {
        self.attach_undo(UndoQueue::new(self.config.undo_limit));
    }

    pub fn detach_undo(&mut self) -> Option<UndoQueue> {
        self.undo.take()
    }

    pub fn undo_queue(&self) -> Option<&UndoQueue> {
        self.undo.as_ref()
    }

    /// Undo the most recent significant write and refresh affected controls.
    pub fn undo(&mut self) -> bool {
        let undone = self.undo.as_mut().is_some_and(UndoQueue::undo);
        self.dispatch_data_changes();
        undone
    }

    /// Redo the next significant write and refresh affected controls.
    pub fn redo(&mut self) -> bool {
        let redone = self.undo.as_mut().is_some_and(UndoQueue::redo);
        self.dispatch_data_changes();
        redone
    }
}

fn invalid(key: &str, value: &str) -> bool {
    tracing::warn!(target: targets::CANVAS, key, value, "invalid attribute value");
    false
}

/// Parse a boolean attribute, logging an unparsable value.
fn parse_bool(key: &str, value: &str) -> Option<bool> {
    let parsed = bool::from_text(value);
    if parsed.is_none() {
        invalid(key, value);
    }
    parsed
}

impl Drop for Canvas {
    fn drop(&mut self) {
        let ids: Vec<ControlId> = self.nodes.keys().collect();
        for id in ids {
            self.unbind(id);
            if let Some(handle) = self.nodes[id].handle.take() {
                self.backend.release_handle(handle);
            }
        }
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("controls", &self.nodes.len())
            .field("realized", &self.is_realized(self.root))
            .field("panel_states", &self.panel_states.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HandleOp;
    use horizon_inspect_core::{Data, Formatter, Property};

    fn text_data(cells: &[Arc<Property<String>>]) -> Arc<dyn Data<String>> {
        Arc::new(Formatter::from_properties(cells.to_vec()))
    }

    fn cell(text: &str) -> Arc<Property<String>> {
        Arc::new(Property::new(text.to_string()))
    }

    #[test]
    fn test_child_inherits_restrictive_attributes() {
        let (mut canvas, _log) = Canvas::headless();
        let panel = canvas.create(ControlKind::panel("Mesh"), "mesh");
        canvas.add_child(canvas.root(), panel);
        canvas.set_enabled(panel, false);
        canvas.set_read_only(panel, true);
        canvas.freeze(panel);

        let value = canvas.create(ControlKind::Value, "name");
        canvas.add_child(panel, value);
        let attributes = canvas.node(value).unwrap().attributes();
        assert!(!attributes.enabled);
        assert!(attributes.read_only);
        assert_eq!(attributes.frozen, 1);

        canvas.thaw(panel);
        assert!(!canvas.is_frozen(value));
    }

    #[test]
    fn test_moved_control_drops_inherited_attributes() {
        let (mut canvas, _log) = Canvas::headless();
        let locked = canvas.create(ControlKind::panel("Locked"), "locked");
        let open = canvas.create(ControlKind::panel("Open"), "open");
        canvas.add_child(canvas.root(), locked);
        canvas.add_child(canvas.root(), open);
        canvas.set_read_only(locked, true);
        canvas.set_hidden(locked, true);
        canvas.freeze(locked);

        let group = canvas.create(ControlKind::Container, "group");
        let value = canvas.create(ControlKind::Value, "name");
        canvas.add_child(group, value);
        canvas.set_enabled(value, false);
        canvas.add_child(locked, group);
        canvas.add_child(locked, group);
        let attributes = canvas.node(value).unwrap().attributes();
        assert!(attributes.read_only);
        assert!(attributes.hidden);
        assert_eq!(attributes.frozen, 1);

        canvas.add_child(open, group);
        let attributes = canvas.node(value).unwrap().attributes();
        assert!(!attributes.read_only);
        assert!(!attributes.hidden);
        assert_eq!(attributes.frozen, 0);
        // Its own setting survives the move.
        assert!(!attributes.enabled);
        assert!(!canvas.node(group).unwrap().attributes().read_only);
    }

    #[test]
    fn test_read_and_write() {
        let (mut canvas, log) = Canvas::headless();
        let a = cell("x");
        let b = cell("x");
        let value = canvas.create(ControlKind::Value, "name");
        canvas.add_child(canvas.root(), value);
        canvas.bind(value, Binding::text(text_data(&[a.clone(), b.clone()])));
        canvas.realize(canvas.root());

        let handle = log.handle_of("name").unwrap();
        assert_eq!(log.last_value(handle).as_deref(), Some("x"));

        assert!(canvas.edit(value, "y"));
        assert_eq!(a.get(), "y");
        assert_eq!(b.get(), "y");
    }

    #[test]
    fn test_multi_value_is_shown() {
        let (mut canvas, _log) = Canvas::headless();
        let value = canvas.create(ControlKind::Value, "name");
        canvas.add_child(canvas.root(), value);
        canvas.bind(value, Binding::text(text_data(&[cell("a"), cell("b")])));
        canvas.realize(canvas.root());
        assert_eq!(canvas.text(value), Some("Multi"));

        // Writing the sentinel back is not an edit.
        assert!(canvas.write(value));
    }

    #[test]
    fn test_write_unbound_is_noop() {
        let (mut canvas, _log) = Canvas::headless();
        let value = canvas.create(ControlKind::Value, "name");
        canvas.add_child(canvas.root(), value);
        canvas.realize(canvas.root());
        assert!(!canvas.edit(value, "text"));
    }

    #[test]
    fn test_write_read_only_rejected() {
        let (mut canvas, _log) = Canvas::headless();
        let target = cell("a");
        let value = canvas.create(ControlKind::Value, "name");
        canvas.add_child(canvas.root(), value);
        canvas.bind(value, Binding::text(text_data(&[target.clone()])));
        canvas.set_read_only(value, true);
        assert!(!canvas.edit(value, "b"));
        assert_eq!(target.get(), "a");
    }

    #[test]
    fn test_veto_rereads() {
        let (mut canvas, _log) = Canvas::headless();
        let target = cell("a");
        let value = canvas.create(ControlKind::Value, "name");
        canvas.add_child(canvas.root(), value);
        canvas.bind(value, Binding::text(text_data(&[target.clone()])));
        canvas.realize(canvas.root());
        canvas.control_changing().connect(|change: &ControlChanging| change.text != "forbidden");

        assert!(!canvas.edit(value, "forbidden"));
        assert_eq!(target.get(), "a");
        assert_eq!(canvas.text(value), Some("a"));
    }

    #[test]
    fn test_sibling_controls_follow_writes() {
        let (mut canvas, _log) = Canvas::headless();
        let data = text_data(&[cell("1")]);
        let first = canvas.create(ControlKind::Value, "first");
        let second = canvas.create(ControlKind::Label, "second");
        canvas.add_child(canvas.root(), first);
        canvas.add_child(canvas.root(), second);
        canvas.bind(first, Binding::text(data.clone()));
        canvas.bind(second, Binding::text(data.clone()));
        canvas.realize(canvas.root());

        assert!(canvas.edit(first, "2"));
        assert_eq!(canvas.text(second), Some("2"));

        data.set("3".into(), None);
        assert_eq!(canvas.pending_changes(), 2);
        assert_eq!(canvas.dispatch_data_changes(), 2);
        assert_eq!(canvas.text(first), Some("3"));
    }

    #[test]
    fn test_realize_is_idempotent() {
        let (mut canvas, log) = Canvas::headless();
        let value = canvas.create(ControlKind::Value, "a");
        canvas.add_child(canvas.root(), value);
        canvas.realize(canvas.root());
        let created = log.created();

        canvas.realize(canvas.root());
        assert_eq!(log.created(), created);

        let late = canvas.create(ControlKind::Value, "b");
        canvas.add_child(canvas.root(), late);
        assert!(canvas.is_realized(late));
        assert_eq!(log.created(), created + 1);
    }

    #[test]
    fn test_handles_parent_mirrors_tree() {
        let (mut canvas, log) = Canvas::headless();
        let panel = canvas.create(ControlKind::panel("Light"), "light");
        let value = canvas.create(ControlKind::Value, "intensity");
        canvas.add_child(canvas.root(), panel);
        canvas.add_child(panel, value);
        canvas.realize(canvas.root());

        let panel_handle = log.handle_of("light");
        let parent = log.ops().into_iter().find_map(|op| match op {
            HandleOp::Created { name, parent, .. } if name == "intensity" => Some(parent),
            _ => None,
        });
        assert_eq!(parent, Some(panel_handle));
    }

    #[test]
    #[should_panic(expected = "no handle for value control 'broken'")]
    fn test_leaf_without_handle_panics() {
        let mut canvas = Canvas::new(CanvasConfig::default(), HeadlessBackend::new().refusing(KindTag::Value));
        let value = canvas.create(ControlKind::Value, "broken");
        canvas.add_child(canvas.root(), value);
        canvas.realize(canvas.root());
    }

    #[test]
    fn test_container_without_handle_is_allowed() {
        let mut canvas = Canvas::new(CanvasConfig::default(), HeadlessBackend::new().refusing(KindTag::Container));
        let group = canvas.create(ControlKind::Container, "group");
        let value = canvas.create(ControlKind::Value, "inner");
        canvas.add_child(canvas.root(), group);
        canvas.add_child(group, value);
        canvas.realize(canvas.root());
        assert!(canvas.is_realized(group));
        assert!(canvas.node(group).unwrap().raw_handle().is_none());
        assert!(canvas.node(value).unwrap().raw_handle().is_some());
    }

    #[test]
    fn test_clear_releases_handles() {
        let (mut canvas, log) = Canvas::headless();
        let panel = canvas.create(ControlKind::panel("P"), "p");
        canvas.add_child(canvas.root(), panel);
        for name in ["a", "b"] {
            let value = canvas.create(ControlKind::Value, name);
            canvas.add_child(panel, value);
        }
        canvas.realize(canvas.root());
        assert_eq!(log.live(), 4);

        canvas.clear(canvas.root());
        assert_eq!(log.live(), 1);
        assert_eq!(canvas.len(), 1);
        assert!(!canvas.contains(panel));
    }

    #[test]
    fn test_destroy_disconnects_binding() {
        let (mut canvas, _log) = Canvas::headless();
        let data = text_data(&[cell("a")]);
        let value = canvas.create(ControlKind::Value, "v");
        canvas.add_child(canvas.root(), value);
        canvas.bind(value, Binding::text(data.clone()));
        assert_eq!(data.changed().connection_count(), 1);

        assert!(canvas.remove_child(canvas.root(), value));
        assert_eq!(data.changed().connection_count(), 0);
        assert!(!canvas.remove_child(canvas.root(), value));
    }

    #[test]
    fn test_set_expanded_honors_cached_state() {
        let (mut canvas, _log) = Canvas::headless();
        let panel = canvas.create(ControlKind::panel("Transform"), "transform");
        canvas.add_child(canvas.root(), panel);

        assert_eq!(canvas.set_expanded(panel, false, false), Some(false));
        assert!(canvas.panel_states().is_empty());

        assert_eq!(canvas.set_expanded(panel, true, true), Some(true));
        assert_eq!(canvas.set_expanded(panel, false, false), Some(true));
        assert_eq!(canvas.set_expanded(panel, false, true), Some(false));
        assert_eq!(canvas.panel_states().get("Transform"), Some(Expansion::Collapsed));
    }

    #[test]
    fn test_panel_path_nests_titles() {
        let (mut canvas, _log) = Canvas::headless();
        let outer = canvas.create(ControlKind::panel("Mesh"), "mesh");
        let group = canvas.create(ControlKind::Container, "group");
        let inner = canvas.create(ControlKind::panel("Material"), "material");
        canvas.add_child(canvas.root(), outer);
        canvas.add_child(outer, group);
        canvas.add_child(group, inner);
        assert_eq!(canvas.panel_path(inner).as_deref(), Some("Mesh/Material"));
        assert_eq!(canvas.panel_path(group), None);
    }

    #[test]
    fn test_process_bubbles_to_properties() {
        let (mut canvas, _log) = Canvas::headless();
        let slider = canvas.create(ControlKind::slider(0.0, 1.0), "s");
        assert!(canvas.process(slider, "max", "10"));
        assert!(canvas.process(slider, "help", "Strength"));
        assert!(canvas.process(slider, "style", "fancy"));
        assert!(!canvas.process(slider, "width", "wide"));

        let node = canvas.node(slider).unwrap();
        let ControlKind::Slider(state) = node.kind() else {
            panic!("not a slider");
        };
        assert_eq!(state.max, 10.0);
        assert_eq!(node.attributes().help.as_deref(), Some("Strength"));
        assert_eq!(canvas.property(slider, "style"), Some("fancy"));
    }

    #[test]
    fn test_choice_items_and_choose() {
        let (mut canvas, _log) = Canvas::headless();
        let target = cell("0");
        let choice = canvas.create(ControlKind::choice(), "quality");
        canvas.add_child(canvas.root(), choice);
        assert!(canvas.process(choice, "item", "Low,0"));
        assert!(canvas.process(choice, "item", "High,1"));
        canvas.bind(choice, Binding::text(text_data(&[target.clone()])));
        canvas.realize(canvas.root());
        assert_eq!(canvas.selection(choice), Some(0));

        assert!(canvas.choose(choice, 1));
        assert_eq!(target.get(), "1");
        assert_eq!(canvas.selection(choice), Some(1));
    }

    #[test]
    fn test_list_move_selected() {
        let (mut canvas, _log) = Canvas::headless();
        let target = cell("a|b|c");
        let list = canvas.create(ControlKind::list(), "items");
        canvas.add_child(canvas.root(), list);
        canvas.bind(list, Binding::text(text_data(&[target.clone()])));
        canvas.realize(canvas.root());

        canvas.select(list, Some(2));
        assert!(canvas.move_selected(list, true));
        assert_eq!(target.get(), "a|c|b");
        assert_eq!(canvas.selection(list), Some(1));

        assert!(canvas.move_selected(list, false));
        assert_eq!(target.get(), "a|b|c");
        assert!(!canvas.move_selected(list, false));
    }

    #[test]
    fn test_click_runs_actions() {
        let (mut canvas, _log) = Canvas::headless();
        let button = canvas.create(ControlKind::button(), "go");
        canvas.add_child(canvas.root(), button);
        canvas.add_action(
            button,
            Arc::new(|canvas: &mut Canvas, id| canvas.set_property(id, "clicked", "yes")),
        );
        assert!(canvas.click(button));
        assert_eq!(canvas.property(button, "clicked"), Some("yes"));

        canvas.set_enabled(button, false);
        assert!(!canvas.click(button));
    }

    #[test]
    fn test_reset_to_default() {
        let (mut canvas, _log) = Canvas::headless();
        let target = cell("5");
        let value = canvas.create(ControlKind::Value, "count");
        canvas.add_child(canvas.root(), value);
        canvas.bind(value, Binding::text(text_data(&[target.clone()])));
        canvas.set_default_value(value, Some("1".into()));
        canvas.realize(canvas.root());
        assert!(!canvas.node(value).unwrap().attributes().default_appearance);

        assert!(canvas.reset_to_default(value));
        assert_eq!(target.get(), "1");
        assert!(canvas.node(value).unwrap().attributes().default_appearance);
    }

    #[test]
    fn test_undo_redo_through_canvas() {
        let (mut canvas, _log) = Canvas::headless();
        let target = cell("a");
        let value = canvas.create(ControlKind::Value, "v");
        canvas.add_child(canvas.root(), value);
        canvas.bind(value, Binding::text(text_data(&[target.clone()])));
        canvas.enable_undo();
        canvas.realize(canvas.root());

        assert!(canvas.edit(value, "b"));
        assert!(canvas.edit(value, "c"));
        assert!(canvas.undo());
        assert_eq!(target.get(), "b");
        assert_eq!(canvas.text(value), Some("b"));
        assert!(canvas.undo());
        assert_eq!(target.get(), "a");
        assert!(!canvas.undo());

        assert!(canvas.redo());
        assert_eq!(canvas.text(value), Some("b"));
    }

    #[test]
    #[should_panic(expected = "needs a text binding")]
    fn test_typed_binding_on_standard_control_panics() {
        let (mut canvas, _log) = Canvas::headless();
        let value = canvas.create(ControlKind::Value, "v");
        let data: Arc<dyn Data<f32>> = Arc::new(Formatter::from_properties(vec![Arc::new(Property::new(1.0f32))]));
        canvas.bind(value, Binding::typed(data));
    }

    #[test]
    fn test_drop_releases_handles() {
        let (mut canvas, log) = Canvas::headless();
        let value = canvas.create(ControlKind::Value, "v");
        canvas.add_child(canvas.root(), value);
        canvas.realize(canvas.root());
        drop(canvas);
        assert_eq!(log.live(), 0);
    }
}

//! Control kinds, attributes and bindings.
//!
//! Controls live in a [`Canvas`](crate::Canvas) arena and are addressed by
//! [`ControlId`]. A control's behaviour is selected by its [`ControlKind`],
//! a closed set of variants; custom behaviour plugs in through
//! [`CustomControl`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use horizon_inspect_core::{
    ConnectionId, Data, DataBinding, EmitterId, Formatter, downcast_data,
};
use slotmap::{Key, new_key_type};

use crate::canvas::Canvas;
use crate::platform::{Color, PlatformHandle, RawHandle};

new_key_type! {
    /// Identifier of a control within its canvas.
    pub struct ControlId;
}

impl ControlId {
    /// Emitter token used for this control's writes.
    pub fn emitter(self) -> EmitterId {
        EmitterId::new(self.data().as_ffi())
    }
}

/// Fieldless mirror of [`ControlKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    Label,
    Value,
    CheckBox,
    Choice,
    List,
    Slider,
    Button,
    Custom,
    Container,
    Panel,
    Canvas,
}

impl KindTag {
    /// Whether the kind owns children.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Container | Self::Panel | Self::Canvas)
    }

    /// Display name, as used by scripts and debug dumps.
    pub fn name(self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Value => "value",
            Self::CheckBox => "check",
            Self::Choice => "choice",
            Self::List => "list",
            Self::Slider => "slider",
            Self::Button => "button",
            Self::Custom => "custom",
            Self::Container => "container",
            Self::Panel => "panel",
            Self::Canvas => "canvas",
        }
    }
}

/// One entry of a choice control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceItem {
    /// Text shown to the user.
    pub label: String,
    /// Text written to the binding; the label when empty.
    pub data: String,
}

impl ChoiceItem {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }

    /// The text this item stands for in the binding.
    pub fn value(&self) -> &str {
        if self.data.is_empty() {
            &self.label
        } else {
            &self.data
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChoiceState {
    pub items: Vec<ChoiceItem>,
    pub drop_down: bool,
    pub sorted: bool,
    pub selected: Option<usize>,
}

impl ChoiceState {
    pub(crate) fn push(&mut self, item: ChoiceItem) {
        self.items.push(item);
        if self.sorted {
            self.items.sort_by(|a, b| a.label.cmp(&b.label));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub items: Vec<String>,
    /// Item separator; the canvas default when `None`.
    pub delimiter: Option<char>,
    pub sorted: bool,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderState {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct PanelState {
    pub title: String,
    pub expanded: bool,
    /// Expansion used when nothing is persisted for the panel's path.
    pub default_expanded: Option<bool>,
}

/// Action run when a button is clicked.
pub type ButtonAction = Arc<dyn Fn(&mut Canvas, ControlId) + Send + Sync>;

/// A control implemented outside the standard kinds.
///
/// Custom controls may be bound to typed data; they own their visual state
/// and report the text to display.
pub trait CustomControl: Send {
    /// Short type name for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Pull the bound value into the control. Returns the text to display.
    fn read(&mut self, binding: &Binding) -> Option<String>;

    /// Push the control's state into the binding.
    fn write(&mut self, binding: &Binding, emitter: EmitterId) -> bool;

    /// Handle a script attribute. Returns `false` to let it bubble.
    fn process(&mut self, key: &str, value: &str) -> bool {
        let _ = (key, value);
        false
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The behaviour of a control.
pub enum ControlKind {
    /// Static or bound text.
    Label,
    /// Editable text box.
    Value,
    /// Tri-state check box; the multi-value state is indeterminate.
    CheckBox,
    /// Selection among fixed items.
    Choice(ChoiceState),
    /// Delimited list of items.
    List(ListState),
    /// Numeric range.
    Slider(SliderState),
    /// Clickable button.
    Button(Vec<ButtonAction>),
    /// User-supplied behaviour.
    Custom(Box<dyn CustomControl>),
    /// Plain container.
    Container,
    /// Collapsible titled container.
    Panel(PanelState),
    /// Root of a canvas.
    Canvas,
}

impl ControlKind {
    pub fn choice() -> Self {
        Self::Choice(ChoiceState::default())
    }

    pub fn list() -> Self {
        Self::List(ListState::default())
    }

    pub fn slider(min: f64, max: f64) -> Self {
        Self::Slider(SliderState { min, max })
    }

    pub fn button() -> Self {
        Self::Button(Vec::new())
    }

    pub fn panel(title: impl Into<String>) -> Self {
        Self::Panel(PanelState {
            title: title.into(),
            expanded: true,
            default_expanded: None,
        })
    }

    pub fn custom(control: impl CustomControl + 'static) -> Self {
        Self::Custom(Box::new(control))
    }

    /// The fieldless tag.
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Label => KindTag::Label,
            Self::Value => KindTag::Value,
            Self::CheckBox => KindTag::CheckBox,
            Self::Choice(_) => KindTag::Choice,
            Self::List(_) => KindTag::List,
            Self::Slider(_) => KindTag::Slider,
            Self::Button(_) => KindTag::Button,
            Self::Custom(_) => KindTag::Custom,
            Self::Container => KindTag::Container,
            Self::Panel(_) => KindTag::Panel,
            Self::Canvas => KindTag::Canvas,
        }
    }
}

impl fmt::Debug for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(custom) => write!(f, "Custom({})", custom.type_name()),
            Self::Button(actions) => write!(f, "Button({} actions)", actions.len()),
            Self::Panel(panel) => write!(f, "Panel({:?})", panel.title),
            other => write!(f, "{:?}", other.tag()),
        }
    }
}

/// Per-control attributes.
#[derive(Debug, Clone)]
pub struct Attributes {
    pub enabled: bool,
    pub read_only: bool,
    pub hidden: bool,
    /// Nested freeze count; redraw is suspended while non-zero.
    pub frozen: u32,
    /// Draw with the "value equals default" appearance.
    pub default_appearance: bool,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    /// Tooltip text.
    pub help: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub drop_target: bool,
    /// Script attributes no kind consumed.
    pub properties: BTreeMap<String, String>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            enabled: true,
            read_only: false,
            hidden: false,
            frozen: 0,
            default_appearance: false,
            foreground: None,
            background: None,
            help: None,
            width: None,
            height: None,
            drop_target: false,
            properties: BTreeMap::new(),
        }
    }
}

/// Restrictions a control picked up when the subtree rooted at `via` was
/// added to a container. Only changes that actually took effect are kept,
/// so removing the subtree can take back exactly these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Inherited {
    pub(crate) via: ControlId,
    pub(crate) disabled: bool,
    pub(crate) read_only: bool,
    pub(crate) hidden: bool,
    pub(crate) frozen: u32,
}

impl Inherited {
    /// Apply `parent`'s restrictions to `attributes`, recording what changed.
    pub(crate) fn apply(via: ControlId, parent: &Attributes, attributes: &mut Attributes) -> Option<Self> {
        let inherited = Self {
            via,
            disabled: attributes.enabled && !parent.enabled,
            read_only: !attributes.read_only && parent.read_only,
            hidden: !attributes.hidden && parent.hidden,
            frozen: parent.frozen,
        };
        if !(inherited.disabled || inherited.read_only || inherited.hidden || inherited.frozen > 0) {
            return None;
        }
        attributes.enabled &= !inherited.disabled;
        attributes.read_only |= inherited.read_only;
        attributes.hidden |= inherited.hidden;
        attributes.frozen += inherited.frozen;
        Some(inherited)
    }

    /// Take the recorded restrictions back out of `attributes`.
    pub(crate) fn revert(&self, attributes: &mut Attributes) {
        if self.disabled {
            attributes.enabled = true;
        }
        if self.read_only {
            attributes.read_only = false;
        }
        if self.hidden {
            attributes.hidden = false;
        }
        attributes.frozen = attributes.frozen.saturating_sub(self.frozen);
    }
}

/// The data a control is bound to.
///
/// Standard controls edit text and need [`Binding::Text`]; custom controls
/// may take any typed binding.
#[derive(Clone)]
pub enum Binding {
    Text(Arc<dyn Data<String>>),
    Typed(Arc<dyn DataBinding>),
}

impl Binding {
    pub fn text(data: Arc<dyn Data<String>>) -> Self {
        Self::Text(data)
    }

    pub fn typed<T: 'static>(data: Arc<dyn Data<T>>) -> Self {
        Self::Typed(data)
    }

    /// The type-erased endpoint.
    pub fn erased(&self) -> Arc<dyn DataBinding> {
        match self {
            Self::Text(data) => data.clone(),
            Self::Typed(data) => data.clone(),
        }
    }

    /// The text binding, if this is one.
    pub fn as_text(&self) -> Option<&Arc<dyn Data<String>>> {
        match self {
            Self::Text(data) => Some(data),
            Self::Typed(_) => None,
        }
    }

    /// The concrete typed formatter behind this binding.
    pub fn formatter<T: 'static>(&self) -> Option<&Formatter<T>> {
        match self {
            Self::Text(data) => downcast_data::<T>(data.as_ref()),
            Self::Typed(data) => downcast_data::<T>(data.as_ref()),
        }
    }

    /// Number of bound targets.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(data) => data.len(),
            Self::Typed(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(data) => write!(f, "Text({} targets)", data.len()),
            Self::Typed(data) => write!(f, "Typed<{}>({} targets)", data.value_type_name(), data.len()),
        }
    }
}

/// One node of the control tree.
pub struct ControlNode {
    pub(crate) kind: ControlKind,
    pub(crate) name: String,
    pub(crate) parent: Option<ControlId>,
    pub(crate) children: Vec<ControlId>,
    pub(crate) attributes: Attributes,
    pub(crate) binding: Option<Binding>,
    pub(crate) connection: Option<ConnectionId>,
    /// Visual state in text form.
    pub(crate) text: String,
    pub(crate) default: Option<String>,
    /// Restrictions taken from containers this control was added under.
    pub(crate) inherited: Vec<Inherited>,
    pub(crate) handle: Option<Box<dyn PlatformHandle>>,
    pub(crate) realized: bool,
    /// Set while the control is writing its own binding.
    pub(crate) writing: bool,
}

impl ControlNode {
    pub(crate) fn new(kind: ControlKind, name: String) -> Self {
        Self {
            kind,
            name,
            parent: None,
            children: Vec::new(),
            attributes: Attributes::default(),
            binding: None,
            connection: None,
            text: String::new(),
            default: None,
            inherited: Vec::new(),
            handle: None,
            realized: false,
            writing: false,
        }
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    pub fn children(&self) -> &[ControlId] {
        &self.children
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Visual state in text form.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Default value in text form, if recorded.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }

    /// The platform handle identifier, while realized.
    pub fn raw_handle(&self) -> Option<RawHandle> {
        self.handle.as_ref().map(|handle| handle.raw())
    }

    /// Store `text` as the visual state, updating derived selection.
    pub(crate) fn apply_text(&mut self, text: String, delimiter: char) {
        if let Some(default) = &self.default {
            self.attributes.default_appearance = *default == text;
        }
        match &mut self.kind {
            ControlKind::Choice(choice) => {
                choice.selected = choice.items.iter().position(|item| item.value() == text);
            }
            ControlKind::List(list) => {
                let delimiter = list.delimiter.unwrap_or(delimiter);
                list.items = if text.is_empty() {
                    Vec::new()
                } else {
                    text.split(delimiter).map(str::to_string).collect()
                };
                if list.selected.is_some_and(|index| index >= list.items.len()) {
                    list.selected = None;
                }
            }
            _ => {}
        }
        self.text = text;
    }

    /// Push the visual state into the handle.
    pub(crate) fn show(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        match &self.kind {
            ControlKind::Choice(choice) => {
                let labels: Vec<String> = choice.items.iter().map(|item| item.label.clone()).collect();
                handle.set_items(&labels);
                handle.set_selection(choice.selected);
                handle.set_value(&self.text);
            }
            ControlKind::List(list) => {
                handle.set_items(&list.items);
                handle.set_selection(list.selected);
            }
            ControlKind::Panel(panel) => {
                handle.set_value(&panel.title);
                handle.set_expanded(panel.expanded);
            }
            ControlKind::Container | ControlKind::Canvas => {}
            _ => handle.set_value(&self.text),
        }
    }

    /// Push every attribute into the handle.
    pub(crate) fn apply_attributes(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        let attributes = &self.attributes;
        handle.set_enabled(attributes.enabled);
        handle.set_read_only(attributes.read_only);
        handle.set_visible(!attributes.hidden);
        handle.set_foreground(attributes.foreground);
        handle.set_background(attributes.background);
        handle.set_tooltip(attributes.help.as_deref());
        handle.set_drop_target(attributes.drop_target);
        if attributes.frozen > 0 {
            handle.set_redraw(false);
        }
    }
}

impl fmt::Debug for ControlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlNode")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("text", &self.text)
            .field("children", &self.children.len())
            .field("bound", &self.binding.is_some())
            .field("realized", &self.realized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_inspect_core::Property;

    #[test]
    fn test_choice_item_value() {
        assert_eq!(ChoiceItem::new("Red", "").value(), "Red");
        assert_eq!(ChoiceItem::new("Red", "r").value(), "r");
    }

    #[test]
    fn test_apply_text_list() {
        let mut node = ControlNode::new(ControlKind::list(), "items".into());
        node.apply_text("a|b|c".into(), '|');
        let ControlKind::List(list) = &node.kind else {
            panic!("not a list");
        };
        assert_eq!(list.items, vec!["a", "b", "c"]);

        node.apply_text(String::new(), '|');
        let ControlKind::List(list) = &node.kind else {
            panic!("not a list");
        };
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_apply_text_choice_selects() {
        let mut choice = ChoiceState::default();
        choice.push(ChoiceItem::new("Low", "0"));
        choice.push(ChoiceItem::new("High", "1"));
        let mut node = ControlNode::new(ControlKind::Choice(choice), "quality".into());
        node.apply_text("1".into(), '|');
        let ControlKind::Choice(choice) = &node.kind else {
            panic!("not a choice");
        };
        assert_eq!(choice.selected, Some(1));
    }

    #[test]
    fn test_binding_kinds() {
        let cell = Arc::new(Property::new(2.0f32));
        let typed = Binding::typed(Arc::new(Formatter::from_properties(vec![cell])) as Arc<dyn Data<f32>>);
        assert!(typed.as_text().is_none());
        assert!(typed.formatter::<f32>().is_some());
        assert_eq!(typed.len(), 1);
        assert_eq!(format!("{typed:?}"), "Typed<f32>(1 targets)");
    }

    #[test]
    fn test_kind_tags() {
        assert!(KindTag::Panel.is_container());
        assert!(!KindTag::Button.is_container());
        assert_eq!(ControlKind::panel("Transform").tag(), KindTag::Panel);
        assert_eq!(format!("{:?}", ControlKind::Value), "Value");
    }
}

//! The inspector's registry context.
//!
//! [`InspectRegistry`] holds every table the builders consult: script
//! keywords, field interpreters, reflected types and the designated common
//! base class. It is constructed explicitly, shared by reference (typically
//! in an `Arc`) and torn down explicitly; there is no global instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use horizon_inspect_core::logging::targets;
use horizon_inspect_core::value::{ARRAY, SET};
use horizon_inspect_core::{FieldFlags, Instance, MetaClass, MetaResult, TypeRegistry, ValueType};
use parking_lot::RwLock;

use crate::control::ControlKind;
use crate::interpreter::BuildStacks;
use crate::reflect::{
    ContainerInterpreter, FieldInterpreter, FieldInterpreterFactory, FileContainerInterpreter,
};

/// Creates the control kind a script keyword stands for.
pub type KindFactory = Arc<dyn Fn() -> ControlKind + Send + Sync>;

/// Tables shared by all builders.
pub struct InspectRegistry {
    keywords: RwLock<HashMap<String, KindFactory>>,
    fields: RwLock<FieldInterpreterFactory>,
    types: RwLock<TypeRegistry>,
    common_base: RwLock<Option<&'static MetaClass>>,
    stacks: BuildStacks,
}

static_assertions::assert_impl_all!(InspectRegistry: Send, Sync);

impl Default for InspectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            keywords: RwLock::new(HashMap::new()),
            fields: RwLock::new(FieldInterpreterFactory::new()),
            types: RwLock::new(TypeRegistry::new()),
            common_base: RwLock::new(None),
            stacks: BuildStacks::new(),
        }
    }

    /// A registry with the standard script keywords and field interpreters.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_default_keywords();
        registry.register_default_interpreters();
        registry
    }

    fn register_default_keywords(&self) {
        self.register_keyword("label", || ControlKind::Label);
        self.register_keyword("value", || ControlKind::Value);
        self.register_keyword("check", || ControlKind::CheckBox);
        self.register_keyword("choice", ControlKind::choice);
        self.register_keyword("list", ControlKind::list);
        self.register_keyword("button", ControlKind::button);
        self.register_keyword("slider", || ControlKind::slider(0.0, 100.0));
        self.register_keyword("container", || ControlKind::Container);
        self.register_keyword("panel", || ControlKind::panel(""));
    }

    fn register_default_interpreters(&self) {
        let list: Arc<dyn FieldInterpreter> = Arc::new(ContainerInterpreter);
        let files: Arc<dyn FieldInterpreter> = Arc::new(FileContainerInterpreter);
        for value_type in [&ARRAY, &SET] {
            self.register_field_interpreter(value_type, FieldFlags::NONE, list.clone());
            self.register_field_interpreter(value_type, FieldFlags::FILE_PATH, files.clone());
        }
    }

    /// Clear every table. Threads still building keep their stacks until
    /// their interpreters drop.
    pub fn teardown(&self) {
        self.keywords.write().clear();
        self.fields.write().clear();
        self.types.write().clear();
        *self.common_base.write() = None;
        self.stacks.clear();
        tracing::debug!(target: targets::INTERPRETER, "inspect registry torn down");
    }

    // =========================================================================
    // Script keywords
    // =========================================================================

    /// Map a script keyword to a control kind.
    pub fn register_keyword<F>(&self, keyword: impl Into<String>, factory: F)
    where
        F: Fn() -> ControlKind + Send + Sync + 'static,
    {
        self.keywords.write().insert(keyword.into(), Arc::new(factory));
    }

    pub fn unregister_keyword(&self, keyword: &str) -> bool {
        self.keywords.write().remove(keyword).is_some()
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.read().contains_key(keyword)
    }

    /// Instantiate the control kind registered for `keyword`.
    pub fn create_kind(&self, keyword: &str) -> Option<ControlKind> {
        let factory = self.keywords.read().get(keyword).cloned()?;
        Some(factory())
    }

    // =========================================================================
    // Field interpreters
    // =========================================================================

    pub fn register_field_interpreter(
        &self,
        value_type: &'static ValueType,
        mask: FieldFlags,
        interpreter: Arc<dyn FieldInterpreter>,
    ) {
        self.fields.write().register(value_type, mask, interpreter);
    }

    pub fn unregister_field_interpreter(&self, value_type: &'static ValueType, mask: FieldFlags) -> bool {
        self.fields.write().unregister(value_type, mask)
    }

    /// See [`FieldInterpreterFactory::resolve`].
    pub fn resolve_field_interpreter(
        &self,
        value_type: &'static ValueType,
        flags: FieldFlags,
    ) -> Option<Arc<dyn FieldInterpreter>> {
        self.fields.read().resolve(value_type, flags)
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Register a reflected class and its bases.
    pub fn register_type(&self, class: &'static MetaClass) {
        self.types.write().register(class);
    }

    pub fn meta_class(&self, name: &str) -> Option<&'static MetaClass> {
        self.types.read().get(name)
    }

    /// Create a default instance of a registered class.
    pub fn create_instance(&self, name: &str) -> MetaResult<Instance> {
        self.types.read().create(name)
    }

    /// Run `f` with the type table locked for writing.
    pub fn with_types<R>(&self, f: impl FnOnce(&mut TypeRegistry) -> R) -> R {
        f(&mut self.types.write())
    }

    /// Fields declared on `class` and its bases are skipped by reflective
    /// synthesis.
    pub fn set_common_base(&self, class: Option<&'static MetaClass>) {
        *self.common_base.write() = class;
    }

    pub fn common_base(&self) -> Option<&'static MetaClass> {
        *self.common_base.read()
    }

    pub fn build_stacks(&self) -> &BuildStacks {
        &self.stacks
    }
}

impl fmt::Debug for InspectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keywords: Vec<String> = self.keywords.read().keys().cloned().collect();
        keywords.sort();
        f.debug_struct("InspectRegistry")
            .field("keywords", &keywords)
            .field("field_interpreters", &self.fields.read().len())
            .field("types", &self.types.read().len())
            .field("common_base", &self.common_base().map(|class| class.name))
            .finish()
    }
}

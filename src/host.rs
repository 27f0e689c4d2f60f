//! Host collaborator contract
//!
//! The engine never stores attributes. It reads them from a [`Record`] and
//! calls custom methods through it. [`HostSpec`] describes a host *type*: its
//! name (the validator cache key) and the methods `custom` rules may name.
//!
//! [`ModelType`] and [`Model`] are a small in-memory host used to drive the
//! engine end to end: validate before commit, all-or-nothing `set`, and the
//! `invalid` / `invalid:<path>` event signals.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::compiler::CompileOptions;
use crate::error::Result;
use crate::path::{AttributePath, Fragment, FragmentKind};
use crate::registry::RuleRegistry;
use crate::report::{self, EventSink, Signal};
use crate::rules::{Builtin, ErrorCode};
use crate::schema::Schema;
use crate::validator::{ValidationErrors, Validator, ValidatorCache};

/// Read access to a record's stored attributes
pub trait Record {
    /// Stored value of a top-level attribute
    fn get(&self, attr: &str) -> Option<&Value>;

    /// Invoke the host method `method` for a `custom` rule.
    ///
    /// Returns the error code, or `None` when the value is acceptable. A
    /// record without methods fails every `custom` rule with `custom`.
    fn call(&self, method: &str, attr: &str, value: Option<&Value>) -> Option<ErrorCode> {
        let _ = value;
        tracing::warn!(method, attr, "record does not expose custom methods");
        Some(Builtin::Custom.name().to_string())
    }
}

impl Record for Map<String, Value> {
    fn get(&self, attr: &str) -> Option<&Value> {
        Map::get(self, attr)
    }
}

/// Error code for a changed key that cannot be written into the record
pub const UNASSIGNABLE: &str = "unassignable";

/// Static description of a host type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    type_name: String,
    methods: BTreeSet<String>,
}

impl HostSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: BTreeSet::new(),
        }
    }

    /// Declare a method `custom` rules may call
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }
}

/// A host method backing a `custom` rule: `(attribute, value) -> error code`
pub type Method = Box<dyn Fn(&str, Option<&Value>) -> Option<ErrorCode> + Send + Sync>;

/// A model type: its methods and its shared, compiled validator
pub struct ModelType {
    spec: HostSpec,
    methods: HashMap<String, Method>,
    validator: Arc<Validator>,
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("spec", &self.spec)
            .field("validator", &self.validator)
            .finish()
    }
}

impl ModelType {
    pub fn builder(type_name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder {
            spec: HostSpec::new(type_name),
            methods: HashMap::new(),
            options: CompileOptions::default(),
        }
    }

    pub fn spec(&self) -> &HostSpec {
        &self.spec
    }

    pub fn validator(&self) -> &Arc<Validator> {
        &self.validator
    }

    /// A fresh, empty instance of this type
    pub fn instance(self: &Arc<Self>) -> Model {
        Model {
            kind: Arc::clone(self),
            attributes: Map::new(),
            events: EventLog::default(),
        }
    }
}

/// Builder for [`ModelType`]
pub struct ModelTypeBuilder {
    spec: HostSpec,
    methods: HashMap<String, Method>,
    options: CompileOptions,
}

impl ModelTypeBuilder {
    /// Add a method callable from `custom` rules
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&str, Option<&Value>) -> Option<ErrorCode> + Send + Sync + 'static,
    {
        let name = name.into();
        self.spec = self.spec.method(name.clone());
        self.methods.insert(name, Box::new(method));
        self
    }

    pub fn options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile (or fetch from `cache`) the validator for this type
    pub fn build(
        self,
        schema: &Schema,
        registry: &RuleRegistry,
        cache: &ValidatorCache,
    ) -> Result<Arc<ModelType>> {
        let validator = cache.get_or_compile(&self.spec, schema, registry, self.options)?;
        Ok(Arc::new(ModelType {
            spec: self.spec,
            methods: self.methods,
            validator,
        }))
    }
}

/// A recorded signal
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub errors: Value,
}

/// Signals recorded by a [`Model`], oldest first
#[derive(Debug, Clone, Default)]
pub struct EventLog(Vec<Event>);

impl EventLog {
    pub fn as_slice(&self) -> &[Event] {
        &self.0
    }
}

impl EventSink for EventLog {
    fn trigger(&mut self, signal: &Signal<'_>) {
        self.0.push(Event {
            name: signal.name(),
            errors: signal.payload(),
        });
    }
}

/// One in-memory record of a [`ModelType`]
#[derive(Debug)]
pub struct Model {
    kind: Arc<ModelType>,
    attributes: Map<String, Value>,
    events: EventLog,
}

impl Record for Model {
    fn get(&self, attr: &str) -> Option<&Value> {
        self.attributes.get(attr)
    }

    fn call(&self, method: &str, attr: &str, value: Option<&Value>) -> Option<ErrorCode> {
        self.kind.methods.get(method).and_then(|m| m(attr, value))
    }
}

impl Model {
    pub fn kind(&self) -> &ModelType {
        &self.kind
    }

    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.attributes.get(attr)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Signals emitted so far, oldest first
    pub fn events(&self) -> &[Event] {
        self.events.as_slice()
    }

    /// Validate a proposed change set without applying it
    pub fn validate(&self, attrs: &Map<String, Value>) -> std::result::Result<(), ValidationErrors> {
        self.kind.validator.validate(self, Some(attrs))
    }

    /// Validate the stored attributes as a whole
    pub fn is_valid(&self) -> bool {
        self.kind.validator.validate(self, None).is_ok()
    }

    /// Validate and apply `attrs`.
    ///
    /// Containers are written before the keys reaching into them. On failure
    /// nothing is applied, the error signals are emitted and the errors are
    /// returned; keys that cannot be written fail with [`UNASSIGNABLE`].
    pub fn set(&mut self, attrs: Map<String, Value>) -> std::result::Result<(), ValidationErrors> {
        self.apply(attrs, None)
    }

    /// Like [`Model::set`], but failures go to `on_error` and no signals are
    /// emitted
    pub fn set_with<F>(&mut self, attrs: Map<String, Value>, mut on_error: F) -> std::result::Result<(), ValidationErrors>
    where
        F: FnMut(&ValidationErrors),
    {
        self.apply(attrs, Some(&mut on_error))
    }

    fn apply(
        &mut self,
        attrs: Map<String, Value>,
        on_error: Option<&mut dyn FnMut(&ValidationErrors)>,
    ) -> std::result::Result<(), ValidationErrors> {
        let mut errors = self.validate(&attrs).err().unwrap_or_default();

        let mut staged = self.attributes.clone();
        for (key, value) in commit_order(attrs) {
            if let Err(reason) = assign(&mut staged, &key, value) {
                tracing::warn!(key = %key, %reason, "change cannot be assigned");
                errors.push(key, vec![UNASSIGNABLE.to_string()]);
            }
        }

        if !errors.is_empty() {
            let overridden = on_error.is_some();
            if let Some(handler) = on_error {
                handler(&errors);
            }
            report::report(&errors, &mut self.events, overridden);
            return Err(errors);
        }

        self.attributes = staged;
        Ok(())
    }
}

/// Order changed keys so every container precedes the keys below it
fn commit_order(attrs: Map<String, Value>) -> Vec<(String, Value)> {
    let mut changes: Vec<(String, Value)> = attrs.into_iter().collect();
    changes.sort_by_cached_key(|(key, _)| match AttributePath::parse(key) {
        Ok(path) if !path.is_template() => (path.len(), path.indices().len()),
        _ => (0, 0),
    });
    changes
}

/// Write `value` at a possibly nested `key`, creating missing objects.
///
/// A missing or null array starts empty. An element is written only at an
/// existing index or by appending at the end.
fn assign(attributes: &mut Map<String, Value>, key: &str, value: Value) -> std::result::Result<(), String> {
    let path = match AttributePath::parse(key) {
        Ok(path) if !path.is_template() => path,
        _ => {
            attributes.insert(key.to_string(), value);
            return Ok(());
        }
    };

    let mut fragments = path.fragments().iter();
    let Some(first) = fragments.next() else {
        return Ok(());
    };
    let mut slot = step(attributes, first)?;
    for fragment in fragments {
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Some(object) = slot.as_object_mut() else {
            return Ok(());
        };
        slot = step(object, fragment)?;
    }
    *slot = value;
    Ok(())
}

fn step<'a>(object: &'a mut Map<String, Value>, fragment: &Fragment) -> std::result::Result<&'a mut Value, String> {
    let field = object.entry(fragment.name.clone()).or_insert(Value::Null);
    let FragmentKind::ArrayElement(index) = fragment.kind else {
        return Ok(field);
    };
    if field.is_null() {
        *field = Value::Array(Vec::new());
    }
    let Some(items) = field.as_array_mut() else {
        return Err(format!("`{}` is not an array", fragment.name));
    };
    if index == items.len() {
        items.push(Value::Null);
    }
    let len = items.len();
    items
        .get_mut(index)
        .ok_or_else(|| format!("index {} is past the end of `{}` ({} items)", index, fragment.name, len))
}

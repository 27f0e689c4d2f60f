//! Validation Executor
//!
//! Runs compiled attribute chains over the targets the path resolver finds,
//! in one of two modes:
//!
//! - **Full**: every schema path is resolved against the record itself.
//! - **Delta**: only the supplied change set is judged. Plain paths are always
//!   checked (an untouched attribute is unset, so presence falls back to the
//!   record's stored value); array templates are checked only at the indices
//!   the change set reaches.
//!
//! A [`Validator`] is compiled once per host type and shared; the
//! [`ValidatorCache`] holds one per type name.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::compiler::{CompileOptions, CompiledAttribute, Compiler};
use crate::error::Result;
use crate::host::{HostSpec, Record};
use crate::path::{ChangeSet, Target};
use crate::registry::RuleRegistry;
use crate::rules::ErrorCode;
use crate::schema::Schema;

/// Error codes per failing concrete attribute path, in validation order.
///
/// A returned `ValidationErrors` always holds at least one attribute; the
/// all-valid case is `Ok(())`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<(String, Vec<ErrorCode>)>,
    // position of each path in `entries`
    index: HashMap<String, usize>,
}

impl ValidationErrors {
    /// Append codes for `path`, merging with codes already recorded for it
    pub fn push(&mut self, path: impl Into<String>, codes: Vec<ErrorCode>) {
        if codes.is_empty() {
            return;
        }
        let path = path.into();
        match self.index.get(&path) {
            Some(&at) => self.entries[at].1.extend(codes),
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, codes));
            }
        }
    }

    /// Codes recorded for a concrete path
    pub fn get(&self, path: &str) -> Option<&[ErrorCode]> {
        self.index.get(path).map(|&at| self.entries[at].1.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ErrorCode])> {
        self.entries
            .iter()
            .map(|(path, codes)| (path.as_str(), codes.as_slice()))
    }

    /// Failing paths in order
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{"path": ["code", ...], ...}`
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(path, codes)| (path.clone(), Value::from(codes.clone())))
            .collect();
        Value::Object(map)
    }

    fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for {} attribute(s):", self.len())?;
        for (path, codes) in &self.entries {
            write!(f, " {} [{}]", path, codes.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, codes) in &self.entries {
            map.serialize_entry(path, codes)?;
        }
        map.end()
    }
}

/// Compiled validators for every attribute of one schema
#[derive(Debug)]
pub struct Validator {
    host_type: String,
    attributes: Vec<CompiledAttribute>,
}

impl Validator {
    /// Compile `schema` with default options
    pub fn compile(schema: &Schema, registry: &RuleRegistry, host: &HostSpec) -> Result<Self> {
        Self::compile_with(schema, registry, host, CompileOptions::default())
    }

    pub fn compile_with(
        schema: &Schema,
        registry: &RuleRegistry,
        host: &HostSpec,
        options: CompileOptions,
    ) -> Result<Self> {
        let compiler = Compiler::new(registry, host).with_options(options);
        let attributes = schema
            .entries()
            .iter()
            .map(|entry| compiler.compile_attribute(entry))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(host = %host.type_name(), attributes = attributes.len(), "compiled validator");
        Ok(Self {
            host_type: host.type_name().to_string(),
            attributes,
        })
    }

    pub fn host_type(&self) -> &str {
        &self.host_type
    }

    pub fn attributes(&self) -> &[CompiledAttribute] {
        &self.attributes
    }

    /// Validate the record, either entirely (`delta = None`) or only the
    /// supplied changes.
    pub fn validate(
        &self,
        record: &dyn Record,
        delta: Option<&Map<String, Value>>,
    ) -> std::result::Result<(), ValidationErrors> {
        match delta {
            Some(changes) => self.validate_changes(record, changes),
            None => self.validate_record(record),
        }
    }

    /// Full-document mode
    pub fn validate_record(&self, record: &dyn Record) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for attribute in &self.attributes {
            let targets = attribute.path().inflate(|name| record.get(name));
            self.run_targets(attribute, record, targets, &mut errors);
        }
        errors.into_result()
    }

    /// Delta mode
    pub fn validate_changes(
        &self,
        record: &dyn Record,
        delta: &Map<String, Value>,
    ) -> std::result::Result<(), ValidationErrors> {
        let changes = ChangeSet::new(delta);
        let mut errors = ValidationErrors::default();
        for attribute in &self.attributes {
            let targets = changes.targets(attribute.path());
            self.run_targets(attribute, record, targets, &mut errors);
        }
        errors.into_result()
    }

    fn run_targets(
        &self,
        attribute: &CompiledAttribute,
        record: &dyn Record,
        targets: Vec<Target<'_>>,
        errors: &mut ValidationErrors,
    ) {
        for target in targets {
            let codes = attribute.run(&target, record);
            if !codes.is_empty() {
                tracing::debug!(host = %self.host_type, attribute = %target.path, ?codes, "attribute invalid");
                errors.push(target.path.to_string(), codes);
            }
        }
    }
}

/// Compiled validators keyed by host type name
#[derive(Default)]
pub struct ValidatorCache {
    compiled: RwLock<HashMap<String, Arc<Validator>>>,
}

impl ValidatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The validator for `host`, compiling it on first request.
    ///
    /// Later calls for the same type name return the cached validator and
    /// ignore `schema`. Filling happens under the write lock, so concurrent
    /// first requests compile once.
    pub fn get_or_compile(
        &self,
        host: &HostSpec,
        schema: &Schema,
        registry: &RuleRegistry,
        options: CompileOptions,
    ) -> Result<Arc<Validator>> {
        if let Some(found) = self.get(host.type_name()) {
            return Ok(found);
        }

        let mut compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = compiled.get(host.type_name()) {
            return Ok(Arc::clone(found));
        }
        let validator = Arc::new(Validator::compile_with(schema, registry, host, options)?);
        compiled.insert(host.type_name().to_string(), Arc::clone(&validator));
        Ok(validator)
    }

    pub fn get(&self, host_type: &str) -> Option<Arc<Validator>> {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host_type)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.compiled.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

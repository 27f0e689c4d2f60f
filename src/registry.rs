//! Rule Registry
//!
//! Maps rule names to implementations. Built-in rules are fixed; custom rules
//! are append-only and a name may only ever be taken once across both.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::host::Record;
use crate::rules::{Builtin, RuleOutcome};

/// Schema key that dispatches to the rule named by its description
/// (`{"type": "email"}` runs the `email` rule)
pub const TYPE_ALIAS: &str = "type";

/// A rule registered at runtime.
///
/// Receives the schema description it was declared with, the concrete
/// attribute path, the record being validated and the incoming value.
pub trait CustomRule: Send + Sync {
    fn check(
        &self,
        description: &Value,
        path: &str,
        record: &dyn Record,
        value: Option<&Value>,
    ) -> RuleOutcome;
}

impl<F> CustomRule for F
where
    F: Fn(&Value, &str, &dyn Record, Option<&Value>) -> RuleOutcome + Send + Sync,
{
    fn check(
        &self,
        description: &Value,
        path: &str,
        record: &dyn Record,
        value: Option<&Value>,
    ) -> RuleOutcome {
        self(description, path, record, value)
    }
}

/// What a rule name resolves to
#[derive(Clone)]
pub enum RuleImpl {
    Builtin(Builtin),
    Custom(Arc<dyn CustomRule>),
}

impl fmt::Debug for RuleImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleImpl::Builtin(b) => f.debug_tuple("Builtin").field(b).finish(),
            RuleImpl::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Registry of validation rules
#[derive(Default)]
pub struct RuleRegistry {
    custom: RwLock<HashMap<String, Arc<dyn CustomRule>>>,
}

impl RuleRegistry {
    /// Create an isolated registry holding only the built-in rules
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static RuleRegistry {
        static GLOBAL: OnceLock<RuleRegistry> = OnceLock::new();
        GLOBAL.get_or_init(RuleRegistry::new)
    }

    fn is_reserved(name: &str) -> bool {
        name == TYPE_ALIAS || Builtin::from_name(name).is_some()
    }

    /// Register a custom rule.
    ///
    /// Fails with [`SchemaError::DuplicateRule`] if the name is a built-in or
    /// was registered before. The check and the insert happen under one lock.
    pub fn register<R>(&self, name: impl Into<String>, rule: R) -> Result<()>
    where
        R: CustomRule + 'static,
    {
        let name = name.into();
        if Self::is_reserved(&name) {
            return Err(SchemaError::DuplicateRule(name));
        }

        let mut custom = self.custom.write().unwrap_or_else(PoisonError::into_inner);
        if custom.contains_key(&name) {
            return Err(SchemaError::DuplicateRule(name));
        }
        tracing::debug!(rule = %name, "registered custom validation rule");
        custom.insert(name, Arc::new(rule));
        Ok(())
    }

    /// Resolve a rule name, failing with [`SchemaError::UnknownRule`]
    pub fn resolve(&self, name: &str) -> Result<RuleImpl> {
        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(RuleImpl::Builtin(builtin));
        }
        self.custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .map(RuleImpl::Custom)
            .ok_or_else(|| SchemaError::UnknownRule(name.to_string()))
    }

    /// Whether `name` is taken in either partition
    pub fn contains(&self, name: &str) -> bool {
        Self::is_reserved(name)
            || self
                .custom
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(name)
    }

    /// Names of the built-in rules, in declaration order
    pub fn builtin_names(&self) -> Vec<&'static str> {
        Builtin::ALL.iter().map(|b| b.name()).collect()
    }

    /// Names of the registered custom rules, sorted
    pub fn custom_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Register a custom rule in the process-wide registry
pub fn add_validator<F>(name: impl Into<String>, rule: F) -> Result<()>
where
    F: Fn(&Value, &str, &dyn Record, Option<&Value>) -> RuleOutcome + Send + Sync + 'static,
{
    RuleRegistry::global().register(name, rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_fails(_: &Value, _: &str, _: &dyn Record, _: Option<&Value>) -> RuleOutcome {
        RuleOutcome::fail("error dude")
    }

    #[test]
    fn test_builtins_resolve() {
        let registry = RuleRegistry::new();
        assert!(matches!(
            registry.resolve("required").unwrap(),
            RuleImpl::Builtin(Builtin::Required)
        ));
        assert!(matches!(
            registry.resolve("missing"),
            Err(SchemaError::UnknownRule(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_cannot_shadow_builtin() {
        let registry = RuleRegistry::new();
        for name in ["required", "pattern", "min", "in", "custom", "type"] {
            let result = registry.register(name, always_fails);
            assert!(matches!(result, Err(SchemaError::DuplicateRule(_))), "{name}");
        }
    }

    #[test]
    fn test_duplicate_custom_rule() {
        let registry = RuleRegistry::new();
        registry.register("dasds6231237123", always_fails).unwrap();
        let again = registry.register("dasds6231237123", always_fails);
        assert!(matches!(again, Err(SchemaError::DuplicateRule(_))));
    }

    #[test]
    fn test_distinct_custom_rules() {
        let registry = RuleRegistry::new();
        registry.register("first", always_fails).unwrap();
        registry.register("second", always_fails).unwrap();
        assert_eq!(registry.custom_names(), vec!["first", "second"]);
        assert!(registry.contains("first"));
        assert!(registry.contains("required"));
        assert!(matches!(registry.resolve("second").unwrap(), RuleImpl::Custom(_)));
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = RuleRegistry::new();
        let b = RuleRegistry::new();
        a.register("only_in_a", always_fails).unwrap();
        assert!(!b.contains("only_in_a"));
        b.register("only_in_a", always_fails).unwrap();
    }

    #[test]
    fn test_global_add_validator() {
        add_validator("registry_test_global_rule", always_fails).unwrap();
        assert!(RuleRegistry::global().contains("registry_test_global_rule"));
        assert!(add_validator("registry_test_global_rule", always_fails).is_err());
    }
}

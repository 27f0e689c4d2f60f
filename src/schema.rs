//! Schema types and loading
//!
//! A schema maps attribute paths to the rules declared for them:
//!
//! ```json
//! {
//!   "name":    { "required": true, "pattern": "^[a-zA-Z]+$", "minlength": 3 },
//!   "age":     { "type": "number", "min": 0, "max": 200 },
//!   "items[]": { "max": 100 }
//! }
//! ```
//!
//! Declaration order is kept for both attributes and rules.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::path::AttributePath;

/// One `{ruleType: description}` entry
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDescriptor {
    pub rule_type: String,
    pub description: Value,
}

impl RuleDescriptor {
    pub fn new(rule_type: impl Into<String>, description: impl Into<Value>) -> Self {
        Self {
            rule_type: rule_type.into(),
            description: description.into(),
        }
    }
}

/// All rules declared for one attribute path
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRules {
    pub path: AttributePath,
    pub rules: Vec<RuleDescriptor>,
}

/// An ordered validation schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entries: Vec<AttributeRules>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one rule to an attribute, creating the entry on first use.
    ///
    /// A rule type declared twice for the same path replaces the earlier
    /// description.
    pub fn rule(
        mut self,
        path: &str,
        rule_type: &str,
        description: impl Into<Value>,
    ) -> Result<Self> {
        self.push_rule(AttributePath::parse(path)?, RuleDescriptor::new(rule_type, description));
        Ok(self)
    }

    fn push_rule(&mut self, path: AttributePath, rule: RuleDescriptor) {
        let index = match self.entries.iter().position(|e| e.path == path) {
            Some(index) => index,
            None => {
                self.entries.push(AttributeRules {
                    path,
                    rules: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        let rules = &mut self.entries[index].rules;
        match rules.iter_mut().find(|r| r.rule_type == rule.rule_type) {
            Some(existing) => existing.description = rule.description,
            None => rules.push(rule),
        }
    }

    /// Build a schema from a JSON object of `path -> {rule -> description}`
    pub fn from_json(value: &Value) -> Result<Self> {
        let attributes = value
            .as_object()
            .ok_or_else(|| SchemaError::invalid("<root>", "schema must be an object"))?;
        Self::from_map(attributes)
    }

    fn from_map(attributes: &Map<String, Value>) -> Result<Self> {
        let mut schema = Self::new();
        for (raw, rules) in attributes {
            let path = AttributePath::parse(raw)?;
            let rules = rules
                .as_object()
                .ok_or_else(|| SchemaError::invalid(raw, "rules must be an object"))?;
            if rules.is_empty() {
                // Keep the attribute so it still shows up in `entries`.
                schema.entries.push(AttributeRules {
                    path,
                    rules: Vec::new(),
                });
                continue;
            }
            for (rule_type, description) in rules {
                schema.push_rule(path.clone(), RuleDescriptor::new(rule_type, description.clone()));
            }
        }
        Ok(schema)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_json(&value)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let value: Value = toml::from_str(content)?;
        Self::from_json(&value)
    }

    /// Load a schema file; `.toml` files are read as TOML, anything else as JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    pub fn entries(&self) -> &[AttributeRules] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rules declared for exactly this path
    pub fn get(&self, path: &str) -> Option<&AttributeRules> {
        let path = AttributePath::parse(path).ok()?;
        self.entries.iter().find(|e| e.path == path)
    }
}

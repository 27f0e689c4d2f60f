//! Rule Compiler
//!
//! Turns schema entries into parameter-bound checks. All description
//! validation happens here, so a compiled chain never fails at runtime; it
//! only reports error codes.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::host::{HostSpec, Record};
use crate::path::{AttributePath, Origin, Target};
use crate::registry::{CustomRule, RuleImpl, RuleRegistry, TYPE_ALIAS};
use crate::rules::{self, Builtin, ErrorCode, JsonKind, NonTextPolicy, RuleOutcome, DATE_PATTERN};
use crate::schema::AttributeRules;

/// Settings that change how descriptions are bound
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Treatment of non-string values by format rules
    pub non_text: NonTextPolicy,
    /// Replacement regex for `format: "date"`
    pub date_pattern: Option<String>,
}

enum CheckKind {
    Presence,
    Pattern(Regex),
    Length {
        min: Option<(usize, &'static str)>,
        max: Option<(usize, &'static str)>,
    },
    Min(f64),
    Max(f64),
    In(Vec<Value>),
    Email,
    Url,
    Number,
    Digits,
    Kind(JsonKind),
    Method(String),
    Registered {
        rule: Arc<dyn CustomRule>,
        description: Value,
    },
}

/// One compiled rule: the implementation plus its bound description
pub struct CompiledCheck {
    rule: String,
    non_text: NonTextPolicy,
    kind: CheckKind,
}

impl fmt::Debug for CompiledCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCheck").field("rule", &self.rule).finish()
    }
}

impl CompiledCheck {
    /// Name of the rule this check was compiled from
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Run against the value proposed for one concrete target
    pub fn run(&self, target: &Target<'_>, record: &dyn Record) -> RuleOutcome {
        let value = target.value;
        match &self.kind {
            CheckKind::Presence => match (target.origin, value) {
                (Origin::Created, None) => RuleOutcome::Valid,
                (Origin::Replaced, value) => rules::presence(&self.rule, None, value),
                (Origin::Stored, value) | (Origin::Created, value) => {
                    let prior = target.path.value_in(|name| record.get(name));
                    rules::presence(&self.rule, prior, value)
                }
            },
            CheckKind::Pattern(regex) => rules::pattern(&self.rule, regex, value, self.non_text),
            CheckKind::Length { min, max } => rules::length(*min, *max, value),
            CheckKind::Min(bound) => rules::min(*bound, value),
            CheckKind::Max(bound) => rules::max(*bound, value),
            CheckKind::In(allowed) => rules::one_of(allowed, value),
            CheckKind::Email => rules::email(value, self.non_text),
            CheckKind::Url => rules::url(value, self.non_text),
            CheckKind::Number => rules::number(value),
            CheckKind::Digits => rules::digits(value),
            CheckKind::Kind(kind) => rules::kind(*kind, &self.rule, value),
            CheckKind::Method(method) => record.call(method, &target.path.to_string(), value).into(),
            CheckKind::Registered { rule, description } => {
                rule.check(description, &target.path.to_string(), record, value)
            }
        }
    }
}

/// The ordered check chain for one schema path
#[derive(Debug)]
pub struct CompiledAttribute {
    path: AttributePath,
    checks: Vec<CompiledCheck>,
}

impl CompiledAttribute {
    /// The schema path (possibly a template) this chain was compiled for
    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    pub fn checks(&self) -> &[CompiledCheck] {
        &self.checks
    }

    /// Run every check and collect all codes. Nothing short-circuits.
    pub fn run(&self, target: &Target<'_>, record: &dyn Record) -> Vec<ErrorCode> {
        let mut errors = Vec::new();
        for check in &self.checks {
            check.run(target, record).collect_into(&mut errors);
        }
        errors
    }
}

/// Compiles schema entries against a registry and a host type
pub struct Compiler<'a> {
    registry: &'a RuleRegistry,
    host: &'a HostSpec,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a RuleRegistry, host: &'a HostSpec) -> Self {
        Self {
            registry,
            host,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile every rule declared for one attribute, in declaration order
    pub fn compile_attribute(&self, entry: &AttributeRules) -> Result<CompiledAttribute> {
        let path = entry.path.to_string();
        let checks = entry
            .rules
            .iter()
            .map(|r| self.compile_rule(&path, &r.rule_type, &r.description))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(attribute = %path, checks = checks.len(), "compiled attribute validator");
        Ok(CompiledAttribute {
            path: entry.path.clone(),
            checks,
        })
    }

    /// Compile one `{rule_type: description}` pair
    pub fn compile_rule(&self, path: &str, rule_type: &str, description: &Value) -> Result<CompiledCheck> {
        if rule_type == TYPE_ALIAS {
            let target = description
                .as_str()
                .ok_or_else(|| SchemaError::invalid(path, "type must name a rule"))?;
            let resolved = self
                .registry
                .resolve(target)
                .or_else(|_| self.registry.resolve(&target.to_ascii_lowercase()))
                .inspect_err(|_| tracing::debug!(attribute = %path, rule = %target, "unknown rule"))?;
            return self.bind(path, target, resolved, &Value::Bool(true));
        }

        let resolved = self
            .registry
            .resolve(rule_type)
            .inspect_err(|_| tracing::debug!(attribute = %path, rule = %rule_type, "unknown rule"))?;
        self.bind(path, rule_type, resolved, description)
    }

    fn bind(
        &self,
        path: &str,
        name: &str,
        resolved: RuleImpl,
        description: &Value,
    ) -> Result<CompiledCheck> {
        let (rule, kind) = match resolved {
            RuleImpl::Custom(rule) => (
                name.to_string(),
                CheckKind::Registered {
                    rule,
                    description: description.clone(),
                },
            ),
            RuleImpl::Builtin(builtin) => (
                builtin.name().to_string(),
                self.bind_builtin(path, builtin, description)?,
            ),
        };

        Ok(CompiledCheck {
            rule,
            non_text: self.options.non_text,
            kind,
        })
    }

    fn bind_builtin(&self, path: &str, builtin: Builtin, description: &Value) -> Result<CheckKind> {
        let kind = match builtin {
            Builtin::Required | Builtin::Presence => {
                if !rules::is_truthy(description) {
                    return Err(SchemaError::invalid(path, "presence requires true"));
                }
                CheckKind::Presence
            }
            Builtin::Pattern | Builtin::Format => {
                CheckKind::Pattern(self.pattern(path, builtin, description)?)
            }
            Builtin::Length => {
                let min = bound(path, "length min", description.get("min"))?;
                let max = bound(path, "length max", description.get("max"))?;
                if min.is_none() && max.is_none() {
                    return Err(SchemaError::invalid(path, "length needs bound"));
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(SchemaError::invalid(
                            path,
                            format!("length min {} exceeds max {}", lo, hi),
                        ));
                    }
                }
                CheckKind::Length {
                    min: min.map(|n| (n, "minLength")),
                    max: max.map(|n| (n, "maxLength")),
                }
            }
            Builtin::MinLength => {
                let n = bound(path, "minlength", Some(description))?
                    .ok_or_else(|| SchemaError::invalid(path, "minlength needs a bound"))?;
                CheckKind::Length {
                    min: Some((n, Builtin::MinLength.name())),
                    max: None,
                }
            }
            Builtin::MaxLength => {
                let n = bound(path, "maxlength", Some(description))?
                    .ok_or_else(|| SchemaError::invalid(path, "maxlength needs a bound"))?;
                CheckKind::Length {
                    min: None,
                    max: Some((n, Builtin::MaxLength.name())),
                }
            }
            Builtin::Min => CheckKind::Min(numeric(path, builtin, description)?),
            Builtin::Max => CheckKind::Max(numeric(path, builtin, description)?),
            Builtin::In => {
                let allowed = description
                    .as_array()
                    .ok_or_else(|| SchemaError::invalid(path, "in needs a list of allowed values"))?;
                CheckKind::In(allowed.clone())
            }
            Builtin::Email => CheckKind::Email,
            Builtin::Url => CheckKind::Url,
            Builtin::Number => CheckKind::Number,
            Builtin::Digits => CheckKind::Digits,
            Builtin::String => CheckKind::Kind(JsonKind::String),
            Builtin::Array => CheckKind::Kind(JsonKind::Array),
            Builtin::Boolean => CheckKind::Kind(JsonKind::Boolean),
            Builtin::Custom => {
                let method = description
                    .as_str()
                    .ok_or_else(|| SchemaError::invalid(path, "custom method name must be a string"))?;
                if !self.host.has_method(method) {
                    return Err(SchemaError::invalid(
                        path,
                        format!("custom method missing: {} on {}", method, self.host.type_name()),
                    ));
                }
                CheckKind::Method(method.to_string())
            }
        };
        Ok(kind)
    }

    fn pattern(&self, path: &str, builtin: Builtin, description: &Value) -> Result<Regex> {
        let source = description
            .as_str()
            .ok_or_else(|| SchemaError::invalid(path, format!("{} must be a regex string", builtin)))?;

        let source = match (builtin, source) {
            (Builtin::Format, "date") => self.options.date_pattern.as_deref().unwrap_or(DATE_PATTERN),
            _ => source,
        };

        Regex::new(source)
            .map_err(|e| SchemaError::invalid(path, format!("invalid {} regex: {}", builtin, e)))
    }
}

fn bound(path: &str, what: &str, value: Option<&Value>) -> Result<Option<usize>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| SchemaError::invalid(path, format!("{} must be a non-negative integer", what))),
    }
}

fn numeric(path: &str, builtin: Builtin, value: &Value) -> Result<f64> {
    rules::as_number(value)
        .ok_or_else(|| SchemaError::invalid(path, format!("{} needs a numeric bound", builtin)))
}

//! Built-in validation rules
//!
//! Each built-in is a pure function of its bound parameters, the incoming
//! value and (for presence) the value already stored on the record.
//!
//! ## Absent values
//!
//! An unset value (`None`) or `null` passes every built-in except the
//! presence rules. Optional attributes are declared simply by leaving
//! `required` off.
//!
//! ## Non-string values
//!
//! `pattern`, `format`, `email` and `url` only judge strings. What happens to
//! any other JSON value is decided by [`NonTextPolicy`]. Length rules always
//! skip non-strings; `number` and `digits` accept JSON numbers as well.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code reported for a failed rule
pub type ErrorCode = String;

/// Default regex behind `format: "date"`
pub const DATE_PATTERN: &str = r"^[0-3]?[0-9]/[01]?[0-9]/[12][90][0-9][0-9]$";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap()
});
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?|ftp)://[^\s/?#.]+(\.[^\s/?#.]+)*(:\d+)?([/?#]\S*)?$").unwrap()
});
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// What one check reported
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuleOutcome {
    #[default]
    Valid,
    Invalid(ErrorCode),
    InvalidMany(Vec<ErrorCode>),
}

impl RuleOutcome {
    pub fn fail(code: impl Into<ErrorCode>) -> Self {
        RuleOutcome::Invalid(code.into())
    }

    /// `Valid` for an empty list, otherwise every code in order
    pub fn from_codes(codes: Vec<ErrorCode>) -> Self {
        if codes.is_empty() {
            RuleOutcome::Valid
        } else {
            RuleOutcome::InvalidMany(codes)
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            RuleOutcome::Valid => true,
            RuleOutcome::Invalid(_) => false,
            RuleOutcome::InvalidMany(codes) => codes.is_empty(),
        }
    }

    /// Append this outcome's codes to `errors`
    pub fn collect_into(self, errors: &mut Vec<ErrorCode>) {
        match self {
            RuleOutcome::Valid => {}
            RuleOutcome::Invalid(code) => errors.push(code),
            RuleOutcome::InvalidMany(codes) => errors.extend(codes),
        }
    }
}

impl From<Option<ErrorCode>> for RuleOutcome {
    fn from(code: Option<ErrorCode>) -> Self {
        code.map_or(RuleOutcome::Valid, RuleOutcome::Invalid)
    }
}

/// How format rules treat values that are not strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonTextPolicy {
    /// Treat the value as valid
    #[default]
    Bypass,
    /// Fail with the rule's code
    Reject,
}

/// The fixed set of rules every registry knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Required,
    Presence,
    Pattern,
    Format,
    Length,
    MinLength,
    MaxLength,
    Min,
    Max,
    In,
    Email,
    Url,
    Number,
    Digits,
    String,
    Array,
    Boolean,
    Custom,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Required,
        Builtin::Presence,
        Builtin::Pattern,
        Builtin::Format,
        Builtin::Length,
        Builtin::MinLength,
        Builtin::MaxLength,
        Builtin::Min,
        Builtin::Max,
        Builtin::In,
        Builtin::Email,
        Builtin::Url,
        Builtin::Number,
        Builtin::Digits,
        Builtin::String,
        Builtin::Array,
        Builtin::Boolean,
        Builtin::Custom,
    ];

    /// Schema name of the rule, which is also its error code
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Required => "required",
            Builtin::Presence => "presence",
            Builtin::Pattern => "pattern",
            Builtin::Format => "format",
            Builtin::Length => "length",
            Builtin::MinLength => "minlength",
            Builtin::MaxLength => "maxlength",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::In => "in",
            Builtin::Email => "email",
            Builtin::Url => "url",
            Builtin::Number => "number",
            Builtin::Digits => "digits",
            Builtin::String => "string",
            Builtin::Array => "array",
            Builtin::Boolean => "boolean",
            Builtin::Custom => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// JSON types checked by the `string`, `array` and `boolean` rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    String,
    Array,
    Boolean,
}

impl JsonKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            JsonKind::String => value.is_string(),
            JsonKind::Array => value.is_array(),
            JsonKind::Boolean => value.is_boolean(),
        }
    }
}

/// Loose truthiness of a schema description (`false`, `null`, `0`, `""` are falsy)
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric reading of a value: JSON numbers and numeric strings
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// `null` and `""` always fail; an unset value fails only when the record
/// holds no prior value either.
pub fn presence(code: &str, prior: Option<&Value>, value: Option<&Value>) -> RuleOutcome {
    let missing = match value {
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
        None => is_absent(prior),
    };
    if missing {
        RuleOutcome::fail(code)
    } else {
        RuleOutcome::Valid
    }
}

fn text_rule(
    code: &str,
    value: Option<&Value>,
    policy: NonTextPolicy,
    accepts: impl Fn(&str) -> bool,
) -> RuleOutcome {
    match value {
        None | Some(Value::Null) => RuleOutcome::Valid,
        Some(Value::String(s)) if accepts(s) => RuleOutcome::Valid,
        Some(Value::String(_)) => RuleOutcome::fail(code),
        Some(_) => match policy {
            NonTextPolicy::Bypass => RuleOutcome::Valid,
            NonTextPolicy::Reject => RuleOutcome::fail(code),
        },
    }
}

pub fn pattern(code: &str, regex: &Regex, value: Option<&Value>, policy: NonTextPolicy) -> RuleOutcome {
    text_rule(code, value, policy, |s| regex.is_match(s))
}

pub fn email(value: Option<&Value>, policy: NonTextPolicy) -> RuleOutcome {
    text_rule(Builtin::Email.name(), value, policy, |s| EMAIL_RE.is_match(s))
}

pub fn url(value: Option<&Value>, policy: NonTextPolicy) -> RuleOutcome {
    text_rule(Builtin::Url.name(), value, policy, |s| URL_RE.is_match(s))
}

/// Character-length bounds on strings.
///
/// Codes are reported in order, under-minimum first.
pub fn length(
    min: Option<(usize, &str)>,
    max: Option<(usize, &str)>,
    value: Option<&Value>,
) -> RuleOutcome {
    let Some(Value::String(s)) = value else {
        return RuleOutcome::Valid;
    };
    let len = s.chars().count();
    let mut codes = Vec::new();
    if let Some((bound, code)) = min {
        if len < bound {
            codes.push(code.to_string());
        }
    }
    if let Some((bound, code)) = max {
        if len > bound {
            codes.push(code.to_string());
        }
    }
    RuleOutcome::from_codes(codes)
}

pub fn min(bound: f64, value: Option<&Value>) -> RuleOutcome {
    match value.and_then(as_number) {
        Some(n) if n < bound => RuleOutcome::fail(Builtin::Min.name()),
        _ => RuleOutcome::Valid,
    }
}

pub fn max(bound: f64, value: Option<&Value>) -> RuleOutcome {
    match value.and_then(as_number) {
        Some(n) if n > bound => RuleOutcome::fail(Builtin::Max.name()),
        _ => RuleOutcome::Valid,
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

pub fn one_of(allowed: &[Value], value: Option<&Value>) -> RuleOutcome {
    match value {
        None | Some(Value::Null) => RuleOutcome::Valid,
        Some(v) if allowed.iter().any(|a| same_value(a, v)) => RuleOutcome::Valid,
        Some(_) => RuleOutcome::fail(Builtin::In.name()),
    }
}

pub fn number(value: Option<&Value>) -> RuleOutcome {
    match value {
        None | Some(Value::Null) | Some(Value::Number(_)) => RuleOutcome::Valid,
        Some(Value::String(s)) if NUMBER_RE.is_match(s) => RuleOutcome::Valid,
        Some(_) => RuleOutcome::fail(Builtin::Number.name()),
    }
}

pub fn digits(value: Option<&Value>) -> RuleOutcome {
    match value {
        None | Some(Value::Null) => RuleOutcome::Valid,
        Some(Value::Number(n)) if n.is_u64() => RuleOutcome::Valid,
        Some(Value::String(s)) if DIGITS_RE.is_match(s) => RuleOutcome::Valid,
        Some(_) => RuleOutcome::fail(Builtin::Digits.name()),
    }
}

pub fn kind(kind: JsonKind, code: &str, value: Option<&Value>) -> RuleOutcome {
    match value {
        None | Some(Value::Null) => RuleOutcome::Valid,
        Some(v) if kind.accepts(v) => RuleOutcome::Valid,
        Some(_) => RuleOutcome::fail(code),
    }
}

//! Attribute paths
//!
//! Parses the dotted/bracketed attribute path syntax (`name`, `items[]`,
//! `items[2]`, `a.b[].c`) into a list of fragments and resolves those
//! fragments against live data.
//!
//! ## Inflation
//!
//! A path containing an array template (`[]`) never carries a value of its
//! own. Before validation it is inflated against the data into one concrete
//! path per array element:
//!
//! ```text
//! schema path      data                         concrete targets
//! items[]          {"items": [101, 89]}         items[0] = 101, items[1] = 89
//! a.b[].c          {"a": {"b": [{"c": 1}]}}     a.b[0].c = 1
//! items[]          {"items": []}                (none)
//! ```
//!
//! A path without templates always yields exactly one target, unset when
//! anything along the way is missing. Under a template, missing or
//! non-container intermediates yield no targets and a missing leaf under an
//! existing container yields a target with no value.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// How a single path fragment addresses its field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Plain field (`name`)
    Scalar,
    /// Every element of an array field (`items[]`)
    ArrayTemplate,
    /// One element of an array field (`items[3]`)
    ArrayElement(usize),
}

/// One dot-separated step of an attribute path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    pub name: String,
    pub kind: FragmentKind,
}

impl Fragment {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FragmentKind::Scalar,
        }
    }

    pub fn element(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            kind: FragmentKind::ArrayElement(index),
        }
    }

    fn parse(raw: &str, part: &str) -> Result<Self> {
        let Some(open) = part.find('[') else {
            if part.is_empty() {
                return Err(SchemaError::bad_path(raw, "empty fragment"));
            }
            if part.contains(']') {
                return Err(SchemaError::bad_path(raw, format!("unexpected ']' in '{}'", part)));
            }
            return Ok(Self::scalar(part));
        };

        let name = &part[..open];
        if name.is_empty() {
            return Err(SchemaError::bad_path(raw, "missing field name before '['"));
        }
        let inner = part[open + 1..]
            .strip_suffix(']')
            .ok_or_else(|| SchemaError::bad_path(raw, format!("unclosed '[' in '{}'", part)))?;

        if inner.is_empty() {
            return Ok(Self {
                name: name.to_string(),
                kind: FragmentKind::ArrayTemplate,
            });
        }

        let index = inner
            .parse::<usize>()
            .map_err(|_| SchemaError::bad_path(raw, format!("invalid array index '{}'", inner)))?;
        Ok(Self::element(name, index))
    }

    /// Whether this concrete fragment is addressed by `pattern`.
    ///
    /// `items[3]` is covered by both `items[]` and `items[3]`; scalars only
    /// by the same scalar.
    fn covered_by(&self, pattern: &Fragment) -> bool {
        if self.name != pattern.name {
            return false;
        }
        match (self.kind, pattern.kind) {
            (FragmentKind::Scalar, FragmentKind::Scalar) => true,
            (FragmentKind::ArrayElement(_), FragmentKind::ArrayTemplate) => true,
            (FragmentKind::ArrayElement(a), FragmentKind::ArrayElement(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FragmentKind::Scalar => write!(f, "{}", self.name),
            FragmentKind::ArrayTemplate => write!(f, "{}[]", self.name),
            FragmentKind::ArrayElement(index) => write!(f, "{}[{}]", self.name, index),
        }
    }
}

/// A parsed attribute path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    fragments: Vec<Fragment>,
}

impl AttributePath {
    /// Parse a path such as `a.b[].c` or `items[2]`
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(SchemaError::bad_path(raw, "empty path"));
        }
        let fragments = raw
            .split('.')
            .map(|part| Fragment::parse(raw, part))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fragments })
    }

    fn from_fragments(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Name of the top-level attribute this path starts at
    pub fn root(&self) -> &str {
        self.fragments.first().map(|f| f.name.as_str()).unwrap_or_default()
    }

    /// True if any fragment is an un-indexed array marker
    pub fn is_template(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| f.kind == FragmentKind::ArrayTemplate)
    }

    /// The template form of this path: every index replaced by `[]`
    pub fn template(&self) -> AttributePath {
        let fragments = self
            .fragments
            .iter()
            .map(|f| match f.kind {
                FragmentKind::ArrayElement(_) => Fragment {
                    name: f.name.clone(),
                    kind: FragmentKind::ArrayTemplate,
                },
                _ => f.clone(),
            })
            .collect();
        Self { fragments }
    }

    /// Array indices in this path, outermost first
    pub fn indices(&self) -> Vec<usize> {
        self.fragments
            .iter()
            .filter_map(|f| match f.kind {
                FragmentKind::ArrayElement(index) => Some(index),
                _ => None,
            })
            .collect()
    }

    /// Whether this concrete path is one of the paths `pattern` describes
    pub fn matches(&self, pattern: &AttributePath) -> bool {
        self.len() == pattern.len()
            && self
                .fragments
                .iter()
                .zip(&pattern.fragments)
                .all(|(concrete, p)| concrete.covered_by(p))
    }

    /// Read the value at this concrete path.
    ///
    /// Template fragments and missing intermediates resolve to `None`.
    pub fn value_in<'v, F>(&self, get: F) -> Option<&'v Value>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        let mut current: Option<&'v Value> = None;
        for (depth, fragment) in self.fragments.iter().enumerate() {
            let field = if depth == 0 {
                get(&fragment.name)
            } else {
                current?.as_object()?.get(&fragment.name)
            };
            current = match fragment.kind {
                FragmentKind::Scalar => field,
                FragmentKind::ArrayElement(index) => field?.as_array()?.get(index),
                FragmentKind::ArrayTemplate => return None,
            };
        }
        current
    }

    /// Expand this path against a full document whose top-level attributes
    /// are read through `get`.
    ///
    /// Targets come out in ascending index order.
    pub fn inflate<'v, F>(&self, get: F) -> Vec<Target<'v>>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        if !self.is_template() {
            return vec![Target::new(self.clone(), self.value_in(get))];
        }

        let mut out = Vec::new();
        let Some(first) = self.fragments.first() else {
            return out;
        };
        let mut prefix = Vec::with_capacity(self.len());
        expand_field(&self.fragments, 0, get(&first.name), &mut prefix, &mut out);
        out
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", fragment)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for AttributePath {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Where an unset target value came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Origin {
    /// Read from the record, or untouched by the change set. Presence falls
    /// back to the stored value.
    #[default]
    Stored,
    /// Inside a container the change set replaces. Nothing is stored there
    /// afterwards unless the replacement supplies it.
    Replaced,
    /// An ancestor of a changed key. Assigning the key creates it.
    Created,
}

/// A concrete path and the value found for it (`None` when unset)
#[derive(Debug, Clone, PartialEq)]
pub struct Target<'v> {
    pub path: AttributePath,
    pub value: Option<&'v Value>,
    pub origin: Origin,
}

impl<'v> Target<'v> {
    pub fn new(path: AttributePath, value: Option<&'v Value>) -> Self {
        Self {
            path,
            value,
            origin: Origin::Stored,
        }
    }
}

// `prefix` holds the concrete fragments for every depth before `depth`.
fn expand_field<'v>(
    fragments: &[Fragment],
    depth: usize,
    field: Option<&'v Value>,
    prefix: &mut Vec<Fragment>,
    out: &mut Vec<Target<'v>>,
) {
    let fragment = &fragments[depth];
    match fragment.kind {
        FragmentKind::Scalar => {
            prefix.push(fragment.clone());
            descend(fragments, depth, field, prefix, out);
            prefix.pop();
        }
        FragmentKind::ArrayTemplate => {
            let Some(items) = field.and_then(Value::as_array) else {
                return;
            };
            tracing::trace!(field = %fragment.name, len = items.len(), "inflating array template");
            for (index, item) in items.iter().enumerate() {
                prefix.push(Fragment::element(fragment.name.clone(), index));
                descend(fragments, depth, Some(item), prefix, out);
                prefix.pop();
            }
        }
        FragmentKind::ArrayElement(index) => {
            let Some(items) = field.and_then(Value::as_array) else {
                return;
            };
            prefix.push(fragment.clone());
            descend(fragments, depth, items.get(index), prefix, out);
            prefix.pop();
        }
    }
}

// `prefix` holds the concrete fragments up to and including `depth`.
fn descend<'v>(
    fragments: &[Fragment],
    depth: usize,
    value: Option<&'v Value>,
    prefix: &mut Vec<Fragment>,
    out: &mut Vec<Target<'v>>,
) {
    if depth + 1 == fragments.len() {
        out.push(Target::new(AttributePath::from_fragments(prefix.clone()), value));
        return;
    }
    let Some(object) = value.and_then(Value::as_object) else {
        return;
    };
    let next = &fragments[depth + 1];
    expand_field(fragments, depth + 1, object.get(&next.name), prefix, out);
}

/// The parsed keys of a partial update (delta mode)
#[derive(Debug, Default)]
pub struct ChangeSet<'v> {
    changes: Vec<(AttributePath, &'v Value)>,
}

impl<'v> ChangeSet<'v> {
    /// Parse every key of `delta`.
    ///
    /// Keys that are not valid paths cannot match any schema entry and are
    /// dropped; template keys (`items[]`) are kept but never produce targets.
    pub fn new(delta: &'v Map<String, Value>) -> Self {
        let changes = delta
            .iter()
            .filter_map(|(key, value)| match AttributePath::parse(key) {
                Ok(path) => Some((path, value)),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping unparseable changed key");
                    None
                }
            })
            .collect();
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Value supplied for exactly this top-level attribute, if any
    pub fn get(&self, attr: &str) -> Option<&'v Value> {
        self.changes
            .iter()
            .find(|(path, _)| path.len() == 1 && path.fragments[0] == Fragment::scalar(attr))
            .map(|(_, value)| *value)
    }

    /// Concrete targets of `pattern` touched by this change set.
    ///
    /// A changed key either names a concrete path `pattern` describes, or is
    /// a container further up the pattern, in which case the rest of the
    /// pattern is inflated inside the changed value. An indexed key wins over
    /// a container key covering the same element. A key reaching below
    /// `pattern` marks the concrete ancestor as created. A pattern without
    /// array templates always yields its single target, unset when untouched.
    pub fn targets(&self, pattern: &AttributePath) -> Vec<Target<'v>> {
        let mut found: BTreeMap<Vec<usize>, Target<'v>> = BTreeMap::new();
        let mut created = Vec::new();
        let mut replaced = false;

        for (key, value) in &self.changes {
            if key.is_template() {
                continue;
            }
            if key.len() > pattern.len() {
                let ancestor = &key.fragments[..pattern.len()];
                if ancestor.iter().zip(&pattern.fragments).all(|(concrete, p)| concrete.covered_by(p)) {
                    created.push(AttributePath::from_fragments(ancestor.to_vec()));
                }
                continue;
            }
            let n = key.len();
            let parents_match = key.fragments[..n - 1]
                .iter()
                .zip(&pattern.fragments)
                .all(|(concrete, p)| concrete.covered_by(p));
            if !parents_match {
                continue;
            }

            let last = &key.fragments[n - 1];
            let pattern_last = &pattern.fragments[n - 1];
            let mut inflated = Vec::new();

            if last.covered_by(pattern_last) {
                if n == pattern.len() {
                    continue;
                }
                let mut prefix = key.fragments.clone();
                descend(&pattern.fragments, n - 1, Some(*value), &mut prefix, &mut inflated);
            } else if last.kind == FragmentKind::Scalar
                && last.name == pattern_last.name
                && pattern_last.kind != FragmentKind::Scalar
            {
                // The changed key is the array container itself.
                let mut prefix = key.fragments[..n - 1].to_vec();
                expand_field(&pattern.fragments, n - 1, Some(*value), &mut prefix, &mut inflated);
            } else {
                continue;
            }

            replaced = true;
            for mut target in inflated {
                target.origin = Origin::Replaced;
                found.entry(target.path.indices()).or_insert(target);
            }
        }

        for path in created {
            let target = found.entry(path.indices()).or_insert_with(|| Target::new(path, None));
            if target.value.is_none() {
                target.origin = Origin::Created;
            }
        }

        for (key, value) in &self.changes {
            if !key.is_template() && key.matches(pattern) {
                found.insert(key.indices(), Target::new(key.clone(), Some(*value)));
            }
        }

        if found.is_empty() && !pattern.is_template() {
            let mut target = Target::new(pattern.clone(), None);
            if replaced {
                target.origin = Origin::Replaced;
            }
            return vec![target];
        }

        found.into_values().collect()
    }
}

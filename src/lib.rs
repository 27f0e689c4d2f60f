//! Attribute Validations
//!
//! A declarative validation engine for record-like objects. A schema maps
//! attribute paths to rules; the schema is compiled once per host type into
//! chains of parameter-bound checks, and those chains judge either a whole
//! record or a proposed change set before it is applied.
//!
//! ## Features
//!
//! - **Nested paths**: `address.city`, `items[2]`, `orders[].lines[].qty`
//! - **Template inflation**: `items[]` is expanded against the data to one
//!   concrete path per element
//! - **Delta validation**: only the indices a change set touches are judged
//! - **Extensible rules**: process-wide registry of custom rules, plus
//!   per-host `custom` methods
//! - **Accumulating results**: every failing rule contributes its code; no
//!   short-circuit
//!
//! ## Architecture
//!
//! ```text
//! Schema ──► Compiler ──► Validator ──┬─► ValidationErrors ──► report() ──► EventSink
//!              ▲             ▲        │
//!        RuleRegistry   ValidatorCache│
//!                                     └─ AttributePath::inflate / ChangeSet::targets
//!                                               ▲
//!                                            Record (host)
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod host;
pub mod path;
pub mod registry;
pub mod report;
pub mod rules;
pub mod schema;
pub mod validator;

pub use compiler::{CompileOptions, Compiler};
pub use config::ValidationsConfig;
pub use error::{Result, SchemaError};
pub use host::{Event, HostSpec, Model, ModelType, Record, UNASSIGNABLE};
pub use path::{AttributePath, ChangeSet, Origin, Target};
pub use registry::{add_validator, CustomRule, RuleRegistry};
pub use report::{report, EventSink, Signal};
pub use rules::{ErrorCode, NonTextPolicy, RuleOutcome};
pub use schema::Schema;
pub use validator::{ValidationErrors, Validator, ValidatorCache};

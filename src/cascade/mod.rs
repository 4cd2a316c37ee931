//! Cascade Module
//!
//! Rule engine that narrows the allowed values of dependent fields from the
//! values currently selected in their parent fields.

mod config;
mod engine;
mod error;
mod map;
mod options;

pub use config::{CascadeConfiguration, CascadeDefinition, CascadeRuleSet, FieldRestriction, UNRESTRICTED_TOKEN};
pub use engine::{CascadeEngine, CascadeOutcome};
pub use error::{CascadeError, CascadeResult, ConfigurationError};
pub use map::{CascadeEntry, CascadeMap};
pub use options::{compute_options, FieldOptions};

/// Key carrying hint text inside a cascade definition
pub const HINT_KEY: &str = "HINT";

/// Keys allowed inside a cascade definition that never name a field
pub const RESERVED_FIELD_NAMES: &[&str] = &[HINT_KEY];

/// Whether a definition key is rule metadata rather than a field reference
pub fn is_reserved_field_name(name: &str) -> bool {
    RESERVED_FIELD_NAMES.contains(&name)
}

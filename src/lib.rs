//! Work Item Cascades
//!
//! Cascading allowed-value rules for work item forms:
//! - Typed cascade configuration (JSON / YAML)
//! - Affected-field resolution and per-field intersection of parent rules
//! - Filtering and validation against a host form
//! - Configuration validation against a project's field catalog

pub mod cascade;
pub mod form;
pub mod hints;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use cascade::{CascadeConfiguration, CascadeEngine, CascadeMap, CascadeOutcome};
pub use form::{FieldCatalog, FormService};
pub use validation::ConfigurationValidator;

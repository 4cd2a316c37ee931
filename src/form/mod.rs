//! Form Collaborators
//!
//! The cascade engine never owns field state. It talks to the host form and
//! to the project's field catalog through the traits below.

mod memory;

pub use memory::{InMemoryForm, StaticFieldCatalog};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Host form holding the work item being edited
#[async_trait]
pub trait FormService: Send + Sync {
    /// Current value of a field, `None` when nothing is selected
    async fn get_field_value(&self, field: &str) -> Result<Option<String>>;

    /// Full schema-defined allowed values of a field
    async fn get_allowed_field_values(&self, field: &str) -> Result<Vec<String>>;

    /// Restrict the values a user may pick for a field
    async fn filter_allowed_field_values(&self, field: &str, values: &[String]) -> Result<()>;

    /// The restricted set currently in force for a field
    async fn get_filtered_allowed_field_values(&self, field: &str) -> Result<Vec<String>>;

    async fn set_error(&self, message: &str) -> Result<()>;

    async fn clear_error(&self) -> Result<()>;
}

/// A field known to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    pub reference_name: String,
    #[serde(default)]
    pub name: String,
}

impl FieldInfo {
    pub fn new(reference_name: impl Into<String>) -> Self {
        let reference_name = reference_name.into();
        Self {
            name: reference_name.clone(),
            reference_name,
        }
    }
}

/// Remote metadata service listing the fields of a project
#[async_trait]
pub trait FieldCatalog: Send + Sync {
    async fn fields(&self, project: &str) -> Result<Vec<FieldInfo>>;
}

/// `None` and `""` both mean "no value selected"
pub(crate) fn selected(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

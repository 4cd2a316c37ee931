//! Configuration Validation
//!
//! Checks a cascade configuration against the fields a project actually
//! defines. Advisory only: the engine runs whatever configuration it is given.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::cascade::{CascadeConfiguration, CascadeResult, ConfigurationError};
use crate::form::FieldCatalog;

/// Validates configurations for one project. The field catalog is fetched on
/// first use and kept for the validator's lifetime; build a new validator to
/// pick up schema changes.
pub struct ConfigurationValidator {
    project: String,
    catalog: Arc<dyn FieldCatalog>,
    known_fields: OnceCell<HashSet<String>>,
}

impl ConfigurationValidator {
    pub fn new(project: impl Into<String>, catalog: Arc<dyn FieldCatalog>) -> Self {
        Self {
            project: project.into(),
            catalog,
            known_fields: OnceCell::new(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// `None` when every field name is known, otherwise the unknown names:
    /// parent fields first, then dependent fields in configuration order.
    /// A name is reported once, however many rules mention it, so a dependent
    /// that is also an unknown parent only shows up in the parent section.
    pub async fn validate(&self, config: &CascadeConfiguration) -> CascadeResult<Option<Vec<String>>> {
        let known = self.known_fields().await?;

        let parents = config.parents().keys();
        let dependents = config
            .parents()
            .values()
            .flat_map(|rules| rules.values())
            .flat_map(|definition| definition.fields().keys());

        let mut invalid: Vec<String> = Vec::new();
        for name in parents.chain(dependents) {
            if !known.contains(name) && !invalid.contains(name) {
                invalid.push(name.clone());
            }
        }

        if invalid.is_empty() {
            Ok(None)
        } else {
            tracing::warn!("Cascade configuration for project '{}' names unknown fields: {:?}", self.project, invalid);
            Ok(Some(invalid))
        }
    }

    /// Like [`validate`](Self::validate), but unknown fields are an error
    pub async fn ensure_valid(&self, config: &CascadeConfiguration) -> CascadeResult<()> {
        match self.validate(config).await? {
            None => Ok(()),
            Some(invalid) => Err(ConfigurationError::UnknownFields(invalid).into()),
        }
    }

    async fn known_fields(&self) -> CascadeResult<&HashSet<String>> {
        let fields = self
            .known_fields
            .get_or_try_init(|| async {
                let fields = self.catalog.fields(&self.project).await?;
                tracing::debug!("Fetched {} fields for project '{}'", fields.len(), self.project);
                Ok::<_, anyhow::Error>(fields.into_iter().map(|f| f.reference_name).collect())
            })
            .await?;
        Ok(fields)
    }
}

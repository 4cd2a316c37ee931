//! In-memory form and field catalog, used by the console and by tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tokio::sync::RwLock;

use super::{FieldCatalog, FieldInfo, FormService};

#[derive(Debug, Default)]
struct FormState {
    values: HashMap<String, String>,
    filtered: HashMap<String, Vec<String>>,
    error: Option<String>,
}

/// A form whose schema is a fixed map of field → allowed values
#[derive(Debug, Default)]
pub struct InMemoryForm {
    schema: BTreeMap<String, Vec<String>>,
    state: RwLock<FormState>,
}

impl InMemoryForm {
    pub fn new(schema: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            schema,
            state: RwLock::new(FormState::default()),
        }
    }

    /// Read a schema from a JSON object of `field: [values...]`
    pub async fn from_schema_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read form schema {:?}", path))?;
        let schema = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse form schema {:?}", path))?;
        Ok(Self::new(schema))
    }

    pub fn with_field<I, S>(mut self, field: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.insert(field.into(), allowed.into_iter().map(Into::into).collect());
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.schema.keys().map(String::as_str)
    }

    /// Set (or clear, with `None`) the value a user picked
    pub async fn set_value(&self, field: &str, value: Option<&str>) -> Result<()> {
        self.ensure_known(field)?;
        let mut state = self.state.write().await;
        match value {
            Some(value) => state.values.insert(field.to_string(), value.to_string()),
            None => state.values.remove(field),
        };
        Ok(())
    }

    pub async fn value(&self, field: &str) -> Option<String> {
        self.state.read().await.values.get(field).cloned()
    }

    /// Error currently shown on the form
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Restriction applied by the last filter call, if any
    pub async fn filtered(&self, field: &str) -> Option<Vec<String>> {
        self.state.read().await.filtered.get(field).cloned()
    }

    fn ensure_known(&self, field: &str) -> Result<&Vec<String>> {
        self.schema
            .get(field)
            .with_context(|| format!("Unknown field: {}", field))
    }
}

#[async_trait]
impl FormService for InMemoryForm {
    async fn get_field_value(&self, field: &str) -> Result<Option<String>> {
        self.ensure_known(field)?;
        Ok(self.value(field).await)
    }

    async fn get_allowed_field_values(&self, field: &str) -> Result<Vec<String>> {
        Ok(self.ensure_known(field)?.clone())
    }

    async fn filter_allowed_field_values(&self, field: &str, values: &[String]) -> Result<()> {
        self.ensure_known(field)?;
        let mut state = self.state.write().await;
        state.filtered.insert(field.to_string(), values.to_vec());
        Ok(())
    }

    async fn get_filtered_allowed_field_values(&self, field: &str) -> Result<Vec<String>> {
        let allowed = self.ensure_known(field)?;
        let state = self.state.read().await;
        Ok(state.filtered.get(field).unwrap_or(allowed).clone())
    }

    async fn set_error(&self, message: &str) -> Result<()> {
        self.state.write().await.error = Some(message.to_string());
        Ok(())
    }

    async fn clear_error(&self) -> Result<()> {
        self.state.write().await.error = None;
        Ok(())
    }
}

/// Field catalog backed by a fixed project → fields table
#[derive(Debug, Default)]
pub struct StaticFieldCatalog {
    projects: HashMap<String, Vec<FieldInfo>>,
    fetches: AtomicUsize,
}

impl StaticFieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project<I, S>(mut self, project: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projects
            .insert(project.into(), fields.into_iter().map(FieldInfo::new).collect());
        self
    }

    /// Number of `fields` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FieldCatalog for StaticFieldCatalog {
    async fn fields(&self, project: &str) -> Result<Vec<FieldInfo>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.projects
            .get(project)
            .cloned()
            .with_context(|| format!("Unknown project: {}", project))
    }
}

//! Cascade Hints
//!
//! Best-effort guidance shown to a user when a parent field changes. A hint
//! failure never stops a cascade pass.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cascade::CascadeMap;

#[async_trait]
pub trait FieldHinter: Send + Sync {
    /// Surface guidance for `field` now holding `value`
    async fn hint_field_value(&self, map: &CascadeMap, field: &str, value: Option<&str>) -> Result<()>;

    /// Called when the engine turns hinting on or off for the session
    fn set_enabled(&self, _enabled: bool) {}
}

/// Drops every hint
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHinter;

#[async_trait]
impl FieldHinter for NoopHinter {
    async fn hint_field_value(&self, _map: &CascadeMap, _field: &str, _value: Option<&str>) -> Result<()> {
        Ok(())
    }
}

/// Emits the `HINT` text of the matching definition as a tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHinter;

#[async_trait]
impl FieldHinter for TracingHinter {
    async fn hint_field_value(&self, map: &CascadeMap, field: &str, value: Option<&str>) -> Result<()> {
        if let Some(hint) = value.and_then(|v| map.hint(field, v)) {
            tracing::info!(field, value = value.unwrap_or_default(), "💡 {}", hint);
        }
        Ok(())
    }
}

/// Keeps every hint it resolves; handy for inspecting what a user would see
#[derive(Debug, Default)]
pub struct CollectingHinter {
    hints: Mutex<Vec<(String, String)>>,
}

impl CollectingHinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(field, hint)` pairs in the order they were surfaced
    pub fn hints(&self) -> Vec<(String, String)> {
        self.buffer().clone()
    }

    // a panic while pushing cannot leave a half-written pair behind
    fn buffer(&self) -> MutexGuard<'_, Vec<(String, String)>> {
        self.hints.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FieldHinter for CollectingHinter {
    async fn hint_field_value(&self, map: &CascadeMap, field: &str, value: Option<&str>) -> Result<()> {
        if let Some(hint) = value.and_then(|v| map.hint(field, v)) {
            self.buffer().push((field.to_string(), hint.to_string()));
        }
        Ok(())
    }
}

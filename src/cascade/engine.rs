//! Cascade Engine
//!
//! Drives one field change through resolution, intersection, filtering and
//! validation against the host form. A pass stops at the first field whose
//! current value falls outside its filtered set.

use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::CascadeConfiguration;
use super::error::{CascadeError, CascadeResult};
use super::map::CascadeMap;
use super::options::{compute_options, FieldOptions};
use crate::form::{selected, FormService};
use crate::hints::{FieldHinter, NoopHinter};

/// What a single cascade pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// The triggering field is not a parent; nothing was filtered
    NotAParent,
    /// Every affected field was filtered and holds an allowed value
    Applied(FieldOptions),
    /// Stopped at `field`; fields listed in `filtered` were filtered before it
    Invalid {
        field: String,
        value: String,
        filtered: Vec<String>,
    },
}

impl CascadeOutcome {
    pub fn is_valid(&self) -> bool {
        !matches!(self, CascadeOutcome::Invalid { .. })
    }
}

pub struct CascadeEngine {
    map: CascadeMap,
    form: Arc<dyn FormService>,
    hinter: Arc<dyn FieldHinter>,
    hints_enabled: AtomicBool,
}

impl CascadeEngine {
    pub fn new(config: Option<CascadeConfiguration>, form: Arc<dyn FormService>) -> Self {
        Self {
            map: CascadeMap::new(config),
            form,
            hinter: Arc::new(NoopHinter),
            hints_enabled: AtomicBool::new(true),
        }
    }

    pub fn with_hinter(mut self, hinter: Arc<dyn FieldHinter>) -> Self {
        self.hinter = hinter;
        self
    }

    pub fn map(&self) -> &CascadeMap {
        &self.map
    }

    pub fn hints_enabled(&self) -> bool {
        self.hints_enabled.load(Ordering::SeqCst)
    }

    pub fn set_hints_enabled(&self, enabled: bool) {
        self.hints_enabled.store(enabled, Ordering::SeqCst);
        self.hinter.set_enabled(enabled);
    }

    /// Re-cascade after `field` changed on the form
    pub async fn on_field_changed(&self, field: &str) -> CascadeResult<CascadeOutcome> {
        let value = selected(self.form.get_field_value(field).await?);
        self.form.clear_error().await?;

        let outcome = self.cascade_from(field, value).await?;
        self.report_invalid(&outcome).await?;
        Ok(outcome)
    }

    /// Cascade every parent field, then stop hinting for the rest of the session.
    ///
    /// The form has a single error slot, so it is cleared once before the
    /// passes fan out and set once afterwards for the first invalid parent.
    pub async fn cascade_all(&self) -> CascadeResult<Vec<(String, CascadeOutcome)>> {
        info!("Re-cascading {} parent fields", self.map.len());
        self.form.clear_error().await?;

        let passes = self.map.parents().map(|parent| async move {
            let value = selected(self.form.get_field_value(parent).await?);
            let outcome = self.cascade_from(parent, value).await?;
            Ok::<_, CascadeError>((parent.to_string(), outcome))
        });

        let outcomes = join_all(passes).await.into_iter().collect::<CascadeResult<Vec<_>>>();
        self.set_hints_enabled(false);
        let outcomes = outcomes?;

        if let Some((_, invalid)) = outcomes.iter().find(|(_, outcome)| !outcome.is_valid()) {
            self.report_invalid(invalid).await?;
        }
        Ok(outcomes)
    }

    /// Lift every restriction the map could have applied and re-enable hints
    pub async fn reset_all_cascades(&self) -> CascadeResult<()> {
        self.set_hints_enabled(true);
        let form = self.form.as_ref();
        let resets = self.map.altered_fields().map(|field| async move {
            let allowed = form.get_allowed_field_values(field).await?;
            form.filter_allowed_field_values(field, &allowed).await
        });

        join_all(resets)
            .await
            .into_iter()
            .collect::<anyhow::Result<Vec<()>>>()?;
        info!("Reset cascades on {} fields", self.map.altered_fields().count());
        Ok(())
    }

    /// Hint, resolve, filter and validate for `field` = `value`. Leaves the
    /// form's error slot alone.
    async fn cascade_from(&self, field: &str, value: Option<String>) -> CascadeResult<CascadeOutcome> {
        if !self.map.is_parent(field) {
            return Ok(CascadeOutcome::NotAParent);
        }

        if self.hints_enabled() {
            if let Err(e) = self
                .hinter
                .hint_field_value(&self.map, field, value.as_deref())
                .await
            {
                warn!("Hint for '{}' failed: {}", field, e);
            }
        }

        let affected = self.map.affected_fields(field, value.as_deref());
        debug!("'{}'={:?} affects {:?}", field, value, affected);
        let options = compute_options(&self.map, self.form.as_ref(), &affected).await?;

        let mut filtered = Vec::with_capacity(options.len());
        for (dependent, allowed) in options.iter() {
            self.form.filter_allowed_field_values(dependent, allowed).await?;

            if let Some(current) = self.disallowed_value(dependent).await? {
                warn!("Field '{}' holds '{}' which its cascade rules no longer allow", dependent, current);
                return Ok(CascadeOutcome::Invalid {
                    field: dependent.to_string(),
                    value: current,
                    filtered,
                });
            }
            filtered.push(dependent.to_string());
        }

        Ok(CascadeOutcome::Applied(options))
    }

    async fn report_invalid(&self, outcome: &CascadeOutcome) -> CascadeResult<()> {
        if let CascadeOutcome::Invalid { field, value, .. } = outcome {
            self.form.set_error(&invalid_value_message(field, value)).await?;
        }
        Ok(())
    }

    /// The field's current value when it is set and outside its filtered set
    async fn disallowed_value(&self, field: &str) -> CascadeResult<Option<String>> {
        let Some(current) = selected(self.form.get_field_value(field).await?) else {
            return Ok(None);
        };
        let allowed = self.form.get_filtered_allowed_field_values(field).await?;
        Ok((!allowed.contains(&current)).then_some(current))
    }
}

fn invalid_value_message(field: &str, value: &str) -> String {
    format!("Field '{}' has value '{}', which is not allowed by the current cascade selections", field, value)
}

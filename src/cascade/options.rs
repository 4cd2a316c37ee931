//! Option Intersection
//!
//! For every affected field, each parent that can constrain it contributes an
//! allowed set for its current value. A value stays allowed only if every one
//! of those parents allows it.
//!
//! Work is fanned out per (field, parent) pair and joined per field before the
//! fold, so no two tasks ever write the same accumulator slot.

use anyhow::Result;
use futures_util::future::join_all;
use std::collections::HashSet;

use super::config::FieldRestriction;
use super::map::CascadeMap;
use crate::form::{selected, FormService};

/// Intersected allowed values per affected field, in affected-field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldOptions {
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(field, values)| (field.as_str(), values.as_slice()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(field, _)| field.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the allowed values of every field in `affected`
pub async fn compute_options(
    map: &CascadeMap,
    form: &dyn FormService,
    affected: &[String],
) -> Result<FieldOptions> {
    let per_field = affected.iter().map(|field| async move {
        let options = field_options(map, form, field).await?;
        Ok::<_, anyhow::Error>((field.clone(), options))
    });

    let entries = join_all(per_field)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(FieldOptions { entries })
}

async fn field_options(map: &CascadeMap, form: &dyn FormService, field: &str) -> Result<Vec<String>> {
    let contributions = join_all(
        map.parents_altering(field)
            .iter()
            .map(|parent| parent_allowance(map, form, parent, field)),
    )
    .await;

    let mut accumulated: Option<Vec<String>> = None;
    for allowed in contributions {
        let allowed = allowed?;
        accumulated = Some(match accumulated {
            Some(current) => intersect(current, &allowed),
            None => allowed,
        });
    }

    let options = accumulated.unwrap_or_default();
    if options.is_empty() {
        tracing::warn!("Cascade rules leave no allowed values for field '{}'", field);
    }
    Ok(options)
}

/// Values `parent` currently allows for `field`
async fn parent_allowance(
    map: &CascadeMap,
    form: &dyn FormService,
    parent: &str,
    field: &str,
) -> Result<Vec<String>> {
    let value = selected(form.get_field_value(parent).await?);
    let restriction = value
        .as_deref()
        .and_then(|v| map.entry(parent)?.definition(v))
        .and_then(|definition| definition.restriction(field));

    match restriction {
        Some(FieldRestriction::Values(values)) => {
            tracing::debug!("{}={:?} restricts '{}' to {:?}", parent, value, field, values);
            Ok(values.clone())
        }
        // no value, "All", or no rule for this value/field
        Some(FieldRestriction::Unrestricted) | None => form.get_allowed_field_values(field).await,
    }
}

/// Keeps the order of `current`, dropping anything missing from `other`
fn intersect(mut current: Vec<String>, other: &[String]) -> Vec<String> {
    let other: HashSet<&str> = other.iter().map(String::as_str).collect();
    current.retain(|value| other.contains(value.as_str()));
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::CascadeConfiguration;
    use crate::form::InMemoryForm;
    use serde_json::json;

    fn setup() -> (CascadeMap, InMemoryForm) {
        let config = CascadeConfiguration::from_value(&json!({
            "Category": {
                "Bug": { "Priority": ["1", "2"] },
                "Feature": { "Priority": "All" }
            },
            "Team": {
                "Web": { "Priority": ["2", "3"], "Area": ["Frontend"] },
                "Core": { "Area": ["Backend", "Infra"] }
            }
        }))
        .unwrap();
        let form = InMemoryForm::default()
            .with_field("Category", ["Bug", "Feature"])
            .with_field("Team", ["Web", "Core"])
            .with_field("Priority", ["1", "2", "3", "4"])
            .with_field("Area", ["Frontend", "Backend", "Infra"]);
        (CascadeMap::new(Some(config)), form)
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_explicit_list_from_single_parent() {
        let (map, form) = setup();
        form.set_value("Category", Some("Bug")).await.unwrap();
        let options = compute_options(&map, &form, &fields(&["Priority"])).await.unwrap();
        // Team unset contributes the full set
        assert_eq!(options.get("Priority").unwrap(), &["1", "2"]);
    }

    #[tokio::test]
    async fn test_unrestricted_uses_schema() {
        let (map, form) = setup();
        form.set_value("Category", Some("Feature")).await.unwrap();
        let options = compute_options(&map, &form, &fields(&["Priority"])).await.unwrap();
        assert_eq!(options.get("Priority").unwrap(), &["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_two_parents_intersect() {
        let (map, form) = setup();
        form.set_value("Category", Some("Bug")).await.unwrap();
        form.set_value("Team", Some("Web")).await.unwrap();
        let options = compute_options(&map, &form, &fields(&["Priority", "Area"])).await.unwrap();
        assert_eq!(options.get("Priority").unwrap(), &["2"]);
        assert_eq!(options.get("Area").unwrap(), &["Frontend"]);
        assert_eq!(options.fields().collect::<Vec<_>>(), vec!["Priority", "Area"]);
    }

    #[tokio::test]
    async fn test_disjoint_lists_yield_empty_set() {
        let (map, form) = setup();
        form.set_value("Team", Some("Core")).await.unwrap();
        let options = compute_options(&map, &form, &fields(&["Area"])).await.unwrap();
        assert_eq!(options.get("Area").unwrap(), &["Backend", "Infra"]);

        let config = CascadeConfiguration::from_value(&json!({
            "Category": { "Bug": { "Priority": ["1"] } },
            "Team": { "Web": { "Priority": ["3"] } }
        }))
        .unwrap();
        let map = CascadeMap::new(Some(config));
        form.set_value("Category", Some("Bug")).await.unwrap();
        form.set_value("Team", Some("Web")).await.unwrap();
        let options = compute_options(&map, &form, &fields(&["Priority"])).await.unwrap();
        assert!(options.get("Priority").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_value_without_rule_does_not_restrict() {
        let (map, form) = setup();
        // Core has no rule for Priority
        form.set_value("Team", Some("Core")).await.unwrap();
        form.set_value("Category", Some("Bug")).await.unwrap();
        let options = compute_options(&map, &form, &fields(&["Priority"])).await.unwrap();
        assert_eq!(options.get("Priority").unwrap(), &["1", "2"]);
    }

    #[tokio::test]
    async fn test_host_failure_propagates() {
        let (map, _) = setup();
        let form = InMemoryForm::default().with_field("Priority", ["1"]);
        let err = compute_options(&map, &form, &fields(&["Priority"])).await.unwrap_err();
        assert!(err.to_string().contains("Unknown field"));
    }

    #[test]
    fn test_intersection_is_commutative_as_sets() {
        let a = fields(&["a", "b", "c"]);
        let b = fields(&["d", "c", "b"]);
        let mut ab = intersect(a.clone(), &b);
        let mut ba = intersect(b, &a);
        ab.sort();
        ba.sort();
        assert_eq!(ab, ba);
        assert_eq!(ab, vec!["b", "c"]);
        assert_eq!(intersect(a.clone(), &a), a);
    }
}

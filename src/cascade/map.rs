//! Cascade Map
//!
//! Normalized, read-only lookup built once per form session from a
//! [`CascadeConfiguration`]. Each parent field keeps the list of dependent
//! fields it can ever alter, and a reverse index answers "which parents
//! constrain this field" without rescanning every entry.

use std::collections::{BTreeMap, BTreeSet};

use super::config::{CascadeConfiguration, CascadeDefinition, CascadeRuleSet};

/// Everything known about one parent field
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeEntry {
    /// Every dependent field named by any of this parent's definitions, deduplicated
    pub alters: Vec<String>,
    /// The parent's rule set, unchanged
    pub cascades: CascadeRuleSet,
}

impl CascadeEntry {
    fn new(cascades: CascadeRuleSet) -> Self {
        let alters: BTreeSet<String> = cascades
            .values()
            .flat_map(|definition| definition.field_names().map(str::to_string))
            .collect();

        Self {
            alters: alters.into_iter().collect(),
            cascades,
        }
    }

    pub fn definition(&self, value: &str) -> Option<&CascadeDefinition> {
        self.cascades.get(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeMap {
    entries: BTreeMap<String, CascadeEntry>,
    /// dependent field → parents whose `alters` contain it
    constrained_by: BTreeMap<String, Vec<String>>,
}

impl CascadeMap {
    /// Build the map; an absent configuration yields an empty map
    pub fn new(config: Option<CascadeConfiguration>) -> Self {
        let Some(config) = config else {
            return Self::default();
        };

        let entries: BTreeMap<String, CascadeEntry> = config
            .parents()
            .iter()
            .map(|(parent, rules)| (parent.clone(), CascadeEntry::new(rules.clone())))
            .collect();

        let mut constrained_by: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (parent, entry) in &entries {
            for field in &entry.alters {
                constrained_by.entry(field.clone()).or_default().push(parent.clone());
            }
        }

        Self { entries, constrained_by }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, parent: &str) -> Option<&CascadeEntry> {
        self.entries.get(parent)
    }

    pub fn is_parent(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &CascadeEntry)> {
        self.entries.iter().map(|(parent, entry)| (parent.as_str(), entry))
    }

    /// Parents that can constrain `field`, in ascending name order
    pub fn parents_altering(&self, field: &str) -> &[String] {
        self.constrained_by.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every field that appears in any parent's `alters`, ascending
    pub fn altered_fields(&self) -> impl Iterator<Item = &str> {
        self.constrained_by.keys().map(String::as_str)
    }

    /// Dependent fields whose allowed values must be recomputed after
    /// `parent` changes to `value`.
    ///
    /// No value selected affects everything the parent could ever affect;
    /// a value without a rule affects nothing. Result is ascending and
    /// deduplicated. Unknown parents yield an empty list.
    pub fn affected_fields(&self, parent: &str, value: Option<&str>) -> Vec<String> {
        let Some(entry) = self.entries.get(parent) else {
            return Vec::new();
        };

        match value.filter(|v| !v.is_empty()) {
            None => entry.alters.clone(),
            Some(value) => entry
                .definition(value)
                .map(|definition| definition.field_names().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    /// Hint text attached to the definition for `parent` = `value`
    pub fn hint(&self, parent: &str, value: &str) -> Option<&str> {
        self.entries.get(parent)?.definition(value)?.hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::is_reserved_field_name;
    use serde_json::json;

    fn sample_map() -> CascadeMap {
        let config = CascadeConfiguration::from_value(&json!({
            "Category": {
                "Bug": { "Priority": ["1", "2"], "Severity": ["High"], "HINT": "Triage first" },
                "Feature": { "Priority": "All", "Release": ["R1"] }
            },
            "Team": {
                "Web": { "Priority": ["2", "3"] }
            }
        }))
        .unwrap();
        CascadeMap::new(Some(config))
    }

    #[test]
    fn test_absent_configuration_builds_empty_map() {
        let map = CascadeMap::new(None);
        assert!(map.is_empty());
        assert!(map.affected_fields("Category", None).is_empty());
    }

    #[test]
    fn test_alters_is_deduplicated_union() {
        let map = sample_map();
        let entry = map.entry("Category").unwrap();
        assert_eq!(entry.alters, vec!["Priority", "Release", "Severity"]);
        assert_eq!(entry.cascades.len(), 2);
    }

    #[test]
    fn test_reserved_names_never_in_alters() {
        let map = sample_map();
        for (_, entry) in map.entries() {
            assert!(entry.alters.iter().all(|f| !is_reserved_field_name(f)));
        }
        assert!(map.altered_fields().all(|f| !is_reserved_field_name(f)));
    }

    #[test]
    fn test_affected_fields_for_empty_value_is_union() {
        let map = sample_map();
        assert_eq!(map.affected_fields("Category", None), vec!["Priority", "Release", "Severity"]);
        assert_eq!(map.affected_fields("Category", Some("")), vec!["Priority", "Release", "Severity"]);
    }

    #[test]
    fn test_affected_fields_for_known_and_unknown_values() {
        let map = sample_map();
        assert_eq!(map.affected_fields("Category", Some("Bug")), vec!["Priority", "Severity"]);
        assert_eq!(map.affected_fields("Category", Some("Feature")), vec!["Priority", "Release"]);
        assert!(map.affected_fields("Category", Some("Epic")).is_empty());
        assert!(map.affected_fields("NotAParent", Some("Bug")).is_empty());
    }

    #[test]
    fn test_reverse_index() {
        let map = sample_map();
        assert_eq!(map.parents_altering("Priority"), &["Category".to_string(), "Team".to_string()]);
        assert_eq!(map.parents_altering("Release"), &["Category".to_string()]);
        assert!(map.parents_altering("Title").is_empty());
        assert_eq!(map.altered_fields().collect::<Vec<_>>(), vec!["Priority", "Release", "Severity"]);
    }

    #[test]
    fn test_hint_lookup() {
        let map = sample_map();
        assert_eq!(map.hint("Category", "Bug"), Some("Triage first"));
        assert_eq!(map.hint("Category", "Feature"), None);
        assert_eq!(map.hint("Team", "Mobile"), None);
    }

    #[test]
    fn test_definition_only_reserved_keys_alters_nothing() {
        let config = CascadeConfiguration::new()
            .with_rule("Category", "Docs", CascadeDefinition::new().with_hint("No restrictions"));
        let map = CascadeMap::new(Some(config));
        assert!(map.entry("Category").unwrap().alters.is_empty());
        assert!(map.affected_fields("Category", Some("Docs")).is_empty());
    }
}

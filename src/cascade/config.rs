//! Cascade Configuration
//!
//! Typed form of the nested document that drives cascading:
//! parent field → parent value → dependent field → restriction.
//! Reserved metadata keys are split away from field restrictions while parsing,
//! so nothing downstream ever sees them as field names.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

use super::error::ConfigurationError;
use super::{is_reserved_field_name, HINT_KEY};

/// Token that means "inherit every value the schema allows"
pub const UNRESTRICTED_TOKEN: &str = "All";

/// What a single cascade rule allows for one dependent field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRestriction {
    /// No restriction: the field keeps its full schema-defined allowed set
    Unrestricted,
    /// Explicit, ordered list of permitted values
    Values(Vec<String>),
}

impl FieldRestriction {
    pub fn values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldRestriction::Values(values.into_iter().map(Into::into).collect())
    }

    fn from_value(value: &Value, location: &str) -> Result<Self, ConfigurationError> {
        match value {
            Value::String(token) if token.eq_ignore_ascii_case(UNRESTRICTED_TOKEN) => {
                Ok(FieldRestriction::Unrestricted)
            }
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(malformed(
                        format!("{}[{}]", location, i),
                        format!("expected a string value, found {}", other),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldRestriction::Values),
            other => Err(malformed(
                location,
                format!("expected \"{}\" or a list of values, found {}", UNRESTRICTED_TOKEN, other),
            )),
        }
    }
}

/// Restrictions applied when a parent field holds one specific value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeDefinition {
    fields: BTreeMap<String, FieldRestriction>,
    metadata: BTreeMap<String, Value>,
}

impl CascadeDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `field` to an explicit list of values
    pub fn restrict<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.insert(field.into(), FieldRestriction::values(values));
        self
    }

    /// Let `field` keep every value the schema allows
    pub fn inherit(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), FieldRestriction::Unrestricted);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.metadata.insert(HINT_KEY.to_string(), Value::String(hint.into()));
        self
    }

    /// Dependent field restrictions, reserved keys excluded
    pub fn fields(&self) -> &BTreeMap<String, FieldRestriction> {
        &self.fields
    }

    pub fn restriction(&self, field: &str) -> Option<&FieldRestriction> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn hint(&self) -> Option<&str> {
        self.metadata.get(HINT_KEY).and_then(Value::as_str)
    }

    fn from_value(value: &Value, location: &str) -> Result<Self, ConfigurationError> {
        let mut definition = Self::default();
        for (key, entry) in as_object(value, location)? {
            if is_reserved_field_name(key) {
                definition.metadata.insert(key.clone(), entry.clone());
            } else {
                let restriction = FieldRestriction::from_value(entry, &format!("{}.{}", location, key))?;
                definition.fields.insert(key.clone(), restriction);
            }
        }
        Ok(definition)
    }
}

/// Parent value → definition, for a single parent field
pub type CascadeRuleSet = BTreeMap<String, CascadeDefinition>;

/// Full cascade configuration keyed by parent field reference name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeConfiguration {
    parents: BTreeMap<String, CascadeRuleSet>,
}

impl CascadeConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the definition used when `parent` holds `value`
    pub fn with_rule(
        mut self,
        parent: impl Into<String>,
        value: impl Into<String>,
        definition: CascadeDefinition,
    ) -> Self {
        self.parents
            .entry(parent.into())
            .or_default()
            .insert(value.into(), definition);
        self
    }

    pub fn parents(&self) -> &BTreeMap<String, CascadeRuleSet> {
        &self.parents
    }

    pub fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        let mut parents = BTreeMap::new();
        for (parent, rules) in as_object(value, "$")? {
            let mut rule_set = CascadeRuleSet::new();
            for (parent_value, definition) in as_object(rules, parent)? {
                let location = format!("{}.{}", parent, parent_value);
                rule_set.insert(
                    parent_value.clone(),
                    CascadeDefinition::from_value(definition, &location)?,
                );
            }
            parents.insert(parent.clone(), rule_set);
        }
        Ok(Self { parents })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigurationError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(&value)
    }

    /// Load from disk; `.yaml`/`.yml` files are read as YAML, anything else as JSON
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigurationError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let config = if is_yaml {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        tracing::debug!("Loaded cascade configuration for {} parent fields from {:?}", config.parents.len(), path);
        Ok(config)
    }
}

fn as_object<'a>(value: &'a Value, location: &str) -> Result<&'a Map<String, Value>, ConfigurationError> {
    value
        .as_object()
        .ok_or_else(|| malformed(location, format!("expected an object, found {}", value)))
}

fn malformed(location: impl Into<String>, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Malformed {
        location: location.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_parse_restrictions_and_sentinel() {
        let config = CascadeConfiguration::from_value(&json!({
            "Category": {
                "Bug": { "Priority": ["1", "2"] },
                "Feature": { "Priority": "All" },
                "Task": { "Priority": "all" }
            }
        }))
        .unwrap();

        let rules = &config.parents()["Category"];
        assert_eq!(
            rules["Bug"].restriction("Priority"),
            Some(&FieldRestriction::values(["1", "2"]))
        );
        assert_eq!(rules["Feature"].restriction("Priority"), Some(&FieldRestriction::Unrestricted));
        assert_eq!(rules["Task"].restriction("Priority"), Some(&FieldRestriction::Unrestricted));
    }

    #[test]
    fn test_reserved_keys_become_metadata() {
        let config = CascadeConfiguration::from_value(&json!({
            "Category": {
                "Bug": { "Priority": ["1"], "HINT": "Bugs are urgent" }
            }
        }))
        .unwrap();

        let bug = &config.parents()["Category"]["Bug"];
        assert_eq!(bug.field_names().collect::<Vec<_>>(), vec!["Priority"]);
        assert_eq!(bug.hint(), Some("Bugs are urgent"));
    }

    #[test]
    fn test_malformed_restriction_reports_location() {
        let err = CascadeConfiguration::from_value(&json!({
            "Category": { "Bug": { "Priority": [1, 2] } }
        }))
        .unwrap_err();

        match err {
            ConfigurationError::Malformed { location, .. } => assert_eq!(location, "Category.Bug.Priority[0]"),
            other => panic!("unexpected error: {other}"),
        }

        let err = CascadeConfiguration::from_value(&json!({ "Category": ["Bug"] })).unwrap_err();
        assert!(matches!(err, ConfigurationError::Malformed { .. }));
    }

    #[test]
    fn test_yaml_matches_json() {
        let yaml = "Category:\n  Bug:\n    Priority: ['1', '2']\n  Feature:\n    Priority: All\n";
        let json = r#"{"Category":{"Bug":{"Priority":["1","2"]},"Feature":{"Priority":"All"}}}"#;
        assert_eq!(
            CascadeConfiguration::from_yaml_str(yaml).unwrap(),
            CascadeConfiguration::from_json_str(json).unwrap()
        );
    }

    #[test]
    fn test_builder_matches_parsed() {
        let built = CascadeConfiguration::new()
            .with_rule("Category", "Bug", CascadeDefinition::new().restrict("Priority", ["1", "2"]).with_hint("hi"))
            .with_rule("Category", "Feature", CascadeDefinition::new().inherit("Priority"));
        let parsed = CascadeConfiguration::from_value(&json!({
            "Category": {
                "Bug": { "Priority": ["1", "2"], "HINT": "hi" },
                "Feature": { "Priority": "All" }
            }
        }))
        .unwrap();
        assert_eq!(built, parsed);
    }

    #[tokio::test]
    async fn test_load_picks_format_by_extension() {
        let mut yaml_file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml_file, "Area:\n  Web:\n    Team: [Frontend]").unwrap();
        let config = CascadeConfiguration::load(yaml_file.path()).await.unwrap();
        assert_eq!(
            config.parents()["Area"]["Web"].restriction("Team"),
            Some(&FieldRestriction::values(["Frontend"]))
        );

        let mut json_file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(json_file, r#"{{"Area": {{"Web": {{"Team": "All"}}}}}}"#).unwrap();
        let config = CascadeConfiguration::load(json_file.path()).await.unwrap();
        assert_eq!(
            config.parents()["Area"]["Web"].restriction("Team"),
            Some(&FieldRestriction::Unrestricted)
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CascadeConfiguration::load(dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, ConfigurationError::Io { .. }));
    }
}

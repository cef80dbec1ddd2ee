//! Condition trees that decide when an accounting template applies.
//!
//! A tree is one root group of AND/OR-combined leaves plus nested groups.
//! The JSON form is what the backend stores on the template's `condition`
//! column:
//!
//! ```json
//! {"operator":"AND","conditions":[{"field":"amount","operator":"greater_than","value":"700"}],"groups":[...]}
//! ```
//!
//! Serialization keeps only complete leaves (non-empty `field` and `value`)
//! and omits `groups` when there are none. Deserialization fills in missing
//! pieces: `operator` defaults to `AND`, and a group without leaves gets one
//! empty leaf so the editor always has a row to show.

mod editor;
mod eval;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CuadreError, Result};

pub use editor::ConditionUpdate;

pub const SUPPLIER_FIELD: &str = "supplier";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupOperator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl GroupOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl FromStr for GroupOperator {
    type Err = CuadreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            other => Err(CuadreError::InvalidCondition(format!("unknown group operator: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = CuadreError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(Value::String(s.trim().to_lowercase()))
            .map_err(|_| CuadreError::InvalidCondition(format!("unknown operator: {s}")))
    }
}

/// A single `field operator value` test.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.field.is_empty() && !self.value.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub operator: GroupOperator,
    pub conditions: Vec<Condition>,
    pub groups: Vec<ConditionGroup>,
}

impl Default for ConditionGroup {
    fn default() -> Self {
        Self {
            operator: GroupOperator::And,
            conditions: vec![Condition::default()],
            groups: Vec::new(),
        }
    }
}

impl ConditionGroup {
    pub fn new(operator: GroupOperator, conditions: Vec<Condition>) -> Self {
        Self {
            operator,
            conditions,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<ConditionGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Every leaf in this group and its descendants, depth first.
    pub fn leaves(&self) -> Vec<&Condition> {
        let mut out: Vec<&Condition> = self.conditions.iter().collect();
        for group in &self.groups {
            out.extend(group.leaves());
        }
        out
    }

    fn to_wire(&self) -> WireGroupOut<'_> {
        WireGroupOut {
            operator: self.operator,
            conditions: self.conditions.iter().filter(|c| c.is_complete()).collect(),
            groups: self.groups.iter().map(|g| g.to_wire()).collect(),
        }
    }

    fn from_wire(wire: WireGroupIn) -> Self {
        let conditions = match wire.conditions {
            Some(conditions) if !conditions.is_empty() => conditions.into_iter().map(Condition::from).collect(),
            _ => vec![Condition::default()],
        };
        Self {
            operator: wire.operator.unwrap_or_default(),
            conditions,
            groups: wire
                .groups
                .unwrap_or_default()
                .into_iter()
                .map(Self::from_wire)
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct WireGroupOut<'a> {
    operator: GroupOperator,
    conditions: Vec<&'a Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<WireGroupOut<'a>>,
}

// `null` and a missing key are treated alike.
#[derive(Deserialize)]
struct WireGroupIn {
    #[serde(default)]
    operator: Option<GroupOperator>,
    #[serde(default)]
    conditions: Option<Vec<WireConditionIn>>,
    #[serde(default)]
    groups: Option<Vec<WireGroupIn>>,
}

#[derive(Deserialize)]
struct WireConditionIn {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    operator: Option<ConditionOperator>,
    #[serde(default)]
    value: Option<String>,
}

impl From<WireConditionIn> for Condition {
    fn from(wire: WireConditionIn) -> Self {
        Self {
            field: wire.field.unwrap_or_default(),
            operator: wire.operator.unwrap_or_default(),
            value: wire.value.unwrap_or_default(),
        }
    }
}

/// Editor state: exactly one top-level group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionTree {
    pub root: ConditionGroup,
}

impl ConditionTree {
    pub fn new(root: ConditionGroup) -> Self {
        Self { root }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.root.to_wire())?)
    }

    /// Compact JSON with keys in wire order (`operator`, `conditions`, `groups`).
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root.to_wire())?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root.to_wire())?)
    }

    /// `null` yields the default tree and a string is decoded as JSON first.
    /// Missing keys are defaulted; keys of
    /// the wrong shape (an unknown operator, `conditions` that is not a
    /// list) are rejected.
    pub fn from_value(json: &Value) -> Result<Self> {
        match json {
            Value::Null => return Ok(Self::default()),
            // some rows keep the condition as an encoded JSON string
            Value::String(encoded) => return Self::from_json_str(encoded),
            _ => {}
        }
        let wire = WireGroupIn::deserialize(json)
            .map_err(|e| CuadreError::InvalidCondition(e.to_string()))?;
        Ok(Self::new(ConditionGroup::from_wire(wire)))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(&value)
    }
}

impl Serialize for ConditionTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConditionTree {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Serialize the first group of an editor list. Further top-level groups
/// have no place in the stored format and are dropped with a warning.
pub fn to_json(groups: &[ConditionGroup]) -> Result<Value> {
    if groups.len() > 1 {
        tracing::warn!(
            dropped = groups.len() - 1,
            "only the first top-level condition group is stored"
        );
    }
    let root = groups.first().cloned().unwrap_or_default();
    ConditionTree::new(root).to_value()
}

/// Rebuild the editor list (always a single group) from stored JSON.
pub fn from_json(json: &Value) -> Result<Vec<ConditionGroup>> {
    Ok(vec![ConditionTree::from_value(json)?.root])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(field: &str, op: ConditionOperator, value: &str) -> Condition {
        Condition::new(field, op, value)
    }

    fn sample_tree() -> ConditionTree {
        ConditionTree::new(
            ConditionGroup::new(
                GroupOperator::Or,
                vec![
                    leaf("amount", ConditionOperator::GreaterThanOrEqual, "700"),
                    leaf("supplier", ConditionOperator::Equals, "20100047218"),
                ],
            )
            .with_groups(vec![ConditionGroup::new(
                GroupOperator::And,
                vec![leaf("description", ConditionOperator::Contains, "FLETE")],
            )]),
        )
    }

    #[test]
    fn test_default_tree_has_one_empty_leaf() {
        let tree = ConditionTree::default();
        assert_eq!(tree.root.operator, GroupOperator::And);
        assert_eq!(tree.root.conditions, vec![Condition::default()]);
        assert!(tree.root.groups.is_empty());
    }

    #[test]
    fn test_wire_format_key_order() {
        let tree = ConditionTree::new(ConditionGroup::new(
            GroupOperator::And,
            vec![leaf("amount", ConditionOperator::GreaterThan, "100")],
        ));
        assert_eq!(
            tree.to_json_string().unwrap(),
            r#"{"operator":"AND","conditions":[{"field":"amount","operator":"greater_than","value":"100"}]}"#
        );
    }

    #[test]
    fn test_nested_groups_serialized_only_when_present() {
        let value = sample_tree().to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "operator": "OR",
                "conditions": [
                    {"field": "amount", "operator": "greater_than_or_equal", "value": "700"},
                    {"field": "supplier", "operator": "equals", "value": "20100047218"}
                ],
                "groups": [
                    {
                        "operator": "AND",
                        "conditions": [
                            {"field": "description", "operator": "contains", "value": "FLETE"}
                        ]
                    }
                ]
            })
        );
        assert!(value["groups"][0].get("groups").is_none());
    }

    #[test]
    fn test_roundtrip_complete_tree() {
        let tree = sample_tree();
        let groups = vec![tree.root.clone()];
        let back = from_json(&to_json(&groups).unwrap()).unwrap();
        assert_eq!(back, groups);
    }

    #[test]
    fn test_roundtrip_drops_incomplete_leaves() {
        let root = ConditionGroup::new(
            GroupOperator::And,
            vec![
                leaf("amount", ConditionOperator::LessThan, "50"),
                leaf("supplier", ConditionOperator::Equals, ""),
                leaf("", ConditionOperator::Contains, "X"),
            ],
        );
        let value = to_json(&[root.clone()]).unwrap();
        assert_eq!(value["conditions"].as_array().unwrap().len(), 1);
        let back = from_json(&value).unwrap();
        assert_ne!(back[0], root);
        assert_eq!(back[0].conditions, vec![leaf("amount", ConditionOperator::LessThan, "50")]);
    }

    #[test]
    fn test_all_empty_leaves_reload_as_one_placeholder() {
        let value = to_json(&[ConditionGroup::default()]).unwrap();
        assert_eq!(value, json!({"operator": "AND", "conditions": []}));
        let back = from_json(&value).unwrap();
        assert_eq!(back, vec![ConditionGroup::default()]);
    }

    #[test]
    fn test_to_json_uses_first_group_only() {
        let first = ConditionGroup::new(
            GroupOperator::Or,
            vec![leaf("amount", ConditionOperator::Equals, "1")],
        );
        let second = ConditionGroup::new(
            GroupOperator::And,
            vec![leaf("amount", ConditionOperator::Equals, "2")],
        );
        let value = to_json(&[first.clone(), second]).unwrap();
        assert_eq!(from_json(&value).unwrap(), vec![first]);
    }

    #[test]
    fn test_to_json_of_empty_list_is_default_group() {
        let value = to_json(&[]).unwrap();
        assert_eq!(value, json!({"operator": "AND", "conditions": []}));
    }

    #[test]
    fn test_from_json_defaults_missing_fields() {
        let groups = from_json(&json!({})).unwrap();
        assert_eq!(groups, vec![ConditionGroup::default()]);

        let groups = from_json(&json!({"conditions": [{"field": "amount", "value": "5"}]})).unwrap();
        assert_eq!(groups[0].operator, GroupOperator::And);
        assert_eq!(groups[0].conditions[0].operator, ConditionOperator::Equals);

        let groups = from_json(&Value::Null).unwrap();
        assert_eq!(groups, vec![ConditionGroup::default()]);
    }

    #[test]
    fn test_from_json_nested_defaults() {
        let groups = from_json(&json!({
            "operator": "OR",
            "conditions": [],
            "groups": [{"operator": "OR"}, {}]
        }))
        .unwrap();
        let root = &groups[0];
        assert_eq!(root.conditions, vec![Condition::default()]);
        assert_eq!(root.groups.len(), 2);
        assert_eq!(root.groups[0].operator, GroupOperator::Or);
        assert_eq!(root.groups[1], ConditionGroup::default());
    }

    #[test]
    fn test_from_json_rejects_wrong_shapes() {
        assert!(matches!(
            from_json(&json!({"operator": "XOR"})),
            Err(CuadreError::InvalidCondition(_))
        ));
        assert!(from_json(&json!({"conditions": "amount > 5"})).is_err());
        assert!(from_json(&json!([1, 2])).is_err());
        assert!(from_json(&json!({"conditions": [{"operator": "between"}]})).is_err());
    }

    #[test]
    fn test_from_encoded_string() {
        let encoded = Value::String(r#"{"operator":"OR"}"#.to_string());
        let groups = from_json(&encoded).unwrap();
        assert_eq!(groups[0].operator, GroupOperator::Or);
        assert!(from_json(&Value::String("not json".into())).is_err());
    }

    #[test]
    fn test_serde_impls_use_wire_format() {
        let tree = sample_tree();
        let encoded = serde_json::to_string(&tree).unwrap();
        assert_eq!(encoded, tree.to_json_string().unwrap());
        let decoded: ConditionTree = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn test_from_json_str() {
        let tree = ConditionTree::from_json_str(
            r#"{"operator":"OR","conditions":[{"field":"description","operator":"starts_with","value":"PAGO"}]}"#,
        )
        .unwrap();
        assert_eq!(tree.root.operator, GroupOperator::Or);
        assert_eq!(tree.root.conditions[0].operator.as_str(), "starts_with");
    }

    #[test]
    fn test_leaves_walks_nested_groups() {
        let tree = sample_tree();
        let fields: Vec<&str> = tree.root.leaves().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["amount", "supplier", "description"]);
    }

    #[test]
    fn test_null_leaf_attributes_default_like_missing_ones() {
        let groups = from_json(&json!({
            "operator": null,
            "conditions": [{"field": "amount", "operator": null, "value": "5"}, {"field": null, "value": null}],
            "groups": null
        }))
        .unwrap();
        let root = &groups[0];
        assert_eq!(root.operator, GroupOperator::And);
        assert_eq!(root.conditions[0], leaf("amount", ConditionOperator::Equals, "5"));
        assert_eq!(root.conditions[1], Condition::default());
        assert!(root.groups.is_empty());
    }

    #[test]
    fn test_to_json_value_keeps_wire_key_order() {
        let value = to_json(&[sample_tree().root]).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["operator", "conditions", "groups"]);
        assert!(serde_json::to_string(&value).unwrap().starts_with(r#"{"operator":"OR","conditions":[{"field":"amount","operator""#));
    }

    #[test]
    fn test_operators_parse_from_text() {
        assert_eq!("or".parse::<GroupOperator>().unwrap(), GroupOperator::Or);
        assert_eq!(" AND ".parse::<GroupOperator>().unwrap(), GroupOperator::And);
        assert!("XOR".parse::<GroupOperator>().is_err());
        assert_eq!(
            "GREATER_THAN_OR_EQUAL".parse::<ConditionOperator>().unwrap(),
            ConditionOperator::GreaterThanOrEqual
        );
        assert!("between".parse::<ConditionOperator>().is_err());
    }
}

use serde_json::Value;

use super::{Condition, ConditionGroup, ConditionOperator, ConditionTree, GroupOperator};

const NUMERIC_TOLERANCE: f64 = 0.005;

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Condition {
    /// Test this leaf against a JSON record. Text comparisons ignore case;
    /// ordering operators compare numbers and fail when either side is not
    /// numeric.
    pub fn matches(&self, record: &Value) -> bool {
        let Some(actual) = record.get(&self.field).filter(|v| !v.is_null()) else {
            return matches!(
                self.operator,
                ConditionOperator::NotEquals | ConditionOperator::NotContains
            );
        };
        let expected = self.value.trim();

        match self.operator {
            ConditionOperator::Equals => equals(actual, expected),
            ConditionOperator::NotEquals => !equals(actual, expected),
            ConditionOperator::Contains => text_test(actual, expected, |a, e| a.contains(e)),
            ConditionOperator::NotContains => !text_test(actual, expected, |a, e| a.contains(e)),
            ConditionOperator::StartsWith => text_test(actual, expected, |a, e| a.starts_with(e)),
            ConditionOperator::EndsWith => text_test(actual, expected, |a, e| a.ends_with(e)),
            ConditionOperator::GreaterThan => numeric_test(actual, expected, |a, e| a > e),
            ConditionOperator::LessThan => numeric_test(actual, expected, |a, e| a < e),
            ConditionOperator::GreaterThanOrEqual => numeric_test(actual, expected, |a, e| a >= e),
            ConditionOperator::LessThanOrEqual => numeric_test(actual, expected, |a, e| a <= e),
        }
    }
}

// Only JSON numbers compare numerically; numeric-looking strings such as
// RUCs are identifiers and compare as text.
fn equals(actual: &Value, expected: &str) -> bool {
    if let (Value::Number(n), Ok(e)) = (actual, expected.parse::<f64>()) {
        return n.as_f64().is_some_and(|a| (a - e).abs() < NUMERIC_TOLERANCE);
    }
    field_text(actual).is_some_and(|a| a.to_lowercase() == expected.to_lowercase())
}

fn text_test(actual: &Value, expected: &str, test: impl Fn(&str, &str) -> bool) -> bool {
    field_text(actual).is_some_and(|a| test(&a.to_lowercase(), &expected.to_lowercase()))
}

fn numeric_test(actual: &Value, expected: &str, test: impl Fn(f64, f64) -> bool) -> bool {
    match (field_number(actual), expected.parse::<f64>()) {
        (Some(a), Ok(e)) => test(a, e),
        _ => false,
    }
}

impl ConditionGroup {
    /// Whether this group or any descendant holds a complete leaf.
    pub fn is_testable(&self) -> bool {
        self.conditions.iter().any(|c| c.is_complete()) || self.groups.iter().any(|g| g.is_testable())
    }

    /// Incomplete leaves and nested groups with nothing to test are
    /// ignored. A group with nothing left to test matches every record.
    pub fn matches(&self, record: &Value) -> bool {
        let mut results = self
            .conditions
            .iter()
            .filter(|c| c.is_complete())
            .map(|c| c.matches(record))
            .chain(
                self.groups
                    .iter()
                    .filter(|g| g.is_testable())
                    .map(|g| g.matches(record)),
            )
            .peekable();

        if results.peek().is_none() {
            return true;
        }
        match self.operator {
            GroupOperator::And => results.all(|r| r),
            GroupOperator::Or => results.any(|r| r),
        }
    }
}

impl ConditionTree {
    pub fn matches(&self, record: &Value) -> bool {
        self.root.matches(record)
    }
}

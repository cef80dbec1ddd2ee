use serde::Serialize;

use crate::classifier::TransactionType;

/// One bank-statement line read from a CSV statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRow {
    pub date: Option<String>,
    pub description: String,
    pub amount: f64,
    pub kind: Option<TransactionType>,
}

/// A supplier as listed in the suppliers CSV, keyed by RUC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supplier {
    pub ruc: String,
    pub name: String,
}

#[cfg(test)]
impl StatementRow {
    pub fn new(description: impl Into<String>, amount: f64) -> Self {
        Self {
            date: None,
            description: description.into(),
            amount,
            kind: None,
        }
    }
}

//! Accounting-entry templates: the form checks run before a template is
//! submitted, and a preview of the ledger lines a template produces for a
//! record.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::classifier::TransactionType;
use crate::conditions::ConditionTree;
use crate::error::CuadreError;

/// Largest debit/credit difference still treated as balanced.
pub const BALANCE_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateFilter {
    Invoices,
    Payroll,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Pen,
    Usd,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Pen => "S/ ",
            Self::Usd => "$",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Pen => "PEN",
            Self::Usd => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = CuadreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PEN" | "S/" => Ok(Self::Pen),
            "USD" | "$" => Ok(Self::Usd),
            other => Err(CuadreError::Other(format!("Unknown currency: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationType {
    FixedAmount,
    Percentage,
    TransactionAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLine {
    #[serde(default)]
    pub account_code: String,
    pub movement_type: MovementType,
    pub application_type: ApplicationType,
    #[serde(default)]
    pub calculation_base: Option<String>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub execution_order: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountingTemplate {
    pub template_number: String,
    pub name: String,
    pub transaction_type: Option<TransactionType>,
    pub filter: Option<TemplateFilter>,
    pub currency: Option<Currency>,
    pub condition: ConditionTree,
    pub lines: Vec<TemplateLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinesTotals {
    pub debit: f64,
    pub credit: f64,
    pub balanced: bool,
}

pub fn lines_totals(lines: &[TemplateLine]) -> LinesTotals {
    let sum = |movement: MovementType| -> f64 {
        lines
            .iter()
            .filter(|l| l.movement_type == movement)
            .map(|l| l.value)
            .sum()
    };
    let debit = sum(MovementType::Debit);
    let credit = sum(MovementType::Credit);
    LinesTotals {
        debit,
        credit,
        balanced: (debit - credit).abs() < BALANCE_EPSILON,
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Template number is required")]
    MissingNumber,
    #[error("Name is required")]
    MissingName,
    #[error("Transaction type is required")]
    MissingTransactionType,
    #[error("Filter is required")]
    MissingFilter,
    #[error("Currency is required")]
    MissingCurrency,
    #[error("At least one line is required")]
    NoLines,
    #[error("Every line needs an account code (missing on line {})", join_numbers(.0))]
    MissingAccountCode(Vec<usize>),
    #[error("Lines are not balanced: debit {debit:.2}, credit {credit:.2}")]
    Unbalanced { debit: f64, credit: f64 },
}

fn join_numbers(numbers: &[usize]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A ledger line produced by applying a template to a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerLine {
    pub account_code: String,
    pub movement_type: MovementType,
    pub amount: f64,
    pub execution_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateOutcome {
    pub matched: bool,
    pub lines: Vec<LedgerLine>,
}

fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

fn record_number(record: &Value, field: &str) -> Option<f64> {
    match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl AccountingTemplate {
    pub fn lines_totals(&self) -> LinesTotals {
        lines_totals(&self.lines)
    }

    /// Form checks in the order they are shown to the user.
    pub fn validation_errors(&self) -> Vec<TemplateError> {
        let mut errors = Vec::new();
        if self.template_number.trim().is_empty() {
            errors.push(TemplateError::MissingNumber);
        }
        if self.name.trim().is_empty() {
            errors.push(TemplateError::MissingName);
        }
        if self.transaction_type.is_none() {
            errors.push(TemplateError::MissingTransactionType);
        }
        if self.filter.is_none() {
            errors.push(TemplateError::MissingFilter);
        }
        if self.currency.is_none() {
            errors.push(TemplateError::MissingCurrency);
        }
        if self.lines.is_empty() {
            errors.push(TemplateError::NoLines);
        }
        let missing: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.account_code.trim().is_empty())
            .map(|(i, _)| i + 1)
            .collect();
        if !missing.is_empty() {
            errors.push(TemplateError::MissingAccountCode(missing));
        }
        let totals = self.lines_totals();
        if !totals.balanced {
            errors.push(TemplateError::Unbalanced {
                debit: totals.debit,
                credit: totals.credit,
            });
        }
        errors
    }

    pub fn can_submit(&self) -> bool {
        self.validation_errors().is_empty()
    }

    fn scope_matches(&self, record: &Value) -> bool {
        let doc_type = record
            .get("documentType")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_uppercase());
        let filter_ok = match (self.filter, doc_type.as_deref()) {
            (None | Some(TemplateFilter::Both), _) | (_, None) => true,
            (Some(TemplateFilter::Invoices), Some(doc)) => matches!(doc, "INVOICE" | "INVOICES"),
            (Some(TemplateFilter::Payroll), Some(doc)) => doc == "PAYROLL",
        };

        let currency_ok = match (self.currency, record.get("currency").and_then(Value::as_str)) {
            (Some(currency), Some(code)) => currency.code().eq_ignore_ascii_case(code.trim()),
            _ => true,
        };
        filter_ok && currency_ok
    }

    pub fn applies_to(&self, record: &Value) -> bool {
        self.scope_matches(record) && self.condition.matches(record)
    }

    /// Apply the template to `record`, producing its lines in execution
    /// order when the scope and condition match.
    pub fn evaluate(&self, record: &Value) -> TemplateOutcome {
        if !self.applies_to(record) {
            return TemplateOutcome {
                matched: false,
                lines: Vec::new(),
            };
        }

        let transaction_amount = record_number(record, "amount").unwrap_or(0.0).abs();
        let mut ordered: Vec<&TemplateLine> = self.lines.iter().collect();
        ordered.sort_by_key(|l| l.execution_order);

        let lines = ordered
            .into_iter()
            .map(|line| {
                let amount = match line.application_type {
                    ApplicationType::FixedAmount => line.value,
                    ApplicationType::TransactionAmount => transaction_amount,
                    ApplicationType::Percentage => {
                        let base = line
                            .calculation_base
                            .as_deref()
                            .and_then(|field| record_number(record, field))
                            .map(f64::abs)
                            .unwrap_or(transaction_amount);
                        base * line.value / 100.0
                    }
                };
                LedgerLine {
                    account_code: line.account_code.clone(),
                    movement_type: line.movement_type,
                    amount: round2(amount),
                    execution_order: line.execution_order,
                }
            })
            .collect();

        TemplateOutcome {
            matched: true,
            lines,
        }
    }
}

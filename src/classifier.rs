use std::cmp::Reverse;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{CuadreError, Result};
use crate::models::StatementRow;

/// Symbolic category assigned to a bank-statement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    IncomeSalary,
    IncomeBonus,
    IncomeInterest,
    IncomeSales,
    IncomeServices,
    IncomeTransfer,
    IncomeRefund,
    IncomeAdjustment,
    IncomeOther,
    PayrollSalary,
    PayrollCts,
    PayrollAfp,
    TaxPayment,
    TaxItf,
    TaxDetraction,
    ExpenseUtilities,
    ExpenseInsurance,
    ExpenseCommissions,
    TransferInbank,
    TransferExternal,
    WithdrawalCash,
    ExpensePurchase,
    Adjustment,
    ExpenseOther,
}

impl TransactionType {
    pub const ALL: &'static [TransactionType] = &[
        Self::IncomeSalary,
        Self::IncomeBonus,
        Self::IncomeInterest,
        Self::IncomeSales,
        Self::IncomeServices,
        Self::IncomeTransfer,
        Self::IncomeRefund,
        Self::IncomeAdjustment,
        Self::IncomeOther,
        Self::PayrollSalary,
        Self::PayrollCts,
        Self::PayrollAfp,
        Self::TaxPayment,
        Self::TaxItf,
        Self::TaxDetraction,
        Self::ExpenseUtilities,
        Self::ExpenseInsurance,
        Self::ExpenseCommissions,
        Self::TransferInbank,
        Self::TransferExternal,
        Self::WithdrawalCash,
        Self::ExpensePurchase,
        Self::Adjustment,
        Self::ExpenseOther,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncomeSalary => "INCOME_SALARY",
            Self::IncomeBonus => "INCOME_BONUS",
            Self::IncomeInterest => "INCOME_INTEREST",
            Self::IncomeSales => "INCOME_SALES",
            Self::IncomeServices => "INCOME_SERVICES",
            Self::IncomeTransfer => "INCOME_TRANSFER",
            Self::IncomeRefund => "INCOME_REFUND",
            Self::IncomeAdjustment => "INCOME_ADJUSTMENT",
            Self::IncomeOther => "INCOME_OTHER",
            Self::PayrollSalary => "PAYROLL_SALARY",
            Self::PayrollCts => "PAYROLL_CTS",
            Self::PayrollAfp => "PAYROLL_AFP",
            Self::TaxPayment => "TAX_PAYMENT",
            Self::TaxItf => "TAX_ITF",
            Self::TaxDetraction => "TAX_DETRACTION",
            Self::ExpenseUtilities => "EXPENSE_UTILITIES",
            Self::ExpenseInsurance => "EXPENSE_INSURANCE",
            Self::ExpenseCommissions => "EXPENSE_COMMISSIONS",
            Self::TransferInbank => "TRANSFER_INBANK",
            Self::TransferExternal => "TRANSFER_EXTERNAL",
            Self::WithdrawalCash => "WITHDRAWAL_CASH",
            Self::ExpensePurchase => "EXPENSE_PURCHASE",
            Self::Adjustment => "ADJUSTMENT",
            Self::ExpenseOther => "EXPENSE_OTHER",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = CuadreError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_uppercase();
        Self::ALL
            .iter()
            .find(|t| t.as_str() == wanted)
            .copied()
            .ok_or_else(|| CuadreError::Other(format!("Unknown transaction type: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Built-in rule tables
// ---------------------------------------------------------------------------

struct RuleDef {
    patterns: &'static [&'static str],
    kind: TransactionType,
    priority: i32,
}

const INCOME_RULES: &[RuleDef] = &[
    RuleDef {
        patterns: &[r"ABONO\s+(DE\s+)?HABERES", r"ABONO\s+REMUNERACI", r"\bSUELDO\b"],
        kind: TransactionType::IncomeSalary,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"\bBONO\b", r"GRATIFICACI[OÓ]N", r"BONIFICACI[OÓ]N"],
        kind: TransactionType::IncomeBonus,
        priority: 2,
    },
    RuleDef {
        patterns: &[r"\bINTERES(ES)?\b", r"\bINT\.?\s+GANADOS?"],
        kind: TransactionType::IncomeInterest,
        priority: 2,
    },
    RuleDef {
        patterns: &[r"\bVENTAS?\b", r"ABONO\s+POS", r"VISANET", r"NIUBIZ", r"IZIPAY"],
        kind: TransactionType::IncomeSales,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"HONORARIOS", r"\bSERVICIOS?\b", r"COBRO\s+FACT"],
        kind: TransactionType::IncomeServices,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"TRANSF", r"TRAN\.?\s*CTAS", r"\bCCE\b", r"DEPOSITO", r"INTERBANC"],
        kind: TransactionType::IncomeTransfer,
        priority: 0,
    },
    RuleDef {
        patterns: &[r"DEVOL", r"REEMBOLSO", r"EXTORNO"],
        kind: TransactionType::IncomeRefund,
        priority: 2,
    },
    RuleDef {
        patterns: &[r"AJUSTE", r"REGULARIZACI[OÓ]N"],
        kind: TransactionType::IncomeAdjustment,
        priority: 1,
    },
];

const EXPENSE_RULES: &[RuleDef] = &[
    RuleDef {
        patterns: &[r"PAGO\s+(DE\s+)?HABERES", r"PLANILLA", r"REMUNERACI[OÓ]N", r"\bSUELDOS?\b"],
        kind: TransactionType::PayrollSalary,
        priority: 2,
    },
    RuleDef {
        patterns: &[r"\bCTS\b"],
        kind: TransactionType::PayrollCts,
        priority: 3,
    },
    RuleDef {
        patterns: &[r"PAGOS?\s+AFP", r"AFP\s*NET"],
        kind: TransactionType::PayrollAfp,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"PAGOS AFP (INTEGRA|PRIMA|HABITAT|PROFUTURO)"],
        kind: TransactionType::PayrollAfp,
        priority: 3,
    },
    RuleDef {
        patterns: &[r"DETRACCI[OÓ]N", r"\bDETRAC\b", r"BN\s+DETR"],
        kind: TransactionType::TaxDetraction,
        priority: 3,
    },
    RuleDef {
        patterns: &[r"\bITF\b", r"IMPUESTO\s+(A\s+LAS\s+)?TRANS"],
        kind: TransactionType::TaxItf,
        priority: 3,
    },
    RuleDef {
        patterns: &[r"SUNAT", r"PAGO\s+(DE\s+)?IMPUESTOS?", r"TRIBUTOS?", r"ESSALUD"],
        kind: TransactionType::TaxPayment,
        priority: 2,
    },
    RuleDef {
        patterns: &[
            r"LUZ DEL SUR",
            r"\bENEL\b",
            r"SEDAPAL",
            r"TELEFONICA",
            r"MOVISTAR",
            r"\bCLARO\b",
            r"\bENTEL\b",
        ],
        kind: TransactionType::ExpenseUtilities,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"\bSEGUROS?\b", r"RIMAC", r"PACIFICO\s+SEG", r"MAPFRE"],
        kind: TransactionType::ExpenseInsurance,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"COMISI[OÓ]N", r"\bCOM\.", r"MANTENIMIENTO", r"\bPORTES?\b"],
        kind: TransactionType::ExpenseCommissions,
        priority: 1,
    },
    RuleDef {
        patterns: &[
            r"TRAN\.?\s*CTAS\.?\s*(TERC|PROP)",
            r"TRASPASO",
            r"TRANSF\.?\s+MISMO\s+BANCO",
        ],
        kind: TransactionType::TransferInbank,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"INTERBANC", r"\bCCE\b", r"TRANSF\.?\s+OTROS?\s+BANCOS?"],
        kind: TransactionType::TransferExternal,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"RETIRO", r"\bCAJERO\b", r"\bATM\b"],
        kind: TransactionType::WithdrawalCash,
        priority: 1,
    },
    RuleDef {
        patterns: &[r"PAGO\s+(A\s+)?PROV", r"PAGO\s+FACT", r"^PAGO\s"],
        kind: TransactionType::ExpensePurchase,
        priority: 0,
    },
    RuleDef {
        patterns: &[r"EXTORNO", r"AJUSTE", r"REGULARIZACI[OÓ]N"],
        kind: TransactionType::Adjustment,
        priority: 0,
    },
];

// ---------------------------------------------------------------------------
// Compiled rules
// ---------------------------------------------------------------------------

/// A classification rule: any matching pattern emits `kind`.
#[derive(Debug, Clone)]
pub struct Rule {
    patterns: Vec<Regex>,
    pub kind: TransactionType,
    pub priority: i32,
}

impl Rule {
    pub fn new<S: AsRef<str>>(patterns: &[S], kind: TransactionType, priority: i32) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| CuadreError::InvalidPattern {
                        pattern: p.as_ref().to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            kind,
            priority,
        })
    }

    pub fn matches(&self, description: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(description))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|re| re.as_str())
    }
}

/// An ordered set of rules with its own fallback category.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: TransactionType,
}

impl RuleTable {
    fn from_defs(defs: &[RuleDef], fallback: TransactionType) -> Self {
        let rules = defs
            .iter()
            .filter_map(|d| match Rule::new(d.patterns, d.kind, d.priority) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::error!("skipping built-in {} rule: {e}", d.kind);
                    None
                }
            })
            .collect();
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn fallback(&self) -> TransactionType {
        self.fallback
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Highest priority among matching rules wins; equal priorities go to
    /// the rule declared first.
    pub fn classify(&self, description: &str) -> TransactionType {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.matches(description))
            .max_by_key(|(idx, rule)| (rule.priority, Reverse(*idx)))
            .map(|(_, rule)| rule.kind)
            .unwrap_or(self.fallback)
    }
}

/// Income and expense tables, selected by the sign of the amount.
#[derive(Debug, Clone)]
pub struct Classifier {
    income: RuleTable,
    expense: RuleTable,
}

static BUILTIN: LazyLock<Classifier> = LazyLock::new(Classifier::builtin);

impl Classifier {
    pub fn builtin() -> Self {
        Self {
            income: RuleTable::from_defs(INCOME_RULES, TransactionType::IncomeOther),
            expense: RuleTable::from_defs(EXPENSE_RULES, TransactionType::ExpenseOther),
        }
    }

    /// Built-in tables with `custom` rules appended after them.
    pub fn with_custom(custom: &CustomRules) -> Result<Self> {
        let mut classifier = Self::builtin();
        for spec in &custom.income {
            classifier.income.push(spec.compile()?);
        }
        for spec in &custom.expense {
            classifier.expense.push(spec.compile()?);
        }
        tracing::debug!(
            income = custom.income.len(),
            expense = custom.expense.len(),
            "custom rules loaded"
        );
        Ok(classifier)
    }

    pub fn income(&self) -> &RuleTable {
        &self.income
    }

    pub fn expense(&self) -> &RuleTable {
        &self.expense
    }

    pub fn table_for(&self, amount: f64) -> &RuleTable {
        if amount >= 0.0 {
            &self.income
        } else {
            &self.expense
        }
    }

    pub fn classify(&self, description: &str, amount: f64) -> TransactionType {
        self.table_for(amount).classify(description)
    }

    /// Fill in `kind` on rows that have none yet.
    pub fn classify_batch(&self, rows: &mut [StatementRow]) {
        for row in rows.iter_mut() {
            if row.kind.is_none() {
                row.kind = Some(self.classify(&row.description, row.amount));
            }
        }
    }
}

/// Classify with the built-in rule tables.
pub fn classify(description: &str, amount: f64) -> TransactionType {
    BUILTIN.classify(description, amount)
}

pub fn builtin() -> &'static Classifier {
    &BUILTIN
}

// ---------------------------------------------------------------------------
// Custom rules file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub patterns: Vec<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub priority: i32,
}

impl RuleSpec {
    fn compile(&self) -> Result<Rule> {
        Rule::new(self.patterns.as_slice(), self.kind, self.priority)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomRules {
    #[serde(default)]
    pub income: Vec<RuleSpec>,
    #[serde(default)]
    pub expense: Vec<RuleSpec>,
}

pub fn load_custom_rules(path: &Path) -> Result<CustomRules> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

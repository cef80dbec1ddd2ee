pub mod classify;
pub mod condition;
pub mod config;
pub mod rules;
pub mod statement;
pub mod status;
pub mod template;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use crate::classifier::{load_custom_rules, Classifier};
use crate::conditions::GroupOperator;
use crate::error::Result;
use crate::settings::{shellexpand_path, Settings};
use crate::template::Currency;

/// Built-in classifier, extended with the configured rules file if any.
pub(crate) fn load_classifier(settings: &Settings) -> Result<Classifier> {
    match &settings.rules_file {
        Some(path) => {
            let custom = load_custom_rules(&resolve(path))?;
            Classifier::with_custom(&custom)
        }
        None => Ok(Classifier::builtin()),
    }
}

pub(crate) fn resolve(path: &str) -> PathBuf {
    PathBuf::from(shellexpand_path(path))
}

pub(crate) fn read_json(path: &str) -> Result<Value> {
    let content = std::fs::read_to_string(Path::new(path))?;
    Ok(serde_json::from_str(&content)?)
}

#[derive(Parser)]
#[command(
    name = "cuadre",
    version,
    about = "Bank-statement classifier and accounting-entry template checker."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify one bank-statement description.
    Classify {
        /// Description as printed on the statement
        description: String,
        /// Signed amount: positive for income, negative for expenses
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// Classify every line of a CSV bank statement.
    Statement {
        /// Path to the statement CSV
        file: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the classification rules.
    Rules {
        /// Only show one table
        #[arg(long)]
        table: Option<RuleTableArg>,
    },
    /// Work with template condition trees.
    Condition {
        #[command(subcommand)]
        command: ConditionCommands,
    },
    /// Work with accounting-entry templates.
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Change settings.
    Config {
        /// JSON file with extra classification rules
        #[arg(long = "rules-file")]
        rules_file: Option<String>,
        /// CSV file (ruc,name) used to label supplier conditions
        #[arg(long = "suppliers-file")]
        suppliers_file: Option<String>,
        /// Default currency: PEN or USD
        #[arg(long)]
        currency: Option<Currency>,
        /// Log filter used when RUST_LOG is not set, e.g. warn or cuadre=debug
        #[arg(long = "log-filter")]
        log_filter: Option<String>,
    },
    /// Show settings and rule counts.
    Status,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleTableArg {
    Income,
    Expense,
}

#[derive(Subcommand)]
pub enum ConditionCommands {
    /// Re-emit a stored condition in canonical form.
    Normalize {
        /// Path to the condition JSON
        file: String,
    },
    /// Test a condition against a record.
    Check {
        /// Path to the condition JSON
        condition: String,
        /// Path to the record JSON (amount, supplier, description, ...)
        record: String,
    },
    /// Apply one editing step to a stored condition and write it back.
    Edit {
        /// Path to the condition JSON, rewritten in place
        file: String,
        #[command(subcommand)]
        action: EditAction,
    },
}

/// Groups are addressed by dotted child indices: `root` (or empty) is the
/// top-level group, `0` its first nested group, `0.1` the second group
/// inside that.
#[derive(Subcommand)]
pub enum EditAction {
    /// Append an empty condition to a group.
    AddCondition {
        #[arg(long, default_value = "root")]
        group: String,
    },
    /// Remove a condition from a group.
    RemoveCondition {
        #[arg(long, default_value = "root")]
        group: String,
        /// 0-based condition index
        index: usize,
    },
    /// Change the field, operator or value of one condition.
    Set {
        #[arg(long, default_value = "root")]
        group: String,
        /// 0-based condition index
        index: usize,
        attribute: LeafAttribute,
        value: String,
    },
    /// Set a group's AND/OR operator.
    Operator {
        #[arg(long, default_value = "root")]
        group: String,
        operator: GroupOperator,
    },
    /// Add a nested group (with one empty condition) to a group.
    AddGroup {
        #[arg(long, default_value = "root")]
        group: String,
    },
    /// Remove a nested group.
    RemoveGroup {
        /// Path of the group to remove, e.g. 0 or 0.1
        group: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LeafAttribute {
    Field,
    Operator,
    Value,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Run the form checks on a template.
    Validate {
        /// Path to the template JSON
        file: String,
    },
    /// Show the ledger lines a template produces for a record.
    Preview {
        /// Path to the template JSON
        file: String,
        /// Path to the record JSON
        record: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

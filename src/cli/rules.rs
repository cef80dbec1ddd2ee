use comfy_table::{Cell, Table};

use crate::classifier::RuleTable;
use crate::cli::{load_classifier, RuleTableArg};
use crate::error::Result;
use crate::settings::Settings;

fn print_table(title: &str, rules: &RuleTable) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Priority", "Type", "Patterns"]);
    for (idx, rule) in rules.rules().iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(rule.priority),
            Cell::new(rule.kind),
            Cell::new(rule.patterns().collect::<Vec<_>>().join("\n")),
        ]);
    }
    println!("{title} (fallback {})\n{table}", rules.fallback());
}

pub fn list(settings: &Settings, only: Option<RuleTableArg>) -> Result<()> {
    let classifier = load_classifier(settings)?;
    if only != Some(RuleTableArg::Expense) {
        print_table("Income rules", classifier.income());
    }
    if only != Some(RuleTableArg::Income) {
        print_table("Expense rules", classifier.expense());
    }
    Ok(())
}

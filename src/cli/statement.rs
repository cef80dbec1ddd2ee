use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::classifier::TransactionType;
use crate::cli::load_classifier;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::Settings;
use crate::statement::read_statement;

pub fn run(settings: &Settings, file: &str, json: bool) -> Result<()> {
    let classifier = load_classifier(settings)?;
    let mut rows = read_statement(Path::new(file))?;
    classifier.classify_batch(&mut rows);
    tracing::info!(rows = rows.len(), file, "statement classified");

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let currency = settings.default_currency;
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Type"]);
    let mut summary: BTreeMap<TransactionType, (usize, f64)> = BTreeMap::new();
    for row in &rows {
        let kind = row.kind.unwrap_or_else(|| classifier.classify(&row.description, row.amount));
        let entry = summary.entry(kind).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += row.amount;

        let amount = if row.amount < 0.0 {
            money(row.amount, currency).red().to_string()
        } else {
            money(row.amount, currency).green().to_string()
        };
        table.add_row(vec![
            Cell::new(row.date.as_deref().unwrap_or("")),
            Cell::new(&row.description),
            Cell::new(amount),
            Cell::new(kind),
        ]);
    }
    println!("Statement\n{table}");

    let mut totals = Table::new();
    totals.set_header(vec!["Type", "Lines", "Total"]);
    for (kind, (count, total)) in &summary {
        totals.add_row(vec![
            Cell::new(kind),
            Cell::new(count),
            Cell::new(money(*total, currency)),
        ]);
    }
    println!("By type\n{totals}");
    Ok(())
}

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::read_json;
use crate::error::{CuadreError, Result};
use crate::fmt::money;
use crate::settings::Settings;
use crate::template::{AccountingTemplate, MovementType};

fn load_template(file: &str) -> Result<AccountingTemplate> {
    let template: AccountingTemplate = serde_json::from_value(read_json(file)?)?;
    tracing::debug!(number = %template.template_number, lines = template.lines.len(), "template loaded");
    Ok(template)
}

pub fn validate(settings: &Settings, file: &str) -> Result<()> {
    let template = load_template(file)?;
    let currency = template.currency.unwrap_or(settings.default_currency);
    let totals = template.lines_totals();

    println!("Template:  {} {}", template.template_number, template.name);
    println!("Debit:     {}", money(totals.debit, currency));
    println!("Credit:    {}", money(totals.credit, currency));

    if template.can_submit() {
        println!("{}", "Template is valid.".green());
        return Ok(());
    }
    let errors = template.validation_errors();
    for error in &errors {
        println!("  {} {error}", "-".red());
    }
    Err(CuadreError::InvalidTemplate(format!(
        "{} problem(s) found in {file}",
        errors.len()
    )))
}

pub fn preview(settings: &Settings, file: &str, record: &str, json: bool) -> Result<()> {
    let template = load_template(file)?;
    let record = read_json(record)?;
    let outcome = template.evaluate(&record);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    if !outcome.matched {
        println!("{}", "Template does not apply to this record.".yellow());
        return Ok(());
    }

    let currency = template.currency.unwrap_or(settings.default_currency);
    let mut table = Table::new();
    table.set_header(vec!["Order", "Account", "Debit", "Credit"]);
    let (mut debit, mut credit) = (0.0, 0.0);
    for line in &outcome.lines {
        let (d, c) = match line.movement_type {
            MovementType::Debit => {
                debit += line.amount;
                (money(line.amount, currency), String::new())
            }
            MovementType::Credit => {
                credit += line.amount;
                (String::new(), money(line.amount, currency))
            }
        };
        table.add_row(vec![
            Cell::new(line.execution_order),
            Cell::new(&line.account_code),
            Cell::new(d),
            Cell::new(c),
        ]);
    }
    table.add_row(vec![
        Cell::new(""),
        Cell::new("Total"),
        Cell::new(money(debit, currency)),
        Cell::new(money(credit, currency)),
    ]);
    println!("{table}");
    Ok(())
}

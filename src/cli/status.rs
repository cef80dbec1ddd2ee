use crate::classifier;
use crate::cli::{load_classifier, resolve};
use crate::error::Result;
use crate::settings::{settings_file_exists, settings_path, Settings};
use crate::suppliers::{load_suppliers, SupplierDirectory};

pub fn run(settings: &Settings) -> Result<()> {
    let not_set = "(not set)";
    println!(
        "Settings:   {}{}",
        settings_path().display(),
        if settings_file_exists() { "" } else { " (defaults)" }
    );
    println!("Currency:   {}", settings.default_currency.code());
    println!("Log filter: {}", settings.log_filter);
    println!("Rules file: {}", settings.rules_file.as_deref().unwrap_or(not_set));
    println!("Suppliers:  {}", settings.suppliers_file.as_deref().unwrap_or(not_set));

    let builtin = classifier::builtin();
    let active = load_classifier(settings)?;
    let builtin_count = builtin.income().rules().len() + builtin.expense().rules().len();
    let active_count = active.income().rules().len() + active.expense().rules().len();

    println!();
    println!("Income rules:   {}", builtin.income().rules().len());
    println!("Expense rules:  {}", builtin.expense().rules().len());
    println!("Custom rules:   {}", active_count - builtin_count);

    if let Some(path) = &settings.suppliers_file {
        let directory = SupplierDirectory::from_suppliers(load_suppliers(&resolve(path))?);
        if directory.is_empty() {
            println!("Suppliers:      none listed");
        } else {
            println!("Suppliers:      {}", directory.len());
        }
    }
    Ok(())
}

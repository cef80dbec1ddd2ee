use crate::error::Result;
use crate::settings::{save_settings, settings_path, Settings};
use crate::template::Currency;

pub fn run(
    mut settings: Settings,
    rules_file: Option<String>,
    suppliers_file: Option<String>,
    currency: Option<Currency>,
    log_filter: Option<String>,
) -> Result<()> {
    let mut changed = false;
    if let Some(path) = rules_file {
        settings.rules_file = if path.is_empty() { None } else { Some(path) };
        changed = true;
    }
    if let Some(path) = suppliers_file {
        settings.suppliers_file = if path.is_empty() { None } else { Some(path) };
        changed = true;
    }
    if let Some(currency) = currency {
        settings.default_currency = currency;
        changed = true;
    }
    if let Some(filter) = log_filter {
        settings.log_filter = filter;
        changed = true;
    }

    if changed {
        save_settings(&settings)?;
        println!("Settings saved to {}", settings_path().display());
    } else {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    }
    Ok(())
}

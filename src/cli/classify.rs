use crate::classifier;
use crate::cli::load_classifier;
use crate::error::Result;
use crate::settings::Settings;

pub fn run(settings: &Settings, description: &str, amount: f64) -> Result<()> {
    let kind = match settings.rules_file {
        Some(_) => load_classifier(settings)?.classify(description, amount),
        None => classifier::classify(description, amount),
    };
    println!("{kind}");
    Ok(())
}

mod classifier;
mod cli;
mod conditions;
mod error;
mod fmt;
mod models;
mod settings;
mod statement;
mod suppliers;
mod template;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConditionCommands, TemplateCommands};
use settings::load_settings;

fn setup_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let settings = load_settings();
    setup_logging(&settings.log_filter);

    let result = match cli.command {
        Commands::Classify { description, amount } => cli::classify::run(&settings, &description, amount),
        Commands::Statement { file, json } => cli::statement::run(&settings, &file, json),
        Commands::Rules { table } => cli::rules::list(&settings, table),
        Commands::Condition { command } => match command {
            ConditionCommands::Normalize { file } => cli::condition::normalize(&file),
            ConditionCommands::Check { condition, record } => {
                cli::condition::check(&settings, &condition, &record)
            }
            ConditionCommands::Edit { file, action } => cli::condition::edit(&file, action),
        },
        Commands::Template { command } => match command {
            TemplateCommands::Validate { file } => cli::template::validate(&settings, &file),
            TemplateCommands::Preview { file, record, json } => {
                cli::template::preview(&settings, &file, &record, json)
            }
        },
        Commands::Config {
            rules_file,
            suppliers_file,
            currency,
            log_filter,
        } => cli::config::run(settings, rules_file, suppliers_file, currency, log_filter),
        Commands::Status => cli::status::run(&settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

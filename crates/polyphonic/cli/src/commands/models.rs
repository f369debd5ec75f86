//! Model persona catalog command

use crate::error::CliResult;
use crate::output::OutputFormat;
use colored::Colorize;
use polyphonic_types::ModelProfile;

/// Show the built-in persona catalog
pub fn execute(format: OutputFormat) -> CliResult<()> {
    let profiles = ModelProfile::builtin();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profiles)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&profiles)?),
        OutputFormat::Table => {
            println!("{}", "Model Personas".bold().cyan());
            println!("{}", "=".repeat(60));
            for profile in &profiles {
                println!(
                    "  {} {} ({})",
                    profile.id.to_string().yellow().bold(),
                    profile.name,
                    profile.provider.dimmed()
                );
                println!("      {}", profile.description.dimmed());
            }
        }
    }
    Ok(())
}

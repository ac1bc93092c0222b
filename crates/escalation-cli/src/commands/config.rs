use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the resolved configuration (password redacted)
    Show {
        /// TOML configuration file (defaults to the process environment)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show { config } => {
            let config = super::load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
    }
    Ok(())
}

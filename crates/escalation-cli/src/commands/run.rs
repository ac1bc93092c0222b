use clap::Args;
use escalation_core::invoke_with;
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// TOML configuration file (defaults to the process environment)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Exit status 1 on a failed pass; the response body is printed either way.
pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let response = invoke_with(|| super::load_config(args.config.as_deref()));
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

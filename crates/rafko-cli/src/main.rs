//! `rafko` - command-line front end for the autodiff training runtime.

use clap::Parser;

use rafko_cli::config::CliConfig;
use rafko_cli::RafkoCli;

fn main() -> anyhow::Result<()> {
    let cli = RafkoCli::parse();
    let config = match &cli.config {
        Some(path) => CliConfig::load_from_file(path)?,
        None => CliConfig::default(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level)).init();

    cli.execute()?;
    Ok(())
}

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use infragraph::EngineConfig;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: EngineConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = EngineConfig::load(cli.config.as_deref())?;
    infragraph::init_logging(cli.verbose, cli.quiet, config.log_level()?);

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Diff(args) => commands::diff::run(&ctx, &args),
        Command::Status(args) => commands::status::run(&ctx, &args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "infragraph", &mut io::stdout());
            Ok(())
        }
    }
}

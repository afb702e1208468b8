use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "infragraph")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Apply and inspect declarative infrastructure state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to ~/.config/infragraph/config.toml)
    #[arg(short, long, global = true, env = "INFRAGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the state directory to a desired state file
    Apply(ApplyArgs),

    /// Compare the committed resources of two state files, grouped by apply level
    Diff(DiffArgs),

    /// Show resources whose last change was never confirmed
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Desired state file with the models and their tagged resources
    pub desired: PathBuf,

    /// State directory (overrides the config file)
    #[arg(short, long)]
    pub state_dir: Option<PathBuf>,

    /// Module input as module.key=value, repeatable
    #[arg(short, long = "input", value_name = "ASSIGNMENT")]
    pub inputs: Vec<String>,

    /// Module the desired models are exposed under
    #[arg(short, long, default_value = "main")]
    pub module: String,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// State file with the previous resources
    pub old: PathBuf,

    /// State file with the new resources
    pub new: PathBuf,

    /// Print the diffs as JSON instead
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct StatusArgs {
    /// State directory (overrides the config file)
    #[arg(short, long)]
    pub state_dir: Option<PathBuf>,
}

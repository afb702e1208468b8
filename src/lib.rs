//! Host-side support for the `declarative` transaction engine
//!
//! Everything the engine leaves to its caller: configuration, desired state
//! files, input resolution, state persistence, reporting and progress display.

pub mod config;
pub mod desired;
pub mod input;
pub mod progress;
pub mod report;
pub mod state;

pub use config::EngineConfig;
pub use input::InputService;
pub use progress::ProgressBarCallback;
pub use state::{StateSnapshot, StateStore};

/// Install the `env_logger` backend
///
/// `verbose` counts `-v` flags; `quiet` wins over it. An explicit `level`
/// (from the config file) replaces the verbosity ladder.
pub fn init_logging(verbose: u8, quiet: bool, level: Option<log::LevelFilter>) {
    let ladder = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let filter = if quiet {
        log::LevelFilter::Error
    } else if verbose == 0 {
        level.unwrap_or(ladder)
    } else {
        ladder
    };

    // A host may have installed a logger already
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp(None)
        .try_init();
}

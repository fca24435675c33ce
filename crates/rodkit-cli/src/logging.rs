use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
};

/// Events from the library, the CLI binary and the workflows.
const CRATE_TARGET: &str = "rodkit";
/// Per-task chatter (one line per energy grid, alignment pass, ...).
const TASK_TARGET: &str = "rodkit::engine::tasks";

/// Levels for rodkit, its per-task module and every other crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Levels {
    rodkit: LevelFilter,
    tasks: LevelFilter,
    others: LevelFilter,
}

impl Levels {
    /// `-v` shows workflow and command progress but keeps tasks quiet;
    /// `-vv` opens up tasks; `-vvv` traces everything, dependencies included.
    fn console(verbosity: u8, quiet: bool) -> Self {
        if quiet {
            return Self::uniform(LevelFilter::ERROR);
        }
        match verbosity {
            0 => Self::uniform(LevelFilter::WARN),
            1 => Self {
                rodkit: LevelFilter::INFO,
                tasks: LevelFilter::WARN,
                others: LevelFilter::WARN,
            },
            2 => Self {
                rodkit: LevelFilter::DEBUG,
                tasks: LevelFilter::INFO,
                others: LevelFilter::WARN,
            },
            _ => Self::uniform(LevelFilter::TRACE),
        }
    }

    /// The log file always keeps rodkit's debug output, whatever the console shows.
    fn file(verbosity: u8) -> Self {
        let console = Self::console(verbosity, false);
        let at_least_debug = |level: LevelFilter| {
            if level == LevelFilter::TRACE {
                level
            } else {
                LevelFilter::DEBUG
            }
        };
        Self {
            rodkit: at_least_debug(console.rodkit),
            tasks: at_least_debug(console.tasks),
            others: console.others,
        }
    }

    fn uniform(level: LevelFilter) -> Self {
        Self {
            rodkit: level,
            tasks: level,
            others: level,
        }
    }

    fn targets(self) -> Targets {
        Targets::new()
            .with_default(self.others)
            .with_target(CRATE_TARGET, self.rodkit)
            .with_target(TASK_TARGET, self.tasks)
    }
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(verbosity >= 2)
        .compact()
        .with_filter(Levels::console(verbosity, quiet).targets());

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(CliError::Io)?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_target(true)
                    .with_filter(Levels::file(verbosity).targets()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

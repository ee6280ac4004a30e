//! Command-line argument handling.

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

/// Parsed command-line options.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the settings file; its directory becomes the config root.
    pub config_path: PathBuf,
    /// Log filter override (e.g. `debug`, `spycheck_core=trace`).
    pub log_level: Option<String>,
    /// Re-read the whole console log instead of seeking to the end.
    pub reprocess_log: bool,
}

impl CliArgs {
    /// Parse `argv` using clap.
    pub fn parse() -> Self {
        let matches = Command::new("spycheck")
            .version(env!("CARGO_PKG_VERSION"))
            .about("TF2 companion that spots listed players and drives kick votes")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Settings file path")
                    .default_value("spycheck/settings.yaml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("FILTER")
                    .help("Log filter override (e.g. debug)"),
            )
            .arg(
                Arg::new("reprocess-log")
                    .long("reprocess-log")
                    .action(ArgAction::SetTrue)
                    .help("Replay the whole console log on startup"),
            )
            .get_matches();

        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_default(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            reprocess_log: matches.get_flag("reprocess-log"),
        }
    }
}

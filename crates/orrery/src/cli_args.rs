//! All the CLI arguments for Orrery

/// The default name of the main config file.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "orrery.toml";

/// Gravitational particles in your terminal. Values given here override the config file.
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
#[non_exhaustive]
pub(crate) struct CliArgs {
    /// How many particles to simulate, between 10 and 200.
    #[arg(short, long)]
    pub particles: Option<usize>,

    /// The strength of gravity, between 0 and 1.
    #[arg(short, long)]
    pub gravity: Option<f64>,

    /// Ticks per second whilst running.
    #[arg(long)]
    pub frame_rate: Option<u32>,

    /// Start the simulation running, rather than paused.
    #[arg(short, long)]
    pub run: bool,

    /// Use a custom config directory.
    #[arg(long, value_name = "Path to config directory")]
    pub config_dir: Option<std::path::PathBuf>,

    /// The name of the main config file, relative to the config directory.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE_NAME)]
    pub main_config: std::path::PathBuf,

    /// Override the log level from the config file.
    #[arg(long, value_enum)]
    pub log_level: Option<crate::config::main::LogLevel>,

    /// Override the log file location from the config file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,
}

use clap::Parser;

/// Interactive menu-driven simulator for a railroad signaling network.
#[derive(Parser, Debug)]
#[command(name = "rrsim", about = "Discrete-step railroad traffic-signaling simulator")]
pub struct CliArgs {
    /// Path to a config file (default: the user config directory's rrsim/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Tracing filter, e.g. "debug" or "rrsim_core=trace" (overrides RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,

    /// A saved network file to load at startup
    #[arg(value_name = "NETWORK_FILE")]
    pub network_file: Option<String>,
}

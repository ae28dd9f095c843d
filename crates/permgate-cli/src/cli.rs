use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "permgate")]
#[command(about = "Check host permissions against the permission store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file (defaults to ./permgate.toml if present)
    #[arg(short, long, global = true, env = "PERMGATE_CONFIG")]
    pub config: Option<String>,

    /// Redis URL (overrides the config file and PERMGATE__REDIS__URL)
    #[arg(long, global = true, env = "PERMGATE_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Log level when RUST_LOG is unset (overrides logging.level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve permissions for one or more hosts
    Check(CheckArgs),
    /// Connect to the store and report connected replicas
    Probe,
    /// Print the lookup key for a host without contacting the store
    Key(KeyArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// Request hosts, e.g. example.com or example.com:8443
    #[arg(required = true)]
    pub hosts: Vec<String>,

    /// Resolve every host this many times (later rounds hit the local cache)
    #[arg(long, default_value_t = 1)]
    pub rounds: u32,

    /// Per-lookup timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,
}

#[derive(Args)]
pub struct KeyArgs {
    pub host: String,
}

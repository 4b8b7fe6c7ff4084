//! Edge Network Admin Command Line Tool
//!
//! This binary runs the network admin HTTP service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;

use edge_netadmin::admin::start_admin_server;
use edge_netadmin::common::{init_logger, Result};
use edge_netadmin::config::{load_config, log_config, ConfigOverrides};
use edge_netadmin::system::ProcessRunner;
use edge_netadmin::{APP_NAME, VERSION};

/// Edge Network Admin: web-based network configuration for edge appliances
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Load configuration from a JSON file
    #[clap(long, env = "NETWORK_ADMIN_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Listening port
    #[clap(short, long)]
    port: Option<u16>,

    /// Bind address
    #[clap(long)]
    bind: Option<String>,

    /// File holding the admin token
    #[clap(long)]
    token_file: Option<PathBuf>,

    /// Log file
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long)]
    log_level: Option<String>,

    /// Directory holding netplan configuration
    #[clap(long)]
    netplan_dir: Option<PathBuf>,

    /// Seconds between writing a configuration and running netplan apply
    #[clap(long)]
    apply_delay: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            bind_address: self.bind.clone(),
            token_file: self.token_file.clone(),
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
            netplan_dir: self.netplan_dir.clone(),
            apply_delay_secs: self.apply_delay,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = load_config(args.config_file.as_deref(), args.overrides())?;

    // Initialize logger
    init_logger(&config.log_level, config.log_file());

    info!("Starting {} v{}", APP_NAME, VERSION);
    log_config(&config);

    start_admin_server(config, Arc::new(ProcessRunner)).await
}

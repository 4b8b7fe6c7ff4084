//! Configuration loading functionality
//!
//! Layers, lowest priority first:
//! 1. Default values (serde defaults)
//! 2. Optional JSON configuration file
//! 3. `NETWORK_ADMIN_*` environment variables
//! 4. Command line overrides

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use log::debug;

use crate::config::defaults::ENV_PREFIX;
use crate::config::error::{ConfigError, Result};
use crate::config::validator::{normalize_config, validate_config};
use crate::config::AdminConfig;

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub token_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub netplan_dir: Option<PathBuf>,
    pub apply_delay_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Apply the overrides on top of `config`
    pub fn apply(self, config: &mut AdminConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind_address) = self.bind_address {
            config.bind_address = bind_address;
        }
        if let Some(token_file) = self.token_file {
            config.token_file = token_file;
        }
        if let Some(log_file) = self.log_file {
            config.log_file = Some(log_file);
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(netplan_dir) = self.netplan_dir {
            config.netplan_dir = netplan_dir;
        }
        if let Some(delay) = self.apply_delay_secs {
            config.apply_delay_secs = delay;
        }
    }
}

/// Load, merge and validate the configuration
pub fn load_config(config_file: Option<&Path>, overrides: ConfigOverrides) -> Result<AdminConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        debug!("Adding file configuration source: {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Json));
    }

    debug!("Adding environment configuration source with prefix: {}", ENV_PREFIX);
    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

    let mut config: AdminConfig = builder.build()?.try_deserialize()?;
    overrides.apply(&mut config);

    normalize_config(&mut config);
    validate_config(&config)?;

    Ok(config)
}

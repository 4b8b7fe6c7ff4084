//! Configuration validator
//!
//! This module checks a loaded configuration for values the service cannot
//! run with.

use log::warn;

use crate::config::defaults;
use crate::config::error::{ConfigError, Result};
use crate::config::AdminConfig;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Validate the configuration
pub fn validate_config(config: &AdminConfig) -> Result<()> {
    validate_listener_settings(config)?;
    validate_managed_file(config)?;
    validate_limits(config)?;
    validate_general_settings(config);

    Ok(())
}

fn validate_listener_settings(config: &AdminConfig) -> Result<()> {
    if config.port == 0 {
        return Err(ConfigError::InvalidValue(
            "port".to_string(),
            "Port must be greater than 0".to_string(),
        ));
    }

    config.listen_addr()?;

    Ok(())
}

fn validate_managed_file(config: &AdminConfig) -> Result<()> {
    let name = &config.netplan_file_name;

    if name.is_empty() || name.contains('/') {
        return Err(ConfigError::InvalidValue(
            "netplan_file_name".to_string(),
            format!("Not a plain file name: '{}'", name),
        ));
    }

    if !name.ends_with(".yaml") {
        return Err(ConfigError::InvalidValue(
            "netplan_file_name".to_string(),
            format!("Managed file must have a .yaml extension: '{}'", name),
        ));
    }

    Ok(())
}

fn validate_limits(config: &AdminConfig) -> Result<()> {
    let checks: [(&str, bool); 6] = [
        ("session_timeout_secs", config.session_timeout_secs == 0),
        ("rate_limit", config.rate_limit == 0),
        ("rate_window_secs", config.rate_window_secs == 0),
        ("command_timeout_secs", config.command_timeout_secs == 0),
        ("hostname_timeout_secs", config.hostname_timeout_secs == 0),
        ("max_body_bytes", config.max_body_bytes == 0),
    ];

    for (name, is_zero) in checks {
        if is_zero {
            return Err(ConfigError::InvalidValue(
                name.to_string(),
                "Value must be greater than 0".to_string(),
            ));
        }
    }

    if config.sweep_interval_secs == 0 {
        warn!("sweep_interval_secs is 0, expired sessions will not be swept");
    }

    Ok(())
}

/// Replace settings that have a safe fallback
///
/// An unknown log level becomes the default level. Runs before the logger
/// exists, so the correction shows up in the logged configuration only.
pub fn normalize_config(config: &mut AdminConfig) {
    let level = config.log_level.trim().to_ascii_lowercase();
    config.log_level = if LOG_LEVELS.contains(&level.as_str()) {
        level
    } else {
        defaults::log_level()
    };
}

fn validate_general_settings(config: &AdminConfig) {
    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        warn!("Invalid log level: {}", config.log_level);
    }

    if config.apply_delay_secs == 0 {
        warn!("apply_delay_secs is 0, activation may race the HTTP response");
    }
}

//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{RegCacheError, RegCacheResult};
use console::style;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> RegCacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> RegCacheResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> RegCacheResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        eprintln!(
            "{} Config already exists at {} (use --force to overwrite)",
            style("!").yellow(),
            path.display()
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    println!(
        "{} Configuration initialized at {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> RegCacheResult<()> {
    let config = apply_setting(config, key, value)?;

    if let Some(reason) = config.validation_error() {
        return Err(RegCacheError::ConfigInvalid {
            path: manager.path().to_path_buf(),
            reason,
        });
    }

    manager.save(&config).await?;
    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}

/// Return a copy of `config` with one dot-separated key updated
fn apply_setting(config: &Config, key: &str, value: &str) -> RegCacheResult<Config> {
    let mut config = config.clone();
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(RegCacheError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )))
            }
        },

        ["fetch", "interval_secs"] => config.fetch.interval_secs = parse_u64(value)?,
        ["fetch", "delta_window_secs"] => config.fetch.delta_window_secs = parse_u64(value)?,

        ["bootstrap", "max_attempts"] => {
            config.bootstrap.max_attempts = parse_u64(value)?
                .try_into()
                .map_err(|_| RegCacheError::User(format!("Number too large: {}", value)))?
        }
        ["bootstrap", "initial_backoff_ms"] => {
            config.bootstrap.initial_backoff_ms = parse_u64(value)?
        }
        ["bootstrap", "max_backoff_ms"] => config.bootstrap.max_backoff_ms = parse_u64(value)?,

        _ => {
            return Err(RegCacheError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(config)
}

const VALID_KEYS: [&str; 7] = [
    "general.verbose",
    "general.log_format",
    "fetch.interval_secs",
    "fetch.delta_window_secs",
    "bootstrap.max_attempts",
    "bootstrap.initial_backoff_ms",
    "bootstrap.max_backoff_ms",
];

fn parse_bool(value: &str) -> RegCacheResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(RegCacheError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> RegCacheResult<u64> {
    value
        .parse()
        .map_err(|_| RegCacheError::User(format!("Invalid number: {}", value)))
}

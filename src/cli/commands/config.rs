//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{BuildError, BuildResult};
use crate::ui::ProgressMode;
use clap::ValueEnum;
use console::style;

/// Keys accepted by `config set`
const VALID_KEYS: [&str; 6] = [
    "general.log_format",
    "engine.command",
    "engine.args",
    "engine.addr",
    "progress.mode",
    "progress.queue_capacity",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> BuildResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut config = config.clone();
            set_value(&mut config, &key, &value)?;
            manager.save(&config).await?;
            println!("{} Set {} = {}", style("✓").green(), key, value);
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> BuildResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> BuildResult<()> {
    let path = manager.path();

    if manager.exists() && !force {
        println!(
            "{} Config already exists at {}",
            style("!").yellow(),
            path.display()
        );
        println!("  Use --force to overwrite");
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    println!(
        "{} Configuration initialized ({})",
        style("✓").green(),
        path.display()
    );

    Ok(())
}

/// Apply a dot-separated key to the configuration
fn set_value(config: &mut Config, key: &str, value: &str) -> BuildResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(BuildError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )))
            }
        },

        ["engine", "command"] => config.engine.command = value.to_string(),
        ["engine", "args"] => {
            config.engine.args = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        ["engine", "addr"] => {
            config.engine.addr = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }

        ["progress", "mode"] => {
            config.progress.mode = ProgressMode::from_str(value, true).map_err(|_| {
                BuildError::User(format!(
                    "Invalid progress mode: {}. Use auto, plain or tty",
                    value
                ))
            })?
        }
        ["progress", "queue_capacity"] => config.progress.queue_capacity = parse_capacity(value)?,

        _ => {
            eprintln!("Valid keys:");
            for key in VALID_KEYS {
                eprintln!("  {}", key);
            }
            return Err(BuildError::User(format!("Unknown config key: {}", key)));
        }
    }

    Ok(())
}

fn parse_capacity(value: &str) -> BuildResult<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(BuildError::User(format!(
            "Invalid queue capacity: {}. Use a number greater than 0",
            value
        ))),
    }
}

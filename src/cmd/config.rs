//! Configuration view command — `hitl config`.

use anyhow::Result;

use super::super::ConfigCommands;
use hitl::config::ReviewConfig;

pub fn cmd_config(config: &ReviewConfig, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!("# Effective review configuration");
            print!("{}", config.to_toml()?);
            println!("# workspaces are created under {}", config.temp_root().display());
        }
    }
    Ok(())
}

//! `rebound config` – show where the config lives and what is in effect.

use anyhow::Result;
use rebound_core::config::{self, ReboundConfig};

pub fn run_config(cfg: &ReboundConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}

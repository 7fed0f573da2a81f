//! Config command handlers.

use anyhow::Result;
use naturecrib_core::config::{Config, paths};

pub fn path() -> Result<()> {
    println!("{}", paths::config_path().display());
    Ok(())
}

pub fn init() -> Result<()> {
    let config_path = paths::config_path();
    Config::init_at(&config_path)?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

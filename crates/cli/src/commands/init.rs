//! `quarry init`: write a default config file.

use quarry_config::AppConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };

    if path.exists() && !force {
        println!("Config already exists at: {}", path.display());
        println!("Edit it manually, or re-run with --force to overwrite.");
        return Ok(());
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;

    println!("Created config at: {}", path.display());
    println!("\nNext steps:");
    println!("  1. Set QUARRY_API_KEY (or SILICONFLOW_API_KEY), or add api_key to the file");
    println!("  2. Point [dataset].csv_path at your CSV file");
    println!("  3. quarry run");
    Ok(())
}

//! `unipath init-config` — Write the default configuration file.

use anyhow::Context;
use std::path::Path;
use unipath_config::AppConfig;

pub fn run(force: bool) -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("UniPath — Configuration Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        println!("✅ Created config directory: {}", config_dir.display());
    }

    if write_default(&config_path, force)? {
        println!("✅ Wrote config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set GOOGLE_API_KEY (or api_key in {})", config_path.display());
        println!("   2. Run: unipath seed --demo-user demo");
        println!("   3. Run: unipath chat --user demo\n");
    } else {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
    }

    Ok(())
}

/// Write the default TOML to `path`. Returns `false` if the file exists and
/// `force` is not set.
fn write_default(path: &Path, force: bool) -> anyhow::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

//! `unipath serve` — Start the HTTP API server.

use tracing::info;
use unipath_config::AppConfig;
use unipath_store::seed::seed_catalog;

pub async fn run(mut config: AppConfig, port_override: Option<u16>, seed: bool) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_credentials_for(&config.default_provider) {
        anyhow::bail!(
            "No API key configured. Set GOOGLE_API_KEY (or UNIPATH_API_KEY) or add api_key to {}",
            AppConfig::config_dir().join("config.toml").display()
        );
    }

    let store = super::open_store(&config).await?;
    if seed {
        let count = seed_catalog(store.as_ref()).await?;
        info!(count, "Catalog seeded before serving");
    }

    println!("UniPath Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);
    println!("   Store:     {}", store.name());

    unipath_gateway::start(config, store)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))?;

    Ok(())
}

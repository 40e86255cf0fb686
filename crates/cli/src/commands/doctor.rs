//! `unipath doctor` — Diagnose system health.

use unipath_config::AppConfig;
use unipath_core::store::UniversityFilter;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("UniPath Doctor — System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file valid: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file — using defaults (run `unipath init-config`)");
    }

    if config.has_credentials_for(&config.default_provider) {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set GOOGLE_API_KEY or api_key in config.toml");
        issues += 1;
    }

    match super::open_store(&config).await {
        Ok(store) => {
            println!("  ✅ Store reachable ({}): {}", store.name(), config.database.url);
            let filter = UniversityFilter {
                limit: 1,
                ..Default::default()
            };
            match store.search_universities(&filter).await {
                Ok(rows) if rows.is_empty() => {
                    println!("  ⚠️  University catalog is empty — run `unipath seed`");
                    issues += 1;
                }
                Ok(_) => println!("  ✅ University catalog present"),
                Err(e) => {
                    println!("  ❌ Catalog query failed: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Store unavailable: {e:#}");
            issues += 1;
        }
    }

    let router = unipath_providers::build_from_config(&config);
    for name in router.list() {
        let Some(provider) = router.get(name) else {
            continue;
        };
        let marker = if name == router.default_name() {
            " (default)"
        } else {
            ""
        };
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{name}'{marker} reachable"),
            Ok(false) => {
                println!("  ⚠️  Provider '{name}'{marker} responded but reports unhealthy");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{name}'{marker} check failed: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

//! `unipath seed` — Load the starter catalog.

use unipath_config::AppConfig;
use unipath_store::seed::{seed_catalog, seed_demo_profile};

pub async fn run(config: AppConfig, demo_user: Option<String>) -> anyhow::Result<()> {
    let store = super::open_store(&config).await?;

    let count = seed_catalog(store.as_ref()).await?;
    println!("✅ Seeded {count} universities into {}", config.database.url);

    if let Some(user_id) = demo_user {
        let profile = seed_demo_profile(store.as_ref(), &user_id).await?;
        println!(
            "✅ Demo profile '{}' ready (stage {})",
            profile.id, profile.current_stage
        );
    }

    Ok(())
}

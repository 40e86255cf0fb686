pub mod chat;
pub mod doctor;
pub mod init_config;
pub mod seed;
pub mod serve;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use unipath_config::AppConfig;
use unipath_core::store::CounselStore;

/// Open the configured store, creating the database's directory if needed.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CounselStore>> {
    let url = config.database.url.as_str();
    if let Some(parent) = sqlite_file_path(url).and_then(|p| p.parent().map(Path::to_path_buf)) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(&parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    unipath_store::open(url)
        .await
        .with_context(|| format!("Failed to open store at {url}"))
}

/// The on-disk path of a `sqlite://` URL, or `None` for in-memory databases.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

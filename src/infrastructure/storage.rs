use crate::config::RelayConfig;
use crate::services::storage::LocalStorage;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &RelayConfig) -> anyhow::Result<Arc<LocalStorage>> {
    let storage = LocalStorage::new(&config.storage_dir);

    storage.ensure_root().await.with_context(|| {
        format!(
            "failed to create storage directory {}",
            config.storage_dir.display()
        )
    })?;

    info!("📂 Storage directory: {}", storage.root().display());

    Ok(Arc::new(storage))
}

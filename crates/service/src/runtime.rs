//! Runtime helpers
//!
//! Opens the user store described by configuration so binaries do not
//! need to depend on `common` directly.

use std::sync::Arc;

use configs::StorageConfig;
use tracing::info;

use crate::users::{StoreOptions, UserStore};

/// Ensure the data directory exists and open the store at `cfg.path`.
pub async fn open_store(cfg: &StorageConfig) -> anyhow::Result<Arc<UserStore>> {
    common::env::ensure_data_dir(&cfg.path).await?;
    let store = UserStore::open_with(&cfg.path, StoreOptions { atomic_writes: cfg.atomic_writes }).await?;
    info!(path = %cfg.path.display(), atomic_writes = cfg.atomic_writes, "user store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_store_in_fresh_data_dir() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("userdb_runtime_{}", uuid::Uuid::new_v4()));
        let cfg = StorageConfig { path: dir.join("data").join("users.json"), atomic_writes: true };
        let store = open_store(&cfg).await?;
        assert_eq!(store.path(), cfg.path.as_path());
        assert!(store.is_empty().await?);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}

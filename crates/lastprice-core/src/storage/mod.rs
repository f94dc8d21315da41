//! Persistence of the saved receipt collection.
//!
//! The whole collection lives as one JSON array under a single key, newest
//! receipt first. Every mutation rewrites the full array.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::models::receipt::ReceiptData;

/// Key used by default for the receipt collection.
pub const DEFAULT_KEY: &str = "saved_receipts";

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// String key-value storage, such as an app's local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Drop `key`; absent keys are not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Gateway over the saved receipt collection.
///
/// Mutations are serialized through an internal lock, so concurrent saves
/// and deletes through the same gateway never lose each other's writes.
pub struct ReceiptStore<S> {
    store: S,
    key: String,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> ReceiptStore<S> {
    /// Gateway using the default key.
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_KEY)
    }

    /// Gateway using a custom key.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage key of the collection.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying key-value store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Prepend a receipt to the collection.
    pub async fn save(&self, receipt: &ReceiptData) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut receipts = self.try_load_all().await?;
        receipts.insert(0, receipt.clone());
        self.write(&receipts).await?;

        info!("Saved receipt {} ({} stored)", receipt.id, receipts.len());
        Ok(())
    }

    /// All saved receipts, newest first.
    ///
    /// Missing data yields an empty list. Unreadable or corrupt data also
    /// yields an empty list, with a warning; use [`ReceiptStore::try_load_all`]
    /// to tell these cases apart.
    pub async fn load_all(&self) -> Vec<ReceiptData> {
        match self.try_load_all().await {
            Ok(receipts) => receipts,
            Err(e) => {
                warn!("Could not load saved receipts, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// All saved receipts, newest first, failing on unreadable data.
    pub async fn try_load_all(&self) -> Result<Vec<ReceiptData>> {
        let Some(content) = self.store.get(&self.key).await? else {
            debug!("No receipts stored under {}", self.key);
            return Ok(Vec::new());
        };

        serde_json::from_str(&content).map_err(|source| StorageError::Decode {
            key: self.key.clone(),
            source,
        })
    }

    /// Receipt with the given id, if saved.
    pub async fn find(&self, id: u64) -> Result<Option<ReceiptData>> {
        Ok(self
            .try_load_all()
            .await?
            .into_iter()
            .find(|receipt| receipt.id == id))
    }

    /// Delete the receipt with the given id. Returns whether it existed.
    pub async fn delete_one(&self, id: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut receipts = self.try_load_all().await?;
        let before = receipts.len();
        receipts.retain(|receipt| receipt.id != id);

        if receipts.len() == before {
            debug!("Receipt {} not found, nothing to delete", id);
            return Ok(false);
        }

        self.write(&receipts).await?;
        info!("Deleted receipt {}", id);
        Ok(true)
    }

    /// Replace the saved receipt that has the same id, keeping its position.
    /// Returns whether it existed.
    pub async fn update(&self, receipt: &ReceiptData) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut receipts = self.try_load_all().await?;
        let Some(slot) = receipts.iter_mut().find(|r| r.id == receipt.id) else {
            debug!("Receipt {} not found, nothing to update", receipt.id);
            return Ok(false);
        };
        *slot = receipt.clone();

        self.write(&receipts).await?;
        info!("Updated receipt {}", receipt.id);
        Ok(true)
    }

    /// Remove the whole collection.
    pub async fn clear_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        self.store.remove(&self.key).await?;
        info!("Cleared all saved receipts");
        Ok(())
    }

    async fn write(&self, receipts: &[ReceiptData]) -> Result<()> {
        let content = serde_json::to_string(receipts).map_err(StorageError::Encode)?;
        self.store.set(&self.key, &content).await
    }
}

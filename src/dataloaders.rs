//! DataLoader utilities for batch loading
//!
//! Nested `trainee` fields on routines and registrations go through a
//! per-request [`TraineeLoader`] so a list of N rows costs one store lookup
//! per distinct trainee instead of one per row.

use async_graphql::ID;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::Trainee;
use crate::store::Store;

/// Batch loader trait for loading multiple items at once
#[async_trait]
pub trait BatchLoader<K, V>: Send + Sync
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
{
    /// Load batch of items by keys
    ///
    /// Keys with no value are simply absent from the result.
    async fn load_batch(&self, keys: &[K]) -> HashMap<K, V>;
}

/// Per-request cache in front of a [`BatchLoader`]
pub struct DataLoader<K, V, L> {
    batch: L,
    cache: Mutex<HashMap<K, V>>,
}

impl<K, V, L> DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
    L: BatchLoader<K, V>,
{
    pub fn new(batch: L) -> Self {
        Self {
            batch,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load(&self, key: K) -> Option<V> {
        self.load_many(vec![key.clone()]).await.remove(&key)
    }

    /// Cached keys are served from memory; the rest go out as one batch,
    /// duplicates removed.
    pub async fn load_many(&self, keys: Vec<K>) -> HashMap<K, V> {
        let mut found = HashMap::with_capacity(keys.len());
        let mut missing: Vec<K> = Vec::new();

        {
            let cache = self.cache.lock().await;
            for key in keys {
                if let Some(value) = cache.get(&key) {
                    found.insert(key, value.clone());
                } else if !missing.contains(&key) {
                    missing.push(key);
                }
            }
        }

        if missing.is_empty() {
            return found;
        }

        let fetched = self.batch.load_batch(&missing).await;
        let mut cache = self.cache.lock().await;
        for (key, value) in fetched {
            cache.insert(key.clone(), value.clone());
            found.insert(key, value);
        }
        found
    }

    /// Forget everything, e.g. after a delete
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    /// Cache a value the caller already has
    pub async fn prime(&self, key: K, value: V) {
        self.cache.lock().await.insert(key, value);
    }
}

/// Loads trainees by id from a [`Store`]
pub struct TraineeBatch {
    store: Arc<dyn Store>,
}

#[async_trait]
impl BatchLoader<ID, Trainee> for TraineeBatch {
    async fn load_batch(&self, keys: &[ID]) -> HashMap<ID, Trainee> {
        match self.store.trainees_by_ids(keys).await {
            Ok(trainees) => trainees.into_iter().map(|t| (t.id.clone(), t)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, keys = keys.len(), "trainee batch load failed");
                HashMap::new()
            }
        }
    }
}

pub type TraineeLoader = DataLoader<ID, Trainee, TraineeBatch>;

impl DataLoader<ID, Trainee, TraineeBatch> {
    /// A fresh loader with an empty cache, one per request.
    pub fn for_store(store: Arc<dyn Store>) -> Self {
        Self::new(TraineeBatch { store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTrainee;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLoader {
        batches: AtomicUsize,
    }

    #[async_trait]
    impl BatchLoader<String, String> for CountingLoader {
        async fn load_batch(&self, keys: &[String]) -> HashMap<String, String> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            keys.iter()
                .filter(|k| k.as_str() != "missing")
                .map(|k| (k.clone(), format!("value-{}", k)))
                .collect()
        }
    }

    #[tokio::test]
    async fn test_dataloader_caching() {
        let loader = DataLoader::new(CountingLoader::default());

        assert_eq!(loader.load("key1".to_string()).await, Some("value-key1".to_string()));
        assert_eq!(loader.load("key1".to_string()).await, Some("value-key1".to_string()));
        assert_eq!(loader.batch.batches.load(Ordering::SeqCst), 1);

        assert_eq!(loader.load("missing".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_dataloader_batch_load_dedupes() {
        let loader = DataLoader::new(CountingLoader::default());
        loader.load("key1".to_string()).await;

        let keys = vec!["key1", "key2", "key2", "key3"]
            .into_iter()
            .map(String::from)
            .collect();
        let results = loader.load_many(keys).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.get("key3"), Some(&"value-key3".to_string()));
        assert_eq!(loader.batch.batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dataloader_prime_and_clear() {
        let loader = DataLoader::new(CountingLoader::default());

        loader.prime("key1".to_string(), "custom-value".to_string()).await;
        assert_eq!(loader.load("key1".to_string()).await, Some("custom-value".to_string()));

        loader.clear().await;
        assert_eq!(loader.load("key1".to_string()).await, Some("value-key1".to_string()));
    }

    #[tokio::test]
    async fn test_trainee_loader_reads_store() {
        let store = Arc::new(MemoryStore::new());
        let trainee = store
            .create_trainee(NewTrainee {
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
                password_hash: "hash".to_string(),
                timezone: None,
            })
            .await
            .unwrap();

        let loader = TraineeLoader::for_store(store);
        assert_eq!(loader.load(trainee.id.clone()).await, Some(trainee));
        assert_eq!(loader.load(ID::from("nope")).await, None);
    }
}

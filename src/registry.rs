use crate::store::{DocumentStore, StoreError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application-owned registry of connected stores, keyed by an opaque
/// connection descriptor.
///
/// Multiple handlers that target the same deployment can share one
/// connection by resolving their store through a registry instead of each
/// connecting on their own. The registry is plain state with no global
/// lifetime: the application constructs it, hands it to whoever builds
/// handlers, and closes it on shutdown.
#[derive(Default)]
pub struct StoreRegistry {
    stores: Mutex<HashMap<String, Arc<dyn DocumentStore>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        StoreRegistry::default()
    }

    pub async fn get(&self, key: &str) -> Option<Arc<dyn DocumentStore>> {
        self.stores.lock().await.get(key).map(Arc::clone)
    }

    pub async fn insert(&self, key: impl Into<String>, store: Arc<dyn DocumentStore>) {
        self.stores.lock().await.insert(key.into(), store);
    }

    /// Return the store registered under `key`, connecting and registering
    /// it first if absent.
    ///
    /// The registry lock is held across the connect, so concurrent callers
    /// of the same cold key wait for one connection instead of opening
    /// several.
    pub async fn get_or_connect<F, Fut>(
        &self,
        key: &str,
        connect: F,
    ) -> Result<Arc<dyn DocumentStore>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn DocumentStore>, StoreError>>,
    {
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(key) {
            return Ok(Arc::clone(store));
        }
        let store = connect().await?;
        stores.insert(key.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Close every registered store and empty the registry.
    pub async fn close_all(&self) {
        let stores: Vec<(String, Arc<dyn DocumentStore>)> =
            self.stores.lock().await.drain().collect();
        for (key, store) in stores {
            if let Err(e) = store.close().await {
                eprintln!("closing store {} failed: {}", key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop_store::NoopStore;
    use crate::testutil::RecordingStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn get_or_connect_reuses_the_first_connection() {
        let registry = StoreRegistry::new();
        let connects = AtomicUsize::new(0);

        let first = registry
            .get_or_connect("mongodb://localhost/logs", || async {
                connects.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(NoopStore) as Arc<dyn DocumentStore>)
            })
            .await
            .expect("first connect");

        let second = registry
            .get_or_connect("mongodb://localhost/logs", || async {
                connects.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(NoopStore) as Arc<dyn DocumentStore>)
            })
            .await
            .expect("second lookup");

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn connect_errors_are_not_cached() {
        let registry = StoreRegistry::new();

        let failed = registry
            .get_or_connect("mongodb://down/logs", || async {
                Err(StoreError::Connectivity("refused".to_string()))
            })
            .await;
        assert!(failed.is_err());
        assert!(registry.get("mongodb://down/logs").await.is_none());
    }

    #[tokio::test]
    async fn close_all_closes_each_store_once() {
        let registry = StoreRegistry::new();
        let store = Arc::new(RecordingStore::default());
        registry.insert("a", store.clone()).await;
        registry.close_all().await;
        registry.close_all().await;
        assert_eq!(store.closed.load(Ordering::SeqCst), 1);
    }
}

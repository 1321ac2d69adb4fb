use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Fields, Filter, Record, RecordStore, StoreError};

/// Wraps another store and holds every call until the quota allows it.
pub struct RateLimitedStore {
    inner: Arc<dyn RecordStore>,
    rate_limiter: DefaultDirectRateLimiter,
}

impl RateLimitedStore {
    pub fn new(inner: Arc<dyn RecordStore>, requests_per_second: u32, burst_capacity: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_capacity).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Self {
            inner,
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    async fn wait_for_permit(&self, operation: &str, collection: &str) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
        debug!(operation, collection, "Record store call permitted");
    }
}

#[async_trait]
impl RecordStore for RateLimitedStore {
    async fn get_list(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        self.wait_for_permit("get_list", collection).await;
        self.inner.get_list(collection, filter).await
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        self.wait_for_permit("get_one", collection).await;
        self.inner.get_one(collection, id).await
    }

    async fn create(&self, collection: &str, payload: Fields) -> Result<Record, StoreError> {
        self.wait_for_permit("create", collection).await;
        self.inner.create(collection, payload).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<Record, StoreError> {
        self.wait_for_permit("update", collection).await;
        self.inner.update(collection, id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;

    #[tokio::test]
    async fn forwards_calls_to_the_inner_store() {
        let inner = Arc::new(InMemoryRecordStore::new());
        let store = RateLimitedStore::new(inner.clone(), 100, 10);

        let created = store.create("users", Fields::new()).await.unwrap();
        let fetched = store.get_one("users", &created.id).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(inner.snapshot().len("users"), 1);
    }

    #[tokio::test]
    async fn zero_quota_falls_back_to_one_per_second() {
        let store = RateLimitedStore::new(Arc::new(InMemoryRecordStore::new()), 0, 0);
        assert!(store.get_list("users", &Filter::all()).await.unwrap().is_empty());
    }
}

use crate::domain::model::{LookupKey, VerificationResult};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Identity of one verification call. Credentials appear only as a hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    lookup: LookupKey,
    options: String,
    credential_fingerprint: u64,
}

impl CacheKey {
    pub fn new(
        endpoint: &str,
        lookup: &LookupKey,
        options: &BTreeMap<String, Value>,
        credential_fingerprint: u64,
    ) -> Self {
        // BTreeMap keeps keys sorted, so equal option sets serialize identically
        let options = serde_json::to_string(options).unwrap_or_default();
        Self {
            endpoint: endpoint.to_string(),
            lookup: lookup.clone(),
            options,
            credential_fingerprint,
        }
    }
}

pub fn fingerprint<T: Hash + ?Sized>(secret: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    secret.hash(&mut hasher);
    hasher.finish()
}

type Slot = Arc<OnceCell<VerificationResult>>;

/// Memoizes verification results for the lifetime of a session.
///
/// Concurrent callers with the same key share one in-flight computation,
/// so the underlying call runs at most once per key.
#[derive(Debug, Default)]
pub struct ResultCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn memoize<F, Fut>(&self, key: CacheKey, compute: F) -> VerificationResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = VerificationResult>,
    {
        let slot = self.slot(key);

        let mut computed = false;
        let result = slot
            .get_or_init(|| {
                computed = true;
                compute()
            })
            .await
            .clone();

        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn slot(&self, key: CacheKey) -> Slot {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.entry(key).or_default().clone()
    }

    pub fn clear(&self) {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.clear();
    }

    pub fn len(&self) -> usize {
        match self.slots.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn key(pan: &str) -> CacheKey {
        let lookup = LookupKey {
            values: vec![("pan".to_string(), pan.to_string())],
        };
        CacheKey::new("pan", &lookup, &BTreeMap::new(), fingerprint("token"))
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = ResultCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .memoize(key("ABCDE1234F"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    VerificationResult::succeeded(json!({"valid": true}))
                })
                .await;
            assert!(result.success);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = Arc::new(ResultCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .memoize(key("ABCDE1234F"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        VerificationResult::succeeded(json!({"valid": true}))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().success);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits() + cache.misses(), 8);
    }

    #[tokio::test]
    async fn test_distinct_keys_and_clear() {
        let cache = ResultCache::new();
        let compute = || async { VerificationResult::succeeded(json!({"valid": true})) };

        cache.memoize(key("A"), compute).await;
        cache.memoize(key("B"), compute).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.misses(), 2);

        cache.clear();
        assert!(cache.is_empty());
        cache.memoize(key("A"), compute).await;
        assert_eq!(cache.misses(), 3);
    }

    #[test]
    fn test_key_separates_options_and_credentials() {
        let lookup = LookupKey {
            values: vec![("gstin".to_string(), "27AAA".to_string())],
        };
        let mut options = BTreeMap::new();
        let plain = CacheKey::new("gstin", &lookup, &options, fingerprint("token"));

        options.insert("fetchFilings".to_string(), json!(true));
        let with_filings = CacheKey::new("gstin", &lookup, &options, fingerprint("token"));
        let other_account = CacheKey::new("gstin", &lookup, &BTreeMap::new(), fingerprint("other"));

        assert_ne!(plain, with_filings);
        assert_ne!(plain, other_account);
        assert_eq!(plain, CacheKey::new("gstin", &lookup, &BTreeMap::new(), fingerprint("token")));
    }
}

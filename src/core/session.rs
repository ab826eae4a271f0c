use crate::core::cache::{CacheKey, ResultCache};
use crate::core::client::VerificationClient;
use crate::core::extractor::extract_lookup_key;
use crate::domain::model::{InputBatch, InputRecord, RowOutcome};
use crate::utils::error::{Result, VerifyError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// State scoped to one run: the endpoint client, its result cache and the
/// worker budget.
pub struct VerificationSession {
    client: Arc<VerificationClient>,
    cache: Arc<ResultCache>,
    concurrency: usize,
}

impl VerificationSession {
    pub fn new(client: VerificationClient, concurrency: usize) -> Self {
        Self {
            client: Arc::new(client),
            cache: Arc::new(ResultCache::new()),
            concurrency: concurrency.max(1),
        }
    }

    pub fn client(&self) -> &VerificationClient {
        &self.client
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Verifies every record with at most `concurrency` rows in flight.
    /// Outcomes come back in input order.
    pub async fn process_batch(&self, batch: &InputBatch) -> Result<Vec<RowOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (slot, record) in batch.records.iter().cloned().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| VerifyError::ProcessingError {
                    message: format!("Worker pool closed: {}", e),
                })?;
            let client = self.client.clone();
            let cache = self.cache.clone();

            tasks.spawn(async move {
                let _permit = permit;
                (slot, verify_record(&client, &cache, &record).await)
            });
        }

        let mut slots: Vec<Option<RowOutcome>> = vec![None; batch.records.len()];
        while let Some(joined) = tasks.join_next().await {
            let (slot, outcome) = joined.map_err(|e| VerifyError::ProcessingError {
                message: format!("Row worker failed: {}", e),
            })?;
            slots[slot] = Some(outcome);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

async fn verify_record(
    client: &VerificationClient,
    cache: &ResultCache,
    record: &InputRecord,
) -> RowOutcome {
    let descriptor = client.descriptor();

    let result = match extract_lookup_key(record, descriptor) {
        Err(short_circuit) => {
            tracing::warn!(
                "⚠️ Row {} (sno '{}') skipped: {}",
                record.index + 1,
                record.serial,
                short_circuit.message
            );
            short_circuit
        }
        Ok(key) => {
            tracing::info!("🔍 Row {}: verifying {}", record.index + 1, key.describe());
            let cache_key = CacheKey::new(
                &descriptor.name,
                &key,
                client.options(),
                client.credential_fingerprint(),
            );
            let result = cache.memoize(cache_key, || client.call(&key)).await;
            tracing::info!(
                "✅ Row {} finished: success={} {}",
                record.index + 1,
                result.success,
                result.message
            );
            result
        }
    };

    RowOutcome {
        index: record.index,
        serial: record.serial.clone(),
        result,
    }
}

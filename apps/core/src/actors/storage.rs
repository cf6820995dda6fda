use crate::actors::messages::AppError;
use crate::actors::traits::DocumentStore;
use crate::brain::record::EnrichmentRecord;
use crate::database;
use crate::error::EnrichmentError;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Document store backed by the SQLite `documents` table, scoped to one partition.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    partition_key: String,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool, partition_key: impl Into<String>) -> Self {
        Self {
            pool,
            partition_key: partition_key.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn write(&self, changes: HashMap<String, EnrichmentRecord>) -> Result<(), AppError> {
        database::insert_documents(&self.pool, &self.partition_key, &changes).await?;
        Ok(())
    }

    async fn read(&self, keys: &[String]) -> Result<HashMap<String, EnrichmentRecord>, AppError> {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(record) = database::get_document(&self.pool, &self.partition_key, key).await? {
                found.insert(key.clone(), record);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
pub use memory::MemoryDocumentStore;


/// Writes enrichment records, one attempt per call, reporting failure as
/// [`EnrichmentError::WriteFailure`]. Nothing is retried or queued.
pub struct PersistenceGateway<D: DocumentStore> {
    store: Arc<D>,
}

impl<D: DocumentStore> Clone for PersistenceGateway<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<D: DocumentStore> PersistenceGateway<D> {
    pub fn new(store: Arc<D>) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &Arc<D> {
        &self.store
    }

    /// Stores `record` under `key`.
    #[instrument(skip(self, record))]
    pub async fn write(&self, key: &str, record: &EnrichmentRecord) -> Result<(), EnrichmentError> {
        let changes = HashMap::from([(key.to_string(), record.clone())]);
        self.write_changes(changes).await
    }

    /// Stores several records keyed by their own ids, all or nothing.
    #[cfg(test)]
    pub async fn write_batch(&self, records: &[EnrichmentRecord]) -> Result<(), EnrichmentError> {
        let changes = records
            .iter()
            .map(|record| (record.key().to_string(), record.clone()))
            .collect();
        self.write_changes(changes).await
    }

    async fn write_changes(
        &self,
        changes: HashMap<String, EnrichmentRecord>,
    ) -> Result<(), EnrichmentError> {
        let count = changes.len();
        match self.store.write(changes).await {
            Ok(()) => {
                info!(count, "Stored enrichment records");
                Ok(())
            }
            Err(e) => {
                error!("Failed to store {} enrichment record(s): {}", count, e);
                Err(EnrichmentError::WriteFailure(e.to_string()))
            }
        }
    }
}

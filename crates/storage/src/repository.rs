//! Repository Implementation

use crate::{RetentionPolicy, SensorReading, StorageError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Backend holding persisted readings
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Append one reading
    async fn insert(&self, reading: &SensorReading) -> Result<(), StorageError>;

    /// Up to `limit` readings, newest first
    async fn find_latest(&self, limit: usize) -> Result<Vec<SensorReading>, StorageError>;

    /// Number of stored readings
    async fn count(&self) -> Result<u64, StorageError>;

    /// Reading with the greatest timestamp
    async fn find_most_recent(&self) -> Result<Option<SensorReading>, StorageError>;

    /// Lightweight read confirming the backend is reachable
    async fn ping(&self) -> Result<(), StorageError>;

    /// Declare the expiration rule
    async fn apply_retention(&self, policy: &RetentionPolicy) -> Result<(), StorageError>;
}

/// Sole access path to persisted readings.
///
/// Cheap to clone; every clone shares the same backend. Read failures on the
/// latest-readings query and write failures are absorbed here, the remaining
/// operations surface [`StorageError`] to the caller.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn ReadingStore>,
}

impl Repository {
    /// Wrap a backend
    pub fn new(store: impl ReadingStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wrap an already shared backend
    pub fn from_arc(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Insert a reading, logging instead of failing.
    ///
    /// Returns `true` when the reading was stored.
    pub async fn insert(&self, reading: &SensorReading) -> bool {
        match self.store.insert(reading).await {
            Ok(()) => {
                debug!("Inserted reading at {}", reading.timestamp);
                true
            }
            Err(e) => {
                error!("Failed to insert reading: {}", e);
                false
            }
        }
    }

    /// The `limit` most recent readings, oldest first.
    ///
    /// Empty when the store holds nothing or the query fails.
    pub async fn find_latest(&self, limit: usize) -> Vec<SensorReading> {
        match self.store.find_latest(limit).await {
            Ok(mut readings) => {
                readings.truncate(limit);
                readings.reverse();
                readings
            }
            Err(e) => {
                error!("Failed to fetch latest readings: {}", e);
                Vec::new()
            }
        }
    }

    /// Total number of stored readings
    pub async fn count(&self) -> Result<u64, StorageError> {
        self.store.count().await
    }

    /// Newest reading, if any
    pub async fn find_most_recent(&self) -> Result<Option<SensorReading>, StorageError> {
        self.store.find_most_recent().await
    }

    /// Confirm the backend is reachable
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.store.ping().await
    }

    /// Install the expiration rule on the backend
    pub async fn apply_retention(&self, policy: &RetentionPolicy) -> Result<(), StorageError> {
        self.store.apply_retention(policy).await?;
        info!(
            "Retention policy applied: {} expires after {}s",
            policy.field,
            policy.expire_after.as_secs()
        );
        Ok(())
    }
}

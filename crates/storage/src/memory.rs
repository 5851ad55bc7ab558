//! In-memory reading store
//!
//! Keeps readings in process. Expiration is emulated by pruning readings past
//! the applied retention window whenever the store is touched.

use crate::{ReadingStore, RetentionPolicy, SensorReading, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Reading store backed by a [`VecDeque`]
pub struct MemoryStore {
    readings: Mutex<VecDeque<SensorReading>>,
    retention: Mutex<Option<RetentionPolicy>>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        info!("Creating in-memory reading store");
        Self {
            readings: Mutex::new(VecDeque::with_capacity(1024)),
            retention: Mutex::new(None),
            available: AtomicBool::new(true),
        }
    }

    /// Fault-injection hook: take the store offline (`false`) or bring it
    /// back (`true`). While offline every operation fails with
    /// [`StorageError::Unavailable`]; stored readings are kept.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("in-memory store is offline".to_string()))
        }
    }

    /// Lock the readings after dropping anything past the retention window
    fn live_readings(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, VecDeque<SensorReading>>, StorageError> {
        self.check_available()?;

        let policy = self
            .retention
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?
            .clone();

        let mut readings = self
            .readings
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;

        if let Some(policy) = policy {
            let now = Utc::now();
            let before = readings.len();
            readings.retain(|r| !policy.is_expired(r.timestamp, now));
            let purged = before - readings.len();
            if purged > 0 {
                debug!("Purged {} expired readings", purged);
            }
        }

        Ok(readings)
    }

    fn newest_first(readings: &VecDeque<SensorReading>) -> Vec<SensorReading> {
        let mut sorted: Vec<_> = readings.iter().cloned().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn insert(&self, reading: &SensorReading) -> Result<(), StorageError> {
        let mut readings = self.live_readings()?;
        readings.push_back(reading.clone());
        Ok(())
    }

    async fn find_latest(&self, limit: usize) -> Result<Vec<SensorReading>, StorageError> {
        let readings = self.live_readings()?;
        let mut latest = Self::newest_first(&readings);
        latest.truncate(limit);
        Ok(latest)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.live_readings()?.len() as u64)
    }

    async fn find_most_recent(&self) -> Result<Option<SensorReading>, StorageError> {
        let readings = self.live_readings()?;
        Ok(readings.iter().max_by_key(|r| r.timestamp).cloned())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_available()
    }

    async fn apply_retention(&self, policy: &RetentionPolicy) -> Result<(), StorageError> {
        self.check_available()?;
        let mut retention = self
            .retention
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        *retention = Some(policy.clone());
        Ok(())
    }
}

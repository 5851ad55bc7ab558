//! Storage Layer
//!
//! Persistence for synthetic sensor readings. The [`Repository`] is the only
//! access path used by the rest of the workspace; it sits in front of a
//! [`ReadingStore`] backend (MongoDB in production, in-memory for tests).

mod memory;
mod mongo;
mod reading;
mod repository;
mod retention;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use reading::{
    round_to_precision, LatestReading, SensorReading, ACCEL_RANGE_G, DECIMAL_PLACES,
    GYRO_RANGE_DPS,
};
pub use repository::{ReadingStore, Repository};
pub use retention::{RetentionPolicy, DEFAULT_RETENTION_SECS};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

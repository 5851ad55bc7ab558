//! MongoDB reading store

use crate::{ReadingStore, RetentionPolicy, SensorReading, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Stored document shape.
///
/// `timestamp` must be a native BSON datetime for the TTL index to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReadingDocument {
    timestamp: bson::DateTime,
    mpu1_ax: f64,
    mpu1_ay: f64,
    mpu1_az: f64,
    mpu1_gx: f64,
    mpu1_gy: f64,
    mpu1_gz: f64,
    mpu2_ax: f64,
    mpu2_ay: f64,
    mpu2_az: f64,
    mpu2_gx: f64,
    mpu2_gy: f64,
    mpu2_gz: f64,
}

impl From<&SensorReading> for ReadingDocument {
    fn from(r: &SensorReading) -> Self {
        Self {
            timestamp: bson::DateTime::from_millis(r.timestamp.timestamp_millis()),
            mpu1_ax: r.mpu1_ax,
            mpu1_ay: r.mpu1_ay,
            mpu1_az: r.mpu1_az,
            mpu1_gx: r.mpu1_gx,
            mpu1_gy: r.mpu1_gy,
            mpu1_gz: r.mpu1_gz,
            mpu2_ax: r.mpu2_ax,
            mpu2_ay: r.mpu2_ay,
            mpu2_az: r.mpu2_az,
            mpu2_gx: r.mpu2_gx,
            mpu2_gy: r.mpu2_gy,
            mpu2_gz: r.mpu2_gz,
        }
    }
}

impl From<ReadingDocument> for SensorReading {
    fn from(d: ReadingDocument) -> Self {
        Self {
            timestamp: DateTime::<Utc>::from_timestamp_millis(d.timestamp.timestamp_millis())
                .unwrap_or_default(),
            mpu1_ax: d.mpu1_ax,
            mpu1_ay: d.mpu1_ay,
            mpu1_az: d.mpu1_az,
            mpu1_gx: d.mpu1_gx,
            mpu1_gy: d.mpu1_gy,
            mpu1_gz: d.mpu1_gz,
            mpu2_ax: d.mpu2_ax,
            mpu2_ay: d.mpu2_ay,
            mpu2_az: d.mpu2_az,
            mpu2_gx: d.mpu2_gx,
            mpu2_gy: d.mpu2_gy,
            mpu2_gz: d.mpu2_gz,
        }
    }
}

fn newest_first() -> Document {
    doc! { "timestamp": -1 }
}

/// Reading store backed by a MongoDB collection
#[derive(Clone)]
pub struct MongoStore {
    collection: Collection<ReadingDocument>,
}

impl MongoStore {
    /// Build a client for `uri` and bind to `database`.`collection`.
    ///
    /// Only parses the connection string; the first operation opens the
    /// connection.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
    ) -> Result<Self, StorageError> {
        let client = Client::with_uri_str(uri).await?;
        info!("MongoDB client created for {}.{}", database, collection);

        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }
}

#[async_trait]
impl ReadingStore for MongoStore {
    async fn insert(&self, reading: &SensorReading) -> Result<(), StorageError> {
        let result = self
            .collection
            .insert_one(ReadingDocument::from(reading))
            .await?;
        debug!("Inserted reading {}", result.inserted_id);
        Ok(())
    }

    async fn find_latest(&self, limit: usize) -> Result<Vec<SensorReading>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let cursor = self
            .collection
            .find(doc! {})
            .sort(newest_first())
            .limit(limit)
            .await?;

        let documents: Vec<ReadingDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(SensorReading::from).collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn find_most_recent(&self) -> Result<Option<SensorReading>, StorageError> {
        let newest = self
            .collection
            .find_one(doc! {})
            .sort(newest_first())
            .await?;
        Ok(newest.map(SensorReading::from))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.collection.find_one(doc! {}).await?;
        Ok(())
    }

    async fn apply_retention(&self, policy: &RetentionPolicy) -> Result<(), StorageError> {
        let result = self.collection.create_index(policy.index_model()).await?;
        debug!("TTL index ready: {}", result.index_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const UNREACHABLE_URI: &str =
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200";

    #[test]
    fn test_document_conversion_keeps_millis() {
        let reading = SensorReading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 15).unwrap()
                + chrono::Duration::milliseconds(250),
            mpu1_gx: -249.5,
            mpu2_az: 1.999,
            ..Default::default()
        };

        let restored = SensorReading::from(ReadingDocument::from(&reading));
        assert_eq!(restored, reading);
    }

    #[test]
    fn test_document_timestamp_is_bson_datetime() {
        let document = bson::to_document(&ReadingDocument::from(&SensorReading::default())).unwrap();
        assert!(matches!(document.get("timestamp"), Some(bson::Bson::DateTime(_))));
        assert_eq!(document.len(), 13);
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let store = MongoStore::connect(UNREACHABLE_URI, "sensor_db", "sensor_data")
            .await
            .unwrap();

        assert!(store.ping().await.is_err());
        assert!(store.count().await.is_err());
    }
}

use anyhow::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

pub mod backoff;
pub mod capture;
pub mod loader;

/// A fully transformed event, ready to hand to the destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRecord {
    pub uuid: Uuid,
    pub distinct_id: String,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub properties: Map<String, Value>,
}

/// The destination's ingestion queue. Implementations own batching and transport retries;
/// callers only promise to offer each record once, in order.
#[async_trait]
pub trait IngestionQueue: Send {
    async fn enqueue(&mut self, record: MappedRecord) -> Result<(), Error>;

    /// Sends anything buffered and waits for the destination to accept it. Once this returns,
    /// every record enqueued so far has been delivered.
    async fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.flush().await
    }
}

pub struct StdoutQueue {
    pub as_json: bool,
}

#[async_trait]
impl IngestionQueue for StdoutQueue {
    async fn enqueue(&mut self, record: MappedRecord) -> Result<(), Error> {
        if self.as_json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!("{record:?}");
        }
        Ok(())
    }
}

pub struct NoOpQueue;

#[async_trait]
impl IngestionQueue for NoOpQueue {
    async fn enqueue(&mut self, _record: MappedRecord) -> Result<(), Error> {
        Ok(())
    }
}

#[async_trait]
impl<Q: IngestionQueue + ?Sized> IngestionQueue for Box<Q> {
    async fn enqueue(&mut self, record: MappedRecord) -> Result<(), Error> {
        (**self).enqueue(record).await
    }

    async fn flush(&mut self) -> Result<(), Error> {
        (**self).flush().await
    }

    async fn close(&mut self) -> Result<(), Error> {
        (**self).close().await
    }
}

use std::time::Duration;

use thiserror::Error;
use tracing::error;

use super::{IngestionQueue, MappedRecord};

/// `imported` counts records the queue took before the failure. A buffering queue may still
/// hold some of them, so the caller should close it before giving up.
#[derive(Error, Debug)]
#[error("failed to enqueue event {event:?} after {imported} events were accepted: {source}")]
pub struct LoadError {
    pub imported: usize,
    pub event: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// Feeds records into the ingestion queue one at a time, sleeping between submissions so we
/// stay under the destination's ingestion rate limit.
pub struct Loader<'a, Q: IngestionQueue + ?Sized> {
    queue: &'a mut Q,
    delay: Duration,
}

impl<'a, Q: IngestionQueue + ?Sized> Loader<'a, Q> {
    pub fn new(queue: &'a mut Q, delay: Duration) -> Self {
        Self { queue, delay }
    }

    /// Returns how many records were accepted. Stops at the first rejection.
    pub async fn load(&mut self, records: Vec<MappedRecord>) -> Result<usize, LoadError> {
        let mut imported = 0;
        for record in records {
            if imported > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let event = record.event.clone();
            if let Err(e) = self.queue.enqueue(record).await {
                error!("Error importing event {}: {:?}", event, e);
                return Err(LoadError {
                    imported,
                    event,
                    source: e.into(),
                });
            }
            imported += 1;
        }
        Ok(imported)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Error;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::Map;
    use uuid::Uuid;

    /// Keeps everything it's given, optionally refusing once it holds `fail_after` records.
    /// `flushed` is how many records had been received at the last successful flush.
    #[derive(Default)]
    pub struct RecordingQueue {
        pub records: Vec<MappedRecord>,
        pub fail_after: Option<usize>,
        pub fail_flush: bool,
        pub flushed: usize,
        pub closed: bool,
    }

    #[async_trait]
    impl IngestionQueue for RecordingQueue {
        async fn enqueue(&mut self, record: MappedRecord) -> Result<(), Error> {
            if self.fail_after == Some(self.records.len()) {
                return Err(Error::msg("queue is full"));
            }
            self.records.push(record);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), Error> {
            if self.fail_flush {
                return Err(Error::msg("destination unavailable"));
            }
            self.flushed = self.records.len();
            Ok(())
        }

        async fn close(&mut self) -> Result<(), Error> {
            self.closed = true;
            self.flush().await
        }
    }

    fn record(event: &str) -> MappedRecord {
        MappedRecord {
            uuid: Uuid::now_v7(),
            distinct_id: "u1".to_string(),
            event: event.to_string(),
            timestamp: DateTime::<Utc>::from_timestamp(1700000000, 0).unwrap(),
            properties: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_loads_in_order() {
        let mut queue = RecordingQueue::default();
        let imported = Loader::new(&mut queue, Duration::ZERO)
            .load(vec![record("a"), record("b"), record("c")])
            .await
            .unwrap();

        assert_eq!(imported, 3);
        let events: Vec<_> = queue.records.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(events, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_fails_fast_with_imported_count() {
        let mut queue = RecordingQueue {
            fail_after: Some(2),
            ..Default::default()
        };
        let err = Loader::new(&mut queue, Duration::ZERO)
            .load(vec![record("a"), record("b"), record("c"), record("d")])
            .await
            .unwrap_err();

        assert_eq!(err.imported, 2);
        assert_eq!(err.event, "c");
        assert!(err.to_string().contains("queue is full"));
        assert_eq!(queue.records.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paces_between_submissions() {
        let mut queue = RecordingQueue::default();
        let start = tokio::time::Instant::now();
        Loader::new(&mut queue, Duration::from_millis(10))
            .load(vec![record("a"), record("b"), record("c")])
            .await
            .unwrap();

        // No wait before the first record
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(30), "{elapsed:?}");
        assert_eq!(queue.records.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_load() {
        let mut queue = RecordingQueue::default();
        let imported = Loader::new(&mut queue, Duration::from_millis(10))
            .load(Vec::new())
            .await
            .unwrap();
        assert_eq!(imported, 0);
    }
}

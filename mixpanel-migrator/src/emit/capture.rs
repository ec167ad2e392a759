use std::time::Duration;

use anyhow::Error;
use async_trait::async_trait;
use posthog_rs::{Client, Event};
use tracing::{debug, info, warn};

use super::{backoff::BackoffPolicy, IngestionQueue, MappedRecord};

const MAX_RETRIES: u32 = 5;

/// Retry policy for transient HTTP errors from the capture service. Starts at
/// 1 second and doubles up to 30 seconds, giving roughly a minute of total
/// retry time before surfacing the error.
const RETRY_POLICY: BackoffPolicy =
    BackoffPolicy::new(Duration::from_secs(1), 2.0, Duration::from_secs(30));

/// Sends records to PostHog's capture endpoint in historical migration batches.
pub struct CaptureQueue {
    client: Client,
    batch_size: usize,
    pending: Vec<Event>,
    retry_policy: BackoffPolicy,
    sent: usize,
}

impl CaptureQueue {
    pub async fn new(api_key: &str, endpoint: &str, batch_size: usize) -> Self {
        let options: posthog_rs::ClientOptions = (api_key, endpoint).into();
        Self::with_client(posthog_rs::client(options).await, batch_size)
    }

    pub fn with_client(client: Client, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            client,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            retry_policy: RETRY_POLICY,
            sent: 0,
        }
    }

    /// Events accepted by capture so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    async fn send_pending(&mut self) -> Result<(), Error> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let count = self.pending.len();

        for attempt in 0..=MAX_RETRIES {
            match self.client.capture_batch(self.pending.clone(), true).await {
                Ok(()) => break,
                Err(e) if is_retryable(&e) && attempt < MAX_RETRIES => {
                    // Prefer the server's Retry-After hint when present
                    let retry_after = match &e {
                        // posthog-rs 0.4.x exposes no Retry-After value on RateLimit
                        posthog_rs::Error::RateLimit => None,
                        _ => None,
                    };
                    let delay = self.retry_policy.delay_for(attempt, retry_after);
                    warn!(
                        "transient capture error, retrying (attempt {attempt}/{MAX_RETRIES}, delay {delay:?}): {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(Error::msg(format!(
                        "capture batch of {count} events failed after {} attempts: {e}",
                        attempt + 1
                    )));
                }
            }
        }

        self.pending.clear();
        self.sent += count;
        debug!("sent batch of {count} events to capture, {} total", self.sent);
        Ok(())
    }
}

fn convert_record(record: &MappedRecord) -> Result<Event, Error> {
    let mut event = Event::new(&record.event, &record.distinct_id);

    event.set_uuid(record.uuid);
    event
        .set_timestamp(record.timestamp)
        .map_err(|e| Error::msg(e.to_string()))?;

    for (key, value) in &record.properties {
        event
            .insert_prop(key, value)
            .map_err(|e| Error::msg(e.to_string()))?;
    }

    Ok(event)
}

fn is_retryable(err: &posthog_rs::Error) -> bool {
    matches!(
        err,
        posthog_rs::Error::RateLimit { .. } | posthog_rs::Error::ServerError { .. }
    )
}

#[async_trait]
impl IngestionQueue for CaptureQueue {
    async fn enqueue(&mut self, record: MappedRecord) -> Result<(), Error> {
        self.pending.push(convert_record(&record)?);
        if self.pending.len() >= self.batch_size {
            self.send_pending().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        self.send_pending().await
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.send_pending().await?;
        info!("capture queue closed, {} events sent", self.sent);
        Ok(())
    }
}

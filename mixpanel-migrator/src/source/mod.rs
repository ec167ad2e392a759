use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream::BoxStream, Stream, StreamExt};
use reqwest::StatusCode;
use thiserror::Error;

use crate::parse::{ConcatenatedJsonDecoder, DecodeError, RawRecord};

pub mod chunks;
pub mod mixpanel;

pub use chunks::{plan_chunks, DateChunk, PlanError};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("export request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("export endpoint returned {status}: {hint} (response: {body})")]
    Status {
        status: StatusCode,
        hint: &'static str,
        body: String,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[async_trait]
pub trait ExportSource: Send + Sync {
    /// Starts the export of every event in the chunk's days. Records are decoded lazily as the
    /// response body arrives.
    async fn export(&self, chunk: &DateChunk) -> Result<RecordStream, ExtractionError>;
}

/// Raw records decoded one at a time off a streamed export body.
pub struct RecordStream {
    body: BoxStream<'static, Result<Bytes, ExtractionError>>,
    decoder: ConcatenatedJsonDecoder<RawRecord>,
    exhausted: bool,
}

impl RecordStream {
    pub fn new<S>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ExtractionError>> + Send + 'static,
    {
        Self {
            body: body.boxed(),
            decoder: ConcatenatedJsonDecoder::new(),
            exhausted: false,
        }
    }

    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ExtractionError::from)),
        )
    }

    /// `Ok(None)` once the body has been fully and cleanly consumed.
    pub async fn next_record(&mut self) -> Result<Option<RawRecord>, ExtractionError> {
        loop {
            if let Some(record) = self.decoder.next_value()? {
                return Ok(Some(record));
            }
            if self.exhausted {
                self.decoder.finish()?;
                return Ok(None);
            }
            match self.body.next().await {
                Some(chunk) => self.decoder.push(&chunk?),
                None => self.exhausted = true,
            }
        }
    }

    /// Bytes of the body decoded so far.
    pub fn bytes_read(&self) -> usize {
        self.decoder.offset()
    }
}

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    dedup::Deduplicator,
    emit::{
        loader::{LoadError, Loader},
        IngestionQueue,
    },
    parse::{normalize, NormalizedRecord},
    source::{plan_chunks, DateChunk, ExportSource, ExtractionError, PlanError},
    transform::to_mapped,
};

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("invalid date range: {0}")]
    Plan(#[from] PlanError),
    #[error("exporting {chunk} failed")]
    Extract {
        chunk: DateChunk,
        #[source]
        source: ExtractionError,
    },
    #[error("importing {chunk} failed")]
    Load {
        chunk: DateChunk,
        #[source]
        source: LoadError,
    },
    #[error("delivering {chunk} failed after {imported} events were queued")]
    Flush {
        chunk: DateChunk,
        imported: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub chunk_size_days: u32,
    pub enqueue_delay: Duration,
    pub lib_version: String,
    pub import_tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    pub decoded: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub imported: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub chunks: usize,
    pub decoded: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub imported: usize,
}

impl MigrationSummary {
    fn add(&mut self, report: &ChunkReport) {
        self.chunks += 1;
        self.decoded += report.decoded;
        self.skipped += report.skipped;
        self.duplicates += report.duplicates;
        self.imported += report.imported;
    }
}

/// Moves every event in the configured date range from the export source into the ingestion
/// queue, one chunk at a time. A chunk is fully exported and deduplicated before any of it is
/// loaded, and the queue is flushed before the chunk counts as completed.
pub struct Migration<'a, S: ExportSource + ?Sized, Q: IngestionQueue + ?Sized> {
    settings: MigrationSettings,
    source: &'a S,
    queue: &'a mut Q,
}

impl<'a, S: ExportSource + ?Sized, Q: IngestionQueue + ?Sized> Migration<'a, S, Q> {
    pub fn new(settings: MigrationSettings, source: &'a S, queue: &'a mut Q) -> Self {
        Self {
            settings,
            source,
            queue,
        }
    }

    pub async fn run(&mut self) -> Result<MigrationSummary, MigrationError> {
        let chunks = plan_chunks(
            self.settings.from_date,
            self.settings.to_date,
            self.settings.chunk_size_days,
        )?;
        let total = chunks.len();
        info!(
            "Processing {} chunks of up to {} days, {} to {}",
            total, self.settings.chunk_size_days, self.settings.from_date, self.settings.to_date
        );

        let mut summary = MigrationSummary::default();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let started = Instant::now();
            let report = self.process_chunk(&chunk).await?;
            summary.add(&report);
            info!(
                decoded = report.decoded,
                skipped = report.skipped,
                duplicates = report.duplicates,
                imported = report.imported,
                "Completed chunk {}/{} ({}) in {:?}",
                i + 1,
                total,
                chunk,
                started.elapsed()
            );
        }

        info!(
            "All chunks processed: {} events imported, {} skipped, {} duplicates dropped",
            summary.imported, summary.skipped, summary.duplicates
        );
        Ok(summary)
    }

    async fn process_chunk(&mut self, chunk: &DateChunk) -> Result<ChunkReport, MigrationError> {
        let (records, mut report) =
            self.extract(chunk)
                .await
                .map_err(|source| MigrationError::Extract {
                    chunk: *chunk,
                    source,
                })?;
        // Nothing is loaded until the whole chunk has been read, so an export that dies halfway
        // leaves the destination untouched for this chunk

        let import_tag = &self.settings.import_tag;
        let mapped = records
            .into_iter()
            .map(|record| to_mapped(record, import_tag))
            .collect();

        report.imported = Loader::new(&mut *self.queue, self.settings.enqueue_delay)
            .load(mapped)
            .await
            .map_err(|source| MigrationError::Load {
                chunk: *chunk,
                source,
            })?;

        self.queue
            .flush()
            .await
            .map_err(|source| MigrationError::Flush {
                chunk: *chunk,
                imported: report.imported,
                source: source.into(),
            })?;

        Ok(report)
    }

    async fn extract(
        &self,
        chunk: &DateChunk,
    ) -> Result<(Vec<NormalizedRecord>, ChunkReport), ExtractionError> {
        let mut stream = self.source.export(chunk).await?;
        let mut dedup = Deduplicator::new();
        let mut report = ChunkReport::default();
        let mut records = Vec::new();

        while let Some(raw) = stream.next_record().await? {
            report.decoded += 1;
            match normalize(raw, &self.settings.lib_version) {
                Ok(record) => {
                    if dedup.admit(&record) {
                        records.push(record);
                    }
                }
                Err(reason) => {
                    debug!(reason = reason.as_str(), "Skipping event: {}", reason);
                    report.skipped += 1;
                }
            }
        }

        report.duplicates = dedup.duplicates();
        if report.duplicates > 0 {
            info!(
                duplicates_removed = report.duplicates,
                final_count = records.len(),
                "Deduplicated events"
            );
        }
        if report.skipped > 0 {
            info!(
                skipped = report.skipped,
                "Skipped events with no distinct_id or time"
            );
        }
        debug!("Decoded {} bytes for {}", stream.bytes_read(), chunk);

        Ok((records, report))
    }
}

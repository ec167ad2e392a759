use std::fmt;

use chrono::{Days, NaiveDate};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive range of calendar days exported with a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateChunk {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateChunk {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("chunk size must be at least one day")]
    ZeroChunkSize,
    #[error("from date {from} is after to date {to}")]
    InvertedRange { from: NaiveDate, to: NaiveDate },
}

/// Splits `[from, to]` into contiguous chunks of `chunk_size_days` days each. The last chunk
/// is cut short at `to`.
pub fn plan_chunks(
    from: NaiveDate,
    to: NaiveDate,
    chunk_size_days: u32,
) -> Result<Vec<DateChunk>, PlanError> {
    if chunk_size_days == 0 {
        return Err(PlanError::ZeroChunkSize);
    }
    if from > to {
        return Err(PlanError::InvertedRange { from, to });
    }

    let span = Days::new(u64::from(chunk_size_days) - 1);
    let mut chunks = Vec::new();
    let mut cursor = from;
    loop {
        // Overflowing the calendar just means this is the last chunk
        let end = cursor
            .checked_add_days(span)
            .map_or(to, |end| end.min(to));
        chunks.push(DateChunk::new(cursor, end));

        match end.succ_opt() {
            Some(next) if next <= to => cursor = next,
            _ => break,
        }
    }

    Ok(chunks)
}

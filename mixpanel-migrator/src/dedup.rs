use std::collections::HashSet;

use crate::parse::NormalizedRecord;

/// Drops repeats of the same `$insert_id` within one export chunk. Only lives as long as the
/// chunk it was created for; chunks never overlap, so there's nothing to carry across.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    duplicates: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the record should be forwarded. Records without an insert id are
    /// always forwarded, since there's nothing to compare them by.
    pub fn admit(&mut self, record: &NormalizedRecord) -> bool {
        let Some(insert_id) = record.insert_id.as_deref() else {
            return true;
        };
        if self.seen.contains(insert_id) {
            self.duplicates += 1;
            return false;
        }
        self.seen.insert(insert_id.to_string());
        true
    }

    pub fn dedupe(
        &mut self,
        records: impl IntoIterator<Item = NormalizedRecord>,
    ) -> Vec<NormalizedRecord> {
        records.into_iter().filter(|r| self.admit(r)).collect()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

// ── Snapshot differencing ──
//
// Detects newly appended records by comparing feed lengths between polls.
// The source is assumed append-only and non-reordering; a source that
// drops old records while adding new ones will be under-counted.

use crate::model::SensorRecord;

/// Result of comparing a fresh snapshot against the baseline.
#[derive(Debug, PartialEq)]
pub enum Diff<'a> {
    /// The feed grew; the slice holds the new records in source order.
    Appended(&'a [SensorRecord]),
    /// Same length as the baseline.
    Unchanged,
    /// The feed got shorter. The baseline must be kept.
    Shrunk { baseline: usize, current: usize },
}

/// Holds the diff baseline: the last snapshot successfully applied.
///
/// Starts empty, so the first successful poll reports every record as new.
#[derive(Debug, Default)]
pub struct SnapshotDiffer {
    baseline: Vec<SensorRecord>,
}

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline_len(&self) -> usize {
        self.baseline.len()
    }

    pub fn baseline(&self) -> &[SensorRecord] {
        &self.baseline
    }

    /// Compare `current` with the baseline without changing it.
    pub fn diff<'a>(&self, current: &'a [SensorRecord]) -> Diff<'a> {
        let prev = self.baseline.len();
        match current.len() {
            n if n > prev => Diff::Appended(&current[prev..]),
            n if n == prev => Diff::Unchanged,
            n => Diff::Shrunk {
                baseline: prev,
                current: n,
            },
        }
    }

    /// Adopt `current` as the new baseline.
    ///
    /// Refuses a snapshot shorter than the baseline and returns `false`;
    /// the next real growth would otherwise be under-counted.
    pub fn commit(&mut self, current: Vec<SensorRecord>) -> bool {
        if current.len() < self.baseline.len() {
            return false;
        }
        self.baseline = current;
        true
    }
}

//! Import state machine, counters, and abort policy.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::ImportConfig;
use crate::store::RecordKind;

/// Where a single file is in its import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    /// Queued.
    Pending,
    /// Parsing the document and resolving its mentions.
    Resolving,
    /// Checking content and comparing against the stored entry.
    Validating,
    /// Writing records inside the file's transaction.
    Committing,
    /// Imported, or already up to date.
    Succeeded,
    /// Rolled back and recorded in the ledger.
    Failed,
}

impl ImportState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Succeeded | ImportState::Failed)
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImportState::Pending => "PENDING",
            ImportState::Resolving => "RESOLVING",
            ImportState::Validating => "VALIDATING",
            ImportState::Committing => "COMMITTING",
            ImportState::Succeeded => "SUCCEEDED",
            ImportState::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Counters for one batch, updated after every file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportStats {
    /// Files handled so far.
    pub processed: usize,
    /// Files imported.
    pub succeeded: usize,
    /// Files rolled back.
    pub failed: usize,
    /// Files already imported with identical content.
    pub skipped: usize,
    /// Failures since the last non-failure.
    pub consecutive_failures: usize,
    /// Records created, by kind.
    pub created: BTreeMap<RecordKind, usize>,
}

impl ImportStats {
    /// Cumulative failure rate, 0 when nothing was processed.
    pub fn failure_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.failed as f64 / self.processed as f64
        }
    }

    /// Total records created.
    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }

    pub(crate) fn record_success(&mut self, created: &BTreeMap<RecordKind, usize>) {
        self.processed += 1;
        self.succeeded += 1;
        self.consecutive_failures = 0;
        for (kind, count) in created {
            *self.created.entry(*kind).or_insert(0) += count;
        }
    }

    pub(crate) fn record_skip(&mut self) {
        self.processed += 1;
        self.skipped += 1;
        self.consecutive_failures = 0;
    }

    pub(crate) fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
        self.consecutive_failures += 1;
    }
}

/// Why a batch stopped early.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AbortReason {
    /// Too many failures in a row.
    ConsecutiveFailures { count: usize },
    /// Too many failures overall.
    FailureRate { failed: usize, processed: usize },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ConsecutiveFailures { count } => {
                write!(f, "stopped after {} consecutive failures", count)
            }
            AbortReason::FailureRate { failed, processed } => write!(
                f,
                "stopped at {:.1}% failure rate ({} of {} files)",
                *failed as f64 * 100.0 / *processed as f64,
                failed,
                processed
            ),
        }
    }
}

impl ImportConfig {
    /// The reason to halt, if the counters have crossed a threshold.
    pub fn abort_reason(&self, stats: &ImportStats) -> Option<AbortReason> {
        if stats.consecutive_failures >= self.max_consecutive_failures {
            return Some(AbortReason::ConsecutiveFailures {
                count: stats.consecutive_failures,
            });
        }
        if stats.processed >= self.min_files_for_rate && stats.failure_rate() > self.max_failure_rate {
            return Some(AbortReason::FailureRate {
                failed: stats.failed,
                processed: stats.processed,
            });
        }
        None
    }
}

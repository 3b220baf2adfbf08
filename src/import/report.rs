//! Import run summary

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::import::parser::{ParseError, RowError};
use crate::types::CoreError;

/// Why a row did not turn into a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueReason {
    MalformedRow,
    MalformedDate,
    MalformedAmount,
    Ignored,
    MissingReference,
    InvalidAllocation,
    InvalidTransaction,
    PersistenceFailed,
}

impl IssueReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueReason::MalformedRow => "MALFORMED_ROW",
            IssueReason::MalformedDate => "MALFORMED_DATE",
            IssueReason::MalformedAmount => "MALFORMED_AMOUNT",
            IssueReason::Ignored => "IGNORED",
            IssueReason::MissingReference => "MISSING_REFERENCE",
            IssueReason::InvalidAllocation => "INVALID_ALLOCATION",
            IssueReason::InvalidTransaction => "INVALID_TRANSACTION",
            IssueReason::PersistenceFailed => "PERSISTENCE_FAILED",
        }
    }
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ParseError> for IssueReason {
    fn from(error: &ParseError) -> Self {
        match error {
            ParseError::MalformedRow { .. } | ParseError::UnreadableRow(_) => {
                IssueReason::MalformedRow
            }
            ParseError::MalformedDate(_) => IssueReason::MalformedDate,
            ParseError::MalformedAmount(_) => IssueReason::MalformedAmount,
        }
    }
}

impl From<&CoreError> for IssueReason {
    fn from(error: &CoreError) -> Self {
        match error {
            CoreError::NotFound { .. } => IssueReason::MissingReference,
            CoreError::InvalidAllocation(_) => IssueReason::InvalidAllocation,
            CoreError::Validation(_) | CoreError::Configuration(_) => {
                IssueReason::InvalidTransaction
            }
            CoreError::Storage(_) | CoreError::Notification(_) => IssueReason::PersistenceFailed,
        }
    }
}

/// A row that produced no write, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub row: usize,
    pub reason: IssueReason,
    pub message: String,
}

/// Summary of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Successfully parsed rows, ignored and duplicate ones included
    pub total_entries: usize,
    /// Inserts that actually reached storage
    pub created_transactions: usize,
    /// Existing transactions updated under OVERWRITE
    pub overwritten_transactions: usize,
    /// Entries classified as duplicates, whatever the strategy did with them
    pub duplicate_entries: usize,
    pub issues: Vec<ImportIssue>,
    pub dry_run: bool,
}

impl ImportReport {
    pub fn issues_with(&self, reason: IssueReason) -> impl Iterator<Item = &ImportIssue> {
        self.issues.iter().filter(move |i| i.reason == reason)
    }
}

/// Accumulates counters and issues while rows are processed
#[derive(Debug)]
pub struct ImportReportBuilder {
    report: ImportReport,
}

impl ImportReportBuilder {
    pub fn new(dry_run: bool) -> Self {
        Self {
            report: ImportReport {
                dry_run,
                ..ImportReport::default()
            },
        }
    }

    pub fn parsed(&mut self, entries: usize) {
        self.report.total_entries += entries;
    }

    pub fn created(&mut self) {
        self.report.created_transactions += 1;
    }

    pub fn overwritten(&mut self) {
        self.report.overwritten_transactions += 1;
    }

    pub fn duplicate(&mut self) {
        self.report.duplicate_entries += 1;
    }

    pub fn issue(&mut self, row: usize, reason: IssueReason, message: impl Into<String>) {
        self.report.issues.push(ImportIssue {
            row,
            reason,
            message: message.into(),
        });
    }

    pub fn parse_error(&mut self, error: &RowError) {
        self.issue(
            error.row,
            IssueReason::from(&error.error),
            error.error.to_string(),
        );
    }

    pub fn core_error(&mut self, row: usize, error: &CoreError) {
        self.issue(row, IssueReason::from(error), error.to_string());
    }

    /// Finished report, issues in row order
    pub fn finish(mut self) -> ImportReport {
        self.report.issues.sort_by_key(|i| i.row);
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;

    #[test]
    fn test_builder_counts_and_orders_issues() {
        let mut builder = ImportReportBuilder::new(true);
        builder.parsed(4);
        builder.duplicate();
        builder.issue(4, IssueReason::Ignored, "ignored description");
        builder.core_error(2, &CoreError::not_found(EntityKind::Category, "food"));
        builder.parse_error(&RowError {
            row: 1,
            error: ParseError::MalformedDate("'x'".to_string()),
        });

        let report = builder.finish();
        assert!(report.dry_run);
        assert_eq!(report.total_entries, 4);
        assert_eq!(report.duplicate_entries, 1);
        assert_eq!(report.created_transactions, 0);
        assert_eq!(
            report.issues.iter().map(|i| i.row).collect::<Vec<_>>(),
            vec![1, 2, 4]
        );
        assert_eq!(report.issues[1].reason, IssueReason::MissingReference);
        assert_eq!(report.issues[1].message, "Category not found: food");
    }

    #[test]
    fn test_report_json_shape() {
        let mut builder = ImportReportBuilder::new(false);
        builder.parsed(1);
        builder.issue(1, IssueReason::Ignored, "x");
        let json = serde_json::to_value(builder.finish()).unwrap();

        assert_eq!(json["totalEntries"], 1);
        assert_eq!(json["createdTransactions"], 0);
        assert_eq!(json["duplicateEntries"], 0);
        assert_eq!(json["dryRun"], false);
        assert_eq!(json["issues"][0]["reason"], "IGNORED");
        assert_eq!(json["issues"][0]["row"], 1);
    }
}

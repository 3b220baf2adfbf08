//! Statement import pipeline
//!
//! parse → filter → detect duplicates → resolve → build → validate/persist,
//! one row at a time so later rows see the writes of earlier ones and every
//! failure is attributed to exactly one row. A dry run keeps the writes it
//! would have made in memory so its report matches a real run.

pub mod builder;
pub mod duplicates;
pub mod filter;
pub mod locale;
pub mod parser;
pub mod report;

pub use duplicates::{Classification, DuplicateDetector, PendingWrites, Resolution};
pub use filter::EntryFilter;
pub use parser::{NormalizedEntry, ParseError, StatementParser};
pub use report::{ImportIssue, ImportReport, ImportReportBuilder, IssueReason};

use tracing::{info, warn};

use crate::config::{ImportConfiguration, LedgerSettings, OverwriteMode};
use crate::ledger::transaction::TransactionService;
use crate::traits::*;
use crate::types::*;

/// Runs one import against a transaction service
pub struct StatementImporter<'a, S> {
    service: &'a mut TransactionService<S>,
    settings: &'a LedgerSettings,
}

impl<'a, S: TransactionStore + EntityLookup> StatementImporter<'a, S> {
    pub fn new(service: &'a mut TransactionService<S>, settings: &'a LedgerSettings) -> Self {
        Self { service, settings }
    }

    /// Import `content` for `owner_id`.
    ///
    /// Only an unusable configuration fails the call; everything that goes wrong
    /// with an individual row is reported as an issue in the returned report.
    pub async fn run(
        &mut self,
        owner_id: &str,
        content: &[u8],
        config: &ImportConfiguration,
    ) -> CoreResult<ImportReport> {
        let statement = parser::parse_statement(content, config.format, &config.csv)?;

        let mut report = ImportReportBuilder::new(config.dry_run);
        report.parsed(statement.entries.len());
        for error in &statement.errors {
            warn!(owner_id, row = error.row, error = %error.error, "Statement row rejected");
            report.parse_error(error);
        }

        let filter = EntryFilter::new(&config.ignore_descriptions);
        let (kept, ignored) = filter.partition(statement.entries);
        for entry in &ignored {
            report.issue(
                entry.row,
                IssueReason::Ignored,
                format!("description '{}' is on the ignore list", entry.description),
            );
        }

        let detector = DuplicateDetector::new(self.settings.duplicate_window_days);
        let mut pending = PendingWrites::new();
        for entry in &kept {
            let outcome = self
                .process_entry(
                    owner_id,
                    entry,
                    config,
                    &detector,
                    &mut pending,
                    &mut report,
                )
                .await;
            if let Err(e) = outcome {
                warn!(owner_id, row = entry.row, error = %e, "Statement row not imported");
                report.core_error(entry.row, &e);
            }
        }

        let report = report.finish();
        info!(
            owner_id,
            total = report.total_entries,
            created = report.created_transactions,
            overwritten = report.overwritten_transactions,
            duplicates = report.duplicate_entries,
            issues = report.issues.len(),
            dry_run = report.dry_run,
            "Statement import finished"
        );
        Ok(report)
    }

    async fn process_entry(
        &mut self,
        owner_id: &str,
        entry: &NormalizedEntry,
        config: &ImportConfiguration,
        detector: &DuplicateDetector,
        pending: &mut PendingWrites,
        report: &mut ImportReportBuilder,
    ) -> CoreResult<()> {
        let classification = detector
            .classify(&self.service.storage, pending, owner_id, entry)
            .await?;
        if classification.is_duplicate() {
            report.duplicate();
        }

        match duplicates::resolve(config.duplicate_strategy, classification) {
            Resolution::Skip => Ok(()),
            Resolution::Create => {
                let command = builder::command_for_entry(entry, &config.defaults);
                if config.dry_run {
                    self.service.validate(owner_id, &command).await?;
                    let id = format!("dry-run-{}", entry.row);
                    let new = NewTransaction::from_command(owner_id, command);
                    pending.record(Transaction::from_new(id, new));
                } else {
                    self.service.create(owner_id, command).await?;
                    report.created();
                }
                Ok(())
            }
            Resolution::Overwrite(existing) => {
                let replace = self.settings.overwrite_mode == OverwriteMode::ReplaceFromDefaults;
                let command =
                    builder::overwrite_command(&existing, entry, &config.defaults, replace);
                if config.dry_run {
                    self.service.validate(owner_id, &command).await?;
                    let mut preview = *existing;
                    preview.apply_command(command);
                    pending.record(preview);
                } else {
                    self.service.update(owner_id, &existing.id, command).await?;
                    report.overwritten();
                }
                Ok(())
            }
        }
    }
}

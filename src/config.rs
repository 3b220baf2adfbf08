//! Import configuration and service settings

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Statement format of the uploaded bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportFormat {
    #[default]
    Csv,
    /// Sniff the format (and CSV delimiter) from the content
    Auto,
}

/// What to do with an entry that matches an existing transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateStrategy {
    /// Leave the existing transaction alone and create nothing
    #[default]
    Skip,
    /// Update the matched transaction's amount, description and date in place
    Overwrite,
    /// Insert a new transaction despite the match
    CreateAnyway,
}

/// How much of the matched transaction an OVERWRITE replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverwriteMode {
    /// Keep id, categorization and allocations; replace amount, description, date
    #[default]
    PreserveAllocations,
    /// Keep the id; replace everything else from the entry and import defaults
    ReplaceFromDefaults,
}

/// Column addressed by header name or by zero-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

/// Which column carries each role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: ColumnRef,
    pub description: ColumnRef,
    pub amount: ColumnRef,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: ColumnRef::Name("date".to_string()),
            description: ColumnRef::Name("description".to_string()),
            amount: ColumnRef::Name("amount".to_string()),
        }
    }
}

impl ColumnMapping {
    /// Positional mapping for files without a header row
    pub fn positional(date: usize, description: usize, amount: usize) -> Self {
        Self {
            date: ColumnRef::Index(date),
            description: ColumnRef::Index(description),
            amount: ColumnRef::Index(amount),
        }
    }
}

/// CSV specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CsvConfig {
    pub contains_header: bool,
    pub delimiter: char,
    pub columns: ColumnMapping,
    /// BCP 47 tag, e.g. `pt-BR` or `en-US`
    pub locale: String,
    /// Tried in order, first match wins; chrono (`%d/%m/%Y`) or `dd/MM/yyyy` style
    pub date_patterns: Vec<String>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            contains_header: true,
            delimiter: ';',
            columns: ColumnMapping::default(),
            locale: "pt-BR".to_string(),
            date_patterns: Vec::new(),
        }
    }
}

impl CsvConfig {
    /// Patterns used when none are configured
    pub const DEFAULT_DATE_PATTERNS: [&'static str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether first row is header
    pub fn with_header(mut self, contains_header: bool) -> Self {
        self.contains_header = contains_header;
        self
    }

    /// Set the locale tag
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    /// Append a date pattern
    pub fn with_date_pattern(mut self, pattern: &str) -> Self {
        self.date_patterns.push(pattern.to_string());
        self
    }

    /// Set the column mapping
    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    /// Configured date patterns, or the defaults when none are set
    pub fn effective_date_patterns(&self) -> Vec<String> {
        if self.date_patterns.is_empty() {
            Self::DEFAULT_DATE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect()
        } else {
            self.date_patterns.clone()
        }
    }
}

/// Categorization and split applied to every imported entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportDefaults {
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub source_entity_id: Option<String>,
    /// Type for non-negative amounts; negative amounts are always expenses
    pub transaction_type: TransactionType,
    pub subtype: TransactionSubtype,
    pub source: TransactionSource,
    pub responsibility_template: Vec<ResponsibilityAllocation>,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            category_id: None,
            subcategory_id: None,
            source_entity_id: None,
            transaction_type: TransactionType::Expense,
            subtype: TransactionSubtype::Variable,
            source: TransactionSource::BankAccount,
            responsibility_template: Vec::new(),
        }
    }
}

/// Everything one import run needs besides the bytes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportConfiguration {
    pub format: ImportFormat,
    pub csv: CsvConfig,
    pub duplicate_strategy: DuplicateStrategy,
    pub dry_run: bool,
    /// Descriptions to drop, compared case-insensitively
    pub ignore_descriptions: Vec<String>,
    pub defaults: ImportDefaults,
}

impl ImportConfiguration {
    /// Parse a configuration from its JSON representation
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Configuration(format!("invalid import configuration: {}", e)))
    }
}

/// Service-level knobs shared by every import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerSettings {
    /// Days either side of an entry's date searched for duplicates
    pub duplicate_window_days: u32,
    pub overwrite_mode: OverwriteMode,
}

impl LedgerSettings {
    pub const DEFAULT_DUPLICATE_WINDOW_DAYS: u32 = 3;
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            duplicate_window_days: Self::DEFAULT_DUPLICATE_WINDOW_DAYS,
            overwrite_mode: OverwriteMode::default(),
        }
    }
}

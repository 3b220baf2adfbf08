//! Tabular statement parsing
//!
//! Turns raw statement bytes into ordered [`NormalizedEntry`] values. Problems
//! confined to a single row are reported as [`ParseError`]s tagged with the row
//! number and never stop the batch; only an unusable configuration aborts.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::{ColumnRef, CsvConfig, ImportFormat};
use crate::import::locale::{self, NumberFormat};
use crate::types::{CoreError, CoreResult};

/// A parsed statement row prior to becoming a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEntry {
    /// 1-indexed data row, header and blank lines excluded
    pub row: usize,
    pub date: NaiveDate,
    pub description: String,
    /// Signed as it appeared in the statement
    pub amount: BigDecimal,
    pub raw_fields: Vec<String>,
}

/// Row-scoped parse failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("expected at least {expected} columns, found {found}")]
    MalformedRow { expected: usize, found: usize },
    #[error("unreadable row: {0}")]
    UnreadableRow(String),
    #[error("invalid date: {0}")]
    MalformedDate(String),
    #[error("invalid amount: {0}")]
    MalformedAmount(String),
}

/// A [`ParseError`] attached to the row it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub error: ParseError,
}

/// Entries and row errors in statement order
#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub entries: Vec<NormalizedEntry>,
    pub errors: Vec<RowError>,
}

/// Column positions of each role after header resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndexes {
    date: usize,
    description: usize,
    amount: usize,
}

impl ColumnIndexes {
    fn required_len(&self) -> usize {
        self.date.max(self.description).max(self.amount) + 1
    }
}

/// Decode statement bytes: UTF-8 (BOM stripped), falling back to ISO-8859-1
pub fn decode(content: &[u8]) -> String {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => content.iter().map(|&b| b as char).collect(),
    }
}

/// Guess the delimiter from the first non-blank line
pub fn sniff_delimiter(text: &str) -> Option<char> {
    let line = text.lines().find(|l| !l.trim().is_empty())?;
    [';', ',', '\t', '|']
        .into_iter()
        .map(|d| (d, line.matches(d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
}

/// Parser for one statement under a fixed configuration
pub struct StatementParser {
    config: CsvConfig,
    number_format: NumberFormat,
    date_patterns: Vec<String>,
}

impl StatementParser {
    /// Build a parser, resolving the format against the content when `format` is AUTO
    pub fn new(format: ImportFormat, config: &CsvConfig, text: &str) -> CoreResult<Self> {
        let mut config = config.clone();
        if format == ImportFormat::Auto {
            if let Some(delimiter) = sniff_delimiter(text) {
                debug!(delimiter = ?delimiter, "Sniffed statement delimiter");
                config.delimiter = delimiter;
            }
        }

        if !config.delimiter.is_ascii() {
            return Err(CoreError::Configuration(format!(
                "delimiter '{}' must be a single ASCII character",
                config.delimiter
            )));
        }

        Ok(Self {
            number_format: NumberFormat::for_locale(&config.locale),
            date_patterns: config.effective_date_patterns(),
            config,
        })
    }

    /// Parse decoded statement text
    pub fn parse(&self, text: &str) -> CoreResult<ParsedStatement> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter as u8)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut statement = ParsedStatement::default();
        let mut columns: Option<ColumnIndexes> = None;
        let mut row = 0;

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    row += 1;
                    statement.errors.push(RowError {
                        row,
                        error: ParseError::UnreadableRow(e.to_string()),
                    });
                    continue;
                }
            };

            if is_blank(&record) {
                continue;
            }

            let indexes = match columns {
                Some(indexes) => indexes,
                None if self.config.contains_header => {
                    columns = Some(self.resolve_header(&record)?);
                    continue;
                }
                None => {
                    let indexes = self.resolve_positional()?;
                    columns = Some(indexes);
                    indexes
                }
            };

            row += 1;
            match self.parse_record(&record, indexes, row) {
                Ok(entry) => statement.entries.push(entry),
                Err(error) => statement.errors.push(RowError { row, error }),
            }
        }

        Ok(statement)
    }

    fn resolve_header(&self, header: &StringRecord) -> CoreResult<ColumnIndexes> {
        let by_name: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();

        let lookup = |role: &str, column: &ColumnRef| -> CoreResult<usize> {
            match column {
                ColumnRef::Index(i) => Ok(*i),
                ColumnRef::Name(name) => by_name
                    .get(&name.trim().to_lowercase())
                    .copied()
                    .ok_or_else(|| {
                        CoreError::Configuration(format!(
                            "{} column '{}' not found in header",
                            role, name
                        ))
                    }),
            }
        };

        Ok(ColumnIndexes {
            date: lookup("date", &self.config.columns.date)?,
            description: lookup("description", &self.config.columns.description)?,
            amount: lookup("amount", &self.config.columns.amount)?,
        })
    }

    fn resolve_positional(&self) -> CoreResult<ColumnIndexes> {
        let position = |role: &str, column: &ColumnRef, default: usize| -> CoreResult<usize> {
            match column {
                ColumnRef::Index(i) => Ok(*i),
                ColumnRef::Name(name) if name.eq_ignore_ascii_case(role) => Ok(default),
                ColumnRef::Name(name) => name.trim().parse().map_err(|_| {
                    CoreError::Configuration(format!(
                        "{} column '{}' cannot be resolved without a header row",
                        role, name
                    ))
                }),
            }
        };

        Ok(ColumnIndexes {
            date: position("date", &self.config.columns.date, 0)?,
            description: position("description", &self.config.columns.description, 1)?,
            amount: position("amount", &self.config.columns.amount, 2)?,
        })
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        columns: ColumnIndexes,
        row: usize,
    ) -> Result<NormalizedEntry, ParseError> {
        if record.len() < columns.required_len() {
            return Err(ParseError::MalformedRow {
                expected: columns.required_len(),
                found: record.len(),
            });
        }

        let field = |i: usize| record.get(i).unwrap_or_default();

        let date = locale::parse_date(field(columns.date), &self.date_patterns)
            .map_err(ParseError::MalformedDate)?;
        let amount = locale::parse_amount(field(columns.amount), self.number_format)
            .map_err(ParseError::MalformedAmount)?;

        Ok(NormalizedEntry {
            row,
            date,
            description: field(columns.description).to_string(),
            amount,
            raw_fields: record.iter().map(str::to_string).collect(),
        })
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Parse statement bytes in one call
pub fn parse_statement(
    content: &[u8],
    format: ImportFormat,
    config: &CsvConfig,
) -> CoreResult<ParsedStatement> {
    let text = decode(content);
    StatementParser::new(format, config, &text)?.parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnMapping;
    use std::str::FromStr;

    fn parse(content: &str, config: &CsvConfig) -> ParsedStatement {
        parse_statement(content.as_bytes(), ImportFormat::Csv, config)
            .unwrap()
    }

    #[test]
    fn test_header_resolves_columns_by_name() {
        let config = CsvConfig::default();
        let statement = parse(
            "Amount;Date;Description\n-45,90;2024-01-05;Supermercado\n1.200,00;2024-01-06;Salário\n",
            &config,
        );

        assert!(statement.errors.is_empty());
        assert_eq!(statement.entries.len(), 2);
        assert_eq!(statement.entries[0].row, 1);
        assert_eq!(
            statement.entries[0].amount,
            BigDecimal::from_str("-45.90").unwrap()
        );
        assert_eq!(statement.entries[1].row, 2);
        assert_eq!(statement.entries[1].description, "Salário");
        assert_eq!(statement.entries[1].amount, BigDecimal::from(1200));
    }

    #[test]
    fn test_quoted_fields_and_blank_lines() {
        let config = CsvConfig::default().with_delimiter(',').with_locale("en-US");
        let statement = parse(
            "date,description,amount\n\n2024-01-05,\"Coffee, large\",\"1,234.50\"\n   \n,,\n2024-01-07,Tea,3\n",
            &config,
        );

        assert!(statement.errors.is_empty());
        assert_eq!(statement.entries.len(), 2);
        assert_eq!(statement.entries[0].description, "Coffee, large");
        assert_eq!(
            statement.entries[0].amount,
            BigDecimal::from_str("1234.50").unwrap()
        );
        assert_eq!(statement.entries[1].row, 2);
    }

    #[test]
    fn test_row_errors_do_not_abort() {
        let config = CsvConfig::default();
        let statement = parse(
            "date;description;amount\n2024-01-05;Short\nnot-a-date;Padaria;10,00\n2024-01-06;Farmácia;abc\n2024-01-07;Feira;25,00\n",
            &config,
        );

        assert_eq!(statement.entries.len(), 1);
        assert_eq!(statement.entries[0].row, 4);
        assert_eq!(statement.errors.len(), 3);
        assert_eq!(statement.errors[0].row, 1);
        assert!(matches!(
            statement.errors[0].error,
            ParseError::MalformedRow {
                expected: 3,
                found: 2
            }
        ));
        assert!(matches!(statement.errors[1].error, ParseError::MalformedDate(_)));
        assert!(matches!(statement.errors[2].error, ParseError::MalformedAmount(_)));
    }

    #[test]
    fn test_empty_description_is_not_a_parse_error() {
        let statement = parse(
            "date;description;amount\n2024-01-05;;100.00\n",
            &CsvConfig::default(),
        );
        assert!(statement.errors.is_empty());
        assert_eq!(statement.entries[0].description, "");
    }

    #[test]
    fn test_without_header_uses_positions() {
        let config = CsvConfig::default()
            .with_header(false)
            .with_date_pattern("dd/MM/yyyy");
        let statement = parse("05/01/2024;Uber;-23,40\n", &config);
        assert_eq!(
            statement.entries[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(statement.entries[0].description, "Uber");

        let config = CsvConfig::default()
            .with_header(false)
            .with_columns(ColumnMapping::positional(2, 0, 1));
        let statement = parse("Uber;-23,40;2024-01-05\n", &config);
        assert_eq!(statement.entries[0].description, "Uber");
        assert_eq!(
            statement.entries[0].amount,
            BigDecimal::from_str("-23.40").unwrap()
        );
    }

    #[test]
    fn test_unknown_header_column_is_configuration_error() {
        let mut config = CsvConfig::default();
        config.columns.amount = ColumnRef::from("valor");
        let result = parse_statement(
            b"date;description;amount\n2024-01-05;x;1\n",
            ImportFormat::Csv,
            &config,
        );
        assert!(matches!(result, Err(CoreError::Configuration(_))));
    }

    #[test]
    fn test_auto_format_sniffs_delimiter() {
        let config = CsvConfig::default().with_locale("en-US");
        let statement = parse_statement(
            b"date,description,amount\n2024-01-05,Books,12.99\n",
            ImportFormat::Auto,
            &config,
        )
        .unwrap();
        assert_eq!(statement.entries.len(), 1);
        assert_eq!(
            statement.entries[0].amount,
            BigDecimal::from_str("12.99").unwrap()
        );
    }

    #[test]
    fn test_latin1_fallback_and_bom() {
        let mut bytes = b"\xEF\xBB\xBFdate;description;amount\n".to_vec();
        assert_eq!(decode(&bytes), "date;description;amount\n");

        bytes = b"date;description;amount\n2024-01-05;Farm\xE1cia;10,00\n".to_vec();
        let statement =
            parse_statement(&bytes, ImportFormat::Csv, &CsvConfig::default()).unwrap();
        assert_eq!(statement.entries[0].description, "Farmácia");
    }
}

//! Ignore-list filtering of parsed entries

use std::collections::HashSet;

use crate::import::parser::NormalizedEntry;

/// Case-insensitive set of descriptions that never become transactions
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    ignored: HashSet<String>,
}

impl EntryFilter {
    pub fn new<I, S>(descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignored: descriptions
                .into_iter()
                .map(|d| normalize(d.as_ref()))
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn is_ignored(&self, entry: &NormalizedEntry) -> bool {
        self.ignored.contains(&normalize(&entry.description))
    }

    /// Split entries into `(kept, ignored)`, preserving order
    pub fn partition(
        &self,
        entries: Vec<NormalizedEntry>,
    ) -> (Vec<NormalizedEntry>, Vec<NormalizedEntry>) {
        entries.into_iter().partition(|e| !self.is_ignored(e))
    }
}

fn normalize(description: &str) -> String {
    description.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn entry(row: usize, description: &str) -> NormalizedEntry {
        NormalizedEntry {
            row,
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            description: description.to_string(),
            amount: BigDecimal::from(10),
            raw_fields: vec![],
        }
    }

    #[test]
    fn test_partition_is_case_insensitive() {
        let filter = EntryFilter::new(["IGNORE_THIS", "  Saldo Anterior "]);
        let (kept, ignored) = filter.partition(vec![
            entry(1, "ignore_this"),
            entry(2, "Padaria"),
            entry(3, "SALDO ANTERIOR"),
            entry(4, "IGNORE_THIS please"),
        ]);

        assert_eq!(kept.iter().map(|e| e.row).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(
            ignored.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = EntryFilter::new(Vec::<String>::new());
        let (kept, ignored) = filter.partition(vec![entry(1, ""), entry(2, "x")]);
        assert_eq!(kept.len(), 2);
        assert!(ignored.is_empty());
    }
}

//! Mapping of parsed entries onto transaction commands

use bigdecimal::BigDecimal;

use crate::config::ImportDefaults;
use crate::import::parser::NormalizedEntry;
use crate::ledger::transaction::TransactionBuilder;
use crate::types::*;

/// Command creating a transaction for `entry`.
///
/// Date, description and magnitude come from the entry; negative amounts are
/// expenses, anything else takes the default type. Categorization and the
/// responsibility split come from the defaults as-is, so a missing category or
/// template fails validation downstream rather than here.
pub fn command_for_entry(entry: &NormalizedEntry, defaults: &ImportDefaults) -> TransactionCommand {
    let transaction_type = if entry.amount < BigDecimal::from(0) {
        TransactionType::Expense
    } else {
        defaults.transaction_type
    };

    let mut builder =
        TransactionBuilder::new(entry.date, entry.description.trim(), entry.amount.abs())
            .transaction_type(transaction_type)
            .subtype(defaults.subtype)
            .source(defaults.source)
            .allocations(defaults.responsibility_template.clone());

    if let Some(ref category_id) = defaults.category_id {
        builder = builder.category(category_id.clone());
    }
    if let Some(ref subcategory_id) = defaults.subcategory_id {
        builder = builder.subcategory(subcategory_id.clone());
    }
    if let Some(ref source_entity_id) = defaults.source_entity_id {
        builder = builder.source_entity(source_entity_id.clone());
    }

    builder.build()
}

/// Command overwriting `existing` with the entry's amount, description and date.
///
/// With `replace_categorization` the categorization and split are taken from
/// the defaults as well; otherwise those of `existing` are kept.
pub fn overwrite_command(
    existing: &Transaction,
    entry: &NormalizedEntry,
    defaults: &ImportDefaults,
    replace_categorization: bool,
) -> TransactionCommand {
    if replace_categorization {
        return command_for_entry(entry, defaults);
    }

    let mut command = TransactionCommand::from_transaction(existing);
    command.amount = entry.amount.abs();
    command.description = entry.description.trim().to_string();
    command.date = entry.date;
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn entry(amount: &str) -> NormalizedEntry {
        NormalizedEntry {
            row: 3,
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            description: " Supermercado ".to_string(),
            amount: BigDecimal::from_str(amount).unwrap(),
            raw_fields: vec![],
        }
    }

    fn defaults() -> ImportDefaults {
        ImportDefaults {
            category_id: Some("groceries".to_string()),
            transaction_type: TransactionType::Income,
            responsibility_template: vec![
                ResponsibilityAllocation::new("ana", BigDecimal::from(50)),
                ResponsibilityAllocation::new("bruno", BigDecimal::from(50)),
            ],
            ..ImportDefaults::default()
        }
    }

    #[test]
    fn test_negative_amount_becomes_expense() {
        let command = command_for_entry(&entry("-87.35"), &defaults());
        assert_eq!(command.amount, BigDecimal::from_str("87.35").unwrap());
        assert_eq!(command.transaction_type, TransactionType::Expense);
        assert_eq!(command.description, "Supermercado");
        assert_eq!(command.category_id.as_deref(), Some("groceries"));
        assert_eq!(command.allocations.len(), 2);
    }

    #[test]
    fn test_positive_amount_takes_default_type() {
        let command = command_for_entry(&entry("1500"), &defaults());
        assert_eq!(command.transaction_type, TransactionType::Income);
    }

    #[test]
    fn test_missing_template_is_carried_through() {
        let command = command_for_entry(&entry("10"), &ImportDefaults::default());
        assert!(command.allocations.is_empty());
        assert!(command.category_id.is_none());
    }
}

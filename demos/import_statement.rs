//! Import a small bank statement into an in-memory ledger and reconcile one line

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use statement_core::utils::MemoryStorage;
use statement_core::{
    DuplicateStrategy, ImportConfiguration, Ledger, Page, ReconciliationRecord,
    TransactionFilter,
};
use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const STATEMENT: &str = "\
date;description;amount
2024-01-05;Supermercado;-87,35
2024-01-06;Farmácia;-23,90
2024-01-06;Saldo do dia;0,00
2024-01-10;Salário;4.500,00
";

const CONFIG: &str = r#"{
    "csv": { "delimiter": ";", "locale": "pt-BR" },
    "duplicateStrategy": "SKIP",
    "ignoreDescriptions": ["saldo do dia"],
    "defaults": {
        "categoryId": "household",
        "responsibilityTemplate": [
            { "responsibleId": "ana", "percentage": "50" },
            { "responsibleId": "bruno", "percentage": "50" }
        ]
    }
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let storage = MemoryStorage::new();
    storage
        .add_user("household-1", "Casa")
        .add_category("household", "Household")
        .add_responsible("ana", "Ana")
        .add_responsible("bruno", "Bruno");

    let mut ledger = Ledger::new(storage);
    let config = ImportConfiguration::from_json(CONFIG)?;

    let report = ledger
        .import_statement("household-1", STATEMENT.as_bytes(), &config)
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    // Importing the same file again only finds duplicates
    let again = ledger
        .import_statement("household-1", STATEMENT.as_bytes(), &config)
        .await?;
    assert_eq!(again.created_transactions, 0);
    println!(
        "re-import: {} duplicates, strategy {:?}",
        again.duplicate_entries,
        DuplicateStrategy::Skip
    );

    let transactions = ledger
        .list_transactions(
            "household-1",
            &TransactionFilter::default(),
            Page::default(),
        )
        .await?;
    for txn in &transactions {
        println!(
            "{} {:<14} {:>10} {:?}",
            txn.date, txn.description, txn.amount, txn.transaction_type
        );
        for (responsible, share) in txn.allocated_amounts() {
            println!("    {}: {}", responsible, share);
        }
    }

    if let Some(salary) = transactions.iter().find(|t| t.description == "Salário") {
        let reconciled = ledger
            .reconcile_transaction(
                "household-1",
                &salary.id,
                ReconciliationRecord::reconciled(
                    BigDecimal::from_str("4500.00")?,
                    NaiveDate::from_ymd_opt(2024, 1, 11)
                        .and_then(|d| d.and_hms_opt(8, 0, 0))
                        .ok_or("invalid reconciliation date")?,
                )
                .with_bank_reference("TED-20240110"),
            )
            .await?;
        println!("reconciled: {:?}", reconciled.reconciliation);
    }

    Ok(())
}

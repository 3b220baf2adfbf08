//! Validation utilities

use bigdecimal::BigDecimal;
use std::collections::HashSet;

use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> CoreResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(CoreError::Validation(format!("Amount must be positive, got {}", amount)))
    } else {
        Ok(())
    }
}

/// Validate that a referenced id is usable
pub fn validate_reference_id(kind: &str, id: &str) -> CoreResult<()> {
    if id.trim().is_empty() {
        return Err(CoreError::Validation(format!("{} ID cannot be empty", kind)));
    }

    if id.len() > 64 {
        return Err(CoreError::Validation(format!("{} ID cannot exceed 64 characters", kind)));
    }

    Ok(())
}

/// Validate that a transaction description is valid
pub fn validate_transaction_description(description: &str) -> CoreResult<()> {
    if description.trim().is_empty() {
        return Err(CoreError::Validation("Transaction description cannot be empty".to_string()));
    }

    if description.len() > 500 {
        return Err(CoreError::Validation(
            "Transaction description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a responsibility split.
///
/// The set must be non-empty, name each responsible at most once, keep every
/// share within (0, 100] and sum to exactly 100.
pub fn validate_allocations(allocations: &[ResponsibilityAllocation]) -> CoreResult<()> {
    if allocations.is_empty() {
        return Err(CoreError::InvalidAllocation(
            "Transaction must have at least one responsibility allocation".to_string(),
        ));
    }

    let zero = BigDecimal::from(0);
    let hundred = BigDecimal::from(100);
    let mut seen = HashSet::new();

    for allocation in allocations {
        if allocation.responsible_id.trim().is_empty() {
            return Err(CoreError::InvalidAllocation(
                "Allocation responsible ID cannot be empty".to_string(),
            ));
        }

        if !seen.insert(allocation.responsible_id.as_str()) {
            return Err(CoreError::InvalidAllocation(format!(
                "Responsible '{}' appears more than once",
                allocation.responsible_id
            )));
        }

        if allocation.percentage <= zero || allocation.percentage > hundred {
            return Err(CoreError::InvalidAllocation(format!(
                "Percentage for '{}' must be within (0, 100], got {}",
                allocation.responsible_id, allocation.percentage
            )));
        }
    }

    let total: BigDecimal = allocations.iter().map(|a| &a.percentage).sum();
    if total != hundred {
        return Err(CoreError::InvalidAllocation(format!(
            "Allocation percentages must sum to 100, got {}",
            total
        )));
    }

    Ok(())
}

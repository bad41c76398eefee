// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report aggregation: per-category totals and ranked percentage breakdowns.
//!
//! Pure and deterministic. Amounts are accumulated as [`Decimal`] so currency
//! sums never pick up binary floating-point drift.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{CategoryTotal, Record};

/// Bucket for records without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Category name -> total. Ordered by name so iteration is deterministic.
pub type Totals = BTreeMap<String, Decimal>;

/// One ranked row of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    pub category: String,
    pub total: Decimal,
    /// Share of the grand total, 0..=100. Zero when the grand total is not positive.
    pub percentage_of_total: Decimal,
}

fn bucket(category: Option<&str>) -> &str {
    match category {
        Some(name) if !name.trim().is_empty() => name,
        _ => UNCATEGORIZED,
    }
}

/// Overflow clamps to the `Decimal` bounds instead of aborting the report.
fn add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| {
        tracing::warn!("category total overflowed, clamping");
        a.saturating_add(b)
    })
}

/// Group `records` by category and sum their amounts.
pub fn sum_by_category(records: &[Record]) -> Totals {
    let mut totals = Totals::new();
    for record in records {
        let total = totals.entry(bucket(record.category.as_deref()).to_owned()).or_default();
        *total = add(*total, record.amount);
    }
    totals
}

/// Build the same mapping from server-aggregated rows, merging duplicates.
pub fn totals_from(rows: &[CategoryTotal]) -> Totals {
    let mut totals = Totals::new();
    for row in rows {
        let total = totals.entry(bucket(Some(&row.category)).to_owned()).or_default();
        *total = add(*total, row.total);
    }
    totals
}

pub fn grand_total(totals: &Totals) -> Decimal {
    totals.values().fold(Decimal::ZERO, |acc, total| add(acc, *total))
}

/// Rank `totals` by amount (descending, ties by name ascending) and annotate
/// each with its share of the grand total.
pub fn breakdown(totals: &Totals) -> Vec<BreakdownEntry> {
    let grand = grand_total(totals);
    let positive = grand > Decimal::ZERO;

    let mut entries: Vec<BreakdownEntry> = totals
        .iter()
        .map(|(category, total)| {
            let percentage_of_total = if positive {
                // Divide first: `total * 100` can overflow near Decimal::MAX.
                total
                    .checked_div(grand)
                    .map_or(Decimal::ZERO, |share| share.saturating_mul(Decimal::ONE_HUNDRED))
            } else {
                Decimal::ZERO
            };
            BreakdownEntry { category: category.clone(), total: *total, percentage_of_total }
        })
        .collect();

    entries.sort_by(|a, b| {
        let by_total = if positive { b.total.cmp(&a.total) } else { Ordering::Equal };
        by_total.then_with(|| a.category.cmp(&b.category))
    });
    entries
}

/// The largest category, if any.
pub fn top_category(entries: &[BreakdownEntry]) -> Option<&BreakdownEntry> {
    entries.first()
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;

//! Recurring-charge detection.
//!
//! A plain frequency filter over outflows: any (description, amount) pair seen
//! at least `threshold` times is reported. Timing is ignored, so three
//! unrelated $20.00 purchases at the same store also qualify.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::{RecurringCharge, Transaction};

pub fn detect_recurring(records: &[Transaction], threshold: usize) -> Vec<RecurringCharge> {
    let mut counts: HashMap<(&str, Decimal), usize> = HashMap::new();
    for txn in records.iter().filter(|t| t.money_out() > Decimal::ZERO) {
        *counts.entry((txn.description(), txn.amount())).or_default() += 1;
    }

    let mut charges: Vec<RecurringCharge> = counts
        .into_iter()
        .filter(|(_, n)| *n >= threshold)
        .map(|((description, amount), occurrences)| RecurringCharge {
            description: description.to_string(),
            amount,
            occurrences,
        })
        .collect();

    charges.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.amount.cmp(&b.amount))
    });
    charges
}

//! Greedy change-making over the fixed denomination set.
//!
//! Greedy decomposition is only minimal because {500,200,100,50,20,10,5,2,1}
//! is a canonical coin system. Changing the set would break that guarantee.

use log::info;

use crate::backend::domain::denomination_ledger::DenominationLedger;
use crate::backend::domain::models::{Denomination, DenominationCounts};

/// Split `amount` into note counts, largest denomination first
pub fn decompose(amount: u64) -> DenominationCounts {
    let mut remaining = amount;
    let mut counts = DenominationCounts::new();

    for denomination in Denomination::ALL {
        let value = u64::from(denomination.value());
        let count = remaining / value;
        remaining -= count * value;
        counts.set(denomination, u32::try_from(count).unwrap_or(u32::MAX));
    }

    counts
}

/// Recompute the change to hand back after an over-collection.
///
/// Returns `total_collected - total_amount`. A positive balance becomes the
/// `issue` counts; otherwise every `issue` count is reset to zero.
pub fn auto_issue(ledger: &mut DenominationLedger, total_amount: i64) -> i64 {
    let balance = ledger.total_collected() - total_amount;

    if balance > 0 {
        let change = decompose(balance.unsigned_abs());
        ledger.set_issue_counts(&change);
        info!(
            "Issuing change of {} in {} notes",
            balance,
            change.note_count()
        );
    } else {
        ledger.set_issue_counts(&DenominationCounts::new());
    }

    balance
}

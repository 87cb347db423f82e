//! Cash denomination ledger for one voucher edit.
//!
//! Tracks, per note value, what was in the drawer before the voucher
//! (`available`), what the operator received (`collect`), what was paid out
//! (`issue`) and the resulting `closing` count.
//!
//! ## Business Rules
//!
//! - Exactly nine denominations, fixed for the life of the ledger
//! - `closing = available + collect - issue` after every setter returns
//! - `closing` may go negative; it is reported as-is and never floored
//! - A rejected count leaves the previous value untouched

use log::debug;
use serde::Serialize;

use crate::backend::domain::models::{CountField, Denomination, DenominationCounts, ValidationError};

/// Per-denomination counts. Fields are private so `closing` can only ever be
/// derived, never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DenominationRecord {
    denomination: Denomination,
    available: u32,
    collect: u32,
    issue: u32,
    closing: i64,
}

impl DenominationRecord {
    fn new(denomination: Denomination) -> Self {
        Self {
            denomination,
            available: 0,
            collect: 0,
            issue: 0,
            closing: 0,
        }
    }

    fn recompute(&mut self) {
        self.closing = i64::from(self.available) + i64::from(self.collect) - i64::from(self.issue);
    }

    pub fn denomination(&self) -> Denomination {
        self.denomination
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn collect(&self) -> u32 {
        self.collect
    }

    pub fn issue(&self) -> u32 {
        self.issue
    }

    pub fn closing(&self) -> i64 {
        self.closing
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenominationLedger {
    records: [DenominationRecord; 9],
}

impl DenominationLedger {
    pub fn new() -> Self {
        Self {
            records: Denomination::ALL.map(DenominationRecord::new),
        }
    }

    /// Replace all nine `available` counts from a drawer snapshot
    pub fn set_available(&mut self, counts: &DenominationCounts) {
        for record in self.records.iter_mut() {
            record.available = counts.get(record.denomination);
            record.recompute();
        }
        debug!("Drawer snapshot applied: {} notes available", counts.note_count());
    }

    /// Parse operator input into a collect or issue count.
    ///
    /// Blank input counts as zero. Negative or non-numeric input is rejected
    /// and the previous value is kept.
    pub fn set_count(
        &mut self,
        denomination: Denomination,
        field: CountField,
        input: &str,
    ) -> Result<u32, ValidationError> {
        let trimmed = input.trim();
        let count = if trimmed.is_empty() {
            0
        } else {
            trimmed.parse::<u32>().map_err(|_| ValidationError::InvalidCount {
                denomination,
                input: input.to_string(),
            })?
        };

        self.set_count_value(denomination, field, count);
        Ok(count)
    }

    /// Assign an already validated count
    pub fn set_count_value(&mut self, denomination: Denomination, field: CountField, count: u32) {
        let record = &mut self.records[denomination.index()];
        match field {
            CountField::Collect => record.collect = count,
            CountField::Issue => record.issue = count,
        }
        record.recompute();
    }

    /// Replace every `issue` count at once (change-making output)
    pub fn set_issue_counts(&mut self, counts: &DenominationCounts) {
        for record in self.records.iter_mut() {
            record.issue = counts.get(record.denomination);
            record.recompute();
        }
    }

    /// Zero every collect and issue count, keeping the drawer snapshot
    pub fn clear_movements(&mut self) {
        for record in self.records.iter_mut() {
            record.collect = 0;
            record.issue = 0;
            record.recompute();
        }
    }

    pub fn record(&self, denomination: Denomination) -> &DenominationRecord {
        &self.records[denomination.index()]
    }

    pub fn records(&self) -> impl Iterator<Item = &DenominationRecord> {
        self.records.iter()
    }

    pub fn available_counts(&self) -> DenominationCounts {
        self.records.iter().map(|r| (r.denomination, r.available)).collect()
    }

    pub fn collect_counts(&self) -> DenominationCounts {
        self.records.iter().map(|r| (r.denomination, r.collect)).collect()
    }

    pub fn issue_counts(&self) -> DenominationCounts {
        self.records.iter().map(|r| (r.denomination, r.issue)).collect()
    }

    /// Σ collect × value
    pub fn total_collected(&self) -> i64 {
        self.weighted_sum(|r| i64::from(r.collect))
    }

    /// Σ issue × value
    pub fn total_issued(&self) -> i64 {
        self.weighted_sum(|r| i64::from(r.issue))
    }

    pub fn total_available(&self) -> i64 {
        self.weighted_sum(|r| i64::from(r.available))
    }

    pub fn total_closing(&self) -> i64 {
        self.weighted_sum(|r| r.closing)
    }

    fn weighted_sum(&self, count: impl Fn(&DenominationRecord) -> i64) -> i64 {
        self.records
            .iter()
            .map(|r| count(r) * i64::from(r.denomination.value()))
            .sum()
    }
}

impl Default for DenominationLedger {
    fn default() -> Self {
        Self::new()
    }
}

//! # Domain Module
//!
//! Contains the business logic for keyboard-driven voucher entry.
//!
//! This module holds the rules for counting cash against a voucher, handing
//! back change, checking that the cash reconciles, editing line items and
//! moving keyboard focus around the entry form. It operates independently of
//! any widget toolkit or remote service; those are reached through the traits
//! in `backend::io`.
//!
//! ## Module Organization
//!
//! - **denomination_ledger**: Note counts per denomination with derived closing counts
//! - **change_making**: Greedy decomposition of an over-collection into change
//! - **reconciliation**: Standard and PY checks of cash against the voucher total
//! - **line_item_table**: Line-item rows, ids, sequence numbers and row recalculation
//! - **focus_grid**: Header / table / footer focus navigation
//! - **voucher_layout**: Per-voucher-type configuration driving all of the above
//! - **voucher_session**: One voucher edit, tying the pieces together
//!
//! ## Business Rules
//!
//! - There are always exactly nine denominations: 500, 200, 100, 50, 20, 10, 5, 2, 1
//! - `closing = available + collect - issue` after every change, and may go negative
//! - The line-item table never has fewer than one row
//! - Row ids are never reused within a voucher edit
//! - A rejected edit leaves the ledger and table exactly as they were

pub mod change_making;
pub mod denomination_ledger;
pub mod focus_grid;
pub mod line_item_table;
pub mod models;
pub mod reconciliation;
pub mod voucher_layout;
pub mod voucher_session;

pub use change_making::{auto_issue, decompose};
pub use denomination_ledger::{DenominationLedger, DenominationRecord};
pub use focus_grid::FocusGridController;
pub use line_item_table::LineItemTable;
pub use reconciliation::{Reconciliation, ReconciliationRule, ReconciliationValidator, TransactionContext};
pub use voucher_layout::{VoucherKind, VoucherLayout};
pub use voucher_session::{SessionToken, SubmissionStatus, SubmissionTicket, VoucherSession};

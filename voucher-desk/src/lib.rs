//! Voucher entry core: cash denomination reconciliation and keyboard focus
//! navigation for retail accounting vouchers.

pub mod backend;

pub use backend::domain::{
    DenominationLedger, FocusGridController, LineItemTable, ReconciliationValidator, VoucherKind,
    VoucherLayout, VoucherSession,
};
pub use backend::storage::{ConfigRepository, DeskConfig};

//! Reconciliation of physical cash movement against the voucher total.
//!
//! ## Rules
//!
//! - **Standard**: `balance = collected - total`. Fails only when the voucher
//!   carries a cash payment and `balance < 0`; over-collection is handed back
//!   as change.
//! - **PY**: `net = issued - collected`. Passes only when `|net| == |total|`.
//!
//! The two rules are deliberately separate and must not be merged.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::backend::domain::denomination_ledger::DenominationLedger;
use crate::backend::domain::models::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconciliationRule {
    Standard,
    #[serde(rename = "PY")]
    Py,
}

/// Immutable for the life of one voucher edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub rule: ReconciliationRule,
    pub total_amount: i64,
}

/// Totals computed while validating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub total_collected: i64,
    pub total_issued: i64,
    /// Standard: collected - total. PY: issued - collected.
    pub balance: i64,
    /// collected - issued - total; zero once change has been handed back
    pub settled_balance: i64,
}

pub struct ReconciliationValidator;

impl ReconciliationValidator {
    /// `cash_payment` says whether any payment on the voucher is in cash.
    /// Only the Standard rule reads it.
    pub fn validate(
        ledger: &DenominationLedger,
        context: &TransactionContext,
        cash_payment: bool,
    ) -> Result<Reconciliation, ValidationError> {
        let total_collected = ledger.total_collected();
        let total_issued = ledger.total_issued();
        let settled_balance = total_collected - total_issued - context.total_amount;

        match context.rule {
            ReconciliationRule::Standard => {
                let balance = total_collected - context.total_amount;
                if cash_payment && balance < 0 {
                    warn!(
                        "Standard reconciliation failed: collected {} for total {}",
                        total_collected, context.total_amount
                    );
                    return Err(ValidationError::AmountMismatch {
                        expected: context.total_amount,
                        actual: total_collected,
                    });
                }
                Ok(Reconciliation {
                    total_collected,
                    total_issued,
                    balance,
                    settled_balance,
                })
            }
            ReconciliationRule::Py => {
                let net = total_issued - total_collected;
                if net.abs() != context.total_amount.abs() {
                    warn!(
                        "PY reconciliation failed: net cash {} for total {}",
                        net, context.total_amount
                    );
                    return Err(ValidationError::AmountMismatch {
                        expected: context.total_amount.abs(),
                        actual: net.abs(),
                    });
                }
                Ok(Reconciliation {
                    total_collected,
                    total_issued,
                    balance: net,
                    settled_balance,
                })
            }
        }
    }
}

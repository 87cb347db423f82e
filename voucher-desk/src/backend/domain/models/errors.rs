use super::denomination::Denomination;
use super::permission::Permission;

/// Input problems raised synchronously while editing a voucher.
///
/// These never leave the ledger or table half-updated: the rejected edit is
/// simply not applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Cash does not reconcile: expected {expected}, got {actual}")]
    AmountMismatch { expected: i64, actual: i64 },
    #[error("{field} is required{}", .row.map(|r| format!(" on row {}", r)).unwrap_or_default())]
    MissingRequiredField { field: String, row: Option<usize> },
    #[error("{field} '{value}' is already used on row {existing_row}")]
    DuplicateKey {
        field: String,
        value: String,
        existing_row: usize,
    },
    #[error("'{input}' is not a valid note count for {denomination}")]
    InvalidCount {
        denomination: Denomination,
        input: String,
    },
    #[error("'{input}' is not a valid number for {field}")]
    InvalidNumber { field: String, input: String },
    #[error("{field} cannot be changed on a row copied from a source document")]
    ReadOnlyField { field: String },
    #[error("Unknown field {field}")]
    UnknownField { field: String },
    #[error("Row {id} does not exist")]
    UnknownRow { id: u64 },
}

/// Failures reported by the remote voucher service
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("Voucher already exists")]
    AlreadyExists,
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Classify a non-success HTTP status. 409 means the voucher already exists.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            409 => RemoteError::AlreadyExists,
            _ => RemoteError::Rejected {
                status,
                message: if body.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.trim().to_string()
                },
            },
        }
    }
}

/// Inconsistent navigation grid. Logged and answered with a safe default,
/// never returned to callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("Malformed focus grid: {0}")]
    MalformedGrid(String),
}

/// Errors surfaced by a voucher editing session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("You do not have permission to {0} this voucher")]
    PermissionDenied(Permission),
    #[error("A submission is already in progress")]
    SubmissionInFlight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_status_maps_to_already_exists() {
        assert_eq!(RemoteError::from_status(409, "dup"), RemoteError::AlreadyExists);
        assert_eq!(
            RemoteError::from_status(500, "  boom "),
            RemoteError::Rejected {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert_eq!(
            RemoteError::from_status(400, ""),
            RemoteError::Rejected {
                status: 400,
                message: "Unknown error".to_string()
            }
        );
    }

    #[test]
    fn test_error_messages() {
        let missing = ValidationError::MissingRequiredField {
            field: "item_name".to_string(),
            row: Some(2),
        };
        assert_eq!(missing.to_string(), "item_name is required on row 2");

        let header_missing = ValidationError::MissingRequiredField {
            field: "party_name".to_string(),
            row: None,
        };
        assert_eq!(header_missing.to_string(), "party_name is required");

        let denied = SessionError::PermissionDenied(Permission::Edit);
        assert_eq!(denied.to_string(), "You do not have permission to edit this voucher");
    }
}

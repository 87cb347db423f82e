use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Note counts keyed by denomination, as carried on the wire (`r500` .. `r1`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenominationMap {
    #[serde(default)]
    pub r500: u32,
    #[serde(default)]
    pub r200: u32,
    #[serde(default)]
    pub r100: u32,
    #[serde(default)]
    pub r50: u32,
    #[serde(default)]
    pub r20: u32,
    #[serde(default)]
    pub r10: u32,
    #[serde(default)]
    pub r5: u32,
    #[serde(default)]
    pub r2: u32,
    #[serde(default)]
    pub r1: u32,
}

impl DenominationMap {
    /// Counts in descending denomination order (500 first, 1 last)
    pub fn to_array(&self) -> [u32; 9] {
        [
            self.r500, self.r200, self.r100, self.r50, self.r20, self.r10, self.r5, self.r2, self.r1,
        ]
    }

    /// Build from counts in descending denomination order
    pub fn from_array(counts: [u32; 9]) -> Self {
        let [r500, r200, r100, r50, r20, r10, r5, r2, r1] = counts;
        Self {
            r500,
            r200,
            r100,
            r50,
            r20,
            r10,
            r5,
            r2,
            r1,
        }
    }
}

/// Request for the cash drawer snapshot of a company on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawerSnapshotRequest {
    pub date: NaiveDate,
    pub company_id: String,
}

/// Drawer snapshot: notes physically present before this voucher's movements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawerSnapshotResponse {
    #[serde(flatten)]
    pub counts: DenominationMap,
}

/// One line item as submitted with a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemDto {
    /// Contiguous display sequence number, starting at 1
    pub sequence: usize,
    pub values: BTreeMap<String, String>,
    pub read_only: bool,
}

/// Voucher submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherSubmissionRequest {
    /// Client reference in format: "voucher::<kind>::epoch_millis"
    pub client_reference: String,
    pub voucher_kind: String,
    /// Existing voucher number when editing, None when creating
    pub voucher_no: Option<String>,
    pub company_id: String,
    pub total_amount: i64,
    pub header: BTreeMap<String, String>,
    pub collect: DenominationMap,
    pub issue: DenominationMap,
    pub line_items: Vec<LineItemDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherSubmissionResponse {
    pub success: bool,
    pub voucher_no: Option<String>,
    pub message: Option<String>,
}

/// Request for one page of a list selector (party, account, item, bill)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPageRequest {
    pub search: String,
    /// Cursor for pagination - record ID to start after
    pub after: Option<String>,
    pub limit: Option<u32>,
}

/// A single candidate record offered by a list selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRecord {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub records: Vec<ListRecord>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Capability flags for one voucher form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
}

impl PermissionSet {
    pub fn all() -> Self {
        Self {
            add: true,
            edit: true,
            delete: true,
        }
    }
}

impl VoucherSubmissionRequest {
    /// Generate a client reference from the voucher kind and a timestamp
    pub fn generate_reference(voucher_kind: &str, epoch_millis: u64) -> String {
        format!("voucher::{}::{}", voucher_kind, epoch_millis)
    }

    /// Parse a client reference into its kind and timestamp
    pub fn parse_reference(reference: &str) -> Result<(String, u64), VoucherReferenceError> {
        let parts: Vec<&str> = reference.split("::").collect();
        if parts.len() != 3 || parts[0] != "voucher" {
            return Err(VoucherReferenceError::InvalidFormat);
        }
        if parts[1].is_empty() {
            return Err(VoucherReferenceError::MissingKind);
        }

        let epoch_millis = parts[2]
            .parse::<u64>()
            .map_err(|_| VoucherReferenceError::InvalidTimestamp)?;

        Ok((parts[1].to_string(), epoch_millis))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoucherReferenceError {
    InvalidFormat,
    MissingKind,
    InvalidTimestamp,
}

impl fmt::Display for VoucherReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoucherReferenceError::InvalidFormat => write!(f, "Invalid voucher reference format"),
            VoucherReferenceError::MissingKind => write!(f, "Voucher reference has no kind"),
            VoucherReferenceError::InvalidTimestamp => {
                write!(f, "Invalid timestamp in voucher reference")
            }
        }
    }
}

impl std::error::Error for VoucherReferenceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_voucher_reference() {
        let reference = VoucherSubmissionRequest::generate_reference("CashTender", 1702516122000);
        assert_eq!(reference, "voucher::CashTender::1702516122000");
    }

    #[test]
    fn test_parse_voucher_reference() {
        let (kind, millis) =
            VoucherSubmissionRequest::parse_reference("voucher::PaymentVoucher::1702516125000").unwrap();
        assert_eq!(kind, "PaymentVoucher");
        assert_eq!(millis, 1702516125000);

        assert_eq!(
            VoucherSubmissionRequest::parse_reference("invoice::PaymentVoucher::1"),
            Err(VoucherReferenceError::InvalidFormat)
        );
        assert_eq!(
            VoucherSubmissionRequest::parse_reference("voucher::::1"),
            Err(VoucherReferenceError::MissingKind)
        );
        assert_eq!(
            VoucherSubmissionRequest::parse_reference("voucher::SalesReturn::soon"),
            Err(VoucherReferenceError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_denomination_map_array_order() {
        let map = DenominationMap::from_array([1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(map.r500, 1);
        assert_eq!(map.r1, 9);
        assert_eq!(map.to_array(), [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_drawer_snapshot_wire_keys() {
        let json = r#"{"r500":2,"r200":0,"r100":5,"r50":1,"r20":0,"r10":3,"r5":0,"r2":0,"r1":7}"#;
        let snapshot: DrawerSnapshotResponse = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.counts.r500, 2);
        assert_eq!(snapshot.counts.r100, 5);
        assert_eq!(snapshot.counts.r1, 7);

        // Missing keys default to zero
        let sparse: DrawerSnapshotResponse = serde_json::from_str(r#"{"r50":4}"#).unwrap();
        assert_eq!(sparse.counts.r50, 4);
        assert_eq!(sparse.counts.r500, 0);
    }
}

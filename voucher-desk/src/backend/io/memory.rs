//! In-process collaborators.
//!
//! Used by the replay console and by tests in place of the remote voucher
//! service, list pickers, permission lookup and widget focus layer.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use shared::{
    DenominationMap, DrawerSnapshotRequest, DrawerSnapshotResponse, ListPage, ListPageRequest,
    ListRecord, PaginationInfo, PermissionSet, VoucherSubmissionRequest, VoucherSubmissionResponse,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::backend::domain::models::{FocusZone, RemoteError};
use crate::backend::domain::voucher_layout::{ListKind, VoucherKind};
use crate::backend::io::collaborators::{FocusSink, ListSelector, PermissionProvider, VoucherApi};

#[derive(Default)]
struct VoucherStore {
    snapshots: BTreeMap<NaiveDate, DenominationMap>,
    submissions: Vec<VoucherSubmissionRequest>,
    references: BTreeSet<String>,
    next_failure: Option<RemoteError>,
    last_voucher_no: u64,
}

/// Voucher service backed by a mutex-guarded in-memory store
#[derive(Default)]
pub struct InMemoryVoucherApi {
    store: Mutex<VoucherStore>,
}

impl InMemoryVoucherApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drawer counts returned for `date`; other dates report an empty drawer
    pub fn with_snapshot(self, date: NaiveDate, counts: DenominationMap) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.snapshots.insert(date, counts);
        }
        self
    }

    /// Make the next call fail with `error`
    pub fn fail_next(&self, error: RemoteError) {
        if let Ok(mut store) = self.store.lock() {
            store.next_failure = Some(error);
        }
    }

    /// Every accepted submission, oldest first
    pub fn submissions(&self) -> Vec<VoucherSubmissionRequest> {
        self.store
            .lock()
            .map(|store| store.submissions.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, VoucherStore>, RemoteError> {
        self.store
            .lock()
            .map_err(|_| RemoteError::Transport("voucher store lock poisoned".to_string()))
    }
}

#[async_trait]
impl VoucherApi for InMemoryVoucherApi {
    async fn fetch_drawer_snapshot(
        &self,
        request: DrawerSnapshotRequest,
    ) -> Result<DrawerSnapshotResponse, RemoteError> {
        let mut store = self.lock()?;
        if let Some(error) = store.next_failure.take() {
            return Err(error);
        }

        let counts = store.snapshots.get(&request.date).copied().unwrap_or_default();
        debug!("Drawer snapshot for {} on {}", request.company_id, request.date);
        Ok(DrawerSnapshotResponse { counts })
    }

    async fn submit_voucher(
        &self,
        request: VoucherSubmissionRequest,
    ) -> Result<VoucherSubmissionResponse, RemoteError> {
        let mut store = self.lock()?;
        if let Some(error) = store.next_failure.take() {
            return Err(error);
        }
        if !store.references.insert(request.client_reference.clone()) {
            return Err(RemoteError::AlreadyExists);
        }

        let voucher_no = match &request.voucher_no {
            Some(existing) => existing.clone(),
            None => {
                store.last_voucher_no += 1;
                format!("V{:05}", store.last_voucher_no)
            }
        };
        info!(
            "Stored {} voucher {} with {} line items",
            request.voucher_kind,
            voucher_no,
            request.line_items.len()
        );
        store.submissions.push(request);

        Ok(VoucherSubmissionResponse {
            success: true,
            voucher_no: Some(voucher_no),
            message: None,
        })
    }
}

/// Fixed permissions, optionally overridden per voucher kind
#[derive(Debug, Clone)]
pub struct StaticPermissions {
    default: PermissionSet,
    overrides: BTreeMap<VoucherKind, PermissionSet>,
}

impl StaticPermissions {
    pub fn new(default: PermissionSet) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with(mut self, kind: VoucherKind, permissions: PermissionSet) -> Self {
        self.overrides.insert(kind, permissions);
        self
    }
}

impl PermissionProvider for StaticPermissions {
    fn permissions(&self, kind: VoucherKind) -> PermissionSet {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }
}

/// List picker over fixed records
#[derive(Debug, Clone, Default)]
pub struct InMemoryListSelector {
    lists: BTreeMap<ListKind, Vec<ListRecord>>,
}

impl InMemoryListSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, kind: ListKind, records: Vec<ListRecord>) -> Self {
        self.lists.entry(kind).or_default().extend(records);
        self
    }
}

#[async_trait]
impl ListSelector for InMemoryListSelector {
    async fn fetch_page(&self, kind: ListKind, request: ListPageRequest) -> Result<ListPage, RemoteError> {
        // Set default limit if not provided (max 100)
        let limit = request.limit.unwrap_or(20).min(100) as usize;
        let search = request.search.trim().to_lowercase();

        let records = self.lists.get(&kind).map(Vec::as_slice).unwrap_or_default();
        let start = match &request.after {
            Some(cursor) => records
                .iter()
                .position(|record| &record.id == cursor)
                .map(|index| index + 1)
                .unwrap_or(records.len()),
            None => 0,
        };

        // Take one extra record to determine if there are more results
        let mut page: Vec<ListRecord> = records[start..]
            .iter()
            .filter(|record| {
                search.is_empty()
                    || record
                        .fields
                        .values()
                        .any(|value| value.to_lowercase().contains(&search))
            })
            .take(limit + 1)
            .cloned()
            .collect();

        let has_more = page.len() > limit;
        if has_more {
            page.pop();
        }
        let next_cursor = if has_more {
            page.last().map(|record| record.id.clone())
        } else {
            None
        };

        Ok(ListPage {
            records: page,
            pagination: PaginationInfo { has_more, next_cursor },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusEvent {
    pub zone: FocusZone,
    pub row_id: Option<u64>,
    pub field_name: String,
}

/// Focus sink that remembers every focus request
#[derive(Debug, Default)]
pub struct RecordingFocusSink {
    pub events: Vec<FocusEvent>,
}

impl RecordingFocusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&FocusEvent> {
        self.events.last()
    }
}

impl FocusSink for RecordingFocusSink {
    fn focus(&mut self, zone: FocusZone, row_id: Option<u64>, field_name: &str) {
        self.events.push(FocusEvent {
            zone,
            row_id,
            field_name: field_name.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(reference: &str, voucher_no: Option<&str>) -> VoucherSubmissionRequest {
        VoucherSubmissionRequest {
            client_reference: reference.to_string(),
            voucher_kind: "CashTender".to_string(),
            voucher_no: voucher_no.map(str::to_string),
            company_id: "C01".to_string(),
            total_amount: 500,
            header: BTreeMap::new(),
            collect: DenominationMap::default(),
            issue: DenominationMap::default(),
            line_items: Vec::new(),
        }
    }

    fn record(id: &str, name: &str) -> ListRecord {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), name.to_string());
        ListRecord {
            id: id.to_string(),
            fields,
        }
    }

    #[tokio::test]
    async fn test_snapshot_for_unknown_date_is_empty() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let api = InMemoryVoucherApi::new().with_snapshot(
            date,
            DenominationMap {
                r100: 5,
                ..Default::default()
            },
        );

        let known = api
            .fetch_drawer_snapshot(DrawerSnapshotRequest {
                date,
                company_id: "C01".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(known.counts.r100, 5);

        let unknown = api
            .fetch_drawer_snapshot(DrawerSnapshotRequest {
                date: date.succ_opt().unwrap(),
                company_id: "C01".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(unknown.counts, DenominationMap::default());
    }

    #[tokio::test]
    async fn test_repeated_reference_conflicts() {
        let api = InMemoryVoucherApi::new();

        let first = api.submit_voucher(submission("voucher::CashTender::1", None)).await.unwrap();
        assert_eq!(first.voucher_no.as_deref(), Some("V00001"));

        let again = api.submit_voucher(submission("voucher::CashTender::1", None)).await;
        assert_eq!(again, Err(RemoteError::AlreadyExists));

        let edit = api
            .submit_voucher(submission("voucher::CashTender::2", Some("V00001")))
            .await
            .unwrap();
        assert_eq!(edit.voucher_no.as_deref(), Some("V00001"));
        assert_eq!(api.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let api = InMemoryVoucherApi::new();
        api.fail_next(RemoteError::Transport("connection reset".to_string()));

        assert!(api.submit_voucher(submission("r1", None)).await.is_err());
        assert!(api.submit_voucher(submission("r1", None)).await.is_ok());
    }

    #[test]
    fn test_permission_overrides() {
        let permissions = StaticPermissions::new(PermissionSet::all()).with(
            VoucherKind::PaymentVoucher,
            PermissionSet {
                add: true,
                edit: false,
                delete: false,
            },
        );

        assert!(permissions.permissions(VoucherKind::SalesReturn).delete);
        assert!(!permissions.permissions(VoucherKind::PaymentVoucher).edit);
    }

    #[tokio::test]
    async fn test_list_paging_and_search() {
        let selector = InMemoryListSelector::new().with_records(
            ListKind::Party,
            vec![
                record("p1", "Anand Traders"),
                record("p2", "Bharat Stores"),
                record("p3", "Anjali Textiles"),
                record("p4", "Ankit & Sons"),
            ],
        );

        let first = selector
            .fetch_page(
                ListKind::Party,
                ListPageRequest {
                    search: "an".to_string(),
                    after: None,
                    limit: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(first.records.len(), 2);
        assert!(first.pagination.has_more);
        assert_eq!(first.pagination.next_cursor.as_deref(), Some("p3"));

        let second = selector
            .fetch_page(
                ListKind::Party,
                ListPageRequest {
                    search: "an".to_string(),
                    after: first.pagination.next_cursor.clone(),
                    limit: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].id, "p4");
        assert!(!second.pagination.has_more);
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let mut sink = RecordingFocusSink::new();
        sink.focus(FocusZone::Header, None, "voucher_date");
        sink.focus(FocusZone::Table, Some(1), "account_name");

        assert_eq!(sink.events.len(), 2);
        assert_eq!(sink.last().unwrap().row_id, Some(1));
    }
}

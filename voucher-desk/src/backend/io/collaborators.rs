//! Seams to the world outside the voucher core.
//!
//! The remote voucher service, popup list pickers, the permission lookup and
//! the widget layer that actually moves keyboard focus are all external. The
//! core only talks to them through these traits.

use async_trait::async_trait;
use shared::{
    DrawerSnapshotRequest, DrawerSnapshotResponse, ListPage, ListPageRequest, PermissionSet,
    VoucherSubmissionRequest, VoucherSubmissionResponse,
};

use crate::backend::domain::models::{FocusZone, RemoteError};
use crate::backend::domain::voucher_layout::{ListKind, VoucherKind};

/// Remote voucher service
#[async_trait]
pub trait VoucherApi: Send + Sync {
    /// Opening note counts of the cash drawer for a date
    async fn fetch_drawer_snapshot(
        &self,
        request: DrawerSnapshotRequest,
    ) -> Result<DrawerSnapshotResponse, RemoteError>;

    /// Save a voucher. A conflict comes back as [`RemoteError::AlreadyExists`].
    async fn submit_voucher(
        &self,
        request: VoucherSubmissionRequest,
    ) -> Result<VoucherSubmissionResponse, RemoteError>;
}

/// Paged popup lists (parties, accounts, items, bills)
#[async_trait]
pub trait ListSelector: Send + Sync {
    async fn fetch_page(&self, kind: ListKind, request: ListPageRequest) -> Result<ListPage, RemoteError>;
}

pub trait PermissionProvider: Send + Sync {
    fn permissions(&self, kind: VoucherKind) -> PermissionSet;
}

/// Receives the focus location the navigation grid settles on
pub trait FocusSink {
    fn focus(&mut self, zone: FocusZone, row_id: Option<u64>, field_name: &str);
}

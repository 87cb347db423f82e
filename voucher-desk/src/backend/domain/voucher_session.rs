//! One voucher edit, from open to save.
//!
//! The session owns the ledger, the line-item table, header values and the
//! current focus location for a single voucher. Keystrokes and field edits
//! are applied synchronously; the two remote calls (drawer snapshot and
//! submission) are split into a token/ticket step and an apply step so a
//! result arriving after `reset()` is dropped instead of touching the new
//! voucher's state.

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use shared::{
    DrawerSnapshotResponse, LineItemDto, ListPageRequest, ListRecord, PermissionSet,
    VoucherSubmissionRequest, VoucherSubmissionResponse,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::backend::domain::change_making::auto_issue;
use crate::backend::domain::denomination_ledger::DenominationLedger;
use crate::backend::domain::focus_grid::FocusGridController;
use crate::backend::domain::line_item_table::LineItemTable;
use crate::backend::domain::models::{
    CountField, Denomination, Direction, FieldValues, FocusLocation, FocusZone, NavKey, Permission,
    RemoteError, SessionError, ValidationError,
};
use crate::backend::domain::reconciliation::{Reconciliation, ReconciliationValidator, TransactionContext};
use crate::backend::domain::voucher_layout::{FooterAction, ListKind, VoucherLayout};
use crate::backend::io::collaborators::{FocusSink, PermissionProvider, VoucherApi};
use crate::backend::io::mappers::{DrawerMapper, VoucherEnvelope, VoucherMapper};

/// Identifies one generation of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken {
    session_id: Uuid,
    generation: u64,
}

/// A submission that has been validated and is waiting on the remote service
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    token: SessionToken,
    pub request: VoucherSubmissionRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Saved { voucher_no: Option<String> },
    AlreadyExists,
    Failed { message: String },
    /// The session was reset while the request was outstanding
    Dropped,
}

pub struct VoucherSession {
    id: Uuid,
    generation: u64,
    layout: Arc<VoucherLayout>,
    company_id: String,
    context: TransactionContext,
    ledger: DenominationLedger,
    table: LineItemTable,
    header_values: BTreeMap<String, String>,
    focus: FocusLocation,
    voucher_no: Option<String>,
    client_reference: String,
    permissions: PermissionSet,
    in_flight: bool,
    reconciliation: Option<Result<Reconciliation, ValidationError>>,
    status_message: Option<String>,
}

impl VoucherSession {
    pub fn new(
        layout: Arc<VoucherLayout>,
        company_id: impl Into<String>,
        total_amount: i64,
        permissions: PermissionSet,
    ) -> Self {
        let context = TransactionContext {
            rule: layout.rule,
            total_amount,
        };
        let table = LineItemTable::new(layout.clone());
        let header_values = BTreeMap::new();
        let focus = focus_grid(&layout, &header_values, &permissions).first_location(&table);
        let client_reference = new_client_reference(&layout);

        let session = Self {
            id: Uuid::new_v4(),
            generation: 0,
            layout,
            company_id: company_id.into(),
            context,
            ledger: DenominationLedger::new(),
            table,
            header_values,
            focus,
            voucher_no: None,
            client_reference,
            permissions,
            in_flight: false,
            reconciliation: None,
            status_message: None,
        };
        info!(
            "Opened {} session {} for total {}",
            session.layout.kind, session.id, total_amount
        );
        session
    }

    /// Open a session with permissions looked up for the layout's form
    pub fn open(
        layout: Arc<VoucherLayout>,
        company_id: impl Into<String>,
        total_amount: i64,
        provider: &dyn PermissionProvider,
    ) -> Self {
        let permissions = provider.permissions(layout.kind);
        Self::new(layout, company_id, total_amount, permissions)
    }

    /// Edit an existing voucher rather than create a new one
    pub fn with_voucher_no(mut self, voucher_no: impl Into<String>) -> Self {
        self.voucher_no = Some(voucher_no.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn layout(&self) -> &VoucherLayout {
        &self.layout
    }

    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    pub fn ledger(&self) -> &DenominationLedger {
        &self.ledger
    }

    pub fn table(&self) -> &LineItemTable {
        &self.table
    }

    pub fn header_values(&self) -> &BTreeMap<String, String> {
        &self.header_values
    }

    pub fn focus(&self) -> &FocusLocation {
        &self.focus
    }

    pub fn voucher_no(&self) -> Option<&str> {
        self.voucher_no.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Outcome of the last reconciliation run, if any has run yet
    pub fn reconciliation(&self) -> Option<&Result<Reconciliation, ValidationError>> {
        self.reconciliation.as_ref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Move focus for a navigation key and report it to `sink`
    pub fn handle_key(&mut self, key: NavKey, sink: &mut dyn FocusSink) -> FocusLocation {
        let grid = focus_grid(&self.layout, &self.header_values, &self.permissions);
        let next = match key {
            NavKey::Enter => grid.advance_linear(&mut self.table, &self.focus),
            NavKey::Tab => grid.move_focus(&self.table, &self.focus, Direction::Right),
            NavKey::BackTab => grid.move_focus(&self.table, &self.focus, Direction::Left),
            NavKey::Arrow(direction) => grid.move_focus(&self.table, &self.focus, direction),
        };
        self.set_focus(next, sink)
    }

    /// Put focus on a named field, as a mouse click would
    pub fn focus_field(
        &mut self,
        field: &str,
        row: Option<usize>,
        sink: &mut dyn FocusSink,
    ) -> Result<FocusLocation, ValidationError> {
        let location = if let Some((header_row, index)) = self.layout.header_position(field) {
            FocusLocation::header(header_row, index, field)
        } else {
            let column = self
                .layout
                .column_index(field)
                .ok_or_else(|| ValidationError::UnknownField {
                    field: field.to_string(),
                })?;
            let row_index = row.unwrap_or(0);
            let id = self
                .table
                .row_at(row_index)
                .map(|item| item.id)
                .ok_or(ValidationError::UnknownRow {
                    id: row_index as u64 + 1,
                })?;
            debug!("Focusing {} on line item {}", field, id);
            FocusLocation::table(row_index, column, field)
        };
        Ok(self.set_focus(location, sink))
    }

    pub fn set_header_field(&mut self, field: &str, value: &str) -> Result<(), ValidationError> {
        if self.layout.header_position(field).is_none() {
            return Err(ValidationError::UnknownField {
                field: field.to_string(),
            });
        }
        self.header_values
            .insert(field.to_string(), value.trim().to_string());
        Ok(())
    }

    pub fn update_line_field(&mut self, id: u64, field: &str, value: &str) -> Result<(), ValidationError> {
        self.table.update_field(id, field, value)
    }

    pub fn add_row(&mut self) -> u64 {
        self.table.add_row()
    }

    /// Delete a line item, keeping focus inside the table
    pub fn remove_row(&mut self, id: u64) -> Result<(), SessionError> {
        if !Permission::Delete.granted_by(&self.permissions) {
            warn!("Row {} kept: delete is not granted on {} vouchers", id, self.layout.kind);
            return Err(SessionError::PermissionDenied(Permission::Delete));
        }
        self.table.remove_row(id)?;
        if self.focus.is_table() && self.focus.row >= self.table.row_count() {
            self.focus.row = self.table.row_count() - 1;
        }
        Ok(())
    }

    /// Load read-only rows copied from a source document
    pub fn load_source_rows(&mut self, rows: &[LineItemDto]) -> Vec<u64> {
        let inserted = self.table.insert_source_rows(VoucherMapper::to_source_rows(rows));
        info!("Loaded {} of {} source rows", inserted.len(), rows.len());
        inserted
    }

    /// Apply a typed note count, then re-run change-making and reconciliation
    pub fn set_denomination_count(
        &mut self,
        denomination: Denomination,
        field: CountField,
        input: &str,
    ) -> Result<(), ValidationError> {
        self.ledger.set_count(denomination, field, input)?;
        if self.layout.auto_issue && field == CountField::Collect {
            auto_issue(&mut self.ledger, self.context.total_amount);
        }
        self.refresh_reconciliation();
        Ok(())
    }

    pub fn token(&self) -> SessionToken {
        SessionToken {
            session_id: self.id,
            generation: self.generation,
        }
    }

    fn is_current(&self, token: SessionToken) -> bool {
        token == self.token()
    }

    /// Apply a drawer snapshot fetched under `token`.
    ///
    /// Returns false, leaving the ledger untouched, when the session has been
    /// reset since the fetch started.
    pub fn apply_drawer_snapshot(&mut self, token: SessionToken, snapshot: &DrawerSnapshotResponse) -> bool {
        if !self.is_current(token) {
            info!("Dropping stale drawer snapshot for session {}", self.id);
            return false;
        }
        let counts = DrawerMapper::to_domain(snapshot);
        self.ledger.set_available(&counts);
        debug!("Drawer holds {} across {} notes", counts.total_value(), counts.note_count());
        true
    }

    /// Fetch the drawer snapshot for `date` and apply it
    pub async fn open_for_edit(&mut self, api: &dyn VoucherApi, date: NaiveDate) -> Result<bool, SessionError> {
        let token = self.token();
        let request = DrawerMapper::to_request(date, &self.company_id);
        let snapshot = api.fetch_drawer_snapshot(request).await?;
        Ok(self.apply_drawer_snapshot(token, &snapshot))
    }

    /// List lookup for the focused field's selector
    pub fn list_query(&self, search: &str) -> Result<(ListKind, ListPageRequest), ValidationError> {
        let selector = self
            .layout
            .selector_for(&self.focus.field_name)
            .ok_or_else(|| ValidationError::UnknownField {
                field: self.focus.field_name.clone(),
            })?;
        let request = ListPageRequest {
            search: search.trim().to_string(),
            after: None,
            limit: None,
        };
        Ok((selector.kind, request))
    }

    /// Write a picked list record into the focused field's targets.
    ///
    /// All writes succeed or none are kept. Focus then advances as if Enter
    /// had been pressed.
    pub fn apply_selection(
        &mut self,
        record: &ListRecord,
        sink: &mut dyn FocusSink,
    ) -> Result<FocusLocation, ValidationError> {
        let layout = self.layout.clone();
        let selector = layout
            .selector_for(&self.focus.field_name)
            .ok_or_else(|| ValidationError::UnknownField {
                field: self.focus.field_name.clone(),
            })?;

        let saved_header = self.header_values.clone();
        let saved_table = self.table.clone();
        if let Err(err) = self.write_selection(record, &selector.writes) {
            warn!("Discarded {:?} selection {}: {}", selector.kind, record.id, err);
            self.header_values = saved_header;
            self.table = saved_table;
            return Err(err);
        }

        let grid = focus_grid(&self.layout, &self.header_values, &self.permissions);
        let next = grid.advance_linear(&mut self.table, &self.focus);
        Ok(self.set_focus(next, sink))
    }

    fn write_selection(
        &mut self,
        record: &ListRecord,
        writes: &BTreeMap<String, String>,
    ) -> Result<(), ValidationError> {
        let row_id = if self.focus.is_table() {
            self.table.row_at(self.focus.row).map(|row| row.id)
        } else {
            None
        };

        for (key, target) in writes {
            let value = match record.fields.get(key) {
                Some(value) => value.as_str(),
                None if key == "id" => record.id.as_str(),
                None => continue,
            };

            if self.layout.header_position(target).is_some() {
                self.set_header_field(target, value)?;
            } else {
                let id = row_id.ok_or_else(|| ValidationError::UnknownField {
                    field: target.clone(),
                })?;
                self.table.update_field(id, target, value)?;
            }
        }
        Ok(())
    }

    /// Validate the voucher and build its submission request.
    ///
    /// Sets the in-flight flag; it is cleared by [`Self::finish_submission`].
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, SessionError> {
        if self.in_flight {
            return Err(SessionError::SubmissionInFlight);
        }

        let permission = if self.voucher_no.is_some() {
            Permission::Edit
        } else {
            Permission::Add
        };
        if !permission.granted_by(&self.permissions) {
            warn!("{} denied for {} voucher", permission, self.layout.kind);
            return Err(SessionError::PermissionDenied(permission));
        }

        if let Some(field) = self
            .layout
            .header_fields()
            .find(|spec| spec.required && self.header_value(&spec.name).is_empty())
        {
            return Err(ValidationError::MissingRequiredField {
                field: field.name.clone(),
                row: None,
            }
            .into());
        }

        let required = &self.layout.required_column;
        if let Some(row) = self.table.missing_required() {
            return Err(ValidationError::MissingRequiredField {
                field: required.clone(),
                row: Some(row.sequence),
            }
            .into());
        }
        if self.table.committed_rows().next().is_none() {
            return Err(ValidationError::MissingRequiredField {
                field: required.clone(),
                row: Some(1),
            }
            .into());
        }

        let reconciliation = self.refresh_reconciliation()?;
        debug!("Reconciled: {:?}", reconciliation);

        let request = VoucherMapper::to_submission(
            VoucherEnvelope {
                client_reference: &self.client_reference,
                kind: self.layout.kind,
                voucher_no: self.voucher_no.as_deref(),
                company_id: &self.company_id,
                total_amount: self.context.total_amount,
                header: &self.header_values,
            },
            &self.ledger,
            &self.table,
        );

        self.in_flight = true;
        self.status_message = None;
        info!(
            "Submitting {} voucher with {} line items",
            self.layout.kind,
            request.line_items.len()
        );
        Ok(SubmissionTicket {
            token: self.token(),
            request,
        })
    }

    /// Record the remote outcome of a submission.
    ///
    /// Form state is kept on every failure so the user can correct and retry.
    pub fn finish_submission(
        &mut self,
        ticket: &SubmissionTicket,
        result: Result<VoucherSubmissionResponse, RemoteError>,
    ) -> SubmissionStatus {
        if !self.is_current(ticket.token) {
            info!("Dropping stale submission result for session {}", self.id);
            return SubmissionStatus::Dropped;
        }
        self.in_flight = false;

        let status = match result {
            Ok(response) if response.success => {
                if response.voucher_no.is_some() {
                    self.voucher_no = response.voucher_no;
                }
                info!("Saved voucher {:?}", self.voucher_no);
                SubmissionStatus::Saved {
                    voucher_no: self.voucher_no.clone(),
                }
            }
            Ok(response) => SubmissionStatus::Failed {
                message: response
                    .message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            },
            Err(RemoteError::AlreadyExists) => SubmissionStatus::AlreadyExists,
            Err(err) => SubmissionStatus::Failed {
                message: err.to_string(),
            },
        };

        self.status_message = Some(match &status {
            SubmissionStatus::Saved { voucher_no } => match voucher_no {
                Some(no) => format!("Voucher {} saved", no),
                None => "Voucher saved".to_string(),
            },
            SubmissionStatus::AlreadyExists => RemoteError::AlreadyExists.to_string(),
            SubmissionStatus::Failed { message } => {
                warn!("Voucher submission failed: {}", message);
                format!("Failed to save voucher: {}", message)
            }
            SubmissionStatus::Dropped => String::new(),
        });
        status
    }

    /// Validate, submit through `api` and record the outcome
    pub async fn submit(&mut self, api: &dyn VoucherApi) -> Result<SubmissionStatus, SessionError> {
        let ticket = self.begin_submission()?;
        let result = api.submit_voucher(ticket.request.clone()).await;
        Ok(self.finish_submission(&ticket, result))
    }

    /// Discard the voucher being edited and start a blank one
    pub fn reset(&mut self) {
        self.generation += 1;
        self.ledger = DenominationLedger::new();
        self.table = LineItemTable::new(self.layout.clone());
        self.header_values.clear();
        self.voucher_no = None;
        self.client_reference = new_client_reference(&self.layout);
        self.in_flight = false;
        self.reconciliation = None;
        self.status_message = None;
        self.focus = focus_grid(&self.layout, &self.header_values, &self.permissions).first_location(&self.table);
        info!("Reset session {} to generation {}", self.id, self.generation);
    }

    fn header_value(&self, field: &str) -> &str {
        self.header_values
            .get(field)
            .map(|value| value.trim())
            .unwrap_or("")
    }

    /// Whether any payment on the voucher is made in cash
    pub fn has_cash_payment(&self) -> bool {
        let Some(cash) = &self.layout.cash_payment else {
            return true;
        };
        if self.layout.header_position(&cash.field).is_some() {
            return cash.matches(self.header_value(&cash.field));
        }
        self.table
            .committed_rows()
            .any(|row| cash.matches(row.value(&cash.field)))
    }

    fn refresh_reconciliation(&mut self) -> Result<Reconciliation, ValidationError> {
        let result = ReconciliationValidator::validate(&self.ledger, &self.context, self.has_cash_payment());
        self.reconciliation = Some(result.clone());
        result
    }

    fn set_focus(&mut self, location: FocusLocation, sink: &mut dyn FocusSink) -> FocusLocation {
        let row_id = match location.zone {
            FocusZone::Table => self.table.row_at(location.row).map(|row| row.id),
            _ => None,
        };
        sink.focus(location.zone, row_id, &location.field_name);
        self.focus = location.clone();
        location
    }
}

fn focus_grid<'a>(
    layout: &'a VoucherLayout,
    header_values: &'a BTreeMap<String, String>,
    permissions: &PermissionSet,
) -> FocusGridController<'a> {
    let disabled: Vec<FooterAction> = layout
        .footer
        .iter()
        .filter(|spec| spec.requires.is_some_and(|p| !p.granted_by(permissions)))
        .map(|spec| spec.action)
        .collect();
    FocusGridController::new(layout, header_values).with_disabled_actions(disabled)
}

fn new_client_reference(layout: &VoucherLayout) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0);
    VoucherSubmissionRequest::generate_reference(layout.kind.as_str(), millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::voucher_layout::VoucherKind;
    use crate::backend::io::memory::{InMemoryVoucherApi, RecordingFocusSink};
    use shared::DenominationMap;

    fn session(kind: VoucherKind, total_amount: i64) -> VoucherSession {
        VoucherSession::new(
            Arc::new(VoucherLayout::for_kind(kind)),
            "C01",
            total_amount,
            PermissionSet::all(),
        )
    }

    fn ready_cash_tender(total_amount: i64) -> VoucherSession {
        let mut session = session(VoucherKind::CashTender, total_amount);
        session.set_header_field("tender_date", "2024-03-01").unwrap();
        session.set_header_field("counter", "1").unwrap();
        session
            .update_line_field(1, "amount", &total_amount.to_string())
            .unwrap();
        session
    }

    fn record(id: &str, fields: &[(&str, &str)]) -> ListRecord {
        ListRecord {
            id: id.to_string(),
            fields: fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_new_session_focuses_first_header_field() {
        let session = session(VoucherKind::PaymentVoucher, 500);
        assert_eq!(session.focus(), &FocusLocation::header(0, 0, "voucher_date"));
        assert_eq!(session.table().row_count(), 1);
        assert!(session.reconciliation().is_none());
    }

    #[test]
    fn test_handle_key_reports_focus_to_sink() {
        let mut session = session(VoucherKind::CashTender, 500);
        let mut sink = RecordingFocusSink::new();

        session.handle_key(NavKey::Tab, &mut sink);
        session.handle_key(NavKey::Enter, &mut sink);
        let location = session.handle_key(NavKey::Enter, &mut sink);

        assert_eq!(location, FocusLocation::table(0, 0, "amount"));
        let last = sink.last().unwrap();
        assert_eq!(last.zone, FocusZone::Table);
        assert_eq!(last.row_id, Some(1));
        assert_eq!(sink.events.len(), 3);
    }

    #[test]
    fn test_auto_issue_runs_on_collect_changes() {
        let mut session = session(VoucherKind::SalesReturn, 500);
        session
            .set_denomination_count(Denomination::R500, CountField::Collect, "1")
            .unwrap();
        session
            .set_denomination_count(Denomination::R100, CountField::Collect, "3")
            .unwrap();

        assert_eq!(session.ledger().total_issued(), 300);
        let reconciliation = session.reconciliation().unwrap().as_ref().unwrap();
        assert_eq!(reconciliation.settled_balance, 0);
    }

    #[test]
    fn test_invalid_count_keeps_previous_value() {
        let mut session = session(VoucherKind::SalesReturn, 500);
        session
            .set_denomination_count(Denomination::R50, CountField::Collect, "4")
            .unwrap();

        let err = session
            .set_denomination_count(Denomination::R50, CountField::Collect, "-2")
            .unwrap_err();

        assert!(matches!(err, ValidationError::InvalidCount { .. }));
        assert_eq!(session.ledger().record(Denomination::R50).collect(), 4);
    }

    #[test]
    fn test_stale_snapshot_is_dropped_after_reset() {
        let mut session = session(VoucherKind::CashTender, 500);
        let token = session.token();
        let snapshot = DrawerSnapshotResponse {
            counts: DenominationMap {
                r500: 3,
                ..Default::default()
            },
        };

        session.reset();

        assert!(!session.apply_drawer_snapshot(token, &snapshot));
        assert_eq!(session.ledger().total_available(), 0);

        assert!(session.apply_drawer_snapshot(session.token(), &snapshot));
        assert_eq!(session.ledger().total_available(), 1500);
    }

    #[test]
    fn test_submission_rejected_while_in_flight() {
        let mut session = ready_cash_tender(500);
        session
            .set_denomination_count(Denomination::R500, CountField::Collect, "1")
            .unwrap();

        let ticket = session.begin_submission().unwrap();
        assert!(session.is_submitting());
        assert_eq!(
            session.begin_submission().unwrap_err(),
            SessionError::SubmissionInFlight
        );

        let status = session.finish_submission(
            &ticket,
            Ok(VoucherSubmissionResponse {
                success: true,
                voucher_no: Some("V00042".to_string()),
                message: None,
            }),
        );
        assert_eq!(
            status,
            SubmissionStatus::Saved {
                voucher_no: Some("V00042".to_string())
            }
        );
        assert!(!session.is_submitting());
        assert_eq!(session.voucher_no(), Some("V00042"));
    }

    #[test]
    fn test_conflict_has_distinct_message_and_keeps_form() {
        let mut session = ready_cash_tender(500);
        session
            .set_denomination_count(Denomination::R500, CountField::Collect, "1")
            .unwrap();

        let ticket = session.begin_submission().unwrap();
        let status = session.finish_submission(&ticket, Err(RemoteError::AlreadyExists));
        assert_eq!(status, SubmissionStatus::AlreadyExists);
        assert_eq!(session.status_message(), Some("Voucher already exists"));

        let ticket = session.begin_submission().unwrap();
        let status = session.finish_submission(&ticket, Err(RemoteError::from_status(500, "")));
        assert_eq!(
            status,
            SubmissionStatus::Failed {
                message: "Request rejected (500): Unknown error".to_string()
            }
        );
        assert_ne!(session.status_message(), Some("Voucher already exists"));
        assert_eq!(session.ledger().total_collected(), 500);
        assert_eq!(session.table().row(1).unwrap().values()["amount"], "500");
    }

    #[test]
    fn test_result_after_reset_is_dropped() {
        let mut session = ready_cash_tender(500);
        session
            .set_denomination_count(Denomination::R500, CountField::Collect, "1")
            .unwrap();
        let ticket = session.begin_submission().unwrap();

        session.reset();
        let status = session.finish_submission(
            &ticket,
            Ok(VoucherSubmissionResponse {
                success: true,
                voucher_no: Some("V1".to_string()),
                message: None,
            }),
        );

        assert_eq!(status, SubmissionStatus::Dropped);
        assert_eq!(session.voucher_no(), None);
        assert!(!session.is_submitting());
    }

    #[test]
    fn test_submission_requires_header_rows_and_cash() {
        let mut session = session(VoucherKind::CashTender, 500);
        let err = session.begin_submission().unwrap_err();
        assert_eq!(
            err,
            SessionError::Validation(ValidationError::MissingRequiredField {
                field: "tender_date".to_string(),
                row: None
            })
        );

        session.set_header_field("tender_date", "2024-03-01").unwrap();
        session.set_header_field("counter", "2").unwrap();
        let err = session.begin_submission().unwrap_err();
        assert_eq!(
            err,
            SessionError::Validation(ValidationError::MissingRequiredField {
                field: "amount".to_string(),
                row: Some(1)
            })
        );

        session.update_line_field(1, "amount", "500").unwrap();
        session
            .set_denomination_count(Denomination::R200, CountField::Collect, "2")
            .unwrap();
        let err = session.begin_submission().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::AmountMismatch { .. })
        ));
        assert!(!session.is_submitting());
    }

    #[test]
    fn test_cash_payment_without_notes_is_a_mismatch() {
        let mut session = ready_cash_tender(500);
        assert!(session.has_cash_payment());

        let err = session.begin_submission().unwrap_err();
        assert_eq!(
            err,
            SessionError::Validation(ValidationError::AmountMismatch {
                expected: 500,
                actual: 0
            })
        );
        assert!(!session.is_submitting());
    }

    #[test]
    fn test_cheque_only_payment_skips_cash_check() {
        let mut session = ready_cash_tender(500);
        session.update_line_field(1, "payment_type", "Cheque").unwrap();
        session.update_line_field(1, "cheque_no", "004512").unwrap();
        assert!(!session.has_cash_payment());

        let ticket = session.begin_submission().unwrap();
        assert_eq!(ticket.request.line_items.len(), 1);
        let reconciliation = session.reconciliation().unwrap().as_ref().unwrap();
        assert_eq!(reconciliation.balance, -500);
    }

    #[test]
    fn test_layout_without_payment_field_always_pays_in_cash() {
        let mut session = session(VoucherKind::SalesReturn, 300);
        assert!(session.has_cash_payment());
        session
            .set_denomination_count(Denomination::R100, CountField::Collect, "2")
            .unwrap();
        assert!(session.reconciliation().unwrap().is_err());
    }

    #[test]
    fn test_missing_permission_blocks_save_and_delete_focus() {
        let layout = Arc::new(VoucherLayout::for_kind(VoucherKind::CashTender));
        let permissions = PermissionSet {
            add: false,
            edit: true,
            delete: false,
        };
        let mut session = VoucherSession::new(layout, "C01", 500, permissions);
        session.set_header_field("tender_date", "2024-03-01").unwrap();
        session.set_header_field("counter", "1").unwrap();
        session.update_line_field(1, "amount", "500").unwrap();

        assert_eq!(
            session.begin_submission().unwrap_err(),
            SessionError::PermissionDenied(Permission::Add)
        );

        let mut sink = RecordingFocusSink::new();
        session.focus_field("amount", Some(0), &mut sink).unwrap();
        session.handle_key(NavKey::Arrow(Direction::Down), &mut sink);
        session.handle_key(NavKey::Tab, &mut sink);
        let location = session.handle_key(NavKey::Tab, &mut sink);
        assert_eq!(location.field_name, "close");

        let mut editing = session.with_voucher_no("V7");
        editing
            .set_denomination_count(Denomination::R500, CountField::Collect, "1")
            .unwrap();
        assert!(editing.begin_submission().is_ok());
    }

    #[test]
    fn test_remove_row_keeps_focus_in_table() {
        let mut session = session(VoucherKind::SalesReturn, 0);
        let mut sink = RecordingFocusSink::new();
        let second = session.add_row();
        session.focus_field("item_name", Some(1), &mut sink).unwrap();

        session.remove_row(second).unwrap();

        assert_eq!(session.focus().row, 0);
        assert_eq!(session.table().row_count(), 1);
    }

    #[test]
    fn test_remove_row_requires_delete_permission() {
        let layout = Arc::new(VoucherLayout::for_kind(VoucherKind::SalesReturn));
        let permissions = PermissionSet {
            add: true,
            edit: true,
            delete: false,
        };
        let mut session = VoucherSession::new(layout, "C01", 0, permissions);
        let second = session.add_row();

        assert_eq!(
            session.remove_row(second).unwrap_err(),
            SessionError::PermissionDenied(Permission::Delete)
        );
        assert_eq!(session.table().row_count(), 2);
    }

    #[test]
    fn test_list_query_follows_focused_selector() {
        let mut session = session(VoucherKind::SalesReturn, 0);
        let mut sink = RecordingFocusSink::new();
        session.focus_field("item_code", Some(0), &mut sink).unwrap();

        let (kind, request) = session.list_query("  saree ").unwrap();
        assert_eq!(kind, ListKind::Item);
        assert_eq!(request.search, "saree");
        assert_eq!(request.after, None);

        session.focus_field("quantity", Some(0), &mut sink).unwrap();
        assert!(matches!(
            session.list_query("x").unwrap_err(),
            ValidationError::UnknownField { .. }
        ));
    }

    #[test]
    fn test_selection_fills_row_and_advances() {
        let mut session = session(VoucherKind::SalesReturn, 0);
        let mut sink = RecordingFocusSink::new();
        session.focus_field("item_code", Some(0), &mut sink).unwrap();

        let item = record(
            "i1",
            &[("code", "A100"), ("name", "Silk Saree"), ("rate", "1250")],
        );
        let next = session.apply_selection(&item, &mut sink).unwrap();

        let row = session.table().row(1).unwrap();
        assert_eq!(row.values()["item_code"], "A100");
        assert_eq!(row.values()["item_name"], "Silk Saree");
        assert_eq!(row.values()["rate"], "1250");
        assert_eq!(next.field_name, "item_name");
    }

    #[test]
    fn test_rejected_selection_restores_everything() {
        let mut layout = VoucherLayout::for_kind(VoucherKind::SalesReturn);
        layout
            .selectors
            .iter_mut()
            .filter(|selector| selector.field == "item_code")
            .for_each(|selector| {
                selector
                    .writes
                    .insert("alias".to_string(), "item_name".to_string());
            });
        let mut session = VoucherSession::new(Arc::new(layout), "C01", 0, PermissionSet::all());
        let mut sink = RecordingFocusSink::new();
        session.update_line_field(1, "item_code", "A100").unwrap();
        let second = session.add_row();
        session.update_line_field(second, "item_name", "Typed by hand").unwrap();
        session.focus_field("item_code", Some(1), &mut sink).unwrap();

        // "alias" is written before "code", so the row is half-updated when the
        // duplicate code is rejected
        let duplicate = record("i1", &[("alias", "Silk Saree"), ("code", "a100")]);
        let err = session.apply_selection(&duplicate, &mut sink).unwrap_err();

        assert!(matches!(err, ValidationError::DuplicateKey { .. }));
        let row = session.table().row(second).unwrap();
        assert_eq!(row.values()["item_name"], "Typed by hand");
        assert_eq!(row.values()["item_code"], "");
        assert_eq!(session.focus().field_name, "item_code");
    }

    #[test]
    fn test_selection_on_field_without_selector_fails() {
        let mut session = session(VoucherKind::SalesReturn, 0);
        let mut sink = RecordingFocusSink::new();
        session.focus_field("quantity", Some(0), &mut sink).unwrap();

        let err = session
            .apply_selection(&record("x", &[("name", "x")]), &mut sink)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownField {
                field: "quantity".to_string()
            }
        );
    }

    #[test]
    fn test_load_source_rows_are_read_only() {
        let mut session = session(VoucherKind::SalesReturn, 0);
        let mut values = BTreeMap::new();
        values.insert("item_code".to_string(), "B7".to_string());
        values.insert("item_name".to_string(), "Wool Shawl".to_string());
        let ids = session.load_source_rows(&[LineItemDto {
            sequence: 1,
            values,
            read_only: true,
        }]);

        assert_eq!(ids.len(), 1);
        let err = session.update_line_field(ids[0], "item_name", "Other").unwrap_err();
        assert!(matches!(err, ValidationError::ReadOnlyField { .. }));
        assert!(session.update_line_field(ids[0], "quantity", "2").is_ok());
    }

    #[tokio::test]
    async fn test_open_and_submit_through_api() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let api = InMemoryVoucherApi::new().with_snapshot(
            date,
            DenominationMap {
                r100: 10,
                ..Default::default()
            },
        );
        let mut session = ready_cash_tender(500);

        assert!(session.open_for_edit(&api, date).await.unwrap());
        assert_eq!(session.ledger().total_available(), 1000);

        session
            .set_denomination_count(Denomination::R500, CountField::Collect, "2")
            .unwrap();
        let status = session.submit(&api).await.unwrap();

        assert_eq!(
            status,
            SubmissionStatus::Saved {
                voucher_no: Some("V00001".to_string())
            }
        );
        let submitted = api.submissions();
        assert_eq!(submitted[0].collect.r500, 2);
        assert_eq!(submitted[0].issue.r500, 1);

        let again = session.submit(&api).await.unwrap();
        assert_eq!(again, SubmissionStatus::AlreadyExists);
    }
}

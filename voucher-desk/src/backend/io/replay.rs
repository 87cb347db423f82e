//! Scripted voucher sessions.
//!
//! A replay script names a voucher kind and total, then lists the
//! keystrokes, field edits and note counts an operator would enter. The
//! runner feeds them through a [`VoucherSession`] and reports where focus
//! lands and how reconciliation and submission turn out.
//!
//! ```yaml
//! voucher: CashTender
//! total_amount: 500
//! steps:
//!   - step: header
//!     field: tender_date
//!     value: "2024-03-01"
//!   - step: key
//!     key: enter
//!   - step: count
//!     denomination: 500
//!     field: collect
//!     value: "1"
//!   - step: submit
//! ```
//!
//! A `search` step looks the query up in the focused field's popup list
//! (seeded from the script's `lists`) and picks one of the results.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use shared::{DenominationMap, LineItemDto, ListRecord};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::backend::domain::models::{
    CountField, Denomination, Direction, FocusLocation, NavKey, ValidationError,
};
use crate::backend::domain::voucher_layout::{ListKind, VoucherKind};
use crate::backend::domain::voucher_session::{SubmissionStatus, VoucherSession};
use crate::backend::io::collaborators::{ListSelector, PermissionProvider, VoucherApi};
use crate::backend::io::memory::{InMemoryListSelector, InMemoryVoucherApi, RecordingFocusSink};
use crate::backend::storage::DeskConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub voucher: VoucherKind,
    pub total_amount: i64,
    /// Existing voucher being edited
    #[serde(default)]
    pub voucher_no: Option<String>,
    /// Business date; when set the drawer snapshot for it is fetched first
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Drawer counts the in-memory service reports for `date`
    #[serde(default)]
    pub drawer: Option<DenominationMap>,
    /// Records the popup lists offer to `search` steps
    #[serde(default)]
    pub lists: BTreeMap<ListKind, Vec<ListRecord>>,
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        Self::from_yaml(&yaml).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Voucher service that reports the script's drawer for its date
    pub fn voucher_api(&self) -> InMemoryVoucherApi {
        match (self.date, self.drawer) {
            (Some(date), Some(drawer)) => InMemoryVoucherApi::new().with_snapshot(date, drawer),
            _ => InMemoryVoucherApi::new(),
        }
    }

    pub fn list_selector(&self) -> InMemoryListSelector {
        self.lists
            .iter()
            .fold(InMemoryListSelector::new(), |selector, (kind, records)| {
                selector.with_records(*kind, records.clone())
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayKey {
    Enter,
    Tab,
    BackTab,
    Up,
    Down,
    Left,
    Right,
}

impl From<ReplayKey> for NavKey {
    fn from(key: ReplayKey) -> Self {
        match key {
            ReplayKey::Enter => NavKey::Enter,
            ReplayKey::Tab => NavKey::Tab,
            ReplayKey::BackTab => NavKey::BackTab,
            ReplayKey::Up => NavKey::Arrow(Direction::Up),
            ReplayKey::Down => NavKey::Arrow(Direction::Down),
            ReplayKey::Left => NavKey::Arrow(Direction::Left),
            ReplayKey::Right => NavKey::Arrow(Direction::Right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ReplayStep {
    Key {
        key: ReplayKey,
        #[serde(default = "one")]
        times: usize,
    },
    Focus {
        field: String,
        #[serde(default)]
        row: Option<usize>,
    },
    Header {
        field: String,
        value: String,
    },
    /// Edit a line item by row id
    Edit {
        row: u64,
        field: String,
        value: String,
    },
    AddRow,
    RemoveRow {
        row: u64,
    },
    SourceRows {
        rows: Vec<LineItemDto>,
    },
    Count {
        denomination: u32,
        field: CountField,
        value: String,
    },
    Select {
        record: ListRecord,
    },
    /// Search the focused field's list and apply the `pick`th result
    Search {
        #[serde(default)]
        query: String,
        #[serde(default)]
        pick: usize,
    },
    Submit,
    Reset,
}

fn one() -> usize {
    1
}

/// What the console prints, one JSON line each
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Drawer {
        applied: bool,
        total_available: i64,
    },
    Focus {
        step: usize,
        location: FocusLocation,
    },
    Row {
        step: usize,
        id: u64,
    },
    Rejected {
        step: usize,
        error: String,
    },
    Page {
        step: usize,
        list: ListKind,
        records: usize,
        has_more: bool,
    },
    Submission {
        step: usize,
        #[serde(flatten)]
        status: SubmissionStatus,
    },
    Reconciled {
        total_collected: i64,
        total_issued: i64,
        balance: i64,
        settled_balance: i64,
        summary: String,
    },
    Mismatch {
        error: String,
    },
}

/// Build a session for `script` and replay every step.
///
/// Input the session rejects is reported as a `Rejected` event and the replay
/// carries on; only malformed scripts and remote failures during opening end
/// it early.
pub async fn run_script(
    script: &ReplayScript,
    config: &DeskConfig,
    api: &dyn VoucherApi,
    lists: &dyn ListSelector,
    permissions: &dyn PermissionProvider,
) -> Result<Vec<ReplayEvent>> {
    let layout = Arc::new(config.layout(script.voucher));
    let mut session = VoucherSession::open(layout, config.company_id.clone(), script.total_amount, permissions);
    if let Some(voucher_no) = &script.voucher_no {
        session = session.with_voucher_no(voucher_no.clone());
    }

    let mut events = Vec::new();
    if let Some(date) = script.date {
        let applied = session.open_for_edit(api, date).await?;
        events.push(ReplayEvent::Drawer {
            applied,
            total_available: session.ledger().total_available(),
        });
    }

    let mut sink = RecordingFocusSink::new();
    for (index, step) in script.steps.iter().enumerate() {
        let number = index + 1;
        debug!("Replaying step {}: {:?}", number, step);
        match step {
            ReplayStep::Key { key, times } => {
                for _ in 0..*times {
                    let location = session.handle_key((*key).into(), &mut sink);
                    events.push(ReplayEvent::Focus { step: number, location });
                }
            }
            ReplayStep::Focus { field, row } => {
                let result = session.focus_field(field, *row, &mut sink);
                push_focus(&mut events, number, result);
            }
            ReplayStep::Header { field, value } => {
                let result = session.set_header_field(field, value);
                push_rejection(&mut events, number, result);
            }
            ReplayStep::Edit { row, field, value } => {
                let result = session.update_line_field(*row, field, value);
                push_rejection(&mut events, number, result);
            }
            ReplayStep::AddRow => {
                let id = session.add_row();
                events.push(ReplayEvent::Row { step: number, id });
            }
            ReplayStep::RemoveRow { row } => {
                let result = session.remove_row(*row);
                push_rejection(&mut events, number, result);
            }
            ReplayStep::SourceRows { rows } => {
                for id in session.load_source_rows(rows) {
                    events.push(ReplayEvent::Row { step: number, id });
                }
            }
            ReplayStep::Count {
                denomination,
                field,
                value,
            } => {
                let denomination = Denomination::from_value(*denomination)
                    .ok_or_else(|| anyhow!("Step {}: {} is not a denomination", number, denomination))?;
                let result = session.set_denomination_count(denomination, *field, value);
                push_rejection(&mut events, number, result);
            }
            ReplayStep::Select { record } => {
                let result = session.apply_selection(record, &mut sink);
                push_focus(&mut events, number, result);
            }
            ReplayStep::Search { query, pick } => {
                let (list, request) = match session.list_query(query) {
                    Ok(found) => found,
                    Err(err) => {
                        push_rejection(&mut events, number, Err(err));
                        continue;
                    }
                };
                let page = match lists.fetch_page(list, request).await {
                    Ok(page) => page,
                    Err(err) => {
                        push_rejection(&mut events, number, Err(err));
                        continue;
                    }
                };
                events.push(ReplayEvent::Page {
                    step: number,
                    list,
                    records: page.records.len(),
                    has_more: page.pagination.has_more,
                });
                match page.records.get(*pick) {
                    Some(record) => {
                        let result = session.apply_selection(record, &mut sink);
                        push_focus(&mut events, number, result);
                    }
                    None => push_rejection(
                        &mut events,
                        number,
                        Err(format!("No {:?} record matches '{}' at position {}", list, query, pick)),
                    ),
                }
            }
            ReplayStep::Submit => match session.submit(api).await {
                Ok(status) => events.push(ReplayEvent::Submission { step: number, status }),
                Err(err) => events.push(ReplayEvent::Rejected {
                    step: number,
                    error: err.to_string(),
                }),
            },
            ReplayStep::Reset => session.reset(),
        }
    }

    match session.reconciliation() {
        Some(Ok(reconciliation)) => events.push(ReplayEvent::Reconciled {
            total_collected: reconciliation.total_collected,
            total_issued: reconciliation.total_issued,
            balance: reconciliation.balance,
            settled_balance: reconciliation.settled_balance,
            summary: format!(
                "collected {} issued {} against {}",
                config.format_amount(reconciliation.total_collected),
                config.format_amount(reconciliation.total_issued),
                config.format_amount(session.context().total_amount)
            ),
        }),
        Some(Err(err)) => events.push(ReplayEvent::Mismatch { error: err.to_string() }),
        None => {}
    }

    Ok(events)
}

fn push_focus(events: &mut Vec<ReplayEvent>, step: usize, result: Result<FocusLocation, ValidationError>) {
    match result {
        Ok(location) => events.push(ReplayEvent::Focus { step, location }),
        Err(err) => push_rejection(events, step, Err(err)),
    }
}

fn push_rejection<E: fmt::Display>(events: &mut Vec<ReplayEvent>, step: usize, result: Result<(), E>) {
    if let Err(err) = result {
        warn!("Step {} rejected: {}", step, err);
        events.push(ReplayEvent::Rejected {
            step,
            error: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::FocusZone;
    use crate::backend::io::memory::StaticPermissions;
    use shared::PermissionSet;

    const CASH_TENDER: &str = r#"
voucher: CashTender
total_amount: 500
date: 2024-03-01
drawer:
  r100: 10
steps:
  - step: header
    field: tender_date
    value: "2024-03-01"
  - step: header
    field: counter
    value: "1"
  - step: key
    key: tab
    times: 3
  - step: edit
    row: 1
    field: amount
    value: "500"
  - step: count
    denomination: 500
    field: collect
    value: "2"
  - step: count
    denomination: 100
    field: collect
    value: "-1"
  - step: submit
"#;

    const ITEM_SEARCH: &str = r#"
voucher: SalesReturn
total_amount: 0
lists:
  item:
    - id: i1
      fields: { code: A100, name: Silk Saree, rate: "1250" }
    - id: i2
      fields: { code: B200, name: Wool Shawl, rate: "800" }
steps:
  - step: focus
    field: item_code
    row: 0
  - step: search
    query: shawl
  - step: focus
    field: item_code
    row: 0
  - step: search
    query: saree
    pick: 3
  - step: remove_row
    row: 1
"#;

    async fn replay(script: &ReplayScript, permissions: PermissionSet) -> Vec<ReplayEvent> {
        let api = script.voucher_api();
        let lists = script.list_selector();
        let permissions = StaticPermissions::new(permissions);
        run_script(script, &DeskConfig::default(), &api, &lists, &permissions)
            .await
            .unwrap()
    }

    #[test]
    fn test_script_parses_steps() {
        let script = ReplayScript::from_yaml(CASH_TENDER).unwrap();
        assert_eq!(script.voucher, VoucherKind::CashTender);
        assert_eq!(script.steps.len(), 7);
        assert_eq!(
            script.steps[2],
            ReplayStep::Key {
                key: ReplayKey::Tab,
                times: 3
            }
        );
        assert_eq!(script.drawer.unwrap().r100, 10);
    }

    #[tokio::test]
    async fn test_replay_reports_focus_rejections_and_submission() {
        let script = ReplayScript::from_yaml(CASH_TENDER).unwrap();
        let api = script.voucher_api();
        let lists = script.list_selector();
        let permissions = StaticPermissions::new(PermissionSet::all());

        let events = run_script(&script, &DeskConfig::default(), &api, &lists, &permissions)
            .await
            .unwrap();

        assert_eq!(
            events[0],
            ReplayEvent::Drawer {
                applied: true,
                total_available: 1000
            }
        );
        let focus: Vec<&FocusLocation> = events
            .iter()
            .filter_map(|event| match event {
                ReplayEvent::Focus { location, .. } => Some(location),
                _ => None,
            })
            .collect();
        assert_eq!(focus.len(), 3);
        assert_eq!(focus[2].zone, FocusZone::Table);
        assert_eq!(focus[2].field_name, "amount");

        assert!(events
            .iter()
            .any(|event| matches!(event, ReplayEvent::Rejected { step: 6, .. })));
        assert!(events.iter().any(|event| matches!(
            event,
            ReplayEvent::Submission {
                status: SubmissionStatus::Saved { .. },
                ..
            }
        )));
        assert_eq!(
            events.last(),
            Some(&ReplayEvent::Reconciled {
                total_collected: 1000,
                total_issued: 500,
                balance: 500,
                settled_balance: 0,
                summary: "collected ₹1000 issued ₹500 against ₹500".to_string()
            })
        );
        assert_eq!(api.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_search_step_applies_picked_record() {
        let script = ReplayScript::from_yaml(ITEM_SEARCH).unwrap();
        assert_eq!(script.lists[&ListKind::Item].len(), 2);

        let events = replay(&script, PermissionSet::all()).await;

        assert_eq!(
            events[1],
            ReplayEvent::Page {
                step: 2,
                list: ListKind::Item,
                records: 1,
                has_more: false
            }
        );
        match &events[2] {
            ReplayEvent::Focus { step: 2, location } => assert_eq!(location.field_name, "item_name"),
            other => panic!("expected focus after selection, got {:?}", other),
        }
        assert_eq!(
            events[4],
            ReplayEvent::Page {
                step: 4,
                list: ListKind::Item,
                records: 1,
                has_more: false
            }
        );
        assert!(matches!(&events[5], ReplayEvent::Rejected { step: 4, error } if error.contains("position 3")));
        assert_eq!(events.len(), 6);
    }

    #[tokio::test]
    async fn test_remove_row_without_delete_permission_is_rejected() {
        let script = ReplayScript::from_yaml(ITEM_SEARCH).unwrap();
        let permissions = PermissionSet {
            add: true,
            edit: true,
            delete: false,
        };

        let events = replay(&script, permissions).await;

        assert!(matches!(
            events.last(),
            Some(ReplayEvent::Rejected { step: 5, error }) if error.contains("permission to delete")
        ));
    }

    #[tokio::test]
    async fn test_unknown_denomination_ends_replay() {
        let script = ReplayScript::from_yaml(
            "voucher: SalesReturn\ntotal_amount: 100\nsteps:\n  - step: count\n    denomination: 25\n    field: collect\n    value: \"1\"\n",
        )
        .unwrap();
        let api = script.voucher_api();
        let lists = script.list_selector();
        let permissions = StaticPermissions::new(PermissionSet::all());

        let err = run_script(&script, &DeskConfig::default(), &api, &lists, &permissions)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("25 is not a denomination"));
    }

    #[test]
    fn test_events_serialize_as_tagged_json() {
        let event = ReplayEvent::Submission {
            step: 4,
            status: SubmissionStatus::AlreadyExists,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event":"submission","step":4,"status":"already_exists"}"#
        );
    }
}

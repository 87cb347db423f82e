//! Per-voucher-type configuration.
//!
//! Every voucher screen (payment voucher, sales return, purchase return,
//! cash tender) shares one navigation and reconciliation engine. What differs
//! between them is captured here: header fields, table columns and their
//! roles, skip rules, the required and unique columns, the footer action bar,
//! the reconciliation rule and whether change is issued automatically.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::backend::domain::models::{FieldValues, Permission};
use crate::backend::domain::reconciliation::ReconciliationRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoucherKind {
    PaymentVoucher,
    SalesReturn,
    PurchaseReturn,
    CashTender,
}

impl VoucherKind {
    pub const ALL: [VoucherKind; 4] = [
        VoucherKind::PaymentVoucher,
        VoucherKind::SalesReturn,
        VoucherKind::PurchaseReturn,
        VoucherKind::CashTender,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherKind::PaymentVoucher => "PaymentVoucher",
            VoucherKind::SalesReturn => "SalesReturn",
            VoucherKind::PurchaseReturn => "PurchaseReturn",
            VoucherKind::CashTender => "CashTender",
        }
    }
}

impl fmt::Display for VoucherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When a field is passed over by keyboard navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum SkipRule {
    Always,
    /// Skip unless `field` holds `value` (e.g. cheque number unless paying by cheque)
    UnlessEquals { field: String, value: String },
    WhenEquals { field: String, value: String },
    WhenBlank { field: String },
}

impl SkipRule {
    pub fn applies(&self, values: &dyn FieldValues) -> bool {
        match self {
            SkipRule::Always => true,
            SkipRule::UnlessEquals { field, value } => !equals_ignore_case(values.value(field), value),
            SkipRule::WhenEquals { field, value } => equals_ignore_case(values.value(field), value),
            SkipRule::WhenBlank { field } => values.value(field).trim().is_empty(),
        }
    }
}

fn equals_ignore_case(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}

/// The header field or column that says a payment is made in cash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashPaymentSpec {
    pub field: String,
    #[serde(default = "default_cash_value")]
    pub value: String,
}

fn default_cash_value() -> String {
    "Cash".to_string()
}

impl CashPaymentSpec {
    pub fn matches(&self, actual: &str) -> bool {
        equals_ignore_case(actual, &self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFieldSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub skip: Option<SkipRule>,
}

/// What a table column means to the row recalculation rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    #[default]
    Text,
    Quantity,
    Weight,
    AverageWeight,
    Unit,
    Rate,
    Cost,
    Mrp,
    ProfitPercent,
    SaleRate,
    Amount,
}

impl ColumnRole {
    /// Columns whose input must parse as a number
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnRole::Quantity
                | ColumnRole::Weight
                | ColumnRole::AverageWeight
                | ColumnRole::Rate
                | ColumnRole::Cost
                | ColumnRole::Mrp
                | ColumnRole::ProfitPercent
                | ColumnRole::SaleRate
                | ColumnRole::Amount
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default)]
    pub role: ColumnRole,
    /// Value a blank row starts with
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub skip: Option<SkipRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FooterAction {
    Save,
    Clear,
    Delete,
    Print,
    Close,
}

impl FooterAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FooterAction::Save => "save",
            FooterAction::Clear => "clear",
            FooterAction::Delete => "delete",
            FooterAction::Print => "print",
            FooterAction::Close => "close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterActionSpec {
    pub action: FooterAction,
    #[serde(default)]
    pub requires: Option<Permission>,
}

/// Popup list collaborators a field can open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Party,
    Account,
    Item,
    Bill,
}

/// A list selector attached to a field; `writes` maps record keys to the
/// header or column names they fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub field: String,
    pub kind: ListKind,
    pub writes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherLayout {
    pub kind: VoucherKind,
    pub title: String,
    pub rule: ReconciliationRule,
    /// Hand back change automatically when the collection exceeds the total
    #[serde(default)]
    pub auto_issue: bool,
    /// Header fields, one inner list per visual row
    pub header: Vec<Vec<HeaderFieldSpec>>,
    pub columns: Vec<ColumnSpec>,
    /// A row is incomplete until this column is filled
    pub required_column: String,
    #[serde(default)]
    pub unique_column: Option<String>,
    /// Where Up from the first table row lands, by column name
    #[serde(default)]
    pub column_header_map: BTreeMap<String, String>,
    pub footer: Vec<FooterActionSpec>,
    #[serde(default = "default_terminal_action")]
    pub terminal_action: FooterAction,
    #[serde(default)]
    pub markup_percent: f64,
    #[serde(default)]
    pub selectors: Vec<SelectorSpec>,
    /// Where the payment mode is entered; without one every payment is cash
    #[serde(default)]
    pub cash_payment: Option<CashPaymentSpec>,
}

fn default_terminal_action() -> FooterAction {
    FooterAction::Save
}

impl VoucherLayout {
    /// Built-in layouts for every voucher kind
    pub fn defaults() -> Vec<VoucherLayout> {
        VoucherKind::ALL.into_iter().map(Self::for_kind).collect()
    }

    pub fn for_kind(kind: VoucherKind) -> VoucherLayout {
        match kind {
            VoucherKind::PaymentVoucher => Self::payment_voucher(),
            VoucherKind::SalesReturn => Self::sales_return(),
            VoucherKind::PurchaseReturn => Self::purchase_return(),
            VoucherKind::CashTender => Self::cash_tender(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// First column playing `role`, if the layout has one
    pub fn column_for_role(&self, role: ColumnRole) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.role == role)
    }

    pub fn header_fields(&self) -> impl Iterator<Item = &HeaderFieldSpec> {
        self.header.iter().flatten()
    }

    /// (row, field) position of a header field
    pub fn header_position(&self, name: &str) -> Option<(usize, usize)> {
        self.header.iter().enumerate().find_map(|(row, fields)| {
            fields
                .iter()
                .position(|f| f.name == name)
                .map(|field| (row, field))
        })
    }

    pub fn footer_index(&self, action: FooterAction) -> Option<usize> {
        self.footer.iter().position(|f| f.action == action)
    }

    pub fn selector_for(&self, field: &str) -> Option<&SelectorSpec> {
        self.selectors.iter().find(|s| s.field == field)
    }

    /// Blank row values
    pub fn blank_row(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.default.clone()))
            .collect()
    }

    /// Check the layout is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.header_fields().next().is_none() {
            bail!("{} layout has no header fields", self.kind);
        }
        if self.header.iter().any(|row| row.is_empty()) {
            bail!("{} layout has an empty header row", self.kind);
        }
        if self.columns.is_empty() {
            bail!("{} layout has no table columns", self.kind);
        }

        let mut column_names = BTreeSet::new();
        for column in &self.columns {
            if !column_names.insert(column.name.as_str()) {
                bail!("{} layout repeats column {}", self.kind, column.name);
            }
        }
        let mut header_names = BTreeSet::new();
        for field in self.header_fields() {
            if column_names.contains(field.name.as_str()) || !header_names.insert(field.name.as_str()) {
                bail!("{} layout reuses field name {}", self.kind, field.name);
            }
        }

        if self.column(&self.required_column).is_none() {
            bail!(
                "{} layout requires unknown column {}",
                self.kind,
                self.required_column
            );
        }
        if let Some(unique) = &self.unique_column {
            if self.column(unique).is_none() {
                bail!("{} layout has unknown unique column {}", self.kind, unique);
            }
        }
        if self.footer_index(self.terminal_action).is_none() {
            bail!(
                "{} layout footer lacks terminal action {}",
                self.kind,
                self.terminal_action.as_str()
            );
        }
        for (column, header) in &self.column_header_map {
            if self.column(column).is_none() || self.header_position(header).is_none() {
                bail!(
                    "{} layout maps {} to {} but one of them does not exist",
                    self.kind,
                    column,
                    header
                );
            }
        }
        if let Some(cash) = &self.cash_payment {
            if self.column(&cash.field).is_none() && self.header_position(&cash.field).is_none() {
                bail!("{} layout reads cash payments from unknown field {}", self.kind, cash.field);
            }
        }
        for selector in &self.selectors {
            let known = |name: &str| self.column(name).is_some() || self.header_position(name).is_some();
            if !known(&selector.field) {
                bail!("{} layout has a selector on unknown field {}", self.kind, selector.field);
            }
            if let Some(target) = selector.writes.values().find(|target| !known(target)) {
                bail!("{} layout selector writes unknown field {}", self.kind, target);
            }
        }
        Ok(())
    }

    fn payment_voucher() -> VoucherLayout {
        VoucherLayout {
            kind: VoucherKind::PaymentVoucher,
            title: "Payment Voucher".to_string(),
            rule: ReconciliationRule::Py,
            auto_issue: false,
            header: vec![
                vec![header("voucher_date", true), header("payment_mode", true)],
                vec![header("party_name", true), header("narration", false)],
            ],
            columns: vec![
                column("account_name", ColumnRole::Text, ""),
                column("bill_no", ColumnRole::Text, ""),
                column("amount", ColumnRole::Amount, ""),
                column("payment_type", ColumnRole::Text, "Cash"),
                ColumnSpec {
                    skip: Some(SkipRule::UnlessEquals {
                        field: "payment_type".to_string(),
                        value: "Cheque".to_string(),
                    }),
                    ..column("cheque_no", ColumnRole::Text, "")
                },
                column("remarks", ColumnRole::Text, ""),
            ],
            required_column: "account_name".to_string(),
            unique_column: None,
            column_header_map: mapping(&[
                ("account_name", "party_name"),
                ("bill_no", "party_name"),
                ("amount", "narration"),
                ("payment_type", "payment_mode"),
                ("cheque_no", "payment_mode"),
                ("remarks", "narration"),
            ]),
            footer: standard_footer(),
            terminal_action: FooterAction::Save,
            markup_percent: 0.0,
            selectors: vec![
                selector("party_name", ListKind::Party, &[("name", "party_name")]),
                selector("account_name", ListKind::Account, &[("name", "account_name")]),
                selector(
                    "bill_no",
                    ListKind::Bill,
                    &[("bill_no", "bill_no"), ("balance", "amount")],
                ),
            ],
            cash_payment: Some(cash_column("payment_type")),
        }
    }

    fn sales_return() -> VoucherLayout {
        VoucherLayout {
            kind: VoucherKind::SalesReturn,
            title: "Sales Return".to_string(),
            rule: ReconciliationRule::Standard,
            auto_issue: true,
            header: vec![
                vec![header("return_date", true), header("bill_no", false)],
                vec![header("customer_name", true), header("salesman", false)],
            ],
            columns: vec![
                column("item_code", ColumnRole::Text, ""),
                column("item_name", ColumnRole::Text, ""),
                column("quantity", ColumnRole::Quantity, ""),
                column("weight", ColumnRole::Weight, ""),
                derived("avg_weight", ColumnRole::AverageWeight),
                column("rate", ColumnRole::Rate, ""),
                derived("amount", ColumnRole::Cost),
            ],
            required_column: "item_name".to_string(),
            unique_column: Some("item_code".to_string()),
            column_header_map: mapping(&[
                ("item_code", "customer_name"),
                ("item_name", "customer_name"),
                ("quantity", "salesman"),
                ("weight", "salesman"),
                ("rate", "salesman"),
            ]),
            footer: standard_footer(),
            terminal_action: FooterAction::Save,
            markup_percent: 0.0,
            selectors: vec![
                selector("customer_name", ListKind::Party, &[("name", "customer_name")]),
                selector(
                    "item_code",
                    ListKind::Item,
                    &[("code", "item_code"), ("name", "item_name"), ("rate", "rate")],
                ),
            ],
            cash_payment: None,
        }
    }

    fn purchase_return() -> VoucherLayout {
        VoucherLayout {
            kind: VoucherKind::PurchaseReturn,
            title: "Purchase Return".to_string(),
            rule: ReconciliationRule::Standard,
            auto_issue: false,
            header: vec![
                vec![header("return_date", true), header("supplier_bill_no", false)],
                vec![header("supplier_name", true)],
            ],
            columns: vec![
                column("item_code", ColumnRole::Text, ""),
                column("item_name", ColumnRole::Text, ""),
                column("unit", ColumnRole::Unit, "PCS"),
                column("quantity", ColumnRole::Quantity, ""),
                column("weight", ColumnRole::Weight, ""),
                derived("avg_weight", ColumnRole::AverageWeight),
                column("rate", ColumnRole::Rate, ""),
                derived("cost", ColumnRole::Cost),
                column("mrp", ColumnRole::Mrp, ""),
                derived("profit_percent", ColumnRole::ProfitPercent),
                derived("sale_rate", ColumnRole::SaleRate),
            ],
            required_column: "item_name".to_string(),
            unique_column: Some("item_code".to_string()),
            column_header_map: mapping(&[
                ("item_code", "supplier_name"),
                ("item_name", "supplier_name"),
                ("unit", "supplier_name"),
                ("quantity", "supplier_name"),
                ("weight", "supplier_name"),
                ("rate", "supplier_name"),
                ("mrp", "supplier_name"),
            ]),
            footer: standard_footer(),
            terminal_action: FooterAction::Save,
            markup_percent: 20.0,
            selectors: vec![
                selector("supplier_name", ListKind::Party, &[("name", "supplier_name")]),
                selector(
                    "item_code",
                    ListKind::Item,
                    &[("code", "item_code"), ("name", "item_name"), ("unit", "unit")],
                ),
            ],
            cash_payment: None,
        }
    }

    fn cash_tender() -> VoucherLayout {
        VoucherLayout {
            kind: VoucherKind::CashTender,
            title: "Cash Tender".to_string(),
            rule: ReconciliationRule::Standard,
            auto_issue: true,
            header: vec![
                vec![header("tender_date", true), header("counter", true)],
                vec![header("customer_name", false)],
            ],
            columns: vec![
                column("amount", ColumnRole::Amount, ""),
                column("payment_type", ColumnRole::Text, "Cash"),
                ColumnSpec {
                    skip: Some(SkipRule::UnlessEquals {
                        field: "payment_type".to_string(),
                        value: "Cheque".to_string(),
                    }),
                    ..column("cheque_no", ColumnRole::Text, "")
                },
            ],
            required_column: "amount".to_string(),
            unique_column: None,
            column_header_map: mapping(&[
                ("amount", "customer_name"),
                ("payment_type", "customer_name"),
                ("cheque_no", "customer_name"),
            ]),
            footer: standard_footer(),
            terminal_action: FooterAction::Save,
            markup_percent: 0.0,
            selectors: vec![selector(
                "customer_name",
                ListKind::Party,
                &[("name", "customer_name")],
            )],
            cash_payment: Some(cash_column("payment_type")),
        }
    }
}

fn header(name: &str, required: bool) -> HeaderFieldSpec {
    HeaderFieldSpec {
        name: name.to_string(),
        required,
        skip: None,
    }
}

fn column(name: &str, role: ColumnRole, default: &str) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        role,
        default: default.to_string(),
        skip: None,
    }
}

/// Computed column the cursor never stops on
fn derived(name: &str, role: ColumnRole) -> ColumnSpec {
    ColumnSpec {
        skip: Some(SkipRule::Always),
        ..column(name, role, "")
    }
}

fn cash_column(name: &str) -> CashPaymentSpec {
    CashPaymentSpec {
        field: name.to_string(),
        value: default_cash_value(),
    }
}

fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(column, header)| (column.to_string(), header.to_string()))
        .collect()
}

fn selector(field: &str, kind: ListKind, writes: &[(&str, &str)]) -> SelectorSpec {
    SelectorSpec {
        field: field.to_string(),
        kind,
        writes: mapping(writes),
    }
}

fn standard_footer() -> Vec<FooterActionSpec> {
    vec![
        FooterActionSpec {
            action: FooterAction::Save,
            requires: None,
        },
        FooterActionSpec {
            action: FooterAction::Clear,
            requires: None,
        },
        FooterActionSpec {
            action: FooterAction::Delete,
            requires: Some(Permission::Delete),
        },
        FooterActionSpec {
            action: FooterAction::Close,
            requires: None,
        },
    ]
}

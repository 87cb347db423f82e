//! Line-item table for one voucher.
//!
//! ## Business Rules
//!
//! - The table always holds at least one row; deleting the last row blanks it
//! - Row ids are `max + 1` and never reused, even after deletions
//! - Sequence numbers stay contiguous from 1 after every insert or delete
//! - Field recalculation only reads the row being edited
//! - A duplicate value in the unique column is rejected and the previous
//!   value kept
//! - Rows copied from a source document only accept quantity edits

use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::domain::models::{FieldValues, LineItem, ValidationError};
use crate::backend::domain::voucher_layout::{ColumnRole, VoucherLayout};

/// Units priced by weight rather than by piece
const WEIGHT_UNITS: [&str; 5] = ["KG", "KGS", "GM", "GMS", "WT"];

#[derive(Debug, Clone)]
pub struct LineItemTable {
    layout: Arc<VoucherLayout>,
    rows: Vec<LineItem>,
    /// Highest id ever handed out
    last_id: u64,
}

impl LineItemTable {
    /// A table holding a single blank row
    pub fn new(layout: Arc<VoucherLayout>) -> Self {
        let mut table = Self {
            layout,
            rows: Vec::new(),
            last_id: 0,
        };
        table.add_row();
        table
    }

    pub fn layout(&self) -> &VoucherLayout {
        &self.layout
    }

    /// Append a blank row and return its id
    pub fn add_row(&mut self) -> u64 {
        let id = self.next_id();
        self.rows.push(LineItem::new(id, self.layout.blank_row(), false));
        self.renumber();
        debug!("Added line item {} ({} rows)", id, self.rows.len());
        id
    }

    /// Remove a row; the sole remaining row is blanked instead
    pub fn remove_row(&mut self, id: u64) -> Result<(), ValidationError> {
        let index = self.index_of(id).ok_or(ValidationError::UnknownRow { id })?;

        if self.rows.len() == 1 {
            let row = &mut self.rows[index];
            row.replace_values(self.layout.blank_row());
            row.read_only = false;
            debug!("Blanked sole line item {}", id);
        } else {
            self.rows.remove(index);
            debug!("Removed line item {} ({} rows left)", id, self.rows.len());
        }

        self.renumber();
        Ok(())
    }

    /// Set one field and recompute the fields derived from it.
    ///
    /// Rejected edits leave the row exactly as it was.
    pub fn update_field(&mut self, id: u64, field: &str, value: &str) -> Result<(), ValidationError> {
        let column = self
            .layout
            .column(field)
            .ok_or_else(|| ValidationError::UnknownField {
                field: field.to_string(),
            })?;
        let index = self.index_of(id).ok_or(ValidationError::UnknownRow { id })?;
        let role = column.role;

        if self.rows[index].read_only && role != ColumnRole::Quantity {
            return Err(ValidationError::ReadOnlyField {
                field: field.to_string(),
            });
        }

        let value = value.trim();
        if role.is_numeric() && !value.is_empty() && value.parse::<f64>().is_err() {
            return Err(ValidationError::InvalidNumber {
                field: field.to_string(),
                input: value.to_string(),
            });
        }

        if self.layout.unique_column.as_deref() == Some(field) && !value.is_empty() {
            if let Some(existing) = self
                .rows
                .iter()
                .find(|row| row.id != id && row.value(field).trim().eq_ignore_ascii_case(value))
            {
                warn!(
                    "Rejected duplicate {} '{}' on row {}, already on row {}",
                    field, value, self.rows[index].sequence, existing.sequence
                );
                return Err(ValidationError::DuplicateKey {
                    field: field.to_string(),
                    value: value.to_string(),
                    existing_row: existing.sequence,
                });
            }
        }

        let mut row = self.rows[index].clone();
        row.set_value(field, value);
        recalculate(&self.layout, &mut row, role);
        self.rows[index] = row;
        Ok(())
    }

    /// Load rows copied from a source document (a bill being returned, say).
    ///
    /// Loaded rows are read-only apart from quantity. A lone blank row is
    /// replaced; rows repeating an existing unique value are skipped.
    pub fn insert_source_rows(&mut self, source: Vec<BTreeMap<String, String>>) -> Vec<u64> {
        if self.rows.len() == 1 && self.is_blank(&self.rows[0]) {
            self.rows.clear();
        }

        let mut inserted = Vec::new();
        for values in source {
            if let Some(unique) = self.layout.unique_column.as_deref() {
                let key = values.value(unique).trim();
                if !key.is_empty()
                    && self
                        .rows
                        .iter()
                        .any(|row| row.value(unique).trim().eq_ignore_ascii_case(key))
                {
                    warn!("Skipped source row with duplicate {} '{}'", unique, key);
                    continue;
                }
            }

            let mut merged = self.layout.blank_row();
            for (field, value) in values {
                if self.layout.column(&field).is_some() {
                    merged.insert(field, value);
                }
            }

            let id = self.next_id();
            let mut row = LineItem::new(id, merged, true);
            recalculate(&self.layout, &mut row, ColumnRole::Quantity);
            self.rows.push(row);
            inserted.push(id);
        }

        if self.rows.is_empty() {
            self.add_row();
        }
        self.renumber();
        inserted
    }

    /// Drop every row and start again with one blank row. Ids keep counting.
    pub fn clear(&mut self) {
        let next = self.next_id();
        self.rows.clear();
        self.rows.push(LineItem::new(next, self.layout.blank_row(), false));
        self.renumber();
    }

    pub fn rows(&self) -> &[LineItem] {
        &self.rows
    }

    pub fn row(&self, id: u64) -> Option<&LineItem> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn row_at(&self, index: usize) -> Option<&LineItem> {
        self.rows.get(index)
    }

    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the row's required column has been filled
    pub fn is_complete(&self, row: &LineItem) -> bool {
        !row.value(&self.layout.required_column).trim().is_empty()
    }

    /// Whether the row still holds nothing but its defaults
    pub fn is_blank(&self, row: &LineItem) -> bool {
        self.layout
            .columns
            .iter()
            .all(|c| row.value(&c.name).trim() == c.default.trim())
    }

    /// Rows that will be submitted
    pub fn committed_rows(&self) -> impl Iterator<Item = &LineItem> {
        self.rows.iter().filter(move |row| self.is_complete(row))
    }

    /// First row carrying data without its required column
    pub fn missing_required(&self) -> Option<&LineItem> {
        self.rows
            .iter()
            .find(|row| !self.is_complete(row) && !self.is_blank(row))
    }

    /// One past the highest id in the table or ever deleted from it
    fn next_id(&mut self) -> u64 {
        let max_existing = self.rows.iter().map(|row| row.id).max().unwrap_or(0);
        self.last_id = self.last_id.max(max_existing) + 1;
        self.last_id
    }

    fn renumber(&mut self) {
        for (index, row) in self.rows.iter_mut().enumerate() {
            row.sequence = index + 1;
        }
    }
}

fn number(row: &LineItem, layout: &VoucherLayout, role: ColumnRole) -> Option<f64> {
    layout
        .column_for_role(role)
        .and_then(|c| row.value(&c.name).trim().parse::<f64>().ok())
}

fn set_derived(row: &mut LineItem, layout: &VoucherLayout, role: ColumnRole, value: Option<f64>, precision: usize) {
    if let Some(column) = layout.column_for_role(role) {
        let text = value
            .filter(|v| v.is_finite())
            .map(|v| format!("{:.*}", precision, v))
            .unwrap_or_default();
        row.set_value(&column.name, text);
    }
}

fn is_weight_priced(row: &LineItem, layout: &VoucherLayout) -> bool {
    layout
        .column_for_role(ColumnRole::Unit)
        .map(|c| row.value(&c.name).trim().to_ascii_uppercase())
        .is_some_and(|unit| WEIGHT_UNITS.contains(&unit.as_str()))
}

/// Recompute the fields that depend on the column that just changed
fn recalculate(layout: &VoucherLayout, row: &mut LineItem, changed: ColumnRole) {
    match changed {
        ColumnRole::Quantity => {
            average_weight(layout, row);
            cost(layout, row);
        }
        ColumnRole::Weight => {
            average_weight(layout, row);
            if is_weight_priced(row, layout) {
                cost(layout, row);
            }
        }
        ColumnRole::Unit | ColumnRole::Rate => cost(layout, row),
        ColumnRole::Cost | ColumnRole::Mrp => pricing(layout, row),
        _ => {}
    }
}

/// average weight = weight / quantity
fn average_weight(layout: &VoucherLayout, row: &mut LineItem) {
    let quantity = number(row, layout, ColumnRole::Quantity).unwrap_or(0.0);
    let average = match number(row, layout, ColumnRole::Weight) {
        Some(weight) if quantity > 0.0 => Some(weight / quantity),
        _ => None,
    };
    set_derived(row, layout, ColumnRole::AverageWeight, average, 3);
}

/// cost = rate × (weight when priced by weight, quantity otherwise)
fn cost(layout: &VoucherLayout, row: &mut LineItem) {
    if layout.column_for_role(ColumnRole::Cost).is_none() {
        return;
    }
    let basis = if is_weight_priced(row, layout) {
        number(row, layout, ColumnRole::Weight)
    } else {
        number(row, layout, ColumnRole::Quantity)
    };
    let cost = match (number(row, layout, ColumnRole::Rate), basis) {
        (Some(rate), Some(basis)) => Some(rate * basis),
        _ => None,
    };
    set_derived(row, layout, ColumnRole::Cost, cost, 2);
    pricing(layout, row);
}

/// profit % against MRP and the marked-up sale rate, both from unit cost
fn pricing(layout: &VoucherLayout, row: &mut LineItem) {
    let quantity = number(row, layout, ColumnRole::Quantity).unwrap_or(0.0);
    let unit_cost = match number(row, layout, ColumnRole::Cost) {
        Some(cost) if quantity > 0.0 => Some(cost / quantity),
        _ => None,
    };

    let profit = match (unit_cost, number(row, layout, ColumnRole::Mrp)) {
        (Some(unit_cost), Some(mrp)) if mrp > 0.0 => Some((mrp - unit_cost) / mrp * 100.0),
        _ => None,
    };
    set_derived(row, layout, ColumnRole::ProfitPercent, profit, 2);

    let sale_rate = unit_cost.map(|unit_cost| unit_cost * (1.0 + layout.markup_percent / 100.0));
    set_derived(row, layout, ColumnRole::SaleRate, sale_rate, 2);
}

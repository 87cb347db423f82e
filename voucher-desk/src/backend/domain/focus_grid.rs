//! Keyboard focus navigation over a voucher form.
//!
//! The form is a grid of three zones traversed in order: header fields (row
//! by row), line-item cells (row by row), then the footer action bar. Given
//! the current [`FocusLocation`] and a key, the controller answers where
//! focus goes next. It never moves focus itself; callers hand the answer to
//! a focus sink.
//!
//! ## Navigation Rules
//!
//! - Right/Down advance, crossing into the next zone at boundaries
//! - Left/Up are the inverse; Up from the first table row follows the
//!   layout's column-to-header map
//! - Skippable cells (skip rules, read-only row cells, disabled actions) are
//!   passed over in the direction of travel
//! - Enter on the last cell of a complete last row appends a row
//! - Enter anywhere in a row whose required column is empty jumps to the
//!   terminal footer action
//! - An inconsistent grid or location answers with the last header field

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::backend::domain::line_item_table::LineItemTable;
use crate::backend::domain::models::{Direction, FocusLocation, FocusZone, StateError};
use crate::backend::domain::voucher_layout::{ColumnRole, FooterAction, VoucherLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Header(usize, usize),
    Table(usize, usize),
    Footer(usize),
}

pub struct FocusGridController<'a> {
    layout: &'a VoucherLayout,
    header_values: &'a BTreeMap<String, String>,
    disabled_actions: BTreeSet<FooterAction>,
}

impl<'a> FocusGridController<'a> {
    pub fn new(layout: &'a VoucherLayout, header_values: &'a BTreeMap<String, String>) -> Self {
        Self {
            layout,
            header_values,
            disabled_actions: BTreeSet::new(),
        }
    }

    /// Footer actions focus should pass over
    pub fn with_disabled_actions(mut self, actions: impl IntoIterator<Item = FooterAction>) -> Self {
        self.disabled_actions.extend(actions);
        self
    }

    /// Where focus starts when a voucher is opened
    pub fn first_location(&self, table: &LineItemTable) -> FocusLocation {
        if self.is_malformed(table) {
            return self.safe_default();
        }
        self.scan(table, Cell::Header(0, 0), true, true)
            .map(|cell| self.to_location(cell))
            .unwrap_or_else(|| self.safe_default())
    }

    /// The footer action an incomplete row exits to
    pub fn terminal_location(&self) -> FocusLocation {
        match self.layout.footer_index(self.layout.terminal_action) {
            Some(index) => self.to_location(Cell::Footer(index)),
            None => self.safe_default(),
        }
    }

    /// Last header field; the answer for any inconsistent grid
    pub fn safe_default(&self) -> FocusLocation {
        match self.last_header_cell() {
            Some(cell) => self.to_location(cell),
            None => FocusLocation::header(0, 0, ""),
        }
    }

    /// Directional move (arrow keys, Tab)
    pub fn move_focus(&self, table: &LineItemTable, from: &FocusLocation, direction: Direction) -> FocusLocation {
        let Some(cell) = self.checked_cell(table, from) else {
            return self.safe_default();
        };

        let target = match direction {
            Direction::Right => self.scan(table, cell, true, false),
            Direction::Left => self.scan(table, cell, false, false),
            Direction::Down => self
                .below(table, cell)
                .and_then(|start| self.scan(table, start, true, true)),
            Direction::Up => self.above(table, cell),
        };

        self.to_location(target.unwrap_or(cell))
    }

    /// Linear traversal for the Enter key.
    ///
    /// Behaves like Right except inside the table: a row whose required
    /// column is empty exits to the terminal action, and leaving the last
    /// cell of a complete last row appends a new row.
    pub fn advance_linear(&self, table: &mut LineItemTable, from: &FocusLocation) -> FocusLocation {
        let Some(cell) = self.checked_cell(table, from) else {
            return self.safe_default();
        };

        if let Cell::Table(row_index, column) = cell {
            let complete = table
                .row_at(row_index)
                .is_some_and(|row| table.is_complete(row));
            if !complete {
                debug!(
                    "Row {} has no {}, jumping to {}",
                    row_index + 1,
                    self.layout.required_column,
                    self.layout.terminal_action.as_str()
                );
                return self.terminal_location();
            }

            let is_last_row = row_index + 1 == table.row_count();
            if is_last_row && self.is_last_in_row(table, row_index, column) {
                let id = table.add_row();
                let new_index = table.row_count() - 1;
                debug!("Appended line item {} after row {}", id, row_index + 1);
                return self
                    .scan(table, Cell::Table(new_index, 0), true, true)
                    .map(|cell| self.to_location(cell))
                    .unwrap_or_else(|| self.terminal_location());
            }
        }

        self.move_focus(table, from, Direction::Right)
    }

    /// Every header row must hold a field, as must the table
    fn is_malformed(&self, table: &LineItemTable) -> bool {
        table.row_count() == 0
            || self.layout.columns.is_empty()
            || self.layout.header.is_empty()
            || self.layout.header.iter().any(|fields| fields.is_empty())
    }

    /// Resolve a location against the current grid shape
    fn checked_cell(&self, table: &LineItemTable, location: &FocusLocation) -> Option<Cell> {
        if self.is_malformed(table) {
            warn!(
                "{}",
                StateError::MalformedGrid(format!(
                    "{} layout with header rows {:?} and {} table rows",
                    self.layout.kind,
                    self.layout.header.iter().map(Vec::len).collect::<Vec<_>>(),
                    table.row_count()
                ))
            );
            return None;
        }

        let cell = match location.zone {
            FocusZone::Header => self
                .layout
                .header
                .get(location.row)
                .filter(|fields| location.field < fields.len())
                .map(|_| Cell::Header(location.row, location.field)),
            FocusZone::Table => (location.row < table.row_count()
                && location.field < self.layout.columns.len())
            .then_some(Cell::Table(location.row, location.field)),
            FocusZone::Footer => {
                (location.field < self.layout.footer.len()).then_some(Cell::Footer(location.field))
            }
        };

        if cell.is_none() {
            warn!(
                "{}",
                StateError::MalformedGrid(format!("location {:?} is outside the grid", location))
            );
        }
        cell
    }

    fn to_location(&self, cell: Cell) -> FocusLocation {
        match cell {
            Cell::Header(row, field) => {
                FocusLocation::header(row, field, self.layout.header[row][field].name.clone())
            }
            Cell::Table(row, column) => {
                FocusLocation::table(row, column, self.layout.columns[column].name.clone())
            }
            Cell::Footer(action) => FocusLocation::footer(action, self.layout.footer[action].action.as_str()),
        }
    }

    fn last_header_cell(&self) -> Option<Cell> {
        self.layout
            .header
            .iter()
            .enumerate()
            .rev()
            .find_map(|(row, fields)| fields.len().checked_sub(1).map(|field| Cell::Header(row, field)))
    }

    fn is_skippable(&self, table: &LineItemTable, cell: Cell) -> bool {
        match cell {
            Cell::Header(row, field) => self.layout.header[row][field]
                .skip
                .as_ref()
                .is_some_and(|rule| rule.applies(self.header_values)),
            Cell::Table(row_index, column) => {
                let Some(row) = table.row_at(row_index) else {
                    return true;
                };
                let spec = &self.layout.columns[column];
                (row.read_only && spec.role != ColumnRole::Quantity)
                    || spec.skip.as_ref().is_some_and(|rule| rule.applies(row))
            }
            Cell::Footer(action) => self
                .disabled_actions
                .contains(&self.layout.footer[action].action),
        }
    }

    fn is_last_in_row(&self, table: &LineItemTable, row: usize, column: usize) -> bool {
        (column + 1..self.layout.columns.len()).all(|later| self.is_skippable(table, Cell::Table(row, later)))
    }

    fn cell_count(&self, table: &LineItemTable) -> usize {
        self.layout.header_fields().count()
            + table.row_count() * self.layout.columns.len()
            + self.layout.footer.len()
    }

    /// Next cell in reading order, ignoring skip rules
    fn successor(&self, table: &LineItemTable, cell: Cell) -> Option<Cell> {
        let columns = self.layout.columns.len();
        match cell {
            Cell::Header(row, field) => {
                if field + 1 < self.layout.header[row].len() {
                    Some(Cell::Header(row, field + 1))
                } else if row + 1 < self.layout.header.len() {
                    Some(Cell::Header(row + 1, 0))
                } else {
                    Some(Cell::Table(0, 0))
                }
            }
            Cell::Table(row, column) => {
                if column + 1 < columns {
                    Some(Cell::Table(row, column + 1))
                } else if row + 1 < table.row_count() {
                    Some(Cell::Table(row + 1, 0))
                } else if !self.layout.footer.is_empty() {
                    Some(Cell::Footer(0))
                } else {
                    None
                }
            }
            Cell::Footer(action) => (action + 1 < self.layout.footer.len()).then_some(Cell::Footer(action + 1)),
        }
    }

    /// Previous cell in reading order, ignoring skip rules
    fn predecessor(&self, table: &LineItemTable, cell: Cell) -> Option<Cell> {
        let columns = self.layout.columns.len();
        match cell {
            Cell::Header(row, field) => {
                if field > 0 {
                    Some(Cell::Header(row, field - 1))
                } else if row > 0 {
                    Some(Cell::Header(row - 1, self.layout.header[row - 1].len() - 1))
                } else {
                    None
                }
            }
            Cell::Table(row, column) => {
                if column > 0 {
                    Some(Cell::Table(row, column - 1))
                } else if row > 0 {
                    Some(Cell::Table(row - 1, columns - 1))
                } else {
                    self.last_header_cell()
                }
            }
            Cell::Footer(action) => {
                if action > 0 {
                    Some(Cell::Footer(action - 1))
                } else {
                    Some(Cell::Table(table.row_count() - 1, columns - 1))
                }
            }
        }
    }

    /// Walk in reading order until a focusable cell is found
    fn scan(&self, table: &LineItemTable, start: Cell, forward: bool, include_start: bool) -> Option<Cell> {
        let step = |cell: Cell| {
            if forward {
                self.successor(table, cell)
            } else {
                self.predecessor(table, cell)
            }
        };

        let mut cell = if include_start { start } else { step(start)? };
        for _ in 0..=self.cell_count(table) {
            if !self.is_skippable(table, cell) {
                return Some(cell);
            }
            cell = step(cell)?;
        }
        None
    }

    fn below(&self, table: &LineItemTable, cell: Cell) -> Option<Cell> {
        match cell {
            Cell::Header(row, field) => match self.layout.header.get(row + 1) {
                Some(next) => Some(Cell::Header(row + 1, field.min(next.len() - 1))),
                None => Some(Cell::Table(0, 0)),
            },
            Cell::Table(row, column) => {
                if row + 1 < table.row_count() {
                    Some(Cell::Table(row + 1, column))
                } else if !self.layout.footer.is_empty() {
                    Some(Cell::Footer(0))
                } else {
                    None
                }
            }
            Cell::Footer(_) => None,
        }
    }

    /// Up lands on the cell above, then backs off past skippable cells
    fn above(&self, table: &LineItemTable, cell: Cell) -> Option<Cell> {
        match cell {
            Cell::Header(row, field) => {
                let row = row.checked_sub(1)?;
                let start = Cell::Header(row, field.min(self.layout.header[row].len() - 1));
                self.scan(table, start, false, true)
            }
            Cell::Table(0, column) => {
                let start = self
                    .layout
                    .column_header_map
                    .get(&self.layout.columns[column].name)
                    .and_then(|name| self.layout.header_position(name))
                    .map(|(row, field)| Cell::Header(row, field))
                    .or_else(|| self.last_header_cell())?;
                self.scan(table, start, false, true)
            }
            Cell::Table(row, column) => self.scan(table, Cell::Table(row - 1, column), false, true),
            Cell::Footer(_) => {
                let last = table.row_count() - 1;
                match self.scan(table, Cell::Table(last, 0), true, true) {
                    Some(found @ Cell::Table(row, _)) if row == last => Some(found),
                    _ => self.scan(table, Cell::Table(last, self.layout.columns.len() - 1), false, true),
                }
            }
        }
    }
}

use serde::{Deserialize, Serialize};

/// The three macro-regions of the keyboard-navigable entry grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusZone {
    Header,
    Table,
    Footer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Keys the navigation automaton reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavKey {
    Enter,
    Tab,
    BackTab,
    Arrow(Direction),
}

/// Where keyboard focus currently sits.
///
/// `row` is the header row for `Header`, the line-item row index for `Table`
/// and always 0 for `Footer`, where `field` indexes the action bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusLocation {
    pub zone: FocusZone,
    pub row: usize,
    pub field: usize,
    pub field_name: String,
}

impl FocusLocation {
    pub fn header(row: usize, field: usize, field_name: impl Into<String>) -> Self {
        Self {
            zone: FocusZone::Header,
            row,
            field,
            field_name: field_name.into(),
        }
    }

    pub fn table(row: usize, field: usize, field_name: impl Into<String>) -> Self {
        Self {
            zone: FocusZone::Table,
            row,
            field,
            field_name: field_name.into(),
        }
    }

    pub fn footer(action: usize, action_name: impl Into<String>) -> Self {
        Self {
            zone: FocusZone::Footer,
            row: 0,
            field: action,
            field_name: action_name.into(),
        }
    }

    pub fn is_table(&self) -> bool {
        self.zone == FocusZone::Table
    }
}

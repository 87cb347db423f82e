use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read access to named field values, shared by line items and header values
/// so skip rules can evaluate against either.
pub trait FieldValues {
    /// Value of `field`, or an empty string when it has never been set
    fn value(&self, field: &str) -> &str;
}

impl FieldValues for BTreeMap<String, String> {
    fn value(&self, field: &str) -> &str {
        self.get(field).map(String::as_str).unwrap_or("")
    }
}

/// One row of the voucher's line-item table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Never reused for the life of the table, even after deletions
    pub id: u64,
    /// Contiguous display number starting at 1
    pub sequence: usize,
    /// Row came from a source document; only quantity may change
    pub read_only: bool,
    values: BTreeMap<String, String>,
}

impl LineItem {
    pub(crate) fn new(id: u64, values: BTreeMap<String, String>, read_only: bool) -> Self {
        Self {
            id,
            sequence: 0,
            read_only,
            values,
        }
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub(crate) fn set_value(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(field.to_string(), value.into());
    }

    pub(crate) fn replace_values(&mut self, values: BTreeMap<String, String>) {
        self.values = values;
    }
}

impl FieldValues for LineItem {
    fn value(&self, field: &str) -> &str {
        self.values.value(field)
    }
}

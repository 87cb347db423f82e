use serde::{Deserialize, Serialize};
use shared::PermissionSet;
use std::fmt;

/// Capabilities the permission collaborator answers for each form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Add,
    Edit,
    Delete,
}

impl Permission {
    pub fn granted_by(self, permissions: &PermissionSet) -> bool {
        match self {
            Permission::Add => permissions.add,
            Permission::Edit => permissions.edit,
            Permission::Delete => permissions.delete,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Add => write!(f, "add"),
            Permission::Edit => write!(f, "edit"),
            Permission::Delete => write!(f, "delete"),
        }
    }
}

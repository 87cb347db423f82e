//! # IO Module
//!
//! The boundary between the voucher core and everything it does not own.
//!
//! ## Key Responsibilities
//!
//! - **Collaborator traits**: The remote voucher service, list pickers,
//!   permission lookup and the focus sink
//! - **Mappers**: Conversion between the wire DTOs in `shared` and domain types
//! - **In-memory collaborators**: Stand-ins used by tests and the replay console
//! - **Replay**: Scripted keystroke and field-edit sessions for the console

pub mod collaborators;
pub mod mappers;
pub mod memory;
pub mod replay;

pub use collaborators::{FocusSink, ListSelector, PermissionProvider, VoucherApi};

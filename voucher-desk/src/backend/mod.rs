//! # Backend Module
//!
//! Contains all non-UI logic for voucher entry.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! ```text
//! Widget layer (focus sink, popups)
//!     ↓
//! IO Layer (collaborator traits, mappers, replay)
//!     ↓
//! Domain Layer (ledger, reconciliation, table, focus grid, session)
//!     ↓
//! Storage Layer (desk configuration)
//! ```
//!
//! The backend is UI-agnostic: the replay console drives it exactly the way
//! a desktop form would.

pub mod domain;
pub mod io;
pub mod storage;

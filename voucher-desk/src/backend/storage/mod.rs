//! # Storage Module
//!
//! Persists the desk configuration. Vouchers themselves are stored by the
//! remote voucher service, never locally.

pub mod config_repository;

pub use config_repository::{ConfigRepository, DeskConfig};

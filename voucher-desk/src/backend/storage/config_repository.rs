//! # Desk Config Repository
//!
//! File-based storage of the desk configuration: the company the desk posts
//! vouchers for and the layout of every voucher screen.
//!
//! ## YAML Format
//!
//! ```yaml
//! company_id: "MAIN"
//! currency_symbol: "₹"
//! layouts:
//!   - kind: PaymentVoucher
//!     title: Payment Voucher
//!     rule: PY
//!     ...
//! ```
//!
//! ## Features
//!
//! - Defaults are written on first use
//! - Every layout is validated on load
//! - Atomic file writes with temp files

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::domain::voucher_layout::{VoucherKind, VoucherLayout};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskConfig {
    pub company_id: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// One layout per voucher kind; missing kinds fall back to the built-ins
    #[serde(default = "VoucherLayout::defaults")]
    pub layouts: Vec<VoucherLayout>,
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            company_id: "MAIN".to_string(),
            currency_symbol: default_currency_symbol(),
            layouts: VoucherLayout::defaults(),
        }
    }
}

impl DeskConfig {
    /// Configured layout for `kind`, or the built-in one
    pub fn layout(&self, kind: VoucherKind) -> VoucherLayout {
        self.layouts
            .iter()
            .find(|layout| layout.kind == kind)
            .cloned()
            .unwrap_or_else(|| VoucherLayout::for_kind(kind))
    }

    /// Whole-rupee amount with the configured currency symbol
    pub fn format_amount(&self, amount: i64) -> String {
        if amount < 0 {
            format!("-{}{}", self.currency_symbol, amount.unsigned_abs())
        } else {
            format!("{}{}", self.currency_symbol, amount)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.company_id.trim().is_empty() {
            bail!("company_id must not be empty");
        }
        let mut seen = BTreeSet::new();
        for layout in &self.layouts {
            if !seen.insert(layout.kind) {
                bail!("Layout for {} is configured twice", layout.kind);
            }
            layout.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigRepository {
    path: PathBuf,
}

impl ConfigRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config from file, creating the default if it doesn't exist
    pub fn load_or_create(&self) -> Result<DeskConfig> {
        if self.path.exists() {
            let yaml_content = fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read {:?}", self.path))?;
            let config: DeskConfig = serde_yaml::from_str(&yaml_content)
                .with_context(|| format!("Failed to parse {:?}", self.path))?;
            config
                .validate()
                .map_err(|e| anyhow!("Invalid desk config {:?}: {}", self.path, e))?;
            debug!("Loaded desk config from {:?}", self.path);
            Ok(config)
        } else {
            let config = DeskConfig::default();
            self.save(&config)?;
            info!("Created default desk config at {:?}", self.path);
            Ok(config)
        }
    }

    pub fn save(&self, config: &DeskConfig) -> Result<()> {
        config.validate()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created config directory: {:?}", parent);
            }
        }

        let yaml_content = serde_yaml::to_string(config)?;

        // Write to a temp file, then rename over the real one
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &self.path)?;

        debug!("Saved desk config to {:?}", self.path);
        Ok(())
    }
}

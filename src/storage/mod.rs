//! Persistence layer.
//!
//! Appends executed paper trades to a flat CSV history file. The file is
//! never rewritten; each run adds to whatever is already there.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{TradeRecord, TraderError};

/// Default trade history file path.
pub const DEFAULT_TRADE_LOG: &str = "trade_history.csv";

/// Append-only trade history.
#[derive(Debug, Clone)]
pub struct TradeLog {
    path: PathBuf,
}

impl TradeLog {
    /// Open the history at `path`, writing the header row if the file does
    /// not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            info!(path = %path.display(), "Using existing trade history file");
        } else {
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to create trade log {}", path.display()))?;
            writer
                .write_record(TradeRecord::HEADER)
                .context("Failed to write trade log header")?;
            writer.flush().context("Failed to flush trade log header")?;
            info!(path = %path.display(), "Created new trade history file");
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one trade and flush it to disk.
    pub fn append(&self, record: &TradeRecord) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| {
                TraderError::Storage(format!("cannot open {}: {e}", self.path.display()))
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(record.to_row())
            .map_err(|e| TraderError::Storage(format!("cannot write trade row: {e}")))?;
        writer
            .flush()
            .map_err(|e| TraderError::Storage(format!("cannot flush trade log: {e}")))?;

        debug!(
            pair = %record.pair,
            action = %record.action,
            path = %self.path.display(),
            "Trade appended to history"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

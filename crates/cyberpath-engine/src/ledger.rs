//! Append-only run ledger.
//!
//! Each scoring run can append one JSON line to `{dir}/runs.jsonl`. Every
//! entry stores the hash of the entry before it, so editing or removing a
//! line breaks [`RunLedger::verify`] from that line on.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cyberpath_core::ScoringConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const LEDGER_FILE: &str = "runs.jsonl";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

/// What a run produced, enough to compare runs without the full output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub nodes: usize,
    pub roots: usize,
    pub chains: usize,
    pub max_depth: usize,
    /// Names along the highest ranked chain.
    pub top_chain: Vec<String>,
    pub top_score: f64,
    pub computation_ms: u64,
}

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub tree_digest: String,
    pub scoring: ScoringConfig,
    pub summary: RunSummary,
    /// `None` for the first entry.
    pub prev_hash: Option<String>,
    /// BLAKE3 (hex) over every other field.
    pub hash: String,
}

#[derive(Serialize)]
struct EntryBody<'a> {
    run_id: &'a Uuid,
    recorded_at: &'a DateTime<Utc>,
    tree_digest: &'a str,
    scoring: &'a ScoringConfig,
    summary: &'a RunSummary,
    prev_hash: Option<&'a str>,
}

impl RunEntry {
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        let body = EntryBody {
            run_id: &self.run_id,
            recorded_at: &self.recorded_at,
            tree_digest: &self.tree_digest,
            scoring: &self.scoring,
            summary: &self.summary,
            prev_hash: self.prev_hash.as_deref(),
        };
        Ok(blake3::hash(&serde_json::to_vec(&body)?).to_hex().to_string())
    }
}

/// A ledger file inside a directory.
#[derive(Debug, Clone)]
pub struct RunLedger {
    path: PathBuf,
}

impl RunLedger {
    /// Open the ledger in `dir`, creating the directory if needed. The file
    /// itself is created on first append.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(LEDGER_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in append order. A missing file is an empty ledger.
    pub fn entries(&self) -> Result<Vec<RunEntry>, LedgerError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| LedgerError::Corrupt {
                    line: i + 1,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Seal and append an entry linked to the current last entry.
    pub fn append(
        &self,
        tree_digest: &str,
        scoring: &ScoringConfig,
        summary: RunSummary,
    ) -> Result<RunEntry, LedgerError> {
        let prev_hash = self.entries()?.last().map(|e| e.hash.clone());

        let mut entry = RunEntry {
            run_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            tree_digest: tree_digest.to_string(),
            scoring: scoring.clone(),
            summary,
            prev_hash,
            hash: String::new(),
        };
        entry.hash = entry.compute_hash()?;

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(line.as_bytes())?;

        tracing::debug!(
            run_id = %entry.run_id,
            path = %self.path.display(),
            "Run recorded in ledger"
        );

        Ok(entry)
    }

    pub fn find(&self, run_id: Uuid) -> Result<Option<RunEntry>, LedgerError> {
        Ok(self.entries()?.into_iter().find(|e| e.run_id == run_id))
    }

    /// Check every hash and link. Returns the number of entries.
    pub fn verify(&self) -> Result<usize, LedgerError> {
        let entries = self.entries()?;
        let mut prev: Option<&str> = None;

        for (i, entry) in entries.iter().enumerate() {
            let line = i + 1;
            if entry.prev_hash.as_deref() != prev {
                return Err(LedgerError::Corrupt {
                    line,
                    reason: "previous-entry link does not match".to_string(),
                });
            }
            if entry.compute_hash()? != entry.hash {
                return Err(LedgerError::Corrupt {
                    line,
                    reason: "content hash does not match".to_string(),
                });
            }
            prev = Some(&entry.hash);
        }

        Ok(entries.len())
    }
}

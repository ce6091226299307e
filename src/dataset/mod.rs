//! Gold dataset sink.
//!
//! One record per completed turn, silent turns included: the frame is
//! persisted as an image artifact and a JSONL line captures the
//! state/action pair. The `reward` field stays 0.0 here; an offline
//! process fills it in later. Logging never blocks or fails a turn.

use crate::capture::Frame;
use crate::error::DatasetError;
use crate::history::Utterance;
use crate::prompt::SILENCE_TOKEN;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

const RECORDS_FILE: &str = "records.jsonl";

#[derive(Debug, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub id: String,
    pub state: TurnState,
    pub action: TurnAction,
    /// Placeholder; assigned by the offline trainer, never mutated here.
    pub reward: f64,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnState {
    /// Artifact filename relative to the dataset directory.
    pub frame: String,
    /// User transcript, or the `[PROACTIVE]` marker.
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnAction {
    /// Spoken reply, or the silence token for silent turns.
    pub reply: String,
    pub reasoning: String,
}

pub struct InteractionLogger {
    dir: PathBuf,
    records_path: PathBuf,
}

impl InteractionLogger {
    pub fn new(dir: &Path) -> Result<Self, DatasetError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            records_path: dir.join(RECORDS_FILE),
        })
    }

    /// Persist one turn. Returns the artifact filename on success; on any
    /// failure the error is reported at `warn` and the turn proceeds.
    pub fn log_turn(
        &self,
        frame: &Frame,
        transcript: &str,
        utterance: &Utterance,
        reasoning: &str,
    ) -> Option<String> {
        match self.try_log_turn(frame, transcript, utterance, reasoning) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!(error = %e, "dataset write skipped");
                None
            }
        }
    }

    fn try_log_turn(
        &self,
        frame: &Frame,
        transcript: &str,
        utterance: &Utterance,
        reasoning: &str,
    ) -> Result<String, DatasetError> {
        let id = uuid::Uuid::new_v4().to_string();
        let artifact = format!("turn_{id}.{}", frame.extension());

        fs::write(self.dir.join(&artifact), &frame.bytes)
            .map_err(|e| DatasetError::Artifact(e.to_string()))?;

        let entry = InteractionLogEntry {
            id,
            state: TurnState {
                frame: artifact.clone(),
                transcript: transcript.to_string(),
            },
            action: TurnAction {
                reply: utterance
                    .spoken_text()
                    .unwrap_or(SILENCE_TOKEN)
                    .to_string(),
                reasoning: reasoning.to_string(),
            },
            reward: 0.0,
            timestamp: Utc::now().to_rfc3339(),
        };

        let line =
            serde_json::to_string(&entry).map_err(|e| DatasetError::Append(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.records_path)
            .map_err(|e| DatasetError::Append(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| DatasetError::Append(e.to_string()))?;

        Ok(entry.state.frame)
    }
}

// ─── Stats (CLI surface) ─────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DatasetStats {
    pub total: usize,
    pub spoken: usize,
    pub silent: usize,
    /// Entries whose reward has been filled in by the offline process.
    pub annotated: usize,
}

/// Summarize an existing dataset directory. Unparseable lines are
/// counted as malformed rather than aborting the scan.
pub fn stats(dir: &Path) -> Result<DatasetStats, DatasetError> {
    let records_path = dir.join(RECORDS_FILE);
    if !records_path.exists() {
        return Ok(DatasetStats::default());
    }

    let contents = fs::read_to_string(&records_path)?;
    let mut out = DatasetStats::default();
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(entry) = serde_json::from_str::<InteractionLogEntry>(line) else {
            tracing::warn!("skipping malformed dataset record");
            continue;
        };
        out.total += 1;
        if entry.action.reply == SILENCE_TOKEN {
            out.silent += 1;
        } else {
            out.spoken += 1;
        }
        if entry.reward != 0.0 {
            out.annotated += 1;
        }
    }
    Ok(out)
}

//! Per-folder pipeline state machine
//!
//! RECEIVED → CLASSIFIED → NUMERICS_EXTRACTED → IMAGE_MERGED → PERSISTED,
//! with REJECTED and INCOMPLETE as terminal failure states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Folder accepted, not yet classified
    Received,
    /// Beam type decided
    Classified,
    /// Numeric pass finished
    NumericsExtracted,
    /// Image pass merged or skipped for a recorded reason
    ImageMerged,
    /// Handed to persistence
    Persisted,
    /// Classification failed, exclusion marker matched or metadata missing
    Rejected,
    /// Extraction, merge or persistence failed after the record existed
    Incomplete,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Persisted | PipelineState::Rejected | PipelineState::Incomplete
        )
    }

    /// Linear progression only; failure states reachable from any live state
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Received, Classified)
            | (Classified, NumericsExtracted)
            | (NumericsExtracted, ImageMerged)
            | (ImageMerged, Persisted) => true,
            (Received | Classified, Rejected) => true,
            (Classified | NumericsExtracted | ImageMerged, Incomplete) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid pipeline transition {from:?} -> {to:?} for run {run_id}")]
pub struct InvalidTransition {
    pub run_id: Uuid,
    pub from: PipelineState,
    pub to: PipelineState,
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// One folder's trip through the pipeline (in-memory)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub folder: PathBuf,
    pub state: PipelineState,
    pub transitions: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(folder: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            folder: folder.to_path_buf(),
            state: PipelineState::Received,
            transitions: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(
        &mut self,
        new_state: PipelineState,
    ) -> Result<&StateTransition, InvalidTransition> {
        if !self.state.can_transition_to(new_state) {
            return Err(InvalidTransition {
                run_id: self.run_id,
                from: self.state,
                to: new_state,
            });
        }

        let now = Utc::now();
        self.transitions.push(StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: now,
        });
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(now);
        }

        tracing::debug!(
            run_id = %self.run_id,
            folder = %self.folder.display(),
            state = ?new_state,
            "Pipeline state changed"
        );

        Ok(&self.transitions[self.transitions.len() - 1])
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// States visited so far, starting with `Received`
    pub fn history(&self) -> Vec<PipelineState> {
        std::iter::once(PipelineState::Received)
            .chain(self.transitions.iter().map(|t| t.new_state))
            .collect()
    }
}

//! Run report
//!
//! What a run did, per file, in a shape the CLI prints or serializes.

use crate::config::CommandMode;
use crate::error::{Error, PolicyError};
use serde::Serialize;

/// Why an artifact failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Render,
    AnchorNotFound,
    ImportBlockNotFound,
    Io,
    DuplicatePath,
    Other,
}

impl From<&Error> for FailureKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::Render { .. } => FailureKind::Render,
            Error::Policy(PolicyError::AnchorNotFound { .. }) => FailureKind::AnchorNotFound,
            Error::Policy(PolicyError::ImportBlockNotFound) => FailureKind::ImportBlockNotFound,
            Error::Io(_) => FailureKind::Io,
            Error::DuplicatePath(_) => FailureKind::DuplicatePath,
            _ => FailureKind::Other,
        }
    }
}

/// Per-file outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Written,
    Skipped,
    Failed { kind: FailureKind, reason: String },
}

impl Outcome {
    pub fn failed(err: &Error) -> Self {
        Outcome::Failed {
            kind: FailureKind::from(err),
            reason: err.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// One generated (or attempted) file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactResult {
    pub key: String,
    pub path: String,
    /// Content written, or `None` when nothing was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub outcome: Outcome,
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// Some artifacts failed, at least one succeeded
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: CommandMode,
    pub layout: Vec<ArtifactResult>,
    pub artifacts: Vec<ArtifactResult>,
}

impl RunReport {
    pub fn new(mode: CommandMode) -> Self {
        Self {
            mode,
            layout: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Written))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.artifacts.iter().filter(|a| pred(&a.outcome)).count()
    }

    /// Failed only when something failed and nothing succeeded; an empty
    /// plan succeeds
    pub fn status(&self) -> RunStatus {
        let failed = self.failed();
        if failed == 0 {
            RunStatus::Succeeded
        } else if failed == self.artifacts.len() {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }

    /// Result for a path, artifacts first
    pub fn get(&self, path: &str) -> Option<&ArtifactResult> {
        self.artifacts
            .iter()
            .chain(self.layout.iter())
            .find(|a| a.path == path)
    }
}

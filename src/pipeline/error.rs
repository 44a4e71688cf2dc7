//! Error types for the cleaning pipeline.
//!
//! Fatal problems (`PipelineError`) abort the run. Problems with a single
//! record (`RecordIssue`) never abort: the affected field is left null and
//! the issue is collected in an `IssueLog` so it can be counted at the end.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input file is missing, unreadable, malformed or has no data rows.
    #[error("Failed to load dataset '{}': {}", .path.display(), .reason)]
    Load { path: PathBuf, reason: String },

    /// One or more required columns are absent from the input.
    #[error("Required column(s) missing: {missing:?}. Available columns: {available:?}")]
    Schema {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Two input headers normalize to the same column name.
    #[error("Columns '{first}' and '{second}' both map to '{canonical}'")]
    DuplicateColumn {
        first: String,
        second: String,
        canonical: String,
    },

    /// Configuration that cannot be applied to the table.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn load(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        PipelineError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Severity class of a per-record problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A value violates a stage's domain constraint; the derived field is left null.
    InvalidRecord,
    /// A date, number or location failed to parse and was recorded as null.
    ParseWarning,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::InvalidRecord => write!(f, "invalid record"),
            IssueKind::ParseWarning => write!(f, "parse warning"),
        }
    }
}

/// A problem with one field of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssue {
    /// Zero-based row position in the loaded table
    pub row: usize,
    /// Column whose value caused the issue
    pub column: String,
    pub kind: IssueKind,
    pub message: String,
}

impl RecordIssue {
    pub fn parse_warning(row: usize, column: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            column: column.to_string(),
            kind: IssueKind::ParseWarning,
            message: message.into(),
        }
    }

    pub fn invalid_record(row: usize, column: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            column: column.to_string(),
            kind: IssueKind::InvalidRecord,
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} [{}] {}: {}",
            self.row, self.column, self.kind, self.message
        )
    }
}

/// Accumulates per-record issues across all stages of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueLog {
    issues: Vec<RecordIssue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: RecordIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = RecordIssue>) {
        self.issues.extend(issues);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordIssue> {
        self.issues.iter()
    }

    /// Number of issues of the given kind
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Issue counts keyed by (column, kind), in a stable order
    pub fn by_column(&self) -> BTreeMap<(String, IssueKind), usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts
                .entry((issue.column.clone(), issue.kind))
                .or_insert(0) += 1;
        }
        counts
    }
}

impl From<Vec<RecordIssue>> for IssueLog {
    fn from(issues: Vec<RecordIssue>) -> Self {
        Self { issues }
    }
}

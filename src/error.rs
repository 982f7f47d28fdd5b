use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline stage. Degenerate statistics are not part of this list, they
/// resolve to a fallback value instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A raw id has no entry in the dictionary built by an earlier stage.
    #[error("No dense id for {kind} '{raw_id}', was the dictionary built from another table?")]
    DataIntegrity { kind: &'static str, raw_id: String },

    #[error("Shape mismatch in {artifact}: expected {expected}, found {found}")]
    ShapeMismatch { artifact: String, expected: usize, found: usize },

    #[error("Stage '{stage}' requires {}, which does not exist", .path.display())]
    MissingArtifact { stage: &'static str, path: PathBuf },

    #[error("Archive {} holds no array named '{name}'", .path.display())]
    MissingArray { name: String, path: PathBuf },

    #[error("Input has no column named '{column}'")]
    MissingColumn { column: String },

    #[error("Invalid value '{value}' for column '{column}' on line {line}")]
    InvalidField { line: u64, column: String, value: String },

    /// Only raised when strict skill tagging is enabled.
    #[error("Problem '{problem}' is tagged with '{first}' and later with '{later}'")]
    InconsistentSkillTagging { problem: String, first: String, later: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

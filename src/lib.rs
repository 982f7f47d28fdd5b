//! Knowledge-tracing features from student interaction logs.
//!
//! The pipeline turns a raw log of (student, problem, skill, correctness, response time) rows
//! into a cleaned table, dense id dictionaries, problem-skill relations, difficulty and
//! mastery statistics, Jaccard similarities between problems and between skills, and finally
//! one joint embedding row per interaction.

pub mod clean;
pub mod config;
pub mod correlation;
pub mod difficulty;
pub mod error;
pub mod io;
pub mod joint;
pub mod mastery;
pub mod pipeline;
pub mod relations;
pub mod similarity;
pub mod stats;
pub mod types;
pub mod utils;


pub use crate::config::{PipelineConfig, SkillLayout};
pub use crate::error::{PipelineError, Result};
pub use crate::pipeline::{run, run_features, Stage};

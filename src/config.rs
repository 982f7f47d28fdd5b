use std::fs;
use std::path::{Path, PathBuf};

use serde_derive::Deserialize;

use crate::error::Result;

/// File names of the persisted artifacts.
pub mod artifacts {
    pub const NUM_PRO: &str = "num_pro.txt";
    pub const NUM_STU: &str = "num_stu.txt";
    pub const NUM_SKILL: &str = "num_skill.txt";
    pub const MAX_SKILL_LEN: &str = "max_skill_len.txt";
    pub const PRO_ID_DICT: &str = "pro_id_dict.txt";
    pub const STU_ID_DICT: &str = "stu_id_dict.txt";
    pub const SKILL_ID_DICT: &str = "skill_id_dict.txt";
    pub const PRO_SKILL_DICT: &str = "pro_skill_dict.txt";
    pub const PRO_SKILL_SPARSE: &str = "pro_skill_sparse.json";
    pub const PRO_DIFF_SPARSE: &str = "pro_diff_sparse.json";
    pub const SKILL_DIFF_SPARSE: &str = "skill_diff_sparse.json";
    pub const STU_SKILL_SPARSE: &str = "stu_skill_sparse.json";
    pub const PRO_PRO_SPARSE: &str = "pro_pro_sparse.json";
    pub const SKILL_SKILL_SPARSE: &str = "skill_skill_sparse.json";
    pub const STU_PRO_SKILL_CORR: &str = "stu_pro_skill_corr";
    pub const FINAL_STU_EMBED: &str = "final_stu_embed";
    pub const FINAL_PRO_EMBED: &str = "final_pro_embed";
    pub const FINAL_SKILL_EMBED: &str = "final_skill_embed";
    pub const FINAL_JOINT_EMBED: &str = "final_joint_embed";
    pub const FINAL_TRUE_CORR: &str = "final_true_corr";
}

/// How the skill column of a problem is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SkillLayout {
    /// Exactly one skill token per problem.
    Single,
    /// A delimiter-separated list of skill tokens per problem.
    Multi { delimiter: char },
}

impl SkillLayout {
    pub fn is_multi(&self) -> bool {
        match *self {
            SkillLayout::Multi { .. } => true,
            SkillLayout::Single => false,
        }
    }
}

/// Column names in the raw interaction log.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawColumns {
    pub student: String,
    pub problem: String,
    pub skill: String,
    pub correct: String,
    pub response_time: String,
    /// Rows whose value in this column is not 1 are retries or scaffolding. If unset, every
    /// row counts as an original attempt.
    pub original: Option<String>,
}

impl Default for RawColumns {
    fn default() -> Self {
        RawColumns {
            student: "user_id".to_string(),
            problem: "problem_id".to_string(),
            skill: "skill_id".to_string(),
            correct: "correct".to_string(),
            response_time: "ms_first_response".to_string(),
            original: Some("original".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dataset: String,
    pub data_dir: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub raw_file: Option<String>,
    pub cleaned_file: Option<String>,
    pub layout: SkillLayout,
    pub columns: RawColumns,
    pub min_student_interactions: usize,
    pub outlier_std_devs: f64,
    pub difficulty_epsilon: f64,
    pub embed_dim: usize,
    pub split_rate: f64,
    /// Fail instead of keeping the first tagging when a problem's rows disagree on skills.
    pub strict_skill_tagging: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig::assist09()
    }
}

impl PipelineConfig {

    /// ASSISTments 2009-2010: problems carry '_'-separated skill lists.
    pub fn assist09() -> Self {
        PipelineConfig {
            dataset: "Assist09".to_string(),
            data_dir: None,
            model_dir: None,
            raw_file: None,
            cleaned_file: None,
            layout: SkillLayout::Multi { delimiter: '_' },
            columns: RawColumns::default(),
            min_student_interactions: 5,
            outlier_std_devs: 2.0,
            difficulty_epsilon: 1e-4,
            embed_dim: 128,
            split_rate: 0.7,
            strict_skill_tagging: false,
        }
    }

    /// ASSISTments 2012-2013: one skill per problem.
    pub fn assist12() -> Self {
        PipelineConfig {
            dataset: "Assist12".to_string(),
            layout: SkillLayout::Single,
            ..PipelineConfig::assist09()
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "assist09" => Some(PipelineConfig::assist09()),
            "assist12" => Some(PipelineConfig::assist12()),
            _ => None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| Path::new(&self.dataset).join("Data"))
    }

    pub fn model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(|| Path::new(&self.dataset).join("Model"))
    }

    pub fn raw_path(&self) -> PathBuf {
        match self.raw_file {
            Some(ref file) => self.data_dir().join(file),
            None => self.data_dir().join(format!("{}_original.csv", self.dataset)),
        }
    }

    pub fn cleaned_path(&self) -> PathBuf {
        match self.cleaned_file {
            Some(ref file) => self.data_dir().join(file),
            None => self.data_dir().join(format!("{}.csv", self.dataset)),
        }
    }

    pub fn data_path(&self, artifact: &str) -> PathBuf {
        self.data_dir().join(artifact)
    }

    /// Path of a named dense-array archive in the model directory.
    pub fn model_archive(&self, name: &str) -> PathBuf {
        self.model_dir().join(format!("{}.json", name))
    }

    /// Path of a named dense-array archive in the data directory.
    pub fn data_archive(&self, name: &str) -> PathBuf {
        self.data_dir().join(format!("{}.json", name))
    }
}

#[cfg(test)]
mod tests {

    use std::path::Path;
    use super::{PipelineConfig, SkillLayout};

    #[test]
    fn presets() {
        let assist09 = PipelineConfig::preset("Assist09").unwrap();
        assert_eq!(assist09.layout, SkillLayout::Multi { delimiter: '_' });
        assert_eq!(assist09.min_student_interactions, 5);

        let assist12 = PipelineConfig::preset("assist12").unwrap();
        assert_eq!(assist12.layout, SkillLayout::Single);
        assert_eq!(assist12.cleaned_path(), Path::new("Assist12/Data/Assist12.csv"));

        assert!(PipelineConfig::preset("junyi").is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{
            "dataset": "Tiny",
            "data_dir": "/tmp/tiny",
            "layout": { "kind": "single" },
            "columns": { "original": null }
        }"#).unwrap();

        assert_eq!(config.layout, SkillLayout::Single);
        assert_eq!(config.columns.student, "user_id");
        assert!(config.columns.original.is_none());
        assert_eq!(config.raw_path(), Path::new("/tmp/tiny/Tiny_original.csv"));
        assert_eq!(config.model_dir(), Path::new("Tiny/Model"));
        assert_eq!(config.embed_dim, 128);
    }
}

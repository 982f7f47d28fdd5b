/**
 * kt-features
 * Copyright (C) 2019 The kt-features authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fmt;
use std::iter;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use tracing::info;

use crate::clean::{self, CleaningRules};
use crate::config::{artifacts, PipelineConfig};
use crate::correlation;
use crate::difficulty;
use crate::error::Result;
use crate::io;
use crate::joint::{self, EmbeddingTable, EntityEmbeddings, TrainTestSplit};
use crate::mastery;
use crate::relations::{self, SkillRelation};
use crate::similarity;
use crate::stats::DataDictionary;
use crate::types::{DenseArray, Incidence, Interaction, SparseMatrix};
use crate::utils;

/// A pipeline stage. Every stage reads its inputs from the artifacts of earlier stages and
/// persists its own outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    Ids,
    Relations,
    Difficulty,
    Mastery,
    Similarity,
    Correlation,
    Joint,
}

impl Stage {

    /// The feature extraction stages in dependency order. Composing joint embeddings
    /// additionally needs externally trained entity embeddings and runs separately.
    pub const FEATURES: [Stage; 7] = [
        Stage::Clean,
        Stage::Ids,
        Stage::Relations,
        Stage::Difficulty,
        Stage::Mastery,
        Stage::Similarity,
        Stage::Correlation,
    ];

    pub fn name(&self) -> &'static str {
        match *self {
            Stage::Clean => "clean",
            Stage::Ids => "ids",
            Stage::Relations => "relations",
            Stage::Difficulty => "difficulty",
            Stage::Mastery => "mastery",
            Stage::Similarity => "similarity",
            Stage::Correlation => "correlation",
            Stage::Joint => "joint",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        Stage::FEATURES.iter()
            .chain(iter::once(&Stage::Joint))
            .find(|stage| stage.name() == name)
            .cloned()
            .ok_or_else(|| format!("Unknown stage '{}'", name))
    }
}

fn require_all(stage: Stage, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        io::require(stage.name(), path)?;
    }
    Ok(())
}

fn load_cleaned(stage: Stage, config: &PipelineConfig) -> Result<Vec<Interaction>> {
    let path = config.cleaned_path();
    io::require(stage.name(), &path)?;
    io::read_interactions(&path)
}

fn load_dictionary(stage: Stage, config: &PipelineConfig) -> Result<DataDictionary> {
    require_all(stage, &[
        config.data_path(artifacts::PRO_ID_DICT),
        config.data_path(artifacts::STU_ID_DICT),
    ])?;
    DataDictionary::load(&config.data_dir())
}

fn load_relation(stage: Stage, config: &PipelineConfig) -> Result<SkillRelation> {
    require_all(stage, &[
        config.data_path(artifacts::SKILL_ID_DICT),
        config.data_path(artifacts::PRO_SKILL_DICT),
    ])?;
    if config.layout.is_multi() {
        io::require(stage.name(), &config.data_path(artifacts::MAX_SKILL_LEN))?;
    }
    SkillRelation::load(&config.data_dir(), config.layout)
}

fn load_embeddings(stage: Stage, config: &PipelineConfig) -> Result<EntityEmbeddings> {

    let table = |kind: &'static str, name: &str| -> Result<EmbeddingTable> {
        let path = config.model_archive(name);
        io::require(stage.name(), &path)?;
        EmbeddingTable::new(kind, io::read_archive(&path, name)?, config.embed_dim)
    };

    Ok(EntityEmbeddings {
        students: table("student", artifacts::FINAL_STU_EMBED)?,
        problems: table("problem", artifacts::FINAL_PRO_EMBED)?,
        skills: table("skill", artifacts::FINAL_SKILL_EMBED)?,
    })
}

/// Runs a single stage.
pub fn run(stage: Stage, config: &PipelineConfig) -> Result<()> {

    let start = Instant::now();
    info!("Running stage '{}' for dataset {}", stage, config.dataset);

    match stage {
        Stage::Clean => {
            let raw_path = config.raw_path();
            io::require(stage.name(), &raw_path)?;

            let mut reader = io::csv_reader(&raw_path)?;
            let records = clean::read_raw(&mut reader, &config.columns)?;
            let cleaned = clean::clean(records, &CleaningRules::from(config));

            io::write_interactions(&config.cleaned_path(), &cleaned)?;
        },
        Stage::Ids => {
            let interactions = load_cleaned(stage, config)?;
            let data_dict = DataDictionary::from(interactions.as_slice());

            info!("Found {} interactions between {} students and {} problems.",
                interactions.len(), data_dict.num_students(), data_dict.num_problems());

            data_dict.save(&config.data_dir())?;
        },
        Stage::Relations => {
            let interactions = load_cleaned(stage, config)?;
            let data_dict = load_dictionary(stage, config)?;

            let relation = relations::extract(
                &interactions, &data_dict, config.layout, config.strict_skill_tagging)?;

            relation.save(&config.data_dir())?;
        },
        Stage::Difficulty => {
            let interactions = load_cleaned(stage, config)?;
            let data_dict = load_dictionary(stage, config)?;

            let difficulty = difficulty::problem_difficulty(
                &interactions, &data_dict, config.difficulty_epsilon)?;

            io::write_sparse(
                &config.data_path(artifacts::PRO_DIFF_SPARSE),
                &SparseMatrix::from_dense_row(&difficulty))?;
        },
        Stage::Mastery => {
            let interactions = load_cleaned(stage, config)?;
            let data_dict = load_dictionary(stage, config)?;
            let relation = load_relation(stage, config)?;

            let mastery = mastery::estimate(&interactions, &data_dict, &relation)?;

            io::write_sparse(&config.data_path(artifacts::STU_SKILL_SPARSE), &mastery.matrix())?;
            io::write_sparse(
                &config.data_path(artifacts::SKILL_DIFF_SPARSE),
                &SparseMatrix::from_dense_row(&mastery.skill_difficulty()))?;
        },
        Stage::Similarity => {
            let incidence_path = config.data_path(artifacts::PRO_SKILL_SPARSE);
            io::require(stage.name(), &incidence_path)?;

            let incidence = Incidence::from_coo(&io::read_sparse(&incidence_path)?);

            io::write_sparse(
                &config.data_path(artifacts::PRO_PRO_SPARSE),
                &similarity::problem_similarity(&incidence))?;
            io::write_sparse(
                &config.data_path(artifacts::SKILL_SKILL_SPARSE),
                &similarity::skill_similarity(&incidence))?;
        },
        Stage::Correlation => {
            let interactions = load_cleaned(stage, config)?;
            let data_dict = load_dictionary(stage, config)?;
            let relation = load_relation(stage, config)?;

            let tuples = correlation::extract(&interactions, &data_dict, &relation)?;
            let array = correlation::to_array(&tuples, relation.max_skill_len)?;

            io::write_archive(
                &config.data_archive(artifacts::STU_PRO_SKILL_CORR),
                artifacts::STU_PRO_SKILL_CORR,
                &array)?;
        },
        Stage::Joint => {
            let tuples_path = config.data_archive(artifacts::STU_PRO_SKILL_CORR);
            io::require(stage.name(), &tuples_path)?;

            let array: DenseArray<i64> = io::read_archive(&tuples_path, artifacts::STU_PRO_SKILL_CORR)?;
            let (tuples, max_skill_len) = correlation::from_array(&array)?;
            let embeddings = load_embeddings(stage, config)?;

            let joint = joint::compose(&tuples, &embeddings, max_skill_len)?;

            let split = TrainTestSplit::new(joint.labels.num_rows(), config.split_rate);
            info!("{} interactions, {} for training and {} for testing at split rate {}",
                split.num_rows, split.train().len(), split.test().len(), config.split_rate);

            io::write_archive(
                &config.model_archive(artifacts::FINAL_JOINT_EMBED),
                artifacts::FINAL_JOINT_EMBED,
                &joint.features)?;
            io::write_archive(
                &config.model_archive(artifacts::FINAL_TRUE_CORR),
                artifacts::FINAL_TRUE_CORR,
                &joint.labels)?;
        },
    }

    info!("Stage '{}' finished ({}ms)", stage, utils::to_millis(start.elapsed()));

    Ok(())
}

/// Runs every feature extraction stage in order, each one reading what the previous ones
/// persisted.
pub fn run_features(config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();

    for stage in Stage::FEATURES.iter() {
        run(*stage, config)?;
    }

    info!("Feature extraction for {} finished ({}ms)",
        config.dataset, utils::to_millis(start.elapsed()));

    Ok(())
}

#[cfg(test)]
mod tests {

    use tempfile::tempdir;

    use crate::config::PipelineConfig;
    use crate::error::PipelineError;
    use crate::pipeline::{self, Stage};

    #[test]
    fn stage_names() {
        for stage in Stage::FEATURES.iter() {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), *stage);
        }
        assert_eq!("joint".parse::<Stage>().unwrap(), Stage::Joint);
        assert!("train".parse::<Stage>().is_err());
    }

    #[test]
    fn missing_upstream_artifact() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..PipelineConfig::assist12()
        };

        match pipeline::run(Stage::Similarity, &config) {
            Err(PipelineError::MissingArtifact { stage, path }) => {
                assert_eq!(stage, "similarity");
                assert_eq!(path, dir.path().join("pro_skill_sparse.json"));
            },
            other => panic!("unexpected result {:?}", other),
        }
    }
}

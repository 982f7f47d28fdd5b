use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde_derive::Deserialize;
use tracing::{info, warn};

use crate::config::{artifacts, SkillLayout};
use crate::error::{PipelineError, Result};
use crate::io;
use crate::stats::{DataDictionary, Dictionary};
use crate::types::{Interaction, ProblemSkills, SparseMatrix};
use crate::utils;

/// The problem-skill relation: dense skill ids, the ordered skills of every problem and the
/// length of the longest skill list.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillRelation {
    pub layout: SkillLayout,
    pub skills: Dictionary,
    pub problem_skills: ProblemSkills,
    pub max_skill_len: usize,
}

/// Splits a skill field into its distinct tokens, keeping the order of first occurrence.
pub fn skill_tokens(field: &str, layout: SkillLayout) -> Vec<&str> {
    match layout {
        SkillLayout::Single => {
            let token = field.trim();
            if token.is_empty() { Vec::new() } else { vec![token] }
        },
        SkillLayout::Multi { delimiter } => {
            let mut tokens: Vec<&str> = Vec::new();
            for token in field.split(delimiter).map(|token| token.trim()) {
                if !token.is_empty() && !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
            tokens
        },
    }
}

fn same_skills(first: &str, later: &str, layout: SkillLayout) -> bool {
    let mut first = skill_tokens(first, layout);
    let mut later = skill_tokens(later, layout);
    first.sort_unstable();
    later.sort_unstable();
    first == later
}

/// Derives the skills of every problem from the first row in which the problem occurs. Later
/// rows of the same problem are not consulted for tagging; if they disagree, `strict` turns
/// that into an error, otherwise the disagreement is only counted and logged.
pub fn extract(
    interactions: &[Interaction],
    data_dict: &DataDictionary,
    layout: SkillLayout,
    strict: bool,
) -> Result<SkillRelation> {

    let start = Instant::now();

    let mut skills = Dictionary::new();
    let mut problem_skills: ProblemSkills = vec![Vec::new(); data_dict.num_problems()];
    let mut first_rows: Vec<Option<usize>> = vec![None; data_dict.num_problems()];
    let mut max_skill_len = 0;
    let mut num_disagreements = 0;

    for (row, interaction) in interactions.iter().enumerate() {

        let problem = data_dict.problem_index(&interaction.problem)? as usize;

        match first_rows[problem] {
            None => {
                first_rows[problem] = Some(row);

                let tokens = skill_tokens(&interaction.skill, layout);
                if tokens.is_empty() {
                    return Err(PipelineError::InvalidField {
                        line: row as u64 + 2,
                        column: "skill_id".to_string(),
                        value: interaction.skill.clone(),
                    });
                }

                max_skill_len = max_skill_len.max(tokens.len());
                problem_skills[problem] = tokens.into_iter()
                    .map(|token| skills.insert(token))
                    .collect();
            },
            Some(first_row) => {
                let first = &interactions[first_row].skill;
                if !same_skills(first, &interaction.skill, layout) {
                    if strict {
                        return Err(PipelineError::InconsistentSkillTagging {
                            problem: interaction.problem.clone(),
                            first: first.clone(),
                            later: interaction.skill.clone(),
                        });
                    }
                    num_disagreements += 1;
                }
            },
        }
    }

    if let Some(untagged) = first_rows.iter().position(|row| row.is_none()) {
        return Err(PipelineError::DataIntegrity {
            kind: "problem",
            raw_id: data_dict.problems().name(untagged as u32).to_string(),
        });
    }

    if num_disagreements > 0 {
        warn!("{} rows disagree with the skills of their problem's first row, kept the first tagging",
            num_disagreements);
    }

    info!("Tagged {} problems with {} skills, at most {} skills per problem ({}ms)",
        problem_skills.len(), skills.len(), max_skill_len, utils::to_millis(start.elapsed()));

    Ok(SkillRelation { layout, skills, problem_skills, max_skill_len })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkillEntry {
    One(u32),
    Many(Vec<u32>),
}

impl SkillRelation {

    pub fn num_problems(&self) -> usize {
        self.problem_skills.len()
    }

    pub fn num_skills(&self) -> usize {
        self.skills.len()
    }

    /// The 0/1 problem-skill incidence matrix, entries in row-major order.
    pub fn incidence(&self) -> SparseMatrix {
        let mut matrix = SparseMatrix::new(self.num_problems(), self.num_skills());

        for (problem, skills) in self.problem_skills.iter().enumerate() {
            let mut sorted = skills.clone();
            sorted.sort_unstable();
            for skill in sorted {
                matrix.push(problem as u32, skill, 1.0);
            }
        }

        matrix
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {

        io::write_literal(&data_dir.join(artifacts::NUM_SKILL), &self.num_skills())?;
        io::write_literal(&data_dir.join(artifacts::SKILL_ID_DICT), &self.skills)?;

        let pro_skill_dict_path = data_dir.join(artifacts::PRO_SKILL_DICT);

        if self.layout.is_multi() {
            let pro_skill_dict: BTreeMap<u32, &Vec<u32>> = self.problem_skills.iter()
                .enumerate()
                .map(|(problem, skills)| (problem as u32, skills))
                .collect();
            io::write_literal(&pro_skill_dict_path, &pro_skill_dict)?;
            io::write_literal(&data_dir.join(artifacts::MAX_SKILL_LEN), &self.max_skill_len)?;
        } else {
            let pro_skill_dict: BTreeMap<u32, u32> = self.problem_skills.iter()
                .enumerate()
                .map(|(problem, skills)| (problem as u32, skills[0]))
                .collect();
            io::write_literal(&pro_skill_dict_path, &pro_skill_dict)?;
        }

        io::write_sparse(&data_dir.join(artifacts::PRO_SKILL_SPARSE), &self.incidence())
    }

    pub fn load(data_dir: &Path, layout: SkillLayout) -> Result<Self> {

        let skills = Dictionary::load(&data_dir.join(artifacts::SKILL_ID_DICT), "skill")?;

        let pro_skill_dict: BTreeMap<u32, SkillEntry> =
            io::read_literal(&data_dir.join(artifacts::PRO_SKILL_DICT))?;

        let mut problem_skills: ProblemSkills = Vec::with_capacity(pro_skill_dict.len());

        for (problem, entry) in pro_skill_dict.into_iter() {
            if problem as usize != problem_skills.len() {
                return Err(PipelineError::DataIntegrity {
                    kind: "problem",
                    raw_id: problem_skills.len().to_string(),
                });
            }

            let tagged = match entry {
                SkillEntry::One(skill) => vec![skill],
                SkillEntry::Many(skills) => skills,
            };

            if let Some(unknown) = tagged.iter().find(|skill| **skill as usize >= skills.len()) {
                return Err(PipelineError::DataIntegrity { kind: "skill", raw_id: unknown.to_string() });
            }

            problem_skills.push(tagged);
        }

        let max_skill_len = if layout.is_multi() {
            io::read_literal(&data_dir.join(artifacts::MAX_SKILL_LEN))?
        } else {
            1
        };

        Ok(SkillRelation { layout, skills, problem_skills, max_skill_len })
    }
}

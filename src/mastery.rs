use std::time::Instant;

use fnv::FnvHashMap;
use tracing::info;

use crate::difficulty;
use crate::error::{PipelineError, Result};
use crate::relations::SkillRelation;
use crate::stats::DataDictionary;
use crate::types::{DenseVector, Interaction, SparseMatrix};
use crate::utils;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AttemptCounts {
    correct: u32,
    total: u32,
}

/// Correct and total attempts per (student, skill). Only attempted pairs are stored; all
/// others have mastery 0.
#[derive(Debug, Clone)]
pub struct Mastery {
    num_students: usize,
    num_skills: usize,
    attempts: FnvHashMap<(u32, u32), AttemptCounts>,
    skill_correct: Vec<u32>,
    skill_total: Vec<u32>,
}

/// Counts every interaction once for each skill of its problem.
pub fn estimate(
    interactions: &[Interaction],
    data_dict: &DataDictionary,
    relation: &SkillRelation,
) -> Result<Mastery> {

    let start = Instant::now();

    let num_skills = relation.num_skills();
    let mut attempts: FnvHashMap<(u32, u32), AttemptCounts> = FnvHashMap::default();
    let mut skill_correct = vec![0; num_skills];
    let mut skill_total = vec![0; num_skills];

    for interaction in interactions {

        let student = data_dict.student_index(&interaction.student)?;
        let problem = data_dict.problem_index(&interaction.problem)?;

        let skills = relation.problem_skills.get(problem as usize)
            .ok_or_else(|| PipelineError::DataIntegrity {
                kind: "problem",
                raw_id: interaction.problem.clone(),
            })?;

        for skill in skills.iter() {
            let counts = attempts.entry((student, *skill)).or_insert_with(AttemptCounts::default);

            counts.total += 1;
            skill_total[*skill as usize] += 1;

            if interaction.is_correct() {
                counts.correct += 1;
                skill_correct[*skill as usize] += 1;
            }
        }
    }

    info!("Counted attempts for {} student-skill pairs ({}ms)",
        attempts.len(), utils::to_millis(start.elapsed()));

    Ok(Mastery {
        num_students: data_dict.num_students(),
        num_skills,
        attempts,
        skill_correct,
        skill_total,
    })
}

impl Mastery {

    /// Ratio of correct to total attempts, 0 if the student never attempted the skill.
    pub fn mastery(&self, student: u32, skill: u32) -> f64 {
        self.attempts.get(&(student, skill))
            .map(|counts| utils::ratio(counts.correct, counts.total))
            .unwrap_or(0.0)
    }

    pub fn num_attempted_pairs(&self) -> usize {
        self.attempts.len()
    }

    /// The (num_students x num_skills) mastery matrix with its non-zero entries in row-major
    /// order.
    pub fn matrix(&self) -> SparseMatrix {
        let mut pairs: Vec<&(u32, u32)> = self.attempts.keys().collect();
        pairs.sort_unstable();

        let mut matrix = SparseMatrix::new(self.num_students, self.num_skills);
        for &&(student, skill) in pairs.iter() {
            let mastery = self.mastery(student, skill);
            if mastery != 0.0 {
                matrix.push(student, skill, mastery);
            }
        }

        matrix
    }

    /// Share of correct attempts per skill over all students.
    pub fn skill_difficulty(&self) -> DenseVector {
        difficulty::skill_difficulty(&self.skill_correct, &self.skill_total)
    }
}

#[cfg(test)]
mod tests {

    use crate::config::SkillLayout;
    use crate::error::PipelineError;
    use crate::mastery;
    use crate::relations;
    use crate::stats::DataDictionary;
    use crate::types::Interaction;

    fn interaction(student: &str, problem: &str, skill: &str, correct: u8) -> Interaction {
        Interaction {
            student: student.to_string(),
            problem: problem.to_string(),
            skill: skill.to_string(),
            correct,
            response_time: 1.0,
        }
    }

    fn estimate(interactions: &[Interaction]) -> mastery::Mastery {
        let data_dict = DataDictionary::from(interactions);
        let layout = SkillLayout::Multi { delimiter: '_' };
        let relation = relations::extract(interactions, &data_dict, layout, false).unwrap();
        mastery::estimate(interactions, &data_dict, &relation).unwrap()
    }

    #[test]
    fn one_of_two_attempts_correct() {
        let interactions = vec![
            interaction("alice", "p1", "S", 1),
            interaction("alice", "p2", "S", 0),
            interaction("bob", "p3", "T", 0),
        ];

        let mastery = estimate(&interactions);

        assert_eq!(mastery.mastery(0, 0), 0.5);
        // bob never attempted S, alice never attempted T
        assert_eq!(mastery.mastery(1, 0), 0.0);
        assert_eq!(mastery.mastery(0, 1), 0.0);
        assert_eq!(mastery.skill_difficulty(), vec![0.5, 0.0]);
    }

    #[test]
    fn every_skill_of_a_problem_is_counted() {
        let interactions = vec![
            interaction("alice", "p1", "x_y", 1),
            interaction("alice", "p2", "y", 0),
        ];

        let mastery = estimate(&interactions);

        assert_eq!(mastery.mastery(0, 0), 1.0);
        assert_eq!(mastery.mastery(0, 1), 0.5);
        assert_eq!(mastery.num_attempted_pairs(), 2);
    }

    #[test]
    fn matrix_is_bounded_and_sparse() {
        let interactions = vec![
            interaction("alice", "p1", "x", 1),
            interaction("bob", "p1", "x", 0),
            interaction("bob", "p2", "y", 1),
            interaction("carol", "p2", "y", 1),
            interaction("carol", "p2", "y", 0),
        ];

        let matrix = estimate(&interactions).matrix();

        assert_eq!(matrix.shape, (3, 2));
        assert_eq!(matrix.row, vec![0, 1, 2]);
        assert_eq!(matrix.col, vec![0, 1, 1]);
        assert_eq!(matrix.data, vec![1.0, 1.0, 0.5]);
        assert!(matrix.to_dense().iter().all(|value| value.is_finite() && *value >= 0.0 && *value <= 1.0));
    }

    #[test]
    fn relation_from_an_older_table_is_rejected() {
        let old_table = vec![interaction("alice", "p1", "x", 1)];
        let old_dict = DataDictionary::from(&old_table[..]);
        let relation = relations::extract(&old_table, &old_dict, SkillLayout::Single, false).unwrap();

        let table = vec![
            interaction("alice", "p1", "x", 1),
            interaction("alice", "p2", "y", 0),
        ];
        let data_dict = DataDictionary::from(&table[..]);

        match mastery::estimate(&table, &data_dict, &relation) {
            Err(PipelineError::DataIntegrity { kind, raw_id }) => {
                assert_eq!(kind, "problem");
                assert_eq!(raw_id, "p2");
            },
            other => panic!("expected a data integrity error, got {:?}", other.map(|_| ())),
        }
    }
}

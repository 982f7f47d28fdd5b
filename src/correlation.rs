use std::time::Instant;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::relations::SkillRelation;
use crate::stats::DataDictionary;
use crate::types::{DenseArray, Interaction};
use crate::utils;

/// Columns preceding the skill columns in the persisted array.
const FIXED_COLUMNS: usize = 3;
/// Marks unused skill slots in the persisted array.
const NO_SKILL: i64 = -1;

/// An interaction in dense id space.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionTuple {
    pub student: u32,
    pub problem: u32,
    pub skills: Vec<u32>,
    pub correct: u8,
}

/// Remaps every interaction to dense ids, keeping the order of the cleaned table. Downstream
/// train/test splits are positional, so the order must not change.
pub fn extract(
    interactions: &[Interaction],
    data_dict: &DataDictionary,
    relation: &SkillRelation,
) -> Result<Vec<InteractionTuple>> {

    let start = Instant::now();
    let mut tuples = Vec::with_capacity(interactions.len());

    for interaction in interactions {
        let student = data_dict.student_index(&interaction.student)?;
        let problem = data_dict.problem_index(&interaction.problem)?;

        let skills = relation.problem_skills.get(problem as usize)
            .ok_or_else(|| PipelineError::DataIntegrity {
                kind: "problem",
                raw_id: interaction.problem.clone(),
            })?
            .clone();

        tuples.push(InteractionTuple { student, problem, skills, correct: interaction.correct });
    }

    info!("Remapped {} interactions to dense ids ({}ms)",
        tuples.len(), utils::to_millis(start.elapsed()));

    Ok(tuples)
}

/// Packs tuples into an (n x (3 + max_skill_len)) array with columns student, problem,
/// correctness and the skill ids padded with -1.
pub fn to_array(tuples: &[InteractionTuple], max_skill_len: usize) -> Result<DenseArray<i64>> {

    let width = FIXED_COLUMNS + max_skill_len;
    let mut data = Vec::with_capacity(tuples.len() * width);

    for tuple in tuples {
        if tuple.skills.len() > max_skill_len {
            return Err(PipelineError::ShapeMismatch {
                artifact: "interaction skill columns".to_string(),
                expected: max_skill_len,
                found: tuple.skills.len(),
            });
        }

        data.push(tuple.student as i64);
        data.push(tuple.problem as i64);
        data.push(tuple.correct as i64);
        data.extend(tuple.skills.iter().map(|skill| *skill as i64));
        data.extend((tuple.skills.len()..max_skill_len).map(|_| NO_SKILL));
    }

    Ok(DenseArray::matrix(tuples.len(), width, data))
}

/// Unpacks an array written by `to_array`. Returns the tuples and the number of skill columns.
pub fn from_array(array: &DenseArray<i64>) -> Result<(Vec<InteractionTuple>, usize)> {

    if array.shape.len() != 2 || array.num_cols() <= FIXED_COLUMNS {
        return Err(PipelineError::ShapeMismatch {
            artifact: "interaction array columns".to_string(),
            expected: FIXED_COLUMNS + 1,
            found: array.num_cols(),
        });
    }

    let id = |value: i64, kind: &'static str| {
        if value < 0 || value > u32::max_value() as i64 {
            Err(PipelineError::DataIntegrity { kind, raw_id: value.to_string() })
        } else {
            Ok(value as u32)
        }
    };

    let mut tuples = Vec::with_capacity(array.num_rows());

    for index in 0..array.num_rows() {
        let row = array.row(index);

        let skills = row[FIXED_COLUMNS..].iter()
            .filter(|skill| **skill != NO_SKILL)
            .map(|skill| id(*skill, "skill"))
            .collect::<Result<Vec<u32>>>()?;

        let correct = match row[2] {
            0 => 0,
            1 => 1,
            other => return Err(PipelineError::DataIntegrity {
                kind: "correctness",
                raw_id: other.to_string(),
            }),
        };

        tuples.push(InteractionTuple {
            student: id(row[0], "student")?,
            problem: id(row[1], "problem")?,
            skills,
            correct,
        });
    }

    Ok((tuples, array.num_cols() - FIXED_COLUMNS))
}

#[cfg(test)]
mod tests {

    use crate::config::SkillLayout;
    use crate::correlation::{self, InteractionTuple};
    use crate::error::PipelineError;
    use crate::relations;
    use crate::stats::DataDictionary;
    use crate::types::{DenseArray, Interaction};

    const MULTI: SkillLayout = SkillLayout::Multi { delimiter: '_' };

    fn interaction(student: &str, problem: &str, skill: &str, correct: u8) -> Interaction {
        Interaction {
            student: student.to_string(),
            problem: problem.to_string(),
            skill: skill.to_string(),
            correct,
            response_time: 1.0,
        }
    }

    fn interactions() -> Vec<Interaction> {
        vec![
            interaction("s7", "A", "x_y", 1),
            interaction("s3", "B", "y", 0),
            interaction("s7", "B", "y", 1),
            interaction("s3", "A", "x_y", 0),
        ]
    }

    #[test]
    fn tuples_keep_table_order() {
        let interactions = interactions();
        let data_dict = DataDictionary::from(interactions.as_slice());
        let relation = relations::extract(&interactions, &data_dict, MULTI, false).unwrap();

        let tuples = correlation::extract(&interactions, &data_dict, &relation).unwrap();

        assert_eq!(tuples, vec![
            InteractionTuple { student: 0, problem: 0, skills: vec![0, 1], correct: 1 },
            InteractionTuple { student: 1, problem: 1, skills: vec![1], correct: 0 },
            InteractionTuple { student: 0, problem: 1, skills: vec![1], correct: 1 },
            InteractionTuple { student: 1, problem: 0, skills: vec![0, 1], correct: 0 },
        ]);
    }

    #[test]
    fn stale_dictionaries_are_fatal() {
        let interactions = interactions();
        let data_dict = DataDictionary::from(&interactions[..2]);
        let relation = relations::extract(&interactions[..2], &data_dict, MULTI, false).unwrap();

        let mut later = interactions.clone();
        later.push(interaction("s9", "A", "x_y", 1));

        match correlation::extract(&later, &data_dict, &relation) {
            Err(PipelineError::DataIntegrity { kind, raw_id }) => {
                assert_eq!(kind, "student");
                assert_eq!(raw_id, "s9");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn array_pads_missing_skills() {
        let tuples = vec![
            InteractionTuple { student: 2, problem: 5, skills: vec![3, 1], correct: 1 },
            InteractionTuple { student: 0, problem: 4, skills: vec![2], correct: 0 },
        ];

        let array = correlation::to_array(&tuples, 2).unwrap();

        assert_eq!(array.shape, vec![2, 5]);
        assert_eq!(array.row(1), &[0, 4, 0, 2, -1]);

        let (unpacked, max_skill_len) = correlation::from_array(&array).unwrap();
        assert_eq!(unpacked, tuples);
        assert_eq!(max_skill_len, 2);

        assert!(correlation::to_array(&tuples, 1).is_err());
    }

    #[test]
    fn correctness_outside_zero_and_one_is_rejected() {
        let array = DenseArray::matrix(1, 4, vec![0, 0, 2, 0]);

        match correlation::from_array(&array) {
            Err(PipelineError::DataIntegrity { kind, raw_id }) => {
                assert_eq!(kind, "correctness");
                assert_eq!(raw_id, "2");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn narrow_arrays_are_rejected() {
        let array = DenseArray::matrix(1, 3, vec![0, 0, 1]);
        assert!(correlation::from_array(&array).is_err());
    }
}

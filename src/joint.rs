use std::ops::Range;
use std::time::Instant;

use tracing::info;

use crate::correlation::InteractionTuple;
use crate::error::{PipelineError, Result};
use crate::types::DenseArray;
use crate::utils;

/// Externally trained vectors for one kind of entity, addressed by dense id.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    kind: &'static str,
    vectors: DenseArray<f64>,
}

impl EmbeddingTable {

    /// Wraps an (N x D) array, failing if D differs from `embed_dim`.
    pub fn new(kind: &'static str, vectors: DenseArray<f64>, embed_dim: usize) -> Result<Self> {
        if vectors.shape.len() != 2 || vectors.num_cols() != embed_dim {
            return Err(PipelineError::ShapeMismatch {
                artifact: format!("{} embedding dimension", kind),
                expected: embed_dim,
                found: vectors.num_cols(),
            });
        }

        Ok(EmbeddingTable { kind, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dim(&self) -> usize {
        self.vectors.num_cols()
    }

    pub fn vector(&self, id: u32) -> Result<&[f64]> {
        if id as usize >= self.len() {
            return Err(PipelineError::DataIntegrity { kind: self.kind, raw_id: id.to_string() });
        }
        Ok(self.vectors.row(id as usize))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityEmbeddings {
    pub students: EmbeddingTable,
    pub problems: EmbeddingTable,
    pub skills: EmbeddingTable,
}

/// Feature matrix of shape (n x (1 + max_skill_len)) and the parallel correctness labels.
#[derive(Debug, Clone, PartialEq)]
pub struct JointEmbedding {
    pub features: DenseArray<f64>,
    pub labels: DenseArray<u8>,
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// For each interaction, multiplies the student vector with the transpose of the problem
/// vector stacked on top of the skill vectors. Skill slots beyond the problem's own skills
/// hold zero vectors and therefore contribute 0.
pub fn compose(
    tuples: &[InteractionTuple],
    embeddings: &EntityEmbeddings,
    max_skill_len: usize,
) -> Result<JointEmbedding> {

    let start = Instant::now();

    let dim = embeddings.students.dim();
    for table in [&embeddings.problems, &embeddings.skills].iter() {
        if table.dim() != dim {
            return Err(PipelineError::ShapeMismatch {
                artifact: format!("{} embedding dimension", table.kind),
                expected: dim,
                found: table.dim(),
            });
        }
    }

    let width = 1 + max_skill_len;
    let mut features = Vec::with_capacity(tuples.len() * width);
    let mut labels = Vec::with_capacity(tuples.len());

    for tuple in tuples {
        if tuple.skills.len() > max_skill_len {
            return Err(PipelineError::ShapeMismatch {
                artifact: "joint embedding skill slots".to_string(),
                expected: max_skill_len,
                found: tuple.skills.len(),
            });
        }

        let student = embeddings.students.vector(tuple.student)?;
        let problem = embeddings.problems.vector(tuple.problem)?;

        features.push(dot(student, problem));
        for skill in tuple.skills.iter() {
            features.push(dot(student, embeddings.skills.vector(*skill)?));
        }
        features.extend((tuple.skills.len()..max_skill_len).map(|_| 0.0));

        labels.push(tuple.correct);
    }

    info!("Composed {} joint embeddings of width {} from {}-dimensional vectors ({}ms)",
        labels.len(), width, dim, utils::to_millis(start.elapsed()));

    Ok(JointEmbedding {
        features: DenseArray::matrix(tuples.len(), width, features),
        labels: DenseArray::vector(labels),
    })
}

/// Positional split of the interactions: the first `split_point` rows train, the rest test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainTestSplit {
    pub split_point: usize,
    pub num_rows: usize,
}

impl TrainTestSplit {

    pub fn new(num_rows: usize, split_rate: f64) -> Self {
        let rate = split_rate.max(0.0).min(1.0);
        let split_point = (num_rows as f64 * rate).floor() as usize;
        TrainTestSplit { split_point: split_point.min(num_rows), num_rows }
    }

    pub fn train(&self) -> Range<usize> {
        0..self.split_point
    }

    pub fn test(&self) -> Range<usize> {
        self.split_point..self.num_rows
    }
}

#[cfg(test)]
mod tests {

    use crate::correlation::InteractionTuple;
    use crate::error::PipelineError;
    use crate::joint::{self, EmbeddingTable, EntityEmbeddings, TrainTestSplit};
    use crate::types::DenseArray;

    fn embeddings() -> EntityEmbeddings {
        EntityEmbeddings {
            students: EmbeddingTable::new("student", DenseArray::matrix(2, 2, vec![1.0, 2.0, 0.5, 0.5]), 2).unwrap(),
            problems: EmbeddingTable::new("problem", DenseArray::matrix(1, 2, vec![3.0, 4.0]), 2).unwrap(),
            skills: EmbeddingTable::new("skill", DenseArray::matrix(2, 2, vec![1.0, 0.0, 0.0, 1.0]), 2).unwrap(),
        }
    }

    #[test]
    fn student_times_stacked_problem_and_skills() {
        let tuples = vec![
            InteractionTuple { student: 0, problem: 0, skills: vec![0, 1], correct: 1 },
            InteractionTuple { student: 1, problem: 0, skills: vec![1], correct: 0 },
        ];

        let joint = joint::compose(&tuples, &embeddings(), 2).unwrap();

        assert_eq!(joint.features.shape, vec![2, 3]);
        assert_eq!(joint.features.row(0), &[11.0, 1.0, 2.0]);
        // Missing skill slot is zero padded
        assert_eq!(joint.features.row(1), &[3.5, 0.5, 0.0]);
        assert_eq!(joint.labels.data, vec![1, 0]);
    }

    #[test]
    fn single_skill_width() {
        let tuples = vec![InteractionTuple { student: 0, problem: 0, skills: vec![1], correct: 1 }];
        let joint = joint::compose(&tuples, &embeddings(), 1).unwrap();

        assert_eq!(joint.features.shape, vec![1, 2]);
        assert_eq!(joint.features.row(0), &[11.0, 2.0]);
    }

    #[test]
    fn embedding_dimension_must_match() {
        let vectors = DenseArray::matrix(1, 3, vec![1.0, 2.0, 3.0]);

        match EmbeddingTable::new("problem", vectors, 2) {
            Err(PipelineError::ShapeMismatch { expected, found, .. }) => {
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn ids_without_vectors_are_rejected() {
        let tuples = vec![InteractionTuple { student: 0, problem: 1, skills: vec![0], correct: 1 }];

        match joint::compose(&tuples, &embeddings(), 1) {
            Err(PipelineError::DataIntegrity { kind, raw_id }) => {
                assert_eq!(kind, "problem");
                assert_eq!(raw_id, "1");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn positional_split() {
        let split = TrainTestSplit::new(10, 0.7);
        assert_eq!(split.train(), 0..7);
        assert_eq!(split.test(), 7..10);

        assert_eq!(TrainTestSplit::new(3, 1.5).test(), 3..3);
    }
}

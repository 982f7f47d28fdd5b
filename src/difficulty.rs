use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::stats::DataDictionary;
use crate::types::{DenseVector, Interaction};
use crate::utils;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ProblemStats {
    total: u32,
    correct: u32,
    correct_time: f64,
}

impl ProblemStats {

    fn accuracy(&self) -> f64 {
        utils::ratio(self.correct, self.total)
    }

    /// Mean response time over correct answers, 0 if the problem was never answered correctly.
    fn mean_correct_time(&self) -> f64 {
        if self.correct == 0 {
            0.0
        } else {
            self.correct_time / self.correct as f64
        }
    }
}

/// Difficulty score in [0, 1] per dense problem id.
///
/// Accuracy is divided by the min-max normalised mean time of correct answers (plus
/// `epsilon`), and the quotient is min-max normalised again. Columns without range normalise
/// to 0.
pub fn problem_difficulty(
    interactions: &[Interaction],
    data_dict: &DataDictionary,
    epsilon: f64,
) -> Result<DenseVector> {

    let start = Instant::now();

    let mut stats = vec![ProblemStats::default(); data_dict.num_problems()];

    for interaction in interactions {
        let problem = data_dict.problem_index(&interaction.problem)? as usize;
        let problem_stats = &mut stats[problem];

        problem_stats.total += 1;
        if interaction.is_correct() {
            problem_stats.correct += 1;
            problem_stats.correct_time += interaction.response_time;
        }
    }

    let mean_times: Vec<f64> = stats.iter().map(ProblemStats::mean_correct_time).collect();
    let normalized_times = utils::min_max_normalize(&mean_times, "mean correct response time");

    let raw_scores: Vec<f64> = stats.iter()
        .zip(normalized_times.iter())
        .map(|(problem_stats, time)| problem_stats.accuracy() / (time + epsilon))
        .collect();

    let difficulty = utils::min_max_normalize(&raw_scores, "problem difficulty");

    info!("Computed difficulty of {} problems ({}ms)",
        difficulty.len(), utils::to_millis(start.elapsed()));

    Ok(difficulty)
}

/// Accuracy per skill over all students, 0 for skills nobody attempted.
pub fn skill_difficulty(correct: &[u32], total: &[u32]) -> DenseVector {
    correct.iter()
        .zip(total.iter())
        .map(|(correct, total)| utils::ratio(*correct, *total))
        .collect()
}

#[cfg(test)]
mod tests {

    use std::f64::EPSILON;

    use crate::difficulty;
    use crate::stats::DataDictionary;
    use crate::types::Interaction;

    fn interaction(problem: &str, correct: u8, response_time: f64) -> Interaction {
        Interaction {
            student: "s".to_string(),
            problem: problem.to_string(),
            skill: "x".to_string(),
            correct,
            response_time,
        }
    }

    fn difficulty_of(interactions: &[Interaction]) -> Vec<f64> {
        let data_dict = DataDictionary::from(interactions);
        difficulty::problem_difficulty(interactions, &data_dict, 1e-4).unwrap()
    }

    #[test]
    fn accuracy_over_speed() {
        let interactions = vec![
            interaction("p0", 1, 2.0),
            interaction("p0", 0, 5.0),
            interaction("p1", 1, 4.0),
            interaction("p1", 1, 6.0),
            interaction("p2", 0, 3.0),
        ];

        let difficulty = difficulty_of(&interactions);

        assert_eq!(difficulty.len(), 3);
        assert!((difficulty[0] - 1.0).abs() < EPSILON);
        assert!(difficulty[1] > 0.0 && difficulty[1] < 1.0);
        assert_eq!(difficulty[2], 0.0);
    }

    #[test]
    fn identical_mean_times_do_not_produce_nan() {
        let interactions = vec![
            interaction("p0", 1, 3.0),
            interaction("p1", 1, 3.0),
            interaction("p1", 0, 9.0),
        ];

        let difficulty = difficulty_of(&interactions);

        assert!(difficulty.iter().all(|score| score.is_finite() && *score >= 0.0 && *score <= 1.0));
        assert!((difficulty[0] - 1.0).abs() < EPSILON);
        assert_eq!(difficulty[1], 0.0);
    }

    #[test]
    fn single_problem_falls_back_to_zero() {
        let difficulty = difficulty_of(&[interaction("p0", 1, 3.0)]);
        assert_eq!(difficulty, vec![0.0]);
    }

    #[test]
    fn skill_accuracy() {
        assert_eq!(difficulty::skill_difficulty(&[1, 0, 3], &[2, 0, 3]), vec![0.5, 0.0, 1.0]);
    }
}

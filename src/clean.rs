use std::borrow::Cow;
use std::io::Read;
use std::str;
use std::time::Instant;

use csv::ByteRecord;
use fnv::FnvHashMap;
use tracing::{debug, info};

use crate::config::{PipelineConfig, RawColumns};
use crate::error::{PipelineError, Result};
use crate::types::Interaction;
use crate::utils;

/// A row of the raw interaction log, restricted to the columns we use. Missing values are
/// kept as `None` so that the validity rules can drop them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub student: String,
    pub problem: String,
    pub skill: Option<String>,
    pub correct: u8,
    pub response_time_ms: Option<f64>,
    pub original: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleaningRules {
    /// Students with fewer valid rows than this are removed entirely.
    pub min_student_interactions: usize,
    /// Rows further than this many standard deviations from their problem's mean response
    /// time are removed.
    pub outlier_std_devs: f64,
}

impl<'a> From<&'a PipelineConfig> for CleaningRules {
    fn from(config: &'a PipelineConfig) -> Self {
        CleaningRules {
            min_student_interactions: config.min_student_interactions,
            outlier_std_devs: config.outlier_std_devs,
        }
    }
}

struct ColumnPositions {
    student: usize,
    problem: usize,
    skill: usize,
    correct: usize,
    response_time: usize,
    original: Option<usize>,
}

impl ColumnPositions {

    fn locate(headers: &ByteRecord, columns: &RawColumns) -> Result<Self> {

        let position = |name: &str| {
            headers.iter()
                .position(|header| decode(header).trim() == name)
                .ok_or_else(|| PipelineError::MissingColumn { column: name.to_string() })
        };

        let original = match columns.original {
            Some(ref name) => Some(position(name)?),
            None => None,
        };

        Ok(ColumnPositions {
            student: position(&columns.student)?,
            problem: position(&columns.problem)?,
            skill: position(&columns.skill)?,
            correct: position(&columns.correct)?,
            response_time: position(&columns.response_time)?,
            original,
        })
    }
}

/// ASSISTments exports are ISO-8859-1, so fields that are not valid UTF-8 are read as Latin-1.
fn decode(bytes: &[u8]) -> Cow<str> {
    match str::from_utf8(bytes) {
        Ok(value) => Cow::Borrowed(value),
        Err(_) => Cow::Owned(bytes.iter().map(|byte| *byte as char).collect()),
    }
}

fn field(record: &ByteRecord, position: usize) -> Option<String> {
    record.get(position)
        .map(|value| decode(value).trim().to_string())
        .filter(|value| !value.is_empty())
}

fn invalid(record: &ByteRecord, column: &str, value: &str) -> PipelineError {
    PipelineError::InvalidField {
        line: record.position().map(|position| position.line()).unwrap_or(0),
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Reads the configured columns of a raw interaction log.
pub fn read_raw<R: Read>(reader: &mut csv::Reader<R>, columns: &RawColumns) -> Result<Vec<RawRecord>> {

    let positions = ColumnPositions::locate(reader.byte_headers()?, columns)?;
    let mut records = Vec::new();

    for result in reader.byte_records() {
        let record = result?;

        let student = field(&record, positions.student)
            .ok_or_else(|| invalid(&record, &columns.student, ""))?;
        let problem = field(&record, positions.problem)
            .ok_or_else(|| invalid(&record, &columns.problem, ""))?;

        let correct_field = field(&record, positions.correct).unwrap_or_default();
        let correct = match correct_field.parse::<f64>() {
            Ok(value) if value == 0.0 => 0,
            Ok(value) if value == 1.0 => 1,
            _ => return Err(invalid(&record, &columns.correct, &correct_field)),
        };

        let response_time_ms = match field(&record, positions.response_time) {
            Some(value) => {
                let millis = value.parse::<f64>()
                    .map_err(|_| invalid(&record, &columns.response_time, &value))?;
                if millis.is_nan() { None } else { Some(millis) }
            },
            None => None,
        };

        let original = match positions.original {
            Some(position) => field(&record, position)
                .and_then(|value| value.parse::<f64>().ok())
                .map(|value| value == 1.0)
                .unwrap_or(false),
            None => true,
        };

        records.push(RawRecord {
            student,
            problem,
            skill: field(&record, positions.skill),
            correct,
            response_time_ms,
            original,
        });
    }

    Ok(records)
}

/// Applies the validity rules, the student activity threshold and the per-problem response
/// time outlier filter, in that order. Row order is preserved and response times are
/// converted to seconds.
pub fn clean(records: Vec<RawRecord>, rules: &CleaningRules) -> Vec<Interaction> {

    let start = Instant::now();
    let num_raw = records.len();

    let valid: Vec<Interaction> = records.into_iter()
        .filter_map(|record| {
            let skill = record.skill?;
            if !record.original {
                return None;
            }
            let response_time = record.response_time_ms.filter(|millis| *millis > 0.0)?;

            Some(Interaction {
                student: record.student,
                problem: record.problem,
                skill,
                correct: record.correct,
                response_time,
            })
        })
        .collect();

    let num_valid = valid.len();

    let mut student_counts: FnvHashMap<String, usize> = FnvHashMap::default();
    for interaction in valid.iter() {
        if let Some(count) = student_counts.get_mut(interaction.student.as_str()) {
            *count += 1;
            continue;
        }
        student_counts.insert(interaction.student.clone(), 1);
    }

    let active: Vec<Interaction> = valid.into_iter()
        .filter(|interaction| student_counts[&interaction.student] >= rules.min_student_interactions)
        .collect();

    let num_active = active.len();

    let mut rows_by_problem: FnvHashMap<&str, Vec<usize>> = FnvHashMap::default();
    for (index, interaction) in active.iter().enumerate() {
        rows_by_problem.entry(interaction.problem.as_str())
            .or_insert_with(Vec::new)
            .push(index);
    }

    let mut is_outlier = vec![false; active.len()];

    for rows in rows_by_problem.values() {
        let times: Vec<f64> = rows.iter().map(|index| active[*index].response_time).collect();

        // A single row or identical times leave nothing to reject
        if let (mean, Some(std)) = utils::mean_and_std(&times) {
            if std > 0.0 {
                let min_normal = mean - rules.outlier_std_devs * std;
                let max_normal = mean + rules.outlier_std_devs * std;

                for index in rows.iter() {
                    let time = active[*index].response_time;
                    if time > max_normal || time < min_normal {
                        is_outlier[*index] = true;
                    }
                }
            }
        }
    }

    debug!("{} problems checked for response time outliers", rows_by_problem.len());
    drop(rows_by_problem);

    let cleaned: Vec<Interaction> = active.into_iter()
        .zip(is_outlier.into_iter())
        .filter(|&(_, outlier)| !outlier)
        .map(|(mut interaction, _)| {
            interaction.response_time /= 1000.0;
            interaction
        })
        .collect();

    info!(
        "Cleaned {} raw rows: {} valid, {} from active students, {} without outliers ({}ms)",
        num_raw, num_valid, num_active, cleaned.len(), utils::to_millis(start.elapsed()));

    cleaned
}

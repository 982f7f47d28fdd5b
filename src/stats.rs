use std::path::Path;

use fnv::FnvHashMap;
use serde::{Serialize, Serializer};

use crate::config::artifacts;
use crate::error::{PipelineError, Result};
use crate::io;
use crate::types::Interaction;

/// Bijection between raw identifiers and consecutive dense ids, assigned in order of first
/// occurrence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    index: FnvHashMap<String, u32>,
    names: Vec<String>,
}

impl Dictionary {

    pub fn new() -> Self {
        Dictionary::default()
    }

    /// Returns the dense id of `name`, assigning the next free one if it is new.
    pub fn insert(&mut self, name: &str) -> u32 {
        if let Some(index) = self.index.get(name) {
            return *index;
        }

        let index = self.names.len() as u32;
        self.index.insert(name.to_string(), index);
        self.names.push(name.to_string());
        index
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.index.get(name).cloned()
    }

    pub fn name(&self, index: u32) -> &str {
        &self.names[index as usize]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Rebuilds a dictionary from a raw-to-dense mapping, which must cover 0..N exactly once.
    pub fn from_index(index: FnvHashMap<String, u32>, kind: &'static str) -> Result<Self> {
        let mut names: Vec<Option<String>> = vec![None; index.len()];

        for (name, dense_id) in index.iter() {
            match names.get_mut(*dense_id as usize) {
                Some(slot) if slot.is_none() => *slot = Some(name.clone()),
                _ => return Err(PipelineError::DataIntegrity { kind, raw_id: name.clone() }),
            }
        }

        let names = names.into_iter().map(|name| name.unwrap_or_default()).collect();
        Ok(Dictionary { index, names })
    }

    pub fn load(path: &Path, kind: &'static str) -> Result<Self> {
        let index: FnvHashMap<String, u32> = io::read_literal(path)?;
        Dictionary::from_index(index, kind)
    }
}

/// Serialised as a raw-to-dense mapping literal, in dense id order.
impl Serialize for Dictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.names.iter()
            .enumerate()
            .map(|(index, name)| (name, index as u32)))
    }
}

/// Dense ids for the problems and students of a cleaned interaction table.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDictionary {
    problems: Dictionary,
    students: Dictionary,
}

impl DataDictionary {

    pub fn num_problems(&self) -> usize {
        self.problems.len()
    }

    pub fn num_students(&self) -> usize {
        self.students.len()
    }

    pub fn problems(&self) -> &Dictionary {
        &self.problems
    }

    pub fn students(&self) -> &Dictionary {
        &self.students
    }

    pub fn problem_index(&self, name: &str) -> Result<u32> {
        self.problems.get(name)
            .ok_or_else(|| PipelineError::DataIntegrity { kind: "problem", raw_id: name.to_string() })
    }

    pub fn student_index(&self, name: &str) -> Result<u32> {
        self.students.get(name)
            .ok_or_else(|| PipelineError::DataIntegrity { kind: "student", raw_id: name.to_string() })
    }

    /// Writes both dictionaries and their sizes to `data_dir`.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        io::write_literal(&data_dir.join(artifacts::NUM_PRO), &self.num_problems())?;
        io::write_literal(&data_dir.join(artifacts::NUM_STU), &self.num_students())?;
        io::write_literal(&data_dir.join(artifacts::PRO_ID_DICT), &self.problems)?;
        io::write_literal(&data_dir.join(artifacts::STU_ID_DICT), &self.students)?;
        Ok(())
    }

    pub fn load(data_dir: &Path) -> Result<Self> {
        let problems = Dictionary::load(&data_dir.join(artifacts::PRO_ID_DICT), "problem")?;
        let students = Dictionary::load(&data_dir.join(artifacts::STU_ID_DICT), "student")?;
        Ok(DataDictionary { problems, students })
    }
}

impl<'a> From<&'a [Interaction]> for DataDictionary {

    fn from(interactions: &'a [Interaction]) -> Self {

        let mut problems = Dictionary::new();
        let mut students = Dictionary::new();

        for interaction in interactions {
            problems.insert(&interaction.problem);
            students.insert(&interaction.student);
        }

        DataDictionary { problems, students }
    }
}

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

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::types::{DenseArray, Interaction, SparseMatrix};

/// Fails with `MissingArtifact` if `path` does not exist.
pub fn require(stage: &'static str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::MissingArtifact { stage, path: path.to_path_buf() })
    }
}

/// Reads a CSV input file with a header line.
pub fn csv_reader(path: &Path) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    Ok(reader)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

pub fn write_interactions(path: &Path, interactions: &[Interaction]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for interaction in interactions {
        writer.serialize(interaction)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_interactions(path: &Path) -> Result<Vec<Interaction>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut interactions = Vec::new();
    for record in reader.deserialize() {
        interactions.push(record?);
    }
    Ok(interactions)
}

/// Writes a value as a plain-text literal (a JSON scalar, list or object).
pub fn write_literal<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut out = create(path)?;
    serde_json::to_writer(&mut out, value)?;
    out.flush()?;
    Ok(())
}

pub fn read_literal<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(value)
}

pub fn write_sparse(path: &Path, matrix: &SparseMatrix) -> Result<()> {
    write_literal(path, matrix)
}

/// Reads a sparse matrix and checks that every entry lies within the declared shape.
pub fn read_sparse(path: &Path) -> Result<SparseMatrix> {
    let matrix: SparseMatrix = read_literal(path)?;
    let artifact = path.display().to_string();

    if matrix.row.len() != matrix.data.len() || matrix.col.len() != matrix.data.len() {
        return Err(PipelineError::ShapeMismatch {
            artifact,
            expected: matrix.data.len(),
            found: matrix.row.len().min(matrix.col.len()),
        });
    }

    for (row, col, _) in matrix.iter() {
        if row as usize >= matrix.num_rows() {
            return Err(PipelineError::ShapeMismatch {
                artifact,
                expected: matrix.num_rows(),
                found: row as usize + 1,
            });
        }
        if col as usize >= matrix.num_cols() {
            return Err(PipelineError::ShapeMismatch {
                artifact,
                expected: matrix.num_cols(),
                found: col as usize + 1,
            });
        }
    }

    Ok(matrix)
}

/// Persists a dense array in an archive under the field `name`.
pub fn write_archive<T: Serialize>(path: &Path, name: &str, array: &DenseArray<T>) -> Result<()> {
    let mut archive = BTreeMap::new();
    archive.insert(name, array);
    write_literal(path, &archive)
}

/// Loads the array stored under `name` and checks that its shape matches its data.
pub fn read_archive<T: DeserializeOwned>(path: &Path, name: &str) -> Result<DenseArray<T>> {
    let mut archive: BTreeMap<String, DenseArray<T>> = read_literal(path)?;

    let array = archive.remove(name)
        .ok_or_else(|| PipelineError::MissingArray {
            name: name.to_string(),
            path: path.to_path_buf(),
        })?;

    if !array.is_consistent() {
        return Err(PipelineError::ShapeMismatch {
            artifact: format!("{}[{}]", path.display(), name),
            expected: array.shape.iter().product(),
            found: array.data.len(),
        });
    }

    Ok(array)
}

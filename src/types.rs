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

use serde_derive::{Deserialize, Serialize};

pub type DenseVector = Vec<f64>;

/// Dense skill ids per dense problem id, in tagging order.
pub type ProblemSkills = Vec<Vec<u32>>;

/// One row of the cleaned interaction table. Field names are the column names of the
/// persisted CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "student_id")]
    pub student: String,
    #[serde(rename = "problem_id")]
    pub problem: String,
    #[serde(rename = "skill_id")]
    pub skill: String,
    #[serde(rename = "correctness")]
    pub correct: u8,
    #[serde(rename = "response_time_seconds")]
    pub response_time: f64,
}

impl Interaction {
    pub fn is_correct(&self) -> bool {
        self.correct == 1
    }
}

/// Sparse matrix in coordinate format with an explicit shape. Writers push entries in
/// row-major order, which keeps the persisted form deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    pub shape: (usize, usize),
    pub row: Vec<u32>,
    pub col: Vec<u32>,
    pub data: Vec<f64>,
}

impl SparseMatrix {

    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        SparseMatrix { shape: (num_rows, num_cols), row: Vec::new(), col: Vec::new(), data: Vec::new() }
    }

    /// A 1xN row vector holding the non-zero entries of `values`.
    pub fn from_dense_row(values: &[f64]) -> Self {
        let mut vector = SparseMatrix::new(1, values.len());
        for (index, value) in values.iter().enumerate() {
            if *value != 0.0 {
                vector.push(0, index as u32, *value);
            }
        }
        vector
    }

    pub fn push(&mut self, row: u32, col: u32, value: f64) {
        self.row.push(row);
        self.col.push(col);
        self.data.push(value);
    }

    pub fn num_rows(&self) -> usize {
        self.shape.0
    }

    pub fn num_cols(&self) -> usize {
        self.shape.1
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item=(u32, u32, f64)> + 'a {
        self.row.iter()
            .zip(self.col.iter())
            .zip(self.data.iter())
            .map(|((row, col), value)| (*row, *col, *value))
    }

    /// Value at (row, col), zero if the entry is not stored.
    pub fn get(&self, row: u32, col: u32) -> f64 {
        self.iter()
            .find(|&(r, c, _)| r == row && c == col)
            .map(|(_, _, value)| value)
            .unwrap_or(0.0)
    }

    /// Expands the matrix into a row-major dense buffer.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.num_rows() * self.num_cols()];
        for (row, col, value) in self.iter() {
            dense[row as usize * self.num_cols() + col as usize] += value;
        }
        dense
    }
}

/// A binary relation indexed both by row and by column. Both sides are built once from the
/// same entries and hold sorted, de-duplicated neighbour lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Incidence {
    by_row: Vec<Vec<u32>>,
    by_col: Vec<Vec<u32>>,
}

impl Incidence {

    pub fn from_coo(matrix: &SparseMatrix) -> Self {
        let mut by_row = vec![Vec::new(); matrix.num_rows()];
        let mut by_col = vec![Vec::new(); matrix.num_cols()];

        for (row, col, value) in matrix.iter() {
            if value != 0.0 {
                by_row[row as usize].push(col);
                by_col[col as usize].push(row);
            }
        }

        for neighbours in by_row.iter_mut().chain(by_col.iter_mut()) {
            neighbours.sort_unstable();
            neighbours.dedup();
        }

        Incidence { by_row, by_col }
    }

    pub fn num_rows(&self) -> usize {
        self.by_row.len()
    }

    pub fn num_cols(&self) -> usize {
        self.by_col.len()
    }

    pub fn row(&self, row: usize) -> &[u32] {
        &self.by_row[row]
    }

    pub fn col(&self, col: usize) -> &[u32] {
        &self.by_col[col]
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.by_row
    }

    pub fn cols(&self) -> &[Vec<u32>] {
        &self.by_col
    }
}

/// A named dense array as stored in an archive: a shape and its row-major data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> DenseArray<T> {

    pub fn vector(data: Vec<T>) -> Self {
        DenseArray { shape: vec![data.len()], data }
    }

    pub fn matrix(num_rows: usize, num_cols: usize, data: Vec<T>) -> Self {
        DenseArray { shape: vec![num_rows, num_cols], data }
    }

    pub fn num_rows(&self) -> usize {
        self.shape.first().cloned().unwrap_or(0)
    }

    pub fn num_cols(&self) -> usize {
        self.shape.get(1).cloned().unwrap_or(1)
    }

    pub fn row(&self, index: usize) -> &[T] {
        let width = self.num_cols();
        &self.data[index * width..(index + 1) * width]
    }

    /// Whether the shape accounts for exactly the stored elements.
    pub fn is_consistent(&self) -> bool {
        self.shape.iter().product::<usize>() == self.data.len()
    }
}

#[cfg(test)]
mod tests {

    use super::{Incidence, SparseMatrix, DenseArray};

    #[test]
    fn sparse_row_skips_zeros() {
        let vector = SparseMatrix::from_dense_row(&[0.0, 0.5, 0.0, 1.0]);

        assert_eq!(vector.shape, (1, 4));
        assert_eq!(vector.nnz(), 2);
        assert_eq!(vector.col, vec![1, 3]);
        assert_eq!(vector.get(0, 2), 0.0);
        assert_eq!(vector.get(0, 3), 1.0);
    }

    #[test]
    fn empty_matrix_keeps_shape() {
        let matrix = SparseMatrix::new(3, 7);
        assert_eq!(matrix.nnz(), 0);
        assert_eq!(matrix.to_dense().len(), 21);
    }

    #[test]
    fn incidence_indexes_both_sides() {
        let mut matrix = SparseMatrix::new(3, 3);
        matrix.push(0, 0, 1.0);
        matrix.push(0, 1, 1.0);
        matrix.push(1, 1, 1.0);
        matrix.push(2, 2, 1.0);
        matrix.push(2, 2, 1.0);

        let incidence = Incidence::from_coo(&matrix);

        assert_eq!(incidence.row(0), &[0, 1]);
        assert_eq!(incidence.row(2), &[2]);
        assert_eq!(incidence.col(1), &[0, 1]);
        assert_eq!(incidence.col(2), &[2]);
    }

    #[test]
    fn dense_array_rows() {
        let array = DenseArray::matrix(2, 3, vec![1, 2, 3, 4, 5, 6]);
        assert!(array.is_consistent());
        assert_eq!(array.row(1), &[4, 5, 6]);

        let vector = DenseArray::vector(vec![1.0, 0.0]);
        assert_eq!(vector.num_rows(), 2);
        assert_eq!(vector.num_cols(), 1);
    }
}

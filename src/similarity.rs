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

use std::time::Instant;

use fnv::FnvHashSet;
use tracing::info;

use crate::types::{Incidence, SparseMatrix};
use crate::utils;

/// Jaccard index |a ∩ b| / |a ∪ b| of two sorted, de-duplicated id lists. Two empty lists
/// have nothing in common, we score them 0.
#[inline]
pub fn jaccard(a: &[u32], b: &[u32]) -> f64 {

    let mut intersection = 0;
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            i += 1;
        } else if a[i] > b[j] {
            j += 1;
        } else {
            intersection += 1;
            i += 1;
            j += 1;
        }
    }

    let union = a.len() + b.len() - intersection;

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Pairwise similarity between the entities of one side of a bipartite relation.
///
/// `members[e]` lists the neighbours of entity `e` on the other side, `owners[n]` lists the
/// entities attached to neighbour `n`. Only pairs sharing at least one neighbour are scored,
/// so every entity with a neighbour is paired with itself (similarity 1) and nothing else is
/// stored for pairs that never co-occur.
pub fn neighbourhood_similarity(members: &[Vec<u32>], owners: &[Vec<u32>]) -> SparseMatrix {

    let num_entities = members.len();
    let mut similarities = SparseMatrix::new(num_entities, num_entities);
    let mut candidates: FnvHashSet<u32> = FnvHashSet::with_capacity_and_hasher(16, Default::default());
    let mut sorted_candidates: Vec<u32> = Vec::with_capacity(16);

    for (entity, neighbours) in members.iter().enumerate() {

        candidates.clear();
        for neighbour in neighbours.iter() {
            candidates.extend(owners[*neighbour as usize].iter().cloned());
        }

        sorted_candidates.clear();
        sorted_candidates.extend(candidates.iter().cloned());
        sorted_candidates.sort_unstable();

        for other in sorted_candidates.iter() {
            let similarity = jaccard(neighbours, &members[*other as usize]);
            similarities.push(entity as u32, *other, similarity);
        }
    }

    similarities
}

/// Problem-problem similarity from shared skills.
pub fn problem_similarity(incidence: &Incidence) -> SparseMatrix {
    let start = Instant::now();
    let similarities = neighbourhood_similarity(incidence.rows(), incidence.cols());

    info!("Scored {} problem pairs over {} problems ({}ms)",
        similarities.nnz(), incidence.num_rows(), utils::to_millis(start.elapsed()));

    similarities
}

/// Skill-skill similarity from shared problems.
pub fn skill_similarity(incidence: &Incidence) -> SparseMatrix {
    let start = Instant::now();
    let similarities = neighbourhood_similarity(incidence.cols(), incidence.rows());

    info!("Scored {} skill pairs over {} skills ({}ms)",
        similarities.nnz(), incidence.num_cols(), utils::to_millis(start.elapsed()));

    similarities
}

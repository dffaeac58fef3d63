//! Density-based clustering over cosine distance.
//!
//! A region-query/expand-cluster DBSCAN shape over cosine distance
//! between normalized embeddings.

use super::NOISE_CLUSTER_ID;
use crate::vector::cosine_distance;
use std::collections::HashMap;

const UNVISITED: isize = -2;

/// Runs DBSCAN over `embeddings`, returning a map from cluster id to the
/// indices of its members. [`NOISE_CLUSTER_ID`] is present as a key only
/// when at least one point was labeled noise.
#[must_use]
pub fn run(embeddings: &[Vec<f32>], eps: f32, min_pts: usize) -> HashMap<isize, Vec<usize>> {
    let n = embeddings.len();
    let mut labels: Vec<isize> = vec![UNVISITED; n];
    let mut next_cluster_id: isize = 0;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }

        let neighbors = region_query(embeddings, i, eps);
        if neighbors.len() < min_pts {
            labels[i] = NOISE_CLUSTER_ID;
            continue;
        }

        expand_cluster(embeddings, i, neighbors, next_cluster_id, min_pts, eps, &mut labels);
        next_cluster_id += 1;
    }

    let mut clusters: HashMap<isize, Vec<usize>> = HashMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        clusters.entry(label).or_default().push(idx);
    }
    clusters
}

/// Indices of all points within `eps` cosine distance of `i`, excluding
/// `i` itself.
fn region_query(embeddings: &[Vec<f32>], i: usize, eps: f32) -> Vec<usize> {
    embeddings
        .iter()
        .enumerate()
        .filter(|(j, other)| *j != i && cosine_distance(&embeddings[i], other) <= eps)
        .map(|(j, _)| j)
        .collect()
}

fn expand_cluster(
    embeddings: &[Vec<f32>],
    seed: usize,
    seed_neighbors: Vec<usize>,
    cluster_id: isize,
    min_pts: usize,
    eps: f32,
    labels: &mut [isize],
) {
    labels[seed] = cluster_id;
    let mut queue = seed_neighbors;

    while let Some(p) = queue.pop() {
        if labels[p] == cluster_id {
            continue;
        }
        // Noise absorbed into a border position of this cluster.
        if labels[p] != UNVISITED && labels[p] != NOISE_CLUSTER_ID {
            continue;
        }
        let was_unvisited = labels[p] == UNVISITED;
        labels[p] = cluster_id;

        if was_unvisited {
            let p_neighbors = region_query(embeddings, p, eps);
            if p_neighbors.len() >= min_pts {
                for n in p_neighbors {
                    if labels[n] == UNVISITED || labels[n] == NOISE_CLUSTER_ID {
                        queue.push(n);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec<f32> {
        crate::vector::normalize_vector(&[x, y])
    }

    #[test]
    fn isolated_point_with_min_pts_two_is_noise() {
        let embeddings = vec![v(1.0, 0.0)];
        let clusters = run(&embeddings, 0.1, 2);
        assert_eq!(clusters.get(&NOISE_CLUSTER_ID).map(Vec::len), Some(1));
    }

    #[test]
    fn tight_group_forms_one_cluster() {
        let embeddings = vec![
            v(1.0, 0.0),
            v(0.99, 0.05),
            v(0.98, 0.02),
            v(-1.0, 0.0),
        ];
        let clusters = run(&embeddings, 0.05, 2);
        let non_noise: Vec<_> = clusters.iter().filter(|(&id, _)| id != NOISE_CLUSTER_ID).collect();
        assert_eq!(non_noise.len(), 1);
        assert_eq!(non_noise[0].1.len(), 3);
        assert_eq!(clusters.get(&NOISE_CLUSTER_ID).map(Vec::len), Some(1));
    }

    #[test]
    fn empty_input_returns_empty_map() {
        let clusters = run(&[], 0.3, 3);
        assert!(clusters.is_empty());
    }

    #[test]
    fn all_noise_has_no_cluster_keys() {
        let embeddings = vec![v(1.0, 0.0), v(0.0, 1.0), v(-1.0, 0.0)];
        let clusters = run(&embeddings, 0.01, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters.get(&NOISE_CLUSTER_ID).map(Vec::len), Some(3));
    }
}

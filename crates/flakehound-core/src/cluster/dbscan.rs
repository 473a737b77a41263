//! Order-stable DBSCAN.
//!
//! Points are visited in input order, and cluster expansion scans
//! neighborhoods in index order, so the discovered clusters (and therefore
//! the date-keyed cluster ids derived from discovery order) are reproducible
//! for a given input ordering.

use std::collections::VecDeque;

use crate::config::DistanceMetric;
use crate::error::ValidationError;

#[derive(Clone, Copy, PartialEq)]
enum Label {
    Unvisited,
    Noise,
    Clustered,
}

/// Cluster the vector set; returns one index set per discovered cluster.
///
/// A point is a core point when its epsilon-neighborhood (the point itself
/// included) holds at least `min_points` members. Points density-reachable
/// from a core point join its cluster; everything else is noise and does not
/// appear in the output. Member indices are ascending.
pub fn dbscan(
    points: &[Vec<f32>],
    epsilon: f64,
    min_points: usize,
    metric: DistanceMetric,
) -> Result<Vec<Vec<usize>>, ValidationError> {
    let mut labels = vec![Label::Unvisited; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if labels[seed] != Label::Unvisited {
            continue;
        }

        let neighbors = region_query(points, seed, epsilon, metric)?;
        if neighbors.len() < min_points {
            labels[seed] = Label::Noise;
            continue;
        }

        let mut members = Vec::new();
        labels[seed] = Label::Clustered;
        members.push(seed);

        let mut frontier: VecDeque<usize> = neighbors.into_iter().collect();
        while let Some(point) = frontier.pop_front() {
            match labels[point] {
                Label::Clustered => continue,
                Label::Noise => {
                    // Border point: joins the cluster but cannot expand it.
                    labels[point] = Label::Clustered;
                    members.push(point);
                }
                Label::Unvisited => {
                    labels[point] = Label::Clustered;
                    members.push(point);
                    let reachable = region_query(points, point, epsilon, metric)?;
                    if reachable.len() >= min_points {
                        frontier.extend(reachable);
                    }
                }
            }
        }

        members.sort_unstable();
        clusters.push(members);
    }

    Ok(clusters)
}

/// Indices within `epsilon` of `center`, in ascending order, including
/// `center` itself.
fn region_query(
    points: &[Vec<f32>],
    center: usize,
    epsilon: f64,
    metric: DistanceMetric,
) -> Result<Vec<usize>, ValidationError> {
    let mut neighbors = Vec::new();
    for (index, point) in points.iter().enumerate() {
        if metric.distance(&points[center], point)? <= epsilon {
            neighbors.push(index);
        }
    }
    Ok(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_clusters() {
        let clusters = dbscan(&[], 0.5, 2, DistanceMetric::Euclidean).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_single_dense_cluster() {
        let points = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
        ];
        let clusters = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        assert_eq!(clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_noise_is_discarded() {
        let points = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![10.0, 10.0], // isolated
        ];
        let clusters = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        assert_eq!(clusters, vec![vec![0, 1]]);
    }

    #[test]
    fn test_all_noise_yields_no_clusters() {
        let points = vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![0.0, 10.0]];
        let clusters = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_two_separated_clusters_in_discovery_order() {
        let points = vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.1, 0.0],
            vec![10.1, 10.0],
        ];
        let clusters = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        // Seeded from index 0, then from index 1.
        assert_eq!(clusters, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_chain_is_density_reachable() {
        // Each point is within epsilon of the next; the whole chain is one
        // cluster even though the endpoints are far apart.
        let points: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32 * 0.4, 0.0]).collect();
        let clusters = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        assert_eq!(clusters, vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[test]
    fn test_min_points_counts_the_point_itself() {
        // Two points within epsilon of each other: each neighborhood has
        // size 2, so min_points = 2 makes both core.
        let points = vec![vec![0.0], vec![0.1]];
        let clusters = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        assert_eq!(clusters, vec![vec![0, 1]]);

        // min_points = 3 demotes both to noise.
        let clusters = dbscan(&points, 0.5, 3, DistanceMetric::Euclidean).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_cosine_metric_clusters_by_direction() {
        let points = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.01], // same direction, different magnitude
            vec![0.0, 1.0],  // orthogonal
        ];
        let clusters = dbscan(&points, 0.15, 2, DistanceMetric::Cosine).unwrap();
        assert_eq!(clusters, vec![vec![0, 1]]);
    }

    #[test]
    fn test_dimension_mismatch_fails_the_pass() {
        let points = vec![vec![0.0, 0.0], vec![0.0]];
        let err = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap_err();
        assert!(matches!(err, ValidationError::LengthMismatch { .. }));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let points = vec![
            vec![0.0, 0.0],
            vec![0.2, 0.0],
            vec![0.4, 0.0],
            vec![5.0, 5.0],
            vec![5.2, 5.0],
        ];
        let a = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        let b = dbscan(&points, 0.5, 2, DistanceMetric::Euclidean).unwrap();
        assert_eq!(a, b);
    }
}

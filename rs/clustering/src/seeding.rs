use log::debug;
use utils::random::SegmentSampler;

use crate::element::Element;
use crate::error::{ClusteringError, Result};

/// Where the initial centroids come from.
pub enum CentroidSeed<'a, T> {
    /// Flattened centroid rows supplied by the caller.
    Explicit(&'a [T]),
    /// One random point from each of `num_k` equal, contiguous segments of the points.
    Sampled {
        num_k: usize,
        sampler: &'a mut SegmentSampler,
    },
}

impl<'a, T: Element> CentroidSeed<'a, T> {
    /// Flattened initial centroid rows for `points`.
    pub fn initial_centroids(self, points: &[T], cols: usize) -> Result<Vec<T>> {
        if cols == 0 {
            return Err(ClusteringError::Parameter(
                "dimensionality must be at least 1".to_string(),
            ));
        }
        match self {
            CentroidSeed::Explicit(centroids) => {
                if centroids.is_empty() {
                    return Err(ClusteringError::EmptyInput("no centroids".to_string()));
                }
                if centroids.len() % cols != 0 {
                    return Err(ClusteringError::Parameter(format!(
                        "{} centroid values do not divide into rows of {}",
                        centroids.len(),
                        cols
                    )));
                }
                Ok(centroids.to_vec())
            }
            CentroidSeed::Sampled { num_k, sampler } => {
                let num_points = points.len() / cols;
                if num_k == 0 {
                    return Err(ClusteringError::Parameter(
                        "need at least one centroid".to_string(),
                    ));
                }
                if num_points == 0 {
                    return Err(ClusteringError::EmptyInput("no data points".to_string()));
                }
                if num_k > num_points {
                    return Err(ClusteringError::Parameter(format!(
                        "cannot sample {} centroids from {} points",
                        num_k, num_points
                    )));
                }

                let picks = sampler.sample_segments(num_points, num_k);
                debug!("Sampled initial centroids {:?} (seed {})", picks, sampler.seed());
                let mut centroids = Vec::with_capacity(num_k * cols);
                for pick in picks {
                    centroids.extend_from_slice(&points[pick * cols..(pick + 1) * cols]);
                }
                Ok(centroids)
            }
        }
    }
}

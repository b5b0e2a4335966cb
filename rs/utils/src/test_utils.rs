use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Generate a random vector with a given dimension
pub fn generate_random_vector(dimension: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let mut vector = vec![];
    for _ in 0..dimension {
        vector.push(rng.gen::<f32>());
    }
    vector
}

/// Generate `num_clusters * points_per_cluster` flattened points of the given dimension.
/// Cluster `i` is centered at `i * separation` on every axis, and points are spread uniformly
/// within `spread` of their center. Points are grouped by cluster.
pub fn generate_clustered_points(
    num_clusters: usize,
    points_per_cluster: usize,
    dimension: usize,
    separation: f32,
    spread: f32,
    seed: u64,
) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(num_clusters * points_per_cluster * dimension);
    for cluster in 0..num_clusters {
        let center = cluster as f32 * separation;
        for _ in 0..points_per_cluster * dimension {
            points.push(center + rng.gen_range(-spread..spread));
        }
    }
    points
}

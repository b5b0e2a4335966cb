use std::marker::PhantomData;
use std::time::{Duration, Instant};

use config::clustering::ClusteringConfig;
use config::enums::EmptyClusterPolicy;
use log::{debug, info, warn};

use crate::element::Element;
use crate::error::{ClusteringError, Result};
use crate::kernel::{Kernel, KernelKind};
use crate::store::CentroidStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceState {
    Running,
    /// A full pass moved no point.
    Converged,
    /// Points were still moving when the iteration cap was hit.
    MaxIterationsReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalcOutcome {
    pub state: ConvergenceState,
    /// Number of reassignment passes run.
    pub iterations: usize,
    pub elapsed: Duration,
}

impl CalcOutcome {
    pub fn converged(&self) -> bool {
        self.state == ConvergenceState::Converged
    }

    /// True when assignments were still changing at the last pass allowed.
    pub fn still_changing(&self) -> bool {
        self.state == ConvergenceState::MaxIterationsReached
    }

    pub fn elapsed_micros(&self) -> u128 {
        self.elapsed.as_micros()
    }
}

/// Lloyd's k-means over a [`CentroidStore`], with incremental centroid updates while points
/// move and a full recompute after every pass that moved something.
pub struct KMeans<T: Element, K: Kernel<T>> {
    store: CentroidStore<T>,
    max_iterations: usize,
    empty_cluster_policy: EmptyClusterPolicy,
    state: ConvergenceState,
    iterations: usize,
    elapsed: Duration,
    _kernel: PhantomData<K>,
}

impl<T: Element, K: Kernel<T>> KMeans<T, K> {
    pub fn new(
        points: &[T],
        centroids: &[T],
        cols: usize,
        max_iterations: usize,
        empty_cluster_policy: EmptyClusterPolicy,
    ) -> Result<Self> {
        if max_iterations == 0 {
            return Err(ClusteringError::Parameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            store: CentroidStore::new(points, centroids, cols)?,
            max_iterations,
            empty_cluster_policy,
            state: ConvergenceState::Running,
            iterations: 0,
            elapsed: Duration::ZERO,
            _kernel: PhantomData,
        })
    }

    pub fn from_config(
        points: &[T],
        centroids: &[T],
        cols: usize,
        config: &ClusteringConfig,
    ) -> Result<Self> {
        Self::new(
            points,
            centroids,
            cols,
            config.max_iterations,
            config.empty_cluster_policy,
        )
    }

    /// Run until no point changes centroid or `max_iterations` passes have run.
    pub fn calc(&mut self) -> Result<CalcOutcome> {
        let start = Instant::now();
        self.state = ConvergenceState::Running;
        self.iterations = 0;

        self.assign_nearest();
        self.reinit_centroids()?;

        while self.iterations < self.max_iterations {
            let changed = self.reassign_once();
            self.iterations += 1;
            debug!("Iteration {}: {} points changed", self.iterations, changed);
            if changed == 0 {
                self.state = ConvergenceState::Converged;
                break;
            }
            self.reinit_centroids()?;
        }

        if self.state == ConvergenceState::Running {
            self.state = ConvergenceState::MaxIterationsReached;
            warn!(
                "Assignments still changing after {} iterations",
                self.max_iterations
            );
        }
        self.elapsed = start.elapsed();
        info!(
            "{:?} kernel finished in {} iterations, {} micro-secs ({:?})",
            K::KIND,
            self.iterations,
            self.elapsed.as_micros(),
            self.state
        );
        Ok(self.outcome())
    }

    /// Assign every point to its nearest centroid, the lowest index winning ties. Populations
    /// are left for [`Self::reinit_centroids`] to recount.
    pub fn assign_nearest(&mut self) {
        self.store.best_distances.fill(f64::INFINITY);
        for point in 0..self.store.num_points() {
            let (nearest, distance) = self.nearest(point);
            self.store.assignments[point] = nearest as u32;
            let best = &mut self.store.best_distances[nearest];
            if distance < *best {
                *best = distance;
            }
        }
    }

    /// Recount populations and set every centroid to the mean of its points.
    pub fn reinit_centroids(&mut self) -> Result<()> {
        let empty = K::recompute(&mut self.store);
        if let Some(&centroid) = empty.first() {
            match self.empty_cluster_policy {
                EmptyClusterPolicy::Skip => {
                    debug!("Centroids {:?} have no points, keeping their rows", empty)
                }
                EmptyClusterPolicy::Error => {
                    return Err(ClusteringError::NumericDegeneracy { centroid })
                }
            }
        }
        debug_assert!(self.store.check_populations());
        Ok(())
    }

    /// One pass over all points, moving each to its nearest centroid. Returns the number of
    /// points that moved.
    pub fn reassign_once(&mut self) -> usize {
        let mut changed = 0;
        for point in 0..self.store.num_points() {
            let (nearest, _) = self.nearest(point);
            if nearest != self.store.assignments[point] as usize {
                self.move_point(point, nearest);
                changed += 1;
            }
        }
        changed
    }

    /// Reassign `point` to centroid `dest` and update both affected centroids incrementally.
    pub fn move_point(&mut self, point: usize, dest: usize) {
        if self.store.assignments[point] as usize == dest {
            return;
        }
        let src = self.store.reassign(point, dest);
        K::move_point(&mut self.store, dest, src, point);
    }

    fn nearest(&self, point: usize) -> (usize, f64) {
        let row = self.store.points.row(point);
        let mut nearest = 0;
        let mut nearest_distance = f64::INFINITY;
        for (centroid, centroid_row) in self.store.centroids.iter_rows().enumerate() {
            let distance = K::distance(row, centroid_row);
            if distance < nearest_distance {
                nearest = centroid;
                nearest_distance = distance;
            }
        }
        (nearest, nearest_distance)
    }

    pub fn outcome(&self) -> CalcOutcome {
        CalcOutcome {
            state: self.state,
            iterations: self.iterations,
            elapsed: self.elapsed,
        }
    }

    pub fn kernel(&self) -> KernelKind {
        K::KIND
    }

    pub fn store(&self) -> &CentroidStore<T> {
        &self.store
    }

    pub fn cols(&self) -> usize {
        self.store.cols()
    }

    /// Flattened centroid rows.
    pub fn centroids(&self) -> &[T] {
        self.store.centroids().as_slice()
    }

    pub fn copy_centroids(&self) -> Vec<T> {
        self.centroids().to_vec()
    }

    pub fn assignments(&self) -> &[u32] {
        self.store.assignments()
    }

    pub fn populations(&self) -> &[u32] {
        self.store.populations()
    }

    pub fn state(&self) -> ConvergenceState {
        self.state
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Wall-clock duration of the last `calc`.
    pub fn duration_micros(&self) -> u128 {
        self.elapsed.as_micros()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use utils::random::SegmentSampler;
    use utils::test_utils::generate_clustered_points;

    use super::*;
    use crate::kernel::{ScalarKernel, Vector128Kernel, Vector64Kernel};
    use crate::seeding::CentroidSeed;

    const SEPARATED: [f32; 16] = [
        0.0, 0.0, 0.0, 2.0, 2.0, 0.0, 2.0, 2.0, 10.0, 10.0, 10.0, 12.0, 12.0, 10.0, 12.0, 12.0,
    ];

    // Needs three passes to settle from the centroids below.
    const SLOW: [f32; 18] = [
        24.0, 35.0, 33.0, 10.0, 17.0, 14.0, 23.0, 25.0, 34.0, 17.0, 6.0, 13.0, 9.0, 14.0, 38.0,
        28.0, 21.0, 32.0,
    ];
    const SLOW_CENTROIDS: [f32; 4] = [14.0, 15.0, 4.0, 1.0];

    fn kmeans<K: Kernel<f32>>(
        points: &[f32],
        centroids: &[f32],
        cols: usize,
        max_iterations: usize,
    ) -> KMeans<f32, K> {
        KMeans::new(
            points,
            centroids,
            cols,
            max_iterations,
            EmptyClusterPolicy::Skip,
        )
        .unwrap()
    }

    fn assert_centroids_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert_relative_eq!(a, e, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_separated_clusters_converge_in_one_pass() {
        let mut kmeans = kmeans::<ScalarKernel>(&SEPARATED, &[1.0, 1.0, 11.0, 11.0], 2, 256);
        let outcome = kmeans.calc().unwrap();
        assert_eq!(outcome.state, ConvergenceState::Converged);
        assert!(outcome.converged());
        assert!(!outcome.still_changing());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(kmeans.centroids(), &[1.0, 1.0, 11.0, 11.0]);
        assert_eq!(kmeans.assignments(), &[0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(kmeans.populations(), &[4, 4]);
        assert_eq!(kmeans.store().best_distances(), &[2.0, 2.0]);
    }

    #[test]
    fn test_separated_clusters_on_vector_kernels() {
        let mut vector64 = kmeans::<Vector64Kernel>(&SEPARATED, &[1.0, 1.0, 11.0, 11.0], 2, 256);
        assert!(vector64.calc().unwrap().converged());
        assert_eq!(vector64.kernel(), KernelKind::Vector64);
        assert_centroids_close(vector64.centroids(), &[1.0, 1.0, 11.0, 11.0]);

        // Same data duplicated to 4 columns.
        let wide = SEPARATED
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[1], p[0], p[1]])
            .collect::<Vec<_>>();
        let mut vector128 =
            kmeans::<Vector128Kernel>(&wide, &[1.0, 1.0, 1.0, 1.0, 11.0, 11.0, 11.0, 11.0], 4, 256);
        assert!(vector128.calc().unwrap().converged());
        assert_centroids_close(
            vector128.centroids(),
            &[1.0, 1.0, 1.0, 1.0, 11.0, 11.0, 11.0, 11.0],
        );
    }

    #[test]
    fn test_converges_after_several_passes() {
        let mut kmeans = kmeans::<ScalarKernel>(&SLOW, &SLOW_CENTROIDS, 2, 256);
        let outcome = kmeans.calc().unwrap();
        assert!(outcome.converged());
        assert_eq!(outcome.iterations, 3);
        assert_eq!(kmeans.assignments(), &[0, 0, 1, 0, 0, 1, 1, 0, 0]);
        assert_eq!(kmeans.populations(), &[6, 3]);
        assert_centroids_close(
            kmeans.centroids(),
            &[173.0 / 6.0, 24.5, 32.0 / 3.0, 41.0 / 3.0],
        );
    }

    #[test]
    fn test_iteration_cap_is_reported() {
        let mut kmeans = kmeans::<ScalarKernel>(&SLOW, &SLOW_CENTROIDS, 2, 1);
        let outcome = kmeans.calc().unwrap();
        assert_eq!(outcome.state, ConvergenceState::MaxIterationsReached);
        assert!(outcome.still_changing());
        assert!(!outcome.converged());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(kmeans.state(), ConvergenceState::MaxIterationsReached);
        assert_eq!(kmeans.assignments(), &[0, 0, 0, 0, 0, 1, 1, 0, 0]);
        assert_eq!(kmeans.populations(), &[7, 2]);
        assert_centroids_close(kmeans.centroids(), &[190.0 / 7.0, 23.0, 7.5, 13.5]);
        assert!(kmeans.store().check_populations());
    }

    #[test]
    fn test_iteration_cap_on_vector_kernels() {
        let mut vector64 = kmeans::<Vector64Kernel>(&SLOW, &SLOW_CENTROIDS, 2, 1);
        assert!(vector64.calc().unwrap().still_changing());
        assert_eq!(vector64.populations(), &[7, 2]);
        assert_centroids_close(vector64.centroids(), &[190.0 / 7.0, 23.0, 7.5, 13.5]);

        let wide = SLOW
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[1], p[0], p[1]])
            .collect::<Vec<_>>();
        let mut vector128 =
            kmeans::<Vector128Kernel>(&wide, &[14.0, 15.0, 14.0, 15.0, 4.0, 1.0, 4.0, 1.0], 4, 256);
        let outcome = vector128.calc().unwrap();
        assert!(outcome.converged());
        assert_eq!(outcome.iterations, 3);
        assert_eq!(vector128.assignments(), &[0, 0, 1, 0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_converged_is_idempotent() {
        let points = generate_clustered_points(3, 40, 4, 20.0, 3.0, 7);
        let centroids = [&points[..4], &points[160..164], &points[320..324]].concat();
        let mut kmeans = kmeans::<Vector128Kernel>(&points, &centroids, 4, 256);
        assert!(kmeans.calc().unwrap().converged());
        let assignments = kmeans.assignments().to_vec();
        assert_eq!(kmeans.reassign_once(), 0);
        assert_eq!(kmeans.assignments(), &assignments[..]);
        assert!(kmeans.store().check_populations());
        assert_eq!(kmeans.populations().iter().sum::<u32>(), 120);
    }

    #[test]
    fn test_sampled_seed_is_deterministic() {
        let run = || {
            let mut sampler = SegmentSampler::new(1024);
            let centroids = CentroidSeed::Sampled {
                num_k: 2,
                sampler: &mut sampler,
            }
            .initial_centroids(&SEPARATED, 2)
            .unwrap();
            let mut kmeans = kmeans::<ScalarKernel>(&SEPARATED, &centroids, 2, 256);
            kmeans.calc().unwrap();
            (kmeans.copy_centroids(), kmeans.assignments().to_vec())
        };
        let (centroids, assignments) = run();
        assert_eq!(run(), (centroids.clone(), assignments));
        // One sample per cluster, so the clusters are found exactly.
        assert_eq!(centroids, vec![1.0, 1.0, 11.0, 11.0]);
    }

    #[test]
    fn test_kernels_agree() {
        for cols in [2, 4, 8, 12] {
            let points = generate_clustered_points(4, 50, cols, 10.0, 2.0, cols as u64);
            let centroids = (0..4)
                .flat_map(|c| points[c * 50 * cols..(c * 50 + 1) * cols].to_vec())
                .collect::<Vec<_>>();

            let mut scalar = kmeans::<ScalarKernel>(&points, &centroids, cols, 256);
            let mut vector128 = kmeans::<Vector128Kernel>(&points, &centroids, cols, 256);
            let mut vector64 = kmeans::<Vector64Kernel>(&points, &centroids, cols, 256);
            assert!(scalar.calc().unwrap().converged());
            assert!(vector128.calc().unwrap().converged());
            assert!(vector64.calc().unwrap().converged());

            assert_eq!(scalar.assignments(), vector128.assignments());
            assert_eq!(scalar.assignments(), vector64.assignments());
            assert_eq!(scalar.populations(), &[50, 50, 50, 50]);
            for (s, (a, b)) in scalar
                .centroids()
                .iter()
                .zip(vector128.centroids().iter().zip(vector64.centroids()))
            {
                assert_relative_eq!(s, a, epsilon = 1e-3, max_relative = 1e-4);
                assert_relative_eq!(s, b, epsilon = 1e-3, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_integer_points() {
        let points = [250u8, 251, 252, 253, 1, 2, 3, 4, 5];
        let mut kmeans =
            KMeans::<u8, ScalarKernel>::new(&points, &[0, 255], 1, 256, EmptyClusterPolicy::Skip)
                .unwrap();
        assert!(kmeans.calc().unwrap().converged());
        assert_eq!(kmeans.assignments(), &[1, 1, 1, 1, 0, 0, 0, 0, 0]);
        // 1006 / 4 truncates to 251.
        assert_eq!(kmeans.centroids(), &[3, 251]);
    }

    #[test]
    fn test_empty_cluster_policy() {
        let points = [0.0f64, 1.0, 2.0];
        let mut skip = KMeans::<f64, ScalarKernel>::new(
            &points,
            &[1.0, 100.0],
            1,
            256,
            EmptyClusterPolicy::Skip,
        )
        .unwrap();
        assert!(skip.calc().unwrap().converged());
        assert_eq!(skip.centroids(), &[1.0, 100.0]);
        assert_eq!(skip.populations(), &[3, 0]);
        assert!(skip.store().best_distances()[1].is_infinite());

        let mut error = KMeans::<f64, ScalarKernel>::new(
            &points,
            &[1.0, 100.0],
            1,
            256,
            EmptyClusterPolicy::Error,
        )
        .unwrap();
        assert_eq!(
            error.calc().unwrap_err(),
            ClusteringError::NumericDegeneracy { centroid: 1 }
        );
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let mut kmeans =
            kmeans::<ScalarKernel>(&[5.0, 5.0], &[4.0, 4.0, 6.0, 6.0, 4.0, 4.0], 2, 256);
        kmeans.assign_nearest();
        assert_eq!(kmeans.assignments(), &[0]);
    }

    #[test]
    fn test_move_point() {
        let mut kmeans = kmeans::<ScalarKernel>(&[0.0, 2.0, 10.0], &[1.0, 10.0], 1, 256);
        kmeans.assign_nearest();
        kmeans.reinit_centroids().unwrap();
        kmeans.move_point(1, 1);
        assert_eq!(kmeans.populations(), &[1, 2]);
        assert_eq!(kmeans.centroids(), &[0.0, 6.0]);
        // Moving to the current centroid is a no-op.
        kmeans.move_point(1, 1);
        assert_eq!(kmeans.populations(), &[1, 2]);
    }

    #[test]
    fn test_rejects_zero_iterations() {
        assert!(matches!(
            KMeans::<f32, ScalarKernel>::new(&[1.0], &[1.0], 1, 0, EmptyClusterPolicy::Skip),
            Err(ClusteringError::Parameter(_))
        ));
    }
}

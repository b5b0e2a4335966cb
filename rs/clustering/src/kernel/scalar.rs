use crate::element::Element;
use crate::kernel::{Kernel, KernelKind};
use crate::store::CentroidStore;

/// Element-at-a-time kernel. Works for every element type.
pub struct ScalarKernel {}

impl<T: Element> Kernel<T> for ScalarKernel {
    const KIND: KernelKind = KernelKind::Scalar;

    #[inline]
    fn distance(a: &[T], b: &[T]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x.to_f64() - y.to_f64()).powi(2))
            .sum::<f64>()
    }

    fn recompute(store: &mut CentroidStore<T>) -> Vec<usize> {
        let cols = store.cols();
        let mut sums = vec![T::Wide::default(); store.num_centroids() * cols];
        store.populations.fill(0);

        for (point, &assignment) in store.assignments.iter().enumerate() {
            let centroid = assignment as usize;
            store.populations[centroid] += 1;
            let sum = &mut sums[centroid * cols..(centroid + 1) * cols];
            for (s, &x) in sum.iter_mut().zip(store.points.row(point)) {
                *s += x.widen();
            }
        }

        let mut empty = vec![];
        for (centroid, sum) in sums.chunks_exact(cols).enumerate() {
            let population = store.populations[centroid];
            if population == 0 {
                empty.push(centroid);
                continue;
            }
            for (c, &s) in store.centroids.row_mut(centroid).iter_mut().zip(sum) {
                *c = T::mean(s, population);
            }
        }
        empty
    }

    fn move_point(store: &mut CentroidStore<T>, dest: usize, src: usize, point: usize) {
        let view = store.move_view(dest, src, point);
        let dest_population = view.dest_population as f64;
        let src_population = view.src_population as f64;

        // The point left `src`: src += (src - p) / n_src. Nothing to do once `src` is empty.
        if view.src_population > 0 {
            for (c, &p) in view.src.iter_mut().zip(view.point) {
                let c64 = c.to_f64();
                *c = T::from_f64(c64 + (c64 - p.to_f64()) / src_population);
            }
        }
        // The point joined `dest`: dest += (p - dest) / n_dest.
        for (c, &p) in view.dest.iter_mut().zip(view.point) {
            let c64 = c.to_f64();
            *c = T::from_f64(c64 + (p.to_f64() - c64) / dest_population);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_distance() {
        assert_eq!(
            <ScalarKernel as Kernel<f32>>::distance(&[1.0, 2.0, 3.0], &[4.0, 6.0, 3.0]),
            25.0
        );
        // No overflow or wrap-around for narrow unsigned types.
        assert_eq!(
            <ScalarKernel as Kernel<u8>>::distance(&[0, 255], &[255, 0]),
            2.0 * 255.0 * 255.0
        );
        assert_eq!(<ScalarKernel as Kernel<i8>>::distance(&[-128], &[127]), 65025.0);
    }

    #[test]
    fn test_recompute_means() {
        let points = [0.0f64, 0.0, 2.0, 2.0, 10.0, 10.0, 4.0, 0.0];
        let mut store = CentroidStore::new(&points, &[0.0, 0.0, 0.0, 0.0, 7.0, 7.0], 2).unwrap();
        store.assignments.copy_from_slice(&[0, 0, 1, 0]);

        let empty = ScalarKernel::recompute(&mut store);
        assert_eq!(empty, vec![2]);
        assert_eq!(store.populations(), &[3, 1, 0]);
        assert!(store.check_populations());
        assert_relative_eq!(store.centroids().row(0)[0], 2.0);
        assert_relative_eq!(store.centroids().row(0)[1], 2.0 / 3.0);
        assert_eq!(store.centroids().row(1), &[10.0, 10.0]);
        // Empty centroid keeps its row.
        assert_eq!(store.centroids().row(2), &[7.0, 7.0]);
    }

    #[test]
    fn test_recompute_u8_uses_wide_sums() {
        let points = vec![250u8; 64];
        let mut store = CentroidStore::new(&points, &[0], 1).unwrap();
        let empty = ScalarKernel::recompute(&mut store);
        assert!(empty.is_empty());
        assert_eq!(store.centroids().row(0), &[250]);
    }

    #[test]
    fn test_move_point_matches_recompute() {
        let points = [1.0f64, 3.0, 5.0, 11.0, 13.0];
        let mut store = CentroidStore::new(&points, &[0.0, 0.0], 1).unwrap();
        store.assignments.copy_from_slice(&[0, 0, 0, 1, 1]);
        ScalarKernel::recompute(&mut store);
        assert_eq!(store.centroids().as_slice(), &[3.0, 12.0]);

        // Move point 2 (value 5) from centroid 0 to centroid 1.
        let src = store.reassign(2, 1);
        ScalarKernel::move_point(&mut store, 1, src, 2);
        assert_relative_eq!(store.centroids().row(0)[0], 2.0);
        assert_relative_eq!(store.centroids().row(1)[0], 29.0 / 3.0);

        let incremental = store.centroids().as_slice().to_vec();
        ScalarKernel::recompute(&mut store);
        for (a, b) in incremental.iter().zip(store.centroids().as_slice()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_move_last_point_out() {
        let mut store = CentroidStore::new(&[4.0f32, 8.0], &[4.0, 8.0], 1).unwrap();
        store.assignments.copy_from_slice(&[0, 1]);
        ScalarKernel::recompute(&mut store);

        let src = store.reassign(0, 1);
        ScalarKernel::move_point(&mut store, 1, src, 0);
        assert_eq!(store.populations(), &[0, 2]);
        // Empty source is left alone instead of dividing by zero.
        assert_eq!(store.centroids().row(0), &[4.0]);
        assert_eq!(store.centroids().row(1), &[6.0]);
    }
}

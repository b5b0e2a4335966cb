use std::slice::ChunksExact;

use utils::mem::AlignedBuffer;

use crate::element::Element;
use crate::error::{ClusteringError, Result};

/// Byte alignment of every row in a store. Fixed at construction from the row size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Unconstrained,
    Align8,
    Align16,
}

impl Alignment {
    pub fn for_row_bytes(row_bytes: usize) -> Self {
        if row_bytes % 16 == 0 {
            Alignment::Align16
        } else if row_bytes % 8 == 0 {
            Alignment::Align8
        } else {
            Alignment::Unconstrained
        }
    }

    pub fn bytes(&self) -> Option<usize> {
        match self {
            Alignment::Unconstrained => None,
            Alignment::Align8 => Some(8),
            Alignment::Align16 => Some(16),
        }
    }

    /// Alignment to request from the allocator for a buffer of `T`.
    pub fn buffer_alignment<T>(&self) -> usize {
        self.bytes()
            .unwrap_or(0)
            .max(std::mem::align_of::<T>())
    }
}

/// Row-major matrix on an aligned buffer.
#[derive(Debug, Clone)]
pub struct AlignedMatrix<T: Element> {
    buffer: AlignedBuffer<T>,
    rows: usize,
    cols: usize,
}

impl<T: Element> AlignedMatrix<T> {
    pub fn from_slice(values: &[T], cols: usize, alignment: Alignment) -> Result<Self> {
        let buffer = AlignedBuffer::from_slice(values, alignment.buffer_alignment::<T>())
            .map_err(|e| ClusteringError::Parameter(e.to_string()))?;
        debug_assert!(buffer.is_aligned());
        Ok(Self {
            buffer,
            rows: values.len() / cols,
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        debug_assert!(row < self.rows, "row {} out of {}", row, self.rows);
        &self.buffer[row * self.cols..(row + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        debug_assert!(row < self.rows, "row {} out of {}", row, self.rows);
        &mut self.buffer[row * self.cols..(row + 1) * self.cols]
    }

    /// Two distinct rows, both mutable, returned in argument order.
    pub fn rows_pair_mut(&mut self, a: usize, b: usize) -> (&mut [T], &mut [T]) {
        assert_ne!(a, b, "rows_pair_mut needs two distinct rows");
        let cols = self.cols;
        if a < b {
            let (low, high) = self.buffer.split_at_mut(b * cols);
            (&mut low[a * cols..(a + 1) * cols], &mut high[..cols])
        } else {
            let (low, high) = self.buffer.split_at_mut(a * cols);
            (&mut high[..cols], &mut low[b * cols..(b + 1) * cols])
        }
    }

    pub fn iter_rows(&self) -> ChunksExact<'_, T> {
        self.buffer.chunks_exact(self.cols)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buffer
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buffer
    }
}

/// Everything one incremental move touches: the point and both centroid rows, with the
/// populations already updated for the move.
pub(crate) struct MoveView<'a, T> {
    pub dest: &'a mut [T],
    pub src: &'a mut [T],
    pub point: &'a [T],
    pub dest_population: u32,
    pub src_population: u32,
}

/// Flat `f32` view of the store used by the vector kernels for a full recompute.
pub(crate) struct LaneView<'a> {
    pub cols: usize,
    pub points: &'a [f32],
    pub centroids: &'a mut [f32],
    pub assignments: &'a [u32],
    pub populations: &'a mut [u32],
}

/// Points and centroids on aligned rows, plus the assignment of each point and the population
/// of each centroid.
#[derive(Debug, Clone)]
pub struct CentroidStore<T: Element> {
    pub(crate) points: AlignedMatrix<T>,
    pub(crate) centroids: AlignedMatrix<T>,
    pub(crate) assignments: Vec<u32>,
    pub(crate) populations: Vec<u32>,
    pub(crate) best_distances: Vec<f64>,
    alignment: Alignment,
}

impl<T: Element> CentroidStore<T> {
    /// Copies `points` and `centroids`, both flattened rows of `cols` values. Every point starts
    /// out assigned to centroid 0.
    pub fn new(points: &[T], centroids: &[T], cols: usize) -> Result<Self> {
        if cols == 0 {
            return Err(ClusteringError::Parameter(
                "dimensionality must be at least 1".to_string(),
            ));
        }
        if points.is_empty() {
            return Err(ClusteringError::EmptyInput("no data points".to_string()));
        }
        if centroids.is_empty() {
            return Err(ClusteringError::EmptyInput("no centroids".to_string()));
        }
        if points.len() % cols != 0 {
            return Err(ClusteringError::Parameter(format!(
                "{} point values do not divide into rows of {}",
                points.len(),
                cols
            )));
        }
        if centroids.len() % cols != 0 {
            return Err(ClusteringError::Parameter(format!(
                "{} centroid values do not divide into rows of {}",
                centroids.len(),
                cols
            )));
        }

        let num_points = points.len() / cols;
        let num_centroids = centroids.len() / cols;
        if num_points > u32::MAX as usize || num_centroids > u32::MAX as usize {
            return Err(ClusteringError::Parameter(format!(
                "{} points and {} centroids exceed the supported count",
                num_points, num_centroids
            )));
        }

        let alignment = Alignment::for_row_bytes(cols * std::mem::size_of::<T>());
        let mut populations = vec![0; num_centroids];
        populations[0] = num_points as u32;

        Ok(Self {
            points: AlignedMatrix::from_slice(points, cols, alignment)?,
            centroids: AlignedMatrix::from_slice(centroids, cols, alignment)?,
            assignments: vec![0; num_points],
            populations,
            best_distances: vec![f64::INFINITY; num_centroids],
            alignment,
        })
    }

    pub fn cols(&self) -> usize {
        self.points.cols()
    }

    pub fn num_points(&self) -> usize {
        self.points.rows()
    }

    pub fn num_centroids(&self) -> usize {
        self.centroids.rows()
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn points(&self) -> &AlignedMatrix<T> {
        &self.points
    }

    pub fn centroids(&self) -> &AlignedMatrix<T> {
        &self.centroids
    }

    pub fn assignments(&self) -> &[u32] {
        &self.assignments
    }

    pub fn populations(&self) -> &[u32] {
        &self.populations
    }

    /// Closest distance seen from each centroid to a point assigned to it during the latest
    /// nearest-centroid assignment. Infinity for centroids that got no points.
    pub fn best_distances(&self) -> &[f64] {
        &self.best_distances
    }

    /// True when populations sum to the number of points and each one matches the number of
    /// assignments pointing at its centroid.
    pub fn check_populations(&self) -> bool {
        let mut counts = vec![0u32; self.num_centroids()];
        for &assignment in &self.assignments {
            match counts.get_mut(assignment as usize) {
                Some(count) => *count += 1,
                None => return false,
            }
        }
        counts == self.populations
    }

    /// Record that `point` now belongs to `dest`, updating both populations. Returns the
    /// centroid it left.
    pub(crate) fn reassign(&mut self, point: usize, dest: usize) -> usize {
        let src = self.assignments[point] as usize;
        self.assignments[point] = dest as u32;
        self.populations[dest] += 1;
        self.populations[src] -= 1;
        src
    }

    pub(crate) fn move_view(&mut self, dest: usize, src: usize, point: usize) -> MoveView<'_, T> {
        let dest_population = self.populations[dest];
        let src_population = self.populations[src];
        let (dest, src) = self.centroids.rows_pair_mut(dest, src);
        MoveView {
            dest,
            src,
            point: self.points.row(point),
            dest_population,
            src_population,
        }
    }

    pub(crate) fn lane_move_view(
        &mut self,
        dest: usize,
        src: usize,
        point: usize,
    ) -> Option<MoveView<'_, f32>> {
        let view = self.move_view(dest, src, point);
        Some(MoveView {
            dest: T::as_lanes_mut(view.dest)?,
            src: T::as_lanes_mut(view.src)?,
            point: T::as_lanes(view.point)?,
            dest_population: view.dest_population,
            src_population: view.src_population,
        })
    }

    pub(crate) fn lane_view(&mut self) -> Option<LaneView<'_>> {
        let cols = self.cols();
        Some(LaneView {
            cols,
            points: T::as_lanes(self.points.as_slice())?,
            centroids: T::as_lanes_mut(self.centroids.as_mut_slice())?,
            assignments: &self.assignments,
            populations: &mut self.populations,
        })
    }
}

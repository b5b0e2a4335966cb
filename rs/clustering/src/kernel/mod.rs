pub mod lanes;
pub mod scalar;

use config::enums::{DataType, HardwareType};
use log::warn;
use strum::EnumIter;

pub use self::lanes::{Vector128Kernel, Vector64Kernel};
pub use self::scalar::ScalarKernel;
use crate::element::Element;
use crate::error::{ClusteringError, Result};
use crate::store::CentroidStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum KernelKind {
    Scalar,
    /// 4 x f32 lanes, rows on 16-byte boundaries.
    Vector128,
    /// 2 x f32 lanes, rows on 8-byte boundaries.
    Vector64,
}

/// Arithmetic used by the clustering loop. Implementations are stateless; the loop is
/// monomorphised over the kernel so every call is static.
pub trait Kernel<T: Element> {
    const KIND: KernelKind;

    /// Squared Euclidean distance between two rows of equal length.
    fn distance(a: &[T], b: &[T]) -> f64;

    /// Recount populations from the assignments and set every populated centroid to the mean
    /// of its points. Centroids without points keep their row and are returned.
    fn recompute(store: &mut CentroidStore<T>) -> Vec<usize>;

    /// Incrementally move `point` out of centroid `src` and into centroid `dest`. Populations
    /// must already reflect the move.
    fn move_point(store: &mut CentroidStore<T>, dest: usize, src: usize, point: usize);
}

/// Pick a kernel from the row size in bytes.
pub fn select_kernel(element_size: usize, cols: usize, supports_vector: bool) -> KernelKind {
    if !supports_vector {
        return KernelKind::Scalar;
    }
    let row_bytes = element_size * cols;
    if row_bytes % 16 == 0 {
        KernelKind::Vector128
    } else if row_bytes % 8 == 0 {
        KernelKind::Vector64
    } else {
        KernelKind::Scalar
    }
}

/// Whether `data_type` has vector kernels.
pub fn supports_vector(data_type: DataType) -> bool {
    data_type == DataType::Float
}

/// Apply a hardware preference on top of [`select_kernel`].
pub fn resolve_kernel(
    hardware: HardwareType,
    data_type: DataType,
    cols: usize,
) -> Result<KernelKind> {
    let vector = supports_vector(data_type);
    match hardware {
        HardwareType::Scalar => Ok(KernelKind::Scalar),
        HardwareType::Gpu => {
            warn!("GPU kernel is not available, falling back to scalar");
            Ok(KernelKind::Scalar)
        }
        HardwareType::Vector if !vector => Err(ClusteringError::Parameter(format!(
            "vector kernels are not available for {:?} elements",
            data_type
        ))),
        HardwareType::Vector => {
            let kind = select_kernel(data_type.size(), cols, vector);
            if kind == KernelKind::Scalar {
                warn!(
                    "Rows of {} x {:?} are not 8-byte multiples, falling back to scalar",
                    cols, data_type
                );
            }
            Ok(kind)
        }
        HardwareType::Auto => Ok(select_kernel(data_type.size(), cols, vector)),
    }
}

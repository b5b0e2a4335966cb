use config::clustering::ClusteringConfig;
use log::info;

use crate::element::Element;
use crate::error::{ClusteringError, Result};
use crate::kernel::{resolve_kernel, KernelKind, ScalarKernel, Vector128Kernel, Vector64Kernel};
use crate::kmeans::{CalcOutcome, KMeans};
use crate::seeding::CentroidSeed;
use crate::store::CentroidStore;

/// A clustering run on the kernel picked from the element type and row layout, adjusted by the
/// hardware preference. The choice is made once, in [`Engine::build`].
pub enum Engine<T: Element> {
    Scalar(KMeans<T, ScalarKernel>),
    Vector128(KMeans<T, Vector128Kernel>),
    Vector64(KMeans<T, Vector64Kernel>),
}

macro_rules! dispatch {
    ($engine:expr, $kmeans:ident => $body:expr) => {
        match $engine {
            Engine::Scalar($kmeans) => $body,
            Engine::Vector128($kmeans) => $body,
            Engine::Vector64($kmeans) => $body,
        }
    };
}

impl<T: Element> Engine<T> {
    pub fn build(
        points: &[T],
        cols: usize,
        seed: CentroidSeed<'_, T>,
        config: &ClusteringConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ClusteringError::Parameter(e.to_string()))?;
        if config.data_type != T::DATA_TYPE {
            return Err(ClusteringError::Parameter(format!(
                "configured data type {:?} does not match {:?} elements",
                config.data_type,
                T::DATA_TYPE
            )));
        }
        let centroids = seed.initial_centroids(points, cols)?;
        let kind = resolve_kernel(config.hardware, T::DATA_TYPE, cols)?;
        info!(
            "Using {:?} kernel for {} x {:?} rows ({:?} requested)",
            kind,
            cols,
            T::DATA_TYPE,
            config.hardware
        );
        Ok(match kind {
            KernelKind::Scalar => {
                Engine::Scalar(KMeans::from_config(points, &centroids, cols, config)?)
            }
            KernelKind::Vector128 => {
                Engine::Vector128(KMeans::from_config(points, &centroids, cols, config)?)
            }
            KernelKind::Vector64 => {
                Engine::Vector64(KMeans::from_config(points, &centroids, cols, config)?)
            }
        })
    }

    pub fn kernel(&self) -> KernelKind {
        dispatch!(self, kmeans => kmeans.kernel())
    }

    pub fn calc(&mut self) -> Result<CalcOutcome> {
        dispatch!(self, kmeans => kmeans.calc())
    }

    pub fn outcome(&self) -> CalcOutcome {
        dispatch!(self, kmeans => kmeans.outcome())
    }

    pub fn reassign_once(&mut self) -> usize {
        dispatch!(self, kmeans => kmeans.reassign_once())
    }

    pub fn store(&self) -> &CentroidStore<T> {
        dispatch!(self, kmeans => kmeans.store())
    }

    pub fn cols(&self) -> usize {
        dispatch!(self, kmeans => kmeans.cols())
    }

    pub fn centroids(&self) -> &[T] {
        dispatch!(self, kmeans => kmeans.centroids())
    }

    pub fn copy_centroids(&self) -> Vec<T> {
        dispatch!(self, kmeans => kmeans.copy_centroids())
    }

    pub fn assignments(&self) -> &[u32] {
        dispatch!(self, kmeans => kmeans.assignments())
    }

    pub fn populations(&self) -> &[u32] {
        dispatch!(self, kmeans => kmeans.populations())
    }

    pub fn duration_micros(&self) -> u128 {
        dispatch!(self, kmeans => kmeans.duration_micros())
    }
}

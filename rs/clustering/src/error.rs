use thiserror::Error;

/// Failures surfaced by the clustering engine. Parameter and input problems are reported before
/// any iteration starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusteringError {
    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("centroid {centroid} has no points assigned")]
    NumericDegeneracy { centroid: usize },
}

pub type Result<T> = std::result::Result<T, ClusteringError>;

use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Element type of the values read from the input files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    #[default]
    Float,
    Double,
}

impl DataType {
    /// Size in bytes of a single element of this type.
    pub fn size(&self) -> usize {
        match self {
            DataType::Uint8 | DataType::Int8 => 1,
            DataType::Uint16 | DataType::Int16 => 2,
            DataType::Uint32 | DataType::Int32 | DataType::Float => 4,
            DataType::Uint64 | DataType::Int64 | DataType::Double => 8,
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uint8" => Ok(DataType::Uint8),
            "uint16" => Ok(DataType::Uint16),
            "uint32" => Ok(DataType::Uint32),
            "uint64" => Ok(DataType::Uint64),
            "int8" => Ok(DataType::Int8),
            "int16" => Ok(DataType::Int16),
            "int32" => Ok(DataType::Int32),
            "int64" => Ok(DataType::Int64),
            "float" => Ok(DataType::Float),
            "double" => Ok(DataType::Double),
            _ => Err(anyhow!("Data type [{}] not recognised", s)),
        }
    }
}

/// Which execution kernel the caller would like the engine to run on.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum HardwareType {
    /// Pick the widest vector kernel the row layout allows.
    #[default]
    Auto,
    Scalar,
    Vector,
    // Not implemented, always falls back to Scalar.
    Gpu,
}

impl FromStr for HardwareType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" | "auto" => Ok(HardwareType::Auto),
            "cpu" | "scalar" => Ok(HardwareType::Scalar),
            "simd" | "vector" => Ok(HardwareType::Vector),
            "gpu" => Ok(HardwareType::Gpu),
            _ => Err(anyhow!("Accelerator type [{}] not recognised", s)),
        }
    }
}

/// What the convergence loop does when a centroid ends up with no points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyClusterPolicy {
    /// Leave the centroid row as it was before the update.
    #[default]
    Skip,
    /// Fail the calculation.
    Error,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_data_type_parse() {
        assert_eq!("float".parse::<DataType>().unwrap(), DataType::Float);
        assert_eq!("int16".parse::<DataType>().unwrap(), DataType::Int16);
        assert!("longdouble".parse::<DataType>().is_err());
    }

    #[test]
    fn test_data_type_sizes() {
        for data_type in DataType::iter() {
            let expected = match data_type {
                DataType::Uint8 | DataType::Int8 => 1,
                DataType::Uint16 | DataType::Int16 => 2,
                DataType::Uint32 | DataType::Int32 | DataType::Float => 4,
                _ => 8,
            };
            assert_eq!(data_type.size(), expected);
        }
    }

    #[test]
    fn test_hardware_type_parse() {
        assert_eq!("best".parse::<HardwareType>().unwrap(), HardwareType::Auto);
        assert_eq!("cpu".parse::<HardwareType>().unwrap(), HardwareType::Scalar);
        assert_eq!("simd".parse::<HardwareType>().unwrap(), HardwareType::Vector);
        assert_eq!("gpu".parse::<HardwareType>().unwrap(), HardwareType::Gpu);
        assert!("fpga".parse::<HardwareType>().is_err());
    }
}

use std::fmt::Debug;
use std::ops::AddAssign;

use config::enums::DataType;

/// Numeric types the engine can cluster.
pub trait Element: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Accumulator for centroid sums. Wide enough that summing a whole cluster cannot overflow.
    type Wide: Copy + Default + AddAssign + Debug;

    const DATA_TYPE: DataType;

    fn widen(self) -> Self::Wide;

    fn to_f64(self) -> f64;

    /// Rounds and saturates for integer types.
    fn from_f64(value: f64) -> Self;

    /// Mean of `count` values summing to `sum`. `count` must be positive.
    fn mean(sum: Self::Wide, count: u32) -> Self;

    /// View a row as `f32` lanes. Only implemented by element types that have vector kernels.
    fn as_lanes(_row: &[Self]) -> Option<&[f32]> {
        None
    }

    fn as_lanes_mut(_row: &mut [Self]) -> Option<&mut [f32]> {
        None
    }
}

macro_rules! impl_integer_element {
    ($($t:ty => $data_type:ident),* $(,)?) => {
        $(
            impl Element for $t {
                type Wide = i128;

                const DATA_TYPE: DataType = DataType::$data_type;

                #[inline]
                fn widen(self) -> i128 {
                    self as i128
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value.round() as $t
                }

                // Truncates toward zero, like integer division in the element type.
                #[inline]
                fn mean(sum: i128, count: u32) -> Self {
                    num_traits::cast(sum / count as i128).unwrap_or_default()
                }
            }
        )*
    };
}

impl_integer_element!(
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
);

impl Element for f32 {
    type Wide = f64;

    const DATA_TYPE: DataType = DataType::Float;

    #[inline]
    fn widen(self) -> f64 {
        self as f64
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn mean(sum: f64, count: u32) -> Self {
        (sum / count as f64) as f32
    }

    #[inline]
    fn as_lanes(row: &[f32]) -> Option<&[f32]> {
        Some(row)
    }

    #[inline]
    fn as_lanes_mut(row: &mut [f32]) -> Option<&mut [f32]> {
        Some(row)
    }
}

impl Element for f64 {
    type Wide = f64;

    const DATA_TYPE: DataType = DataType::Double;

    #[inline]
    fn widen(self) -> f64 {
        self
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn mean(sum: f64, count: u32) -> Self {
        sum / count as f64
    }
}

//! Loader for NumPy `.npy` files.

use std::io::Cursor;

use ndarray::{Array2, ArrayD, Ix2};
use ndarray_npy::{ReadNpyExt, ReadableElement};

use crate::data::loader::{ItemLoader, LoaderError};

/// Loader for NumPy `.npy` files.
///
/// Only 2-D arrays are accepted. Supported dtypes: `f64`, `f32`, `u8`,
/// `u16`, `i16`, `i32`, `i64`. Values are widened to `f64` unchanged; any
/// display scaling is left to the preprocessing transform.
pub struct NpyLoader;

impl NpyLoader {
    /// NumPy magic bytes: \x93NUMPY
    const MAGIC: &'static [u8] = &[0x93, b'N', b'U', b'M', b'P', b'Y'];

    fn read_as<T>(data: &[u8]) -> Option<ArrayD<f64>>
    where
        T: ReadableElement + ToF64 + Copy,
    {
        ArrayD::<T>::read_npy(Cursor::new(data))
            .ok()
            .map(|array| array.mapv(ToF64::to_f64))
    }
}

impl ItemLoader for NpyLoader {
    fn id(&self) -> &'static str {
        "npy"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["npy"]
    }

    fn can_load(&self, data: &[u8]) -> bool {
        data.starts_with(Self::MAGIC)
    }

    fn load(&self, data: &[u8]) -> Result<Array2<f64>, LoaderError> {
        let array = Self::read_as::<f64>(data)
            .or_else(|| Self::read_as::<f32>(data))
            .or_else(|| Self::read_as::<u8>(data))
            .or_else(|| Self::read_as::<u16>(data))
            .or_else(|| Self::read_as::<i16>(data))
            .or_else(|| Self::read_as::<i32>(data))
            .or_else(|| Self::read_as::<i64>(data))
            .ok_or_else(|| {
                LoaderError::new("Failed to read NumPy array: unsupported dtype or invalid format")
            })?;

        let shape = array.shape().to_vec();
        log::debug!("NpyLoader: array shape = {:?}", shape);

        array.into_dimensionality::<Ix2>().map_err(|_| {
            LoaderError::new(format!(
                "Unsupported array shape {:?} (expected 2 dimensions)",
                shape
            ))
        })
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// Lossless-enough widening to `f64` for the dtypes NumPy files carry.
trait ToF64 {
    fn to_f64(self) -> f64;
}

impl ToF64 for f64 {
    fn to_f64(self) -> f64 {
        self
    }
}

impl ToF64 for f32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl ToF64 for u8 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl ToF64 for u16 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl ToF64 for i16 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl ToF64 for i32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl ToF64 for i64 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

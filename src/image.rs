//! Detector images
//!
//! An [Image] is the in-memory 2D grid of intensity samples of one exposure,
//! rows along the fiber axis and columns along the dispersion axis.
//! Images are loaded from `.npy` files or, with the `fits` feature, from FITS files.

use nalgebra::DMatrix;
use std::{
    io,
    path::{Path, PathBuf},
};

#[cfg(feature = "fits")]
mod fits;
mod npy;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to open {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("unsupported image file extension: {0:?}")]
    Extension(PathBuf),
    #[error("reading {0:?} requires the `{1}` feature")]
    Feature(PathBuf, &'static str),
    #[error("failed to decode npy data")]
    Npy(#[source] io::Error),
    #[error("expected a 2D image, found {0} dimension(s)")]
    Dimensions(usize),
    #[error("unsupported pixel data type: {0}")]
    DataType(String),
    #[error("a {rows}x{cols} image needs {expected} samples, found {found}")]
    SampleCount {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },
    #[error("row #{row} has {found} samples, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[cfg(feature = "fits")]
    #[error("FITS error")]
    Fits(#[from] fitsio::errors::Error),
    #[cfg(feature = "fits")]
    #[error("no 2D image HDU in {0:?}")]
    NoImageHdu(PathBuf),
}
pub type Result<T> = std::result::Result<T, ImageError>;

/// Exposure metadata carried along with the pixels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageHeader {
    /// Plug plate identifier (`PLATEID`)
    pub plate_id: Option<i64>,
    /// Observation date (`DATE-OBS`)
    pub date_obs: Option<String>,
}

/// 2D detector image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: DMatrix<f64>,
    header: ImageHeader,
}
impl From<DMatrix<f64>> for Image {
    fn from(data: DMatrix<f64>) -> Self {
        Self {
            data,
            header: ImageHeader::default(),
        }
    }
}
impl Image {
    /// Creates an image from samples stored row after row
    pub fn from_row_major(rows: usize, cols: usize, samples: Vec<f64>) -> Result<Self> {
        let expected = rows * cols;
        if samples.len() != expected {
            return Err(ImageError::SampleCount {
                rows,
                cols,
                expected,
                found: samples.len(),
            });
        }
        Ok(DMatrix::from_row_slice(rows, cols, &samples).into())
    }
    /// Creates an image from a slice of rows
    ///
    /// All the rows must have the same length
    pub fn from_rows<R, T>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[T]>,
        T: Copy + Into<f64>,
    {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        if let Some((row, found)) = rows
            .iter()
            .map(|row| row.as_ref().len())
            .enumerate()
            .find(|&(_, len)| len != cols)
        {
            return Err(ImageError::RowLength {
                row,
                expected: cols,
                found,
            });
        }
        let samples: Vec<f64> = rows
            .iter()
            .flat_map(|row| row.as_ref().iter().map(|&x| x.into()))
            .collect();
        Self::from_row_major(rows.len(), cols, samples)
    }
    /// Loads an image from a file, the format is chosen from the file extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        log::info!("Loading {:?}...", path);
        match extension.as_deref() {
            Some("npy") => npy::load(path),
            #[cfg(feature = "fits")]
            Some("fits" | "fit" | "fts") => fits::load(path),
            #[cfg(not(feature = "fits"))]
            Some("fits" | "fit" | "fts") => Err(ImageError::Feature(path.to_path_buf(), "fits")),
            _ => Err(ImageError::Extension(path.to_path_buf())),
        }
    }
    pub fn with_header(self, header: ImageHeader) -> Self {
        Self { header, ..self }
    }
    pub fn header(&self) -> &ImageHeader {
        &self.header
    }
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }
    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }
    /// Median of the samples in `row`
    ///
    /// Returns `None` if the image has no column
    ///
    /// # Panics
    /// If `row` is out of bounds
    pub fn row_median(&self, row: usize) -> Option<f64> {
        let mut samples: Vec<f64> = self.data.row(row).iter().copied().collect();
        median(&mut samples)
    }
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

/// Median of a sample set, sorting it in place
///
/// An even number of samples gives the mean of the two middle values.
/// Any NaN sample makes the median NaN.
pub fn median(samples: &mut [f64]) -> Option<f64> {
    let n = samples.len();
    if n == 0 {
        return None;
    }
    if samples.iter().any(|x| x.is_nan()) {
        return Some(f64::NAN);
    }
    samples.sort_by(f64::total_cmp);
    let mid = n / 2;
    if n % 2 == 0 {
        Some(0.5 * (samples[mid - 1] + samples[mid]))
    } else {
        Some(samples[mid])
    }
}

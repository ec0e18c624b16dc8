//! # fiber-sort
//!
//! Fiber throughput classification for fiber-fed spectrographs like APOGEE.
//!
//! The median flux of every fiber of an exposure is compared to the median flux of the same
//! fiber in a reference exposure, usually the master flat, and the fiber is classified as
//! missing, faint or good according to the flux ratio.
//!
//! ```no_run
//! use fiber_sort::{FiberRatioAnalyzer, FiberSummary, Image, InstrumentConfig};
//!
//! # fn main() -> Result<(), fiber_sort::Error> {
//! let reference = Image::load("apFlat-24960049.npy")?;
//! let (_, reports) = fiber_sort::analyze_file(
//!     &FiberRatioAnalyzer::from(InstrumentConfig::default()),
//!     &reference,
//!     "ap1D-a-28030017.npy",
//! )?;
//! println!("{}", FiberSummary::new(&reports));
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod config;
mod error;
pub mod fibers;
pub mod image;
#[cfg(feature = "plot")]
pub mod plot;
pub mod report;
pub mod summary;

pub use config::InstrumentConfig;
pub use error::Error;
pub use fibers::{analyze, Classification, FiberRatioAnalyzer, FiberReport, Thresholds};
pub use image::{Image, ImageHeader};
pub use report::ReportFiles;
pub use summary::FiberSummary;

/// Loads the image at `path` and classifies its fibers against `reference`
pub fn analyze_file<P: AsRef<Path>>(
    analyzer: &FiberRatioAnalyzer,
    reference: &Image,
    path: P,
) -> Result<(Image, Vec<FiberReport>), Error> {
    let image = Image::load(path)?;
    let reports = analyzer.analyze(reference, &image)?;
    Ok((image, reports))
}

//! Fiber throughput classification
//!
//! The flux of a fiber is the median of its row across the dispersion axis.
//! Each fiber of a comparison exposure is compared to the same fiber of a reference
//! exposure (usually the master flat) where all the fibers are fully illuminated:
//!
//! | flux ratio                  | classification |
//! |-----------------------------|----------------|
//! | ratio < missing             | Missing        |
//! | missing <= ratio < faint    | Faint          |
//! | ratio >= faint              | Good           |
//! | zero or non-finite flux     | Undefined      |
//!
//! Fibers are stored in reverse order in the extracted images: the logical fiber `j`
//! is the row `fiber_count - 1 - j` of the images.

use serde::Serialize;
use std::fmt;
use strum_macros::EnumIter;

use crate::{config::InstrumentConfig, image::Image};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ThresholdsError {
    #[error("thresholds must be finite and positive (missing: {missing}, faint: {faint})")]
    Range { missing: f64, faint: f64 },
    #[error("missing threshold ({missing}) must be lower than faint threshold ({faint})")]
    Order { missing: f64, faint: f64 },
}

/// Invalid inputs to [FiberRatioAnalyzer::analyze], no report is produced
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("reference {reference:?} and comparison {comparison:?} images have different shapes")]
    ShapeMismatch {
        reference: (usize, usize),
        comparison: (usize, usize),
    },
    #[error("the number of fibers must be greater than zero")]
    FiberCount,
    #[error("{fiber_count} fibers requested but the images have only {rows} rows")]
    TooManyFibers { fiber_count: usize, rows: usize },
    #[error("the images have no column")]
    EmptyRows,
    #[error("invalid classification thresholds")]
    Thresholds(#[from] ThresholdsError),
}
type Result<T> = std::result::Result<T, AnalyzerError>;

/// Fiber throughput class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize)]
pub enum Classification {
    Missing,
    Faint,
    Good,
    /// The flux ratio cannot be computed, e.g. the reference flux is zero
    Undefined,
}
impl Classification {
    pub fn is_defined(&self) -> bool {
        *self != Classification::Undefined
    }
}
impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Missing => write!(f, "Missing"),
            Classification::Faint => write!(f, "Faint"),
            Classification::Good => write!(f, "Good"),
            Classification::Undefined => write!(f, "Undefined"),
        }
    }
}

/// Flux ratio thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// fibers below this ratio are missing
    pub missing: f64,
    /// fibers below this ratio are faint
    pub faint: f64,
}
impl Thresholds {
    pub fn new(missing: f64, faint: f64) -> std::result::Result<Self, ThresholdsError> {
        let this = Self { missing, faint };
        this.validate()?;
        Ok(this)
    }
    /// Checks that `0 < missing < faint < inf`
    pub fn validate(&self) -> std::result::Result<(), ThresholdsError> {
        let &Self { missing, faint } = self;
        let in_range = |x: f64| x.is_finite() && x > 0f64;
        if !in_range(missing) || !in_range(faint) {
            return Err(ThresholdsError::Range { missing, faint });
        }
        if missing >= faint {
            return Err(ThresholdsError::Order { missing, faint });
        }
        Ok(())
    }
    /// Classifies a flux ratio
    ///
    /// Each band includes its lower bound
    pub fn classify(&self, ratio: f64) -> Classification {
        if !ratio.is_finite() {
            Classification::Undefined
        } else if ratio < self.missing {
            Classification::Missing
        } else if ratio < self.faint {
            Classification::Faint
        } else {
            Classification::Good
        }
    }
}

/// Flux statistics and classification of a single fiber
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiberReport {
    #[serde(rename = "Fiber")]
    pub fiber_index: usize,
    #[serde(rename = "Flux")]
    pub flux: f64,
    #[serde(rename = "Reference flux")]
    pub reference_flux: f64,
    #[serde(rename = "Ratio")]
    pub ratio: f64,
    #[serde(rename = "Difference [%]")]
    pub percent_difference: f64,
    #[serde(rename = "Class")]
    pub classification: Classification,
}
impl FiberReport {
    /// Compares a fiber flux to its reference flux
    ///
    /// A zero or non-finite flux yields a NaN ratio and percent difference
    /// and the [Classification::Undefined] class.
    pub fn new(
        fiber_index: usize,
        flux: f64,
        reference_flux: f64,
        thresholds: &Thresholds,
    ) -> Self {
        let (ratio, percent_difference) =
            if reference_flux == 0f64 || !reference_flux.is_finite() || !flux.is_finite() {
                (f64::NAN, f64::NAN)
            } else {
                (
                    flux / reference_flux,
                    (flux - reference_flux) / reference_flux * 100f64,
                )
            };
        Self {
            fiber_index,
            flux,
            reference_flux,
            ratio,
            percent_difference,
            classification: thresholds.classify(ratio),
        }
    }
    /// Fiber number starting from 1
    pub fn fiber_number(&self) -> usize {
        self.fiber_index + 1
    }
}
impl fmt::Display for FiberReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fiber no. {}; flux : {}, refflux : {}, ratio : {}, perdiff : {}",
            self.fiber_index, self.flux, self.reference_flux, self.ratio, self.percent_difference
        )
    }
}

/// Fiber flux ratio analysis of a comparison image against a reference image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiberRatioAnalyzer {
    fiber_count: usize,
    thresholds: Thresholds,
}
impl From<InstrumentConfig> for FiberRatioAnalyzer {
    fn from(config: InstrumentConfig) -> Self {
        Self {
            fiber_count: config.fiber_count,
            thresholds: config.thresholds,
        }
    }
}
impl FiberRatioAnalyzer {
    pub fn new(fiber_count: usize, thresholds: Thresholds) -> Self {
        Self {
            fiber_count,
            thresholds,
        }
    }
    pub fn fiber_count(self, fiber_count: usize) -> Self {
        Self {
            fiber_count,
            ..self
        }
    }
    pub fn thresholds(self, thresholds: Thresholds) -> Self {
        Self { thresholds, ..self }
    }
    pub fn get_thresholds(&self) -> &Thresholds {
        &self.thresholds
    }
    fn check(&self, reference: &Image, comparison: &Image) -> Result<()> {
        self.thresholds.validate()?;
        if reference.shape() != comparison.shape() {
            return Err(AnalyzerError::ShapeMismatch {
                reference: reference.shape(),
                comparison: comparison.shape(),
            });
        }
        if self.fiber_count == 0 {
            return Err(AnalyzerError::FiberCount);
        }
        if self.fiber_count > reference.nrows() {
            return Err(AnalyzerError::TooManyFibers {
                fiber_count: self.fiber_count,
                rows: reference.nrows(),
            });
        }
        if reference.ncols() == 0 {
            return Err(AnalyzerError::EmptyRows);
        }
        Ok(())
    }
    /// Returns one report per fiber, ordered by fiber index
    ///
    /// Fibers with an undefined flux ratio are reported as [Classification::Undefined],
    /// only invalid inputs make the whole analysis fail.
    pub fn analyze(&self, reference: &Image, comparison: &Image) -> Result<Vec<FiberReport>> {
        self.check(reference, comparison)?;
        let reports: Vec<_> = (0..self.fiber_count)
            .map(|j| {
                let row = self.fiber_count - 1 - j;
                let flux = comparison.row_median(row).unwrap_or(f64::NAN);
                let reference_flux = reference.row_median(row).unwrap_or(f64::NAN);
                FiberReport::new(j, flux, reference_flux, &self.thresholds)
            })
            .collect();
        reports
            .iter()
            .filter(|report| !report.classification.is_defined())
            .for_each(|report| {
                log::warn!(
                    "fiber #{}: undefined flux ratio ({}/{})",
                    report.fiber_index,
                    report.flux,
                    report.reference_flux
                )
            });
        Ok(reports)
    }
}

/// Classifies the first `fiber_count` fibers of `comparison` against `reference`
pub fn analyze(
    reference: &Image,
    comparison: &Image,
    fiber_count: usize,
    thresholds: Thresholds,
) -> Result<Vec<FiberReport>> {
    FiberRatioAnalyzer::new(fiber_count, thresholds).analyze(reference, comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::error::Error;

    const THRESHOLDS: Thresholds = Thresholds {
        missing: 0.2,
        faint: 0.7,
    };

    fn random_image(rows: usize, cols: usize) -> Image {
        let mut rng = rand::thread_rng();
        let samples: Vec<f64> = (0..rows * cols)
            .map(|_| rng.gen_range(1..8192) as f64)
            .collect();
        Image::from_row_major(rows, cols, samples).unwrap()
    }

    #[test]
    fn identical_images() -> std::result::Result<(), Box<dyn Error>> {
        let image = random_image(300, 64);
        let reports = analyze(&image, &image, 300, THRESHOLDS)?;
        assert_eq!(reports.len(), 300);
        for report in reports {
            assert!((report.ratio - 1f64).abs() < 1e-12);
            assert_eq!(report.percent_difference, 0f64);
            assert_eq!(report.classification, Classification::Good);
        }
        Ok(())
    }

    #[test]
    fn one_report_per_fiber() -> std::result::Result<(), Box<dyn Error>> {
        let reference = random_image(320, 16);
        let comparison = random_image(320, 16);
        for n in [1, 7, 300, 320] {
            let reports = FiberRatioAnalyzer::new(n, THRESHOLDS).analyze(&reference, &comparison)?;
            let indices: Vec<_> = reports.iter().map(|r| r.fiber_index).collect();
            assert_eq!(indices, (0..n).collect::<Vec<_>>());
        }
        Ok(())
    }

    #[test]
    fn fibers_are_reversed() -> std::result::Result<(), Box<dyn Error>> {
        let reference = Image::from_rows(&[[10, 20, 30], [1, 1, 1], [10, 20, 30]])?;
        let comparison = Image::from_rows(&[[1, 1, 1], [1, 1, 1], [10, 10, 10]])?;
        let reports = analyze(&reference, &comparison, 3, THRESHOLDS)?;
        // logical fiber 0 is the last row
        let fiber = &reports[0];
        assert_eq!(fiber.flux, 10f64);
        assert_eq!(fiber.reference_flux, 20f64);
        assert_eq!(fiber.ratio, 0.5);
        assert_eq!(fiber.percent_difference, -50f64);
        assert_eq!(fiber.classification, Classification::Faint);
        assert_eq!(reports[1].classification, Classification::Good);
        // logical fiber 2 is the first row
        assert_eq!(reports[2].ratio, 0.05);
        assert_eq!(reports[2].classification, Classification::Missing);
        Ok(())
    }

    #[test]
    fn threshold_boundaries() {
        let thresholds = THRESHOLDS;
        assert_eq!(thresholds.classify(0.2), Classification::Faint);
        assert_eq!(thresholds.classify(0.7), Classification::Good);
        assert_eq!(thresholds.classify(0.199), Classification::Missing);
        assert_eq!(thresholds.classify(0.699), Classification::Faint);
        assert_eq!(thresholds.classify(f64::NAN), Classification::Undefined);
        assert_eq!(
            FiberReport::new(0, 2., 10., &thresholds).classification,
            Classification::Faint
        );
        assert_eq!(
            FiberReport::new(0, 7., 10., &thresholds).classification,
            Classification::Good
        );
    }

    #[test]
    fn zero_reference_flux() -> std::result::Result<(), Box<dyn Error>> {
        let reference = Image::from_rows(&[[100, 100, 100], [0, 0, 0]])?;
        let comparison = Image::from_rows(&[[80, 80, 80], [5, 5, 5]])?;
        let reports = analyze(&reference, &comparison, 2, THRESHOLDS)?;
        assert_eq!(reports.len(), 2);
        let undefined = &reports[0];
        assert_eq!(undefined.classification, Classification::Undefined);
        assert!(undefined.ratio.is_nan());
        assert!(undefined.percent_difference.is_nan());
        assert_eq!(undefined.flux, 5f64);
        let good = &reports[1];
        assert_eq!(good.ratio, 0.8);
        assert_eq!(good.classification, Classification::Good);
        Ok(())
    }

    #[test]
    fn nan_pixel_in_one_fiber() -> std::result::Result<(), Box<dyn Error>> {
        let reference = Image::from_rows(&[[10., 10., 10.], [10., 10., 10.], [10., 10., 10.]])?;
        let comparison = Image::from_rows(&[[9., 9., 9.], [5., f64::NAN, 5.], [1., 1., 1.]])?;
        let reports = analyze(&reference, &comparison, 3, THRESHOLDS)?;
        assert_eq!(reports.len(), 3);
        // row 1 is the logical fiber 1
        let undefined = &reports[1];
        assert!(undefined.flux.is_nan());
        assert!(undefined.ratio.is_nan());
        assert!(undefined.percent_difference.is_nan());
        assert_eq!(undefined.classification, Classification::Undefined);
        assert_eq!(reports[0].ratio, 0.1);
        assert_eq!(reports[0].classification, Classification::Missing);
        assert_eq!(reports[2].ratio, 0.9);
        assert_eq!(reports[2].classification, Classification::Good);
        Ok(())
    }

    #[test]
    fn too_many_fibers() {
        let image = random_image(300, 8);
        let err = analyze(&image, &image, 400, THRESHOLDS).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::TooManyFibers {
                fiber_count: 400,
                rows: 300
            }
        ));
    }

    #[test]
    fn invalid_inputs() {
        let reference = random_image(300, 8);
        let comparison = random_image(300, 9);
        assert!(matches!(
            analyze(&reference, &comparison, 300, THRESHOLDS),
            Err(AnalyzerError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            analyze(&reference, &reference, 0, THRESHOLDS),
            Err(AnalyzerError::FiberCount)
        ));
        let empty = Image::from_row_major(4, 0, vec![]).unwrap();
        assert!(matches!(
            analyze(&empty, &empty, 4, THRESHOLDS),
            Err(AnalyzerError::EmptyRows)
        ));
        let thresholds = Thresholds {
            missing: 0.7,
            faint: 0.2,
        };
        assert!(matches!(
            analyze(&reference, &reference, 300, thresholds),
            Err(AnalyzerError::Thresholds(ThresholdsError::Order { .. }))
        ));
    }

    #[test]
    fn thresholds_validation() {
        assert!(Thresholds::new(0.3, 0.7).is_ok());
        assert!(matches!(
            Thresholds::new(0., 0.7),
            Err(ThresholdsError::Range { .. })
        ));
        assert!(matches!(
            Thresholds::new(0.3, f64::INFINITY),
            Err(ThresholdsError::Range { .. })
        ));
        assert!(matches!(
            Thresholds::new(0.5, 0.5),
            Err(ThresholdsError::Order { .. })
        ));
    }
}

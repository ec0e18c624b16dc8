//! Fiber classes summary

use std::fmt;
use strum::IntoEnumIterator;

use crate::{
    fibers::{Classification, FiberReport},
    image::median,
};

/// Fiber indices grouped by classification
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FiberSummary {
    pub missing: Vec<usize>,
    pub faint: Vec<usize>,
    pub good: Vec<usize>,
    pub undefined: Vec<usize>,
    /// median of the defined flux ratios
    pub median_ratio: Option<f64>,
    /// median of the defined percent differences
    pub median_percent_difference: Option<f64>,
}
impl FiberSummary {
    pub fn new(reports: &[FiberReport]) -> Self {
        let mut this = reports.iter().fold(Self::default(), |mut summary, report| {
            summary
                .fibers_mut(report.classification)
                .push(report.fiber_index);
            summary
        });
        let (mut ratios, mut percent_differences): (Vec<f64>, Vec<f64>) = reports
            .iter()
            .filter(|report| report.classification.is_defined())
            .map(|report| (report.ratio, report.percent_difference))
            .unzip();
        this.median_ratio = median(&mut ratios);
        this.median_percent_difference = median(&mut percent_differences);
        this
    }
    fn fibers_mut(&mut self, classification: Classification) -> &mut Vec<usize> {
        match classification {
            Classification::Missing => &mut self.missing,
            Classification::Faint => &mut self.faint,
            Classification::Good => &mut self.good,
            Classification::Undefined => &mut self.undefined,
        }
    }
    /// Fiber indices of a given class
    pub fn fibers(&self, classification: Classification) -> &[usize] {
        match classification {
            Classification::Missing => &self.missing,
            Classification::Faint => &self.faint,
            Classification::Good => &self.good,
            Classification::Undefined => &self.undefined,
        }
    }
    /// Fiber numbers (starting from 1) of a given class
    pub fn fiber_numbers(&self, classification: Classification) -> Vec<usize> {
        self.fibers(classification).iter().map(|i| i + 1).collect()
    }
    /// Total number of fibers
    pub fn len(&self) -> usize {
        self.missing.len() + self.faint.len() + self.good.len() + self.undefined.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl From<&[FiberReport]> for FiberSummary {
    fn from(reports: &[FiberReport]) -> Self {
        Self::new(reports)
    }
}
impl fmt::Display for FiberSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SUMMARY:")?;
        writeln!(f, " - # of fibers: {}", self.len())?;
        for classification in Classification::iter() {
            writeln!(
                f,
                " - {:<9}: {:>3}  {:?}",
                classification.to_string().to_lowercase(),
                self.fibers(classification).len(),
                self.fiber_numbers(classification)
            )?;
        }
        match (self.median_ratio, self.median_percent_difference) {
            (Some(ratio), Some(percent_difference)) => write!(
                f,
                " - median ratio: {:.3}, median difference: {:.1}%",
                ratio, percent_difference
            ),
            _ => write!(f, " - median ratio: undefined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::APOGEE_THRESHOLDS;

    fn reports() -> Vec<FiberReport> {
        let thresholds = APOGEE_THRESHOLDS;
        [(10., 100.), (50., 100.), (90., 100.), (5., 0.), (100., 100.)]
            .into_iter()
            .enumerate()
            .map(|(i, (flux, reference_flux))| {
                FiberReport::new(i, flux, reference_flux, &thresholds)
            })
            .collect()
    }

    #[test]
    fn partition() {
        let summary = FiberSummary::new(&reports());
        assert_eq!(summary.missing, vec![0]);
        assert_eq!(summary.faint, vec![1]);
        assert_eq!(summary.good, vec![2, 4]);
        assert_eq!(summary.undefined, vec![3]);
        assert_eq!(summary.len(), 5);
        assert_eq!(summary.fiber_numbers(Classification::Good), vec![3, 5]);
    }

    #[test]
    fn medians_skip_undefined_fibers() {
        let summary = FiberSummary::new(&reports());
        // ratios: 0.1, 0.5, 0.9, 1.0
        assert!((summary.median_ratio.unwrap() - 0.7).abs() < 1e-12);
        assert!((summary.median_percent_difference.unwrap() + 30.).abs() < 1e-9);
    }

    #[test]
    fn empty() {
        let summary = FiberSummary::new(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.median_ratio, None);
        println!("{summary}");
    }
}

//! Instrument configuration
//!
//! The number of fibers and the classification thresholds default to the APOGEE values
//! and may be overridden with the environment variables
//! `FIBERSORT_FIBERS`, `FIBERSORT_MISSING` and `FIBERSORT_FAINT`.

use std::{env, str::FromStr};

use crate::fibers::{Thresholds, ThresholdsError};

/// Number of fibers of the APOGEE spectrograph
pub const APOGEE_FIBER_COUNT: usize = 300;
/// Flux ratio thresholds of the APOGEE fiber classification
pub const APOGEE_THRESHOLDS: Thresholds = Thresholds {
    missing: 0.2,
    faint: 0.7,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(r#"failed to parse "{name}={value}""#)]
    Parse { name: &'static str, value: String },
    #[error("the number of fibers must be greater than zero")]
    FiberCount,
    #[error("invalid classification thresholds")]
    Thresholds(#[from] ThresholdsError),
}
type Result<T> = std::result::Result<T, ConfigError>;

/// Fiber count and classification thresholds of a spectrograph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentConfig {
    pub fiber_count: usize,
    pub thresholds: Thresholds,
}
impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            fiber_count: APOGEE_FIBER_COUNT,
            thresholds: APOGEE_THRESHOLDS,
        }
    }
}

fn var<T: FromStr>(name: &'static str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::Parse { name, value }),
        },
        Err(_) => Ok(None),
    }
}

impl InstrumentConfig {
    /// Default configuration updated with the `FIBERSORT_*` environment variables that are set
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(fiber_count) = var("FIBERSORT_FIBERS")? {
            config = config.fiber_count(fiber_count);
        }
        if let Some(missing) = var("FIBERSORT_MISSING")? {
            config = config.missing(missing);
        }
        if let Some(faint) = var("FIBERSORT_FAINT")? {
            config = config.faint(faint);
        }
        config.validate()
    }
    pub fn fiber_count(self, fiber_count: usize) -> Self {
        Self {
            fiber_count,
            ..self
        }
    }
    /// Sets the ratio below which a fiber is missing
    pub fn missing(self, missing: f64) -> Self {
        Self {
            thresholds: Thresholds {
                missing,
                ..self.thresholds
            },
            ..self
        }
    }
    /// Sets the ratio below which a fiber is faint
    pub fn faint(self, faint: f64) -> Self {
        Self {
            thresholds: Thresholds {
                faint,
                ..self.thresholds
            },
            ..self
        }
    }
    /// Checks the fiber count and the thresholds
    pub fn validate(self) -> Result<Self> {
        if self.fiber_count == 0 {
            return Err(ConfigError::FiberCount);
        }
        self.thresholds.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fibers::FiberRatioAnalyzer;

    #[test]
    fn apogee_defaults() {
        let config = InstrumentConfig::default();
        assert_eq!(config.fiber_count, 300);
        assert_eq!(config.thresholds.missing, 0.2);
        assert_eq!(config.thresholds.faint, 0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn apogee_analyzer() {
        let analyzer = FiberRatioAnalyzer::from(InstrumentConfig::default());
        assert_eq!(analyzer, FiberRatioAnalyzer::new(300, APOGEE_THRESHOLDS));
        assert_eq!(analyzer.get_thresholds(), &Thresholds::new(0.2, 0.7).unwrap());
    }

    #[test]
    fn overrides() {
        let config = InstrumentConfig::default()
            .fiber_count(250)
            .missing(0.3)
            .faint(0.8)
            .validate()
            .unwrap();
        assert_eq!(config.fiber_count, 250);
        assert_eq!(config.thresholds, Thresholds::new(0.3, 0.8).unwrap());
    }

    #[test]
    fn invalid_overrides() {
        assert!(matches!(
            InstrumentConfig::default().fiber_count(0).validate(),
            Err(ConfigError::FiberCount)
        ));
        assert!(matches!(
            InstrumentConfig::default().missing(0.9).validate(),
            Err(ConfigError::Thresholds(_))
        ));
    }

    // the only test touching the FIBERSORT_* variables
    #[test]
    fn environment() {
        env::set_var("FIBERSORT_FIBERS", "120");
        env::set_var("FIBERSORT_FAINT", "0.75");
        let config = InstrumentConfig::from_env().unwrap();
        assert_eq!(config.fiber_count, 120);
        assert_eq!(config.thresholds.missing, 0.2);
        assert_eq!(config.thresholds.faint, 0.75);

        env::set_var("FIBERSORT_MISSING", "low");
        let err = InstrumentConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Parse {
                name: "FIBERSORT_MISSING",
                ..
            }
        ));
        env::remove_var("FIBERSORT_FIBERS");
        env::remove_var("FIBERSORT_FAINT");
        env::remove_var("FIBERSORT_MISSING");
    }
}

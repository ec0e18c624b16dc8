use crate::{
    config::ConfigError, fibers::AnalyzerError, image::ImageError, report::ReportError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `image` module")]
    Image(#[from] ImageError),
    #[error("Error in the `fibers` module")]
    Analyzer(#[from] AnalyzerError),
    #[error("Error in the `config` module")]
    Config(#[from] ConfigError),
    #[error("Error in the `report` module")]
    Report(#[from] ReportError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Plot(#[from] crate::plot::PlotError),
}

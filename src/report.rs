//! Fiber report writers
//!
//! Each exposure gets a set of text files named after its exposure number:
//!  - `<id>.csv`: the full fiber reports,
//!  - `<id>.ratio.csv`: one flux ratio per line,
//!  - `<id>.txt`: the fiber numbers of the missing and faint fibers,
//!  - `<id>.details.txt`: a human readable line per fiber.

use regex::Regex;
use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{fibers::FiberReport, summary::FiberSummary};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to create {1:?}")]
    Create(#[source] io::Error, PathBuf),
    #[error("failed to write fiber report")]
    Write(#[from] io::Error),
    #[error("failed to write CSV fiber report")]
    Csv(#[from] csv::Error),
    #[error("invalid exposure number regex")]
    Regex(#[from] regex::Error),
    #[error("{0:?} has no file name")]
    FileName(PathBuf),
    #[error("several images share the exposure id {0}")]
    DuplicateId(String),
}
type Result<T> = std::result::Result<T, ReportError>;

/// Writes the reports as CSV records with a header line
pub fn write_csv<W: Write>(reports: &[FiberReport], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for report in reports {
        wtr.serialize(report)?;
    }
    wtr.flush()?;
    Ok(())
}
/// Writes one flux ratio per line
pub fn write_ratios<W: Write>(reports: &[FiberReport], mut writer: W) -> Result<()> {
    let ratios: Vec<_> = reports
        .iter()
        .map(|report| format!("{:?}", report.ratio))
        .collect();
    write!(writer, "{}", ratios.join("\n"))?;
    writer.flush()?;
    Ok(())
}
/// Writes the numbers of the missing and faint fibers as `[missing];[faint]`
pub fn write_classes<W: Write>(summary: &FiberSummary, mut writer: W) -> Result<()> {
    use crate::fibers::Classification::{Faint, Missing};
    write!(
        writer,
        "{:?};{:?}",
        summary.fiber_numbers(Missing),
        summary.fiber_numbers(Faint)
    )?;
    writer.flush()?;
    Ok(())
}
/// Writes the statistics of every fiber, one fiber per line
pub fn write_details<W: Write>(reports: &[FiberReport], mut writer: W) -> Result<()> {
    for report in reports {
        writeln!(writer, "{}", report)?;
    }
    writer.flush()?;
    Ok(())
}

/// Exposure number of an image file
///
/// The first sequence of at least 8 digits in the file name with the chip letter
/// in front of it if any, e.g. `24960049` for `apRaw-24960049.fits` and
/// `a-28030017` for `ap1D-a-28030017.npy`, or the file stem otherwise
pub fn exposure_id<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ReportError::FileName(path.to_path_buf()))?;
    let re = Regex::new(r"(?:\b[abc]-)?\d{8,}")?;
    if let Some(id) = re.find(file_name) {
        return Ok(id.as_str().to_string());
    }
    Ok(file_name
        .split('.')
        .next()
        .unwrap_or(file_name)
        .to_string())
}

/// Checks that no two exposures write to the same output files
pub fn check_unique_ids(outputs: &[ReportFiles]) -> Result<()> {
    let mut ids = HashSet::new();
    for output in outputs {
        if !ids.insert(output.id()) {
            return Err(ReportError::DuplicateId(output.id().to_string()));
        }
    }
    Ok(())
}

/// Output files of an exposure
#[derive(Debug, Clone)]
pub struct ReportFiles {
    root: PathBuf,
    id: String,
}
impl ReportFiles {
    /// Output files in `root` for the exposure of `image`
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(root: P, image: Q) -> Result<Self> {
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            id: exposure_id(image)?,
        })
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn path(&self, suffix: &str) -> PathBuf {
        self.root.join(format!("{}{}", self.id, suffix))
    }
    fn create(&self, suffix: &str) -> Result<BufWriter<File>> {
        let path = self.path(suffix);
        log::info!("writing {:?}", path);
        File::create(&path)
            .map(BufWriter::new)
            .map_err(|e| ReportError::Create(e, path))
    }
    pub fn csv(&self, reports: &[FiberReport]) -> Result<()> {
        write_csv(reports, self.create(".csv")?)
    }
    pub fn ratios(&self, reports: &[FiberReport]) -> Result<()> {
        write_ratios(reports, self.create(".ratio.csv")?)
    }
    pub fn classes(&self, summary: &FiberSummary) -> Result<()> {
        write_classes(summary, self.create(".txt")?)
    }
    pub fn details(&self, reports: &[FiberReport]) -> Result<()> {
        write_details(reports, self.create(".details.txt")?)
    }
}

//! FIBER SORT
//!
//! Compares a set of exposures to a reference flat and writes, for each exposure,
//! the flux ratio and the classification of every fiber.
//!
//! The number of fibers and the thresholds are read from the command line,
//! from the `FIBERSORT_FIBERS`, `FIBERSORT_MISSING` and `FIBERSORT_FAINT` environment
//! variables or default to the APOGEE values, in that order.

use anyhow::{bail, Context};
use fiber_sort::{
    report, FiberRatioAnalyzer, FiberReport, FiberSummary, Image, ImageHeader,
    InstrumentConfig, ReportFiles,
};
use glob::glob;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "fibersort",
    about = "Spectrograph fibers classification against a reference flat"
)]
struct Opt {
    /// Reference flat image (.npy or .fits)
    #[structopt(parse(from_os_str))]
    reference: PathBuf,
    /// Glob pattern of the images to compare to the reference
    pattern: String,
    /// Number of fibers
    #[structopt(short, long)]
    fibers: Option<usize>,
    /// Flux ratio below which a fiber is missing
    #[structopt(short, long)]
    missing: Option<f64>,
    /// Flux ratio below which a fiber is faint
    #[structopt(long)]
    faint: Option<f64>,
    /// Output directory
    #[structopt(short, long, parse(from_os_str), default_value = ".")]
    output: PathBuf,
    /// Write the flux statistics of every fiber to `<exposure>.details.txt`
    #[structopt(short, long)]
    details: bool,
    /// Glob pattern of the flux ratio files (one value per line) to plot against,
    /// one file per image
    #[cfg(feature = "plot")]
    #[structopt(short, long)]
    plot: Option<String>,
}

fn glob_files(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let files = glob(pattern)
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .collect::<Result<Vec<PathBuf>, _>>()?;
    if files.is_empty() {
        bail!("no file found matching {pattern}");
    }
    Ok(files)
}

fn sort_fibers(
    analyzer: &FiberRatioAnalyzer,
    reference: &Image,
    file: &Path,
    report_files: &ReportFiles,
    details: bool,
) -> anyhow::Result<(Vec<FiberReport>, ImageHeader)> {
    let now = Instant::now();
    let (image, reports) = fiber_sort::analyze_file(analyzer, reference, file)
        .with_context(|| format!("failed to sort the fibers of {:?}", file))?;
    let summary = FiberSummary::new(&reports);

    report_files.csv(&reports)?;
    report_files.ratios(&reports)?;
    report_files.classes(&summary)?;
    if details {
        report_files.details(&reports)?;
    }
    log::info!("{:?} sorted in {}ms", file, now.elapsed().as_millis());
    println!("{:?}\n{}", file, summary);
    Ok((reports, image.header().clone()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = InstrumentConfig::from_env()?;
    if let Some(fiber_count) = opt.fibers {
        config = config.fiber_count(fiber_count);
    }
    if let Some(missing) = opt.missing {
        config = config.missing(missing);
    }
    if let Some(faint) = opt.faint {
        config = config.faint(faint);
    }
    let config = config.validate()?;
    log::info!("{:?}", config);
    let analyzer = FiberRatioAnalyzer::from(config);

    let reference = Image::load(&opt.reference)
        .with_context(|| format!("failed to load the reference image {:?}", opt.reference))?;
    let files = glob_files(&opt.pattern)?;

    #[cfg(feature = "plot")]
    let comparisons = match &opt.plot {
        Some(pattern) => {
            let comparisons = glob_files(pattern)?;
            if comparisons.len() != files.len() {
                bail!(
                    "incorrect number of flux ratio files, provide {} files for plotting",
                    files.len()
                );
            }
            Some(comparisons)
        }
        None => None,
    };

    let outputs = files
        .iter()
        .map(|file| ReportFiles::new(&opt.output, file))
        .collect::<Result<Vec<_>, _>>()?;
    report::check_unique_ids(&outputs)?;
    fs::create_dir_all(&opt.output)
        .with_context(|| format!("failed to create {:?}", opt.output))?;

    let n_files = files.len() as u64;
    let jobs = files.par_iter().zip(&outputs).progress_count(n_files);
    #[cfg(not(feature = "plot"))]
    jobs.try_for_each(|(file, report_files)| {
        sort_fibers(&analyzer, &reference, file, report_files, opt.details).map(|_| ())
    })?;
    #[cfg(feature = "plot")]
    let results = jobs
        .map(|(file, report_files)| {
            sort_fibers(&analyzer, &reference, file, report_files, opt.details)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    #[cfg(feature = "plot")]
    if let Some(comparisons) = comparisons {
        for (((reports, header), report_files), comparison) in
            results.iter().zip(&outputs).zip(&comparisons)
        {
            let ratios = fiber_sort::plot::read_comparison(comparison)
                .with_context(|| format!("failed to read {:?}", comparison))?;
            let mut title = format!("Fiber Flux Comparison {}", report_files.id());
            if let Some(plate_id) = header.plate_id {
                title.push_str(&format!(", Plate {plate_id}"));
            }
            if let Some(date_obs) = &header.date_obs {
                title.push_str(&format!(", {date_obs}"));
            }
            fiber_sort::plot::plot_ratios(
                reports,
                analyzer.get_thresholds(),
                Some(&ratios),
                &title,
                report_files.path(".png"),
            )?;
        }
    }
    Ok(())
}

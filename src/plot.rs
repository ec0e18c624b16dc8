//! Fiber flux ratio plots

use plotters::{coord::Shift, drawing::DrawingAreaErrorKind, prelude::*};
use std::path::Path;

use crate::fibers::{FiberReport, Thresholds};

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("failed to draw {0}")]
    Draw(String),
    #[error("failed to read comparison flux ratios")]
    Read(#[from] csv::Error),
}
type Result<T> = std::result::Result<T, PlotError>;

const Y_RANGE: std::ops::Range<f64> = -0.1..2.0;

/// Reads flux ratios from a file with one value per line
pub fn read_comparison<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut values = vec![];
    for result in rdr.deserialize() {
        let (value,): (f64,) = result?;
        values.push(value);
    }
    Ok(values)
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    reports: &[FiberReport],
    thresholds: &Thresholds,
    comparison: Option<&[f64]>,
    title: &str,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let x_max = reports.len().max(comparison.map_or(0, |c| c.len())) as f64 + 1.;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(0f64..x_max, Y_RANGE)?;
    chart
        .configure_mesh()
        .x_desc("Fiber No.")
        .y_desc("Flux Ratio")
        .draw()?;

    let mut colors = colorous::TABLEAU10.iter().cycle();
    let in_range = |y: &f64| Y_RANGE.contains(y);

    if let Some(values) = comparison {
        let color = colors.next().unwrap_or(&colorous::TABLEAU10[0]);
        let rgb = RGBColor(color.r, color.g, color.b);
        chart
            .draw_series(
                values
                    .iter()
                    .enumerate()
                    .filter(|&(_, y)| in_range(y))
                    .map(|(i, &y)| TriangleMarker::new(((i + 1) as f64, y), 5, rgb.filled())),
            )?
            .label("Raw images")
            .legend(move |(x, y)| TriangleMarker::new((x, y), 5, rgb.filled()));
    }

    let color = colors.next().unwrap_or(&colorous::TABLEAU10[1]);
    let rgb = RGBColor(color.r, color.g, color.b);
    chart
        .draw_series(
            reports
                .iter()
                .filter(|report| report.classification.is_defined() && in_range(&report.ratio))
                .map(|report| {
                    Circle::new(
                        (report.fiber_number() as f64, report.ratio),
                        3,
                        rgb.filled(),
                    )
                }),
        )?
        .label("Reduced images")
        .legend(move |(x, y)| Circle::new((x, y), 3, rgb.filled()));

    for (label, threshold) in [("Missing", thresholds.missing), ("Faint", thresholds.faint)] {
        chart.draw_series(LineSeries::new(
            [(0f64, threshold), (x_max, threshold)],
            BLACK.stroke_width(2),
        ))?;
        chart.draw_series(std::iter::once(Text::new(
            label,
            (2f64, threshold - 0.05),
            ("sans-serif", 14),
        )))?;
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Scatter plot of the fiber flux ratios
///
/// Ratios outside [-0.1,2] and undefined ratios are not shown.
/// An optional second series, e.g. ratios computed from the raw images, is drawn alongside.
/// The file is written as SVG if `path` ends with `.svg` and as a bitmap otherwise.
pub fn plot_ratios<P: AsRef<Path>>(
    reports: &[FiberReport],
    thresholds: &Thresholds,
    comparison: Option<&[f64]>,
    title: &str,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    log::info!("making figure: {:?}", path);
    let size = (1024, 1024);
    let is_svg = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        draw(
            SVGBackend::new(path, size).into_drawing_area(),
            reports,
            thresholds,
            comparison,
            title,
        )
        .map_err(|e| PlotError::Draw(format!("{:?}: {}", path, e)))
    } else {
        draw(
            BitMapBackend::new(path, size).into_drawing_area(),
            reports,
            thresholds,
            comparison,
            title,
        )
        .map_err(|e| PlotError::Draw(format!("{:?}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn comparison_file() {
        let path = env::temp_dir().join("fiber-sort_comparison.csv");
        fs::write(&path, "0.5\n1.0\n0.05").unwrap();
        assert_eq!(read_comparison(&path).unwrap(), vec![0.5, 1.0, 0.05]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn svg_ratios() {
        let thresholds = Thresholds::new(0.2, 0.7).unwrap();
        let reports: Vec<_> = [(80., 100.), (5., 0.), (300., 100.), (10., 100.)]
            .into_iter()
            .enumerate()
            .map(|(i, (flux, reference_flux))| {
                FiberReport::new(i, flux, reference_flux, &thresholds)
            })
            .collect();
        assert!(!reports[1].classification.is_defined());
        assert!(reports[2].ratio > Y_RANGE.end);

        let path = env::temp_dir().join("fiber-sort_ratios.svg");
        let comparison = [0.8, 0.9, 2.5, 0.1];
        plot_ratios(&reports, &thresholds, Some(&comparison[..]), "Fibers", &path).unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
        fs::remove_file(path).unwrap();
    }
}

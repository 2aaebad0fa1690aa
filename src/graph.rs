use plotters::prelude::*;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::{DailyCount, FrequencyTable, Summary};
use crate::error::{DashboardError, Result};

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

/// The charts the dashboard can draw from a summary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    /// Bar chart of accesses per file type
    FileTypes,

    /// Bar chart of accesses per user
    Users,

    /// Bar chart of accesses per action
    Actions,

    /// Line chart of accesses per day
    Daily,

    /// Pie chart of the file type distribution
    FileTypeShare,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::FileTypes,
        ChartKind::Users,
        ChartKind::Actions,
        ChartKind::Daily,
        ChartKind::FileTypeShare,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ChartKind::FileTypes => "file-types",
            ChartKind::Users => "users",
            ChartKind::Actions => "actions",
            ChartKind::Daily => "daily",
            ChartKind::FileTypeShare => "file-type-share",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::FileTypes => "Accesos por tipo de archivo",
            ChartKind::Users => "Accesos por usuario",
            ChartKind::Actions => "Acciones realizadas",
            ChartKind::Daily => "Accesos por día",
            ChartKind::FileTypeShare => "Distribución por tipo de archivo",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ChartKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| DashboardError::UnknownChart(s.to_string()))
    }
}

/// Size of the generated images
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Result of drawing one chart.
///
/// Charts need at least one data point; an empty summary yields `NoData`
/// so the caller can show a notice instead of an image.
#[derive(Clone, Debug, PartialEq)]
pub enum ChartOutcome {
    Png(Vec<u8>),
    NoData,
}

/// Creates a chart from a summary
///
/// This is the main entry point for chart generation. It picks the data for
/// `kind` out of the summary and delegates to the matching drawing routine.
///
/// # Arguments
/// * `summary` - Aggregates of the current filtered view
/// * `kind` - Which chart to draw
/// * `options` - Image size
///
/// # Returns
/// * `Result<ChartOutcome>` - PNG bytes, `NoData` for empty input, or an error
///   from the drawing backend
pub fn render_chart(summary: &Summary, kind: ChartKind, options: &ChartOptions) -> Result<ChartOutcome> {
    let has_data = match kind {
        ChartKind::FileTypes | ChartKind::FileTypeShare => !summary.by_file_type.is_empty(),
        ChartKind::Users => !summary.by_user.is_empty(),
        ChartKind::Actions => !summary.by_action.is_empty(),
        ChartKind::Daily => !summary.daily.is_empty(),
    };
    if !has_data {
        return Ok(ChartOutcome::NoData);
    }

    let mut buffer = vec![0u8; options.width as usize * options.height as usize * 3];
    let drawn = match kind {
        ChartKind::FileTypes => draw_bar_chart(&mut buffer, &summary.by_file_type, kind.title(), options),
        ChartKind::Users => draw_bar_chart(&mut buffer, &summary.by_user, kind.title(), options),
        ChartKind::Actions => draw_bar_chart(&mut buffer, &summary.by_action, kind.title(), options),
        ChartKind::Daily => draw_line_chart(&mut buffer, &summary.daily, kind.title(), options),
        ChartKind::FileTypeShare => draw_pie_chart(&mut buffer, &summary.by_file_type, kind.title(), options),
    };
    drawn.map_err(|e| DashboardError::Chart(e.to_string()))?;

    encode_png(buffer, options).map(ChartOutcome::Png)
}

fn encode_png(buffer: Vec<u8>, options: &ChartOptions) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(options.width, options.height, buffer)
        .ok_or_else(|| DashboardError::Chart("pixel buffer has the wrong size".to_string()))?;

    let mut png = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .map_err(|e| DashboardError::Chart(e.to_string()))?;
    Ok(png)
}

/// Bar chart with one bar per table entry, in table order
fn draw_bar_chart(buffer: &mut [u8], table: &FrequencyTable, title: &str, options: &ChartOptions) -> DrawResult {
    let root = BitMapBackend::with_buffer(buffer, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let labels: Vec<&str> = table.entries.iter().map(|(value, _)| value.as_str()).collect();
    let max_count = table.entries.iter().map(|(_, count)| *count).max().unwrap_or(0) as u32;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..labels.len() as u32).into_segmented(), 0u32..max_count + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).map(|l| l.to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc("Accesos")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(PALETTE[0].filled())
            .margin(10)
            .data(
                table
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(i, (_, count))| (i as u32, *count as u32)),
            ),
    )?;

    root.present()?;
    Ok(())
}

/// Line chart of the daily series; x positions are day indexes
fn draw_line_chart(buffer: &mut [u8], daily: &[DailyCount], title: &str, options: &ChartOptions) -> DrawResult {
    let root = BitMapBackend::with_buffer(buffer, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let last = (daily.len() as i32 - 1).max(1);
    let max_count = daily.iter().map(|d| d.count).max().unwrap_or(0) as u32;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0i32..last, 0u32..max_count + 1)?;

    chart
        .configure_mesh()
        .x_labels(daily.len().min(10))
        .x_label_formatter(&|i| {
            daily
                .get(*i as usize)
                .map(|d| d.date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .y_desc("Accesos")
        .draw()?;

    let points: Vec<(i32, u32)> = daily
        .iter()
        .enumerate()
        .map(|(i, d)| (i as i32, d.count as u32))
        .collect();

    chart.draw_series(LineSeries::new(points.iter().copied(), &PALETTE[0]))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, PALETTE[0].filled())))?;

    root.present()?;
    Ok(())
}

/// Pie chart with one slice per table entry
fn draw_pie_chart(buffer: &mut [u8], table: &FrequencyTable, title: &str, options: &ChartOptions) -> DrawResult {
    let root = BitMapBackend::with_buffer(buffer, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(title, ("sans-serif", 30))?;

    let (width, height) = area.dim_in_pixel();
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius = width.min(height) as f64 * 0.35;

    let sizes: Vec<f64> = table.entries.iter().map(|(_, count)| *count as f64).collect();
    let labels: Vec<&str> = table.entries.iter().map(|(value, _)| value.as_str()).collect();
    let colors: Vec<RGBColor> = (0..sizes.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 18).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
    area.draw(&pie)?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::AccessLog;
    use crate::filter::FilterSpec;
    use crate::record::{AccessEvent, FileType};
    use chrono::NaiveDate;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn access(user: &str, day: u32, action: &str, file_type: FileType, name: &str) -> AccessEvent {
        AccessEvent {
            user: Some(user.to_string()),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            action: Some(action.to_string()),
            element_type: Some("Archivo".to_string()),
            url: format!("https://intranet/docs/{name}"),
            file_type,
            file_name: Some(name.to_string()),
        }
    }

    fn sample() -> AccessLog {
        AccessLog::new(
            vec![
                access("ana", 1, "view", FileType::Pdf, "Report.PDF"),
                access("ana", 2, "download", FileType::Docx, "minutes.docx"),
                access("bob", 1, "view", FileType::Pdf, "budget.pdf"),
            ],
            true,
        )
    }

    fn assert_png(summary: &Summary) {
        let options = ChartOptions::default();
        for kind in ChartKind::ALL {
            match render_chart(summary, kind, &options).unwrap() {
                ChartOutcome::Png(bytes) => assert_eq!(&bytes[..8], &PNG_SIGNATURE, "{kind}"),
                ChartOutcome::NoData => panic!("{kind} reported no data"),
            }
        }
    }

    #[test]
    fn slugs_round_trip() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.slug().parse::<ChartKind>().unwrap(), kind);
        }
        assert!("histogram".parse::<ChartKind>().is_err());
    }

    #[test]
    fn empty_summary_has_no_data() {
        let summary = Summary::default();
        for kind in ChartKind::ALL {
            let outcome = render_chart(&summary, kind, &ChartOptions::default()).unwrap();
            assert_eq!(outcome, ChartOutcome::NoData, "{kind} should report no data");
        }
    }

    #[test]
    fn every_chart_renders_a_png() {
        let log = sample();
        let summary = Summary::from_view(&FilterSpec::new().apply(&log).unwrap());
        assert_eq!(summary.daily.len(), 2);
        assert_png(&summary);
    }

    #[test]
    fn single_row_view_still_renders() {
        let log = sample();
        let view = FilterSpec::new().with_user("bob").apply(&log).unwrap();
        let summary = Summary::from_view(&view);
        assert_eq!(summary.daily.len(), 1);
        assert_png(&summary);
    }
}

//! Bar charts for the metric columns of an inventory table.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, warn};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use thiserror::Error;

use crate::fonts;
use crate::intake::chart_file_name;
use crate::inventory::{Cell, InventoryTable};

/// Pixel size of every rendered chart.
pub const CHART_SIZE: (u32, u32) = (800, 600);

const BAR_COLOR: RGBColor = RGBColor(0, 128, 0);
const FONT_FAMILY: &str = "sans-serif";

/// Errors that abort chart rendering.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("column `{column}` row {row} is not numeric: `{value}`")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
    #[error("failed to draw chart {path}: {message}")]
    Draw { path: PathBuf, message: String },
}

/// A rendered chart image and the column it visualises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartArtifact {
    pub column: String,
    pub path: PathBuf,
}

impl ChartArtifact {
    /// File name of the image on disk.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Caption text: the file name up to its first dot.
    pub fn caption(&self) -> String {
        let file_name = self.file_name();
        let stem = file_name.split('.').next().unwrap_or_default();
        format!("Chart: {stem}")
    }
}

/// Chart title for `column`.
pub fn chart_title(column: &str) -> String {
    format!("{column} by Life Cycle Stage")
}

/// Renders one bar chart per column after the first into `dir`.
///
/// The first column supplies the x-axis labels.  Charts are returned in column order; two
/// columns with the same derived file name leave only the later image on disk.
pub fn render(table: &InventoryTable, dir: &Path) -> Result<Vec<ChartArtifact>, ChartError> {
    let labels = table.stage_labels();
    let with_text = chart_font_registered();

    table
        .columns()
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, column)| {
            let values = metric_values(table, index)?;
            let path = dir.join(chart_file_name(column));
            draw_bar_chart(&path, &chart_title(column), &labels, &values, with_text)?;
            debug!("Rendered chart for `{}` to {}", column, path.display());
            Ok(ChartArtifact {
                column: column.clone(),
                path,
            })
        })
        .collect()
}

fn metric_values(table: &InventoryTable, index: usize) -> Result<Vec<Option<f64>>, ChartError> {
    table
        .column_cells(index)
        .enumerate()
        .map(|(row, cell)| match cell {
            Cell::Number(value) if value.is_finite() => Ok(Some(*value)),
            Cell::Number(_) | Cell::Empty => Ok(None),
            Cell::Text(text) => Err(ChartError::NonNumeric {
                column: table.columns()[index].clone(),
                row: row + 1,
                value: text.clone(),
            }),
        })
        .collect()
}

fn value_range(values: &[Option<f64>]) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .flatten()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if max - min <= f64::EPSILON {
        (min, min + 1.0)
    } else {
        (min * 1.1, max * 1.1)
    }
}

fn chart_font_registered() -> bool {
    static REGISTERED: OnceLock<bool> = OnceLock::new();

    *REGISTERED.get_or_init(|| match fonts::regular_font_bytes() {
        Some(bytes) => match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => true,
            Err(_) => {
                warn!("Font file could not be parsed; charts are drawn without text");
                false
            }
        },
        None => {
            warn!("No TrueType font available; charts are drawn without titles or labels");
            false
        }
    })
}

fn draw_bar_chart(
    path: &Path,
    title: &str,
    labels: &[String],
    values: &[Option<f64>],
    with_text: bool,
) -> Result<(), ChartError> {
    let draw_error = |err: &dyn Display| ChartError::Draw {
        path: path.to_path_buf(),
        message: err.to_string(),
    };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_error(&e))?;

    let slots = i32::try_from(values.len().max(1)).unwrap_or(i32::MAX);
    let (y_min, y_max) = value_range(values);

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if with_text {
        builder
            .caption(title, (FONT_FAMILY, 28))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder
        .build_cartesian_2d((0..slots).into_segmented(), y_min..y_max)
        .map_err(|e| draw_error(&e))?;

    if with_text {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len().max(1))
            .x_label_formatter(&|slot| match slot {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => usize::try_from(*i)
                    .ok()
                    .and_then(|i| labels.get(i))
                    .cloned()
                    .unwrap_or_default(),
                SegmentValue::Last => String::new(),
            })
            .label_style((FONT_FAMILY, 14))
            .draw()
            .map_err(|e| draw_error(&e))?;
    }

    chart
        .draw_series(values.iter().enumerate().filter_map(|(i, value)| {
            let value = (*value)?;
            let slot = i32::try_from(i).ok()?;
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(slot), 0.0),
                    (SegmentValue::Exact(slot + 1), value),
                ],
                BAR_COLOR.filled(),
            );
            bar.set_margin(0, 0, 12, 12);
            Some(bar)
        }))
        .map_err(|e| draw_error(&e))?;

    root.present().map_err(|e| draw_error(&e))?;
    Ok(())
}

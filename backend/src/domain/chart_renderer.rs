//! Chart rendering collaborators.
//!
//! A renderer turns [`ChartData`] into some output and keeps no state of its
//! own. [`SvgBarChart`] draws a standalone SVG document with plotters.

use plotters::prelude::*;
use shared::ChartData;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChartError {
    #[error("Nothing to chart")]
    NoData,
    #[error("Labels and values differ in length ({labels} vs {values})")]
    Mismatched { labels: usize, values: usize },
    #[error("Chart rendering failed: {0}")]
    Render(String),
}

pub trait ChartRenderer {
    type Output;

    fn render(&self, data: &ChartData) -> Result<Self::Output, ChartError>;
}

const BAR_COLOR: RGBColor = RGBColor(102, 126, 234);
const AXIS_COLOR: RGBColor = RGBColor(230, 230, 230);

/// Vertical bar chart, one bar per category
#[derive(Debug, Clone, Copy)]
pub struct SvgBarChart {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgBarChart {
    fn default() -> Self {
        Self { width: 640, height: 400 }
    }
}

impl ChartRenderer for SvgBarChart {
    type Output = String;

    fn render(&self, data: &ChartData) -> Result<String, ChartError> {
        if data.labels.len() != data.values.len() {
            return Err(ChartError::Mismatched {
                labels: data.labels.len(),
                values: data.values.len(),
            });
        }
        if data.is_empty() {
            return Err(ChartError::NoData);
        }

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let max_value = data.values.iter().cloned().fold(0.0_f64, f64::max).max(1.0);
            let bars = data.values.len() as i32;
            let labels = &data.labels;

            let mut chart = ChartBuilder::on(&root)
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d((0..bars).into_segmented(), 0.0..max_value * 1.1)
                .map_err(render_error)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .y_desc("Amount")
                .x_labels(labels.len())
                .x_label_formatter(&|segment| match segment {
                    SegmentValue::CenterOf(index) => labels.get(*index as usize).cloned().unwrap_or_default(),
                    _ => String::new(),
                })
                .y_label_formatter(&|value| format!("{:.2}", value))
                .axis_style(&AXIS_COLOR)
                .draw()
                .map_err(render_error)?;

            chart
                .draw_series(data.values.iter().enumerate().map(|(index, value)| {
                    let index = index as i32;
                    let mut bar = Rectangle::new(
                        [(SegmentValue::Exact(index), 0.0), (SegmentValue::Exact(index + 1), *value)],
                        BAR_COLOR.filled(),
                    );
                    bar.set_margin(0, 0, 8, 8);
                    bar
                }))
                .map_err(render_error)?;

            root.present().map_err(render_error)?;
        }
        Ok(svg)
    }
}

fn render_error<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

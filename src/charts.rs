// Static charts shown on the terminal. Each chart is a plain value built from
// the report tables, rasterised into its own in-memory buffer, and displayed;
// nothing is written to disk and nothing here touches the tables.
use crate::error::{AnalysisError, Result};
use crate::types::{CorrelationMatrix, DerivedRow, VolatilityPoint};
use image::{DynamicImage, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use tracing::{info, warn};

/// Display-only multiplier that lifts return impact onto the same visual
/// scale as discount percentages. The stored metric is never scaled.
pub const RETURN_IMPACT_DISPLAY_SCALE: f64 = 5.0;

const SIZE: (u32, u32) = (800, 500);
const DISPLAY_COLUMNS: u32 = 100;

/// Bytes in an RGB frame of `size`.
fn frame_len(size: (u32, u32)) -> usize {
    size.0 as usize * size.1 as usize * 3
}

fn into_image(buf: Vec<u8>, size: (u32, u32)) -> Result<RgbImage> {
    let len = buf.len();
    RgbImage::from_raw(size.0, size.1, buf).ok_or_else(|| {
        AnalysisError::Chart(format!(
            "frame of {} bytes does not fit {}x{}",
            len, size.0, size.1
        ))
    })
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub color: RGBColor,
    pub markers: bool,
    /// `None` breaks the line at that point.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub x_labels: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone)]
pub struct Heatmap {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone)]
pub enum Chart {
    Line(LineChart),
    Heatmap(Heatmap),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Line(c) => &c.title,
            Chart::Heatmap(h) => &h.title,
        }
    }

    /// Every series must have exactly one value per axis point.
    pub fn check_lengths(&self) -> Result<()> {
        match self {
            Chart::Line(c) => {
                for s in &c.series {
                    if s.values.len() != c.x_labels.len() {
                        return Err(AnalysisError::SeriesLength {
                            chart: "line",
                            axis: c.x_labels.len(),
                            series: s.values.len(),
                        });
                    }
                }
            }
            Chart::Heatmap(h) => {
                for row in &h.values {
                    if row.len() != h.labels.len() {
                        return Err(AnalysisError::SeriesLength {
                            chart: "heatmap",
                            axis: h.labels.len(),
                            series: row.len(),
                        });
                    }
                }
                if h.values.len() != h.labels.len() {
                    return Err(AnalysisError::SeriesLength {
                        chart: "heatmap",
                        axis: h.labels.len(),
                        series: h.values.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// `None` for a line chart with no points.
    pub fn rasterize(&self) -> Result<Option<RgbImage>> {
        self.check_lengths()?;
        if let Chart::Line(c) = self {
            if c.x_labels.is_empty() {
                warn!(chart = %c.title, "no data points, chart skipped");
                return Ok(None);
            }
        }
        let mut buf = vec![0u8; frame_len(SIZE)];
        {
            let root = BitMapBackend::with_buffer(&mut buf, SIZE).into_drawing_area();
            let drawn = match self {
                Chart::Line(c) => draw_line_chart(c, &root),
                Chart::Heatmap(h) => draw_heatmap(h, &root),
            };
            drawn.map_err(|e| AnalysisError::Chart(format!("{}: {}", self.title(), e)))?;
        }
        into_image(buf, SIZE).map(Some)
    }

    /// Rasterise and print the chart to the terminal.
    pub fn show(&self) -> Result<()> {
        let Some(img) = self.rasterize()? else {
            return Ok(());
        };
        println!("\n{}", self.title());
        let conf = viuer::Config {
            width: Some(DISPLAY_COLUMNS),
            absolute_offset: false,
            ..Default::default()
        };
        viuer::print(&DynamicImage::ImageRgb8(img), &conf)
            .map_err(|e| AnalysisError::Chart(format!("{}: {}", self.title(), e)))?;
        info!(chart = self.title(), "chart displayed");
        Ok(())
    }
}

pub fn volatility_chart(points: &[VolatilityPoint]) -> Chart {
    Chart::Line(LineChart {
        title: "Quarterly Discount Volatility Trends".to_string(),
        x_desc: "Quarter".to_string(),
        y_desc: "Std Dev of Discount (%)".to_string(),
        x_labels: points.iter().map(|p| p.quarter.clone()).collect(),
        series: vec![Series {
            label: "Discount Volatility".to_string(),
            color: MAGENTA,
            markers: true,
            values: points.iter().map(|p| Some(p.volatility)).collect(),
        }],
    })
}

pub fn discount_return_chart(derived: &[DerivedRow]) -> Chart {
    Chart::Line(LineChart {
        title: "Movement of Discount and Return Impact".to_string(),
        x_desc: "Month".to_string(),
        y_desc: "Percentage %".to_string(),
        x_labels: derived.iter().map(|d| d.aggregate.key.clone()).collect(),
        series: vec![
            Series {
                label: "Discount (%)".to_string(),
                color: BLUE,
                markers: false,
                values: derived
                    .iter()
                    .map(|d| Some(d.aggregate.discount * 100.0))
                    .collect(),
            },
            Series {
                label: format!("Return Impact (x{})", RETURN_IMPACT_DISPLAY_SCALE),
                color: RGBColor(255, 140, 0),
                markers: false,
                values: derived
                    .iter()
                    .map(|d| d.return_impact.value().map(|v| v * RETURN_IMPACT_DISPLAY_SCALE))
                    .collect(),
            },
        ],
    })
}

pub fn correlation_heatmap(matrix: &CorrelationMatrix) -> Chart {
    Chart::Heatmap(Heatmap {
        title: "Correlation Between Metrics".to_string(),
        labels: matrix.labels.iter().map(|l| l.to_string()).collect(),
        values: matrix.values.iter().map(|row| row.to_vec()).collect(),
    })
}

fn y_range(c: &LineChart) -> (f64, f64) {
    let vals: Vec<f64> = c
        .series
        .iter()
        .flat_map(|s| s.values.iter().flatten().copied())
        .collect();
    let lo = vals.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if (hi - lo).abs() < f64::EPSILON {
        1.0
    } else {
        (hi - lo) * 0.1
    };
    (lo - pad, hi + pad)
}

/// Contiguous runs of defined points.
fn runs(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut out = Vec::new();
    let mut cur = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(y) => cur.push((i, *y)),
            None if !cur.is_empty() => out.push(std::mem::take(&mut cur)),
            None => {}
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn draw_line_chart(c: &LineChart, root: &Area<'_>) -> std::result::Result<(), Box<dyn Error>> {
    root.fill(&WHITE)?;

    let (y_lo, y_hi) = y_range(c);
    let mut chart = ChartBuilder::on(root)
        .caption(&c.title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(0usize..c.x_labels.len(), y_lo..y_hi)?;

    let label_of = |i: &usize| c.x_labels.get(*i).cloned().unwrap_or_default();
    chart
        .configure_mesh()
        .x_labels(c.x_labels.len() + 1)
        .x_label_formatter(&label_of)
        .x_desc(c.x_desc.as_str())
        .y_desc(c.y_desc.as_str())
        .draw()?;

    for s in &c.series {
        let color = s.color;
        for (n, run) in runs(&s.values).into_iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(run.clone(), color.stroke_width(2)))?;
            if n == 0 {
                drawn
                    .label(s.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }
            if s.markers {
                chart.draw_series(run.iter().map(|p| Circle::new(*p, 4, color.filled())))?;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Blue for -1, white for 0, red for +1.
fn diverging(v: f64) -> RGBColor {
    let t = v.clamp(-1.0, 1.0);
    let fade = |c: f64| (255.0 - (255.0 - c) * t.abs()).round() as u8;
    if t >= 0.0 {
        RGBColor(fade(178.0), fade(24.0), fade(43.0))
    } else {
        RGBColor(fade(33.0), fade(102.0), fade(172.0))
    }
}

fn draw_heatmap(h: &Heatmap, area: &Area<'_>) -> std::result::Result<(), Box<dyn Error>> {
    area.fill(&WHITE)?;
    let root = area.titled(&h.title, ("sans-serif", 24))?;

    let n = h.labels.len().max(1) as i32;
    let (left, top) = (140, 20);
    let cell = ((SIZE.1 as i32 - 120) / n).min((SIZE.0 as i32 - left - 40) / n);
    let label_font = ("sans-serif", 14).into_font();
    let value_font = ("sans-serif", 16).into_font();

    for (i, row) in h.values.iter().enumerate() {
        let y0 = top + i as i32 * cell;
        root.draw(&Text::new(
            h.labels[i].clone(),
            (10, y0 + cell / 2 - 7),
            label_font.clone(),
        ))?;
        for (j, v) in row.iter().enumerate() {
            let x0 = left + j as i32 * cell;
            let fill = v.map(diverging).unwrap_or(RGBColor(220, 220, 220));
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell, y0 + cell)],
                fill.filled(),
            ))?;
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell, y0 + cell)],
                WHITE.stroke_width(1),
            ))?;
            let text = v.map(|c| format!("{:.2}", c)).unwrap_or_else(|| "n/a".to_string());
            root.draw(&Text::new(
                text,
                (x0 + cell / 2 - 18, y0 + cell / 2 - 8),
                value_font.clone(),
            ))?;
        }
    }
    let axis_y = top + n * cell + 8;
    for (j, label) in h.labels.iter().enumerate() {
        root.draw(&Text::new(
            label.clone(),
            (left + j as i32 * cell + 4, axis_y),
            label_font.clone(),
        ))?;
    }
    root.present()?;
    Ok(())
}

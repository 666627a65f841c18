//! SVG chart rendering on top of the plotters SVG backend.
//!
//! A chart file is a titled 2x2 grid of [`Panel`]s, except the correlation
//! heatmap which draws its cells directly in pixel space. Every renderer
//! builds the document in memory and hands it to the atomic writer, so a
//! failed render never leaves a truncated file behind.

use std::ops::Range;
use std::path::Path;

use anyhow::Result;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::{io_utils, stats::format_number};

pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
pub const ORANGE: RGBColor = RGBColor(255, 165, 0);
pub const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);
pub const CORAL: RGBColor = RGBColor(255, 127, 80);
pub const GOLD: RGBColor = RGBColor(255, 215, 0);
pub const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);
pub const PURPLE: RGBColor = RGBColor(128, 0, 128);
pub const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);
pub const CRIMSON: RGBColor = RGBColor(220, 20, 60);

const GRID_SIZE: (u32, u32) = (1500, 1200);
const HEATMAP_SIZE: (u32, u32) = (1000, 880);
pub const PANEL_SIZE: (u32, u32) = (640, 420);

const VIRIDIS: [(f64, f64, f64); 5] = [
    (68.0, 1.0, 84.0),
    (59.0, 82.0, 139.0),
    (33.0, 145.0, 140.0),
    (94.0, 201.0, 98.0),
    (253.0, 231.0, 37.0),
];
const COOLWARM: [(f64, f64, f64); 3] = [
    (59.0, 76.0, 192.0),
    (221.0, 221.0, 221.0),
    (180.0, 4.0, 38.0),
];

#[derive(Debug, Clone, PartialEq)]
pub enum PanelKind {
    /// One bar per label; horizontal bars stack bottom to top.
    Bars {
        labels: Vec<String>,
        values: Vec<f64>,
        horizontal: bool,
    },
    Line {
        labels: Vec<String>,
        values: Vec<f64>,
        markers: bool,
    },
    Histogram { values: Vec<f64>, bins: usize },
    /// Points optionally shaded on the viridis scale by `shades`.
    Scatter {
        points: Vec<(f64, f64)>,
        shades: Option<Vec<f64>>,
    },
    Boxplot { groups: Vec<(String, Vec<f64>)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub color: RGBColor,
    pub kind: PanelKind,
}

impl Panel {
    pub fn new(title: &str, x_desc: &str, y_desc: &str, color: RGBColor, kind: PanelKind) -> Self {
        Self {
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: y_desc.to_string(),
            color,
            kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.kind {
            PanelKind::Bars { values, .. } | PanelKind::Line { values, .. } => values.is_empty(),
            PanelKind::Histogram { values, .. } => values.is_empty(),
            PanelKind::Scatter { points, .. } => points.is_empty(),
            PanelKind::Boxplot { groups } => groups.iter().all(|(_, values)| values.is_empty()),
        }
    }
}

/// Pixel rectangle of a drawn data element plus its tooltip text.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub label: String,
}

impl Hotspot {
    fn spanning(a: (i32, i32), b: (i32, i32), label: String) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: (a.0 - b.0).abs().max(2),
            height: (a.1 - b.1).abs().max(2),
            label,
        }
    }

    fn around(center: (i32, i32), radius: i32, label: String) -> Self {
        Self {
            x: center.0 - radius,
            y: center.1 - radius,
            width: radius * 2,
            height: radius * 2,
            label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins between the minimum and maximum; the last bin is closed
/// on both ends. A constant input is centred in a unit-wide range.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in finite {
        let idx = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            lower: min + width * idx as f64,
            upper: min + width * (idx + 1) as f64,
            count,
        })
        .collect()
}

/// Renders up to four panels as a titled 2x2 grid.
pub fn render_grid(path: &Path, title: &str, panels: &[Panel]) -> Result<()> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, GRID_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(title, ("sans-serif", 28))?;
        for (area, panel) in root.split_evenly((2, 2)).iter().zip(panels) {
            draw_panel(area, panel)?;
        }
        root.present()?;
    }
    io_utils::write_text_atomically(path, &svg)?;
    info!("Chart saved to {path:?}");
    Ok(())
}

/// Renders one panel as a standalone SVG document and reports where each
/// data element landed.
pub fn render_panel_svg(panel: &Panel, size: (u32, u32)) -> Result<(String, Vec<Hotspot>)> {
    let mut svg = String::new();
    let hotspots = {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        let hotspots = draw_panel(&root, panel)?;
        root.present()?;
        hotspots
    };
    Ok((svg, hotspots))
}

fn draw_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, panel: &Panel) -> Result<Vec<Hotspot>> {
    if panel.is_empty() {
        return draw_placeholder(area, panel);
    }
    match &panel.kind {
        PanelKind::Bars {
            labels,
            values,
            horizontal: false,
        } => draw_columns(area, panel, labels, values),
        PanelKind::Bars {
            labels,
            values,
            horizontal: true,
        } => draw_rows(area, panel, labels, values),
        PanelKind::Line {
            labels,
            values,
            markers,
        } => draw_line(area, panel, labels, values, *markers),
        PanelKind::Histogram { values, bins } => draw_histogram(area, panel, values, *bins),
        PanelKind::Scatter { points, shades } => {
            draw_scatter(area, panel, points, shades.as_deref())
        }
        PanelKind::Boxplot { groups } => draw_boxplot(area, panel, groups),
    }
}

fn draw_placeholder(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
) -> Result<Vec<Hotspot>> {
    let (width, height) = area.dim_in_pixel();
    let centered = Pos::new(HPos::Center, VPos::Center);
    area.draw(&Text::new(
        panel.title.clone(),
        (width as i32 / 2, 24),
        ("sans-serif", 18).into_font().color(&BLACK).pos(centered),
    ))?;
    area.draw(&Text::new(
        "No data available",
        (width as i32 / 2, height as i32 / 2),
        ("sans-serif", 14).into_font().color(&BLACK.mix(0.6)).pos(centered),
    ))?;
    Ok(Vec::new())
}

fn draw_columns(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    labels: &[String],
    values: &[f64],
) -> Result<Vec<Hotspot>> {
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d(
            (0..segment_upper(labels.len())).into_segmented(),
            value_range(values.iter().copied().chain([0.0])),
        )?;
    let label_of = |value: &SegmentValue<i32>| segment_label(labels, value);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&label_of)
        .y_label_formatter(&|value: &f64| axis_number(*value))
        .x_desc(panel.x_desc.as_str())
        .y_desc(panel.y_desc.as_str())
        .label_style(("sans-serif", 11))
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(idx, value)| {
        let idx = idx as i32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(idx), 0.0), (SegmentValue::Exact(idx + 1), *value)],
            panel.color.mix(0.75).filled(),
        );
        bar.set_margin(0, 0, 4, 4);
        bar
    }))?;

    Ok(labels
        .iter()
        .zip(values)
        .enumerate()
        .map(|(idx, (label, value))| {
            let idx = idx as i32;
            Hotspot::spanning(
                chart.backend_coord(&(SegmentValue::Exact(idx), 0.0)),
                chart.backend_coord(&(SegmentValue::Exact(idx + 1), *value)),
                format!("{label}: {}", format_number(*value)),
            )
        })
        .collect())
}

fn draw_rows(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    labels: &[String],
    values: &[f64],
) -> Result<Vec<Hotspot>> {
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(150)
        .build_cartesian_2d(
            value_range(values.iter().copied().chain([0.0])),
            (0..segment_upper(labels.len())).into_segmented(),
        )?;
    let label_of = |value: &SegmentValue<i32>| segment_label(labels, value);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(labels.len())
        .y_label_formatter(&label_of)
        .x_label_formatter(&|value: &f64| axis_number(*value))
        .x_desc(panel.x_desc.as_str())
        .label_style(("sans-serif", 11))
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(idx, value)| {
        let idx = idx as i32;
        let mut bar = Rectangle::new(
            [(0.0, SegmentValue::Exact(idx)), (*value, SegmentValue::Exact(idx + 1))],
            panel.color.mix(0.75).filled(),
        );
        bar.set_margin(3, 3, 0, 0);
        bar
    }))?;

    Ok(labels
        .iter()
        .zip(values)
        .enumerate()
        .map(|(idx, (label, value))| {
            let idx = idx as i32;
            Hotspot::spanning(
                chart.backend_coord(&(0.0, SegmentValue::Exact(idx))),
                chart.backend_coord(&(*value, SegmentValue::Exact(idx + 1))),
                format!("{label}: {}", format_number(*value)),
            )
        })
        .collect())
}

fn draw_line(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    labels: &[String],
    values: &[f64],
    markers: bool,
) -> Result<Vec<Hotspot>> {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(idx, value)| (idx as f64, *value))
        .collect();
    let last = values.len().saturating_sub(1) as f64;
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d(-0.5..last + 0.5, value_range(values.iter().copied()))?;
    let label_of = |value: &f64| {
        let nearest = value.round();
        if (value - nearest).abs() > 1e-6 || nearest < 0.0 {
            return String::new();
        }
        labels.get(nearest as usize).cloned().unwrap_or_default()
    };
    chart
        .configure_mesh()
        .x_labels(labels.len().min(12))
        .x_label_formatter(&label_of)
        .y_label_formatter(&|value: &f64| axis_number(*value))
        .x_desc(panel.x_desc.as_str())
        .y_desc(panel.y_desc.as_str())
        .label_style(("sans-serif", 11))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), panel.color.stroke_width(2)))?;
    if markers {
        chart.draw_series(
            points
                .iter()
                .map(|point| Circle::new(*point, 4, panel.color.filled())),
        )?;
    }

    Ok(labels
        .iter()
        .zip(&points)
        .map(|(label, point)| {
            Hotspot::around(
                chart.backend_coord(point),
                6,
                format!("{label}: {}", format_number(point.1)),
            )
        })
        .collect())
}

fn draw_histogram(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    values: &[f64],
    bins: usize,
) -> Result<Vec<Hotspot>> {
    let bins = histogram_bins(values, bins);
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        return draw_placeholder(area, panel);
    };
    let tallest = bins.iter().map(|bin| bin.count).max().unwrap_or(0) as f64;
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(60)
        .build_cartesian_2d(first.lower..last.upper, 0.0..(tallest * 1.05).max(1.0))?;
    chart
        .configure_mesh()
        .x_label_formatter(&|value: &f64| axis_number(*value))
        .y_label_formatter(&|value: &f64| format!("{value:.0}"))
        .x_desc(panel.x_desc.as_str())
        .y_desc(panel.y_desc.as_str())
        .label_style(("sans-serif", 11))
        .draw()?;

    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new(
            [(bin.lower, 0.0), (bin.upper, bin.count as f64)],
            panel.color.mix(0.75).filled(),
        )
    }))?;
    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new(
            [(bin.lower, 0.0), (bin.upper, bin.count as f64)],
            BLACK.stroke_width(1),
        )
    }))?;

    Ok(bins
        .iter()
        .map(|bin| {
            Hotspot::spanning(
                chart.backend_coord(&(bin.lower, 0.0)),
                chart.backend_coord(&(bin.upper, bin.count as f64)),
                format!(
                    "{} - {}: {}",
                    format_number(bin.lower),
                    format_number(bin.upper),
                    bin.count
                ),
            )
        })
        .collect())
}

fn draw_scatter(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    points: &[(f64, f64)],
    shades: Option<&[f64]>,
) -> Result<Vec<Hotspot>> {
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d(
            value_range(points.iter().map(|p| p.0)),
            value_range(points.iter().map(|p| p.1)),
        )?;
    chart
        .configure_mesh()
        .x_label_formatter(&|value: &f64| axis_number(*value))
        .y_label_formatter(&|value: &f64| axis_number(*value))
        .x_desc(panel.x_desc.as_str())
        .y_desc(panel.y_desc.as_str())
        .label_style(("sans-serif", 11))
        .draw()?;

    let shade_range = shades.map(|values| {
        let low = values.iter().copied().fold(f64::INFINITY, f64::min);
        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (values, low, high)
    });
    chart.draw_series(points.iter().enumerate().map(|(idx, point)| {
        let color = match &shade_range {
            Some((values, low, high)) => values
                .get(idx)
                .map(|value| viridis(normalize(*value, *low, *high)))
                .unwrap_or(panel.color),
            None => panel.color,
        };
        Circle::new(*point, 4, color.mix(0.6).filled())
    }))?;

    Ok(points
        .iter()
        .map(|point| {
            Hotspot::around(
                chart.backend_coord(point),
                5,
                format!("({}, {})", format_number(point.0), format_number(point.1)),
            )
        })
        .collect())
}

fn draw_boxplot(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    groups: &[(String, Vec<f64>)],
) -> Result<Vec<Hotspot>> {
    let groups: Vec<&(String, Vec<f64>)> =
        groups.iter().filter(|(_, values)| !values.is_empty()).collect();
    let labels: Vec<String> = groups.iter().map(|(label, _)| label.clone()).collect();
    let range = value_range(groups.iter().flat_map(|(_, values)| values.iter().copied()));
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..segment_upper(labels.len())).into_segmented(),
            (range.start as f32)..(range.end as f32),
        )?;
    let label_of = |value: &SegmentValue<i32>| segment_label(&labels, value);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&label_of)
        .y_label_formatter(&|value: &f32| axis_number(f64::from(*value)))
        .x_desc(panel.x_desc.as_str())
        .y_desc(panel.y_desc.as_str())
        .label_style(("sans-serif", 10))
        .draw()?;

    let quartiles: Vec<Quartiles> = groups
        .iter()
        .map(|(_, values)| Quartiles::new(values))
        .collect();
    chart.draw_series(quartiles.iter().enumerate().map(|(idx, quartile)| {
        Boxplot::new_vertical(SegmentValue::CenterOf(idx as i32), quartile)
            .width(18)
            .style(&panel.color)
    }))?;

    Ok(labels
        .iter()
        .zip(&quartiles)
        .enumerate()
        .map(|(idx, (label, quartile))| {
            let [_, q1, median, q3, _] = quartile.values();
            let key = SegmentValue::CenterOf(idx as i32);
            let (low, high) = (
                chart.backend_coord(&(key.clone(), q1)),
                chart.backend_coord(&(key, q3)),
            );
            Hotspot::spanning(
                (low.0 - 9, low.1),
                (high.0 + 9, high.1),
                format!("{label}: median {}", format_number(f64::from(median))),
            )
        })
        .collect())
}

/// Draws the strictly-lower triangle of a correlation matrix with annotated
/// cells and a colour bar, on the coolwarm scale centred at zero.
pub fn render_heatmap(
    path: &Path,
    title: &str,
    labels: &[String],
    matrix: &[Vec<Option<f64>>],
) -> Result<()> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, HEATMAP_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let area = root.titled(title, ("sans-serif", 24))?;
        draw_heatmap_cells(&area, labels, matrix)?;
        root.present()?;
    }
    io_utils::write_text_atomically(path, &svg)?;
    info!("Chart saved to {path:?}");
    Ok(())
}

fn draw_heatmap_cells(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    labels: &[String],
    matrix: &[Vec<Option<f64>>],
) -> Result<()> {
    let n = labels.len();
    if n == 0 {
        return Ok(());
    }
    let (width, height) = area.dim_in_pixel();
    let (left, top, right, bottom) = (170i32, 10i32, 110i32, 130i32);
    let cell = ((width as i32 - left - right) / n as i32)
        .min((height as i32 - top - bottom) / n as i32)
        .max(8);
    let centered = Pos::new(HPos::Center, VPos::Center);
    let annotation = ("sans-serif", 11).into_font().color(&BLACK).pos(centered);

    for (row, cells) in matrix.iter().enumerate() {
        for (col, value) in cells.iter().enumerate().take(row) {
            let Some(value) = value else {
                continue;
            };
            let x = left + col as i32 * cell;
            let y = top + row as i32 * cell;
            area.draw(&Rectangle::new(
                [(x, y), (x + cell, y + cell)],
                coolwarm(*value).filled(),
            ))?;
            area.draw(&Rectangle::new(
                [(x, y), (x + cell, y + cell)],
                WHITE.stroke_width(1),
            ))?;
            area.draw(&Text::new(
                format!("{value:.2}"),
                (x + cell / 2, y + cell / 2),
                annotation.clone(),
            ))?;
        }
    }

    let row_label = ("sans-serif", 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Right, VPos::Center));
    let col_label = ("sans-serif", 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (idx, label) in labels.iter().enumerate() {
        let short = truncate_label(label, 16);
        area.draw(&Text::new(
            short.clone(),
            (left - 6, top + idx as i32 * cell + cell / 2),
            row_label.clone(),
        ))?;
        let y = top + n as i32 * cell + 6 + (idx as i32 % 2) * 16;
        area.draw(&Text::new(
            short,
            (left + idx as i32 * cell + cell / 2, y),
            col_label.clone(),
        ))?;
    }

    let bar_x = left + n as i32 * cell + 30;
    let bar_height = n as i32 * cell;
    let steps = 40;
    for step in 0..steps {
        let value = 1.0 - 2.0 * (step as f64 + 0.5) / steps as f64;
        let y0 = top + bar_height * step / steps;
        let y1 = top + bar_height * (step + 1) / steps;
        area.draw(&Rectangle::new(
            [(bar_x, y0), (bar_x + 20, y1)],
            coolwarm(value).filled(),
        ))?;
    }
    let tick = ("sans-serif", 11)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    for (value, y) in [(1.0, top), (0.0, top + bar_height / 2), (-1.0, top + bar_height)] {
        area.draw(&Text::new(format!("{value:.1}"), (bar_x + 26, y), tick.clone()))?;
    }
    Ok(())
}

/// Upper bound for a segmented axis holding `len` categories.
fn segment_upper(len: usize) -> i32 {
    (len as i32 - 1).max(0)
}

fn segment_label(labels: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(idx) | SegmentValue::Exact(idx) => usize::try_from(*idx)
            .ok()
            .and_then(|idx| labels.get(idx))
            .cloned()
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

/// Padded axis range over finite values; a zero lower bound stays at zero.
fn value_range<I>(values: I) -> Range<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if min == max {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        return (min - pad)..(max + pad);
    }
    let pad = (max - min) * 0.05;
    let lower = if min == 0.0 { 0.0 } else { min - pad };
    lower..(max + pad)
}

fn normalize(value: f64, low: f64, high: f64) -> f64 {
    if high > low {
        ((value - low) / (high - low)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn interpolate(stops: &[(f64, f64, f64)], t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (stops.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - idx as f64;
    let (a, b) = (stops[idx], stops[idx + 1]);
    let channel = |x: f64, y: f64| (x + (y - x) * frac).round().clamp(0.0, 255.0) as u8;
    RGBColor(channel(a.0, b.0), channel(a.1, b.1), channel(a.2, b.2))
}

pub fn viridis(t: f64) -> RGBColor {
    interpolate(&VIRIDIS, t)
}

/// Maps a correlation in [-1, 1] onto the diverging coolwarm scale.
pub fn coolwarm(value: f64) -> RGBColor {
    interpolate(&COOLWARM, (value + 1.0) / 2.0)
}

fn axis_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if magnitude >= 1e3 {
        format!("{:.0}K", value / 1e3)
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() > max_chars {
        let head: String = label.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn histogram_bins_close_the_last_bin() {
        let bins = histogram_bins(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![1, 1, 1, 2]);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[3].upper, 4.0);
    }

    #[test]
    fn histogram_of_constant_values_uses_unit_range() {
        let bins = histogram_bins(&[5.0, 5.0], 2);
        assert_eq!(bins[0].lower, 4.5);
        assert_eq!(bins[1].upper, 5.5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn color_scales_hit_their_end_stops() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
        assert_eq!(viridis(1.0), RGBColor(253, 231, 37));
    }

    #[test]
    fn value_range_keeps_zero_floor_for_bars() {
        let range = value_range([0.0, 100.0]);
        assert_eq!(range.start, 0.0);
        assert!(range.end > 100.0);
        assert_eq!(value_range(std::iter::empty()), 0.0..1.0);
    }

    #[test]
    fn truncate_label_appends_ellipsis() {
        assert_eq!(truncate_label("Mini Gifts Distributors Ltd.", 20), "Mini Gifts Distribut...");
        assert_eq!(truncate_label("Short", 20), "Short");
    }

    #[test]
    fn render_grid_writes_svg_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let panels = vec![
            Panel::new(
                "Totals",
                "Year",
                "Sales",
                SKY_BLUE,
                PanelKind::Bars {
                    labels: vec!["2003".into(), "2004".into()],
                    values: vec![10.0, 20.0],
                    horizontal: false,
                },
            ),
            Panel::new(
                "Empty",
                "",
                "",
                ORANGE,
                PanelKind::Line {
                    labels: Vec::new(),
                    values: Vec::new(),
                    markers: true,
                },
            ),
        ];
        render_grid(&path, "Grid", &panels).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("No data available"));
    }

    #[test]
    fn panel_svg_reports_one_hotspot_per_bar() {
        let panel = Panel::new(
            "Lines",
            "Sales",
            "",
            CORAL,
            PanelKind::Bars {
                labels: vec!["Ships".into(), "Planes".into(), "Trains".into()],
                values: vec![3.0, 1.0, 2.0],
                horizontal: true,
            },
        );
        let (svg, hotspots) = render_panel_svg(&panel, PANEL_SIZE).unwrap();
        assert!(svg.contains("</svg>"));
        assert_eq!(hotspots.len(), 3);
        assert!(hotspots[0].label.starts_with("Ships: 3"));
        assert!(hotspots.iter().all(|h| h.width > 0 && h.height > 0));
    }
}

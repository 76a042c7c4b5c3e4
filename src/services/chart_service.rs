//! Price chart pipeline: normalize the provider's loosely-typed payload
//! into a strict dataset and render it as a history-vs-forecast line chart.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde_json::Value;
use tracing::warn;

use crate::models::{ChartDataset, PricePoint, Series, SeriesPoint};

/// Fixed chart margins in device-independent pixels. Bottom and left are
/// realized as the x/y label areas so the axes live inside the margin.
pub const MARGIN_TOP: u32 = 20;
pub const MARGIN_RIGHT: u32 = 30;
pub const MARGIN_BOTTOM: u32 = 30;
pub const MARGIN_LEFT: u32 = 50;

/// History line and marker outline (blue-600)
pub const HISTORY_COLOR: RGBColor = RGBColor(37, 99, 235);
/// Forecast line and marker outline (purple-600)
pub const FORECAST_COLOR: RGBColor = RGBColor(147, 51, 234);

const CAPTION_COLOR: RGBColor = RGBColor(100, 116, 139);
const CAPTION: &str = "History (blue) vs Forecast (purple)";

const LINE_WIDTH: u32 = 3;
const MARKER_RADIUS: i32 = 5;
const DASH_SIZE: u32 = 6;
const DASH_GAP: u32 = 6;
/// Interpolated vertices per segment when smoothing a series
const CURVE_SAMPLES: usize = 16;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A resizable drawing surface owning the rendered SVG document.
///
/// The host view owns exactly one surface; every render call fully
/// replaces its content.
#[derive(Debug, Clone)]
pub struct ChartSurface {
    width: u32,
    height: u32,
    svg: String,
}

impl ChartSurface {
    /// Create a blank surface with the given content-box size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            svg: String::new(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Record a new content-box size; the caller re-renders afterwards
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Drop all drawn content
    pub fn clear(&mut self) {
        self.svg.clear();
    }

    /// The current SVG document; empty when nothing is drawn
    pub fn svg(&self) -> &str {
        &self.svg
    }
}

/// Usable plotting area once the fixed margins are subtracted, or `None`
/// when the surface is still collapsed by layout
pub fn plot_area(width: u32, height: u32) -> Option<(u32, u32)> {
    let w = width.checked_sub(MARGIN_LEFT + MARGIN_RIGHT)?;
    let h = height.checked_sub(MARGIN_TOP + MARGIN_BOTTOM)?;
    if w == 0 || h == 0 {
        None
    } else {
        Some((w, h))
    }
}

/// Responsive tick density: roughly one x tick per 80 px of plot width,
/// never fewer than 2
pub fn x_tick_count(plot_width: u32) -> usize {
    ((plot_width / 80) as usize).max(2)
}

/// `[min date, max date]` over the merged series, `None` when empty
pub fn x_domain(points: &[SeriesPoint]) -> Option<(NaiveDate, NaiveDate)> {
    let first = points.first()?.date;
    let mut min = first;
    let mut max = first;
    for p in points {
        min = min.min(p.date);
        max = max.max(p.date);
    }
    Some((min, max))
}

/// Upper y bound: the maximum price plus 10% visual headroom. Empty or
/// all-zero inputs yield 0.
pub fn y_upper_bound(points: &[SeriesPoint]) -> f64 {
    points.iter().map(|p| p.price).fold(0.0, f64::max) * 1.1
}

/// Parse the provider's chart payload into a strict dataset.
///
/// Missing `history`/`forecast` become empty sequences. A point with an
/// unparseable date or a non-numeric, negative or non-finite price is
/// dropped and logged, never aborting the whole dataset.
pub fn normalize_dataset(raw: &Value) -> ChartDataset {
    let crop = raw
        .get("crop")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let currency = raw
        .get("currency")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    ChartDataset {
        crop,
        currency,
        history: normalize_points(raw.get("history")),
        forecast: normalize_points(raw.get("forecast")),
    }
}

fn normalize_points(value: Option<&Value>) -> Vec<PricePoint> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items.iter().filter_map(normalize_point).collect()
}

fn normalize_point(value: &Value) -> Option<PricePoint> {
    let date = value
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok());
    let Some(date) = date else {
        warn!("Dropping chart point with unparseable date: {}", value);
        return None;
    };

    match value.get("price").and_then(Value::as_f64) {
        Some(price) if price.is_finite() && price >= 0.0 => Some(PricePoint { date, price }),
        _ => {
            warn!("Dropping chart point with invalid price: {}", value);
            None
        }
    }
}

/// Monotone cubic (Fritsch-Carlson) interpolation of `points`, sampled
/// at `samples` steps per segment. The curve passes through every input
/// point and never overshoots the local extremes.
pub fn monotone_curve(points: &[(f64, f64)], samples: usize) -> Vec<(f64, f64)> {
    let n = points.len();
    if n < 3 || samples == 0 {
        return points.to_vec();
    }

    let h: Vec<f64> = (0..n - 1).map(|i| points[i + 1].0 - points[i].0).collect();
    let delta: Vec<f64> = (0..n - 1)
        .map(|i| {
            if h[i] > 0.0 {
                (points[i + 1].1 - points[i].1) / h[i]
            } else {
                0.0
            }
        })
        .collect();

    // Tangents: zero at local extremes, weighted harmonic mean elsewhere
    let mut m = vec![0.0; n];
    m[0] = delta[0];
    m[n - 1] = delta[n - 2];
    for i in 1..n - 1 {
        if delta[i - 1] * delta[i] <= 0.0 {
            m[i] = 0.0;
        } else {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            m[i] = (w1 + w2) / (w1 / delta[i - 1] + w2 / delta[i]);
        }
    }

    let mut out = Vec::with_capacity((n - 1) * samples + 1);
    out.push(points[0]);
    for i in 0..n - 1 {
        // Duplicate x values cannot be interpolated across
        if h[i] <= 0.0 {
            out.push(points[i + 1]);
            continue;
        }
        let (_, y0) = points[i];
        let (x1, y1) = points[i + 1];
        for s in 1..=samples {
            let t = s as f64 / samples as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            let x = points[i].0 + t * h[i];
            let y = h00 * y0 + h10 * h[i] * m[i] + h01 * y1 + h11 * h[i] * m[i + 1];
            if s == samples {
                // Land exactly on the input point
                out.push((x1, y1));
            } else {
                out.push((x, y));
            }
        }
    }
    out
}

fn to_datetime(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn to_seconds(date: NaiveDate) -> f64 {
    to_datetime(date).and_utc().timestamp() as f64
}

fn from_seconds(secs: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.naive_utc())
}

/// Date-sorted copy of one series, ready for line drawing
fn sorted_series(points: &[PricePoint]) -> Vec<PricePoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);
    sorted
}

/// Smoothed polyline vertices for one series
fn sample_curve(points: &[PricePoint]) -> Vec<(NaiveDateTime, f64)> {
    let xy: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (to_seconds(p.date), p.price))
        .collect();
    monotone_curve(&xy, CURVE_SAMPLES)
        .into_iter()
        .filter_map(|(x, y)| from_seconds(x).map(|dt| (dt, y)))
        .collect()
}

/// Render `dataset` into `surface`, fully replacing any previous content.
///
/// The call is idempotent and never fails for a well-formed dataset:
/// a collapsed surface defers drawing until the next resize, and an empty
/// dataset leaves a blank plotting area with no axes. The dataset itself
/// is never mutated.
pub fn render_chart(dataset: &ChartDataset, surface: &mut ChartSurface) -> Result<(), String> {
    surface.clear();
    let (width, height) = surface.size();

    let Some((plot_w, _)) = plot_area(width, height) else {
        return Ok(());
    };

    let merged = dataset.merged();
    if merged.is_empty() {
        return Ok(());
    }

    // Non-empty, so the domain exists
    let Some((x_min, x_max)) = x_domain(&merged) else {
        return Ok(());
    };
    let y_upper = y_upper_bound(&merged);

    // Degenerate domains are widened for drawing only, so a single date or
    // an all-zero price column still produces a usable scale
    let (x_lo, x_hi) = if x_min == x_max {
        (x_min - Duration::days(1), x_max + Duration::days(1))
    } else {
        (x_min, x_max)
    };
    let y_hi = if y_upper > 0.0 { y_upper } else { 1.0 };

    let history = sorted_series(&dataset.history);
    let forecast = sorted_series(&dataset.forecast);

    let root = SVGBackend::with_string(&mut surface.svg, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| format!("Failed to fill canvas: {}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin_top(MARGIN_TOP)
        .margin_right(MARGIN_RIGHT)
        .x_label_area_size(MARGIN_BOTTOM)
        .y_label_area_size(MARGIN_LEFT)
        .build_cartesian_2d(
            RangedDateTime::from(to_datetime(x_lo)..to_datetime(x_hi)),
            0.0..y_hi,
        )
        .map_err(|e| format!("Failed to build chart: {}", e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(x_tick_count(plot_w))
        .y_labels(6)
        .x_label_formatter(&|dt: &NaiveDateTime| dt.format("%b %d").to_string())
        .x_desc("Date")
        .y_desc(format!("Price ({})", dataset.currency))
        .draw()
        .map_err(|e| format!("Failed to draw axes: {}", e))?;

    if history.len() >= 2 {
        chart
            .draw_series(LineSeries::new(
                sample_curve(&history),
                HISTORY_COLOR.stroke_width(LINE_WIDTH),
            ))
            .map_err(|e| format!("Failed to draw history line: {}", e))?;
    }

    if forecast.len() >= 2 {
        chart
            .draw_series(DashedLineSeries::new(
                sample_curve(&forecast),
                DASH_SIZE,
                DASH_GAP,
                FORECAST_COLOR.stroke_width(LINE_WIDTH),
            ))
            .map_err(|e| format!("Failed to draw forecast line: {}", e))?;
    }

    // White-filled markers with a series-colored outline keep sparse
    // datasets legible as discrete observations
    chart
        .draw_series(
            merged
                .iter()
                .map(|p| Circle::new((to_datetime(p.date), p.price), MARKER_RADIUS, WHITE.filled())),
        )
        .map_err(|e| format!("Failed to draw marker fills: {}", e))?;
    chart
        .draw_series(merged.iter().map(|p| {
            let color = match p.series {
                Series::History => HISTORY_COLOR,
                Series::Forecast => FORECAST_COLOR,
            };
            Circle::new((to_datetime(p.date), p.price), MARKER_RADIUS, color.stroke_width(2))
        }))
        .map_err(|e| format!("Failed to draw marker outlines: {}", e))?;

    let caption_style = TextStyle::from(("sans-serif", 12).into_font())
        .color(&CAPTION_COLOR)
        .pos(Pos::new(HPos::Center, VPos::Top));
    root.draw(&Text::new(
        CAPTION.to_string(),
        ((width / 2) as i32, 5),
        caption_style,
    ))
    .map_err(|e| format!("Failed to draw caption: {}", e))?;

    root.present()
        .map_err(|e| format!("Failed to render chart: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_dataset() -> ChartDataset {
        normalize_dataset(&json!({
            "crop": "Wheat",
            "currency": "INR",
            "history": [
                {"date": "2024-01-01", "price": 2000.0},
                {"date": "2024-02-01", "price": 2100.0}
            ],
            "forecast": [
                {"date": "2024-03-01", "price": 2200.0}
            ]
        }))
    }

    fn circle_count(svg: &str) -> usize {
        svg.matches("<circle").count()
    }

    /// Markers whose tag carries the given color attribute value
    fn colored_circle_count(svg: &str, color: &str) -> usize {
        svg.split("<circle")
            .skip(1)
            .filter(|segment| {
                let tag = &segment[..segment.find('>').unwrap_or(segment.len())];
                tag.to_lowercase().contains(color)
            })
            .count()
    }

    #[test]
    fn test_x_domain_bounds_are_min_and_max() {
        let merged = sample_dataset().merged();
        let (min, max) = x_domain(&merged).unwrap();
        assert_eq!(min, date("2024-01-01"));
        assert_eq!(max, date("2024-03-01"));
    }

    #[test]
    fn test_x_domain_empty_is_none() {
        assert!(x_domain(&[]).is_none());
    }

    #[test]
    fn test_y_upper_bound_adds_ten_percent_headroom() {
        let merged = sample_dataset().merged();
        assert!((y_upper_bound(&merged) - 2420.0).abs() < 1e-9);
    }

    #[test]
    fn test_y_upper_bound_all_zero_prices() {
        let dataset = normalize_dataset(&json!({
            "history": [
                {"date": "2024-01-01", "price": 0.0},
                {"date": "2024-02-01", "price": 0.0}
            ]
        }));
        assert_eq!(y_upper_bound(&dataset.merged()), 0.0);

        // Degenerate but drawable: must not panic or divide by zero
        let mut surface = ChartSurface::new(400, 350);
        render_chart(&dataset, &mut surface).unwrap();
        assert_eq!(circle_count(surface.svg()), 4);
    }

    #[test]
    fn test_x_tick_count_scales_with_width() {
        assert_eq!(x_tick_count(320), 4);
        assert_eq!(x_tick_count(100), 2);
        assert_eq!(x_tick_count(0), 2);
    }

    #[test]
    fn test_plot_area_subtracts_margins() {
        assert_eq!(plot_area(400, 350), Some((320, 300)));
        assert_eq!(plot_area(80, 350), None);
        assert_eq!(plot_area(400, 50), None);
        assert_eq!(plot_area(0, 0), None);
    }

    #[test]
    fn test_normalize_missing_sequences_become_empty() {
        let dataset = normalize_dataset(&json!({"crop": "Rice"}));
        assert_eq!(dataset.crop, "Rice");
        assert!(dataset.history.is_empty());
        assert!(dataset.forecast.is_empty());
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_normalize_drops_unparseable_dates() {
        let dataset = normalize_dataset(&json!({
            "history": [
                {"date": "not-a-date", "price": 1500.0},
                {"date": "2024-01-01", "price": 2000.0}
            ]
        }));
        assert_eq!(dataset.history.len(), 1);
        assert_eq!(dataset.history[0].date, date("2024-01-01"));
    }

    #[test]
    fn test_normalize_drops_invalid_prices() {
        let dataset = normalize_dataset(&json!({
            "history": [
                {"date": "2024-01-01", "price": "cheap"},
                {"date": "2024-02-01", "price": -5.0},
                {"date": "2024-03-01"},
                {"date": "2024-04-01", "price": 1800.0}
            ]
        }));
        assert_eq!(dataset.history.len(), 1);
        assert_eq!(dataset.history[0].price, 1800.0);
    }

    #[test]
    fn test_normalize_tolerates_non_object_payload() {
        assert!(normalize_dataset(&json!(null)).is_empty());
        assert!(normalize_dataset(&json!({"history": "oops"})).is_empty());
    }

    #[test]
    fn test_render_scenario_marker_counts_and_colors() {
        let dataset = sample_dataset();
        let mut surface = ChartSurface::new(400, 350);
        render_chart(&dataset, &mut surface).unwrap();

        // 3 points, each drawn as a white fill plus a colored outline
        assert_eq!(circle_count(surface.svg()), 6);
        assert_eq!(colored_circle_count(surface.svg(), "#2563eb"), 2);
        assert_eq!(colored_circle_count(surface.svg(), "#9333ea"), 1);
        assert_eq!(colored_circle_count(surface.svg(), "#ffffff"), 3);

        let svg = surface.svg().to_lowercase();
        assert!(svg.contains("#2563eb"), "history line color missing");
        assert!(svg.contains("#9333ea"), "forecast line color missing");
        assert!(svg.contains("history (blue) vs forecast (purple)"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let dataset = sample_dataset();
        let mut surface = ChartSurface::new(400, 350);

        render_chart(&dataset, &mut surface).unwrap();
        let first = surface.svg().to_string();
        render_chart(&dataset, &mut surface).unwrap();

        assert_eq!(first, surface.svg());
    }

    #[test]
    fn test_render_empty_dataset_draws_nothing() {
        let mut surface = ChartSurface::new(400, 350);
        render_chart(&ChartDataset::default(), &mut surface).unwrap();

        assert_eq!(circle_count(surface.svg()), 0);
        assert_eq!(surface.svg().matches("<polyline").count(), 0);
    }

    #[test]
    fn test_render_collapsed_surface_is_noop() {
        let dataset = sample_dataset();

        let mut surface = ChartSurface::new(400, 0);
        render_chart(&dataset, &mut surface).unwrap();
        assert!(surface.svg().is_empty());

        surface.set_size(60, 350);
        render_chart(&dataset, &mut surface).unwrap();
        assert!(surface.svg().is_empty());
    }

    #[test]
    fn test_render_excludes_dropped_points_from_markers() {
        let dataset = normalize_dataset(&json!({
            "history": [
                {"date": "not-a-date", "price": 1500.0},
                {"date": "2024-01-01", "price": 2000.0},
                {"date": "2024-02-01", "price": 2100.0}
            ]
        }));
        let mut surface = ChartSurface::new(400, 350);
        render_chart(&dataset, &mut surface).unwrap();

        assert_eq!(circle_count(surface.svg()), 4);
    }

    #[test]
    fn test_render_single_point_dataset() {
        let dataset = normalize_dataset(&json!({
            "history": [{"date": "2024-01-01", "price": 2000.0}]
        }));
        let mut surface = ChartSurface::new(400, 350);
        render_chart(&dataset, &mut surface).unwrap();

        // One marker, no line
        assert_eq!(circle_count(surface.svg()), 2);
    }

    #[test]
    fn test_monotone_curve_passes_through_input_points() {
        let points = vec![(0.0, 0.0), (1.0, 2.0), (2.0, 1.0), (3.0, 3.0)];
        let curve = monotone_curve(&points, 8);

        for p in &points {
            assert!(
                curve.iter().any(|c| (c.0 - p.0).abs() < 1e-12 && (c.1 - p.1).abs() < 1e-12),
                "curve missed input point {:?}",
                p
            );
        }
    }

    #[test]
    fn test_monotone_curve_does_not_overshoot() {
        // Monotone increasing input must yield a monotone, bounded curve
        let points = vec![(0.0, 0.0), (1.0, 10.0), (2.0, 10.5), (3.0, 30.0)];
        let curve = monotone_curve(&points, 16);

        let mut prev = f64::NEG_INFINITY;
        for (x, y) in curve {
            assert!(x >= prev);
            prev = x;
            assert!((0.0..=30.0).contains(&y), "overshoot at ({}, {})", x, y);
        }
    }

    #[test]
    fn test_monotone_curve_short_inputs_unchanged() {
        let two = vec![(0.0, 1.0), (1.0, 2.0)];
        assert_eq!(monotone_curve(&two, 16), two);
        assert!(monotone_curve(&[], 16).is_empty());
    }
}

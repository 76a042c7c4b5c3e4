//! Market chart models

use chrono::NaiveDate;

/// A single observed or predicted price on a calendar day.
///
/// Only the normalization boundary in `chart_service` constructs these,
/// so a `PricePoint` always carries a valid date and a finite,
/// non-negative price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Which line of the chart a point belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    History,
    Forecast,
}

/// A price point tagged with its series, derived fresh for every render
/// and used only for merged sorting and per-series styling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub series: Series,
}

/// One crop's recent price history plus the AI forecast.
///
/// The host view owns exactly one dataset at a time and replaces it
/// wholesale on every query; the renderer only ever borrows it.
#[derive(Debug, Clone, Default)]
pub struct ChartDataset {
    pub crop: String,
    pub currency: String,
    pub history: Vec<PricePoint>,
    pub forecast: Vec<PricePoint>,
}

impl ChartDataset {
    /// A dataset counts as present if either series has at least one point
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.forecast.is_empty()
    }

    /// Merge both series and sort ascending by date.
    ///
    /// The sort is stable and history is concatenated first, so a history
    /// point sorts before a forecast point that shares its date.
    pub fn merged(&self) -> Vec<SeriesPoint> {
        let mut merged: Vec<SeriesPoint> = self
            .history
            .iter()
            .map(|p| SeriesPoint {
                date: p.date,
                price: p.price,
                series: Series::History,
            })
            .chain(self.forecast.iter().map(|p| SeriesPoint {
                date: p.date,
                price: p.price,
                series: Series::Forecast,
            }))
            .collect();

        merged.sort_by_key(|p| p.date);
        merged
    }
}

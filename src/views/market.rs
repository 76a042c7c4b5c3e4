//! Market view: owns the current dataset, the chart surface and the query
//! lifecycle. The renderer itself is stateless; all state lives here.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::api::gemini::GeminiClient;
use crate::models::{ChartDataset, MarketUpdates};
use crate::services::chart_service::{self, ChartSurface};
use crate::services::market_service;

/// Host-level chart lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    Idle,
    Loading,
    Rendered,
    Empty,
}

pub struct MarketView {
    state: ChartState,
    generation: u64,
    dataset: Option<ChartDataset>,
    updates: Option<MarketUpdates>,
    surface: ChartSurface,
}

impl MarketView {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: ChartState::Idle,
            generation: 0,
            dataset: None,
            updates: None,
            surface: ChartSurface::new(width, height),
        }
    }

    pub fn state(&self) -> ChartState {
        self.state
    }

    pub fn updates(&self) -> Option<&MarketUpdates> {
        self.updates.as_ref()
    }

    pub fn dataset(&self) -> Option<&ChartDataset> {
        self.dataset.as_ref()
    }

    pub fn surface(&self) -> &ChartSurface {
        &self.surface
    }

    /// Start a new query: bump the generation, discard the previous dataset
    /// immediately so no stale chart lingers, and enter `Loading`. Returns
    /// the generation tag the caller hands back on completion.
    pub fn begin_query(&mut self) -> u64 {
        self.generation += 1;
        self.dataset = None;
        self.updates = None;
        self.surface.clear();
        self.state = ChartState::Loading;
        self.generation
    }

    /// Store market news for the query tagged `generation`. Results from
    /// superseded queries are discarded.
    pub fn apply_updates(&mut self, generation: u64, updates: MarketUpdates) {
        if generation != self.generation {
            debug!("Discarding market updates from superseded query {}", generation);
            return;
        }
        self.updates = Some(updates);
    }

    /// Finish the query tagged `generation` with the fetched dataset.
    ///
    /// Stale completions are discarded, so an older, slower request can
    /// never overwrite newer state. An empty dataset or a provider error
    /// lands in `Empty`, which is a valid "no data" display state.
    pub fn complete_query(&mut self, generation: u64, result: Result<ChartDataset, String>) {
        if generation != self.generation {
            debug!("Discarding dataset from superseded query {}", generation);
            return;
        }

        match result {
            Ok(dataset) if !dataset.is_empty() => {
                self.dataset = Some(dataset);
                self.state = ChartState::Rendered;
                self.redraw();
            }
            Ok(_) => {
                self.dataset = None;
                self.state = ChartState::Empty;
            }
            Err(message) => {
                warn!("Market data fetch failed: {}", message);
                self.dataset = None;
                self.state = ChartState::Empty;
            }
        }
    }

    /// React to a surface size change: re-render from the currently stored
    /// dataset, never from a captured copy, so a resize arriving after a
    /// data update always reflects the latest data.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.set_size(width, height);
        if self.dataset.is_some() {
            self.redraw();
        } else {
            self.surface.clear();
        }
    }

    fn redraw(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            return;
        };
        if let Err(e) = chart_service::render_chart(dataset, &mut self.surface) {
            warn!("Chart render failed: {}", e);
        }
    }
}

/// Run one full "analyze crop" query against the shared view: grounded
/// market news first, then the chart dataset, both tagged with the
/// generation acquired when the query began.
pub async fn run_market_query(view: &Rc<RefCell<MarketView>>, client: &GeminiClient, crop: &str) {
    let generation = view.borrow_mut().begin_query();

    let updates = market_service::fetch_market_updates(client, crop).await;
    view.borrow_mut().apply_updates(generation, updates);

    let dataset = market_service::fetch_chart_dataset(client, crop).await;
    view.borrow_mut().complete_query(generation, dataset);
}

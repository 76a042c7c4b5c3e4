use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod models;
mod services;
mod utils;
mod views;

use api::gemini::GeminiClient;
use models::MarketUpdates;
use services::{advisory_service, chat_service::ChatSession, disease_service};
use utils::resize::ResizeBus;
use views::market::{run_market_query, ChartState, MarketView};

const CHART_WIDTH: u32 = 800;
const CHART_HEIGHT: u32 = 350;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("agriboost=debug".parse().unwrap()),
        )
        .with_target(true)
        .init();

    info!("🌾 Starting AgriBoost...");

    let api_key = std::env::var("API_KEY").expect("API_KEY not set");
    let client = GeminiClient::new(api_key);

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "market".to_string());

    match mode.as_str() {
        "market" => {
            let crop = args.next().unwrap_or_else(|| "Wheat".to_string());
            run_market(&client, &crop).await;
        }
        "advice" => {
            let location = args.next().expect("usage: advice <location>");
            println!("{}", advisory_service::get_weather_advice(&client, &location).await);
        }
        "suggest" => {
            let soil = args.next().expect("usage: suggest <soil> <season>");
            let season = args.next().expect("usage: suggest <soil> <season>");
            println!(
                "{}",
                advisory_service::get_crop_suggestion(&client, &soil, &season).await
            );
        }
        "fertilizer" => {
            let crop = args.next().expect("usage: fertilizer <crop> [acres] [stage]");
            let acres = args.next().unwrap_or_default();
            let stage = args.next().unwrap_or_default();
            println!(
                "{}",
                advisory_service::get_fertilizer_schedule(&client, &crop, &acres, &stage).await
            );
        }
        "schemes" => {
            let region = args.next().expect("usage: schemes <region>");
            let updates = advisory_service::get_schemes(&client, &region).await;
            println!("{}", updates.text);
            print_links(&updates);
        }
        "diagnose" => {
            let path = args.next().expect("usage: diagnose <image-path>");
            let bytes = std::fs::read(&path).expect("failed to read image file");
            let encoded = disease_service::encode_image(&bytes);
            println!("{}", disease_service::diagnose(&client, &encoded).await);
        }
        "chat" => {
            let message = args.next().expect("usage: chat <message>");
            let mut session = ChatSession::new();
            println!("{}", session.send(&client, &message).await);
        }
        // A bare crop name is shorthand for the market view
        crop => run_market(&client, crop).await,
    }
}

async fn run_market(client: &GeminiClient, crop: &str) {
    let view = Rc::new(RefCell::new(MarketView::new(CHART_WIDTH, CHART_HEIGHT)));

    // Keep the chart in sync with the hosting surface for the lifetime of
    // the view; the guard releases the subscription on teardown.
    let resize_bus = ResizeBus::new();
    let _subscription = resize_bus.subscribe({
        let view = Rc::clone(&view);
        move |width, height| view.borrow_mut().resize(width, height)
    });

    info!("Analyzing market for {}...", crop);
    run_market_query(&view, client, crop).await;

    let view = view.borrow();
    if let Some(updates) = view.updates() {
        println!("\n=== Latest Market News & Trends ===\n{}", updates.text);
        print_links(updates);
    }

    match view.state() {
        ChartState::Rendered => {
            let path = format!("{}_price_chart.svg", crop.to_lowercase().replace(' ', "_"));
            match std::fs::write(&path, view.surface().svg()) {
                Ok(()) => info!("Price trend chart written to {}", path),
                Err(e) => error!("Failed to write chart file: {}", e),
            }
        }
        ChartState::Empty => info!("No price data available for {}", crop),
        _ => {}
    }
}

fn print_links(updates: &MarketUpdates) {
    for link in &updates.links {
        println!(
            "  source: {} <{}>",
            link.title.as_deref().unwrap_or("Source"),
            link.uri
        );
    }
}

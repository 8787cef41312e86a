#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the crime lens dashboard.
//!
//! Serves the REST API for querying crime records, summary statistics,
//! heatmap points, hotspot clusters, arrest predictions, and crime
//! trends, plus the static dashboard frontend. The dataset is loaded
//! from CSV once at startup and shared read-only across requests.

mod handlers;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, Scope, middleware, web};
use crime_lens_dataset::{CrimeDataset, load};

/// Default location of the raw CSV export.
pub const DEFAULT_DATA_PATH: &str = "data/raw_data.csv";

/// Shared application state.
pub struct AppState {
    /// The loaded dataset. Immutable for the process lifetime; reload by
    /// restarting.
    pub dataset: Arc<CrimeDataset>,
}

/// Builds the `/api` scope with every dashboard route.
pub fn api_scope() -> Scope {
    web::scope("/api")
        .route("/health", web::get().to(handlers::health))
        .route("/crime-data", web::get().to(handlers::crime_data))
        .route("/crime-summary", web::get().to(handlers::crime_summary))
        .route("/heatmap-data", web::get().to(handlers::heatmap_data))
        .route("/crime-types", web::get().to(handlers::crime_types))
        .route("/years", web::get().to(handlers::years))
        .route("/districts", web::get().to(handlers::districts))
        .route("/time-series", web::get().to(handlers::time_series))
        .route("/clusters", web::get().to(handlers::clusters))
        .route(
            "/arrest-prediction",
            web::get().to(handlers::arrest_prediction),
        )
        .route("/crime-trends", web::get().to(handlers::crime_trends))
}

/// Starts the crime lens API server.
///
/// Loads the dataset from `CRIME_DATA_PATH` (default
/// [`DEFAULT_DATA_PATH`]) and starts the Actix-Web HTTP server.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if the dataset file is missing or invalid — the service is
/// useless without it.
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let data_path =
        std::env::var("CRIME_DATA_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());

    log::info!("Loading crime dataset from {data_path}...");
    let dataset = load::load_csv(Path::new(&data_path)).expect("Failed to load crime dataset");
    log::info!("Dataset ready: {} records", dataset.len());

    let state = web::Data::new(AppState {
        dataset: Arc::new(dataset),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(api_scope())
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

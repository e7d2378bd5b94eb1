mod broadcast;
mod db;
mod errors;
mod metrics;
mod model;
mod pdf;
mod report;
mod rest;
mod serialize;
mod views;

use axum::{routing::get, Router};
use std::env;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
        error!("DATABASE_URL must be set");
        std::process::exit(1);
    });
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let pdf_command =
        env::var("PDF_COMMAND").unwrap_or_else(|_| pdf::DEFAULT_PDF_COMMAND.to_string());

    info!("Starting air monitor dashboard");
    info!("HTTP server: {}", http_addr);
    info!("Database: {}", database_url.split('@').last().unwrap_or("***"));
    info!("PDF converter: {}", pdf_command);

    // Initialize metrics
    metrics::init_metrics();

    // Connect to database
    let pool = match db::make_pool(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    let store = db::Store::new(pool);

    // Broadcaster and its shutdown binding
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let broadcaster = Arc::new(broadcast::Broadcaster::new(store.clone(), shutdown_rx));
    broadcaster.ensure_started();

    let pdf_engine = pdf::PdfEngine::from_command(&pdf_command);

    // Build HTTP app with the dashboard routes and metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(store, broadcaster, pdf_engine));

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                error!("Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
        })
        .await
        .unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });

    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

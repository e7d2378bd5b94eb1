use crate::broadcast::Broadcaster;
use crate::db::Store;
use crate::errors::Error;
use crate::metrics::{REALTIME_CLIENTS, REPORTS_GENERATED_TOTAL, REPORT_LATENCY_SECONDS};
use crate::pdf::PdfEngine;
use crate::report::{summarize, REPORT_WINDOW_HOURS};
use crate::views;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, warn};

/// Fixed page size of the reading log.
pub const PAGE_SIZE: u32 = 20;

#[derive(Clone)]
struct AppState {
    store: Store,
    broadcaster: Arc<Broadcaster>,
    pdf: PdfEngine,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    page: Option<String>,
}

pub fn create_router(store: Store, broadcaster: Arc<Broadcaster>, pdf: PdfEngine) -> Router {
    let state = AppState {
        store,
        broadcaster,
        pdf,
    };

    Router::new()
        .route("/", get(index))
        .route("/hardware", get(hardware))
        .route("/logs", get(logs))
        .route("/reports", get(reports))
        .route("/generate_report", get(generate_report))
        .route("/ws", get(realtime))
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(views::index())
}

async fn hardware(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let hardwares = state.store.hardwares().await?;
    Ok(Html(views::hardware(&hardwares)))
}

async fn logs(
    State(state): State<AppState>,
    Query(params): Query<LogsQuery>,
) -> Result<Html<String>, AppError> {
    let page = coerce_page(params.page.as_deref());
    let (readings, total) = state.store.page(page, PAGE_SIZE).await?;
    Ok(Html(views::logs(&readings, page, total, PAGE_SIZE)))
}

async fn reports() -> Html<String> {
    Html(views::reports())
}

async fn generate_report(State(state): State<AppState>) -> Result<Response, AppError> {
    let start_instant = Instant::now();
    let end = Utc::now();
    let start = end - Duration::hours(REPORT_WINDOW_HOURS);

    let readings = state.store.range_by_time(start, end).await?;
    let summary = summarize(&readings, end).ok_or(Error::NoReportData)?;

    let html = views::report_document(&summary);
    let pdf = state.pdf.render(&html).await?;

    REPORT_LATENCY_SECONDS.observe(start_instant.elapsed().as_secs_f64());
    REPORTS_GENERATED_TOTAL.inc();
    debug!(
        "Report generated: {} readings, {} incidents, {} bytes of PDF",
        readings.len(),
        summary.incidents_count,
        pdf.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=report.pdf"),
        ],
        pdf,
    )
        .into_response())
}

async fn realtime(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    state.broadcaster.ensure_started();
    let rx = state.broadcaster.subscribe();
    let shutdown = state.broadcaster.shutdown_signal();
    debug!(
        "Realtime client connected ({} active)",
        state.broadcaster.client_count()
    );
    ws.on_upgrade(move |socket| client_session(socket, rx, shutdown))
}

async fn client_session(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<String>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    REALTIME_CLIENTS.inc();
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Realtime client lagged, skipped {} frames", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                // Browsers only ever send a close; anything else is ignored.
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            _ = shutdown.changed() => break,
        }
    }
    REALTIME_CLIENTS.dec();
}

/// Out-of-range and non-numeric page parameters fall back to the first page.
fn coerce_page(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.parse::<u32>().ok())
        .filter(|&p| p >= 1)
        .unwrap_or(1)
}

struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::NoReportData => {
                (StatusCode::NOT_FOUND, "No data available for report").into_response()
            }
            err => {
                error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_coerce_to_one() {
        assert_eq!(coerce_page(None), 1);
        assert_eq!(coerce_page(Some("abc")), 1);
        assert_eq!(coerce_page(Some("0")), 1);
        assert_eq!(coerce_page(Some("-3")), 1);
        assert_eq!(coerce_page(Some("2.5")), 1);
        assert_eq!(coerce_page(Some("")), 1);
        assert_eq!(coerce_page(Some("7")), 7);
    }

    #[test]
    fn missing_report_data_maps_to_not_found() {
        let resp = AppError(Error::NoReportData).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_failures_map_to_internal_error() {
        let resp = AppError(Error::Pdf("converter crashed".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

use crate::scanner::ScanOptions;
use crate::server::{ApiError, AppContext};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tvshelf_common::{Error, ScanId};

const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 500;

pub fn scan_routes() -> Router<AppContext> {
    Router::new()
        .route("/scans", get(list_scans).post(start_scan))
        .route("/scans/:scan_id", get(get_scan))
        .route("/scans/:scan_id/progress", get(get_progress))
        .route("/scans/:scan_id/cancel", post(cancel_scan))
}

pub(crate) fn parse_scan_id(raw: &str) -> Result<ScanId, ApiError> {
    raw.parse::<ScanId>()
        .map_err(|_| Error::invalid_input(format!("Invalid scan id: {}", raw)).into())
}

async fn start_scan(
    State(ctx): State<AppContext>,
    options: Option<Json<ScanOptions>>,
) -> Result<impl IntoResponse, ApiError> {
    let options = options.map(|Json(o)| o).unwrap_or_default();
    let scan_id = ctx.scanner.start_scan(options)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "scan_id": scan_id }))))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

async fn list_scans(
    State(ctx): State<AppContext>,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let scans = ctx.scanner.list_scan_history(limit)?;
    Ok(Json(scans))
}

async fn get_scan(
    State(ctx): State<AppContext>,
    Path(scan_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_scan_id(&scan_id)?;
    let progress = ctx.scanner.get_scan_progress(id);
    let history = ctx.scanner.get_scan_history(id)?;

    if progress.is_none() && history.is_none() {
        return Err(Error::not_found(format!("scan {}", id)).into());
    }
    Ok(Json(json!({
        "progress": progress,
        "history": history,
    })))
}

async fn get_progress(
    State(ctx): State<AppContext>,
    Path(scan_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_scan_id(&scan_id)?;
    ctx.scanner
        .get_scan_progress(id)
        .map(Json)
        .ok_or_else(|| Error::not_found(format!("no running scan {}", id)).into())
}

async fn cancel_scan(
    State(ctx): State<AppContext>,
    Path(scan_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_scan_id(&scan_id)?;
    Ok(Json(json!({ "cancelled": ctx.scanner.cancel_scan(id) })))
}

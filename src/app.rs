#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::codec::PositionalRow;
use crate::config::SheetConfig;
use crate::gateway::{AppendOptions, AppendOutcome, DatasetSyncGateway};
use crate::record::{DatasetSpec, Record, is_valid_dataset_name};

pub struct AppState {
    gateway: Mutex<DatasetSyncGateway>,
}

#[derive(Deserialize)]
struct AppendRequest {
    dataset: String,
    records: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct AppendRowsRequest {
    dataset: String,
    rows: Vec<PositionalRow>,
}

/// Start the static host and append proxy.
///
/// The server does two jobs: serve the front end from `static/`, and accept
/// appends on behalf of browsers that cannot reach the spreadsheet API
/// directly. CORS is wide open on purpose; being reachable from the browser
/// is the whole point of the proxy.
pub async fn run(config: SheetConfig, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    // The gateway's transports use a blocking http client, which must not be
    // created on a runtime worker thread.
    let gateway =
        tokio::task::spawn_blocking(move || DatasetSyncGateway::from_config(config)).await??;

    let app_state = Arc::new(AppState {
        gateway: Mutex::new(gateway),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/append", post(append_records))
        .route("/api/append_rows", post(append_rows))
        .route("/api/records/:dataset", get(get_records))
        .route("/api/pending", get(get_pending))
        .route("/api/flush", post(flush_pending))
        .nest_service("/static", ServeDir::new("static"))
        .layer(cors)
        .with_state(app_state);

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    println!("Listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn append_records(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AppendRequest>,
) -> Response {
    let spec = match DatasetSpec::builtin(&payload.dataset) {
        Some(spec) => spec,
        None => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("Unknown dataset: {}", payload.dataset),
            );
        }
    };

    let records: Vec<Record> = payload.records.iter().map(Record::from_json_map).collect();

    let result = tokio::task::spawn_blocking(move || {
        let mut gateway = state.gateway.lock().unwrap();
        gateway.append_records(&spec, records, &AppendOptions::default())
    })
    .await;

    match result {
        Ok(Ok(outcome)) => outcome_response(outcome),
        Ok(Err(message)) => error_response(StatusCode::BAD_REQUEST, message),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn append_rows(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AppendRowsRequest>,
) -> Response {
    if !is_valid_dataset_name(&payload.dataset) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid dataset name: {}", payload.dataset),
        );
    }

    let result = tokio::task::spawn_blocking(move || {
        let mut gateway = state.gateway.lock().unwrap();
        gateway.append_raw(&payload.dataset, payload.rows)
    })
    .await;

    match result {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_records(State(state): State<Arc<AppState>>, Path(dataset): Path<String>) -> Response {
    let spec = match DatasetSpec::builtin(&dataset) {
        Some(spec) => spec,
        None => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("Unknown dataset: {}", dataset),
            );
        }
    };

    let result = tokio::task::spawn_blocking(move || {
        let mut gateway = state.gateway.lock().unwrap();
        gateway.load_records(&spec)
    })
    .await;

    match result {
        Ok(Ok(records)) => Json(serde_json::json!({
            "status": "ok",
            "records": records,
        }))
        .into_response(),
        Ok(Err(message)) => error_response(StatusCode::BAD_GATEWAY, message),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_pending(State(state): State<Arc<AppState>>) -> Response {
    let gateway = state.gateway.lock().unwrap();
    Json(serde_json::json!({
        "status": "ok",
        "pending": gateway.pending(),
    }))
    .into_response()
}

async fn flush_pending(State(state): State<Arc<AppState>>) -> Response {
    let result = tokio::task::spawn_blocking(move || {
        let mut gateway = state.gateway.lock().unwrap();
        gateway.flush_pending()
    })
    .await;

    match result {
        Ok(outcome) => Json(serde_json::json!({
            "status": "ok",
            "flushed": outcome.flushed,
            "remaining": outcome.remaining,
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn outcome_response(outcome: AppendOutcome) -> Response {
    match outcome {
        AppendOutcome::Appended { rows_appended } => Json(serde_json::json!({
            "status": "ok",
            "rows_appended": rows_appended,
        }))
        .into_response(),
        // Enqueued is a soft outcome: the rows are safe locally and will be
        // retried, so the client gets a 200 and a message, not an error.
        AppendOutcome::Enqueued { rows_enqueued } => Json(serde_json::json!({
            "status": "enqueued",
            "rows_enqueued": rows_enqueued,
            "message": "Saved locally, will retry",
        }))
        .into_response(),
    }
}

fn error_response(code: StatusCode, message: String) -> Response {
    (
        code,
        Json(serde_json::json!({
            "status": "error",
            "message": message,
        })),
    )
        .into_response()
}

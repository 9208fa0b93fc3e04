//! In-process fake of the evacuation backend for integration tests.
//!
//! The fake knows three districts (Srinagar, Ramban, Jammu). Routes to Jammu
//! succeed unless `earthquake` is blocked, in which case the service answers
//! with a structured error. Shelter lookups for Ramban fail with a 500.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

pub const NO_PATH: &str = "No path avoiding blocked districts";

/// Raw query strings received by the fake, per endpoint.
#[derive(Clone, Default)]
pub struct Received {
    pub route: Arc<Mutex<Vec<String>>>,
    pub safehouses: Arc<Mutex<Vec<String>>>,
}

impl Received {
    pub fn route_queries(&self) -> Vec<String> {
        self.route.lock().unwrap().clone()
    }

    pub fn safehouse_queries(&self) -> Vec<String> {
        self.safehouses.lock().unwrap().clone()
    }
}

pub fn router(received: Received) -> Router {
    Router::new()
        .route("/districts", get(districts))
        .route("/route", get(route))
        .route("/safehouses", get(safehouses))
        .with_state(received)
}

/// Bind `router` on an ephemeral port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake backend");
    });
    format!("http://{addr}")
}

/// Start the default fake backend.
pub async fn start() -> (String, Received) {
    let received = Received::default();
    let base_url = serve(router(received.clone())).await;
    (base_url, received)
}

/// A URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

async fn districts() -> Json<serde_json::Value> {
    Json(json!({ "districts": ["Srinagar", "Ramban", "Jammu"] }))
}

async fn route(State(received): State<Received>, RawQuery(query): RawQuery) -> impl IntoResponse {
    let query = query.unwrap_or_default();
    received.route.lock().unwrap().push(query.clone());

    if query.contains("blocked=earthquake") {
        return Json(json!({ "error": NO_PATH }));
    }

    Json(json!({
        "coordinates": [[34.08, 74.8], [33.5, 75.1], [32.73, 74.86]],
        "cost": 262,
        "risk_nodes": 1,
        "route": ["Srinagar", "Ramban", "Jammu"]
    }))
}

#[derive(Debug, Deserialize)]
struct SafehouseParams {
    district: String,
}

async fn safehouses(
    State(received): State<Received>,
    RawQuery(raw): RawQuery,
    Query(params): Query<SafehouseParams>,
) -> impl IntoResponse {
    received
        .safehouses
        .lock()
        .unwrap()
        .push(raw.unwrap_or_default());

    if params.district == "Ramban" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "shelter index offline").into_response();
    }

    Json(json!({
        "safehouses": [
            { "name": "Relief Camp A", "lat": 32.7, "lon": 74.8, "distance_km": 2.1 }
        ]
    }))
    .into_response()
}

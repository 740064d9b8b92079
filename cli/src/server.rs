use std::net::UdpSocket;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        Path, Request, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use nutrisnap_core::models::{MealEntry, normalize_food_key};
use nutrisnap_core::store::RecordStore;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    store: Arc<RecordStore>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct AddMealRequest {
    meal: Option<String>,
    calories: Option<f64>,
}

#[derive(Deserialize)]
struct DeleteMealRequest {
    index: Option<i64>,
}

#[derive(Deserialize)]
struct AddCalEntryRequest {
    key: Option<String>,
    calories: Option<f64>,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

const SUCCESS: SuccessResponse = SuccessResponse { success: true };

#[derive(Serialize)]
struct LookupResponse {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    calories: Option<f64>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    PayloadTooLarge,
    /// Public message plus the underlying cause, which is only logged.
    Internal(&'static str, anyhow::Error),
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self::BadRequest(message.to_string())
    }

    /// Map an unparseable body onto the endpoint's usual 400 message.
    fn rejected(message: &str, rejection: &JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {rejection}");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::bad_request(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large".to_string(),
            ),
            Self::Internal(msg, err) => {
                tracing::error!("{msg}: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    response
}

/// `RequestBodyLimitLayer` answers an oversized `Content-Length` with plain
/// text before any handler runs; rewrite it into the JSON error shape.
async fn json_payload_too_large(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return ApiError::PayloadTooLarge.into_response();
    }
    response
}

// --- Meal handlers ---

async fn get_meals(State(state): State<AppState>) -> Response {
    match state.store.list_meals() {
        Ok(meals) => Json(meals).into_response(),
        Err(err) => {
            tracing::error!("Error loading meals: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Vec::<MealEntry>::new()),
            )
                .into_response()
        }
    }
}

async fn add_meal(
    State(state): State<AppState>,
    payload: Result<Json<AddMealRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::rejected("Invalid meal payload", &e))?;

    let entry = MealEntry::new(req.meal.as_deref().unwrap_or_default(), req.calories)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let name = entry.name.clone();

    state
        .store
        .append_meal(entry)
        .map_err(|e| ApiError::Internal("Failed to add meal", e))?;

    tracing::info!("Added meal: {name}");
    Ok(Json(SUCCESS))
}

async fn delete_meal(
    State(state): State<AppState>,
    payload: Result<Json<DeleteMealRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::rejected("Invalid index", &e))?;

    let index = req
        .index
        .ok_or_else(|| ApiError::bad_request("Index required"))?;
    let index = usize::try_from(index).map_err(|_| ApiError::bad_request("Invalid index"))?;

    let removed = state
        .store
        .remove_meal_at(index)
        .map_err(|e| ApiError::Internal("Failed to delete meal", e))?;

    match removed {
        Some(entry) => {
            tracing::info!("Deleted meal: {}", entry.name);
            Ok(Json(SUCCESS))
        }
        None => Err(ApiError::bad_request("Invalid index")),
    }
}

async fn clear_meals(State(state): State<AppState>) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .store
        .clear_meals()
        .map_err(|e| ApiError::Internal("Failed to clear meals", e))?;
    tracing::info!("Cleared all meals");
    Ok(Json(SUCCESS))
}

// --- Calorie database handlers ---

async fn lookup_calories(
    State(state): State<AppState>,
    meal: Result<Path<String>, PathRejection>,
) -> Json<LookupResponse> {
    let calories = match meal {
        Ok(Path(meal)) => state.store.lookup_calories(&meal),
        Err(rejection) => {
            tracing::debug!("Rejected lookup path: {rejection}");
            None
        }
    };
    Json(LookupResponse {
        found: calories.is_some(),
        calories,
    })
}

async fn add_cal_entry(
    State(state): State<AppState>,
    payload: Result<Json<AddCalEntryRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::rejected("Invalid input", &e))?;

    let (Some(key), Some(calories)) = (req.key, req.calories) else {
        return Err(ApiError::bad_request("Invalid input"));
    };
    normalize_food_key(&key).map_err(|_| ApiError::bad_request("Invalid input"))?;

    let stored = state
        .store
        .set_calories(&key, calories)
        .map_err(|e| ApiError::Internal("Failed to save calorie entry", e))?;

    tracing::info!("Added calorie entry: {stored} = {calories} kcal");
    Ok(Json(SUCCESS))
}

// --- Startup banner helpers ---

/// Detect the machine's local network IP address.
///
/// Uses the UDP socket trick: create a UDP socket and "connect" to a public IP
/// (no actual traffic is sent), then read back the local address the OS chose.
fn detect_local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    let ip = addr.ip();
    if ip.is_loopback() {
        None
    } else {
        Some(ip.to_string())
    }
}

/// The URL other devices on the network should use.
fn network_url(bind: &str, port: u16) -> String {
    let host = if bind == "0.0.0.0" {
        detect_local_ip().unwrap_or_else(|| "localhost".to_string())
    } else {
        bind.to_string()
    };
    format!("http://{host}:{port}")
}

/// Render a compact QR code using Unicode half-block characters.
///
/// Each character encodes two vertical modules, halving the output height.
fn render_qr_code(data: &str) -> Option<Vec<String>> {
    use qrcode::QrCode;

    let code = match QrCode::new(data.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to generate QR code: {e}");
            return None;
        }
    };

    let width = code.width();
    let colors: Vec<bool> = code
        .into_colors()
        .into_iter()
        .map(|c| c == qrcode::Color::Dark)
        .collect();

    // 1-module quiet zone on each side
    let quiet = 1;
    let total = width + 2 * quiet;

    let is_dark = |row: usize, col: usize| -> bool {
        if row < quiet || row >= quiet + width || col < quiet || col >= quiet + width {
            return false;
        }
        colors[(row - quiet) * width + (col - quiet)]
    };

    let lines: Vec<String> = (0..total)
        .step_by(2)
        .map(|row| {
            (0..total)
                .map(|col| match (is_dark(row, col), is_dark(row + 1, col)) {
                    (true, true) => '\u{2588}',  // █
                    (true, false) => '\u{2580}', // ▀
                    (false, true) => '\u{2584}', // ▄
                    (false, false) => ' ',
                })
                .collect::<String>()
        })
        .collect();
    Some(lines)
}

fn print_banner(bind: &str, port: u16) {
    let network = network_url(bind, port);

    eprintln!();
    eprintln!("NutriSnap is running");
    eprintln!("---------------------------------");
    eprintln!("  Local:   http://localhost:{port}");
    eprintln!("  Network: {network}");
    eprintln!();
    eprintln!("Open the Network URL on your phone (same Wi-Fi):");

    if let Some(lines) = render_qr_code(&network) {
        eprintln!();
        for line in lines {
            eprintln!("{line}");
        }
        eprintln!();
    }
}

// --- Router builder ---

pub struct ServerOptions {
    pub port: u16,
    pub bind: String,
    pub public_dir: PathBuf,
}

fn build_router(state: AppState, public_dir: &FsPath) -> Router {
    Router::new()
        .route("/getMeals", get(get_meals))
        .route("/addMeal", post(add_meal))
        .route("/deleteMeal", delete(delete_meal))
        .route("/clearMeals", delete(clear_meals))
        .route("/lookupCalories/{meal}", get(lookup_calories))
        .route("/addCalEntry", post(add_cal_entry))
        // `/` resolves to index.html inside the public directory
        .fallback_service(ServeDir::new(public_dir))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(json_payload_too_large))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(store: RecordStore, options: ServerOptions) -> anyhow::Result<()> {
    let state = AppState {
        store: Arc::new(store),
    };

    if !options.public_dir.is_dir() {
        tracing::warn!(
            "Public directory {} not found; the web UI will not be served",
            options.public_dir.display()
        );
    }

    let app = build_router(state, &options.public_dir);

    let addr = format!("{}:{}", options.bind, options.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Listening on http://{addr}");
    print_banner(&options.bind, options.port);

    axum::serve(listener, app).await?;
    Ok(())
}

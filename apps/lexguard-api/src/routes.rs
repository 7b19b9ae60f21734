use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;
use lexguard_domain::classify::DomainLabel;
use lexguard_service::{
	CategorySearchRequest, CategorySearchResponse, DocumentRequest, Error as ServiceError,
	LookupRequest, LookupResponse, SearchRequest, TelemetrySnapshot,
};

const DEFAULT_MAX_DOMAINS: usize = 3;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/search/category", post(search_category))
		.route("/v1/lookup", post(lookup))
		.route("/v1/document/analyze", post(analyze_document))
		.route("/v1/classify", post(classify))
		.route("/v1/telemetry", get(telemetry))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
	pub text: String,
	#[serde(default)]
	pub max_domains: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
	pub domains: Vec<DomainLabel>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

/// The bundle is degraded to fit the response byte ceiling before it leaves the service.
async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<Value>, ApiError> {
	let bundle = state.service.search(payload).await?;
	let budgeted = state.service.budgeter().fit_serialize(&bundle)?;

	tracing::debug!(
		trace_id = %bundle.trace_id,
		bytes = budgeted.bytes,
		stage = ?budgeted.stage,
		"Search response budgeted."
	);

	Ok(Json(budgeted.payload))
}

async fn search_category(
	State(state): State<AppState>,
	Json(payload): Json<CategorySearchRequest>,
) -> Result<Json<CategorySearchResponse>, ApiError> {
	let response = state.service.search_category(payload).await?;

	Ok(Json(response))
}

async fn lookup(
	State(state): State<AppState>,
	Json(payload): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, ApiError> {
	let response = state.service.lookup(payload).await?;

	Ok(Json(response))
}

async fn analyze_document(
	State(state): State<AppState>,
	Json(payload): Json<DocumentRequest>,
) -> Result<Json<Value>, ApiError> {
	let report = state.service.analyze_document(payload).await?;
	let budgeted = state.service.budgeter().fit_serialize(&report)?;

	tracing::debug!(
		trace_id = %report.trace_id,
		bytes = budgeted.bytes,
		stage = ?budgeted.stage,
		"Document response budgeted."
	);

	Ok(Json(budgeted.payload))
}

async fn classify(
	State(state): State<AppState>,
	Json(payload): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
	if payload.text.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"text must not be empty.",
		));
	}

	let max_domains = payload.max_domains.unwrap_or(DEFAULT_MAX_DOMAINS).max(1);
	let domains = state.service.classify(&payload.text, max_domains);

	Ok(Json(ClassifyResponse { domains }))
}

async fn telemetry(State(state): State<AppState>) -> Json<TelemetrySnapshot> {
	Json(state.service.telemetry())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			ServiceError::BudgetExceeded { bytes, max_bytes } => json_error(
				StatusCode::INTERNAL_SERVER_ERROR,
				"BUDGET_EXCEEDED",
				format!("Response of {bytes} bytes cannot fit within {max_bytes} bytes."),
			),
			ServiceError::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message),
			ServiceError::Lexicon { message } | ServiceError::Serialization { message } => {
				tracing::error!(error = %message, "Request failed inside the service.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

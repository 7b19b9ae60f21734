use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use lexguard_api::{routes, state::AppState};
use lexguard_service::{LexguardService, Providers};
use lexguard_testkit::{Reply, ScriptedProvider, precedent, precedents_about, test_config};

fn app(provider: Arc<ScriptedProvider>) -> Router {
	let service = LexguardService::new(test_config(), Providers::uniform(provider))
		.expect("Failed to build service.");

	routes::router(AppState::from_service(service))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(body.to_string()))
		.expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");

	serde_json::from_slice(&bytes).expect("Failed to parse response JSON.")
}

#[tokio::test]
async fn health_ok() {
	let response = app(Arc::new(ScriptedProvider::new(Reply::empty())))
		.oneshot(
			Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_returns_a_bundle() {
	let provider = Arc::new(ScriptedProvider::new(Reply::hits(
		5,
		precedents_about("프리랜서 근로자성", 5, 5),
	)));
	let response = app(provider)
		.oneshot(post_json(
			"/v1/search",
			json!({ "query": "프리랜서 근로자성", "categories": ["precedent"] }),
		))
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["results"]["precedent"].as_array().map(Vec::len), Some(5));
	assert_eq!(json["missing_reason"], Value::Null);
	assert_eq!(json["attempts"][0]["step"], "A");
	assert!(json["display_text"].as_str().is_some_and(|text| text.starts_with("법적 근거 요약")));
}

#[tokio::test]
async fn search_reports_provider_format_errors() {
	let response = app(Arc::new(ScriptedProvider::new(Reply::html())))
		.oneshot(post_json(
			"/v1/search",
			json!({ "query": "부당해고 구제", "categories": ["precedent"] }),
		))
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["missing_reason"], "ProviderFormatError");
	assert_eq!(json["sources_count"], 0);
}

#[tokio::test]
async fn invalid_dates_are_a_bad_request() {
	let response = app(Arc::new(ScriptedProvider::new(Reply::empty())))
		.oneshot(post_json(
			"/v1/search",
			json!({ "query": "부당해고", "categories": ["precedent"], "date_from": "2020" }),
		))
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = json_body(response).await;

	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn category_search_runs_the_adaptive_loop() {
	let provider = Arc::new(
		ScriptedProvider::new(Reply::empty())
			.then(Reply::empty())
			.then(Reply::hits(12, precedents_about("프리랜서 근로자성", 5, 10))),
	);
	let response = app(provider.clone())
		.oneshot(post_json(
			"/v1/search/category",
			json!({ "category": "precedent", "query": "프리랜서 근로자성" }),
		))
		.await
		.expect("Failed to call /v1/search/category.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["strategies_applied"], json!(["expand_date_range"]));
	assert_eq!(json["verdict"], "GOOD");
	assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn lookup_resolves_a_case_number() {
	let provider = Arc::new(
		ScriptedProvider::new(Reply::empty())
			.then(Reply::hits(2, precedents_about("부당해고", 2, 2)))
			.then(Reply::hits(1, vec![precedent(100_001, "부당해고 사건", "해고의 정당한 이유")])),
	);
	let response = app(provider.clone())
		.oneshot(post_json("/v1/lookup", json!({ "case_number": "2020다100001" })))
		.await
		.expect("Failed to call /v1/lookup.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["category"], "precedent");
	assert_eq!(json["key"], json!({ "by": "id", "value": "100001" }));
	assert_eq!(json["result"]["case_number"], "2020다100001");
	assert_eq!(json["missing_reason"], Value::Null);
	assert_eq!(provider.details().len(), 1);
}

#[tokio::test]
async fn lookup_rejects_two_keys() {
	let response = app(Arc::new(ScriptedProvider::new(Reply::empty())))
		.oneshot(post_json("/v1/lookup", json!({ "id": "1", "name": "민법" })))
		.await
		.expect("Failed to call /v1/lookup.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(json_body(response).await["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn document_review_flags_clauses_without_a_basis() {
	let text = "주택 임대차 계약서\n\
		제1조 임대인은 보증금 반환을 사정에 따라 지연할 수 있다.\n\
		제2조 임대인은 임차인이 내부 기준을 어길 경우 즉시 해지할 수 있다.";
	let response = app(Arc::new(ScriptedProvider::new(Reply::empty())))
		.oneshot(post_json("/v1/document/analyze", json!({ "text": text })))
		.await
		.expect("Failed to call /v1/document/analyze.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;
	let findings = json["findings"].as_array().cloned().unwrap_or_default();

	assert_eq!(json["detected"], true);
	assert_eq!(json["analysis"]["kind"], "임대차 계약");
	assert_eq!(findings.len(), 2);
	assert!(findings.iter().all(|finding| finding["risk_level"] == "medium"));
	assert_eq!(json["has_legal_basis"], false);
	assert_eq!(json["missing_reason"], "NoMatch");
}

#[tokio::test]
async fn classify_labels_domains() {
	let response = app(Arc::new(ScriptedProvider::new(Reply::empty())))
		.oneshot(post_json("/v1/classify", json!({ "text": "부당해고 구제신청" })))
		.await
		.expect("Failed to call /v1/classify.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["domains"][0]["domain"], "부당해고");
}

#[tokio::test]
async fn classify_rejects_blank_text() {
	let response = app(Arc::new(ScriptedProvider::new(Reply::empty())))
		.oneshot(post_json("/v1/classify", json!({ "text": "  " })))
		.await
		.expect("Failed to call /v1/classify.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn telemetry_reflects_searches() {
	let service = LexguardService::new(
		test_config(),
		Providers::uniform(Arc::new(ScriptedProvider::new(Reply::empty()))),
	)
	.expect("Failed to build service.");
	let router = routes::router(AppState::from_service(service));
	let response = router
		.clone()
		.oneshot(post_json("/v1/search", json!({ "query": "법" })))
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::OK);

	let response = router
		.oneshot(
			Request::builder()
				.uri("/v1/telemetry")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/telemetry.");
	let json = json_body(response).await;

	assert_eq!(json["stats"]["total_searches"], 1);
	assert_eq!(json["stats"]["empty_searches"], 1);
}

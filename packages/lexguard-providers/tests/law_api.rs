use std::time::Duration;

use axum::{Router, extract::Query, routing::get};
use serde_json::json;
use tokio::net::TcpListener;

use lexguard_domain::{
	category::Category,
	result::{DetailKey, DetailRequest, ProviderFilters, ProviderRequest, RawRecord},
};
use lexguard_providers::{Error, ErrorKind, LawApiClient, SearchProvider};

async fn spawn_server(router: Router) -> String {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind mock server.");
	let addr = listener.local_addr().expect("Failed to read mock server address.");

	tokio::spawn(async move {
		let _ = axum::serve(listener, router).await;
	});

	format!("http://{addr}")
}

fn provider_config(api_base: String, api_key: Option<&str>) -> lexguard_config::Provider {
	lexguard_config::Provider {
		api_base,
		api_key: api_key.map(str::to_string),
		timeout_ms: 500,
		bulk_timeout_ms: 1_000,
		..Default::default()
	}
}

fn request(category: Category, query: &str) -> ProviderRequest {
	ProviderRequest {
		category,
		query: query.to_string(),
		page: 1,
		per_page: 10,
		filters: ProviderFilters::default(),
		bulk: false,
	}
}

#[tokio::test]
async fn sends_credentials_and_parses_precedents() {
	let router = Router::new().route(
		"/DRF/lawSearch.do",
		get(|Query(params): Query<Vec<(String, String)>>| async move {
			let has = |key: &str, value: &str| params.iter().any(|(k, v)| k == key && v == value);

			if !has("OC", "test-key") || !has("target", "prec") || !has("type", "JSON") {
				return axum::Json(json!({ "PrecSearch": { "totalCnt": "0" } }));
			}

			axum::Json(json!({
				"PrecSearch": {
					"totalCnt": "1",
					"prec": { "판례일련번호": "228541", "사건명": "근로자지위확인" }
				}
			}))
		}),
	);
	let base = spawn_server(router).await;
	let client = LawApiClient::new(provider_config(base, Some("test-key")))
		.expect("Failed to build client.");
	let raw = client
		.search(&request(Category::Precedent, "근로자성"))
		.await
		.expect("Search should succeed.");

	assert_eq!(raw.total, 1);
	assert!(matches!(raw.records.as_slice(), [RawRecord::Precedent(_)]));
	assert!(raw.url.as_deref().is_some_and(|url| !url.contains("test-key")));
}

#[tokio::test]
async fn article_detail_uses_the_service_endpoint() {
	let router = Router::new().route(
		"/DRF/lawService.do",
		get(|Query(params): Query<Vec<(String, String)>>| async move {
			let has = |key: &str, value: &str| params.iter().any(|(k, v)| k == key && v == value);

			if !has("OC", "test-key") || !has("LM", "근로기준법") || !has("JO", "000200") {
				return axum::Json(json!({ "Law": "일치하는 법령이 없습니다." }));
			}

			axum::Json(json!({
				"법령": {
					"기본정보": { "법령ID": "001872", "법령명_한글": "근로기준법" },
					"조문": {
						"조문단위": { "조문번호": "2", "조문내용": "제2조(정의) ① 이 법에서 사용하는 용어의 뜻은 다음과 같다." }
					}
				}
			}))
		}),
	);
	let base = spawn_server(router).await;
	let client = LawApiClient::new(provider_config(base, Some("test-key")))
		.expect("Failed to build client.");
	let provider: &dyn SearchProvider = &client;
	let raw = provider
		.detail(&DetailRequest {
			category: Category::Law,
			key: DetailKey::Name("근로기준법".to_string()),
			article: Some("000200".to_string()),
		})
		.await
		.expect("Detail should succeed.");

	assert_eq!(raw.total, 1);
	assert!(matches!(raw.records.as_slice(), [RawRecord::Law(_)]));
	assert!(raw.url.as_deref().is_some_and(|url| url.contains("lawService.do") && !url.contains("test-key")));
}

#[tokio::test]
async fn maintenance_pages_are_format_errors() {
	let router = Router::new().route(
		"/DRF/lawSearch.do",
		get(|| async { axum::response::Html("<html><body>시스템 점검 중입니다.</body></html>") }),
	);
	let base = spawn_server(router).await;
	let client = LawApiClient::new(provider_config(base, Some("test-key")))
		.expect("Failed to build client.");
	let err = client
		.search(&request(Category::Law, "형법"))
		.await
		.expect_err("HTML must be rejected.");

	assert_eq!(err.kind(), ErrorKind::Format);
	assert!(err.is_cacheable());
}

#[tokio::test]
async fn slow_upstream_times_out() {
	let router = Router::new().route(
		"/DRF/lawSearch.do",
		get(|| async {
			tokio::time::sleep(Duration::from_secs(3)).await;

			axum::Json(json!({}))
		}),
	);
	let base = spawn_server(router).await;
	let client = LawApiClient::new(provider_config(base, Some("test-key")))
		.expect("Failed to build client.");
	let err = client
		.search(&request(Category::Law, "형법"))
		.await
		.expect_err("The call must time out.");

	assert_eq!(err, Error::Timeout { timeout_ms: 500 });
}

#[tokio::test]
async fn missing_key_never_reaches_the_network() {
	let client = LawApiClient::new(provider_config("http://127.0.0.1:9".to_string(), None))
		.expect("Failed to build client.");
	let provider: &dyn SearchProvider = &client;
	let err = provider
		.search(&request(Category::Law, "형법"))
		.await
		.expect_err("Search without a key must fail.");

	assert_eq!(err, Error::NotConfigured);
	assert!(!err.is_cacheable());
	assert!(!client.is_configured());
}

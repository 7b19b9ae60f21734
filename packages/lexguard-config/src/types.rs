use std::path::PathBuf;

use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub service: Service,
	pub provider: Provider,
	pub cache: Cache,
	pub search: Search,
	pub quality: Quality,
	pub response: Response,
	pub telemetry: Telemetry,
	pub lexicon: Lexicon,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { http_bind: "127.0.0.1:8099".to_string(), log_level: "info".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Provider {
	pub api_base: String,
	pub search_path: String,
	/// Full-document endpoint used for statute articles and single decisions.
	pub detail_path: String,
	/// Optional. An empty or missing key leaves the provider unconfigured.
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	/// Applied to listing requests that carry no query text.
	pub bulk_timeout_ms: u64,
}
impl Default for Provider {
	fn default() -> Self {
		Self {
			api_base: "https://www.law.go.kr".to_string(),
			search_path: "/DRF/lawSearch.do".to_string(),
			detail_path: "/DRF/lawService.do".to_string(),
			api_key: None,
			timeout_ms: 10_000,
			bulk_timeout_ms: 30_000,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub positive_capacity: u64,
	pub positive_ttl_secs: u64,
	pub negative_capacity: u64,
	pub negative_ttl_secs: u64,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			positive_capacity: 200,
			positive_ttl_secs: 30 * 60,
			negative_capacity: 200,
			negative_ttl_secs: 5 * 60,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub max_results_per_category: u32,
	pub max_attempts: u32,
	/// Planner variants tried in stage B before the window is widened.
	pub variant_attempts: u32,
	pub max_concurrent_categories: usize,
	pub max_categories: usize,
	pub default_window_years: i32,
	pub widened_window_years: i32,
	pub max_synonym_variants: usize,
	pub max_evidence: usize,
	pub max_citations: usize,
	pub rerank_mode: RerankMode,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			max_results_per_category: 10,
			max_attempts: 5,
			variant_attempts: 1,
			max_concurrent_categories: 3,
			max_categories: 3,
			default_window_years: 5,
			widened_window_years: 10,
			max_synonym_variants: 3,
			max_evidence: 5,
			max_citations: 10,
			rerank_mode: RerankMode::Hybrid,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RerankMode {
	Keyword,
	Bm25,
	#[default]
	Hybrid,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Quality {
	pub min_total: u64,
	pub max_total: u64,
	pub sample_size: usize,
	pub excellent_ratio: f32,
	pub good_ratio: f32,
	pub domain_confidence: f32,
}
impl Default for Quality {
	fn default() -> Self {
		Self {
			min_total: 3,
			max_total: 100,
			sample_size: 10,
			excellent_ratio: 0.7,
			good_ratio: 0.4,
			domain_confidence: 0.3,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Response {
	pub max_bytes: usize,
	pub reserve_bytes: usize,
}
impl Default for Response {
	fn default() -> Self {
		Self { max_bytes: 24_000, reserve_bytes: 500 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Telemetry {
	pub capacity: usize,
}
impl Default for Telemetry {
	fn default() -> Self {
		Self { capacity: 100 }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Lexicon {
	/// Optional. Replaces the embedded lexicon when set.
	pub path: Option<PathBuf>,
}

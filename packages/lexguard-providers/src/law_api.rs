//! Client for the law.go.kr DRF open API.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::{Map, Value};

use crate::{BoxFuture, Error, Result, SearchProvider};
use lexguard_domain::{
	category::Category,
	result::{DetailKey, DetailRequest, ProviderRequest, RawRecord, RawResult},
};

/// Committee name → DRF target.
pub const COMMITTEE_TARGETS: [(&str, &str); 11] = [
	("개인정보보호위원회", "ppc"),
	("금융위원회", "fsc"),
	("노동위원회", "nlrc"),
	("고용보험심사위원회", "eiac"),
	("국민권익위원회", "acr"),
	("방송미디어통신위원회", "kcc"),
	("산업재해보상보험재심사위원회", "iaciac"),
	("중앙토지수용위원회", "oclt"),
	("중앙환경분쟁조정위원회", "ecc"),
	("증권선물위원회", "sfc"),
	("국가인권위원회", "nhrck"),
];

/// Special tribunal name → DRF target.
pub const TRIBUNAL_TARGETS: [(&str, &str); 4] = [
	("조세심판원", "ttSpecialDecc"),
	("해양안전심판원", "kmstSpecialDecc"),
	("국민권익위원회", "acrSpecialDecc"),
	("인사혁신처 소청심사위원회", "adapSpecialDecc"),
];

const BULK_QUERY: &str = "*";
const COMMITTEE_LIST_KEYS: [&str; 4] = ["dec", "decision", "decisions", "data"];
const TOTAL_KEYS: [&str; 3] = ["totalCnt", "total", "count"];
const LAW_DETAIL_ROOT: &str = "법령";
const DETAIL_ROOT_SUFFIX: &str = "Service";
const ARTICLE_TEXT_KEY: &str = "조문내용";

pub struct LawApiClient {
	cfg: lexguard_config::Provider,
	client: Client,
}
impl LawApiClient {
	pub fn new(cfg: lexguard_config::Provider) -> Result<Self> {
		let client = Client::builder()
			.build()
			.map_err(|err| Error::Transport { message: err.to_string() })?;

		Ok(Self { cfg, client })
	}

	pub fn is_configured(&self) -> bool {
		self.cfg.api_key.is_some()
	}

	pub async fn search(&self, request: &ProviderRequest) -> Result<RawResult> {
		let params = search_params(request)?;
		let timeout_ms = if is_bulk(request) { self.cfg.bulk_timeout_ms } else { self.cfg.timeout_ms };
		let (body, public_url) = self.get(&self.cfg.search_path, &params, timeout_ms).await?;

		tracing::debug!(
			category = %request.category,
			query = %request.query,
			bytes = body.len(),
			"Provider responded."
		);

		parse_search_response(request, &body, &public_url)
	}

	pub async fn detail(&self, request: &DetailRequest) -> Result<RawResult> {
		let params = detail_params(request)?;
		let (body, public_url) = self.get(&self.cfg.detail_path, &params, self.cfg.timeout_ms).await?;

		tracing::debug!(
			category = %request.category,
			key = request.key.value(),
			article = request.article.as_deref().unwrap_or_default(),
			bytes = body.len(),
			"Provider detail responded."
		);

		parse_detail_response(request, &body, &public_url)
	}

	/// Returns the body and the request URL without the credential.
	async fn get(
		&self,
		path: &str,
		params: &[(&'static str, String)],
		timeout_ms: u64,
	) -> Result<(String, String)> {
		let Some(api_key) = self.cfg.api_key.as_deref() else {
			return Err(Error::NotConfigured);
		};
		let endpoint = format!("{}{}", self.cfg.api_base, path);
		let public_url = Url::parse_with_params(&endpoint, params)
			.map(|url| url.to_string())
			.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;
		let res = self
			.client
			.get(&endpoint)
			.query(params)
			.query(&[("OC", api_key)])
			.timeout(Duration::from_millis(timeout_ms))
			.send()
			.await
			.map_err(|err| map_reqwest_error(err, timeout_ms))?;
		let res = res.error_for_status().map_err(|err| map_reqwest_error(err, timeout_ms))?;
		let body = res.text().await.map_err(|err| map_reqwest_error(err, timeout_ms))?;

		Ok((body, public_url))
	}
}

impl SearchProvider for LawApiClient {
	fn search<'a>(&'a self, request: &'a ProviderRequest) -> BoxFuture<'a, Result<RawResult>> {
		Box::pin(LawApiClient::search(self, request))
	}

	fn detail<'a>(&'a self, request: &'a DetailRequest) -> BoxFuture<'a, Result<RawResult>> {
		Box::pin(LawApiClient::detail(self, request))
	}
}

/// The DRF target a request resolves to.
pub fn target_for(request: &ProviderRequest) -> Result<&'static str> {
	let target = match request.category {
		Category::CommitteeDecision => {
			let Some(name) = request.filters.committee.as_deref() else {
				return Err(Error::InvalidRequest {
					message: "Committee decisions require a committee name.".to_string(),
				});
			};

			lookup(&COMMITTEE_TARGETS, name).ok_or_else(|| Error::InvalidRequest {
				message: format!("Unsupported committee {name:?}."),
			})?
		},
		Category::SpecialTribunal => {
			let Some(name) = request.filters.tribunal.as_deref() else {
				return Err(Error::InvalidRequest {
					message: "Special tribunal decisions require a tribunal name.".to_string(),
				});
			};

			lookup(&TRIBUNAL_TARGETS, name).ok_or_else(|| Error::InvalidRequest {
				message: format!("Unsupported tribunal {name:?}."),
			})?
		},
		category => return detail_target(category),
	};

	Ok(target)
}

/// The `lawService.do` target; committee and tribunal documents have no detail endpoint here.
pub fn detail_target(category: Category) -> Result<&'static str> {
	document_target(category).ok_or_else(|| Error::InvalidRequest {
		message: format!("Detail lookup is not available for {category}."),
	})
}

/// Detail parameters without credentials. Names and articles are statute-only.
pub fn detail_params(request: &DetailRequest) -> Result<Vec<(&'static str, String)>> {
	let target = detail_target(request.category)?;
	let value = request.key.value().trim();

	if value.is_empty() {
		return Err(Error::InvalidRequest { message: "Detail key must be non-empty.".to_string() });
	}

	let key = match (&request.key, request.category) {
		(DetailKey::Id(_), _) => "ID",
		(DetailKey::Name(_), Category::Law) => "LM",
		(DetailKey::Name(_), category) =>
			return Err(Error::InvalidRequest {
				message: format!("{category} documents cannot be looked up by name."),
			}),
	};
	let mut params =
		vec![("target", target.to_string()), ("type", "JSON".to_string()), (key, value.to_string())];

	if let Some(article) = request.article.as_deref() {
		if request.category != Category::Law {
			return Err(Error::InvalidRequest {
				message: "Only statutes can be narrowed to an article.".to_string(),
			});
		}
		if article.len() != 6 || !article.bytes().all(|b| b.is_ascii_digit()) {
			return Err(Error::InvalidRequest {
				message: format!("Article code {article:?} must be six digits."),
			});
		}

		params.push(("JO", article.to_string()));
	}

	Ok(params)
}

/// The date range parameter for categories the API can filter by decision date.
pub fn date_param(category: Category) -> Option<&'static str> {
	match category {
		Category::Precedent => Some("prncYd"),
		Category::AdministrativeAppeal => Some("deccYd"),
		Category::ConstitutionalDecision => Some("detcYd"),
		_ => None,
	}
}

/// Query parameters without credentials.
pub fn search_params(request: &ProviderRequest) -> Result<Vec<(&'static str, String)>> {
	if request.per_page == 0 {
		return Err(Error::InvalidRequest { message: "per_page must be greater than zero.".to_string() });
	}

	let target = target_for(request)?;
	let query = if is_bulk(request) {
		BULK_QUERY.to_string()
	} else {
		request.query.split_whitespace().collect::<Vec<_>>().join(" ")
	};
	let mut params = vec![
		("target", target.to_string()),
		("type", "JSON".to_string()),
		("query", query),
		("page", request.page.max(1).to_string()),
		("display", request.per_page.to_string()),
	];
	let filters = &request.filters;

	if let Some(name) = date_param(request.category) {
		let range = match (filters.date_from.as_deref(), filters.date_to.as_deref()) {
			(Some(from), Some(to)) => Some(format!("{from}~{to}")),
			(Some(from), None) => Some(format!("{from}~{from}")),
			(None, Some(to)) => Some(format!("{to}~{to}")),
			(None, None) => None,
		};

		if let Some(range) = range {
			params.push((name, range));
		}
	}
	if request.category == Category::Precedent
		&& let Some(court) = filters.court.as_deref().filter(|court| !court.trim().is_empty())
	{
		params.push(("org", court.trim().to_string()));
	}

	Ok(params)
}

/// Parses one search page, keeping at most `per_page` records.
pub fn parse_search_response(
	request: &ProviderRequest,
	body: &str,
	url: &str,
) -> Result<RawResult> {
	let category = request.category;
	let top = json_object(body, url)?;
	// Committee payloads differ per committee and are only known by their generic list keys.
	let list_key = match category {
		Category::CommitteeDecision => None,
		_ => target_for(request).ok(),
	};
	let root = list_key
		.map(root_key)
		.and_then(|key| top.get(&key))
		.and_then(Value::as_object)
		.unwrap_or(&top);
	let total = TOTAL_KEYS.iter().find_map(|key| root.get(*key)).and_then(as_total).unwrap_or(0);
	let items = match list_key {
		Some(key) => root.get(key),
		None => COMMITTEE_LIST_KEYS.iter().find_map(|key| root.get(*key)),
	};
	let records = into_list(items)
		.into_iter()
		.filter_map(|item| match item {
			Value::Object(fields) => Some(RawRecord::for_category(category, fields)),
			_ => None,
		})
		.take(request.per_page as usize)
		.collect();

	Ok(RawResult { category, total, records, url: Some(url.to_string()) })
}

/// Parses a detail answer into at most one record.
///
/// Statutes arrive as `{"법령": {"기본정보": {..}, "조문": {"조문단위": [..]}}}` and are flattened
/// into one record whose `조문내용` holds the article text with its paragraphs and items. Other
/// categories arrive under a `*Service` root. A root that is missing or not an object (the API
/// answers a miss with a bare message) yields an empty result.
pub fn parse_detail_response(request: &DetailRequest, body: &str, url: &str) -> Result<RawResult> {
	let category = request.category;
	let top = json_object(body, url)?;
	let root = top.get(LAW_DETAIL_ROOT).or_else(|| {
		top.iter().find(|(key, _)| key.ends_with(DETAIL_ROOT_SUFFIX)).map(|(_, value)| value)
	});
	let Some(Value::Object(root)) = root else {
		return Ok(RawResult { category, total: 0, records: Vec::new(), url: Some(url.to_string()) });
	};
	let mut fields = match root.get("기본정보") {
		Some(Value::Object(basics)) => basics.clone(),
		_ => root.clone(),
	};

	if let Some(articles) = root.get("조문") {
		let text = article_text(articles, request.article.as_deref());

		if !text.is_empty() {
			fields.insert(ARTICLE_TEXT_KEY.to_string(), Value::String(text));
		}
	}
	if let DetailKey::Id(id) = &request.key {
		fields.entry("id").or_insert_with(|| Value::String(id.clone()));
	}

	Ok(RawResult {
		category,
		total: 1,
		records: vec![RawRecord::for_category(category, fields)],
		url: Some(url.to_string()),
	})
}

/// Article, paragraph, item and sub-item text in document order. With an article code only the
/// matching units are kept, unless none match.
fn article_text(articles: &Value, article: Option<&str>) -> String {
	let units = match articles {
		Value::Object(fields) => into_list(fields.get("조문단위")),
		Value::Array(_) => into_list(Some(articles)),
		_ => Vec::new(),
	};
	let wanted = article.and_then(|code| code.get(..4)).and_then(|raw| raw.parse::<u32>().ok());
	let matching: Vec<&Value> = units
		.iter()
		.filter(|unit| wanted.is_some_and(|number| unit_number(unit) == Some(number)))
		.filter(|unit| unit.get("조문여부").and_then(Value::as_str) != Some("전문"))
		.collect();
	let selected: Vec<&Value> =
		if matching.is_empty() { units.iter().collect() } else { matching };
	let mut lines = Vec::new();

	for unit in selected {
		collect_text(unit, &["조문내용", "항", "항내용", "호", "호내용", "목", "목내용"], &mut lines);
	}

	lines.join("\n")
}

fn unit_number(unit: &Value) -> Option<u32> {
	match unit.get("조문번호")? {
		Value::String(raw) => raw.trim().parse().ok(),
		Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
		_ => None,
	}
}

/// Walks `keys` in order: strings are collected, nested lists and objects are descended.
fn collect_text(value: &Value, keys: &[&str], lines: &mut Vec<String>) {
	match value {
		Value::Array(items) =>
			for item in items {
				collect_text(item, keys, lines);
			},
		Value::Object(fields) =>
			for key in keys {
				match fields.get(*key) {
					Some(Value::String(text)) if !text.trim().is_empty() =>
						lines.push(text.trim().to_string()),
					Some(nested @ (Value::Array(_) | Value::Object(_))) =>
						collect_text(nested, keys, lines),
					_ => {},
				}
			},
		_ => {},
	}
}

/// Rejects HTML and non-object bodies before any field is read.
fn json_object(body: &str, url: &str) -> Result<Map<String, Value>> {
	let trimmed = body.trim();

	if trimmed.starts_with("<!DOCTYPE") || trimmed.to_lowercase().contains("<html") {
		return Err(Error::HtmlResponse { url: url.to_string() });
	}
	if trimmed.is_empty() {
		return Err(Error::InvalidJson { message: "Empty response body.".to_string() });
	}

	match serde_json::from_str(trimmed) {
		Ok(Value::Object(top)) => Ok(top),
		Ok(_) => Err(Error::InvalidJson { message: "Response root is not an object.".to_string() }),
		Err(err) => Err(Error::InvalidJson { message: err.to_string() }),
	}
}

/// Targets shared by search and detail; committees and tribunals resolve by name instead.
fn document_target(category: Category) -> Option<&'static str> {
	match category {
		Category::Law => Some("law"),
		Category::Precedent => Some("prec"),
		Category::Interpretation => Some("expc"),
		Category::AdministrativeAppeal => Some("decc"),
		Category::ConstitutionalDecision => Some("detc"),
		Category::LocalOrdinance => Some("ordin"),
		Category::AdministrativeRule => Some("admrul"),
		Category::LawComparison => Some("oldAndNew"),
		Category::CommitteeDecision | Category::SpecialTribunal => None,
	}
}

fn is_bulk(request: &ProviderRequest) -> bool {
	request.bulk || request.query.trim().is_empty()
}

fn map_reqwest_error(err: reqwest::Error, timeout_ms: u64) -> Error {
	if err.is_timeout() {
		Error::Timeout { timeout_ms }
	} else {
		Error::Transport { message: err.to_string() }
	}
}

fn lookup(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
	let name = name.trim();

	table.iter().find(|(known, _)| *known == name).map(|(_, target)| *target)
}

/// `prec` → `PrecSearch`.
fn root_key(list_key: &str) -> String {
	let mut chars = list_key.chars();

	match chars.next() {
		Some(first) => format!("{}{}Search", first.to_ascii_uppercase(), chars.as_str()),
		None => String::new(),
	}
}

fn as_total(value: &Value) -> Option<u64> {
	match value {
		Value::Number(number) => number.as_u64(),
		Value::String(raw) => raw.trim().parse().ok(),
		_ => None,
	}
}

fn into_list(value: Option<&Value>) -> Vec<Value> {
	match value {
		Some(Value::Array(items)) => items.clone(),
		Some(Value::Object(fields)) => vec![Value::Object(fields.clone())],
		_ => Vec::new(),
	}
}

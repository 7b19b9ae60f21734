//! Scripted providers and provider-shaped fixtures for exercising the search pipeline offline.

use std::{
	collections::VecDeque,
	future,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde_json::{Map, Value, json};

use lexguard_domain::{
	category::Category,
	result::{DetailRequest, ProviderRequest, RawRecord, RawResult},
};
use lexguard_providers::{BoxFuture, Error as ProviderError, SearchProvider};

/// A provider answer independent of the category it is served for.
#[derive(Clone, Debug)]
pub enum Reply {
	Hits { total: u64, records: Vec<Map<String, Value>> },
	Fail(ProviderError),
}
impl Reply {
	pub fn empty() -> Self {
		Self::Hits { total: 0, records: Vec::new() }
	}

	pub fn hits(total: u64, records: Vec<Map<String, Value>>) -> Self {
		Self::Hits { total, records }
	}

	pub fn html() -> Self {
		Self::Fail(ProviderError::HtmlResponse { url: "https://example.invalid/search".to_string() })
	}

	fn serve(&self, category: Category) -> Result<RawResult, ProviderError> {
		match self {
			Self::Hits { total, records } => Ok(RawResult {
				category,
				total: *total,
				records: records
					.iter()
					.cloned()
					.map(|fields| RawRecord::for_category(category, fields))
					.collect(),
				url: None,
			}),
			Self::Fail(err) => Err(err.clone()),
		}
	}
}

/// Serves queued replies in order, then repeats the fallback reply forever. Searches and detail
/// lookups share one queue.
pub struct ScriptedProvider {
	script: Mutex<VecDeque<Reply>>,
	fallback: Reply,
	calls: Arc<AtomicUsize>,
	requests: Mutex<Vec<ProviderRequest>>,
	details: Mutex<Vec<DetailRequest>>,
}
impl ScriptedProvider {
	pub fn new(fallback: Reply) -> Self {
		Self {
			script: Mutex::new(VecDeque::new()),
			fallback,
			calls: Arc::new(AtomicUsize::new(0)),
			requests: Mutex::new(Vec::new()),
			details: Mutex::new(Vec::new()),
		}
	}

	pub fn then(self, reply: Reply) -> Self {
		self.script.lock().unwrap_or_else(|err| err.into_inner()).push_back(reply);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<ProviderRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn details(&self) -> Vec<DetailRequest> {
		self.details.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn next_reply(&self, category: Category) -> Result<RawResult, ProviderError> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let queued = self.script.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

		queued.as_ref().unwrap_or(&self.fallback).serve(category)
	}
}

impl SearchProvider for ScriptedProvider {
	fn search<'a>(
		&'a self,
		request: &'a ProviderRequest,
	) -> BoxFuture<'a, lexguard_providers::Result<RawResult>> {
		Box::pin(async move {
			self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(request.clone());

			self.next_reply(request.category)
		})
	}

	fn detail<'a>(
		&'a self,
		request: &'a DetailRequest,
	) -> BoxFuture<'a, lexguard_providers::Result<RawResult>> {
		Box::pin(async move {
			self.details.lock().unwrap_or_else(|err| err.into_inner()).push(request.clone());

			self.next_reply(request.category)
		})
	}
}

/// Accepts every call and never answers, so only the caller's deadline ends it.
#[derive(Default)]
pub struct StalledProvider {
	calls: AtomicUsize,
}
impl StalledProvider {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn stall(&self) -> BoxFuture<'_, lexguard_providers::Result<RawResult>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			future::pending().await
		})
	}
}

impl SearchProvider for StalledProvider {
	fn search<'a>(
		&'a self,
		_: &'a ProviderRequest,
	) -> BoxFuture<'a, lexguard_providers::Result<RawResult>> {
		self.stall()
	}

	fn detail<'a>(
		&'a self,
		_: &'a DetailRequest,
	) -> BoxFuture<'a, lexguard_providers::Result<RawResult>> {
		self.stall()
	}
}

/// A precedent record in the provider's field layout.
pub fn precedent(id: u64, case_name: &str, holding: &str) -> Map<String, Value> {
	object(json!({
		"판례일련번호": id,
		"사건명": case_name,
		"사건번호": format!("2020다{id}"),
		"법원명": "대법원",
		"선고일자": "2021.03.25",
		"판시사항": holding,
	}))
}

/// A statute record in the provider's field layout.
pub fn statute(id: &str, name: &str, article: &str) -> Map<String, Value> {
	object(json!({
		"법령ID": id,
		"법령명한글": name,
		"소관부처명": "법무부",
		"시행일자": "20240101",
		"조문내용": article,
	}))
}

/// `relevant` precedents about `topic` followed by unrelated filler, `count` in all.
pub fn precedents_about(topic: &str, relevant: usize, count: usize) -> Vec<Map<String, Value>> {
	(0..count)
		.map(|idx| {
			let id = 100_000 + idx as u64;

			if idx < relevant {
				precedent(id, &format!("{topic} 사건 {idx}"), &format!("{topic}에 관한 판단 기준"))
			} else {
				precedent(id, &format!("소유권이전등기 {idx}"), "등기 절차에 관한 판단")
			}
		})
		.collect()
}

/// Default settings carrying a placeholder API key.
pub fn test_config() -> lexguard_config::Config {
	let mut cfg = lexguard_config::Config::default();

	cfg.provider.api_key = Some("test-key".to_string());

	cfg
}

fn object(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}

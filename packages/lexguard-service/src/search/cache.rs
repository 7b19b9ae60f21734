use std::{sync::Arc, time::Duration};

use moka::sync::Cache;

use lexguard_domain::{
	category::Category,
	lexicon::fold,
	result::{DetailKey, DetailRequest, ProviderRequest, RawResult},
};
use lexguard_providers::{BoxFuture, Error as ProviderError, SearchProvider};

type Fetched = (Result<Arc<RawResult>, ProviderError>, CacheSource);

/// Where a provider answer came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheSource {
	Positive,
	Negative,
	Live,
}
impl CacheSource {
	pub fn is_cached(self) -> bool {
		self != Self::Live
	}
}

/// Positive and negative provider caches sharing one request key.
///
/// Every live call runs under the provider deadline, whatever the provider does internally, and
/// an expired deadline is remembered like any other upstream failure.
#[derive(Clone)]
pub struct ResultCache {
	positive: Cache<String, Arc<RawResult>>,
	negative: Cache<String, ProviderError>,
	timeout_ms: u64,
	bulk_timeout_ms: u64,
}
impl ResultCache {
	pub fn new(cfg: &lexguard_config::Cache, provider: &lexguard_config::Provider) -> Self {
		Self {
			positive: Cache::builder()
				.max_capacity(cfg.positive_capacity)
				.time_to_live(Duration::from_secs(cfg.positive_ttl_secs))
				.build(),
			negative: Cache::builder()
				.max_capacity(cfg.negative_capacity)
				.time_to_live(Duration::from_secs(cfg.negative_ttl_secs))
				.build(),
			timeout_ms: provider.timeout_ms,
			bulk_timeout_ms: provider.bulk_timeout_ms,
		}
	}

	/// Positive entries first, then remembered failures, then a live call.
	pub async fn fetch(&self, provider: &dyn SearchProvider, request: &ProviderRequest) -> Fetched {
		let timeout_ms = if request.bulk || request.query.trim().is_empty() {
			self.bulk_timeout_ms
		} else {
			self.timeout_ms
		};

		self.resolve(request.category, cache_key(request), timeout_ms, || provider.search(request))
			.await
	}

	/// Same order as [`Self::fetch`], keyed apart from searches.
	pub async fn fetch_detail(
		&self,
		provider: &dyn SearchProvider,
		request: &DetailRequest,
	) -> Fetched {
		self.resolve(request.category, detail_key(request), self.timeout_ms, || {
			provider.detail(request)
		})
		.await
	}

	async fn resolve<'a, F>(
		&self,
		category: Category,
		key: String,
		timeout_ms: u64,
		call: F,
	) -> Fetched
	where
		F: FnOnce() -> BoxFuture<'a, lexguard_providers::Result<RawResult>>,
	{
		if let Some(hit) = self.positive.get(&key) {
			tracing::debug!(%category, key = %key, "Positive cache hit.");

			return (Ok(hit), CacheSource::Positive);
		}
		if let Some(err) = self.negative.get(&key) {
			tracing::debug!(%category, key = %key, "Negative cache hit.");

			return (Err(err), CacheSource::Negative);
		}

		let answered = match tokio::time::timeout(Duration::from_millis(timeout_ms), call()).await {
			Ok(answered) => answered,
			Err(_) => Err(ProviderError::Timeout { timeout_ms }),
		};

		match answered {
			Ok(raw) => {
				let raw = Arc::new(raw);

				self.positive.insert(key, raw.clone());

				(Ok(raw), CacheSource::Live)
			},
			Err(err) => {
				if err.is_cacheable() {
					self.negative.insert(key, err.clone());
				}

				(Err(err), CacheSource::Live)
			},
		}
	}

	pub fn clear(&self) {
		self.positive.invalidate_all();
		self.negative.invalidate_all();
	}
}

/// blake3 over the normalized request tuple. Query text is case-folded and whitespace-collapsed.
pub fn cache_key(request: &ProviderRequest) -> String {
	let query = request.query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
	let page = request.page.to_string();
	let per_page = request.per_page.to_string();
	let filters = &request.filters;
	let mut hasher = blake3::Hasher::new();

	for part in [
		request.category.as_str(),
		query.as_str(),
		page.as_str(),
		per_page.as_str(),
		filters.date_from.as_deref().unwrap_or_default(),
		filters.date_to.as_deref().unwrap_or_default(),
		filters.court.as_deref().unwrap_or_default(),
		filters.committee.as_deref().unwrap_or_default(),
		filters.tribunal.as_deref().unwrap_or_default(),
		if request.bulk { "bulk" } else { "" },
	] {
		hasher.update(part.as_bytes());
		hasher.update(&[0x1f]);
	}

	hasher.finalize().to_hex().to_string()
}

/// Detail keys hash a distinct prefix so they never collide with search keys.
pub fn detail_key(request: &DetailRequest) -> String {
	let (by, value) = match &request.key {
		DetailKey::Id(value) => ("id", value),
		DetailKey::Name(value) => ("name", value),
	};
	let value = fold(value);
	let mut hasher = blake3::Hasher::new();

	for part in [
		"detail",
		request.category.as_str(),
		by,
		value.as_str(),
		request.article.as_deref().unwrap_or_default(),
	] {
		hasher.update(part.as_bytes());
		hasher.update(&[0x1f]);
	}

	hasher.finalize().to_hex().to_string()
}

mod adaptive;
mod assemble;
mod cache;
mod document;
mod fallback;
mod lookup;
mod ranking;

pub use adaptive::{CategorySearchRequest, CategorySearchResponse};
pub use cache::{CacheSource, ResultCache, cache_key, detail_key};
pub use document::{ClauseSearch, DocumentReport, DocumentRequest, RiskFinding, RiskLevel};
pub use lookup::{LookupRequest, LookupResponse};
pub use ranking::{RerankQuery, bm25_scores, borda_fuse, keyword_scores, rerank};

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task::JoinSet};
use uuid::Uuid;

use crate::{Error, LexguardService, Result};
use lexguard_domain::{
	category::Category,
	classify::DomainLabel,
	evidence::Evidence,
	lexicon::fold,
	planner::{PlanInput, QueryPlan},
	provision::Provision,
	quality::Verdict,
	result::{NormalizedResult, ProviderFilters},
	text,
	window::{self, DateWindow},
};
use lexguard_providers::ErrorKind;

use fallback::CategoryRun;

const MAX_PER_PAGE: u32 = 100;
const MAX_DOMAINS: usize = 3;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
	pub query: String,
	/// Categories to search. Empty lets the service choose from the question.
	pub categories: Vec<Category>,
	/// `YYYYMMDD`.
	pub date_from: Option<String>,
	/// `YYYYMMDD`.
	pub date_to: Option<String>,
	pub court: Option<String>,
	pub committee: Option<String>,
	pub tribunal: Option<String>,
	pub must_include: Vec<String>,
	pub exclude: Vec<String>,
	pub issue_type: Option<String>,
	pub max_results_per_category: Option<u32>,
}

/// The state-machine stage an attempt belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
	A,
	B,
	C,
	D,
}

/// Audit record of one provider call.
#[derive(Clone, Debug, Serialize)]
pub struct SearchAttempt {
	pub step: Stage,
	pub category: Category,
	pub query: String,
	pub date_from: Option<String>,
	pub date_to: Option<String>,
	pub strategy: String,
	pub total: u64,
	pub success: bool,
	pub error: Option<String>,
	pub error_kind: Option<ErrorKind>,
	pub verdict: Verdict,
	pub cached: bool,
}

/// Why a search produced no results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MissingReason {
	ProviderNotConfigured,
	ProviderFormatError,
	ProviderTimeout,
	ProviderTransportError,
	NoMatch,
	NotSearched,
}
impl MissingReason {
	/// Picks the reason to report from an attempt log that produced no results.
	pub fn from_attempts(attempts: &[SearchAttempt]) -> Self {
		if attempts.is_empty() {
			return Self::NotSearched;
		}

		let has = |kind: ErrorKind| attempts.iter().any(|attempt| attempt.error_kind == Some(kind));
		let any_success = attempts.iter().any(|attempt| attempt.success);

		if has(ErrorKind::NotConfigured) {
			Self::ProviderNotConfigured
		} else if has(ErrorKind::Format) {
			Self::ProviderFormatError
		} else if !any_success && has(ErrorKind::Timeout) {
			Self::ProviderTimeout
		} else if !any_success && has(ErrorKind::Transport) {
			Self::ProviderTransportError
		} else {
			Self::NoMatch
		}
	}

	/// Failures where the provider itself could not be trusted to answer.
	pub fn is_provider_unavailable(self) -> bool {
		matches!(self, Self::ProviderNotConfigured | Self::ProviderFormatError)
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct Citation {
	#[serde(rename = "type")]
	pub kind: Category,
	pub id: String,
	pub name: String,
	pub source: Option<String>,
}

/// A curated background fact, attached only when the provider could not be searched.
#[derive(Clone, Debug, Serialize)]
pub struct ReferenceNote {
	pub domain: String,
	pub source: String,
	pub text: String,
	pub authoritative: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailedCategory {
	pub category: Category,
	pub reason: MissingReason,
	pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResultBundle {
	pub trace_id: Uuid,
	pub query: String,
	pub results: BTreeMap<Category, Vec<NormalizedResult>>,
	pub attempts: Vec<SearchAttempt>,
	pub domains: Vec<DomainLabel>,
	pub issue_type: Option<String>,
	pub citations: Vec<Citation>,
	pub evidence: Vec<Evidence>,
	pub evidence_summary: String,
	pub one_line_answer: Option<String>,
	pub missing_reason: Option<MissingReason>,
	pub failed_categories: Vec<FailedCategory>,
	pub fallback_used: bool,
	pub clarification_needed: bool,
	pub has_legal_basis: bool,
	pub sources_count: usize,
	pub reference_facts: Vec<ReferenceNote>,
	pub display_text: String,
}
impl ResultBundle {
	pub fn total_results(&self) -> usize {
		self.results.values().map(Vec::len).sum()
	}
}

/// Everything resolved once per question and shared by every category run.
pub(crate) struct SearchContext {
	pub(crate) query: String,
	pub(crate) categories: Vec<Category>,
	pub(crate) filters: ProviderFilters,
	pub(crate) window: DateWindow,
	pub(crate) must_include: Vec<String>,
	pub(crate) issue_type: Option<String>,
	pub(crate) domains: Vec<DomainLabel>,
	pub(crate) domain_terms: Vec<String>,
	pub(crate) plan: QueryPlan,
	/// A statute article named in the question, looked up directly before searching statutes.
	pub(crate) provision: Option<Provision>,
	pub(crate) per_page: u32,
}

impl LexguardService {
	pub async fn search(&self, req: SearchRequest) -> Result<ResultBundle> {
		let trace_id = Uuid::new_v4();
		let query = text::normalize_query(&req.query);
		let per_page = self.resolve_per_page(req.max_results_per_category)?;
		let window = self.resolve_window(&req)?;

		if (query.is_empty() && req.categories.is_empty())
			|| (!query.is_empty() && self.intents.needs_clarification(&query))
		{
			tracing::info!(%trace_id, query = %query, "Question is too vague to search.");

			let bundle = self.clarification_bundle(trace_id, query);

			self.telemetry.record(&bundle);

			return Ok(bundle);
		}

		let ctx = Arc::new(self.build_context(&req, query, window, per_page));

		tracing::info!(
			%trace_id,
			query = %ctx.query,
			categories = ?ctx.categories,
			domains = ctx.domains.len(),
			"Search started."
		);

		let (runs, aborted) = self.fan_out(ctx.clone()).await;
		let bundle = self.assemble(trace_id, &ctx, runs, aborted);

		tracing::info!(
			%trace_id,
			attempts = bundle.attempts.len(),
			sources = bundle.sources_count,
			missing = ?bundle.missing_reason,
			"Search finished."
		);

		self.telemetry.record(&bundle);

		Ok(bundle)
	}

	/// Confident domain labels for `text`, best first.
	pub fn classify(&self, text: &str, max_domains: usize) -> Vec<DomainLabel> {
		self.classifier.classify_confident(text, max_domains)
	}

	pub(crate) fn resolve_per_page(&self, requested: Option<u32>) -> Result<u32> {
		let per_page = requested.unwrap_or(self.cfg.search.max_results_per_category);

		if per_page == 0 || per_page > MAX_PER_PAGE {
			return Err(Error::InvalidRequest {
				message: format!("max_results_per_category must be in the range 1-{MAX_PER_PAGE}."),
			});
		}

		Ok(per_page)
	}

	pub(crate) fn resolve_window(&self, req: &SearchRequest) -> Result<DateWindow> {
		for (name, value) in [("date_from", &req.date_from), ("date_to", &req.date_to)] {
			if let Some(raw) = value.as_deref()
				&& window::parse_yyyymmdd(raw).is_none()
			{
				return Err(Error::InvalidRequest { message: format!("{name} must be a YYYYMMDD date.") });
			}
		}

		let today = window::today();
		let window = DateWindow::from_bounds(req.date_from.as_deref(), req.date_to.as_deref(), today)
			.unwrap_or_else(|| DateWindow::years_back(today, self.cfg.search.default_window_years));

		Ok(window)
	}

	fn build_context(
		&self,
		req: &SearchRequest,
		query: String,
		window: DateWindow,
		per_page: u32,
	) -> SearchContext {
		let domains = self.classifier.classify_confident(&query, MAX_DOMAINS);
		let domain_terms = domains
			.first()
			.map(|label| self.classifier.must_include_for(&label.domain))
			.unwrap_or_default();
		let committee = trimmed(req.committee.as_deref()).or_else(|| self.intents.committee(&query));
		let tribunal = trimmed(req.tribunal.as_deref()).or_else(|| self.intents.tribunal(&query));
		let filters = ProviderFilters {
			date_from: None,
			date_to: None,
			court: trimmed(req.court.as_deref()),
			committee,
			tribunal,
		};
		let categories = self.resolve_categories(req, &query, &domains, &filters);
		let issue_type = trimmed(req.issue_type.as_deref());
		let mut plan = self.planner.plan(PlanInput {
			text: &query,
			issue_type: issue_type.as_deref(),
			must_include: &req.must_include,
			exclude: &req.exclude,
		});

		if req.must_include.is_empty()
			&& let Some(step) = self.planner.domain_seeded(&query, &domain_terms)
		{
			let excluded = req.exclude.iter().map(|term| fold(term)).any(|term| {
				!term.is_empty() && fold(&step.text).contains(term.as_str())
			});

			if !excluded && plan.steps.iter().all(|existing| existing.text != step.text) {
				plan.steps.push(step);
				plan.steps.sort_by_key(|step| step.priority);
			}
		}

		SearchContext {
			provision: self.provisions.find(&query),
			query,
			categories,
			filters,
			window,
			must_include: req.must_include.iter().filter_map(|term| trimmed(Some(term))).collect(),
			issue_type,
			domains,
			domain_terms,
			plan,
			per_page,
		}
	}

	/// Explicit categories win. Otherwise detected intents, then the top domain's preferred
	/// categories, capped at `max_categories`, with statutes as the last resort.
	fn resolve_categories(
		&self,
		req: &SearchRequest,
		query: &str,
		domains: &[DomainLabel],
		filters: &ProviderFilters,
	) -> Vec<Category> {
		let mut categories: Vec<Category> = Vec::new();

		if !req.categories.is_empty() {
			for category in &req.categories {
				if !categories.contains(category) {
					categories.push(*category);
				}
			}

			return categories;
		}

		let max = self.cfg.search.max_categories;
		let named = |category: Category| match category {
			Category::CommitteeDecision => filters.committee.is_some(),
			Category::SpecialTribunal => filters.tribunal.is_some(),
			_ => true,
		};
		let detected = self.intents.detect(query, max).into_iter().map(|(category, _)| category);
		let preferred = domains
			.first()
			.map(|label| self.classifier.categories_for(&label.domain).to_vec())
			.unwrap_or_default();

		if filters.committee.is_some() {
			categories.push(Category::CommitteeDecision);
		}
		if filters.tribunal.is_some() {
			categories.push(Category::SpecialTribunal);
		}

		for category in detected.chain(preferred) {
			if categories.len() >= max {
				break;
			}
			if named(category) && !categories.contains(&category) {
				categories.push(category);
			}
		}

		categories.truncate(max.max(1));

		if categories.is_empty() {
			categories.push(Category::Law);
		}

		categories
	}

	/// Runs every category concurrently, at most `max_concurrent_categories` at a time.
	async fn fan_out(&self, ctx: Arc<SearchContext>) -> (Vec<CategoryRun>, Vec<Category>) {
		let semaphore = Arc::new(Semaphore::new(self.cfg.search.max_concurrent_categories));
		let mut tasks = JoinSet::new();

		for (order, category) in ctx.categories.iter().copied().enumerate() {
			let service = self.clone();
			let ctx = ctx.clone();
			let semaphore = semaphore.clone();

			tasks.spawn(async move {
				let _permit = semaphore.acquire_owned().await.ok();

				(order, service.run_category(&ctx, category).await)
			});
		}

		let mut runs: Vec<(usize, CategoryRun)> = Vec::with_capacity(ctx.categories.len());

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok(run) => runs.push(run),
				Err(err) => tracing::warn!(error = %err, "Category search task failed."),
			}
		}

		runs.sort_by_key(|(order, _)| *order);

		let aborted = ctx
			.categories
			.iter()
			.copied()
			.filter(|category| runs.iter().all(|(_, run)| run.category != *category))
			.collect();

		(runs.into_iter().map(|(_, run)| run).collect(), aborted)
	}
}

fn trimmed(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

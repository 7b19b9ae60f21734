//! The per-category A → B → C → D relaxation ladder.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
	LexguardService,
	search::{CacheSource, SearchAttempt, SearchContext, Stage},
};
use lexguard_domain::{
	category::Category,
	lexicon::fold,
	normalize,
	planner::QueryPlanStep,
	quality::Verdict,
	result::{
		DetailKey, DetailRequest, NormalizedResult, ProviderFilters, ProviderRequest, RawResult,
	},
	window::DateWindow,
};
use lexguard_providers::{Error as ProviderError, ErrorKind};

const STRATEGY_ARTICLE: &str = "article_lookup";
const STRATEGY_ORIGINAL: &str = "original";
const STRATEGY_BULK: &str = "bulk_listing";
const STRATEGY_WIDENED: &str = "widened_window";
const STRATEGY_KEYWORD_ONLY: &str = "keyword_only";
const MAX_WIDENINGS: u32 = 2;
const FALLBACK_KEYWORDS: usize = 2;

/// Inputs for a single provider call.
pub(crate) struct AttemptSpec<'a> {
	pub(crate) category: Category,
	pub(crate) stage: Stage,
	pub(crate) strategy: &'a str,
	pub(crate) query: &'a str,
	pub(crate) window: DateWindow,
	pub(crate) filters: &'a ProviderFilters,
	pub(crate) must_include: &'a [String],
	pub(crate) per_page: u32,
}

pub(crate) struct Outcome {
	pub(crate) attempt: SearchAttempt,
	pub(crate) results: Vec<NormalizedResult>,
}
impl Outcome {
	fn stops_ladder(&self) -> bool {
		self.attempt.verdict.is_acceptable()
			|| matches!(
				self.attempt.error_kind,
				Some(ErrorKind::NotConfigured | ErrorKind::InvalidRequest)
			)
	}
}

/// Everything one category produced.
pub(crate) struct CategoryRun {
	pub(crate) category: Category,
	pub(crate) results: Vec<NormalizedResult>,
	pub(crate) total: u64,
	pub(crate) verdict: Verdict,
	pub(crate) attempts: Vec<SearchAttempt>,
}

struct Ladder<'a> {
	ctx: &'a SearchContext,
	category: Category,
	max_attempts: usize,
	seen: Vec<(String, DateWindow)>,
	attempts: Vec<SearchAttempt>,
	best: Option<Outcome>,
	done: bool,
}
impl<'a> Ladder<'a> {
	fn new(ctx: &'a SearchContext, category: Category, max_attempts: u32) -> Self {
		Self {
			ctx,
			category,
			max_attempts: max_attempts as usize,
			seen: Vec::new(),
			attempts: Vec::new(),
			best: None,
			done: false,
		}
	}

	fn is_open(&self) -> bool {
		!self.done && self.attempts.len() < self.max_attempts
	}

	/// A (query, window) pair already tried is not a candidate.
	fn claim(&mut self, query: &str, window: DateWindow) -> bool {
		if self.seen.iter().any(|(seen_query, seen_window)| seen_query == query && *seen_window == window)
		{
			return false;
		}

		self.seen.push((query.to_string(), window));

		true
	}

	fn spec<'p>(
		&'p self,
		stage: Stage,
		strategy: &'p str,
		query: &'p str,
		window: DateWindow,
	) -> AttemptSpec<'p> {
		AttemptSpec {
			category: self.category,
			stage,
			strategy,
			query,
			window,
			filters: &self.ctx.filters,
			must_include: &self.ctx.must_include,
			per_page: self.ctx.per_page,
		}
	}

	/// Keeps the strictly larger total; an acceptable verdict ends the ladder on the spot.
	fn record(&mut self, outcome: Outcome) {
		let stops = outcome.stops_ladder();

		self.keep(outcome, stops);
	}

	/// An article lookup the endpoint rejects still leaves ordinary search to try.
	fn record_lookup(&mut self, outcome: Outcome) {
		let stops = outcome.attempt.verdict.is_acceptable()
			|| outcome.attempt.error_kind == Some(ErrorKind::NotConfigured);

		self.keep(outcome, stops);
	}

	fn keep(&mut self, outcome: Outcome, stops: bool) {
		let verdict = outcome.attempt.verdict;
		let success = outcome.attempt.success;

		self.done = stops;
		self.attempts.push(outcome.attempt.clone());

		if !success {
			return;
		}

		let replace = match &self.best {
			None => true,
			Some(_) if verdict.is_acceptable() => true,
			Some(best) => outcome.attempt.total > best.attempt.total,
		};

		if replace {
			self.best = Some(outcome);
		}
	}

	fn finish(self) -> CategoryRun {
		let (results, total, verdict) = match self.best {
			Some(best) => (best.results, best.attempt.total, best.attempt.verdict),
			None => (Vec::new(), 0, Verdict::Empty),
		};

		CategoryRun { category: self.category, results, total, verdict, attempts: self.attempts }
	}
}

impl LexguardService {
	pub(crate) async fn run_category(&self, ctx: &SearchContext, category: Category) -> CategoryRun {
		let mut ladder = Ladder::new(ctx, category, self.retry.max_attempts());
		let window =
			if category.supports_date_filter() { ctx.window } else { DateWindow::Unbounded };

		// Stage A.
		if category == Category::Law
			&& let Some(provision) = &ctx.provision
		{
			let request = DetailRequest {
				category,
				key: DetailKey::Name(provision.law.clone()),
				article: Some(provision.jo_code()),
			};
			let outcome = self
				.lookup_attempt(
					Stage::A,
					STRATEGY_ARTICLE,
					&request,
					&provision.to_string(),
					&ctx.must_include,
				)
				.await;

			ladder.record_lookup(outcome);

			if !ladder.is_open() {
				return ladder.finish();
			}
		}
		if ctx.query.is_empty() {
			ladder.claim("", window);

			let outcome = self.attempt(ladder.spec(Stage::A, STRATEGY_BULK, "", window)).await;

			ladder.record(outcome);

			return ladder.finish();
		}

		ladder.claim(&ctx.query, window);

		let first = self.attempt(ladder.spec(Stage::A, STRATEGY_ORIGINAL, &ctx.query, window)).await;
		let too_broad = first.attempt.verdict == Verdict::Poor
			&& first.attempt.total > self.evaluator.thresholds().max_total;

		ladder.record(first);

		// Stage B.
		let original_terms = term_set(&ctx.query);
		let mut variants: Vec<&QueryPlanStep> =
			ctx.plan.steps.iter().filter(|step| term_set(&step.text) != original_terms).collect();

		if too_broad {
			variants.sort_by_key(|step| !step.strategy.narrows());
		}

		let mut tried = 0;

		for step in variants {
			if !ladder.is_open() || tried >= self.cfg.search.variant_attempts {
				break;
			}
			if !ladder.claim(&step.text, window) {
				continue;
			}

			let outcome = self
				.attempt(ladder.spec(Stage::B, step.strategy.as_str(), &step.text, window))
				.await;

			tried += 1;

			ladder.record(outcome);
		}

		// Stage C.
		if category.supports_date_filter() {
			let mut previous = window;

			for step in 1..=MAX_WIDENINGS {
				if !ladder.is_open() {
					break;
				}

				let widened = window.widen(step, self.cfg.search.widened_window_years);

				if widened == previous {
					continue;
				}

				previous = widened;

				if !ladder.claim(&ctx.query, widened) {
					continue;
				}

				let outcome = self
					.attempt(ladder.spec(Stage::C, STRATEGY_WIDENED, &ctx.query, widened))
					.await;

				ladder.record(outcome);
			}
		}

		// Stage D.
		if ladder.is_open() {
			let keywords = self
				.planner
				.top_keywords(&ctx.query, FALLBACK_KEYWORDS)
				.unwrap_or_else(|| ctx.query.clone());

			if ladder.claim(&keywords, DateWindow::Unbounded) {
				let outcome = self
					.attempt(ladder.spec(
						Stage::D,
						STRATEGY_KEYWORD_ONLY,
						&keywords,
						DateWindow::Unbounded,
					))
					.await;

				ladder.record(outcome);
			}
		}

		ladder.finish()
	}

	/// One provider call through the cache. Provider failures become an `Empty` verdict on the
	/// attempt record rather than an error.
	pub(crate) async fn attempt(&self, spec: AttemptSpec<'_>) -> Outcome {
		let request = provider_request(&spec);
		let (fetched, source) = match self.providers.get(spec.category) {
			Some(provider) => self.cache.fetch(provider.as_ref(), &request).await,
			None => (Err(ProviderError::NotConfigured), CacheSource::Live),
		};
		let attempt = SearchAttempt {
			step: spec.stage,
			category: spec.category,
			query: spec.query.to_string(),
			date_from: request.filters.date_from,
			date_to: request.filters.date_to,
			strategy: spec.strategy.to_string(),
			total: 0,
			success: false,
			error: None,
			error_kind: None,
			verdict: Verdict::Empty,
			cached: source.is_cached(),
		};

		self.settle(attempt, fetched, spec.must_include)
	}

	/// A detail call recorded and graded like a search attempt; `label` stands in for the query.
	pub(crate) async fn lookup_attempt(
		&self,
		stage: Stage,
		strategy: &str,
		request: &DetailRequest,
		label: &str,
		must_include: &[String],
	) -> Outcome {
		let (fetched, source) = self.fetch_detail(request).await;
		let attempt = SearchAttempt {
			step: stage,
			category: request.category,
			query: label.to_string(),
			date_from: None,
			date_to: None,
			strategy: strategy.to_string(),
			total: 0,
			success: false,
			error: None,
			error_kind: None,
			verdict: Verdict::Empty,
			cached: source.is_cached(),
		};

		self.settle(attempt, fetched, must_include)
	}

	pub(crate) async fn fetch_detail(
		&self,
		request: &DetailRequest,
	) -> (Result<Arc<RawResult>, ProviderError>, CacheSource) {
		match self.providers.get(request.category) {
			Some(provider) => self.cache.fetch_detail(provider.as_ref(), request).await,
			None => (Err(ProviderError::NotConfigured), CacheSource::Live),
		}
	}

	fn settle(
		&self,
		mut attempt: SearchAttempt,
		fetched: Result<Arc<RawResult>, ProviderError>,
		must_include: &[String],
	) -> Outcome {
		match fetched {
			Ok(raw) => {
				let results = normalize::normalize_all(&raw);
				let assessment =
					self.evaluator.evaluate(raw.total, &results, &attempt.query, must_include);

				attempt.total = raw.total;
				attempt.success = true;
				attempt.verdict = assessment.verdict;

				tracing::info!(
					category = %attempt.category,
					stage = ?attempt.step,
					strategy = %attempt.strategy,
					total = raw.total,
					verdict = ?assessment.verdict,
					relevance = assessment.relevance_ratio,
					cached = attempt.cached,
					"Search attempt finished."
				);

				Outcome { attempt, results }
			},
			Err(err) => {
				tracing::warn!(
					category = %attempt.category,
					stage = ?attempt.step,
					strategy = %attempt.strategy,
					error = %err,
					cached = attempt.cached,
					"Search attempt failed."
				);

				attempt.error = Some(err.to_string());
				attempt.error_kind = Some(err.kind());

				Outcome { attempt, results: Vec::new() }
			},
		}
	}
}

/// Folded whitespace terms; a reordering of the same words yields the same set.
fn term_set(text: &str) -> BTreeSet<String> {
	text.split_whitespace().map(fold).collect()
}

/// Only the filters the category understands are forwarded, which also keeps cache keys stable.
fn provider_request(spec: &AttemptSpec<'_>) -> ProviderRequest {
	let (date_from, date_to) = if spec.category.supports_date_filter() {
		spec.window.bounds()
	} else {
		(None, None)
	};
	let filters = ProviderFilters {
		date_from,
		date_to,
		court: spec.filters.court.clone().filter(|_| spec.category == Category::Precedent),
		committee: spec
			.filters
			.committee
			.clone()
			.filter(|_| spec.category == Category::CommitteeDecision),
		tribunal: spec
			.filters
			.tribunal
			.clone()
			.filter(|_| spec.category == Category::SpecialTribunal),
	};

	ProviderRequest {
		category: spec.category,
		query: spec.query.to_string(),
		page: 1,
		per_page: spec.per_page,
		filters,
		bulk: spec.query.trim().is_empty(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn spec<'a>(
		category: Category,
		query: &'a str,
		filters: &'a ProviderFilters,
	) -> AttemptSpec<'a> {
		AttemptSpec {
			category,
			stage: Stage::A,
			strategy: STRATEGY_ORIGINAL,
			query,
			window: DateWindow::years_back(time::macros::date!(2024 - 06 - 30), 5),
			filters,
			must_include: &[],
			per_page: 10,
		}
	}

	#[test]
	fn request_forwards_only_category_filters() {
		let filters = ProviderFilters {
			court: Some("대법원".to_string()),
			committee: Some("공정거래위원회".to_string()),
			..ProviderFilters::default()
		};
		let precedent = provider_request(&spec(Category::Precedent, "부당해고", &filters));
		let committee = provider_request(&spec(Category::CommitteeDecision, "부당해고", &filters));

		assert_eq!(precedent.filters.court.as_deref(), Some("대법원"));
		assert_eq!(precedent.filters.committee, None);
		assert_eq!(precedent.filters.date_from.as_deref(), Some("20190630"));
		assert_eq!(committee.filters.court, None);
		assert_eq!(committee.filters.committee.as_deref(), Some("공정거래위원회"));
	}

	#[test]
	fn reordered_words_share_a_term_set() {
		assert_eq!(term_set("체불 임금"), term_set("임금  체불"));
		assert_ne!(term_set("체불 임금"), term_set("임금 체불 판례"));
	}

	#[test]
	fn statutes_never_carry_dates() {
		let filters = ProviderFilters::default();
		let request = provider_request(&spec(Category::Law, "근로기준법", &filters));

		assert_eq!(request.filters.date_from, None);
		assert_eq!(request.filters.date_to, None);
	}

	#[test]
	fn empty_query_is_a_bulk_listing() {
		let filters = ProviderFilters::default();
		let request = provider_request(&spec(Category::Precedent, "  ", &filters));

		assert!(request.bulk);
	}
}

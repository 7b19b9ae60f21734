//! Single-category search driven by the retry policy instead of the fixed stage ladder.

use serde::{Deserialize, Serialize};

use crate::{
	LexguardService, Result,
	search::{
		MissingReason, SearchAttempt, SearchRequest, Stage,
		fallback::{Outcome, AttemptSpec},
		ranking::{self, RerankQuery},
	},
};
use lexguard_domain::{
	category::Category,
	quality::{RetryParams, RetryState, Strategy, Verdict},
	result::{NormalizedResult, ProviderFilters},
	text,
	window::DateWindow,
};
use lexguard_providers::ErrorKind;

#[derive(Clone, Debug, Deserialize)]
pub struct CategorySearchRequest {
	pub category: Category,
	#[serde(default)]
	pub query: String,
	#[serde(default)]
	pub date_from: Option<String>,
	#[serde(default)]
	pub date_to: Option<String>,
	#[serde(default)]
	pub court: Option<String>,
	#[serde(default)]
	pub committee: Option<String>,
	#[serde(default)]
	pub tribunal: Option<String>,
	#[serde(default)]
	pub must_include: Vec<String>,
	#[serde(default)]
	pub issue_type: Option<String>,
	#[serde(default)]
	pub max_results: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CategorySearchResponse {
	pub category: Category,
	pub query: String,
	pub results: Vec<NormalizedResult>,
	pub total: u64,
	pub verdict: Verdict,
	pub strategies_applied: Vec<Strategy>,
	pub attempts: Vec<SearchAttempt>,
	pub missing_reason: Option<MissingReason>,
}

struct Best {
	total: u64,
	verdict: Verdict,
	results: Vec<NormalizedResult>,
}

impl LexguardService {
	/// Evaluate, decide, apply, until the verdict is acceptable or the policy gives up.
	pub async fn search_category(&self, req: CategorySearchRequest) -> Result<CategorySearchResponse> {
		let query = text::normalize_query(&req.query);
		let window = self.resolve_window(&SearchRequest {
			date_from: req.date_from.clone(),
			date_to: req.date_to.clone(),
			..SearchRequest::default()
		})?;
		let window = if req.category.supports_date_filter() { window } else { DateWindow::Unbounded };
		let per_page = self.resolve_per_page(req.max_results)?;
		let filters = ProviderFilters {
			date_from: None,
			date_to: None,
			court: req.court.clone(),
			committee: req.committee.clone(),
			tribunal: req.tribunal.clone(),
		};
		let domains = self.classifier.classify_confident(&query, 1);
		let domain_terms = domains
			.first()
			.map(|label| self.classifier.must_include_for(&label.domain))
			.unwrap_or_default();
		let mut params =
			RetryParams { query: query.clone(), window, must_include: req.must_include.clone() };
		let mut state = RetryState {
			attempts: 0,
			total: 0,
			window,
			applied: Vec::new(),
			has_must_include: !req.must_include.is_empty(),
			has_domain_terms: !domain_terms.is_empty(),
		};
		let mut attempts: Vec<SearchAttempt> = Vec::new();
		let mut best: Option<Best> = None;
		let mut stage = Stage::A;
		let mut strategy_name = "original";

		loop {
			let Outcome { attempt, results } = self
				.attempt(AttemptSpec {
					category: req.category,
					stage,
					strategy: strategy_name,
					query: &params.query,
					window: params.window,
					filters: &filters,
					must_include: &params.must_include,
					per_page,
				})
				.await;
			let verdict = attempt.verdict;

			state.attempts += 1;
			state.total = attempt.total;
			state.window = params.window;

			if attempt.success
				&& best.as_ref().is_none_or(|best| verdict.is_acceptable() || attempt.total > best.total)
			{
				best = Some(Best { total: attempt.total, verdict, results });
			}

			let unrecoverable = matches!(
				attempt.error_kind,
				Some(ErrorKind::NotConfigured | ErrorKind::InvalidRequest)
			);

			attempts.push(attempt);

			if unrecoverable || params.query.is_empty() {
				break;
			}

			let Some((strategy, next)) = self.next_params(verdict, &mut state, &params, &domain_terms)
			else {
				break;
			};

			stage = stage_for(strategy);
			strategy_name = strategy.as_str();
			params = next;
		}

		self.telemetry.record_attempts(&attempts);

		let (results, total, verdict) = match best {
			Some(best) => {
				let issue_type = req
					.issue_type
					.as_deref()
					.or(domains.first().map(|label| label.domain.as_str()));
				let mut ranked = ranking::rerank(
					self.cfg.search.rerank_mode,
					best.results,
					RerankQuery { query: &query, issue_type, must_include: &params.must_include },
					&self.lexicon,
				);

				ranked.truncate(per_page as usize);

				(ranked, best.total, best.verdict)
			},
			None => (Vec::new(), 0, Verdict::Empty),
		};
		let missing_reason =
			if results.is_empty() { Some(MissingReason::from_attempts(&attempts)) } else { None };

		Ok(CategorySearchResponse {
			category: req.category,
			query,
			results,
			total,
			verdict,
			strategies_applied: state.applied,
			attempts,
			missing_reason,
		})
	}

	/// The next rung that actually changes the parameters. Rungs that change nothing are marked
	/// applied and skipped without a provider call.
	fn next_params(
		&self,
		verdict: Verdict,
		state: &mut RetryState,
		params: &RetryParams,
		domain_terms: &[String],
	) -> Option<(Strategy, RetryParams)> {
		loop {
			let strategy = self.retry.decide(verdict, state)?;

			state.applied.push(strategy);

			let next = self.retry.apply(strategy, params, &self.planner, domain_terms);

			if next != *params {
				return Some((strategy, next));
			}
		}
	}
}

fn stage_for(strategy: Strategy) -> Stage {
	match strategy {
		Strategy::ExpandDateRange | Strategy::NoDateLimit => Stage::C,
		Strategy::KeywordOnly => Stage::D,
		Strategy::AddMustInclude | Strategy::ExpandSynonyms | Strategy::SimplifyQuery => Stage::B,
	}
}

//! Result-set grading and the relaxation ladder applied when a grade is too low.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use crate::{
	lexicon::{Lexicon, fold},
	planner::QueryPlanner,
	result::NormalizedResult,
	text,
	window::DateWindow,
};

/// Ordered worst to best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
	Empty,
	Poor,
	Fair,
	Good,
	Excellent,
}
impl Verdict {
	pub fn is_acceptable(self) -> bool {
		self >= Verdict::Good
	}
}

#[derive(Clone, Debug)]
pub struct QualityThresholds {
	pub min_total: u64,
	pub max_total: u64,
	pub sample_size: usize,
	pub excellent_ratio: f32,
	pub good_ratio: f32,
}
impl Default for QualityThresholds {
	fn default() -> Self {
		Self { min_total: 3, max_total: 100, sample_size: 10, excellent_ratio: 0.7, good_ratio: 0.4 }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Assessment {
	pub verdict: Verdict,
	pub relevance_ratio: f32,
}

pub struct QualityEvaluator {
	lexicon: Arc<Lexicon>,
	thresholds: QualityThresholds,
	provision_re: Option<Regex>,
}
impl QualityEvaluator {
	pub fn new(lexicon: Arc<Lexicon>, thresholds: QualityThresholds) -> Self {
		Self {
			lexicon,
			thresholds,
			provision_re: Regex::new(r"[가-힣]+법\s*제\s*\d+\s*조").ok(),
		}
	}

	pub fn thresholds(&self) -> &QualityThresholds {
		&self.thresholds
	}

	/// Grades a result set from its provider total and the leading sample of results.
	///
	/// A query naming a specific statute provision expects a handful of hits, so the minimum-total
	/// floor does not apply to it.
	pub fn evaluate(
		&self,
		total: u64,
		sample: &[NormalizedResult],
		query: &str,
		must_include: &[String],
	) -> Assessment {
		if total == 0 {
			return Assessment { verdict: Verdict::Empty, relevance_ratio: 0.0 };
		}

		let names_provision = self.provision_re.as_ref().is_some_and(|re| re.is_match(query));

		if (total < self.thresholds.min_total && !names_provision) || total > self.thresholds.max_total
		{
			return Assessment { verdict: Verdict::Poor, relevance_ratio: 0.0 };
		}

		let ratio = self.relevance_ratio(sample, query, must_include);
		let verdict = if ratio > self.thresholds.excellent_ratio {
			Verdict::Excellent
		} else if ratio > self.thresholds.good_ratio {
			Verdict::Good
		} else {
			Verdict::Fair
		};

		Assessment { verdict, relevance_ratio: ratio }
	}

	/// Fraction of the leading sample mentioning at least one query or must-include keyword.
	pub fn relevance_ratio(
		&self,
		sample: &[NormalizedResult],
		query: &str,
		must_include: &[String],
	) -> f32 {
		let sample = &sample[..sample.len().min(self.thresholds.sample_size)];

		if sample.is_empty() {
			return 0.0;
		}

		let mut keywords = text::extract_keywords(query, &self.lexicon);

		if keywords.is_empty() {
			keywords = query.split_whitespace().map(fold).collect();
		}

		keywords.extend(must_include.iter().map(|term| fold(term)).filter(|t| !t.is_empty()));

		if keywords.is_empty() {
			return 0.0;
		}

		let relevant = sample
			.iter()
			.filter(|result| {
				let haystack = result.searchable_text();

				keywords.iter().any(|keyword| haystack.contains(keyword.as_str()))
			})
			.count();

		relevant as f32 / sample.len() as f32
	}
}

/// One rung of the relaxation ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
	AddMustInclude,
	ExpandDateRange,
	NoDateLimit,
	ExpandSynonyms,
	SimplifyQuery,
	KeywordOnly,
}
impl Strategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AddMustInclude => "add_must_include",
			Self::ExpandDateRange => "expand_date_range",
			Self::NoDateLimit => "no_date_limit",
			Self::ExpandSynonyms => "expand_synonyms",
			Self::SimplifyQuery => "simplify_query",
			Self::KeywordOnly => "keyword_only",
		}
	}
}

/// What the policy needs to know about the attempts made so far.
#[derive(Clone, Debug)]
pub struct RetryState {
	pub attempts: u32,
	pub total: u64,
	pub window: DateWindow,
	pub applied: Vec<Strategy>,
	pub has_must_include: bool,
	pub has_domain_terms: bool,
}

/// Query parameters a strategy rewrites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryParams {
	pub query: String,
	pub window: DateWindow,
	pub must_include: Vec<String>,
}

pub struct RetryPolicy {
	max_attempts: u32,
	max_total: u64,
	widened_years: i32,
}
impl RetryPolicy {
	pub fn new(max_attempts: u32, max_total: u64, widened_years: i32) -> Self {
		Self { max_attempts, max_total, widened_years }
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// `None` accepts the current result or gives up; otherwise the next rung to apply.
	pub fn decide(&self, verdict: Verdict, state: &RetryState) -> Option<Strategy> {
		if verdict.is_acceptable() || state.attempts >= self.max_attempts {
			return None;
		}

		let untried = |strategy: Strategy| !state.applied.contains(&strategy);
		let too_broad = verdict == Verdict::Poor && state.total > self.max_total;

		if too_broad
			&& !state.has_must_include
			&& state.has_domain_terms
			&& untried(Strategy::AddMustInclude)
		{
			return Some(Strategy::AddMustInclude);
		}

		let bounded = !state.window.is_unbounded();

		[
			(Strategy::ExpandDateRange, bounded),
			(Strategy::NoDateLimit, bounded),
			(Strategy::ExpandSynonyms, true),
			(Strategy::SimplifyQuery, true),
			(Strategy::KeywordOnly, true),
		]
		.into_iter()
		.find(|(strategy, applicable)| *applicable && untried(*strategy))
		.map(|(strategy, _)| strategy)
	}

	/// Rewrites `params` for `strategy`. The result equals the input when the rung changes nothing.
	pub fn apply(
		&self,
		strategy: Strategy,
		params: &RetryParams,
		planner: &QueryPlanner,
		domain_terms: &[String],
	) -> RetryParams {
		let mut next = params.clone();

		match strategy {
			Strategy::AddMustInclude => {
				for term in domain_terms {
					if !next.must_include.contains(term) {
						next.must_include.push(term.clone());
					}
				}

				let mut terms = next.must_include.clone();

				for keyword in planner.keywords(&params.query).into_iter().take(2) {
					if !terms.contains(&keyword) {
						terms.push(keyword);
					}
				}

				next.query = terms.join(" ");
			},
			Strategy::ExpandDateRange => next.window = params.window.widen(1, self.widened_years),
			Strategy::NoDateLimit => next.window = DateWindow::Unbounded,
			Strategy::ExpandSynonyms => {
				if let Some(variant) = planner.synonym_variants(&params.query, 1).into_iter().next()
				{
					next.query = variant;
				} else if let Some(top) = planner.top_keywords(&params.query, 3)
					&& let Some(variant) = planner.synonym_variants(&top, 1).into_iter().next()
				{
					next.query = variant;
				}
			},
			Strategy::SimplifyQuery => {
				if let Some(top) = planner.top_keywords(&params.query, 3) {
					next.query = top;
				}
			},
			Strategy::KeywordOnly => {
				if let Some(top) = planner.top_keywords(&params.query, 2) {
					next.query = top;
				}

				next.window = DateWindow::Unbounded;
			},
		}

		next
	}
}

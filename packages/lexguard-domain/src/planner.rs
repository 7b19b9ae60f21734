//! Turns one natural-language question into a prioritized set of provider queries.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use crate::{
	lexicon::{Lexicon, fold},
	text,
};

const AXIS_LIMIT: usize = 5;
const TOP_KEYWORDS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStrategy {
	KeywordExtraction,
	MustIncludeCombined,
	SynonymExpansion { variant: usize },
	IssueType,
	AxisRecombination,
	DomainSeeded,
}
impl PlanStrategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::KeywordExtraction => "keyword_extraction",
			Self::MustIncludeCombined => "must_include_combined",
			Self::SynonymExpansion { .. } => "synonym_expansion",
			Self::IssueType => "issue_type",
			Self::AxisRecombination => "axis_recombination",
			Self::DomainSeeded => "domain_seeded",
		}
	}

	/// Steps that pin the query to required terms rather than loosening it.
	pub fn narrows(self) -> bool {
		matches!(self, Self::MustIncludeCombined | Self::DomainSeeded)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryPlanStep {
	pub text: String,
	pub strategy: PlanStrategy,
	pub priority: u8,
}

/// Keywords split into legal concepts and concrete situation facts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AxisSplit {
	pub legal: Vec<String>,
	pub fact: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct QueryPlan {
	pub keywords: Vec<String>,
	pub axes: AxisSplit,
	pub steps: Vec<QueryPlanStep>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlanInput<'a> {
	pub text: &'a str,
	pub issue_type: Option<&'a str>,
	pub must_include: &'a [String],
	pub exclude: &'a [String],
}

pub struct QueryPlanner {
	lexicon: Arc<Lexicon>,
	max_synonym_variants: usize,
	statute_re: Option<Regex>,
	article_re: Option<Regex>,
}
impl QueryPlanner {
	pub fn new(lexicon: Arc<Lexicon>, max_synonym_variants: usize) -> Self {
		Self {
			lexicon,
			max_synonym_variants,
			statute_re: Regex::new(r"([가-힣]+법)").ok(),
			article_re: Regex::new(r"제?\s*(\d+)\s*조").ok(),
		}
	}

	pub fn lexicon(&self) -> &Lexicon {
		&self.lexicon
	}

	pub fn keywords(&self, text: &str) -> Vec<String> {
		text::extract_keywords(text, &self.lexicon)
	}

	pub fn top_keywords(&self, text: &str, n: usize) -> Option<String> {
		text::top_keywords(text, &self.lexicon, n)
	}

	pub fn plan(&self, input: PlanInput<'_>) -> QueryPlan {
		let keywords = self.keywords(input.text);
		let axes = self.axes(input.text, input.issue_type);
		let mut steps = Vec::new();

		if keywords.is_empty() {
			return QueryPlan { keywords, axes, steps };
		}

		let top: Vec<String> = keywords.iter().take(TOP_KEYWORDS).cloned().collect();
		let top_query = top.join(" ");

		steps.push(QueryPlanStep {
			text: keywords.join(" "),
			strategy: PlanStrategy::KeywordExtraction,
			priority: 1,
		});

		if !input.must_include.is_empty() {
			let mut terms: Vec<String> = input.must_include.iter().map(|term| fold(term)).collect();

			for keyword in &top {
				if !terms.contains(keyword) {
					terms.push(keyword.clone());
				}
			}

			steps.push(QueryPlanStep {
				text: terms.join(" "),
				strategy: PlanStrategy::MustIncludeCombined,
				priority: 2,
			});
		}

		for (variant, text) in
			self.synonym_variants(&top_query, self.max_synonym_variants).into_iter().enumerate()
		{
			steps.push(QueryPlanStep {
				text,
				strategy: PlanStrategy::SynonymExpansion { variant },
				priority: 3,
			});
		}

		if let Some(issue_type) = input.issue_type.map(str::trim).filter(|issue| !issue.is_empty())
		{
			let issue = fold(issue_type);
			let mut terms = vec![issue.clone()];

			terms.extend(keywords.iter().filter(|kw| **kw != issue).take(2).cloned());

			steps.push(QueryPlanStep {
				text: terms.join(" "),
				strategy: PlanStrategy::IssueType,
				priority: 4,
			});
		}

		if let (Some(legal), Some(fact)) = (axes.legal.first(), axes.fact.first()) {
			let mut terms: Vec<&str> = axes.legal.iter().take(2).map(String::as_str).collect();

			if !terms.contains(&fact.as_str()) {
				terms.push(fact);
			}
			if terms.len() > 1 || legal != fact {
				steps.push(QueryPlanStep {
					text: terms.join(" "),
					strategy: PlanStrategy::AxisRecombination,
					priority: 5,
				});
			}
		}

		QueryPlan { keywords, axes, steps: finalize(steps, input.exclude) }
	}

	/// A must-include seeded step built from domain classification, slotted next to the caller's
	/// own must-include combination.
	pub fn domain_seeded(&self, text: &str, seed_terms: &[String]) -> Option<QueryPlanStep> {
		if seed_terms.is_empty() {
			return None;
		}

		let mut terms: Vec<String> = seed_terms.iter().map(|term| fold(term)).collect();

		for keyword in self.keywords(text).into_iter().take(2) {
			if !terms.iter().any(|term| term.contains(&keyword) || keyword.contains(term.as_str())) {
				terms.push(keyword);
			}
		}

		Some(QueryPlanStep { text: terms.join(" "), strategy: PlanStrategy::DomainSeeded, priority: 2 })
	}

	/// Substitutes one term at a time with each of its synonyms, never rewriting the whole query.
	pub fn synonym_variants(&self, query: &str, max: usize) -> Vec<String> {
		let terms: Vec<&str> = query.split_whitespace().collect();
		let mut variants = Vec::new();

		for (idx, term) in terms.iter().enumerate() {
			let Some(alternatives) = self.lexicon.synonyms_for(&fold(term)) else {
				continue;
			};

			for alternative in alternatives {
				if variants.len() >= max {
					return variants;
				}

				let mut replaced = terms.clone();

				replaced[idx] = alternative.as_str();

				let variant = replaced.join(" ");

				if !variants.contains(&variant) {
					variants.push(variant);
				}
			}
		}

		variants
	}

	pub fn axes(&self, text: &str, issue_type: Option<&str>) -> AxisSplit {
		let folded = fold(text);
		let mut legal = Vec::new();

		if let Some(issue_type) = issue_type {
			for term in self.lexicon.axis_terms(issue_type.trim()) {
				if folded.contains(term.as_str()) {
					push_unique(&mut legal, term.clone());
				}
			}
		}
		for core in self.lexicon.core_hits(&folded) {
			push_unique(&mut legal, core.to_string());
		}

		let statutes: Vec<String> = self
			.statute_re
			.as_ref()
			.map(|re| re.captures_iter(text).map(|caps| caps[1].to_string()).collect())
			.unwrap_or_default();

		for statute in &statutes {
			push_unique(&mut legal, statute.clone());
		}

		if let Some(article) = self
			.article_re
			.as_ref()
			.and_then(|re| re.captures(text))
			.map(|caps| caps[1].to_string())
		{
			for statute in &statutes {
				push_unique(&mut legal, format!("{statute} 제{article}조"));
			}
		}

		legal.truncate(AXIS_LIMIT);

		let mut fact = Vec::new();

		for pattern in &self.lexicon.fact_patterns {
			if folded.contains(pattern.as_str()) {
				push_unique(&mut fact, pattern.clone());
			}
		}
		for keyword in self.keywords(text) {
			if !self.lexicon.legal_core.contains(&keyword) {
				push_unique(&mut fact, keyword);
			}
		}

		fact.truncate(AXIS_LIMIT);

		AxisSplit { legal, fact }
	}
}

fn finalize(steps: Vec<QueryPlanStep>, exclude: &[String]) -> Vec<QueryPlanStep> {
	let excluded: Vec<String> =
		exclude.iter().map(|term| fold(term)).filter(|term| !term.is_empty()).collect();
	let mut kept: Vec<QueryPlanStep> = Vec::new();

	for step in steps {
		let folded = fold(&step.text);

		if step.text.is_empty() || excluded.iter().any(|term| folded.contains(term.as_str())) {
			continue;
		}
		if kept.iter().any(|existing| existing.text == step.text) {
			continue;
		}

		kept.push(step);
	}

	kept.sort_by_key(|step| step.priority);

	kept
}

fn push_unique(values: &mut Vec<String>, value: String) {
	if !values.contains(&value) {
		values.push(value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn planner() -> QueryPlanner {
		QueryPlanner::new(Arc::new(Lexicon::embedded().expect("Embedded lexicon must parse.")), 3)
	}

	#[test]
	fn plan_orders_steps_by_priority() {
		let must_include = vec!["근로기준법".to_string()];
		let plan = planner().plan(PlanInput {
			text: "프리랜서 임금 체불 문제 알려주세요",
			issue_type: Some("임금체불"),
			must_include: &must_include,
			exclude: &[],
		});
		let priorities: Vec<u8> = plan.steps.iter().map(|step| step.priority).collect();

		assert_eq!(plan.keywords, vec!["프리랜서", "임금", "체불"]);
		assert_eq!(plan.steps[0].text, "프리랜서 임금 체불");
		assert_eq!(plan.steps[0].strategy, PlanStrategy::KeywordExtraction);
		assert_eq!(plan.steps[1].text, "근로기준법 프리랜서 임금 체불");
		assert!(priorities.windows(2).all(|pair| pair[0] <= pair[1]));
		assert!(plan.steps.iter().any(|step| step.strategy == PlanStrategy::IssueType));
	}

	#[test]
	fn synonyms_replace_one_term_at_a_time() {
		let variants = planner().synonym_variants("프리랜서 임금", 3);

		assert_eq!(
			variants,
			vec![
				"위장도급 임금".to_string(),
				"특수형태근로종사자 임금".to_string(),
				"도급계약 임금".to_string()
			]
		);
	}

	#[test]
	fn excluded_terms_drop_their_steps() {
		let exclude = vec!["위장도급".to_string()];
		let plan = planner().plan(PlanInput {
			text: "프리랜서 임금",
			issue_type: None,
			must_include: &[],
			exclude: &exclude,
		});

		assert!(plan.steps.iter().all(|step| !step.text.contains("위장도급")));
		assert!(!plan.steps.is_empty());
	}

	#[test]
	fn axes_separate_legal_concepts_from_facts() {
		let axes = planner().axes("근로기준법 제2조 프리랜서 월급 고정급", None);

		assert!(axes.legal.contains(&"근로기준법".to_string()));
		assert!(axes.legal.contains(&"근로기준법 제2조".to_string()));
		assert!(axes.fact.contains(&"고정급".to_string()));
		assert!(axes.fact.contains(&"월급".to_string()));
	}

	#[test]
	fn stopword_only_text_yields_an_empty_plan() {
		let plan = planner().plan(PlanInput { text: "알려주세요", ..PlanInput::default() });

		assert!(plan.steps.is_empty());
	}
}

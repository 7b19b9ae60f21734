use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
	category::Category,
	lexicon::{Lexicon, fold},
	result::NormalizedResult,
	text,
};

pub const MAX_EVIDENCE_CHARS: usize = 300;

const CASE_NAME_SCORE: f32 = 0.5;
const CASE_NAME_MAX_CHARS: usize = 100;
const STATUTE_NAME_SCORE: f32 = 0.6;
const TITLE_SCORE: f32 = 0.5;
const ISSUE_BONUS: f32 = 0.2;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Evidence {
	pub text: String,
	pub source: Category,
	pub source_id: String,
	pub issue_tags: Vec<String>,
	pub auto_tags: Vec<String>,
	pub relevance_score: f32,
}

enum Score {
	Computed,
	Fixed(f32),
}

pub struct EvidenceExtractor {
	lexicon: Arc<Lexicon>,
}
impl EvidenceExtractor {
	pub fn new(lexicon: Arc<Lexicon>) -> Self {
		Self { lexicon }
	}

	/// One to three fragments from a single result, shaped by its category.
	pub fn extract(
		&self,
		result: &NormalizedResult,
		query_keywords: &[String],
		issue_type: Option<&str>,
	) -> Vec<Evidence> {
		let raw = result.raw_data.as_object();
		let field = |names: &[&str]| raw.and_then(|fields| first_string(fields, names));
		let mut candidates: Vec<(String, Score)> = Vec::new();

		match result.source {
			Category::Precedent => {
				if let Some(holding) = field(&["판시사항"]) {
					candidates.push((holding, Score::Computed));
				}
				if let Some(reasoning) = field(&["판결요지"]) {
					candidates.push((reasoning, Score::Computed));
				}
				if !result.title.is_empty() && result.title.chars().count() < CASE_NAME_MAX_CHARS {
					candidates.push((result.title.clone(), Score::Fixed(CASE_NAME_SCORE)));
				}
			},
			Category::Law => {
				if !result.title.is_empty() {
					candidates.push((result.title.clone(), Score::Fixed(STATUTE_NAME_SCORE)));
				}
				if let Some(article) = field(&["조문내용"]) {
					candidates.push((article, Score::Computed));
				}
			},
			_ => {},
		}

		if candidates.is_empty() {
			if !result.summary.is_empty() {
				candidates.push((result.summary.clone(), Score::Computed));
			}
			if !result.title.is_empty() {
				candidates.push((result.title.clone(), Score::Fixed(TITLE_SCORE)));
			}
		}

		candidates
			.into_iter()
			.filter_map(|(raw_text, score)| {
				let fragment = text::truncate_sentence(&text::clean_html(&raw_text), MAX_EVIDENCE_CHARS);

				if fragment.text.is_empty() {
					return None;
				}

				let relevance_score = match score {
					Score::Computed => self.relevance(&fragment.text, query_keywords, issue_type),
					Score::Fixed(score) => score,
				};

				Some(Evidence {
					auto_tags: self.auto_tags(&fragment.text),
					issue_tags: issue_type
						.map(str::trim)
						.filter(|issue| !issue.is_empty())
						.map(|issue| vec![issue.to_string()])
						.unwrap_or_default(),
					text: fragment.text,
					source: result.source,
					source_id: result.id.clone(),
					relevance_score,
				})
			})
			.collect()
	}

	/// The `top_k` most relevant fragments across `results`; equal scores keep result order.
	pub fn build(
		&self,
		results: &[NormalizedResult],
		query: &str,
		issue_type: Option<&str>,
		top_k: usize,
	) -> Vec<Evidence> {
		let keywords = text::extract_keywords(query, &self.lexicon);
		let mut evidence: Vec<Evidence> = results
			.iter()
			.flat_map(|result| self.extract(result, &keywords, issue_type))
			.collect();

		evidence.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
		evidence.truncate(top_k);

		evidence
	}

	pub fn relevance(&self, fragment: &str, query_keywords: &[String], issue_type: Option<&str>) -> f32 {
		let folded = fold(fragment);
		let mut score = if query_keywords.is_empty() {
			0.0
		} else {
			let hits =
				query_keywords.iter().filter(|keyword| folded.contains(keyword.as_str())).count();

			hits as f32 / query_keywords.len() as f32
		};

		if let Some(issue) = issue_type.map(fold).filter(|issue| !issue.is_empty())
			&& folded.contains(issue.as_str())
		{
			score += ISSUE_BONUS;
		}

		score.min(1.0)
	}

	pub fn auto_tags(&self, fragment: &str) -> Vec<String> {
		let folded = fold(fragment);

		self.lexicon
			.tags
			.iter()
			.filter(|tag| tag.patterns.iter().any(|pattern| folded.contains(pattern.as_str())))
			.map(|tag| tag.name.clone())
			.collect()
	}
}

/// One line per fragment, `[source] text`, numbered.
pub fn summarize(evidence: &[Evidence]) -> String {
	evidence
		.iter()
		.enumerate()
		.map(|(idx, item)| format!("{}. [{}] {}", idx + 1, item.source.label(), item.text))
		.collect::<Vec<_>>()
		.join("\n")
}

fn first_string(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
	names
		.iter()
		.filter_map(|name| fields.get(*name).and_then(Value::as_str))
		.map(str::trim)
		.find(|value| !value.is_empty())
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn extractor() -> EvidenceExtractor {
		EvidenceExtractor::new(Arc::new(Lexicon::embedded().expect("Embedded lexicon must parse.")))
	}

	fn precedent(id: &str, holding: &str) -> NormalizedResult {
		NormalizedResult {
			id: id.to_string(),
			title: "근로자지위확인".to_string(),
			court: Some("대법원".to_string()),
			date: Some("20210311".to_string()),
			summary: holding.to_string(),
			url: None,
			source: Category::Precedent,
			case_number: None,
			raw_data: json!({ "판시사항": holding, "판결요지": "사용자가 업무 내용을 정하고 지휘·감독을 하였는지 여부" }),
		}
	}

	#[test]
	fn precedent_yields_holding_reasoning_and_case_name() {
		let keywords = vec!["근로자성".to_string(), "지휘".to_string()];
		let evidence = extractor().extract(
			&precedent("1", "근로자성 판단 기준에 관한 사례"),
			&keywords,
			Some("근로자성"),
		);

		assert_eq!(evidence.len(), 3);
		assert!((evidence[0].relevance_score - 0.7).abs() < 1e-6);
		assert!(evidence[1].auto_tags.contains(&"지휘감독".to_string()));
		assert_eq!(evidence[2].text, "근로자지위확인");
		assert_eq!(evidence[2].relevance_score, CASE_NAME_SCORE);
		assert!(evidence.iter().all(|item| item.issue_tags == vec!["근로자성".to_string()]));
	}

	#[test]
	fn statute_yields_name_and_article() {
		let law = NormalizedResult {
			id: "001692".to_string(),
			title: "형법".to_string(),
			court: None,
			date: None,
			summary: String::new(),
			url: None,
			source: Category::Law,
			case_number: None,
			raw_data: json!({ "조문내용": "제250조(살인) 사람을 살해한 자는 사형, 무기 또는 5년 이상의 징역에 처한다." }),
		};
		let evidence = extractor().extract(&law, &["살인".to_string()], None);

		assert_eq!(evidence.len(), 2);
		assert_eq!(evidence[0].relevance_score, STATUTE_NAME_SCORE);
		assert_eq!(evidence[1].relevance_score, 1.0);
	}

	#[test]
	fn fragments_never_exceed_three_hundred_chars() {
		let long = "사용자는 근로자를 지휘하고 감독하였다. ".repeat(500);
		let evidence = extractor().extract(&precedent("2", &long), &[], None);

		assert!(evidence.iter().all(|item| item.text.chars().count() <= MAX_EVIDENCE_CHARS));
		assert!(evidence[0].text.ends_with('.'));
	}

	#[test]
	fn build_keeps_the_top_k_by_relevance() {
		let results: Vec<NormalizedResult> =
			(0..4).map(|idx| precedent(&idx.to_string(), "근로자성 판단")).collect();
		let evidence = extractor().build(&results, "근로자성 지휘", None, 5);

		assert_eq!(evidence.len(), 5);
		assert!(evidence.windows(2).all(|pair| pair[0].relevance_score >= pair[1].relevance_score));
	}
}

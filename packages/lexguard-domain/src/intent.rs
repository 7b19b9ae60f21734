//! Category detection for questions that arrive without an explicit category filter.

use std::sync::Arc;

use regex::Regex;

use crate::{
	Error, Result,
	category::Category,
	lexicon::{Lexicon, fold},
	text,
};

const KEYWORD_WEIGHT: f32 = 1.0;
const PATTERN_WEIGHT: f32 = 2.0;
const MIN_INTENT_CONFIDENCE: f32 = 0.5;

struct CompiledIntent {
	category: Category,
	keywords: Vec<String>,
	patterns: Vec<Regex>,
}

pub struct IntentDetector {
	lexicon: Arc<Lexicon>,
	intents: Vec<CompiledIntent>,
}
impl IntentDetector {
	pub fn new(lexicon: Arc<Lexicon>) -> Result<Self> {
		let mut intents = Vec::with_capacity(lexicon.intents.len());

		for entry in &lexicon.intents {
			let mut patterns = Vec::with_capacity(entry.patterns.len());

			for pattern in &entry.patterns {
				let compiled = Regex::new(&format!("(?i){pattern}")).map_err(|err| {
					Error::InvalidPattern {
						category: entry.category.to_string(),
						pattern: pattern.clone(),
						source: err,
					}
				})?;

				patterns.push(compiled);
			}

			intents.push(CompiledIntent {
				category: entry.category,
				keywords: entry.keywords.clone(),
				patterns,
			});
		}

		Ok(Self { lexicon, intents })
	}

	/// Categories whose normalized score reaches 0.5, best first, at most `max` of them.
	pub fn detect(&self, text: &str, max: usize) -> Vec<(Category, f32)> {
		let folded = fold(text);
		let mut scored: Vec<(Category, f32)> = Vec::new();

		for intent in &self.intents {
			let keyword_hits =
				intent.keywords.iter().filter(|kw| folded.contains(kw.as_str())).count();
			let pattern_hits = intent.patterns.iter().filter(|re| re.is_match(text)).count();
			let score = keyword_hits as f32 * KEYWORD_WEIGHT + pattern_hits as f32 * PATTERN_WEIGHT;

			if score > 0.0 {
				scored.push((intent.category, score));
			}
		}

		let Some(max_score) = scored.iter().map(|(_, score)| *score).reduce(f32::max) else {
			return Vec::new();
		};

		scored.sort_by(|a, b| b.1.total_cmp(&a.1));

		scored
			.into_iter()
			.map(|(category, score)| (category, score / max_score))
			.filter(|(_, confidence)| *confidence >= MIN_INTENT_CONFIDENCE)
			.take(max)
			.collect()
	}

	pub fn committee(&self, text: &str) -> Option<String> {
		longest_contained(&self.lexicon.committees, text)
	}

	pub fn tribunal(&self, text: &str) -> Option<String> {
		longest_contained(&self.lexicon.tribunals, text)
	}

	/// A question too vague to search: nothing but an ambiguity marker and at most one keyword.
	pub fn needs_clarification(&self, text: &str) -> bool {
		let folded = fold(text);

		if folded.chars().filter(|c| !c.is_whitespace()).count() <= 1 {
			return true;
		}
		if self.lexicon.ambiguous_queries.iter().any(|term| fold(term) == folded) {
			return true;
		}

		text::extract_keywords(text, &self.lexicon).is_empty()
	}
}

fn longest_contained(names: &[String], text: &str) -> Option<String> {
	names.iter().filter(|name| text.contains(name.as_str())).max_by_key(|name| name.len()).cloned()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn detector() -> IntentDetector {
		IntentDetector::new(Arc::new(Lexicon::embedded().expect("Embedded lexicon must parse.")))
			.expect("Embedded intents must compile.")
	}

	#[test]
	fn article_reference_points_at_law() {
		let detected = detector().detect("형법 제250조", 3);

		assert_eq!(detected.first().map(|(category, _)| *category), Some(Category::Law));
	}

	#[test]
	fn mixed_question_detects_several_categories() {
		let detected = detector().detect("근로기준법 제2조와 관련 판례", 3);
		let categories: Vec<Category> = detected.iter().map(|(category, _)| *category).collect();

		assert!(categories.contains(&Category::Law));
		assert!(categories.contains(&Category::Precedent));
	}

	#[test]
	fn committee_names_are_extracted() {
		let detector = detector();

		assert_eq!(
			detector.committee("개인정보보호위원회 결정문 찾아줘").as_deref(),
			Some("개인정보보호위원회")
		);
		assert_eq!(detector.tribunal("조세심판원 사례").as_deref(), Some("조세심판원"));
		assert_eq!(detector.committee("판례 찾아줘"), None);
	}

	#[test]
	fn vague_questions_need_clarification() {
		let detector = detector();

		assert!(detector.needs_clarification("법"));
		assert!(detector.needs_clarification("알려주세요"));
		assert!(!detector.needs_clarification("부당해고 구제"));
	}
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
	category::Category,
	lexicon::{Lexicon, fold},
};

const KEYWORD_WEIGHT: f32 = 1.0;
const SYNONYM_WEIGHT: f32 = 0.5;
const MUST_INCLUDE_TERMS: usize = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainLabel {
	pub domain: String,
	/// Relative to the best-scoring domain for the same text.
	pub confidence: f32,
}

pub struct DomainClassifier {
	lexicon: Arc<Lexicon>,
	min_confidence: f32,
}
impl DomainClassifier {
	pub fn new(lexicon: Arc<Lexicon>, min_confidence: f32) -> Self {
		Self { lexicon, min_confidence }
	}

	/// All scoring domains, best first, at most `max_domains` of them.
	pub fn classify(&self, text: &str, max_domains: usize) -> Vec<DomainLabel> {
		let folded = fold(text);
		let mut scored: Vec<(usize, f32)> = Vec::new();

		for (idx, domain) in self.lexicon.domains.iter().enumerate() {
			let keyword_hits =
				domain.keywords.iter().filter(|kw| folded.contains(kw.as_str())).count();
			let synonym_hits =
				domain.synonyms.iter().filter(|syn| folded.contains(syn.as_str())).count();
			let score = keyword_hits as f32 * KEYWORD_WEIGHT + synonym_hits as f32 * SYNONYM_WEIGHT;

			if score > 0.0 {
				scored.push((idx, score));
			}
		}

		let Some(max_score) = scored.iter().map(|(_, score)| *score).reduce(f32::max) else {
			return Vec::new();
		};

		// Stable sort keeps table order among equal scores.
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		scored.truncate(max_domains);

		scored
			.into_iter()
			.map(|(idx, score)| DomainLabel {
				domain: self.lexicon.domains[idx].name.clone(),
				confidence: score / max_score,
			})
			.collect()
	}

	/// Labels at or above the confidence threshold.
	pub fn classify_confident(&self, text: &str, max_domains: usize) -> Vec<DomainLabel> {
		let mut labels = self.classify(text, max_domains);

		labels.retain(|label| label.confidence >= self.min_confidence);

		labels
	}

	/// One or two terms to pin a query to `domain`, preferring statute-like keywords.
	pub fn must_include_for(&self, domain: &str) -> Vec<String> {
		let Some(entry) = self.lexicon.domain(domain) else {
			return Vec::new();
		};
		let markers = &self.lexicon.must_include_markers;
		let legal: Vec<String> = entry
			.keywords
			.iter()
			.filter(|kw| markers.iter().any(|marker| kw.contains(marker.as_str())))
			.take(MUST_INCLUDE_TERMS)
			.cloned()
			.collect();

		if legal.is_empty() {
			entry.keywords.iter().take(MUST_INCLUDE_TERMS).cloned().collect()
		} else {
			legal
		}
	}

	pub fn categories_for(&self, domain: &str) -> &[Category] {
		self.lexicon.domain(domain).map(|entry| entry.categories.as_slice()).unwrap_or(&[])
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn classifier() -> DomainClassifier {
		DomainClassifier::new(Arc::new(Lexicon::embedded().expect("Embedded lexicon must parse.")), 0.3)
	}

	#[test]
	fn best_domain_has_full_confidence() {
		let labels = classifier().classify("프리랜서인데 출퇴근 통제를 받았고 월급도 체불됐어요", 3);

		assert_eq!(labels[0].domain, "근로자성");
		assert_eq!(labels[0].confidence, 1.0);
		assert!(labels.iter().all(|label| (0.0..=1.0).contains(&label.confidence)));
		assert!(labels.windows(2).all(|pair| pair[0].confidence >= pair[1].confidence));
	}

	#[test]
	fn synonyms_weigh_half_a_keyword() {
		let labels = classifier().classify("프라이버시 그리고 계약", 5);
		let privacy = labels.iter().find(|label| label.domain == "개인정보").map(|l| l.confidence);

		assert_eq!(labels[0].domain, "계약");
		assert_eq!(privacy, Some(0.5));
	}

	#[test]
	fn unrelated_text_has_no_labels() {
		assert!(classifier().classify("오늘 날씨 어때", 3).is_empty());
	}

	#[test]
	fn low_confidence_labels_are_filtered() {
		let labels = classifier()
			.classify_confident("해고 부당해고 정리해고 징계해고 권리남용 그리고 상여금", 5);

		assert_eq!(labels.len(), 1);
		assert_eq!(labels[0].domain, "부당해고");
	}

	#[test]
	fn must_include_prefers_law_like_terms() {
		let classifier = classifier();

		assert_eq!(classifier.must_include_for("근로자성"), vec!["사용종속관계", "근로기준법"]);
		assert_eq!(classifier.must_include_for("임금체불"), vec!["임금", "체불"]);
		assert_eq!(classifier.must_include_for("없는도메인"), Vec::<String>::new());
	}
}

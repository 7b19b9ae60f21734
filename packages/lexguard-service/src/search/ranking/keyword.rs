use lexguard_domain::{lexicon::Lexicon, result::NormalizedResult};

use super::RerankQuery;

const GENERAL_WEIGHT: f32 = 1.0;
const LEGAL_WEIGHT: f32 = 2.0;
const TITLE_BONUS: f32 = 0.3;

/// Weighted keyword coverage of title and summary, in `[0, 1]`.
pub fn keyword_scores(results: &[NormalizedResult], query: RerankQuery<'_>, lexicon: &Lexicon) -> Vec<f32> {
	let terms = query.terms(lexicon);
	let weights: Vec<f32> = terms
		.iter()
		.map(|term| if lexicon.is_core(term) { LEGAL_WEIGHT } else { GENERAL_WEIGHT })
		.collect();
	let max_score = weights.iter().sum::<f32>() + TITLE_BONUS * terms.len() as f32;

	if max_score <= 0.0 {
		return vec![0.0; results.len()];
	}

	results
		.iter()
		.map(|result| {
			let haystack = result.searchable_text();
			let title = result.title.to_lowercase();
			let mut score = 0.0;

			for (term, weight) in terms.iter().zip(&weights) {
				if haystack.contains(term.as_str()) {
					score += weight;
				}
				if title.contains(term.as_str()) {
					score += TITLE_BONUS;
				}
			}

			score / max_score
		})
		.collect()
}

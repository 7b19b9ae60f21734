use std::collections::HashMap;

use lexguard_domain::{lexicon::Lexicon, result::NormalizedResult, text};

use super::RerankQuery;

const K1: f32 = 1.5;
const B: f32 = 0.75;
const CORE_BONUS: f32 = 0.5;

/// Okapi BM25 over the candidate set itself, plus a bonus per legal-core query term present.
pub fn bm25_scores(results: &[NormalizedResult], query: RerankQuery<'_>, lexicon: &Lexicon) -> Vec<f32> {
	let docs: Vec<Vec<String>> = results
		.iter()
		.map(|result| text::tokenize(&format!("{} {}", result.title, result.summary)))
		.collect();
	let mut terms: Vec<String> = Vec::new();

	for term in query.terms(lexicon).iter().flat_map(|term| text::tokenize(term)) {
		if !terms.contains(&term) {
			terms.push(term);
		}
	}

	if docs.is_empty() || terms.is_empty() {
		return vec![0.0; results.len()];
	}

	let n = docs.len() as f32;
	let avg_len = (docs.iter().map(Vec::len).sum::<usize>() as f32 / n).max(1.0);
	let idf: Vec<f32> = terms
		.iter()
		.map(|term| {
			let df = docs.iter().filter(|doc| doc.contains(term)).count() as f32;

			((n - df + 0.5) / (df + 0.5) + 1.0).ln()
		})
		.collect();

	docs.iter()
		.map(|doc| {
			let mut tf: HashMap<&str, f32> = HashMap::new();

			for token in doc {
				*tf.entry(token.as_str()).or_default() += 1.0;
			}

			let len_norm = 1.0 - B + B * doc.len() as f32 / avg_len;
			let mut score = 0.0;

			for (term, idf) in terms.iter().zip(&idf) {
				let Some(freq) = tf.get(term.as_str()) else {
					continue;
				};

				score += idf * freq * (K1 + 1.0) / (freq + K1 * len_norm);

				if lexicon.is_core(term) {
					score += CORE_BONUS;
				}
			}

			score
		})
		.collect()
}

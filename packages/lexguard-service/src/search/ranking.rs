//! Heuristic reranking of provider results, which arrive without any relevance order.

mod bm25;
mod fusion;
mod keyword;

pub use bm25::bm25_scores;
pub use fusion::borda_fuse;
pub use keyword::keyword_scores;

use lexguard_config::RerankMode;
use lexguard_domain::{
	lexicon::{Lexicon, fold},
	result::NormalizedResult,
	text,
};

/// Query-side inputs shared by every scorer.
#[derive(Clone, Copy, Debug, Default)]
pub struct RerankQuery<'a> {
	pub query: &'a str,
	pub issue_type: Option<&'a str>,
	pub must_include: &'a [String],
}
impl RerankQuery<'_> {
	/// Query keywords, then must-include terms, then the issue type, folded and de-duplicated.
	pub fn terms(&self, lexicon: &Lexicon) -> Vec<String> {
		let mut terms = text::extract_keywords(self.query, lexicon);
		let extra = self.must_include.iter().map(String::as_str).chain(self.issue_type);

		for term in extra.map(fold).filter(|term| !term.is_empty()) {
			if !terms.contains(&term) {
				terms.push(term);
			}
		}

		terms
	}
}

pub fn rerank(
	mode: RerankMode,
	results: Vec<NormalizedResult>,
	query: RerankQuery<'_>,
	lexicon: &Lexicon,
) -> Vec<NormalizedResult> {
	if results.len() < 2 {
		return results;
	}

	let order = match mode {
		RerankMode::Keyword => order_by(&keyword_scores(&results, query, lexicon)),
		RerankMode::Bm25 => order_by(&bm25_scores(&results, query, lexicon)),
		RerankMode::Hybrid => {
			let keyword = order_by(&keyword_scores(&results, query, lexicon));
			let bm25 = order_by(&bm25_scores(&results, query, lexicon));

			borda_fuse(&[keyword, bm25], results.len())
		},
	};
	let mut slots: Vec<Option<NormalizedResult>> = results.into_iter().map(Some).collect();
	let mut ranked: Vec<NormalizedResult> = Vec::with_capacity(slots.len());

	for idx in order {
		let Some(result) = slots.get_mut(idx).and_then(Option::take) else {
			continue;
		};

		if ranked.iter().any(|kept| kept.id == result.id && kept.source == result.source) {
			continue;
		}

		ranked.push(result);
	}

	ranked
}

/// Indices sorted by score descending; equal scores keep input order.
fn order_by(scores: &[f32]) -> Vec<usize> {
	let mut order: Vec<usize> = (0..scores.len()).collect();

	order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));

	order
}

#[cfg(test)]
mod tests {
	use serde_json::Value;

	use super::*;
	use lexguard_domain::category::Category;

	pub(super) fn result(id: &str, title: &str, summary: &str) -> NormalizedResult {
		NormalizedResult {
			id: id.to_string(),
			title: title.to_string(),
			court: None,
			date: None,
			summary: summary.to_string(),
			url: None,
			source: Category::Precedent,
			case_number: None,
			raw_data: Value::Null,
		}
	}

	pub(super) fn lexicon() -> Lexicon {
		Lexicon::embedded().expect("Embedded lexicon must parse.")
	}

	#[test]
	fn hybrid_puts_the_most_relevant_result_first() {
		let results = vec![
			result("1", "손해배상(기)", "교통사고로 인한 손해배상 범위"),
			result("2", "근로자지위확인", "근로자성 판단 기준과 사용종속관계"),
			result("3", "임대차보증금", "보증금 반환 청구"),
		];
		let query = RerankQuery { query: "근로자성 사용종속관계", ..RerankQuery::default() };
		let ranked = rerank(RerankMode::Hybrid, results, query, &lexicon());

		assert_eq!(ranked[0].id, "2");
		assert_eq!(ranked.len(), 3);
	}

	#[test]
	fn duplicate_ids_are_dropped() {
		let results = vec![
			result("1", "근로자지위확인", "근로자성"),
			result("1", "근로자지위확인", "근로자성"),
			result("2", "해고무효확인", "해고"),
		];
		let query = RerankQuery { query: "근로자성", ..RerankQuery::default() };
		let ranked = rerank(RerankMode::Hybrid, results, query, &lexicon());

		assert_eq!(ranked.len(), 2);
	}

	#[test]
	fn ties_keep_provider_order() {
		let results =
			vec![result("a", "무관한 사건", "내용"), result("b", "다른 사건", "내용"), result("c", "또 다른 사건", "내용")];
		let query = RerankQuery { query: "근로자성", ..RerankQuery::default() };

		for mode in [RerankMode::Keyword, RerankMode::Bm25, RerankMode::Hybrid] {
			let ids: Vec<String> = rerank(mode, results.clone(), query, &lexicon())
				.into_iter()
				.map(|result| result.id)
				.collect();

			assert_eq!(ids, vec!["a", "b", "c"]);
		}
	}

	#[test]
	fn terms_merge_must_include_and_issue_type() {
		let must_include = vec!["근로기준법".to_string()];
		let query = RerankQuery {
			query: "프리랜서 임금",
			issue_type: Some("임금체불"),
			must_include: &must_include,
		};

		assert_eq!(query.terms(&lexicon()), vec!["프리랜서", "임금", "근로기준법", "임금체불"]);
	}
}

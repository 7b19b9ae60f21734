use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
	LexguardService,
	search::{
		Citation, FailedCategory, MissingReason, ReferenceNote, ResultBundle, SearchContext,
		fallback::CategoryRun,
		ranking::{self, RerankQuery},
	},
};
use lexguard_domain::{
	category::Category,
	evidence::{self, Evidence},
	result::NormalizedResult,
	text,
};

const HEADLINE_CHARS: usize = 80;
const DEFAULT_ISSUE: &str = "일반";

impl LexguardService {
	pub(crate) fn assemble(
		&self,
		trace_id: Uuid,
		ctx: &SearchContext,
		runs: Vec<CategoryRun>,
		aborted: Vec<Category>,
	) -> ResultBundle {
		let issue_type =
			ctx.issue_type.clone().or_else(|| ctx.domains.first().map(|label| label.domain.clone()));
		let must_include =
			if ctx.must_include.is_empty() { &ctx.domain_terms } else { &ctx.must_include };
		let fallback_used = runs.iter().any(|run| run.attempts.len() > 1);
		let mut attempts = Vec::new();
		let mut failed_categories = Vec::new();
		let mut results: BTreeMap<Category, Vec<NormalizedResult>> = BTreeMap::new();
		let mut ordered: Vec<NormalizedResult> = Vec::new();

		for run in runs {
			if !run.attempts.is_empty() && run.attempts.iter().all(|attempt| !attempt.success) {
				let message = run
					.attempts
					.iter()
					.rev()
					.find_map(|attempt| attempt.error.clone())
					.unwrap_or_default();

				failed_categories.push(FailedCategory {
					category: run.category,
					reason: MissingReason::from_attempts(&run.attempts),
					message,
				});
			}

			tracing::debug!(
				category = %run.category,
				total = run.total,
				verdict = ?run.verdict,
				attempts = run.attempts.len(),
				"Category search settled."
			);

			attempts.extend(run.attempts);

			if run.results.is_empty() {
				continue;
			}

			let mut ranked = ranking::rerank(
				self.cfg.search.rerank_mode,
				run.results,
				RerankQuery { query: &ctx.query, issue_type: issue_type.as_deref(), must_include },
				&self.lexicon,
			);

			ranked.truncate(ctx.per_page as usize);
			ordered.extend(ranked.iter().cloned());
			results.insert(run.category, ranked);
		}

		for category in aborted {
			failed_categories.push(FailedCategory {
				category,
				reason: MissingReason::NotSearched,
				message: "Category search did not complete.".to_string(),
			});
		}

		let evidence = self.evidence.build(
			&ordered,
			&ctx.query,
			issue_type.as_deref(),
			self.cfg.search.max_evidence,
		);
		let evidence_summary = evidence::summarize(&evidence);
		let citations = ordered
			.iter()
			.take(self.cfg.search.max_citations)
			.map(|result| Citation {
				kind: result.source,
				id: result.id.clone(),
				name: result.title.clone(),
				source: result.court.clone().or_else(|| result.url.clone()),
			})
			.collect::<Vec<_>>();
		let sources_count = ordered.len();
		let missing_reason =
			if sources_count == 0 { Some(MissingReason::from_attempts(&attempts)) } else { None };
		let reference_facts = match missing_reason {
			Some(reason) if reason.is_provider_unavailable() => self.reference_notes(ctx),
			_ => Vec::new(),
		};
		let has_legal_basis = sources_count > 0 && !evidence.is_empty();
		let display_text = match missing_reason {
			Some(reason) => missing_text(reason, &reference_facts),
			None => legal_basis_text(issue_type.as_deref(), &evidence, &ordered, &evidence_summary),
		};
		let one_line_answer = (sources_count > 0).then(|| {
			one_line_answer(&ctx.query, issue_type.as_deref(), sources_count, &evidence, &ordered)
		});

		ResultBundle {
			trace_id,
			query: ctx.query.clone(),
			results,
			attempts,
			domains: ctx.domains.clone(),
			issue_type,
			citations,
			evidence,
			evidence_summary,
			one_line_answer,
			missing_reason,
			failed_categories,
			fallback_used,
			clarification_needed: false,
			has_legal_basis,
			sources_count,
			reference_facts,
			display_text,
		}
	}

	pub(crate) fn clarification_bundle(&self, trace_id: Uuid, query: String) -> ResultBundle {
		let domains = if query.is_empty() { Vec::new() } else { self.classify(&query, 3) };

		ResultBundle {
			trace_id,
			query,
			results: BTreeMap::new(),
			attempts: Vec::new(),
			domains,
			issue_type: None,
			citations: Vec::new(),
			evidence: Vec::new(),
			evidence_summary: String::new(),
			one_line_answer: None,
			missing_reason: Some(MissingReason::NotSearched),
			failed_categories: Vec::new(),
			fallback_used: false,
			clarification_needed: true,
			has_legal_basis: false,
			sources_count: 0,
			reference_facts: Vec::new(),
			display_text: missing_text(MissingReason::NotSearched, &[]),
		}
	}

	fn reference_notes(&self, ctx: &SearchContext) -> Vec<ReferenceNote> {
		ctx.domains
			.iter()
			.flat_map(|label| self.lexicon.reference_facts_for(&label.domain))
			.map(|fact| ReferenceNote {
				domain: fact.domain.clone(),
				source: fact.source.clone(),
				text: fact.text.clone(),
				authoritative: false,
			})
			.collect()
	}
}

fn headline(evidence: &[Evidence], results: &[NormalizedResult]) -> String {
	let raw = evidence
		.first()
		.map(|item| item.text.as_str())
		.or_else(|| results.first().map(|result| result.title.as_str()))
		.unwrap_or_default();

	text::clip_chars(raw, HEADLINE_CHARS)
}

fn legal_basis_text(
	issue_type: Option<&str>,
	evidence: &[Evidence],
	results: &[NormalizedResult],
	evidence_summary: &str,
) -> String {
	let mut out = format!(
		"법적 근거 요약: 유형={}, 근거 수={}, 주요 근거={}",
		issue_type.unwrap_or(DEFAULT_ISSUE),
		evidence.len(),
		headline(evidence, results)
	);

	if !evidence_summary.is_empty() {
		out.push('\n');
		out.push_str(evidence_summary);
	}

	out
}

fn one_line_answer(
	query: &str,
	issue_type: Option<&str>,
	sources_count: usize,
	evidence: &[Evidence],
	results: &[NormalizedResult],
) -> String {
	let subject = issue_type.unwrap_or(query);

	format!(
		"'{subject}' 관련 근거 {sources_count}건을 찾았습니다. 대표 근거: {}",
		headline(evidence, results)
	)
}

/// No legal conclusion is ever drawn when the provider could not be searched.
pub(crate) fn missing_text(reason: MissingReason, reference_facts: &[ReferenceNote]) -> String {
	let mut out = match reason {
		MissingReason::ProviderNotConfigured =>
			"법령 검색 API 인증키가 설정되지 않아 검색을 수행하지 못했습니다. 법적 결론을 제시하지 않습니다.",
		MissingReason::ProviderFormatError =>
			"법령 검색 API가 올바르지 않은 형식(HTML 등)의 응답을 반환했습니다. 법적 결론을 제시하지 않습니다.",
		MissingReason::ProviderTimeout =>
			"법령 검색 API 응답 시간이 초과되었습니다. 잠시 후 다시 시도해 주세요.",
		MissingReason::ProviderTransportError =>
			"법령 검색 API에 연결하지 못했습니다. 잠시 후 다시 시도해 주세요.",
		MissingReason::NoMatch => "검색 조건에 맞는 법령이나 판례를 찾지 못했습니다.",
		MissingReason::NotSearched =>
			"질문이 구체적이지 않아 검색을 수행하지 않았습니다. 사건 유형이나 관련 법령을 알려 주세요.",
	}
	.to_string();

	if !reference_facts.is_empty() {
		out.push_str("\n참고 정보(공식 검색 결과 아님):");

		for fact in reference_facts {
			out.push_str(&format!("\n- {} ({})", fact.text, fact.source));
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unavailable_provider_text_draws_no_conclusion() {
		let text = missing_text(MissingReason::ProviderFormatError, &[]);

		assert!(text.contains("법적 결론을 제시하지 않습니다"));
	}

	#[test]
	fn reference_facts_are_labeled_unofficial() {
		let facts = [ReferenceNote {
			domain: "부당해고".to_string(),
			source: "근로기준법 제23조 제1항".to_string(),
			text: "정당한 이유 없는 해고 금지".to_string(),
			authoritative: false,
		}];
		let text = missing_text(MissingReason::ProviderNotConfigured, &facts);

		assert!(text.contains("공식 검색 결과 아님"));
		assert!(text.contains("근로기준법 제23조 제1항"));
	}

	#[test]
	fn legal_basis_block_leads_with_summary_line() {
		let text = legal_basis_text(None, &[], &[], "");

		assert_eq!(text, "법적 근거 요약: 유형=일반, 근거 수=0, 주요 근거=");
	}
}

//! Screening of pasted contracts and terms of service.
//!
//! Rules come from the lexicon's `[document]` tables. The analyzer only flags clauses and names
//! searches; grounding those searches is the service's job.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use crate::lexicon::{Lexicon, fold};

const MAX_CLAUSES: usize = 10;
const MAX_CLAUSE_ISSUES: usize = 10;
const MAX_CLAUSE_QUERIES: usize = 5;
const DEFAULT_KIND: &str = "계약서";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentRisk {
	pub issue: String,
	pub risk: String,
	pub related_clause: String,
}

/// One clause with its tags and the searches suggested for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClauseIssue {
	pub clause: String,
	pub tags: Vec<String>,
	pub queries: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentAnalysis {
	pub kind: String,
	pub clauses: Vec<String>,
	pub risks: Vec<DocumentRisk>,
	pub clause_issues: Vec<ClauseIssue>,
	pub suggested_queries: Vec<String>,
}

pub struct DocumentAnalyzer {
	lexicon: Arc<Lexicon>,
	heading_re: Option<Regex>,
	clause_re: Option<Regex>,
}
impl DocumentAnalyzer {
	pub fn new(lexicon: Arc<Lexicon>) -> Self {
		Self {
			lexicon,
			heading_re: Regex::new(r"제\s*\d+\s*조").ok(),
			clause_re: Regex::new(r"제\s*\d+\s*조[^\n]*").ok(),
		}
	}

	pub fn is_document(&self, text: &str) -> bool {
		let folded = fold(text);

		self.lexicon.document.markers.iter().any(|marker| folded.contains(marker.as_str()))
			|| self.heading_re.as_ref().is_some_and(|re| re.is_match(text))
	}

	/// `None` when the text reads as a question rather than a document.
	pub fn analyze(&self, text: &str) -> Option<DocumentAnalysis> {
		if !self.is_document(text) {
			return None;
		}

		let rules = &self.lexicon.document;
		let folded = fold(text);
		let clauses: Vec<String> = self
			.clause_re
			.as_ref()
			.map(|re| re.find_iter(text).map(|found| found.as_str().trim().to_string()).collect())
			.unwrap_or_default();
		let risks = rules
			.risks
			.iter()
			.filter(|rule| rule.when.matches(&folded))
			.map(|rule| DocumentRisk {
				issue: rule.issue.clone(),
				risk: rule.risk.clone(),
				related_clause: rule.clause.clone(),
			})
			.collect();
		let clause_issues = clauses
			.iter()
			.filter_map(|clause| self.clause_issue(clause))
			.take(MAX_CLAUSE_ISSUES)
			.collect();
		let kind = rules.kinds.iter().find(|kind| {
			kind.markers.is_empty()
				|| kind.markers.iter().any(|marker| folded.contains(marker.as_str()))
		});

		Some(DocumentAnalysis {
			kind: kind.map_or_else(|| DEFAULT_KIND.to_string(), |kind| kind.kind.clone()),
			clauses: clauses.into_iter().take(MAX_CLAUSES).collect(),
			risks,
			clause_issues,
			suggested_queries: kind.map(|kind| kind.queries.clone()).unwrap_or_default(),
		})
	}

	fn clause_issue(&self, clause: &str) -> Option<ClauseIssue> {
		let folded = fold(clause);
		let mut tags = Vec::new();
		let mut queries: Vec<String> = Vec::new();

		for rule in self.lexicon.document.clause_tags.iter().filter(|rule| rule.when.matches(&folded))
		{
			tags.push(rule.tag.clone());

			for query in &rule.queries {
				if !queries.contains(query) {
					queries.push(query.clone());
				}
			}
		}

		if tags.is_empty() {
			return None;
		}

		queries.truncate(MAX_CLAUSE_QUERIES);

		Some(ClauseIssue { clause: clause.to_string(), tags, queries })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn analyzer() -> DocumentAnalyzer {
		DocumentAnalyzer::new(Arc::new(Lexicon::embedded().expect("Failed to load lexicon.")))
	}

	const LEASE: &str = "주택 임대차 계약서\n\
		제1조 임대인은 보증금 반환을 사정에 따라 지연할 수 있다.\n\
		제2조 임대인은 임차인이 내부 기준을 어길 경우 즉시 해지할 수 있다.\n\
		제3조 계약 기간은 2년으로 하며 갱신은 협의한다.";

	#[test]
	fn lease_contract_is_screened() {
		let analysis = analyzer().analyze(LEASE).expect("Expected a document.");
		let issues: Vec<&str> = analysis.risks.iter().map(|risk| risk.issue.as_str()).collect();

		assert_eq!(analysis.kind, "임대차 계약");
		assert_eq!(analysis.clauses.len(), 3);
		assert!(analysis.clauses[0].starts_with("제1조"));
		assert_eq!(
			issues,
			vec!["일방적 즉시 해지 조항", "보증금 반환 지연 조항", "일방 기준 준용", "갱신/연장 조건"]
		);
		assert_eq!(analysis.clause_issues[0].tags, vec!["보증금 반환"]);
		assert_eq!(analysis.clause_issues[1].tags, vec!["해지 요건", "특약 효력"]);
		assert_eq!(analysis.suggested_queries.len(), 6);
	}

	#[test]
	fn clause_queries_are_deduplicated_and_capped() {
		let analysis = analyzer()
			.analyze("이용약관\n제5조 환불은 불가하며 회사는 손해에 대한 책임을 지지 않는다.")
			.expect("Expected a document.");
		let clause = &analysis.clause_issues[0];

		assert_eq!(clause.tags, vec!["환불 제한", "책임 제한"]);
		assert_eq!(clause.queries.len(), 5);
		assert_eq!(analysis.kind, "약관·일반 계약");
		assert!(analysis.risks.iter().any(|risk| risk.issue == "환불 제한 조항"));
	}

	#[test]
	fn labor_markers_win_over_lease_markers() {
		let analysis = analyzer()
			.analyze("용역 계약서\n제1조 수급인은 임대인 사무실에 출퇴근한다.")
			.expect("Expected a document.");

		assert_eq!(analysis.kind, "근로·용역 계약");
		assert!(analysis.suggested_queries.iter().any(|query| query == "근로자성 판단 기준"));
	}

	#[test]
	fn plain_question_is_not_a_document() {
		assert_eq!(analyzer().analyze("프리랜서도 퇴직금을 받을 수 있나요?"), None);
	}
}

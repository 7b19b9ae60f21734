//! Contract and terms-of-service review: screen the clauses, then ground each flagged clause with
//! an ordinary search.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	Error, LexguardService, Result,
	search::{Citation, MissingReason, SearchRequest, assemble::missing_text},
};
use lexguard_domain::{category::Category, document::DocumentAnalysis, text};

const DEFAULT_CLAUSES: usize = 3;
const MAX_CLAUSES: usize = 10;
const QUERIES_PER_CLAUSE: usize = 2;
const DEFAULT_RESULTS: u32 = 3;
const MAX_FINDING_SOURCES: usize = 5;
const MAX_CITATIONS: usize = 10;
const MAX_SUGGESTED: usize = 6;
const CLAUSE_CHARS: usize = 80;
const NOT_A_DOCUMENT: &str = "계약서나 약관으로 보이지 않아 조항 검토를 수행하지 않았습니다.";
const CATEGORIES: [Category; 3] = [Category::Law, Category::Precedent, Category::Interpretation];

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DocumentRequest {
	pub text: String,
	/// Ground flagged clauses with searches; `false` returns the screening alone.
	pub auto_search: bool,
	pub max_clauses: Option<usize>,
	pub max_results_per_category: Option<u32>,
}
impl Default for DocumentRequest {
	fn default() -> Self {
		Self {
			text: String::new(),
			auto_search: true,
			max_clauses: None,
			max_results_per_category: None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
	/// The clause's searches found legal sources.
	High,
	Medium,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClauseSearch {
	pub clause: String,
	pub query: String,
	pub sources_count: usize,
	pub missing_reason: Option<MissingReason>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RiskFinding {
	pub clause: String,
	pub risk_level: RiskLevel,
	pub why: String,
	pub precedents: Vec<String>,
	pub citations: Vec<Citation>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DocumentReport {
	pub trace_id: Uuid,
	pub detected: bool,
	pub analysis: Option<DocumentAnalysis>,
	pub findings: Vec<RiskFinding>,
	pub searches: Vec<ClauseSearch>,
	pub searched_clauses: usize,
	pub citations: Vec<Citation>,
	pub has_legal_basis: bool,
	pub missing_reason: Option<MissingReason>,
	pub legal_basis_text: String,
	pub suggested_queries: Vec<String>,
}

impl LexguardService {
	pub async fn analyze_document(&self, req: DocumentRequest) -> Result<DocumentReport> {
		let trace_id = Uuid::new_v4();
		let body = req.text.trim();

		if body.is_empty() {
			return Err(Error::InvalidRequest { message: "text must not be empty.".to_string() });
		}

		let max_clauses = req.max_clauses.unwrap_or(DEFAULT_CLAUSES);

		if !(1..=MAX_CLAUSES).contains(&max_clauses) {
			return Err(Error::InvalidRequest {
				message: format!("max_clauses must be in the range 1-{MAX_CLAUSES}."),
			});
		}

		let per_page =
			self.resolve_per_page(Some(req.max_results_per_category.unwrap_or(DEFAULT_RESULTS)))?;
		let Some(analysis) = self.documents.analyze(body) else {
			tracing::info!(%trace_id, "Text is not a contract or terms document.");

			return Ok(DocumentReport {
				trace_id,
				detected: false,
				analysis: None,
				findings: Vec::new(),
				searches: Vec::new(),
				searched_clauses: 0,
				citations: Vec::new(),
				has_legal_basis: false,
				missing_reason: Some(MissingReason::NotSearched),
				legal_basis_text: NOT_A_DOCUMENT.to_string(),
				suggested_queries: Vec::new(),
			});
		};
		let mut findings = Vec::new();
		let mut searches = Vec::new();

		if req.auto_search {
			for issue in analysis.clause_issues.iter().take(max_clauses) {
				let mut queries = issue.queries.clone();

				for query in &analysis.suggested_queries {
					if queries.len() >= QUERIES_PER_CLAUSE {
						break;
					}
					if !queries.contains(query) {
						queries.push(query.clone());
					}
				}

				queries.truncate(QUERIES_PER_CLAUSE);

				let clause = text::clip_chars(&issue.clause, CLAUSE_CHARS);
				let mut precedents = Vec::new();
				let mut citations: Vec<Citation> = Vec::new();
				let mut sources = 0;

				for query in &queries {
					let bundle = self
						.search(SearchRequest {
							query: query.clone(),
							categories: CATEGORIES.to_vec(),
							max_results_per_category: Some(per_page),
							..SearchRequest::default()
						})
						.await?;

					sources += bundle.sources_count;

					for result in bundle.results.get(&Category::Precedent).into_iter().flatten() {
						let name =
							result.case_number.clone().unwrap_or_else(|| result.title.clone());

						if precedents.len() < MAX_FINDING_SOURCES && !precedents.contains(&name) {
							precedents.push(name);
						}
					}
					for citation in bundle.citations {
						if citations.len() < MAX_FINDING_SOURCES
							&& !citations.iter().any(|seen| same_citation(seen, &citation))
						{
							citations.push(citation);
						}
					}

					searches.push(ClauseSearch {
						clause: clause.clone(),
						query: query.clone(),
						sources_count: bundle.sources_count,
						missing_reason: bundle.missing_reason,
					});
				}

				let why = citations
					.first()
					.map(|citation| citation.name.clone())
					.or_else(|| queries.first().cloned())
					.unwrap_or_default();
				let risk_level = if sources > 0 || !citations.is_empty() {
					RiskLevel::High
				} else {
					RiskLevel::Medium
				};

				findings.push(RiskFinding { clause, risk_level, why, precedents, citations });
			}
		}

		let mut citations: Vec<Citation> = Vec::new();

		for citation in findings.iter().flat_map(|finding| &finding.citations) {
			if citations.len() < MAX_CITATIONS
				&& !citations.iter().any(|seen| same_citation(seen, citation))
			{
				citations.push(citation.clone());
			}
		}

		let mut searched: Vec<&str> =
			searches.iter().map(|search| search.clause.as_str()).collect();

		searched.dedup();

		let searched_clauses = searched.len();
		let has_legal_basis = searches.iter().any(|search| search.sources_count > 0);
		let missing_reason = if has_legal_basis {
			None
		} else {
			Some(
				searches
					.iter()
					.filter_map(|search| search.missing_reason)
					.min()
					.unwrap_or(MissingReason::NotSearched),
			)
		};
		let legal_basis_text = match missing_reason {
			None => basis_text(&analysis, &findings),
			Some(reason) => missing_text(reason, &[]),
		};
		let suggested_queries =
			analysis.suggested_queries.iter().take(MAX_SUGGESTED).cloned().collect();

		tracing::info!(
			%trace_id,
			kind = %analysis.kind,
			risks = analysis.risks.len(),
			searches = searches.len(),
			basis = has_legal_basis,
			"Document review finished."
		);

		Ok(DocumentReport {
			trace_id,
			detected: true,
			analysis: Some(analysis),
			findings,
			searches,
			searched_clauses,
			citations,
			has_legal_basis,
			missing_reason,
			legal_basis_text,
			suggested_queries,
		})
	}
}

fn same_citation(a: &Citation, b: &Citation) -> bool {
	a.kind == b.kind && a.id == b.id
}

fn basis_text(analysis: &DocumentAnalysis, findings: &[RiskFinding]) -> String {
	let mut out = format!(
		"문서 검토 요약: 유형={}, 위험 조항={}건, 근거 확인 조항={}건",
		analysis.kind,
		analysis.risks.len(),
		findings.iter().filter(|finding| finding.risk_level == RiskLevel::High).count()
	);

	for finding in findings.iter().filter(|finding| finding.risk_level == RiskLevel::High) {
		out.push_str(&format!("\n- {}: {}", finding.clause, finding.why));
	}

	out
}

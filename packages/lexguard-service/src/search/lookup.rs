//! Direct retrieval of one document by identifier, statute name or case number.

use serde::{Deserialize, Serialize};

use crate::{
	Error, LexguardService, Result,
	search::{
		MissingReason, SearchAttempt, Stage,
		fallback::{Outcome, AttemptSpec},
	},
};
use lexguard_domain::{
	category::Category,
	evidence::Evidence,
	provision,
	result::{DetailKey, DetailRequest, NormalizedResult, ProviderFilters},
	window::DateWindow,
};

const STRATEGY_DETAIL: &str = "detail";
const STRATEGY_CASE_NUMBER: &str = "case_number_search";
const STRATEGY_NAME: &str = "name_search";
const CANDIDATES: u32 = 10;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LookupRequest {
	/// Defaults to precedents for a case number and to statutes otherwise.
	pub category: Option<Category>,
	pub id: Option<String>,
	/// Statute name, e.g. `근로기준법`.
	pub name: Option<String>,
	/// Precedent case number, e.g. `2018다239110`.
	pub case_number: Option<String>,
	/// Statute article: `제10조의2`, `10` or a six-digit code.
	pub article: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LookupResponse {
	pub category: Category,
	/// The key the document was finally fetched by.
	pub key: Option<DetailKey>,
	pub article: Option<String>,
	pub result: Option<NormalizedResult>,
	pub evidence: Vec<Evidence>,
	pub attempts: Vec<SearchAttempt>,
	pub missing_reason: Option<MissingReason>,
}

enum Target {
	Key(DetailKey),
	CaseNumber(String),
}

impl LexguardService {
	/// Case numbers resolve through a precedent search first. A statute name the detail endpoint
	/// does not know verbatim falls back to a title search.
	pub async fn lookup(&self, req: LookupRequest) -> Result<LookupResponse> {
		let (category, target, article) = parse_request(&req)?;
		let mut attempts = Vec::new();
		let mut key = match target {
			Target::Key(key) => Some(key),
			Target::CaseNumber(case_number) =>
				self.resolve_case_number(&case_number, &mut attempts).await,
		};
		let mut result = match &key {
			Some(key) =>
				self.fetch_one(category, key.clone(), article.clone(), &mut attempts).await,
			None => None,
		};

		if result.is_none()
			&& attempts.last().is_some_and(|attempt| attempt.success)
			&& let Some(DetailKey::Name(name)) = &key
			&& let Some(id) = self.resolve_statute_name(name, &mut attempts).await
		{
			let by_id = DetailKey::Id(id);

			result = self.fetch_one(category, by_id.clone(), article.clone(), &mut attempts).await;
			key = Some(by_id);
		}

		self.telemetry.record_attempts(&attempts);

		let evidence = match &result {
			Some(found) => self.evidence.build(
				std::slice::from_ref(found),
				&found.title,
				None,
				self.cfg.search.max_evidence,
			),
			None => Vec::new(),
		};
		let missing_reason = result.is_none().then(|| MissingReason::from_attempts(&attempts));

		tracing::info!(
			%category,
			key = ?key,
			found = result.is_some(),
			attempts = attempts.len(),
			"Lookup finished."
		);

		Ok(LookupResponse { category, key, article, result, evidence, attempts, missing_reason })
	}

	async fn fetch_one(
		&self,
		category: Category,
		key: DetailKey,
		article: Option<String>,
		attempts: &mut Vec<SearchAttempt>,
	) -> Option<NormalizedResult> {
		let label = match article.as_deref().and_then(provision::article_label) {
			Some(article) => format!("{} {article}", key.value()),
			None => key.value().to_string(),
		};
		let request = DetailRequest { category, key, article };
		let Outcome { attempt, results } =
			self.lookup_attempt(Stage::A, STRATEGY_DETAIL, &request, &label, &[]).await;

		attempts.push(attempt);

		results.into_iter().next()
	}

	/// Exact case number, then a suffix match, then the first hit.
	async fn resolve_case_number(
		&self,
		case_number: &str,
		attempts: &mut Vec<SearchAttempt>,
	) -> Option<DetailKey> {
		let results = self
			.candidates(Category::Precedent, STRATEGY_CASE_NUMBER, case_number, attempts)
			.await;
		let wanted = compact(case_number);
		let number = |result: &NormalizedResult| result.case_number.as_deref().map(compact);
		let chosen = results
			.iter()
			.find(|result| number(result).is_some_and(|found| found == wanted))
			.or_else(|| {
				results
					.iter()
					.find(|result| number(result).is_some_and(|found| found.ends_with(&wanted)))
			})
			.or_else(|| results.first());

		chosen.map(|result| DetailKey::Id(result.id.clone()))
	}

	/// Exact title, then a title containing the name, then the first hit.
	async fn resolve_statute_name(
		&self,
		name: &str,
		attempts: &mut Vec<SearchAttempt>,
	) -> Option<String> {
		let results = self.candidates(Category::Law, STRATEGY_NAME, name, attempts).await;
		let wanted = compact(name);
		let chosen = results
			.iter()
			.find(|result| compact(&result.title) == wanted)
			.or_else(|| results.iter().find(|result| compact(&result.title).contains(&wanted)))
			.or_else(|| results.first());

		chosen.map(|result| result.id.clone())
	}

	async fn candidates(
		&self,
		category: Category,
		strategy: &str,
		query: &str,
		attempts: &mut Vec<SearchAttempt>,
	) -> Vec<NormalizedResult> {
		let filters = ProviderFilters::default();
		let Outcome { attempt, results } = self
			.attempt(AttemptSpec {
				category,
				stage: Stage::A,
				strategy,
				query,
				window: DateWindow::Unbounded,
				filters: &filters,
				must_include: &[],
				per_page: CANDIDATES,
			})
			.await;

		attempts.push(attempt);

		results
	}
}

fn parse_request(req: &LookupRequest) -> Result<(Category, Target, Option<String>)> {
	let id = trimmed(req.id.as_deref());
	let name = trimmed(req.name.as_deref());
	let case_number = trimmed(req.case_number.as_deref());
	let category = req.category.unwrap_or(if case_number.is_some() {
		Category::Precedent
	} else {
		Category::Law
	});

	if matches!(category, Category::CommitteeDecision | Category::SpecialTribunal) {
		return Err(invalid(format!("{category} documents cannot be looked up directly.")));
	}

	let target = match (id, name, case_number) {
		(Some(id), None, None) => Target::Key(DetailKey::Id(id)),
		(None, Some(name), None) if category == Category::Law =>
			Target::Key(DetailKey::Name(name)),
		(None, Some(_), None) => return Err(invalid("name is only supported for statutes.")),
		(None, None, Some(number)) if category == Category::Precedent =>
			Target::CaseNumber(number),
		(None, None, Some(_)) =>
			return Err(invalid("case_number is only supported for precedents.")),
		_ => return Err(invalid("Exactly one of id, name or case_number is required.")),
	};
	let article = match req.article.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
		Some(_) if category != Category::Law =>
			return Err(invalid("article is only supported for statutes.")),
		Some(raw) => Some(
			provision::article_code(raw)
				.ok_or_else(|| invalid(format!("article {raw:?} is not an article number.")))?,
		),
		None => None,
	};

	Ok((category, target, article))
}

fn invalid(message: impl Into<String>) -> Error {
	Error::InvalidRequest { message: message.into() }
}

fn trimmed(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

fn compact(raw: &str) -> String {
	raw.chars().filter(|c| !c.is_whitespace()).collect()
}

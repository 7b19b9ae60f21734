//! Keyword tables shared by the planner, classifier, reranker and evidence extractor.
//!
//! The tables are data: an embedded default ships with the crate and a deployment may replace it
//! with its own TOML file.

use std::{
	collections::{HashMap, HashSet},
	fs,
	path::Path,
};

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use crate::{Error, Result, category::Category};

const EMBEDDED_LEXICON_TOML: &str = include_str!("../data/lexicon.toml");

#[derive(Clone, Debug, Deserialize)]
pub struct Lexicon {
	pub stopwords: Vec<String>,
	pub legal_core: Vec<String>,
	#[serde(default)]
	pub must_include_markers: Vec<String>,
	#[serde(default)]
	pub ambiguous_queries: Vec<String>,
	#[serde(default)]
	pub fact_patterns: Vec<String>,
	#[serde(default)]
	pub committees: Vec<String>,
	#[serde(default)]
	pub tribunals: Vec<String>,
	#[serde(default)]
	pub synonyms: Vec<SynonymEntry>,
	pub domains: Vec<DomainEntry>,
	#[serde(default)]
	pub legal_axis: Vec<AxisEntry>,
	#[serde(default)]
	pub tags: Vec<TagEntry>,
	#[serde(default)]
	pub intents: Vec<IntentEntry>,
	#[serde(default)]
	pub reference_facts: Vec<ReferenceFact>,
	#[serde(default)]
	pub document: DocumentRules,
	#[serde(skip)]
	stopword_set: HashSet<String>,
	#[serde(skip)]
	synonym_index: HashMap<String, usize>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SynonymEntry {
	pub term: String,
	pub alternatives: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DomainEntry {
	pub name: String,
	pub keywords: Vec<String>,
	#[serde(default)]
	pub synonyms: Vec<String>,
	/// Categories searched first when this domain is detected.
	#[serde(default)]
	pub categories: Vec<Category>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AxisEntry {
	pub issue: String,
	pub terms: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TagEntry {
	pub name: String,
	pub patterns: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IntentEntry {
	pub category: Category,
	#[serde(default)]
	pub keywords: Vec<String>,
	/// Regular expressions; a match weighs twice a keyword hit.
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// A static, non-authoritative statement offered when live search cannot run.
#[derive(Clone, Debug, Deserialize)]
pub struct ReferenceFact {
	pub domain: String,
	pub source: String,
	pub text: String,
}

/// Substring conditions over folded text.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TermMatch {
	#[serde(default)]
	pub all: Vec<String>,
	#[serde(default)]
	pub any: Vec<String>,
}
impl TermMatch {
	/// An empty condition never matches.
	pub fn matches(&self, folded: &str) -> bool {
		if self.is_empty() {
			return false;
		}

		self.all.iter().all(|term| folded.contains(term.as_str()))
			&& (self.any.is_empty() || self.any.iter().any(|term| folded.contains(term.as_str())))
	}

	fn is_empty(&self) -> bool {
		self.all.is_empty() && self.any.is_empty()
	}

	fn fold(&mut self) {
		fold_all(&mut self.all);
		fold_all(&mut self.any);
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DocumentRules {
	/// Any of these (or a `제N조` heading) marks the input as a contract or terms document.
	#[serde(default)]
	pub markers: Vec<String>,
	#[serde(default)]
	pub risks: Vec<DocumentRiskRule>,
	#[serde(default)]
	pub clause_tags: Vec<ClauseTagRule>,
	#[serde(default)]
	pub kinds: Vec<DocumentKindRule>,
}

/// A whole-document risk pattern.
#[derive(Clone, Debug, Deserialize)]
pub struct DocumentRiskRule {
	pub issue: String,
	pub risk: String,
	pub clause: String,
	#[serde(flatten)]
	pub when: TermMatch,
}

/// Tags one clause and names the searches that ground it.
#[derive(Clone, Debug, Deserialize)]
pub struct ClauseTagRule {
	pub tag: String,
	#[serde(flatten)]
	pub when: TermMatch,
	pub queries: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DocumentKindRule {
	pub kind: String,
	#[serde(default)]
	pub markers: Vec<String>,
	pub queries: Vec<String>,
}

impl Lexicon {
	pub fn embedded() -> Result<Self> {
		Self::from_toml_str(EMBEDDED_LEXICON_TOML)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadLexicon { path: path.to_path_buf(), source: err })?;

		Self::from_toml_str(&raw)
	}

	pub fn from_toml_str(raw: &str) -> Result<Self> {
		let lexicon: Lexicon =
			toml::from_str(raw).map_err(|err| Error::ParseLexicon { source: err })?;

		lexicon.finish()
	}

	pub fn is_stopword(&self, word: &str) -> bool {
		self.stopword_set.contains(word)
	}

	/// Partial match in either direction, so "근로자성" and "근로" both count as core.
	pub fn is_core(&self, word: &str) -> bool {
		self.legal_core.iter().any(|core| word.contains(core.as_str()) || core.contains(word))
	}

	pub fn core_hits<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.legal_core.iter().map(String::as_str).filter(move |core| text.contains(core))
	}

	pub fn synonyms_for(&self, term: &str) -> Option<&[String]> {
		self.synonym_index.get(term).map(|idx| self.synonyms[*idx].alternatives.as_slice())
	}

	pub fn domain(&self, name: &str) -> Option<&DomainEntry> {
		self.domains.iter().find(|domain| domain.name == name)
	}

	pub fn axis_terms(&self, issue: &str) -> &[String] {
		self.legal_axis
			.iter()
			.find(|entry| entry.issue == issue)
			.map(|entry| entry.terms.as_slice())
			.unwrap_or(&[])
	}

	pub fn reference_facts_for<'a>(
		&'a self,
		domain: &'a str,
	) -> impl Iterator<Item = &'a ReferenceFact> + 'a {
		self.reference_facts.iter().filter(move |fact| fact.domain == domain)
	}

	fn finish(mut self) -> Result<Self> {
		fold_all(&mut self.stopwords);
		fold_all(&mut self.legal_core);
		fold_all(&mut self.fact_patterns);

		for entry in &mut self.synonyms {
			entry.term = fold(&entry.term);

			fold_all(&mut entry.alternatives);
		}
		for entry in &mut self.domains {
			fold_all(&mut entry.keywords);
			fold_all(&mut entry.synonyms);
		}
		for entry in &mut self.tags {
			fold_all(&mut entry.patterns);
		}
		for entry in &mut self.intents {
			fold_all(&mut entry.keywords);
		}

		fold_all(&mut self.document.markers);

		for rule in &mut self.document.risks {
			rule.when.fold();
		}
		for rule in &mut self.document.clause_tags {
			rule.when.fold();
		}
		for kind in &mut self.document.kinds {
			fold_all(&mut kind.markers);
		}

		validate(&self)?;

		self.stopword_set = self.stopwords.iter().cloned().collect();
		self.synonym_index = HashMap::new();

		for (idx, entry) in self.synonyms.iter().enumerate() {
			self.synonym_index.entry(entry.term.clone()).or_insert(idx);
		}

		Ok(self)
	}
}

fn validate(lexicon: &Lexicon) -> Result<()> {
	if lexicon.legal_core.is_empty() {
		return Err(Error::Validation { message: "lexicon.legal_core must be non-empty.".to_string() });
	}
	if lexicon.domains.is_empty() {
		return Err(Error::Validation { message: "lexicon.domains must be non-empty.".to_string() });
	}

	let mut seen = HashSet::new();

	for domain in &lexicon.domains {
		if domain.keywords.is_empty() {
			return Err(Error::Validation {
				message: format!("lexicon.domains.{} must have at least one keyword.", domain.name),
			});
		}
		if !seen.insert(domain.name.as_str()) {
			return Err(Error::Validation {
				message: format!("lexicon.domains.{} is declared twice.", domain.name),
			});
		}
	}
	for entry in &lexicon.synonyms {
		if entry.alternatives.iter().any(|alt| alt == &entry.term) {
			return Err(Error::Validation {
				message: format!("lexicon.synonyms.{} must not list itself.", entry.term),
			});
		}
	}
	for rule in &lexicon.document.risks {
		if rule.when.is_empty() {
			return Err(Error::Validation {
				message: format!("lexicon.document.risks.{} needs an all or any term.", rule.issue),
			});
		}
	}
	for rule in &lexicon.document.clause_tags {
		if rule.when.is_empty() {
			return Err(Error::Validation {
				message: format!("lexicon.document.clause_tags.{} needs an all or any term.", rule.tag),
			});
		}
	}

	Ok(())
}

/// NFKC plus lowercase, the canonical form every table entry and query token is compared in.
pub fn fold(raw: &str) -> String {
	raw.nfkc().collect::<String>().trim().to_lowercase()
}

fn fold_all(values: &mut Vec<String>) {
	for value in values.iter_mut() {
		*value = fold(value);
	}

	values.retain(|value| !value.is_empty());
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn embedded_lexicon_parses() {
		let lexicon = Lexicon::embedded().expect("Embedded lexicon must parse.");

		assert_eq!(lexicon.domains.len(), 10);
		assert_eq!(lexicon.document.kinds.len(), 3);
		assert!(lexicon.document.kinds.last().is_some_and(|kind| kind.markers.is_empty()));
		assert!(lexicon.is_stopword("알려주세요"));
		assert!(lexicon.is_core("근로자성"));
		assert!(!lexicon.is_core("사과"));
		assert_eq!(
			lexicon.synonyms_for("임금").map(<[String]>::to_vec),
			Some(vec![
				"급여".to_string(),
				"봉급".to_string(),
				"월급".to_string(),
				"보수".to_string()
			])
		);
	}

	#[test]
	fn lexicon_without_domains_is_rejected() {
		let err = Lexicon::from_toml_str("stopwords = []\nlegal_core = [\"법\"]\ndomains = []\n")
			.expect_err("Expected validation error.");

		assert!(err.to_string().contains("lexicon.domains must be non-empty."), "{err}");
	}

	#[test]
	fn duplicate_domains_are_rejected() {
		let raw = r#"
stopwords = []
legal_core = ["법"]

[[domains]]
name = "계약"
keywords = ["계약"]

[[domains]]
name = "계약"
keywords = ["위약"]
"#;
		let err = Lexicon::from_toml_str(raw).expect_err("Expected duplicate domain error.");

		assert!(err.to_string().contains("declared twice"), "{err}");
	}

	#[test]
	fn unconditional_clause_tag_is_rejected() {
		let raw = r#"
stopwords = []
legal_core = ["법"]

[[domains]]
name = "계약"
keywords = ["계약"]

[[document.clause_tags]]
tag = "해지 요건"
queries = ["계약 해지 요건"]
"#;
		let err = Lexicon::from_toml_str(raw).expect_err("Expected clause tag error.");

		assert!(err.to_string().contains("needs an all or any term"), "{err}");
	}

	#[test]
	fn term_match_needs_every_all_and_one_any() {
		let when = TermMatch {
			all: vec!["환불".to_string()],
			any: vec!["불가".to_string(), "없다".to_string()],
		};

		assert!(when.matches("환불은 불가합니다"));
		assert!(!when.matches("환불 규정"));
		assert!(!TermMatch::default().matches("환불 불가"));
	}
}

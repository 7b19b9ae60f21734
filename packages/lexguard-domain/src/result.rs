use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::Category;

/// Provider-level filters; every field maps onto one request parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderFilters {
	pub date_from: Option<String>,
	pub date_to: Option<String>,
	pub court: Option<String>,
	pub committee: Option<String>,
	pub tribunal: Option<String>,
}

/// One request against one document category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ProviderRequest {
	pub category: Category,
	pub query: String,
	pub page: u32,
	pub per_page: u32,
	pub filters: ProviderFilters,
	/// Listing without query text, served under the longer timeout.
	pub bulk: bool,
}

/// How a single document is addressed on the detail endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum DetailKey {
	/// The provider's own serial (`MST` for statutes, the document ID otherwise).
	Id(String),
	/// A statute's exact name; only statutes resolve by name.
	Name(String),
}
impl DetailKey {
	pub fn value(&self) -> &str {
		match self {
			Self::Id(value) | Self::Name(value) => value,
		}
	}
}

/// One full-document request, optionally narrowed to a single statute article.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DetailRequest {
	pub category: Category,
	pub key: DetailKey,
	/// Six-digit article code, see [`crate::provision::Provision::jo_code`].
	pub article: Option<String>,
}

/// A provider record, tagged by the field layout its category uses.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "shape", content = "fields", rename_all = "snake_case")]
pub enum RawRecord {
	Law(Map<String, Value>),
	Precedent(Map<String, Value>),
	Interpretation(Map<String, Value>),
	/// Appeals, constitutional, committee and tribunal decisions.
	Decision(Map<String, Value>),
	/// Ordinances, administrative rules and old/new comparisons.
	Rule(Map<String, Value>),
}
impl RawRecord {
	pub fn for_category(category: Category, fields: Map<String, Value>) -> Self {
		match category {
			Category::Law => Self::Law(fields),
			Category::Precedent => Self::Precedent(fields),
			Category::Interpretation => Self::Interpretation(fields),
			Category::AdministrativeAppeal
			| Category::ConstitutionalDecision
			| Category::CommitteeDecision
			| Category::SpecialTribunal => Self::Decision(fields),
			Category::LocalOrdinance | Category::AdministrativeRule | Category::LawComparison =>
				Self::Rule(fields),
		}
	}

	pub fn fields(&self) -> &Map<String, Value> {
		match self {
			Self::Law(fields)
			| Self::Precedent(fields)
			| Self::Interpretation(fields)
			| Self::Decision(fields)
			| Self::Rule(fields) => fields,
		}
	}
}

/// The untouched provider answer for one request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RawResult {
	pub category: Category,
	pub total: u64,
	pub records: Vec<RawRecord>,
	pub url: Option<String>,
}

/// The canonical result shape every downstream component reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
	pub id: String,
	pub title: String,
	pub court: Option<String>,
	/// `YYYYMMDD` when present.
	pub date: Option<String>,
	pub summary: String,
	pub url: Option<String>,
	pub source: Category,
	pub case_number: Option<String>,
	pub raw_data: Value,
}
impl NormalizedResult {
	/// Lowercased title and summary, the text relevance checks run against.
	pub fn searchable_text(&self) -> String {
		format!("{} {}", self.title, self.summary).to_lowercase()
	}
}

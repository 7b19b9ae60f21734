use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One class of legal document served by a distinct provider endpoint shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	Law,
	Precedent,
	Interpretation,
	AdministrativeAppeal,
	ConstitutionalDecision,
	CommitteeDecision,
	SpecialTribunal,
	LocalOrdinance,
	AdministrativeRule,
	LawComparison,
}
impl Category {
	pub const ALL: [Category; 10] = [
		Category::Law,
		Category::Precedent,
		Category::Interpretation,
		Category::AdministrativeAppeal,
		Category::ConstitutionalDecision,
		Category::CommitteeDecision,
		Category::SpecialTribunal,
		Category::LocalOrdinance,
		Category::AdministrativeRule,
		Category::LawComparison,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Category::Law => "law",
			Category::Precedent => "precedent",
			Category::Interpretation => "interpretation",
			Category::AdministrativeAppeal => "administrative_appeal",
			Category::ConstitutionalDecision => "constitutional_decision",
			Category::CommitteeDecision => "committee_decision",
			Category::SpecialTribunal => "special_tribunal",
			Category::LocalOrdinance => "local_ordinance",
			Category::AdministrativeRule => "administrative_rule",
			Category::LawComparison => "law_comparison",
		}
	}

	/// Korean display label used in citations and summaries.
	pub fn label(self) -> &'static str {
		match self {
			Category::Law => "법령",
			Category::Precedent => "판례",
			Category::Interpretation => "법령해석",
			Category::AdministrativeAppeal => "행정심판",
			Category::ConstitutionalDecision => "헌재결정",
			Category::CommitteeDecision => "위원회 결정",
			Category::SpecialTribunal => "특별행정심판",
			Category::LocalOrdinance => "자치법규",
			Category::AdministrativeRule => "행정규칙",
			Category::LawComparison => "신구법 비교",
		}
	}

	/// Whether the provider accepts a decision-date range for this category.
	pub fn supports_date_filter(self) -> bool {
		matches!(
			self,
			Category::Precedent | Category::AdministrativeAppeal | Category::ConstitutionalDecision
		)
	}
}
impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Category {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		let trimmed = raw.trim();

		Category::ALL.into_iter().find(|category| category.as_str() == trimmed).ok_or_else(|| {
			Error::Validation { message: format!("Unknown category {trimmed:?}.") }
		})
	}
}

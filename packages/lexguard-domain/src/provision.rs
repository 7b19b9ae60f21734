//! Statute article references such as `근로기준법 제2조` or `민법 제839조의2`.

use std::fmt::{Display, Formatter, Result as FmtResult};

use regex::Regex;
use serde::Serialize;

const MAX_ARTICLE: u32 = 9_999;
const MAX_BRANCH: u32 = 99;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Provision {
	pub law: String,
	pub article: u32,
	/// The `의N` suffix; zero when absent.
	pub branch: u32,
}
impl Provision {
	/// The provider's six-digit `JO` code: four digits of article then two of branch.
	pub fn jo_code(&self) -> String {
		format!("{:04}{:02}", self.article, self.branch)
	}
}
impl Display for Provision {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		write!(f, "{} 제{}조", self.law, self.article)?;

		if self.branch > 0 {
			write!(f, "의{}", self.branch)?;
		}

		Ok(())
	}
}

/// Finds the first statute article reference in free text.
pub struct ProvisionMatcher {
	re: Option<Regex>,
}
impl ProvisionMatcher {
	pub fn new() -> Self {
		Self { re: Regex::new(r"([가-힣]+법)\s*제?\s*(\d+)\s*조(?:\s*의\s*(\d+))?").ok() }
	}

	pub fn find(&self, text: &str) -> Option<Provision> {
		let caps = self.re.as_ref()?.captures(text)?;
		let article = caps[2].parse().ok()?;
		let branch = match caps.get(3) {
			Some(raw) => raw.as_str().parse().ok()?,
			None => 0,
		};

		in_range(article, branch)
			.then(|| Provision { law: caps[1].to_string(), article, branch })
	}
}
impl Default for ProvisionMatcher {
	fn default() -> Self {
		Self::new()
	}
}

/// Accepts `제10조의2`, `10조`, `10의2`, `10` or an already encoded `001002`.
pub fn article_code(raw: &str) -> Option<String> {
	let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

	if compact.len() == 6 && compact.bytes().all(|b| b.is_ascii_digit()) {
		return Some(compact);
	}

	let body = compact.strip_prefix('제').unwrap_or(&compact);
	let (article, branch) = match body.split_once('조') {
		Some((article, rest)) => (article, rest.strip_prefix('의').unwrap_or(rest)),
		None => body.split_once('의').unwrap_or((body, "")),
	};
	let article = article.parse().ok()?;
	let branch = if branch.is_empty() { 0 } else { branch.parse().ok()? };

	in_range(article, branch).then(|| format!("{article:04}{branch:02}"))
}

/// `001002` → `제10조의2`.
pub fn article_label(code: &str) -> Option<String> {
	if code.len() != 6 {
		return None;
	}

	let article: u32 = code.get(..4)?.parse().ok()?;
	let branch: u32 = code.get(4..)?.parse().ok()?;

	if !in_range(article, branch) {
		return None;
	}
	if branch == 0 {
		return Some(format!("제{article}조"));
	}

	Some(format!("제{article}조의{branch}"))
}

fn in_range(article: u32, branch: u32) -> bool {
	(1..=MAX_ARTICLE).contains(&article) && branch <= MAX_BRANCH
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn finds_article_with_branch() {
		let provision =
			ProvisionMatcher::new().find("민법 제839조의2 재산분할 청구권").expect("Expected a provision.");

		assert_eq!(provision.law, "민법");
		assert_eq!(provision.jo_code(), "083902");
		assert_eq!(provision.to_string(), "민법 제839조의2");
	}

	#[test]
	fn plain_article_pads_the_branch() {
		let provision = ProvisionMatcher::new().find("형법 250조").expect("Expected a provision.");

		assert_eq!(provision.jo_code(), "025000");
	}

	#[test]
	fn statute_name_without_article_is_not_a_provision() {
		assert_eq!(ProvisionMatcher::new().find("근로기준법상 근로자"), None);
	}

	#[test]
	fn article_codes_accept_common_spellings() {
		assert_eq!(article_code("제10조의2").as_deref(), Some("001002"));
		assert_eq!(article_code("제 2 조").as_deref(), Some("000200"));
		assert_eq!(article_code("750").as_deref(), Some("075000"));
		assert_eq!(article_code("001002").as_deref(), Some("001002"));
		assert_eq!(article_code("제0조"), None);
		assert_eq!(article_code("조항"), None);
	}

	#[test]
	fn article_labels_read_back_codes() {
		assert_eq!(article_label("001002").as_deref(), Some("제10조의2"));
		assert_eq!(article_label("025000").as_deref(), Some("제250조"));
		assert_eq!(article_label("0250"), None);
	}
}

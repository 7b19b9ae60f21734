//! Maps category-specific provider records onto [`NormalizedResult`].
//!
//! Each record shape owns one function that lists, in priority order, every field name the
//! provider has been seen to use for a canonical attribute.

use serde_json::{Map, Value};

use crate::{
	category::Category,
	result::{NormalizedResult, RawRecord, RawResult},
	text,
};

pub const MAX_SUMMARY_CHARS: usize = 500;

const SITE_BASE: &str = "https://www.law.go.kr";

struct FieldNames {
	id: &'static [&'static str],
	title: &'static [&'static str],
	court: &'static [&'static str],
	date: &'static [&'static str],
	summary: &'static [&'static str],
	case_number: &'static [&'static str],
	link: &'static [&'static str],
}

const LAW_FIELDS: FieldNames = FieldNames {
	id: &["법령ID", "법령일련번호", "law_id", "id"],
	title: &["법령명한글", "법령명_한글", "법령명", "lawNm", "lawNmKo", "title"],
	court: &["소관부처명"],
	date: &["시행일자", "시행일", "공포일자", "date"],
	summary: &["법령내용", "개요", "조문내용", "summary"],
	case_number: &["공포번호"],
	link: &["법령상세링크"],
};

const PRECEDENT_FIELDS: FieldNames = FieldNames {
	id: &["판례정보일련번호", "판례일련번호", "일련번호", "id", "precedent_id"],
	title: &["사건명", "case_name", "제목", "title"],
	court: &["법원명", "court", "법원종류명"],
	date: &["선고일자", "date", "선고일"],
	summary: &["판시사항", "판결요지", "요지", "summary", "판례내용"],
	case_number: &["사건번호", "case_number"],
	link: &["판례상세링크"],
};

const INTERPRETATION_FIELDS: FieldNames = FieldNames {
	id: &["법령해석례일련번호", "일련번호", "id"],
	title: &["안건명", "제목", "title"],
	court: &["회신기관명", "질의기관명"],
	date: &["회신일자", "해석일자", "date"],
	summary: &["질의요지", "회답", "이유", "summary"],
	case_number: &["안건번호"],
	link: &["법령해석례상세링크"],
};

const DECISION_FIELDS: FieldNames = FieldNames {
	id: &["행정심판재결례일련번호", "헌재결정례일련번호", "결정문일련번호", "일련번호", "id"],
	title: &["사건명", "안건명", "제목", "title"],
	court: &["재결청", "기관명", "위원회명", "처분청", "court"],
	date: &["의결일자", "재결일자", "종국일자", "결정일자", "선고일", "date"],
	summary: &["재결요지", "결정요지", "판시사항", "요지", "주문", "summary"],
	case_number: &["사건번호", "의안번호"],
	link: &["행정심판례상세링크", "헌재결정례상세링크", "결정문상세링크", "상세링크"],
};

const RULE_FIELDS: FieldNames = FieldNames {
	id: &["자치법규ID", "행정규칙ID", "자치법규일련번호", "행정규칙일련번호", "법령ID", "일련번호", "id"],
	title: &["자치법규명", "행정규칙명", "법령명한글", "제목", "title"],
	court: &["지자체기관명", "소관부처명"],
	date: &["시행일자", "발령일자", "공포일자", "date"],
	summary: &["개요", "summary"],
	case_number: &["발령번호", "공포번호"],
	link: &["자치법규상세링크", "행정규칙상세링크", "상세링크"],
};

/// Normalizes every record that carries an identifier, in provider order.
pub fn normalize_all(raw: &RawResult) -> Vec<NormalizedResult> {
	raw.records.iter().filter_map(|record| normalize(record, raw.category)).collect()
}

/// Returns `None` for a record with no usable identifier.
pub fn normalize(record: &RawRecord, source: Category) -> Option<NormalizedResult> {
	let names = match record {
		RawRecord::Law(_) => &LAW_FIELDS,
		RawRecord::Precedent(_) => &PRECEDENT_FIELDS,
		RawRecord::Interpretation(_) => &INTERPRETATION_FIELDS,
		RawRecord::Decision(_) => &DECISION_FIELDS,
		RawRecord::Rule(_) => &RULE_FIELDS,
	};

	from_fields(record.fields(), names, source)
}

fn from_fields(
	fields: &Map<String, Value>,
	names: &FieldNames,
	source: Category,
) -> Option<NormalizedResult> {
	let case_number = first_text(fields, names.case_number);
	let id = first_text(fields, names.id).or_else(|| case_number.clone())?;
	let title = first_text(fields, names.title).unwrap_or_default();
	let summary = first_text(fields, names.summary)
		.map(|summary| clip_summary(&summary))
		.unwrap_or_default();
	let date = first_text(fields, names.date).and_then(|raw| normalize_date(&raw));
	let url = first_text(fields, names.link).map(|link| absolute_link(&link));

	Some(NormalizedResult {
		id,
		title,
		court: first_text(fields, names.court),
		date,
		summary,
		url,
		source,
		case_number,
		raw_data: Value::Object(fields.clone()),
	})
}

/// The first listed field holding a non-empty string or a number, cleaned of markup.
fn first_text(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
	names.iter().find_map(|name| match fields.get(*name)? {
		Value::String(raw) => {
			let cleaned = text::clean_html(raw);

			(!cleaned.is_empty()).then_some(cleaned)
		},
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	})
}

/// Accepts `YYYYMMDD`, `YYYY.MM.DD`, `YYYY-MM-DD`, `YYYY/MM/DD` (single-digit parts allowed) and
/// a bare year, which maps to January 1st.
pub fn normalize_date(raw: &str) -> Option<String> {
	let trimmed = raw.trim().trim_end_matches('.');

	if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
		return Some(trimmed.to_string());
	}
	if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
		return Some(format!("{trimmed}0101"));
	}

	let parts: Vec<&str> =
		trimmed.split(['.', '-', '/']).map(str::trim).filter(|part| !part.is_empty()).collect();

	let [year, month, day] = parts.as_slice() else {
		return None;
	};

	if year.len() != 4 || month.len() > 2 || day.len() > 2 {
		return None;
	}

	let year = year.parse::<u16>().ok()?;
	let month = month.parse::<u8>().ok().filter(|month| (1..=12).contains(month))?;
	let day = day.parse::<u8>().ok().filter(|day| (1..=31).contains(day))?;

	Some(format!("{year:04}{month:02}{day:02}"))
}

fn clip_summary(summary: &str) -> String {
	if summary.chars().count() <= MAX_SUMMARY_CHARS {
		return summary.to_string();
	}

	let mut clipped: String = summary.chars().take(MAX_SUMMARY_CHARS - 3).collect();

	clipped.push_str("...");

	clipped
}

fn absolute_link(link: &str) -> String {
	if link.starts_with("http://") || link.starts_with("https://") {
		link.to_string()
	} else if link.starts_with('/') {
		format!("{SITE_BASE}{link}")
	} else {
		format!("{SITE_BASE}/{link}")
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn fields(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => Map::new(),
		}
	}

	#[test]
	fn precedent_fields_map_to_canonical_names() {
		let record = RawRecord::Precedent(fields(json!({
			"판례일련번호": 228541,
			"사건명": "<b>근로자지위확인</b>",
			"사건번호": "2019다12345",
			"법원명": "대법원",
			"선고일자": "2021.3.11",
			"판시사항": "근로자성 판단 기준",
			"판례상세링크": "/DRF/lawService.do?target=prec&ID=228541&type=HTML"
		})));
		let result = normalize(&record, Category::Precedent).expect("Expected a result.");

		assert_eq!(result.id, "228541");
		assert_eq!(result.title, "근로자지위확인");
		assert_eq!(result.court.as_deref(), Some("대법원"));
		assert_eq!(result.date.as_deref(), Some("20210311"));
		assert_eq!(result.case_number.as_deref(), Some("2019다12345"));
		assert_eq!(
			result.url.as_deref(),
			Some("https://www.law.go.kr/DRF/lawService.do?target=prec&ID=228541&type=HTML")
		);
	}

	#[test]
	fn alternate_law_field_names_are_reconciled() {
		let record = RawRecord::Law(fields(json!({
			"law_id": "001692",
			"lawNm": "형법",
			"시행일": "2024",
		})));
		let result = normalize(&record, Category::Law).expect("Expected a result.");

		assert_eq!(result.id, "001692");
		assert_eq!(result.title, "형법");
		assert_eq!(result.date.as_deref(), Some("20240101"));
		assert_eq!(result.summary, "");
	}

	#[test]
	fn record_without_identifier_is_skipped() {
		let record = RawRecord::Rule(fields(json!({ "제목": "주차장 조례" })));

		assert!(normalize(&record, Category::LocalOrdinance).is_none());
	}

	#[test]
	fn summaries_are_capped_at_five_hundred_chars() {
		let record = RawRecord::Interpretation(fields(json!({
			"일련번호": "1",
			"질의요지": "가".repeat(900),
		})));
		let result = normalize(&record, Category::Interpretation).expect("Expected a result.");

		assert_eq!(result.summary.chars().count(), MAX_SUMMARY_CHARS);
		assert!(result.summary.ends_with("..."));
	}

	#[test]
	fn dates_are_strictly_eight_digits_or_absent() {
		assert_eq!(normalize_date("20200101").as_deref(), Some("20200101"));
		assert_eq!(normalize_date("2020-1-5").as_deref(), Some("20200105"));
		assert_eq!(normalize_date("2020/12/31").as_deref(), Some("20201231"));
		assert_eq!(normalize_date("2020.13.01"), None);
		assert_eq!(normalize_date("어제"), None);
	}

	#[test]
	fn normalizing_twice_is_byte_identical() {
		let raw = RawResult {
			category: Category::Precedent,
			total: 1,
			records: vec![RawRecord::Precedent(fields(json!({
				"판례일련번호": "7",
				"사건명": "해고무효확인",
				"선고일자": "20200101",
				"판시사항": "정당한 이유 없는 해고",
			})))],
			url: None,
		};
		let first = serde_json::to_vec(&normalize_all(&raw)).expect("Failed to serialize.");
		let second = serde_json::to_vec(&normalize_all(&raw)).expect("Failed to serialize.");

		assert_eq!(first, second);
	}
}

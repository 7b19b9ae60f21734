//! Staged degradation of a serialized response until it fits the byte ceiling.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result};
use lexguard_domain::text;

pub const ELISION_MARKER: &str = "\n[... 중간 생략 ...]\n";

const LIST_CAP: usize = 10;
const CLIP_LIST_CAP: usize = 5;
const CLIP_STRING_CHARS: usize = 500;
const SUMMARY_KEYS: [&str; 2] = ["display_text", "one_line_answer"];
const ELLIPSIS: &str = "…";
const TRACE_ID_MAX_BYTES: usize = 64;

/// How far a payload had to be degraded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStage {
	Unchanged,
	ElidedStrings,
	CappedLists,
	Clipped,
	SummaryOnly,
}

#[derive(Clone, Debug)]
pub struct Budgeted {
	pub payload: Value,
	pub stage: BudgetStage,
	pub bytes: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct Budgeter {
	max_bytes: usize,
	reserve_bytes: usize,
}
impl Budgeter {
	pub fn new(max_bytes: usize, reserve_bytes: usize) -> Self {
		Self { max_bytes, reserve_bytes }
	}

	pub fn from_config(cfg: &lexguard_config::Response) -> Self {
		Self::new(cfg.max_bytes, cfg.reserve_bytes)
	}

	/// Bytes available to the payload once the reserve is set aside.
	pub fn limit(&self) -> usize {
		self.max_bytes.saturating_sub(self.reserve_bytes)
	}

	pub fn fit_serialize<T>(&self, value: &T) -> Result<Budgeted>
	where
		T: Serialize,
	{
		self.fit(serde_json::to_value(value)?)
	}

	/// Applies each stage in turn and stops at the first one that fits.
	pub fn fit(&self, mut payload: Value) -> Result<Budgeted> {
		let limit = self.limit();
		let bytes = byte_len(&payload)?;

		if bytes <= limit {
			return Ok(Budgeted { payload, stage: BudgetStage::Unchanged, bytes });
		}

		let summary = summary_text(&payload);
		let trace_id = payload
			.get("trace_id")
			.filter(|value| value.as_str().is_some_and(|id| id.len() <= TRACE_ID_MAX_BYTES))
			.cloned();

		tracing::debug!(bytes, limit, "Response exceeds the byte budget.");

		let keep = limit / 3;

		// Eliding only pays off once a string is longer than what it would be replaced with.
		elide_strings(&mut payload, (limit / 2).max(2 * keep + ELISION_MARKER.len()), keep);

		let bytes = byte_len(&payload)?;

		if bytes <= limit {
			return Ok(Budgeted { payload, stage: BudgetStage::ElidedStrings, bytes });
		}

		cap_lists(&mut payload, LIST_CAP);

		let bytes = byte_len(&payload)?;

		if bytes <= limit {
			return Ok(Budgeted { payload, stage: BudgetStage::CappedLists, bytes });
		}

		cap_lists(&mut payload, CLIP_LIST_CAP);
		clip_strings(&mut payload, CLIP_STRING_CHARS);

		let bytes = byte_len(&payload)?;

		if bytes <= limit {
			return Ok(Budgeted { payload, stage: BudgetStage::Clipped, bytes });
		}

		tracing::warn!(bytes, limit, "Response reduced to its summary.");

		self.summary_only(&summary, trace_id)
	}

	fn summary_only(&self, summary: &str, trace_id: Option<Value>) -> Result<Budgeted> {
		let limit = self.limit();
		let mut fields = Map::new();

		fields.insert("summary_only".to_string(), Value::Bool(true));

		if let Some(trace_id) = trace_id {
			fields.insert("trace_id".to_string(), trace_id);
		}

		let mut payload = Value::Object(fields);
		let mut allowance = summary.len();

		loop {
			let text = clip_bytes(summary, allowance);

			if let Value::Object(fields) = &mut payload {
				fields.insert("display_text".to_string(), Value::String(text));
			}

			let bytes = byte_len(&payload)?;

			if bytes <= limit {
				return Ok(Budgeted { payload, stage: BudgetStage::SummaryOnly, bytes });
			}
			if allowance == 0 {
				if bytes <= self.max_bytes {
					return Ok(Budgeted { payload, stage: BudgetStage::SummaryOnly, bytes });
				}

				return Err(Error::BudgetExceeded { bytes, max_bytes: self.max_bytes });
			}

			allowance = allowance.saturating_sub(bytes - limit).min(allowance - 1);
		}
	}
}

fn byte_len(value: &Value) -> Result<usize> {
	Ok(serde_json::to_vec(value)?.len())
}

fn summary_text(payload: &Value) -> String {
	SUMMARY_KEYS
		.iter()
		.filter_map(|key| payload.get(*key).and_then(Value::as_str))
		.find(|text| !text.trim().is_empty())
		.unwrap_or_default()
		.to_string()
}

/// Replaces strings longer than `threshold` bytes with their head and tail of `keep` bytes each.
fn elide_strings(value: &mut Value, threshold: usize, keep: usize) {
	shorten_strings(value, &|raw: &str| (raw.len() > threshold).then(|| elide(raw, keep)));
}

/// Truncates arrays longer than `cap`, annotating the original length on the parent object.
fn cap_lists(value: &mut Value, cap: usize) {
	match value {
		Value::Object(fields) => {
			let keys: Vec<String> = fields.keys().cloned().collect();

			for key in keys {
				let mut original = None;

				if let Some(entry) = fields.get_mut(&key) {
					if let Value::Array(items) = entry
						&& items.len() > cap
					{
						original = Some(items.len());
						items.truncate(cap);
					}

					cap_lists(entry, cap);
				}
				if let Some(total) = original {
					fields.entry(format!("{key}_total")).or_insert(Value::from(total));
					fields.insert(format!("{key}_truncated"), Value::Bool(true));
				}
			}
		},
		Value::Array(items) => {
			items.truncate(cap);

			for item in items {
				cap_lists(item, cap);
			}
		},
		_ => {},
	}
}

fn clip_strings(value: &mut Value, max_chars: usize) {
	shorten_strings(value, &|raw: &str| {
		(raw.chars().count() > max_chars).then(|| text::clip_chars(raw, max_chars))
	});
}

/// Rewrites every string `shorten` returns a replacement for and flags `{key}_truncated` on the
/// object holding it. Strings inside arrays flag the key of the nearest enclosing object.
///
/// Returns whether a string directly held by `value`, or by arrays nested in it, was shortened.
fn shorten_strings<F>(value: &mut Value, shorten: &F) -> bool
where
	F: Fn(&str) -> Option<String>,
{
	match value {
		Value::String(raw) => match shorten(raw) {
			Some(short) => {
				*raw = short;

				true
			},
			None => false,
		},
		Value::Object(fields) => {
			let keys: Vec<String> = fields.keys().cloned().collect();

			for key in keys {
				let shortened =
					fields.get_mut(&key).is_some_and(|entry| shorten_strings(entry, shorten));

				if shortened {
					fields.insert(format!("{key}_truncated"), Value::Bool(true));
				}
			}

			false
		},
		Value::Array(items) =>
			items.iter_mut().fold(false, |any, item| shorten_strings(item, shorten) || any),
		_ => false,
	}
}

fn elide(raw: &str, keep: usize) -> String {
	format!("{}{ELISION_MARKER}{}", head_bytes(raw, keep), tail_bytes(raw, keep))
}

fn clip_bytes(raw: &str, max_bytes: usize) -> String {
	if raw.len() <= max_bytes {
		return raw.to_string();
	}
	if max_bytes < ELLIPSIS.len() {
		return String::new();
	}

	format!("{}{ELLIPSIS}", head_bytes(raw, max_bytes - ELLIPSIS.len()))
}

fn head_bytes(raw: &str, max_bytes: usize) -> &str {
	let mut end = max_bytes.min(raw.len());

	while !raw.is_char_boundary(end) {
		end -= 1;
	}

	&raw[..end]
}

fn tail_bytes(raw: &str, max_bytes: usize) -> &str {
	let mut start = raw.len().saturating_sub(max_bytes);

	while !raw.is_char_boundary(start) {
		start += 1;
	}

	&raw[start..]
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use serde_json::json;

	use super::*;

	#[test]
	fn small_payloads_pass_through() {
		let payload = json!({ "display_text": "짧은 응답" });
		let budgeted = Budgeter::new(24_000, 500).fit(payload.clone()).expect("Budget must fit.");

		assert_eq!(budgeted.stage, BudgetStage::Unchanged);
		assert_eq!(budgeted.payload, payload);
	}

	#[test]
	fn one_oversized_string_is_elided_in_the_middle() {
		let body = format!("{}{}", "가".repeat(4_000), "나".repeat(4_000));
		let payload = json!({ "display_text": "요약", "evidence_summary": body });
		let budgeted = Budgeter::new(24_000, 500).fit(payload).expect("Budget must fit.");
		let elided = budgeted.payload["evidence_summary"].as_str().expect("Missing summary.");

		assert_eq!(budgeted.stage, BudgetStage::ElidedStrings);
		assert!(elided.starts_with('가'));
		assert!(elided.ends_with('나'));
		assert!(elided.contains("[... 중간 생략 ...]"));
		assert_eq!(budgeted.payload["evidence_summary_truncated"], json!(true));
	}

	#[test]
	fn strings_inside_arrays_flag_their_parent_key() {
		let mut payload = json!({
			"notes": ["짧은 메모", "다".repeat(100)],
			"evidence": [{ "text": "라".repeat(100) }],
		});

		elide_strings(&mut payload, 60, 10);

		assert_eq!(payload["notes"][0], json!("짧은 메모"));
		assert!(payload["notes"][1].as_str().is_some_and(|note| note.contains("중간 생략")));
		assert_eq!(payload["notes_truncated"], json!(true));
		assert_eq!(payload["evidence"][0]["text_truncated"], json!(true));
		assert_eq!(payload.get("evidence_truncated"), None);
	}

	#[test]
	fn elided_list_entries_are_visible_after_fitting() {
		let payload = json!({ "display_text": "요약", "notes": ["다".repeat(10_000)] });
		let budgeted = Budgeter::new(24_000, 500).fit(payload).expect("Budget must fit.");

		assert_eq!(budgeted.stage, BudgetStage::ElidedStrings);
		assert_eq!(budgeted.payload["notes_truncated"], json!(true));
	}

	#[test]
	fn clipping_flags_strings_held_in_lists() {
		let mut payload = json!({ "titles": ["가".repeat(600), "짧음"] });

		clip_strings(&mut payload, 500);

		assert_eq!(payload["titles"][0].as_str().map(|title| title.chars().count()), Some(500));
		assert_eq!(payload["titles_truncated"], json!(true));
	}

	#[test]
	fn long_lists_are_capped_and_annotated() {
		let citations: Vec<Value> =
			(0..60).map(|idx| json!({ "id": idx, "name": "근로기준법 ".repeat(30) })).collect();
		let payload = json!({ "display_text": "요약", "citations": citations });
		let budgeted = Budgeter::new(24_000, 500).fit(payload).expect("Budget must fit.");

		assert_eq!(budgeted.stage, BudgetStage::CappedLists);
		assert_eq!(budgeted.payload["citations"].as_array().map(Vec::len), Some(10));
		assert_eq!(budgeted.payload["citations_total"], json!(60));
		assert_eq!(budgeted.payload["citations_truncated"], json!(true));
	}

	#[test]
	fn hopeless_payloads_fall_back_to_the_summary() {
		let items: Vec<Value> = (0..5).map(|_| json!({ "a": "x".repeat(400) })).collect();
		let nested: Vec<Value> = (0..5).map(|_| json!({ "items": items.clone() })).collect();
		let payload = json!({
			"trace_id": "00000000-0000-0000-0000-000000000000",
			"display_text": "법적 근거 요약: 유형=근로자성, 근거 수=3",
			"groups": nested,
		});
		let budgeted = Budgeter::new(2_000, 500).fit(payload).expect("Budget must fit.");

		assert_eq!(budgeted.stage, BudgetStage::SummaryOnly);
		assert_eq!(budgeted.payload["summary_only"], json!(true));
		assert_eq!(budgeted.payload["display_text"], json!("법적 근거 요약: 유형=근로자성, 근거 수=3"));
		assert!(budgeted.bytes <= 1_500);
	}

	#[test]
	fn impossible_budgets_are_reported() {
		let payload = json!({ "display_text": "요약".repeat(100) });
		let err = Budgeter::new(10, 0).fit(payload).expect_err("Budget cannot fit.");

		assert!(matches!(err, Error::BudgetExceeded { max_bytes: 10, .. }));
	}

	fn arb_payload() -> impl Strategy<Value = Value> {
		let leaf = prop_oneof![
			"[가-힣a-z .]{0,400}".prop_map(Value::String),
			any::<i64>().prop_map(Value::from),
			any::<bool>().prop_map(Value::Bool),
		];

		leaf.prop_recursive(4, 256, 24, |inner| {
			prop_oneof![
				prop::collection::vec(inner.clone(), 0..24).prop_map(Value::Array),
				prop::collection::btree_map("[a-z_]{1,12}", inner, 0..8)
					.prop_map(|map| Value::Object(map.into_iter().collect())),
			]
		})
	}

	proptest! {
		#[test]
		fn fitted_payloads_never_exceed_the_ceiling(
			payload in arb_payload(),
			max_bytes in 1_000usize..30_000,
			reserve_bytes in 0usize..500,
		) {
			let budgeter = Budgeter::new(max_bytes, reserve_bytes);
			let budgeted = budgeter.fit(payload).expect("A ceiling of at least 500 bytes always fits.");
			let actual = serde_json::to_vec(&budgeted.payload).expect("Payload must serialize.").len();

			prop_assert_eq!(actual, budgeted.bytes);
			prop_assert!(actual <= max_bytes - reserve_bytes);
		}
	}
}

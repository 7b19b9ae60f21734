use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::lexicon::{Lexicon, fold};

const MIN_KEYWORD_CHARS: usize = 2;
const TRAILING_PARTICLES: [&str; 12] =
	["에서", "으로", "에게", "한테", "까지", "부터", "을", "를", "은", "는", "의", "에"];
const ELLIPSIS: char = '…';

/// A string cut to a bound, remembering whether anything was removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Truncated {
	pub text: String,
	pub truncated: bool,
}

/// NFKC-normalizes and collapses whitespace; case is preserved.
pub fn normalize_query(raw: &str) -> String {
	let normalized: String = raw.nfkc().collect();

	normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops whole-word stopwords from already-normalized text.
pub fn strip_stopwords(text: &str, lexicon: &Lexicon) -> String {
	text.split_whitespace()
		.filter(|word| !lexicon.is_stopword(&fold(word)))
		.collect::<Vec<_>>()
		.join(" ")
}

/// Extracts search keywords with legal-core terms first and generic terms after, each group in
/// input order, without duplicates.
pub fn extract_keywords(text: &str, lexicon: &Lexicon) -> Vec<String> {
	let mut core = Vec::new();
	let mut generic = Vec::new();

	for raw in normalize_query(text).split_whitespace() {
		let word = fold(raw.trim_matches(|c: char| !c.is_alphanumeric()));

		if word.is_empty() || lexicon.is_stopword(&word) {
			continue;
		}

		let word = strip_particle(&word);

		if word.chars().count() < MIN_KEYWORD_CHARS || lexicon.is_stopword(&word) {
			continue;
		}
		if core.contains(&word) || generic.contains(&word) {
			continue;
		}

		if lexicon.is_core(&word) {
			core.push(word);
		} else {
			generic.push(word);
		}
	}

	core.extend(generic);

	core
}

/// Joins the first `n` extracted keywords, or `None` when nothing survives extraction.
pub fn top_keywords(text: &str, lexicon: &Lexicon, n: usize) -> Option<String> {
	let keywords = extract_keywords(text, lexicon);

	if keywords.is_empty() {
		return None;
	}

	Some(keywords.into_iter().take(n).collect::<Vec<_>>().join(" "))
}

/// Lowercased alphanumeric tokens for term statistics.
pub fn tokenize(text: &str) -> Vec<String> {
	fold(text)
		.split(|c: char| !c.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(strip_particle)
		.collect()
}

/// Cuts `text` to at most `max_chars` characters, ending on a sentence boundary when one fits.
///
/// When the first sentence alone is too long the text is hard-cut and an ellipsis appended,
/// still within `max_chars`.
pub fn truncate_sentence(text: &str, max_chars: usize) -> Truncated {
	let trimmed = text.trim();

	if trimmed.chars().count() <= max_chars {
		return Truncated { text: trimmed.to_string(), truncated: false };
	}

	let mut kept = String::new();
	let mut kept_chars = 0;

	for sentence in trimmed.split_sentence_bounds() {
		let sentence_chars = sentence.chars().count();

		if kept_chars + sentence_chars > max_chars {
			break;
		}

		kept.push_str(sentence);

		kept_chars += sentence_chars;
	}

	let kept = kept.trim_end();

	if !kept.is_empty() {
		return Truncated { text: kept.to_string(), truncated: true };
	}

	Truncated { text: clip_chars(trimmed, max_chars), truncated: true }
}

/// Hard-cuts to `max_chars` characters including a trailing ellipsis.
pub fn clip_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	if max_chars == 0 {
		return String::new();
	}

	let mut clipped: String = text.chars().take(max_chars - 1).collect();

	clipped.truncate(clipped.trim_end().len());
	clipped.push(ELLIPSIS);

	clipped
}

/// Strips markup and common entities from provider text and collapses whitespace.
pub fn clean_html(raw: &str) -> String {
	let mut stripped = String::with_capacity(raw.len());
	let mut in_tag = false;

	for c in raw.chars() {
		match c {
			'<' => in_tag = true,
			'>' if in_tag => {
				in_tag = false;

				stripped.push(' ');
			},
			_ if !in_tag => stripped.push(c),
			_ => {},
		}
	}

	let unescaped = stripped
		.replace("&nbsp;", " ")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&apos;", "'")
		.replace("&amp;", "&");

	unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_particle(word: &str) -> String {
	for particle in TRAILING_PARTICLES {
		if let Some(stem) = word.strip_suffix(particle)
			&& stem.chars().count() >= MIN_KEYWORD_CHARS
		{
			return stem.to_string();
		}
	}

	word.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lexicon() -> Lexicon {
		Lexicon::embedded().expect("Embedded lexicon must parse.")
	}

	#[test]
	fn keywords_drop_stopwords_and_put_core_terms_first() {
		let keywords = extract_keywords("프리랜서 디자이너인데 근로자성 인정 여부 알려주세요", &lexicon());

		assert_eq!(keywords, vec!["프리랜서", "근로자성", "디자이너인데", "인정", "여부"]);
	}

	#[test]
	fn keywords_trim_particles_and_punctuation() {
		let keywords = extract_keywords("임금을 못 받았어요? 퇴직금에서", &lexicon());

		assert_eq!(keywords, vec!["임금", "퇴직금", "받았어요"]);
	}

	#[test]
	fn stopword_stripping_keeps_word_order() {
		assert_eq!(strip_stopwords("해고 관련 판례 찾아주세요", &lexicon()), "해고 판례");
	}

	#[test]
	fn oversized_text_is_cut_on_a_sentence_boundary() {
		let sentence = "사용자는 근로자를 지휘하고 감독하였다. ";
		let text = sentence.repeat(10_000 / sentence.chars().count() + 1);

		assert!(text.chars().count() >= 10_000);

		let cut = truncate_sentence(&text, 300);

		assert!(cut.truncated);
		assert!(cut.text.chars().count() <= 300);
		assert!(cut.text.ends_with('.'), "Unexpected tail: {}", cut.text);
	}

	#[test]
	fn unbroken_text_is_hard_cut_with_an_ellipsis() {
		let text = "가".repeat(500);
		let cut = truncate_sentence(&text, 300);

		assert_eq!(cut.text.chars().count(), 300);
		assert!(cut.text.ends_with(ELLIPSIS));
	}

	#[test]
	fn html_is_stripped_and_entities_unescaped() {
		assert_eq!(clean_html("<p>근로자&nbsp;성</p><br/>판단 &amp; 기준"), "근로자 성 판단 & 기준");
	}

	#[test]
	fn tokenize_splits_on_punctuation() {
		assert_eq!(tokenize("형법 제250조(살인)"), vec!["형법", "제250조", "살인"]);
	}
}

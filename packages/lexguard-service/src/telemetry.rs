//! In-process attempt history and search counters.

use std::{
	collections::{BTreeMap, VecDeque},
	sync::RwLock,
};

use serde::Serialize;

use crate::search::{ResultBundle, SearchAttempt};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryStats {
	pub total_searches: u64,
	pub searches_with_results: u64,
	pub empty_searches: u64,
	pub fallback_searches: u64,
	/// Attempts per search → number of searches.
	pub attempt_distribution: BTreeMap<usize, u64>,
	/// Top domain → number of searches.
	pub domain_counts: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TelemetrySnapshot {
	pub stats: TelemetryStats,
	pub recent_attempts: Vec<SearchAttempt>,
}

#[derive(Default)]
struct TelemetryState {
	stats: TelemetryStats,
	recent: VecDeque<SearchAttempt>,
}

pub struct Telemetry {
	capacity: usize,
	state: RwLock<TelemetryState>,
}
impl Telemetry {
	pub fn new(capacity: usize) -> Self {
		Self { capacity, state: RwLock::new(TelemetryState::default()) }
	}

	pub fn record(&self, bundle: &ResultBundle) {
		let mut state = self.state.write().unwrap_or_else(|err| err.into_inner());
		let stats = &mut state.stats;

		stats.total_searches += 1;

		if bundle.sources_count > 0 {
			stats.searches_with_results += 1;
		} else {
			stats.empty_searches += 1;
		}
		if bundle.fallback_used {
			stats.fallback_searches += 1;
		}

		*stats.attempt_distribution.entry(bundle.attempts.len()).or_default() += 1;

		if let Some(top) = bundle.domains.first() {
			*stats.domain_counts.entry(top.domain.clone()).or_default() += 1;
		}

		self.push_attempts(&mut state.recent, &bundle.attempts);
	}

	/// Mirrors attempts made outside a full search, such as a single-category search.
	pub fn record_attempts(&self, attempts: &[SearchAttempt]) {
		let mut state = self.state.write().unwrap_or_else(|err| err.into_inner());

		self.push_attempts(&mut state.recent, attempts);
	}

	pub fn snapshot(&self) -> TelemetrySnapshot {
		let state = self.state.read().unwrap_or_else(|err| err.into_inner());

		TelemetrySnapshot {
			stats: state.stats.clone(),
			recent_attempts: state.recent.iter().cloned().collect(),
		}
	}

	fn push_attempts(&self, recent: &mut VecDeque<SearchAttempt>, attempts: &[SearchAttempt]) {
		for attempt in attempts {
			if recent.len() >= self.capacity {
				recent.pop_front();
			}

			recent.push_back(attempt.clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{sync::Arc, thread};

	use lexguard_domain::{category::Category, quality::Verdict};

	use super::*;
	use crate::search::Stage;

	fn attempt(query: &str) -> SearchAttempt {
		SearchAttempt {
			step: Stage::A,
			category: Category::Law,
			query: query.to_string(),
			date_from: None,
			date_to: None,
			strategy: "original".to_string(),
			total: 1,
			success: true,
			error: None,
			error_kind: None,
			verdict: Verdict::Good,
			cached: false,
		}
	}

	#[test]
	fn ring_keeps_the_latest_attempts() {
		let telemetry = Telemetry::new(2);

		telemetry.record_attempts(&[attempt("형법"), attempt("민법"), attempt("상법")]);

		let recent = telemetry.snapshot().recent_attempts;

		assert_eq!(recent.len(), 2);
		assert_eq!(recent[0].query, "민법");
		assert_eq!(recent[1].query, "상법");
	}

	#[test]
	fn poisoned_lock_keeps_recording() {
		let telemetry = Arc::new(Telemetry::new(4));
		let poisoner = telemetry.clone();
		let _ = thread::spawn(move || {
			let _guard = poisoner.state.write().unwrap_or_else(|err| err.into_inner());

			panic!("Telemetry writer panicked.");
		})
		.join();

		assert!(telemetry.state.is_poisoned());

		telemetry.record_attempts(&[attempt("형법")]);

		assert_eq!(telemetry.snapshot().recent_attempts.len(), 1);
	}
}

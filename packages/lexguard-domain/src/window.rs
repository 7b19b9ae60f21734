use time::{
	Date, Month, OffsetDateTime, UtcOffset,
	macros::{date, offset},
};

const KST: UtcOffset = offset!(+9);
/// Lower bound sent when a caller only supplies an end date.
const EARLIEST: Date = date!(1900 - 01 - 01);

/// A decision-date filter. `Unbounded` means no date filter is sent at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DateWindow {
	Bounded { from: Date, to: Date },
	Unbounded,
}
impl DateWindow {
	/// The window covering `years` whole years up to and including `to`.
	pub fn years_back(to: Date, years: i32) -> Self {
		Self::Bounded { from: shift_years(to, -years), to }
	}

	/// Builds a window from caller-supplied `YYYYMMDD` bounds; a missing upper bound means `today`
	/// and a missing lower bound reaches back to 1900.
	pub fn from_bounds(from: Option<&str>, to: Option<&str>, today: Date) -> Option<Self> {
		let from = from.and_then(parse_yyyymmdd);
		let to = to.and_then(parse_yyyymmdd);

		match (from, to) {
			(None, None) => None,
			(Some(from), to) => {
				let to = to.unwrap_or(today);

				Some(if from <= to {
					Self::Bounded { from, to }
				} else {
					Self::Bounded { from: to, to: from }
				})
			},
			(None, Some(to)) => Some(Self::Bounded { from: EARLIEST.min(to), to }),
		}
	}

	/// Relaxes the window. Step 0 is the identity, step 1 reaches back `widened_years` from the
	/// same end date, and any later step removes the filter. An unbounded window never changes.
	pub fn widen(self, step: u32, widened_years: i32) -> Self {
		match (self, step) {
			(Self::Unbounded, _) => Self::Unbounded,
			(window, 0) => window,
			(Self::Bounded { to, .. }, 1) => {
				let widened = Self::years_back(to, widened_years);

				match (self, widened) {
					(Self::Bounded { from: current, .. }, Self::Bounded { from: next, .. })
						if current <= next =>
						self,
					_ => widened,
				}
			},
			_ => Self::Unbounded,
		}
	}

	pub fn is_unbounded(self) -> bool {
		matches!(self, Self::Unbounded)
	}

	/// `(date_from, date_to)` as `YYYYMMDD` strings, both `None` when unbounded.
	pub fn bounds(self) -> (Option<String>, Option<String>) {
		match self {
			Self::Bounded { from, to } => (Some(format_yyyymmdd(from)), Some(format_yyyymmdd(to))),
			Self::Unbounded => (None, None),
		}
	}
}

/// The current date in Korea, which is what the provider's date filters mean.
pub fn today() -> Date {
	OffsetDateTime::now_utc().to_offset(KST).date()
}

pub fn format_yyyymmdd(date: Date) -> String {
	format!("{:04}{:02}{:02}", date.year(), u8::from(date.month()), date.day())
}

pub fn parse_yyyymmdd(raw: &str) -> Option<Date> {
	let raw = raw.trim();

	if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}

	let year = raw[0..4].parse::<i32>().ok()?;
	let month = Month::try_from(raw[4..6].parse::<u8>().ok()?).ok()?;
	let day = raw[6..8].parse::<u8>().ok()?;

	Date::from_calendar_date(year, month, day).ok()
}

fn shift_years(date: Date, years: i32) -> Date {
	let year = date.year() + years;

	// Feb 29 lands on Feb 28 in a common year.
	Date::from_calendar_date(year, date.month(), date.day())
		.or_else(|_| Date::from_calendar_date(year, date.month(), date.day() - 1))
		.unwrap_or(date)
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn default_window_reaches_five_years_back() {
		let window = DateWindow::years_back(date!(2026 - 10 - 16), 5);

		assert_eq!(window.bounds(), (Some("20211016".to_string()), Some("20261016".to_string())));
	}

	#[test]
	fn widening_walks_ten_years_then_unbounded() {
		let today = date!(2026 - 10 - 16);
		let window = DateWindow::years_back(today, 5);
		let first = window.widen(1, 10);

		assert_eq!(first, DateWindow::years_back(today, 10));
		assert_eq!(first.widen(2, 10), DateWindow::Unbounded);
		assert_eq!(window.widen(0, 10), window);
	}

	#[test]
	fn leap_day_shifts_to_the_last_day_of_february() {
		let window = DateWindow::years_back(date!(2024 - 02 - 29), 1);

		assert_eq!(window.bounds().0.as_deref(), Some("20230228"));
	}

	#[test]
	fn caller_bounds_are_parsed_and_ordered() {
		let today = date!(2026 - 10 - 16);

		assert_eq!(
			DateWindow::from_bounds(Some("20240101"), Some("20200101"), today).map(|w| w.bounds()),
			Some((Some("20200101".to_string()), Some("20240101".to_string())))
		);
		assert_eq!(
			DateWindow::from_bounds(Some("20200101"), None, today).map(|w| w.bounds().1),
			Some(Some("20261016".to_string()))
		);
		assert_eq!(
			DateWindow::from_bounds(None, Some("20200101"), today).map(|w| w.bounds().0),
			Some(Some("19000101".to_string()))
		);
		assert_eq!(DateWindow::from_bounds(Some("2020-01-01"), None, today), None);
	}

	proptest! {
		#[test]
		fn widening_twice_is_always_unbounded(
			days in 0_i32..40_000,
			years in 1_i32..30,
			wider in 1_i32..50,
		) {
			let to = Date::from_julian_day(2_400_000 + days).unwrap_or(Date::MIN);
			let window = DateWindow::years_back(to, years);

			prop_assert_eq!(window.widen(1, wider).widen(2, wider), DateWindow::Unbounded);
		}

		#[test]
		fn unbounded_is_a_fixed_point(step in 0_u32..100, wider in 1_i32..50) {
			prop_assert_eq!(DateWindow::Unbounded.widen(step, wider), DateWindow::Unbounded);
		}
	}
}

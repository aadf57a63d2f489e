use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest horizon any planning or forecast run accepts, ten years of days.
pub const MAX_HORIZON_DAYS: usize = 3650;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeWindowError {
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// A day-granular date interval. Both ends are inclusive; a missing end
/// means the interval is ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, TimeWindowError> {
        if let Some(end) = end {
            if end < start {
                return Err(TimeWindowError::EndBeforeStart { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn closed(start: NaiveDate, end: NaiveDate) -> Result<Self, TimeWindowError> {
        Self::new(start, Some(end))
    }

    pub fn ongoing(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    /// A window of `days` days beginning at `start`.
    pub fn from_horizon(start: NaiveDate, days: usize) -> Self {
        let last = start + Duration::days(days.saturating_sub(1) as i64);
        Self {
            start,
            end: Some(last),
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }

    /// Inclusive length in days, `None` for ongoing windows.
    pub fn duration_days(&self) -> Option<i64> {
        self.end
            .map(|end| end.signed_duration_since(self.start).num_days() + 1)
    }

    /// Overlap test `start1 <= end2 && start2 <= end1`. An open end takes the
    /// later of the compared ends, so two ongoing windows always overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        let (own_end, other_end) = self.resolved_ends(other);
        match (own_end, other_end) {
            (Some(own_end), Some(other_end)) => self.start <= other_end && other.start <= own_end,
            _ => true,
        }
    }

    /// The overlapping part of two windows. Ongoing only when both are ongoing.
    pub fn intersection(&self, other: &TimeWindow) -> Option<TimeWindow> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a.max(start)),
            (None, Some(b)) => Some(b.max(start)),
            (None, None) => None,
        };
        Some(TimeWindow { start, end })
    }

    /// Smallest window covering both.
    pub fn span(&self, other: &TimeWindow) -> TimeWindow {
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        TimeWindow {
            start: self.start.min(other.start),
            end,
        }
    }

    /// Restricts the window to `horizon`; `None` when they do not meet.
    pub fn clamp_to(&self, horizon: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(horizon.start);
        let end = match (self.end, horizon.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        match end {
            Some(end) if end < start => None,
            _ => Some(TimeWindow { start, end }),
        }
    }

    /// Iterates the days of this window that fall inside `horizon`.
    pub fn days_within(&self, horizon: &TimeWindow) -> impl Iterator<Item = NaiveDate> {
        let clamped = self.clamp_to(horizon);
        let (start, end) = match clamped {
            Some(TimeWindow {
                start,
                end: Some(end),
            }) => (start, end),
            _ => (horizon.start, horizon.start - Duration::days(1)),
        };
        start.iter_days().take_while(move |date| *date <= end)
    }

    fn resolved_ends(&self, other: &TimeWindow) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let later = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a.max(other.start)),
            (None, Some(b)) => Some(b.max(self.start)),
            (None, None) => None,
        };
        (self.end.or(later), other.end.or(later))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;

    fn window(start: NaiveDate, end: NaiveDate) -> TimeWindow {
        TimeWindow::closed(start, end).unwrap()
    }

    #[test]
    fn rejects_end_before_start() {
        let result = TimeWindow::closed(on_date(2026, 3, 10), on_date(2026, 3, 1));
        assert_eq!(
            result,
            Err(TimeWindowError::EndBeforeStart {
                start: on_date(2026, 3, 10),
                end: on_date(2026, 3, 1)
            })
        );
    }

    #[test]
    fn touching_windows_overlap_because_ends_are_inclusive() {
        let a = window(on_date(2026, 1, 1), on_date(2026, 1, 31));
        let b = window(on_date(2026, 1, 31), on_date(2026, 2, 28));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert_eq!(
            a.intersection(&b),
            Some(window(on_date(2026, 1, 31), on_date(2026, 1, 31)))
        );
    }

    #[test]
    fn disjoint_windows_do_not_overlap() {
        let a = window(on_date(2026, 1, 1), on_date(2026, 1, 31));
        let b = window(on_date(2026, 2, 1), on_date(2026, 2, 28));
        assert!(!a.overlaps(&b));
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn ongoing_window_overlaps_anything_starting_before_the_other_end() {
        let ongoing = TimeWindow::ongoing(on_date(2026, 6, 1));
        let before = window(on_date(2026, 1, 1), on_date(2026, 5, 31));
        let after = window(on_date(2026, 7, 1), on_date(2026, 7, 31));

        assert!(!ongoing.overlaps(&before));
        assert!(ongoing.overlaps(&after));
        assert_eq!(ongoing.intersection(&after), Some(after));
        assert!(ongoing.overlaps(&TimeWindow::ongoing(on_date(2030, 1, 1))));
    }

    #[test]
    fn days_within_stops_at_the_horizon() {
        let horizon = TimeWindow::from_horizon(on_date(2026, 1, 1), 10);
        let ongoing = TimeWindow::ongoing(on_date(2026, 1, 8));
        let days: Vec<_> = ongoing.days_within(&horizon).collect();
        assert_eq!(
            days,
            vec![on_date(2026, 1, 8), on_date(2026, 1, 9), on_date(2026, 1, 10)]
        );

        let outside = window(on_date(2025, 1, 1), on_date(2025, 1, 5));
        assert_eq!(outside.days_within(&horizon).count(), 0);
    }

    #[test]
    fn duration_counts_both_ends() {
        assert_eq!(
            window(on_date(2026, 1, 1), on_date(2026, 1, 1)).duration_days(),
            Some(1)
        );
        assert_eq!(TimeWindow::ongoing(on_date(2026, 1, 1)).duration_days(), None);
        assert_eq!(
            TimeWindow::from_horizon(on_date(2026, 1, 1), 365).duration_days(),
            Some(365)
        );
    }
}

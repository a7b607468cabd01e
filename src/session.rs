//! Week numbering and display labels for class sessions.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

pub const DEFAULT_TOTAL_SESSIONS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionLabel {
    /// Week is before the first session.
    Upcoming,
    /// Week is past the last session.
    Finished,
    Session { number: i64, of: i64 },
}

impl Display for SessionLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionLabel::Upcoming => f.write_str("upcoming"),
            SessionLabel::Finished => f.write_str("finished"),
            SessionLabel::Session { number, of } => write!(f, "{}/{}", number, of),
        }
    }
}

impl Serialize for SessionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Labels the 1-based `week_number` of a course running `total_sessions` weeks.
///
/// Without a positive `cycle` the label counts linearly (`"3/12"`). With one, the count
/// restarts every `cycle` weeks (`cycle = 4`: week 5 is `"1/4"`). Weeks outside
/// `1..=total_sessions` are [`SessionLabel::Upcoming`] or [`SessionLabel::Finished`].
pub fn session_label(week_number: i64, cycle: Option<i64>, total_sessions: i64) -> SessionLabel {
    if week_number > total_sessions {
        return SessionLabel::Finished;
    }
    if week_number <= 0 {
        return SessionLabel::Upcoming;
    }

    match cycle.filter(|c| *c > 0) {
        Some(cycle) => SessionLabel::Session {
            number: (week_number - 1).rem_euclid(cycle) + 1,
            of: cycle,
        },
        None => SessionLabel::Session {
            number: week_number,
            of: total_sessions,
        },
    }
}

/// 1-based week of `date` counted from `start`; dates before `start` give 0 or less.
pub fn week_number(start: NaiveDate, date: NaiveDate) -> i64 {
    (date - start).num_days().div_euclid(7) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(week: i64, cycle: Option<i64>, total: i64) -> String {
        session_label(week, cycle, total).to_string()
    }

    #[test]
    fn non_positive_weeks_are_upcoming_for_any_cycle() {
        for week in [-1000, -7, -1, 0] {
            for cycle in [None, Some(-2), Some(0), Some(1), Some(4), Some(6)] {
                assert_eq!(
                    session_label(week, cycle, DEFAULT_TOTAL_SESSIONS),
                    SessionLabel::Upcoming,
                    "week {} cycle {:?}",
                    week,
                    cycle
                );
            }
        }
    }

    #[test]
    fn weeks_past_the_end_are_finished() {
        for week in [13, 14, 100, i64::MAX] {
            assert_eq!(session_label(week, None, 12), SessionLabel::Finished);
            assert_eq!(session_label(week, Some(4), 12), SessionLabel::Finished);
        }
    }

    #[test]
    fn linear_mode() {
        assert_eq!(label(1, None, 12), "1/12");
        assert_eq!(label(12, None, 12), "12/12");
        assert_eq!(label(13, None, 12), "finished");
    }

    #[test]
    fn non_positive_cycle_counts_linearly() {
        assert_eq!(label(5, Some(0), 12), "5/12");
        assert_eq!(label(5, Some(-3), 12), "5/12");
    }

    #[test]
    fn cyclic_mode() {
        assert_eq!(label(1, Some(4), 12), "1/4");
        assert_eq!(label(4, Some(4), 12), "4/4");
        assert_eq!(label(5, Some(4), 12), "1/4");
        assert_eq!(label(12, Some(4), 12), "4/4");
    }

    #[test]
    fn cycle_boundary() {
        assert_eq!(label(7, Some(6), 12), "1/6");
        assert_eq!(label(6, Some(6), 12), "6/6");
    }

    #[test]
    fn extreme_weeks_do_not_overflow() {
        assert_eq!(session_label(i64::MIN, Some(4), 12), SessionLabel::Upcoming);
        assert_eq!(
            session_label(i64::MAX, Some(4), i64::MAX),
            SessionLabel::Session {
                number: (i64::MAX - 1) % 4 + 1,
                of: 4
            }
        );
    }

    #[test]
    fn label_serializes_as_display_string() {
        assert_eq!(
            serde_json::to_string(&SessionLabel::Session { number: 3, of: 12 }).unwrap(),
            "\"3/12\""
        );
        assert_eq!(
            serde_json::to_string(&SessionLabel::Upcoming).unwrap(),
            "\"upcoming\""
        );
    }

    #[test]
    fn week_numbers_count_from_start_date() {
        let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let day = |d: i64| start + chrono::Duration::days(d);

        assert_eq!(week_number(start, start), 1);
        assert_eq!(week_number(start, day(6)), 1);
        assert_eq!(week_number(start, day(7)), 2);
        assert_eq!(week_number(start, day(-1)), 0);
        assert_eq!(week_number(start, day(-8)), -1);
    }
}

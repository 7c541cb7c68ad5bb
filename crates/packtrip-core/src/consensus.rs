//! Pure consensus arithmetic.
//!
//! The engines in `packtrip-engine` do the orchestration (locking, feed
//! dedup, pipeline triggering); the actual agreement maths lives here so it
//! can be tested without any I/O.
//!
//! Note the deliberate asymmetry between the two notions of unanimity:
//! availability consensus counts only participants who submitted at least
//! one mark, while vote winners require the full participant roster.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use crate::model::{AGREE_REACTION, Availability, Vote};

/// Automatic option generation requires at least this many consensus dates.
pub const MIN_CONSENSUS_DATES: usize = 3;

/// The automatic path is suppressed below this many distinct respondents;
/// a forced trigger ignores the floor.
pub const MIN_RESPONDENTS: usize = 2;

// ─── Availability ────────────────────────────────────────────────────────────

/// Count of distinct users present in the availability set. A participant
/// who has submitted nothing does not appear and does not block consensus.
pub fn respondent_count(marks: &[Availability]) -> usize {
  marks.iter().map(|m| m.user_id).collect::<BTreeSet<_>>().len()
}

/// The sorted list of dates every respondent marked available.
///
/// A date qualifies iff the set of users with `available = true` on it
/// equals the full respondent set. A user marking a date unavailable
/// therefore disqualifies it even if everyone else said yes.
pub fn consensus_dates(marks: &[Availability]) -> Vec<NaiveDate> {
  let respondents: BTreeSet<i64> = marks.iter().map(|m| m.user_id).collect();
  if respondents.is_empty() {
    return Vec::new();
  }

  let mut yes_by_date: BTreeMap<NaiveDate, BTreeSet<i64>> = BTreeMap::new();
  let mut no_by_date: BTreeMap<NaiveDate, BTreeSet<i64>> = BTreeMap::new();
  for mark in marks {
    let bucket = if mark.available { &mut yes_by_date } else { &mut no_by_date };
    bucket.entry(mark.date).or_default().insert(mark.user_id);
  }

  yes_by_date
    .into_iter()
    .filter(|(date, yes)| {
      *yes == respondents && no_by_date.get(date).is_none_or(|no| no.is_empty())
    })
    .map(|(date, _)| date)
    .collect()
}

// ─── Voting ──────────────────────────────────────────────────────────────────

/// Find the unanimously agreed option, if any.
///
/// `option_order` is the option menu in display order; `roster_size` is the
/// full participant count. An option wins iff the distinct users who cast an
/// agree reaction for it cover the entire roster. If several options reach
/// unanimity (possible when people vote for more than one), the first in
/// menu order wins.
pub fn winning_option<'a>(
  option_order: &'a [String],
  votes: &[Vote],
  roster_size: usize,
) -> Option<&'a str> {
  if roster_size == 0 || votes.is_empty() {
    return None;
  }

  let mut agree_by_option: BTreeMap<&str, BTreeSet<i64>> = BTreeMap::new();
  for vote in votes.iter().filter(|v| v.reaction == AGREE_REACTION) {
    agree_by_option.entry(vote.option_id.as_str()).or_default().insert(vote.user_id);
  }

  option_order
    .iter()
    .find(|id| agree_by_option.get(id.as_str()).is_some_and(|users| users.len() == roster_size))
    .map(|id| id.as_str())
}

// ─── Date resolution ─────────────────────────────────────────────────────────

/// Resolve a bare month mention to its next future occurrence: this year if
/// the month has not yet passed, otherwise next year. The current month
/// counts as not yet passed.
pub fn resolve_bare_month(month: u32, today: NaiveDate) -> i32 {
  if month >= today.month() { today.year() } else { today.year() + 1 }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
  }

  fn mark(user_id: i64, d: &str, available: bool) -> Availability {
    Availability { trip_id: "t1".into(), user_id, date: date(d), available }
  }

  fn agree(user_id: i64, option_id: &str) -> Vote {
    Vote {
      trip_id:   "t1".into(),
      user_id,
      option_id: option_id.into(),
      reaction:  AGREE_REACTION.into(),
      timestamp: Utc::now(),
    }
  }

  #[test]
  fn consensus_requires_every_respondent() {
    let marks = vec![
      mark(1, "2026-10-01", true),
      mark(1, "2026-10-02", true),
      mark(2, "2026-10-01", true),
    ];
    // Only Oct 1 has both respondents; Oct 2 has just user 1.
    assert_eq!(consensus_dates(&marks), vec![date("2026-10-01")]);
  }

  #[test]
  fn explicit_unavailable_disqualifies_a_date() {
    let marks = vec![
      mark(1, "2026-10-01", true),
      mark(2, "2026-10-01", true),
      mark(2, "2026-10-01", false),
    ];
    // Conflicting marks for the same user still sink the date.
    assert!(consensus_dates(&marks).is_empty());
  }

  #[test]
  fn non_submitting_participants_do_not_block() {
    // Three participants on the trip, but only users 1 and 2 answered.
    // Consensus is unanimity among the two respondents.
    let marks = vec![
      mark(1, "2026-10-01", true),
      mark(1, "2026-10-02", true),
      mark(2, "2026-10-01", true),
      mark(2, "2026-10-02", true),
    ];
    assert_eq!(respondent_count(&marks), 2);
    assert_eq!(consensus_dates(&marks), vec![date("2026-10-01"), date("2026-10-02")]);
  }

  #[test]
  fn empty_input_yields_nothing() {
    assert!(consensus_dates(&[]).is_empty());
    assert_eq!(respondent_count(&[]), 0);
  }

  #[test]
  fn mixed_marks_intersect_correctly() {
    // Alice marks D1..D5 available; Bob marks D1, D2, D4 available and
    // D3, D5 unavailable. Exactly {D1, D2, D4} is consensus.
    let mut marks = Vec::new();
    for d in ["2026-10-01", "2026-10-02", "2026-10-03", "2026-10-04", "2026-10-05"] {
      marks.push(mark(1, d, true));
    }
    for d in ["2026-10-01", "2026-10-02", "2026-10-04"] {
      marks.push(mark(2, d, true));
    }
    for d in ["2026-10-03", "2026-10-05"] {
      marks.push(mark(2, d, false));
    }

    assert_eq!(
      consensus_dates(&marks),
      vec![date("2026-10-01"), date("2026-10-02"), date("2026-10-04")]
    );
  }

  #[test]
  fn vote_winner_requires_full_roster() {
    let options = vec!["option_1".to_string(), "option_2".to_string()];
    let votes = vec![agree(1, "option_1"), agree(2, "option_1")];

    // Two of three participants is not unanimity.
    assert_eq!(winning_option(&options, &votes, 3), None);
    // Among a roster of two it is.
    assert_eq!(winning_option(&options, &votes, 2), Some("option_1"));
  }

  #[test]
  fn non_agree_reactions_are_ignored() {
    let options = vec!["option_1".to_string()];
    let votes = vec![agree(1, "option_1"), Vote {
      reaction: "maybe".into(),
      ..agree(2, "option_1")
    }];
    assert_eq!(winning_option(&options, &votes, 2), None);
  }

  #[test]
  fn double_unanimity_resolves_to_menu_order() {
    let options = vec!["option_1".to_string(), "option_2".to_string()];
    let votes = vec![
      agree(1, "option_1"),
      agree(2, "option_1"),
      agree(1, "option_2"),
      agree(2, "option_2"),
    ];
    assert_eq!(winning_option(&options, &votes, 2), Some("option_1"));
  }

  #[test]
  fn no_votes_means_no_winner() {
    let options = vec!["option_1".to_string()];
    assert_eq!(winning_option(&options, &[], 2), None);
    assert_eq!(winning_option(&options, &[agree(1, "option_1")], 0), None);
  }

  #[test]
  fn bare_month_resolves_to_next_occurrence() {
    let today = date("2026-08-28");
    assert_eq!(resolve_bare_month(10, today), 2026); // future month, this year
    assert_eq!(resolve_bare_month(8, today), 2026); // current month counts
    assert_eq!(resolve_bare_month(3, today), 2027); // already passed
  }
}

//! Grouping members by term and browsing the groups.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::subject::{Subject, Term};

/// Label of the bucket holding members without a term.
pub const NO_TERM: &str = "no term";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermBucket {
  /// `None` for the "no term" bucket.
  pub term:    Option<Term>,
  pub members: Vec<Subject>,
}

impl TermBucket {
  pub fn label(&self) -> &str {
    self.term.as_ref().map_or(NO_TERM, Term::as_str)
  }
}

/// Buckets in ascending term order, with the "no term" bucket (if any) last.
/// Members keep their input order inside a bucket.
pub fn group_by_term(subjects: impl IntoIterator<Item = Subject>) -> Vec<TermBucket> {
  let mut by_term: BTreeMap<Term, Vec<Subject>> = BTreeMap::new();
  let mut without = Vec::new();

  for subject in subjects {
    match subject.effective_term().cloned() {
      Some(term) => by_term.entry(term).or_default().push(subject),
      None => without.push(subject),
    }
  }

  let mut buckets: Vec<TermBucket> = by_term
    .into_iter()
    .map(|(term, members)| TermBucket { term: Some(term), members })
    .collect();
  if !without.is_empty() {
    buckets.push(TermBucket { term: None, members: without });
  }
  buckets
}

/// A cursor over [`group_by_term`] buckets. Moving clamps at both ends.
#[derive(Debug, Clone)]
pub struct TermNavigator {
  buckets: Vec<TermBucket>,
  cursor:  usize,
}

impl TermNavigator {
  /// Starts on the most recent real term, else the "no term" bucket.
  pub fn new(subjects: impl IntoIterator<Item = Subject>) -> Self {
    let buckets = group_by_term(subjects);
    let cursor = buckets.iter().rposition(|b| b.term.is_some()).unwrap_or(0);
    Self { buckets, cursor }
  }

  pub fn buckets(&self) -> &[TermBucket] { &self.buckets }

  pub fn current_index(&self) -> usize { self.cursor }

  pub fn current(&self) -> Option<&TermBucket> { self.buckets.get(self.cursor) }

  pub fn has_previous(&self) -> bool { self.cursor > 0 }

  pub fn has_next(&self) -> bool { self.cursor + 1 < self.buckets.len() }

  pub fn previous(&mut self) -> Option<&TermBucket> {
    if self.has_previous() {
      self.cursor -= 1;
    }
    self.current()
  }

  pub fn next(&mut self) -> Option<&TermBucket> {
    if self.has_next() {
      self.cursor += 1;
    }
    self.current()
  }

  /// Move to the bucket for `term` (`None` for "no term"). Returns `false`
  /// and stays put if there is no such bucket.
  pub fn select(&mut self, term: Option<&Term>) -> bool {
    match self.buckets.iter().position(|b| b.term.as_ref() == term) {
      Some(index) => {
        self.cursor = index;
        true
      }
      None => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::role::Status;

  fn member(id: &str, term: Option<&str>) -> Subject {
    let subject = Subject::new(id, Status::Member);
    match term {
      Some(t) => subject.with_term(t),
      None => subject,
    }
  }

  fn labels(buckets: &[TermBucket]) -> Vec<&str> {
    buckets.iter().map(TermBucket::label).collect()
  }

  #[test]
  fn terms_sort_ascending_with_no_term_last() {
    let buckets = group_by_term(vec![
      member("a", Some("2023-2024")),
      member("b", Some("2022-2023")),
      member("c", None),
    ]);
    assert_eq!(labels(&buckets), vec!["2022-2023", "2023-2024", NO_TERM]);
  }

  #[test]
  fn blank_terms_land_in_no_term() {
    let mut blank = member("a", None);
    blank.term = serde_json::from_str("\"  \"").unwrap();
    let buckets = group_by_term(vec![blank, member("b", Some("2021-2022"))]);
    assert_eq!(labels(&buckets), vec!["2021-2022", NO_TERM]);
    assert_eq!(buckets[1].members[0].id.as_str(), "a");
  }

  #[test]
  fn members_keep_input_order() {
    let buckets = group_by_term(vec![
      member("z", Some("2022-2023")),
      member("a", Some("2022-2023")),
    ]);
    let ids: Vec<_> = buckets[0].members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["z", "a"]);
  }

  #[test]
  fn cursor_defaults_to_latest_term() {
    let nav = TermNavigator::new(vec![
      member("a", Some("2023-2024")),
      member("b", Some("2022-2023")),
      member("c", None),
    ]);
    assert_eq!(nav.current_index(), 1);
    assert_eq!(nav.current().unwrap().label(), "2023-2024");
  }

  #[test]
  fn cursor_defaults_to_no_term_then_zero() {
    let only_unassigned = TermNavigator::new(vec![member("a", None)]);
    assert_eq!(only_unassigned.current().unwrap().label(), NO_TERM);

    let empty = TermNavigator::new(Vec::new());
    assert_eq!(empty.current_index(), 0);
    assert!(empty.current().is_none());
  }

  #[test]
  fn navigation_clamps() {
    let mut nav = TermNavigator::new(vec![
      member("a", Some("2021-2022")),
      member("b", Some("2022-2023")),
      member("c", None),
    ]);

    assert_eq!(nav.next().unwrap().label(), NO_TERM);
    assert_eq!(nav.next().unwrap().label(), NO_TERM);
    assert!(!nav.has_next());

    assert_eq!(nav.previous().unwrap().label(), "2022-2023");
    assert_eq!(nav.previous().unwrap().label(), "2021-2022");
    assert_eq!(nav.previous().unwrap().label(), "2021-2022");
    assert_eq!(nav.current_index(), 0);
  }

  #[test]
  fn select_moves_to_named_term() {
    let mut nav = TermNavigator::new(vec![
      member("a", Some("2021-2022")),
      member("b", Some("2022-2023")),
    ]);
    assert!(nav.select(Term::new("2021-2022").as_ref()));
    assert_eq!(nav.current_index(), 0);
    assert!(!nav.select(Term::new("1999-2000").as_ref()));
    assert_eq!(nav.current_index(), 0);
  }
}

//! Episode diff: freshly fetched episodes → the ones worth notifying about.
//!
//! Membership is decided by [`EpisodeId`] alone. The output is ordered by
//! ascending release date so subscribers see episodes in release order; the
//! sort is stable, so episodes released on the same date keep the order the
//! provider returned them in.

use std::collections::HashSet;

use crate::episode::{Episode, EpisodeId};

/// Return the episodes of `fresh` whose id is not in `known`, oldest first.
///
/// Ids repeated within `fresh` are reported once, first occurrence wins.
/// Calling this again after adopting the result into `known` yields nothing.
pub fn diff(known: &HashSet<EpisodeId>, fresh: &[Episode]) -> Vec<Episode> {
  let mut seen: HashSet<&EpisodeId> = HashSet::new();
  let new: Vec<Episode> = fresh
    .iter()
    .filter(|e| !known.contains(&e.id) && seen.insert(&e.id))
    .cloned()
    .collect();
  sort_by_release(new)
}

/// Stable sort into ascending release order.
pub fn sort_by_release(mut episodes: Vec<Episode>) -> Vec<Episode> {
  episodes.sort_by_key(|e| e.release_date.date);
  episodes
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::episode::KnownEpisodes;

  fn ep(id: &str, date: &str) -> Episode {
    Episode {
      id:           id.into(),
      title:        format!("Episode {id}"),
      release_date: date.parse().unwrap(),
      external_url: Some(format!("https://example.com/episode/{id}")),
      duration_ms:  Some(1_800_000),
    }
  }

  fn ids(episodes: &[Episode]) -> Vec<&str> {
    episodes.iter().map(|e| e.id.as_str()).collect()
  }

  #[test]
  fn mutated_metadata_is_not_new() {
    let known = KnownEpisodes::from_episodes([ep("e1", "2024-01-01"), ep("e2", "2024-01-08")]);

    let mut e1 = ep("e1", "2024-01-01");
    e1.title = "Episode 1 (re-edited)".into();
    e1.external_url = Some("https://cdn.example.com/other".into());
    let fresh = vec![e1, ep("e2", "2024-01-08"), ep("e3", "2024-01-15")];

    let result = diff(known.ids(), &fresh);
    assert_eq!(ids(&result), ["e3"]);
  }

  #[test]
  fn adopting_the_diff_makes_it_empty() {
    let known = KnownEpisodes::from_episodes([ep("e1", "2024-01-01")]);
    let fresh = vec![ep("e3", "2024-01-15"), ep("e2", "2024-01-08"), ep("e1", "2024-01-01")];

    let first = diff(known.ids(), &fresh);
    assert_eq!(first.len(), 2);

    let known = known.merge(first);
    assert!(diff(known.ids(), &fresh).is_empty());
  }

  #[test]
  fn output_is_oldest_first() {
    let fresh = vec![
      ep("mar", "2024-03-01"),
      ep("jan", "2024-01-01"),
      ep("feb", "2024-02-01"),
    ];
    let result = diff(&HashSet::new(), &fresh);
    assert_eq!(ids(&result), ["jan", "feb", "mar"]);
  }

  #[test]
  fn same_day_keeps_provider_order() {
    let fresh = vec![
      ep("b", "2024-01-02"),
      ep("x", "2024-01-01"),
      ep("a", "2024-01-02"),
    ];
    let result = diff(&HashSet::new(), &fresh);
    assert_eq!(ids(&result), ["x", "b", "a"]);
  }

  #[test]
  fn coarse_dates_sort_at_period_start() {
    let fresh = vec![ep("day", "2024-03-05"), ep("month", "2024-03")];
    let result = diff(&HashSet::new(), &fresh);
    assert_eq!(ids(&result), ["month", "day"]);
  }

  #[test]
  fn duplicate_fresh_ids_reported_once() {
    let fresh = vec![ep("e1", "2024-01-01"), ep("e1", "2024-01-01")];
    assert_eq!(diff(&HashSet::new(), &fresh).len(), 1);
  }

  #[test]
  fn empty_inputs() {
    assert!(diff(&HashSet::new(), &[]).is_empty());
    let known = KnownEpisodes::from_episodes([ep("e1", "2024-01-01")]);
    assert!(diff(known.ids(), &[]).is_empty());
  }
}

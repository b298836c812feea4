//! Recognising show references pasted by users.

use podwatch_core::show::ShowId;

/// Extract a show id from an `open.spotify.com/show/<id>` link, a
/// `spotify:show:<id>` URI, or a bare id.
pub fn parse_show_ref(input: &str) -> Option<ShowId> {
  let input = input.trim();
  let rest = input
    .strip_prefix("https://open.spotify.com/show/")
    .or_else(|| input.strip_prefix("spotify:show:"))
    .unwrap_or(input);

  let id: &str = rest
    .split(['?', '/', '#'])
    .next()
    .unwrap_or_default();

  is_valid_id(id).then(|| ShowId::from(id))
}

/// Spotify ids are base-62 strings.
pub(crate) fn is_valid_id(id: &str) -> bool {
  !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

//! Text helpers shared by the transport and event layers: pattern extraction
//! from protocol payloads, `HH:MM:SS` timestamp conversion and XML escaping.

use regex::Regex;

/// The five reserved XML entity sequences.
const RESERVED_ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

/// Return the first capture group of the first match of `pattern` in `content`.
///
/// Returns an empty string if the pattern does not match (or is not a valid
/// expression).
pub fn find_one(pattern: &str, content: &str) -> String {
  match Regex::new(pattern) {
    Ok(re) => re
      .captures(content)
      .and_then(|caps| caps.get(1))
      .map(|m| m.as_str().to_string())
      .unwrap_or_default(),
    Err(e) => {
      log::error!("Invalid extraction pattern {}: {}", pattern, e);
      String::new()
    }
  }
}

/// Return the first capture group of every match of `pattern` in `content`.
pub fn find_all(pattern: &str, content: &str) -> Vec<String> {
  match Regex::new(pattern) {
    Ok(re) => re
      .captures_iter(content)
      .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
      .collect(),
    Err(e) => {
      log::error!("Invalid extraction pattern {}: {}", pattern, e);
      Vec::new()
    }
  }
}

/// Extract the text of the first `<tag>...</tag>` element in `xml`.
pub fn find_tag(tag: &str, xml: &str) -> String {
  let tag = regex::escape(tag);
  find_one(&format!("<{tag}>(.*)</{tag}>"), xml)
}

/// Convert a `H:MM:SS` timestamp into seconds. `None` when the text is not
/// a timestamp or the total does not fit in a `u32`.
pub fn timestamp_to_seconds(timestamp: &str) -> Option<u32> {
  let mut parts = timestamp.trim().split(':');
  let hours: u32 = parts.next()?.parse().ok()?;
  let minutes: u32 = parts.next()?.parse().ok()?;
  let seconds: u32 = parts.next()?.parse().ok()?;
  if parts.next().is_some() {
    return None;
  }
  hours
    .checked_mul(3600)?
    .checked_add(minutes.checked_mul(60)?)?
    .checked_add(seconds)
}

/// Convert seconds into a zero padded `HH:MM:SS` timestamp.
pub fn seconds_to_timestamp(seconds: u32) -> String {
  let hours = seconds / 3600;
  let minutes = (seconds % 3600) / 60;
  let secs = seconds % 60;
  format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Heuristic: does `s` contain any of the reserved entity sequences?
pub fn is_escaped(s: &str) -> bool {
  RESERVED_ENTITIES.iter().any(|entity| s.contains(entity))
}

/// Escape `&`, `<`, `>` and `"`, which is enough for element text and
/// double quoted attributes.
pub fn escape_xml(s: &str) -> String {
  html_escape::encode_double_quoted_attribute(s).into_owned()
}

/// Escape `s` unless it already looks escaped.
///
/// Callers must not pass double-escaped values: a value containing an entity
/// sequence is passed through untouched.
pub fn escape_if_needed(s: &str) -> String {
  if is_escaped(s) {
    s.to_string()
  } else {
    escape_xml(s)
  }
}

/// Decode one level of entities.
pub fn unescape_once(s: &str) -> String {
  html_escape::decode_html_entities(s).into_owned()
}

/// Decode entities until the payload no longer looks escaped.
///
/// Some devices escape response bodies more than once, so a single pass is
/// not enough.
pub fn unescape(s: &str) -> String {
  let mut current = s.to_string();
  while is_escaped(&current) {
    let decoded = unescape_once(&current);
    if decoded == current {
      break;
    }
    current = decoded;
  }
  current
}

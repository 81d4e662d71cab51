//! Session Link Parser (C7, spec §4.7).
//!
//! Extraction from a URL is platform-agnostic string work (no DOM access is
//! needed to read a path or query string), so unlike C1-C3 this component
//! lives entirely in `recorder-core` with no split adapter crate - the same
//! discipline as `thaumic-core::link`'s address-parsing helpers, which stay
//! pure functions over `&str` rather than reaching for a URL-parsing crate.

use crate::error::LinkError;
use crate::model::SessionId;

/// Extracts the raw session identifier string from a URL, accepting both
/// forms spec §6 requires: a trailing path segment or a `session` query
/// parameter. Returns `None` if neither form yields a non-empty candidate.
#[must_use]
pub fn extract_session_identifier(url: &str) -> Option<String> {
    if let Some(query_start) = url.find('?') {
        let query = &url[query_start + 1..];
        for pair in query.split('&') {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            if key == "session" && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    let path = url.split('?').next().unwrap_or(url);
    let candidate = path.trim_end_matches('/').rsplit('/').next()?;
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// Parses a raw identifier string into a [`SessionId`], validating the
/// structural invariants from spec §3: exactly five non-empty segments
/// joined by `-`, with the last segment a valid integer unix timestamp.
///
/// Total: every input produces either `Ok(SessionId)` or a descriptive
/// `Err(LinkError)` (spec §8 invariant 6, "link parsing is total").
pub fn parse_session_id(raw: &str) -> Result<SessionId, LinkError> {
    let segments: Vec<&str> = raw.split('-').collect();
    if segments.len() != 5 {
        return Err(LinkError::WrongSegmentCount {
            found: segments.len(),
        });
    }
    for (index, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(LinkError::EmptySegment { index });
        }
    }

    let unix_seconds: i64 = segments[4]
        .parse()
        .map_err(|_| LinkError::InvalidTimestamp)?;

    Ok(SessionId {
        random_prefix: segments[0].to_string(),
        prompt_id: segments[1].to_string(),
        user_id: segments[2].to_string(),
        storyteller_id: segments[3].to_string(),
        unix_seconds,
    })
}

/// Convenience wrapper combining extraction and parsing for a whole URL,
/// surfacing `MissingIdentifier` when neither URL form yields a candidate.
pub fn parse_session_link(url: &str) -> Result<SessionId, LinkError> {
    let raw = extract_session_identifier(url).ok_or(LinkError::MissingIdentifier)?;
    parse_session_id(&raw)
}

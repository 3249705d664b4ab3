//! Cleanup of profile references as they come out of the roster.
//!
//! Roster cells are hand-typed: people paste the same URL twice, or paste a URL
//! followed by an escaped space and whatever was next on their clipboard. Every
//! reference goes through [`normalize`] before any network call.

use compact_str::CompactString;

const SCHEME: &str = "http";
const ESCAPED_SPACE: &str = "%20";

/// Only a scheme occurrence at or past this offset counts as a pasted duplicate.
const DUPLICATE_OFFSET: usize = 10;

/// Cuts a reference at the second `http` when one appears past [`DUPLICATE_OFFSET`].
pub fn strip_duplicate_url(s: &str) -> &str {
    let hits = s.match_indices(SCHEME).map(|(i, _)| i).collect::<Vec<_>>();
    match hits.as_slice() {
        [_, second, ..] if hits.iter().any(|&i| i >= DUPLICATE_OFFSET) => &s[..*second],
        _ => s,
    }
}

/// Cuts a reference at its first `%20`.
pub fn strip_escaped_space(s: &str) -> &str {
    s.find(ESCAPED_SPACE).map_or(s, |i| &s[..i])
}

/// Never fails; shapes it does not recognise pass through trimmed.
pub fn normalize(raw: &str) -> &str {
    let s = raw.trim();
    if s.is_empty() {
        return s;
    }
    strip_escaped_space(strip_duplicate_url(s)).trim()
}

#[inline]
pub fn is_url_shaped(s: &str) -> bool {
    s.starts_with(SCHEME)
}

/// Last non-empty path segment, ignoring scheme, host, query string and fragment.
pub fn last_segment(s: &str) -> Option<&str> {
    let s = s.split(['?', '#']).next().unwrap_or(s);
    let s = s.split_once("://").map_or(s, |(_, rest)| rest);
    let (_, path) = s.split_once('/')?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|seg| !seg.is_empty())
}

/// Derives a platform handle from a reference.
///
/// URL-shaped values and values that mention `domain` yield their last path
/// segment; anything else is taken to be the handle itself.
pub fn handle(raw: &str, domain: &str) -> Option<CompactString> {
    let clean = normalize(raw);
    if clean.is_empty() {
        return None;
    }
    let mentions_domain = clean.to_ascii_lowercase().contains(domain);
    let handle = if is_url_shaped(clean) || mentions_domain {
        last_segment(clean)?
    } else {
        clean
    };
    if handle.contains(char::is_whitespace) {
        tracing::debug!(target: "normalize", "rejecting handle {handle:?} from {raw:?}");
        return None;
    }
    Some(CompactString::new(handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MALFORMED: [&str; 6] = [
        "https://leetcode.com/u/alice/https://leetcode.com/u/alice/",
        "https://www.codechef.com/users/bob%20https://x",
        "https://github.com/carol%20%20",
        "  https://www.hackerrank.com/profile/dave  ",
        "https://skillrack.gururaja.in/eve  https://skillrack.gururaja.in/eve%20",
        "",
    ];

    #[test]
    fn duplicated_url_is_cut_at_second_scheme() {
        assert_eq!(
            normalize("https://leetcode.com/u/alice/https://leetcode.com/u/alice/"),
            "https://leetcode.com/u/alice/"
        );
    }

    #[test]
    fn escaped_space_truncates() {
        assert_eq!(
            normalize("https://www.codechef.com/users/bob%20extra"),
            "https://www.codechef.com/users/bob"
        );
    }

    #[test]
    fn short_values_pass_through() {
        assert_eq!(normalize("bob"), "bob");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("http http"), "http http");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in MALFORMED {
            let once = normalize(raw);
            assert_eq!(normalize(once), once, "input {raw:?}");
        }
    }

    #[test]
    fn handle_from_url_or_bare_value() {
        assert_eq!(handle("https://github.com/carol/", "github.com").as_deref(), Some("carol"));
        assert_eq!(handle("github.com/carol?tab=repositories", "github.com").as_deref(), Some("carol"));
        assert_eq!(handle("carol", "github.com").as_deref(), Some("carol"));
        assert_eq!(handle("", "github.com"), None);
        assert_eq!(handle("https://", "github.com"), None);
    }
}

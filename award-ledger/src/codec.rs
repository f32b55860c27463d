//! Ledger text codec
//!
//! Two shapes are supported:
//!
//! - **Line-oriented**: one `<@USER>🏆xCOUNT` line per user. Lines that do
//!   not match the grammar (headers, stray text, malformed counts) are
//!   skipped, so the blob may carry incidental formatting.
//! - **Suffix-embedded**: a display label ending in ` 🏆xCOUNT`. The base
//!   text is truncated, never the suffix, to respect the label limit.

use crate::types::{Ledger, UserId, TROPHY};

/// Longest suffix a `u64` count can produce (` 🏆x` + 20 digits)
pub const MAX_SUFFIX_LENGTH: usize = 3 + 20;

/// Parse one ledger line into `(user, count)`
///
/// Grammar: `<@` `!`? USER `>` `🏆` `x` DIGITS, with surrounding whitespace
/// ignored. Zero counts are not ledger entries and yield `None`.
pub fn parse_line(line: &str) -> Option<(UserId, u64)> {
    let rest = line.trim().strip_prefix("<@")?;
    let rest = rest.strip_prefix('!').unwrap_or(rest);

    let close = rest.find('>')?;
    let (id, rest) = (&rest[..close], &rest[close + 1..]);
    if !UserId::is_valid(id) {
        return None;
    }

    let digits = rest.strip_prefix(TROPHY)?.strip_prefix('x')?;
    let count = parse_count(digits)?;
    if count == 0 {
        return None;
    }

    Some((UserId::new(id), count))
}

/// Base-10 digits only; overflow is a malformed count
fn parse_count(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Render one ledger line
pub fn format_line(user_id: &UserId, count: u64) -> String {
    format!("{}{}x{}", user_id.mention(), TROPHY, count)
}

/// Decode a line-oriented blob, skipping lines outside the grammar
pub fn decode(blob: &str) -> Ledger {
    let mut ledger = Ledger::new();
    for line in blob.lines() {
        match parse_line(line) {
            Some((user_id, count)) => ledger.set(user_id, count),
            None if !line.trim().is_empty() => {
                tracing::trace!(line, "Skipping non-ledger line");
            }
            None => {}
        }
    }
    ledger
}

/// A header must stay one line and must not read back as a ledger entry
pub fn is_valid_header(header: &str) -> bool {
    !header.contains(['\n', '\r']) && parse_line(header).is_none()
}

/// Encode a ledger, header first, entries in id order
pub fn encode(ledger: &Ledger, header: Option<&str>) -> String {
    header
        .into_iter()
        .map(str::to_string)
        .chain(ledger.iter().map(|(id, count)| format_line(id, count)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a display label into its base text and embedded count
pub fn split_suffix(label: &str) -> (&str, Option<u64>) {
    let trimmed = label.trim_end();
    let digits_start = trimmed
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + trimmed[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);

    let suffix = trimmed[..digits_start]
        .strip_suffix('x')
        .and_then(|rest| rest.strip_suffix(TROPHY));

    match (suffix, parse_count(&trimmed[digits_start..])) {
        (Some(base), Some(count)) => (base.trim(), Some(count)),
        _ => (label.trim(), None),
    }
}

/// Render a display label carrying `count`, fitting `max_length` characters
///
/// A zero count yields the bare base label.
pub fn render_label(base: &str, count: u64, max_length: usize) -> String {
    let base = base.trim();
    if count == 0 {
        return truncate_chars(base, max_length).trim_end().to_string();
    }

    let suffix = format!(" {}x{}", TROPHY, count);
    let room = max_length.saturating_sub(suffix.chars().count());
    let base = truncate_chars(base, room).trim_end();

    if base.is_empty() {
        suffix.trim_start().to_string()
    } else {
        format!("{}{}", base, suffix)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("<@u1>🏆x3"), Some((UserId::new("u1"), 3)));
        assert_eq!(parse_line("<@!42>🏆x10"), Some((UserId::new("42"), 10)));
        assert_eq!(parse_line("  <@42>🏆x7\r"), Some((UserId::new("42"), 7)));
    }

    #[test]
    fn test_parse_line_rejects_foreign_content() {
        assert_eq!(parse_line("🏆 Leaderboard"), None);
        assert_eq!(parse_line("<@>🏆x3"), None);
        assert_eq!(parse_line("<@42>🏆x"), None);
        assert_eq!(parse_line("<@42>🏆x-1"), None);
        assert_eq!(parse_line("<@42>🏆x3 extra"), None);
        assert_eq!(parse_line("<@42> 🏆x3"), None);
        assert_eq!(parse_line("<@42>🏆x0"), None);
        assert_eq!(parse_line("<@42>🏆x99999999999999999999999"), None);
    }

    #[test]
    fn test_decode_skips_noise() {
        let blob = "🏆 Leaderboard\n<@1>🏆x2\nrandom chatter\n<@2>🏆xabc\n<@3>🏆x5";
        let ledger = decode(blob);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.count(&UserId::new("1")), 2);
        assert_eq!(ledger.count(&UserId::new("3")), 5);
    }

    #[test]
    fn test_header_validity() {
        assert!(is_valid_header("🏆 Leaderboard"));
        assert!(is_valid_header(""));
        assert!(!is_valid_header("Top\n<@ghost>🏆x7"));
        assert!(!is_valid_header("Top\r\nMore"));
        assert!(!is_valid_header("<@ghost>🏆x7"));
        assert!(!is_valid_header("  <@!ghost>🏆x7  "));
    }

    #[test]
    fn test_decode_later_duplicate_wins() {
        let ledger = decode("<@1>🏆x2\n<@!1>🏆x4");
        assert_eq!(ledger.count(&UserId::new("1")), 4);
    }

    #[test]
    fn test_encode() {
        let ledger: Ledger = vec![(UserId::new("2"), 1), (UserId::new("1"), 3)]
            .into_iter()
            .collect();
        assert_eq!(encode(&ledger, None), "<@1>🏆x3\n<@2>🏆x1");
        assert_eq!(
            encode(&ledger, Some("Board")),
            "Board\n<@1>🏆x3\n<@2>🏆x1"
        );
        assert_eq!(encode(&Ledger::new(), Some("Board")), "Board");
        assert_eq!(encode(&Ledger::new(), None), "");
    }

    #[test]
    fn test_split_suffix() {
        assert_eq!(split_suffix("alice 🏆x3"), ("alice", Some(3)));
        assert_eq!(split_suffix("alice   🏆x12  "), ("alice", Some(12)));
        assert_eq!(split_suffix("alice"), ("alice", None));
        assert_eq!(split_suffix("agent 007"), ("agent 007", None));
        assert_eq!(split_suffix("🏆x4"), ("", Some(4)));
        assert_eq!(split_suffix(""), ("", None));
    }

    #[test]
    fn test_render_label() {
        assert_eq!(render_label("alice", 3, 32), "alice 🏆x3");
        assert_eq!(render_label("alice", 0, 32), "alice");
        assert_eq!(render_label("", 2, 32), "🏆x2");
    }

    #[test]
    fn test_render_label_truncates_base_not_suffix() {
        let base = "a very long display name that goes on";
        let label = render_label(base, 12, 32);
        assert_eq!(label.chars().count(), 32);
        assert!(label.ends_with(" 🏆x12"));
        assert_eq!(label, "a very long display name th 🏆x12");
    }

    #[test]
    fn test_render_label_trims_truncated_base() {
        // Truncation lands right after a space
        let label = render_label("abcdefghij klmnop", 5, 15);
        assert_eq!(label, "abcdefghij 🏆x5");
    }

    #[test]
    fn test_render_then_split() {
        let label = render_label("bob", 9, 32);
        assert_eq!(split_suffix(&label), ("bob", Some(9)));
    }
}

//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Build a display offset from minutes east of UTC, falling back to UTC
pub fn display_offset(utc_offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
}

/// Format a deadline for user display in the configured offset
pub fn format_deadline(deadline: DateTime<Utc>, offset: FixedOffset) -> String {
    deadline.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string()
}

/// Format a timestamp as RFC 3339 in the configured offset
pub fn format_iso(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp.with_timezone(&offset).to_rfc3339()
}

/// Parse an ISO-8601 deadline with explicit offset.
///
/// A bare `YYYY-MM-DDTHH:MM[:SS]` is read in the display offset, matching what the
/// prompt asks the model to produce when it forgets the suffix.
pub fn parse_deadline(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return naive
                .and_local_timezone(offset)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    None
}

/// Render a remaining duration like "1 d 2 h" or "15 min"
pub fn format_remaining(remaining: Duration) -> String {
    let total_minutes = remaining.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{} d", days));
    }
    if hours > 0 {
        parts.push(format!("{} h", hours));
    }
    if minutes > 0 && days == 0 {
        parts.push(format!("{} min", minutes));
    }

    if parts.is_empty() {
        "< 1 min".to_string()
    } else {
        parts.join(" ")
    }
}

/// Escape text for Telegram HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>a & b</b>"), "&lt;b&gt;a &amp; b&lt;/b&gt;");
    }

    #[test]
    fn test_parse_deadline_with_offset() {
        let offset = display_offset(0);
        let parsed = parse_deadline("2024-06-14T10:00:00+03:00", offset).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 14, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_deadline_without_offset_uses_display_offset() {
        let offset = display_offset(180);
        let parsed = parse_deadline("2024-06-14T10:00", offset).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 14, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_deadline_rejects_garbage() {
        let offset = display_offset(0);
        assert!(parse_deadline("next friday", offset).is_none());
        assert!(parse_deadline("   ", offset).is_none());
    }

    #[test]
    fn test_format_deadline() {
        let deadline = Utc.with_ymd_and_hms(2024, 6, 14, 7, 0, 0).unwrap();
        assert_eq!(format_deadline(deadline, display_offset(180)), "14.06.2024 10:00");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::minutes(75)), "1 h 15 min");
        assert_eq!(format_remaining(Duration::minutes(15)), "15 min");
        assert_eq!(format_remaining(Duration::hours(26)), "1 d 2 h");
        assert_eq!(format_remaining(Duration::seconds(20)), "< 1 min");
    }
}

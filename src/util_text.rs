use chrono::{DateTime, NaiveDateTime, Utc};

/// Format a count with thousands separators
/// Examples: "0", "999", "12,345", "1,000,000"
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a count with compact suffix for narrow columns (e.g., "12.3K")
pub fn format_count_compact(n: u64) -> String {
    const MILLION: u64 = 1_000_000;
    const THOUSAND: u64 = 1_000;

    if n >= MILLION {
        let whole = n / MILLION;
        let decimal = (n % MILLION) * 10 / MILLION;
        if decimal == 0 { format!("{whole}M") } else { format!("{whole}.{decimal}M") }
    } else if n >= THOUSAND {
        let whole = n / THOUSAND;
        let decimal = (n % THOUSAND) * 10 / THOUSAND;
        if decimal == 0 { format!("{whole}K") } else { format!("{whole}.{decimal}K") }
    } else {
        n.to_string()
    }
}

/// Parse the timestamp shapes the feed backend emits: RFC 3339, the
/// `Wed Oct 10 20:19:24 +0000 2018` style, or a bare UTC `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y") {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

/// "just now", "42s ago", "5m ago", "3h ago", "2d ago".
/// Unparseable input is returned unchanged.
pub fn relative_time(raw: &str, now: DateTime<Utc>) -> String {
    let Some(t) = parse_timestamp(raw) else {
        return raw.to_string();
    };
    let secs = (now - t).num_seconds();
    match secs {
        i64::MIN..=4 => "just now".to_string(),
        5..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Truncate to `max` characters, ending with an ellipsis when cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Collapse newlines and runs of whitespace so a post fits on one row.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(12_345_678), "12,345,678");
    }

    #[test]
    fn test_format_count_compact() {
        assert_eq!(format_count_compact(950), "950");
        assert_eq!(format_count_compact(1_000), "1K");
        assert_eq!(format_count_compact(12_345), "12.3K");
        assert_eq!(format_count_compact(2_500_000), "2.5M");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(relative_time("2024-05-01T11:59:58Z", now), "just now");
        assert_eq!(relative_time("2024-05-01T11:59:00Z", now), "1m ago");
        assert_eq!(relative_time("Wed May 01 09:00:00 +0000 2024", now), "3h ago");
        assert_eq!(relative_time("2024-04-28 12:00:00", now), "3d ago");
        assert_eq!(relative_time("yesterday-ish", now), "yesterday-ish");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 6), "hello…");
        assert_eq!(truncate_chars("ßßßß", 3), "ßß…");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("gm\n\n  frens \t!"), "gm frens !");
    }
}

use regex::Regex;
use std::sync::OnceLock;

/// Parses a Data API counter string. Leading digits only, anything else is zero.
pub fn parse_count(value: &str) -> u64 {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Compact display form: `1500` -> `1.5K`, `2300000` -> `2.3M`.
pub fn format_number(value: &str) -> String {
    format_count(parse_count(value))
}

pub fn format_count(number: u64) -> String {
    if number >= 1_000_000 {
        format!("{:.1}M", number as f64 / 1_000_000.0)
    } else if number >= 1_000 {
        format!("{:.1}K", number as f64 / 1_000.0)
    } else {
        number.to_string()
    }
}

/// Converts an ISO-8601 duration such as `PT4M13S` into `4:13`.
pub fn format_iso_duration(duration: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
    });

    let Some(caps) = pattern.captures(duration) else {
        return "0:00".to_string();
    };
    let part = |idx: usize| -> u64 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let (hours, minutes, seconds) = (part(1), part(2), part(3));

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Seconds in a `m:ss` or `h:mm:ss` clock string; other shapes, and totals past `u64`, count as zero.
pub fn parse_clock_duration(duration: &str) -> u64 {
    let parts: Vec<u64> = match duration
        .split(':')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<_, _>>()
    {
        Ok(parts) => parts,
        Err(_) => return 0,
    };

    let total = match parts.as_slice() {
        [minutes, seconds] => minutes.checked_mul(60).and_then(|m| m.checked_add(*seconds)),
        [hours, minutes, seconds] => hours
            .checked_mul(3600)
            .zip(minutes.checked_mul(60))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|hm| hm.checked_add(*seconds)),
        _ => None,
    };
    total.unwrap_or(0)
}

/// Minimal escaping for text interpolated into the HTML templates.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_numbers() {
        assert_eq!(format_number("999"), "999");
        assert_eq!(format_number("1500"), "1.5K");
        assert_eq!(format_number("25200"), "25.2K");
        assert_eq!(format_number("1000000"), "1.0M");
        assert_eq!(format_number("2340000"), "2.3M");
        assert_eq!(format_number("not a number"), "0");
    }

    #[test]
    fn counts_parse_leading_digits() {
        assert_eq!(parse_count("1250"), 1250);
        assert_eq!(parse_count(" 42 "), 42);
        assert_eq!(parse_count("12abc"), 12);
        assert_eq!(parse_count(""), 0);
    }

    #[test]
    fn iso_durations() {
        assert_eq!(format_iso_duration("PT4M13S"), "4:13");
        assert_eq!(format_iso_duration("PT1H2M3S"), "1:02:03");
        assert_eq!(format_iso_duration("PT45S"), "0:45");
        assert_eq!(format_iso_duration("PT10M"), "10:00");
        assert_eq!(format_iso_duration("garbage"), "0:00");
    }

    #[test]
    fn clock_durations() {
        assert_eq!(parse_clock_duration("12:34"), 754);
        assert_eq!(parse_clock_duration("1:02:03"), 3723);
        assert_eq!(parse_clock_duration("15"), 0);
        assert_eq!(parse_clock_duration("a:b"), 0);
        assert_eq!(parse_clock_duration(&format_iso_duration("PT6000000000000000H")), 0);
        assert_eq!(parse_clock_duration("18446744073709551615:00"), 0);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>\"Tom & Jerry's\"</b>"), "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;");
    }
}

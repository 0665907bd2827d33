// MIT License
// Copyright (c) 2024 Graham King

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_name: String,
    /// RFC 3339 in UTC, e.g. 2024-05-01T17:00:06Z
    pub publish_date: String,
    pub likes: i64,
    pub views: i64,
    /// Seconds
    pub duration: i64,
    pub comment_count: i64,
}

/// One timed line of a transcript
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    /// Offset from the start of the video, in seconds
    pub start: f64,
    pub text: String,
}

impl CaptionLine {
    pub fn new(start: f64, text: &str) -> Self {
        CaptionLine {
            start,
            text: text.to_string(),
        }
    }
}

/// The transcript as one string: lines in order, separated by a single space
pub fn join_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    lines.into_iter().collect::<Vec<&str>>().join(" ")
}

/// Parse an ISO 8601 duration as the Data API returns it (PT1H2M3S) to
/// seconds. Anything unexpected counts as zero.
pub fn parse_duration(s: &str) -> i64 {
    let Some(rest) = s.strip_prefix('P') else {
        return 0;
    };
    let mut total = 0.0;
    let mut num = String::new();
    let mut in_time = false;
    for ch in rest.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            num.push(ch);
            continue;
        }
        let n: f64 = num.parse().unwrap_or(0.0);
        num.clear();
        total += match (in_time, ch) {
            (false, 'T') => {
                in_time = true;
                0.0
            }
            (false, 'D') => n * 86400.0,
            (false, 'W') => n * 7.0 * 86400.0,
            (true, 'H') => n * 3600.0,
            (true, 'M') => n * 60.0,
            (true, 'S') => n,
            _ => return 0,
        };
    }
    total as i64
}

/// Bring a publish timestamp into one shape so text ordering is time ordering
pub fn normalize_date(s: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt
            .with_timezone(&chrono::Utc)
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        Err(_) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_duration("PT15M"), 900);
        assert_eq!(parse_duration("PT45S"), 45);
        assert_eq!(parse_duration("P1DT1S"), 86401);
        assert_eq!(parse_duration("P0D"), 0);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("1:02:03"), 0);
        assert_eq!(parse_duration("PT1X"), 0);
    }

    #[test]
    fn dates_normalize_to_utc_seconds() {
        assert_eq!(
            normalize_date("2024-05-01T19:00:06.123+02:00"),
            "2024-05-01T17:00:06Z"
        );
        assert_eq!(normalize_date("2024-05-01T17:00:06Z"), "2024-05-01T17:00:06Z");
        assert_eq!(normalize_date("yesterday"), "yesterday");
    }

    #[test]
    fn join() {
        assert_eq!(join_lines(["a", "b"]), "a b");
        assert_eq!(join_lines(Vec::<&str>::new()), "");
    }
}

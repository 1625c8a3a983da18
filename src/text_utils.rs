use std::ops::Index;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATE_REGEX: Regex = Regex::new(r"^\s*(\d{4})-(\d{1,2})-(\d{1,2})").unwrap();
    static ref TAG_BLOCK_REGEX: Regex = Regex::new(r"\{%.*?%\}").unwrap();
    static ref TAG_VAR_REGEX: Regex = Regex::new(r"\{\{.*?\}\}").unwrap();
}

fn to_int<T: std::str::FromStr>(num_str: &str, date_str: &str) -> Result<T, String> {
    match num_str.parse::<T>() {
        Ok(x) => Ok(x),
        Err(_) => Err(format!("Error parsing {} from the date {}", num_str, date_str)),
    }
}

/// Parses the calendar date at the start of a post date.
/// Accepts `2024-03-05`, `2024-03-05 10:00:00 +0000` and RFC 3339 timestamps.
pub fn parse_post_date(buf: &str) -> Result<NaiveDate, String> {
    let Some(caps) = DATE_REGEX.captures(buf) else {
        return Err(format!("Unable to parse date {}", buf));
    };

    let y: i32 = to_int(caps.index(1), buf)?;
    let m: u32 = to_int(caps.index(2), buf)?;
    let d: u32 = to_int(caps.index(3), buf)?;

    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("Invalid date {}", buf))
}

/// Long-form US English date, e.g. `March 5, 2024`.
/// Dates that can't be parsed are shown as they came.
pub fn format_long_date(buf: &str) -> String {
    match parse_post_date(buf) {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => buf.trim().to_string(),
    }
}

/// Removes unrendered `{% ... %}` and `{{ ... }}` placeholders.
/// Matching is non-greedy and never crosses a line break.
pub fn strip_template_tags(content: &str) -> String {
    let without_blocks = TAG_BLOCK_REGEX.replace_all(content, "");
    TAG_VAR_REGEX.replace_all(&without_blocks, "").into_owned()
}

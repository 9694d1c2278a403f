use chrono::{DateTime, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::types::Location;

pub fn total_pages(total: i64, limit: u32) -> i64 {
    if limit == 0 {
        return 0;
    }
    let limit = i64::from(limit);
    (total + limit - 1) / limit
}

pub fn maps_url(location: &Location) -> String {
    format!(
        "https://www.google.com/maps?q={},{}",
        location.lat, location.lng
    )
}

/// Formats an amount as `$1,234.56 MXN`.
pub fn format_money(amount: f64, currency: &str) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{dec_part} {currency}")
}

/// Greedy word wrap used for free-text blocks on the receipt.
pub fn wrap_words(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = vec![];
    let mut line = String::new();

    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > max_width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// First `max_chars` characters of `text`, cut on a character boundary.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date_param(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn parse_number_param(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Trims a required text field in place.
pub fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Trims an optional text field, dropping it when nothing is left.
pub fn trim_optional(value: &mut Option<String>) {
    *value = value
        .take()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(250, 100, 3)]
    fn pages_round_up(#[case] total: i64, #[case] limit: u32, #[case] expected: i64) {
        assert_eq!(total_pages(total, limit), expected);
    }

    #[rstest]
    #[case(1800.0, "$1,800.00 MXN")]
    #[case(100.0, "$100.00 MXN")]
    #[case(1234567.891, "$1,234,567.89 MXN")]
    #[case(0.5, "$0.50 MXN")]
    fn money_is_grouped_by_thousands(#[case] amount: f64, #[case] expected: &str) {
        assert_eq!(format_money(amount, "MXN"), expected);
    }

    #[test]
    fn wrap_keeps_lines_within_width() {
        let text = "Entregar en la puerta trasera del almacen antes de las diez de la manana";
        let lines = wrap_words(text, 40);

        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 40));
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn date_params_accept_plain_dates_and_rfc3339() {
        let day = parse_date_param(Some("2024-03-05")).unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-05T00:00:00+00:00");

        let ts = parse_date_param(Some("2024-03-05T10:30:00-06:00")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-05T16:30:00+00:00");

        assert!(parse_date_param(Some("yesterday")).is_none());
        assert!(parse_date_param(None).is_none());
    }

    #[test]
    fn optional_fields_are_dropped_when_blank() {
        let mut blank = Some("   ".to_string());
        trim_optional(&mut blank);
        assert_eq!(blank, None);

        let mut padded = Some("  ACME  ".to_string());
        trim_optional(&mut padded);
        assert_eq!(padded.as_deref(), Some("ACME"));
    }

    #[test]
    fn preview_never_splits_a_character() {
        let body = format!("{}é…", "x".repeat(199));
        assert_eq!(preview(&body, 200), format!("{}é", "x".repeat(199)));
        assert_eq!(preview("corto", 200), "corto");
        assert_eq!(preview("ñandú", 2), "ña");
    }

    #[test]
    fn hmac_matches_rfc_4231_vector() {
        let mac = hmac_sha256(b"Jefe", &[b"what do ya want ", b"for nothing?"]).unwrap();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"abc", b"abd"));
    }
}

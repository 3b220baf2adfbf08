//! Locale-aware amount and date parsing

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::str::FromStr;

/// Decimal and digit-grouping separators of a locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal: char,
    pub grouping: char,
}

/// Languages writing `1.234,56`
const COMMA_DECIMAL_LANGUAGES: [&str; 12] = [
    "pt", "de", "es", "fr", "it", "nl", "ru", "tr", "id", "da", "sv", "nb",
];

impl NumberFormat {
    pub const DOT_DECIMAL: NumberFormat = NumberFormat {
        decimal: '.',
        grouping: ',',
    };
    pub const COMMA_DECIMAL: NumberFormat = NumberFormat {
        decimal: ',',
        grouping: '.',
    };

    /// Separators for a BCP 47 tag such as `pt-BR`, `en_US` or `de`
    pub fn for_locale(tag: &str) -> Self {
        let language = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if COMMA_DECIMAL_LANGUAGES.contains(&language.as_str()) {
            Self::COMMA_DECIMAL
        } else {
            Self::DOT_DECIMAL
        }
    }
}

/// Parse a statement amount, keeping its sign.
///
/// Accepts currency markers (`R$`, `$`, `BRL`), inner spaces, `-` on either
/// side and accounting parentheses. Separators are resolved against the locale
/// but tolerate the other convention when unambiguous, so `100.00` is one
/// hundred under `pt-BR` while `1.234` is one thousand two hundred thirty-four.
pub fn parse_amount(raw: &str, format: NumberFormat) -> Result<BigDecimal, String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| c.is_alphabetic() || "$€£¥".contains(c))
        .trim();

    let mut negative = false;
    let mut body: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\'')
        .collect();

    if body.starts_with('(') && body.ends_with(')') && body.len() > 2 {
        negative = true;
        body = body[1..body.len() - 1].to_string();
    }
    body = body
        .trim_start_matches(|c: char| c.is_alphabetic() || "$€£¥".contains(c))
        .to_string();
    if let Some(rest) = body.strip_prefix('-') {
        negative = !negative;
        body = rest.to_string();
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest.to_string();
    } else if let Some(rest) = body.strip_suffix('-') {
        negative = !negative;
        body = rest.to_string();
    }
    body = body
        .trim_start_matches(|c: char| c.is_alphabetic() || "$€£¥".contains(c))
        .to_string();

    if body.is_empty() || !body.chars().any(|c| c.is_ascii_digit()) {
        return Err(format!("'{}' is not an amount", raw.trim()));
    }
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return Err(format!("'{}' contains unexpected characters", raw.trim()));
    }

    let normalized = normalize_separators(&body, format)
        .ok_or_else(|| format!("'{}' has misplaced separators", raw.trim()))?;
    let value = BigDecimal::from_str(&normalized)
        .map_err(|e| format!("'{}' is not an amount: {}", raw.trim(), e))?;

    Ok(if negative { -value } else { value })
}

/// Rewrite `body` (digits, `.` and `,` only) into `1234.56` form
fn normalize_separators(body: &str, format: NumberFormat) -> Option<String> {
    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');

    let decimal = match (last_dot, last_comma) {
        (None, None) => return Some(body.to_string()),
        (Some(d), Some(c)) => {
            if d > c {
                Some('.')
            } else {
                Some(',')
            }
        }
        (Some(_), None) => single_separator_role(body, '.', format),
        (None, Some(_)) => single_separator_role(body, ',', format),
    };

    let (integer, fraction) = match decimal {
        Some(sep) => {
            let idx = body.rfind(sep)?;
            (&body[..idx], Some(&body[idx + 1..]))
        }
        None => (body, None),
    };

    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    let digits = strip_grouping(integer)?;
    Some(match fraction {
        Some(fraction) => format!("{}.{}", digits, fraction),
        None => digits,
    })
}

/// Decide whether a lone separator kind is the decimal point (`Some`) or grouping (`None`)
fn single_separator_role(body: &str, sep: char, format: NumberFormat) -> Option<char> {
    let occurrences = body.matches(sep).count();
    if occurrences > 1 {
        return None;
    }
    if sep == format.decimal {
        return Some(sep);
    }
    let (before, after) = body.split_once(sep)?;
    if !before.is_empty() && after.len() == 3 {
        None
    } else {
        Some(sep)
    }
}

/// Remove grouping separators, requiring three-digit groups after the first
fn strip_grouping(integer: &str) -> Option<String> {
    let groups: Vec<&str> = integer.split(['.', ',']).collect();
    if groups.len() > 1 {
        let first = groups[0];
        if first.is_empty() || first.len() > 3 {
            return None;
        }
        if groups[1..].iter().any(|g| g.len() != 3) {
            return None;
        }
    }
    let digits: String = groups.concat();
    if digits.is_empty() {
        Some("0".to_string())
    } else {
        Some(digits)
    }
}

/// Translate a `dd/MM/yyyy` style pattern into chrono's `%d/%m/%Y`.
///
/// Patterns already containing `%` are returned unchanged.
pub fn to_chrono_pattern(pattern: &str) -> String {
    if pattern.contains('%') {
        return pattern.to_string();
    }

    const TOKENS: [(&str, &str); 9] = [
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("M", "%m"),
        ("d", "%d"),
    ];

    let mut out = String::with_capacity(pattern.len() + 4);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// Parse a date with the first pattern that accepts it.
///
/// Patterns carrying a time component are accepted and truncated to the date.
pub fn parse_date(raw: &str, patterns: &[String]) -> Result<NaiveDate, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("date is empty".to_string());
    }

    for pattern in patterns {
        let pattern = to_chrono_pattern(pattern);
        if let Ok(date) = NaiveDate::parse_from_str(value, &pattern) {
            return Ok(date);
        }
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, &pattern) {
            return Ok(datetime.date());
        }
    }

    Err(format!(
        "'{}' does not match any of the patterns {:?}",
        value, patterns
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(raw: &str, locale: &str) -> Option<BigDecimal> {
        parse_amount(raw, NumberFormat::for_locale(locale)).ok()
    }

    fn dec(s: &str) -> Option<BigDecimal> {
        Some(BigDecimal::from_str(s).unwrap())
    }

    #[test]
    fn test_locale_separators() {
        assert_eq!(
            NumberFormat::for_locale("pt-BR"),
            NumberFormat::COMMA_DECIMAL
        );
        assert_eq!(
            NumberFormat::for_locale("de_DE"),
            NumberFormat::COMMA_DECIMAL
        );
        assert_eq!(NumberFormat::for_locale("en-US"), NumberFormat::DOT_DECIMAL);
        assert_eq!(NumberFormat::for_locale(""), NumberFormat::DOT_DECIMAL);
    }

    #[test]
    fn test_pt_br_amounts() {
        assert_eq!(amount("1.234,56", "pt-BR"), dec("1234.56"));
        assert_eq!(amount("R$ 1.234,56", "pt-BR"), dec("1234.56"));
        assert_eq!(amount("-12,50", "pt-BR"), dec("-12.50"));
        assert_eq!(amount("12,50-", "pt-BR"), dec("-12.50"));
        assert_eq!(amount("(99,90)", "pt-BR"), dec("-99.90"));
        assert_eq!(amount("1.234", "pt-BR"), dec("1234"));
        assert_eq!(amount("100.00", "pt-BR"), dec("100.00"));
        assert_eq!(amount("1.234.567,8", "pt-BR"), dec("1234567.8"));
    }

    #[test]
    fn test_en_us_amounts() {
        assert_eq!(amount("1,234.56", "en-US"), dec("1234.56"));
        assert_eq!(amount("$-42.10", "en-US"), dec("-42.10"));
        assert_eq!(amount("1,234", "en-US"), dec("1234"));
        assert_eq!(amount("1.234", "en-US"), dec("1.234"));
        assert_eq!(amount("12,50", "en-US"), dec("12.50"));
        assert_eq!(amount("+7", "en-US"), dec("7"));
    }

    #[test]
    fn test_malformed_amounts() {
        assert_eq!(amount("", "pt-BR"), None);
        assert_eq!(amount("abc", "pt-BR"), None);
        assert_eq!(amount("12a3", "pt-BR"), None);
        assert_eq!(amount("1,2,3", "pt-BR"), None);
        assert_eq!(amount("12.34.5", "en-US"), None);
        assert_eq!(amount("10,", "pt-BR"), None);
    }

    #[test]
    fn test_java_patterns() {
        assert_eq!(to_chrono_pattern("dd/MM/yyyy"), "%d/%m/%Y");
        assert_eq!(
            to_chrono_pattern("yyyy-MM-dd HH:mm:ss"),
            "%Y-%m-%d %H:%M:%S"
        );
        assert_eq!(to_chrono_pattern("%d.%m.%Y"), "%d.%m.%Y");
    }

    #[test]
    fn test_first_matching_pattern_wins() {
        let patterns = vec!["%d/%m/%Y".to_string(), "%m/%d/%Y".to_string()];
        assert_eq!(
            parse_date("03/04/2024", &patterns),
            Ok(NaiveDate::from_ymd_opt(2024, 4, 3).unwrap())
        );
        assert_eq!(
            parse_date("12/25/2024", &patterns),
            Ok(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap())
        );
        assert!(parse_date("2024-13-01", &patterns).is_err());
        assert!(parse_date("", &patterns).is_err());
    }

    #[test]
    fn test_datetime_pattern_truncates() {
        let patterns = vec!["yyyy-MM-dd HH:mm:ss".to_string()];
        assert_eq!(
            parse_date("2024-01-05 13:45:00", &patterns),
            Ok(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
    }
}

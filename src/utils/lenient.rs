//! Forgiving field parsers for data written by other tools.
//!
//! The ledger has been edited by spreadsheet software and dataframe code, so
//! cells show up blank, as `nan`/`None`, or with integers written as `35.0`.
//! API payloads sometimes carry numbers as strings.

use serde::{Deserialize, Deserializer};

fn is_missing(text: &str) -> bool {
    let t = text.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("nan")
        || t.eq_ignore_ascii_case("none")
        || t.eq_ignore_ascii_case("null")
}

pub fn parse_f64(text: &str) -> Option<f64> {
    if is_missing(text) {
        return None;
    }
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i32(text: &str) -> Option<i32> {
    parse_f64(text)
        .filter(|v| v.fract() == 0.0 && *v >= i32::MIN as f64 && *v <= i32::MAX as f64)
        .map(|v| v as i32)
}

/// Text cell; blank, `nan` and `None` become `None`
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !is_missing(s))
        .map(|s| s.trim().to_string()))
}

/// Text cell that must exist but may be blank
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_f64))
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_i32))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// JSON value that may be a number, a numeric string or null
pub fn json_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(v)) => Some(v),
        Some(NumberOrText::Text(s)) => parse_f64(&s),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_f64(" -3.5 "), Some(-3.5));
        assert_eq!(parse_f64("nan"), None);
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_i32("35.0"), Some(35));
        assert_eq!(parse_i32("35.5"), None);
        assert_eq!(parse_i32("None"), None);
    }

    #[derive(Deserialize)]
    struct Quote {
        #[serde(default, deserialize_with = "json_opt_f64")]
        spread: Option<f64>,
    }

    #[test]
    fn test_json_number_or_text() {
        let quotes: Vec<Quote> =
            serde_json::from_str(r#"[{"spread": -7.5}, {"spread": "3"}, {"spread": null}, {}]"#)
                .unwrap();
        let spreads: Vec<Option<f64>> = quotes.iter().map(|q| q.spread).collect();
        assert_eq!(spreads, vec![Some(-7.5), Some(3.0), None, None]);
    }
}

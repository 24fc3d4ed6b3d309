//! Display strings for picks and the parsers that read them back from the ledger.

use crate::models::TotalSide;

/// Team-perspective line with an explicit sign: `+3.5`, `-7`, `0`
pub fn format_line(line: f64) -> String {
    if line == 0.0 {
        "0".to_string()
    } else if line > 0.0 {
        format!("+{}", line)
    } else {
        format!("{}", line)
    }
}

/// `"Oregon (+3.5)"`
pub fn format_spread_pick(team: &str, line: f64) -> String {
    format!("{} ({})", team, format_line(line))
}

/// `"OVER 54.5"`
pub fn format_total_pick(side: TotalSide, total: f64) -> String {
    format!("{} {}", side, total)
}

/// `"58.5%"`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Split `"Oregon (+3)"` into the team and its line
pub fn parse_spread_pick(text: &str) -> Option<(String, f64)> {
    let text = text.trim();
    let open = text.rfind('(')?;
    let inner = text[open + 1..].strip_suffix(')')?.trim();
    let line = inner.trim_start_matches('+').parse::<f64>().ok()?;
    let team = text[..open].trim();
    if team.is_empty() {
        return None;
    }
    Some((team.to_string(), line))
}

/// Split `"UNDER 60.5"` into side and total
pub fn parse_total_pick(text: &str) -> Option<(TotalSide, f64)> {
    let mut parts = text.split_whitespace();
    let side = TotalSide::parse(parts.next()?)?;
    let total = parts.next()?.parse::<f64>().ok()?;
    Some((side, total))
}

/// `"58.2%"` to 0.582. Bare fractions (`0.582`) are accepted as-is.
pub fn parse_confidence(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok().map(|v| v / 100.0),
        None => text.parse::<f64>().ok().filter(|v| (0.0..=1.0).contains(v)),
    }
}

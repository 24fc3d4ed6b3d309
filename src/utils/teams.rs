/// Short or colloquial names seen in old ledger rows and book feeds, mapped to
/// the names the API uses.
pub const TEAM_ALIASES: &[(&str, &str)] = &[
    ("USF", "South Florida"),
    ("Ole Miss", "Mississippi"),
    ("LSU", "Louisiana State"),
    ("UConn", "Connecticut"),
    ("UMass", "Massachusetts"),
    ("Southern Miss", "Southern Mississippi"),
    ("UL Monroe", "Louisiana Monroe"),
    ("UL Lafayette", "Louisiana"),
    ("Jax State", "Jacksonville State"),
    ("Kennesaw St", "Kennesaw State"),
    ("W. Michigan", "Western Michigan"),
    ("SC State", "South Carolina State"),
    ("Missouri St", "Missouri State"),
    ("Arkansas St", "Arkansas State"),
    ("N. Illinois", "Northern Illinois"),
    ("E. Michigan", "Eastern Michigan"),
];

/// Resolve an alias to its canonical team name. Unknown names are returned trimmed.
pub fn canonical_team_name(name: &str) -> String {
    let trimmed = name.trim();
    TEAM_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(trimmed))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Normalize team name for matching
pub fn normalize_team_name(name: &str) -> String {
    canonical_team_name(name)
        .to_lowercase()
        .replace("state", "st")
        .replace('&', "and")
        .replace('.', "")
        .replace(' ', "_")
}

/// Identity of a matchup independent of alias spelling
pub fn matchup_key(home_team: &str, away_team: &str) -> (String, String) {
    (normalize_team_name(home_team), normalize_team_name(away_team))
}

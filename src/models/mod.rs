use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Upstream game identifier in canonical form.
///
/// The API hands out integers, the ledger has held them as strings and as
/// pandas floats (`"401628374.0"`). All of those collapse to the same id.
/// Synthetic ids such as `manual_3` are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let canonical = match trimmed.strip_suffix(".0") {
            Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) => int,
            _ => trimmed,
        };
        GameId(canonical.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<i64> for GameId {
    fn from(id: i64) -> Self {
        GameId(id.to_string())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GameId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(id) => GameId::from(id),
            RawId::Float(id) if id.fract() == 0.0 => GameId::from(id as i64),
            RawId::Float(id) => GameId::new(&id.to_string()),
            RawId::Text(id) => GameId::new(&id),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SeasonType {
    #[default]
    Regular,
    Postseason,
    Both,
}

impl SeasonType {
    /// Query parameter value understood by the API
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonType::Regular => "regular",
            SeasonType::Postseason => "postseason",
            SeasonType::Both => "both",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A college football game as reported by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub season: i32,
    pub week: u32,
    pub season_type: SeasonType,
    pub start_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub home_team: String,
    pub away_team: String,
    pub home_points: Option<i32>,
    pub away_points: Option<i32>,
}

impl Game {
    /// "Away @ Home"
    pub fn label(&self) -> String {
        matchup_label(&self.home_team, &self.away_team)
    }

    /// Final score when both sides have points, regardless of the status flag
    pub fn final_score(&self) -> Option<FinalScore> {
        match (self.home_points, self.away_points) {
            (Some(home), Some(away)) => Some(FinalScore { home, away }),
            _ => None,
        }
    }
}

pub fn matchup_label(home_team: &str, away_team: &str) -> String {
    format!("{} @ {}", away_team, home_team)
}

/// A single bookmaker quote for a game. Spreads are from the home team's
/// perspective: -7 means the home team is favored by 7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub provider: String,
    pub spread: Option<f64>,
    pub over_under: Option<f64>,
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
}

/// All quotes offered for one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLines {
    pub game_id: GameId,
    pub home_team: String,
    pub away_team: String,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub home: i32,
    pub away: i32,
}

impl FinalScore {
    /// Home points minus away points
    pub fn margin(&self) -> i32 {
        self.home - self.away
    }

    pub fn total(&self) -> i32 {
        self.home + self.away
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Spread,
    Total,
    Moneyline,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Spread => write!(f, "Spread"),
            Market::Total => write!(f, "Total"),
            Market::Moneyline => write!(f, "Moneyline"),
        }
    }
}

/// Over/under side of a totals pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalSide {
    Over,
    Under,
}

impl TotalSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalSide::Over => "OVER",
            TotalSide::Under => "UNDER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OVER" | "O" => Some(TotalSide::Over),
            "UNDER" | "U" => Some(TotalSide::Under),
            _ => None,
        }
    }
}

impl fmt::Display for TotalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_normalization() {
        assert_eq!(GameId::new("401628374.0").as_str(), "401628374");
        assert_eq!(GameId::new(" 401628374 ").as_str(), "401628374");
        assert_eq!(GameId::from(401628374), GameId::new("401628374"));
        assert_eq!(GameId::new("manual_3").as_str(), "manual_3");
        assert_eq!(GameId::new("12.5").as_str(), "12.5");
    }

    #[test]
    fn test_game_id_from_json_number_or_string() {
        let ids: Vec<GameId> = serde_json::from_str(r#"[401628374, "401628374", 401628374.0]"#)
            .unwrap();
        assert!(ids.iter().all(|id| id.as_str() == "401628374"));
    }

    #[test]
    fn test_final_score() {
        let score = FinalScore { home: 31, away: 17 };
        assert_eq!(score.margin(), 14);
        assert_eq!(score.total(), 48);
        assert_eq!(matchup_label("Texas", "Texas A&M"), "Texas A&M @ Texas");
    }

    #[test]
    fn test_total_side_parse() {
        assert_eq!(TotalSide::parse("over"), Some(TotalSide::Over));
        assert_eq!(TotalSide::parse(" UNDER "), Some(TotalSide::Under));
        assert_eq!(TotalSide::parse("push"), None);
    }
}

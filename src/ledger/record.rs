use crate::models::{matchup_label, FinalScore, Game, GameId, TotalSide};
use crate::picks::{format_confidence, GamePicks};
use crate::utils::lenient::{opt_f64, opt_i32, opt_string, string_or_empty};
use crate::utils::teams::matchup_key;
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder pick text for games without lines yet
pub const PENDING: &str = "Pending";
pub const NO_BOOK: &str = "TBD";

fn lenient_game_id<'de, D>(deserializer: D) -> Result<GameId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?
        .map(|s| GameId::new(&s))
        .unwrap_or_default())
}

/// One ledger row. Column names match the CSV header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "GameID", default, deserialize_with = "lenient_game_id")]
    pub game_id: GameId,
    #[serde(rename = "HomeTeam", default, deserialize_with = "string_or_empty")]
    pub home_team: String,
    #[serde(rename = "AwayTeam", default, deserialize_with = "string_or_empty")]
    pub away_team: String,
    #[serde(rename = "Game", default, deserialize_with = "string_or_empty")]
    pub game: String,
    #[serde(rename = "StartDate", default, deserialize_with = "opt_string")]
    pub start_date: Option<String>,

    #[serde(rename = "Moneyline Pick", default, deserialize_with = "opt_string")]
    pub moneyline_pick: Option<String>,
    #[serde(rename = "Moneyline Conf", default, deserialize_with = "opt_string")]
    pub moneyline_conf: Option<String>,
    #[serde(rename = "Moneyline_Conf_Raw", default, deserialize_with = "opt_f64")]
    pub moneyline_conf_raw: Option<f64>,

    #[serde(rename = "Spread Pick", default, deserialize_with = "opt_string")]
    pub spread_pick: Option<String>,
    #[serde(rename = "Spread Book", default, deserialize_with = "opt_string")]
    pub spread_book: Option<String>,
    #[serde(rename = "Spread Conf", default, deserialize_with = "opt_string")]
    pub spread_conf: Option<String>,
    #[serde(rename = "Spread_Conf_Raw", default, deserialize_with = "opt_f64")]
    pub spread_conf_raw: Option<f64>,

    #[serde(rename = "Total Pick", default, deserialize_with = "opt_string")]
    pub total_pick: Option<String>,
    #[serde(rename = "Total Book", default, deserialize_with = "opt_string")]
    pub total_book: Option<String>,
    #[serde(rename = "Total Conf", default, deserialize_with = "opt_string")]
    pub total_conf: Option<String>,
    #[serde(rename = "Total_Conf_Raw", default, deserialize_with = "opt_f64")]
    pub total_conf_raw: Option<f64>,

    #[serde(rename = "Pick_Team", default, deserialize_with = "opt_string")]
    pub pick_team: Option<String>,
    /// Team-perspective line. Rows written by older tooling may hold the home spread.
    #[serde(rename = "Pick_Line", default, deserialize_with = "opt_f64")]
    pub pick_line: Option<f64>,
    #[serde(rename = "Pick_Side", default, deserialize_with = "opt_string")]
    pub pick_side: Option<String>,
    #[serde(rename = "Pick_Total", default, deserialize_with = "opt_f64")]
    pub pick_total: Option<f64>,

    #[serde(rename = "Manual_HomeScore", default, deserialize_with = "opt_i32")]
    pub manual_home_score: Option<i32>,
    #[serde(rename = "Manual_AwayScore", default, deserialize_with = "opt_i32")]
    pub manual_away_score: Option<i32>,
    #[serde(rename = "Manual_Date", default, deserialize_with = "opt_string")]
    pub manual_date: Option<String>,
}

impl PredictionRecord {
    fn for_game(game: &Game) -> Self {
        Self {
            game_id: game.id.clone(),
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            game: game.label(),
            start_date: game.start_date.map(|d| d.to_rfc3339()),
            ..Default::default()
        }
    }

    fn set_moneyline(&mut self, picks: &GamePicks) {
        let ml = &picks.moneyline;
        self.moneyline_pick = Some(ml.team.clone());
        self.moneyline_conf = Some(format_confidence(ml.confidence));
        self.moneyline_conf_raw = Some(ml.confidence);
    }

    pub fn from_picks(game: &Game, picks: &GamePicks) -> Self {
        let mut record = Self::for_game(game);
        record.set_moneyline(picks);

        match &picks.spread {
            Some(spread) => {
                record.spread_pick = Some(spread.display());
                record.spread_book = Some(spread.book.clone());
                record.spread_conf = Some(format_confidence(spread.confidence));
                record.spread_conf_raw = Some(spread.confidence);
                record.pick_team = Some(spread.team.clone());
                record.pick_line = Some(spread.line);
            }
            None => record.mark_spread_pending(),
        }

        match &picks.total {
            Some(total) => {
                record.total_pick = Some(total.display());
                record.total_book = Some(total.book.clone());
                record.total_conf = Some(format_confidence(total.confidence));
                record.total_conf_raw = Some(total.confidence);
                record.pick_side = Some(total.side.to_string());
                record.pick_total = Some(total.total);
            }
            None => record.mark_total_pending(),
        }
        record
    }

    /// Row for a game with no qualifying lines yet
    pub fn pending(game: &Game, picks: &GamePicks) -> Self {
        let mut record = Self::for_game(game);
        record.set_moneyline(picks);
        record.mark_spread_pending();
        record.mark_total_pending();
        record
    }

    fn mark_spread_pending(&mut self) {
        self.spread_pick = Some(PENDING.to_string());
        self.spread_book = Some(NO_BOOK.to_string());
        self.spread_conf = Some(format_confidence(0.0));
        self.spread_conf_raw = Some(0.0);
    }

    fn mark_total_pending(&mut self) {
        self.total_pick = Some(PENDING.to_string());
        self.total_book = Some(NO_BOOK.to_string());
        self.total_conf = Some(format_confidence(0.0));
        self.total_conf_raw = Some(0.0);
    }

    pub fn label(&self) -> String {
        matchup_label(&self.home_team, &self.away_team)
    }

    /// Normalized (home, away) used to spot the same game under different ids
    pub fn matchup(&self) -> Option<(String, String)> {
        if self.home_team.is_empty() || self.away_team.is_empty() {
            return None;
        }
        Some(matchup_key(&self.home_team, &self.away_team))
    }

    /// Score entered by hand, when both sides are present
    pub fn manual_score(&self) -> Option<FinalScore> {
        match (self.manual_home_score, self.manual_away_score) {
            (Some(home), Some(away)) => Some(FinalScore { home, away }),
            _ => None,
        }
    }

    /// A settled row has its final score recorded
    pub fn is_settled(&self) -> bool {
        self.manual_score().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.spread_pick.as_deref().map_or(true, |p| p == PENDING)
            && self.total_pick.as_deref().map_or(true, |p| p == PENDING)
    }

    pub fn total_side(&self) -> Option<TotalSide> {
        self.pick_side.as_deref().and_then(TotalSide::parse)
    }

    /// Take manual score overrides from `other` when this row has none
    pub fn absorb_overrides(&mut self, other: &PredictionRecord) {
        if self.manual_score().is_none() && other.manual_score().is_some() {
            self.manual_home_score = other.manual_home_score;
            self.manual_away_score = other.manual_away_score;
            self.manual_date = other.manual_date.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeasonType;
    use crate::picks::{MoneylinePick, SpreadPick};

    fn game() -> Game {
        Game {
            id: GameId::from(401628374),
            season: 2024,
            week: 14,
            season_type: SeasonType::Regular,
            start_date: None,
            completed: false,
            home_team: "Michigan".to_string(),
            away_team: "Ohio State".to_string(),
            home_points: None,
            away_points: None,
        }
    }

    fn moneyline() -> MoneylinePick {
        MoneylinePick {
            team: "Ohio State".to_string(),
            home_pick: false,
            prob: 0.3,
            confidence: 0.7,
            from_model: false,
        }
    }

    #[test]
    fn test_from_picks_uses_team_perspective_line() {
        let picks = GamePicks {
            spread: Some(SpreadPick {
                team: "Michigan".to_string(),
                home_pick: true,
                line: 19.5,
                home_spread: 19.5,
                book: "FanDuel".to_string(),
                prob: 0.56,
                confidence: 0.56,
            }),
            total: None,
            moneyline: moneyline(),
        };
        let record = PredictionRecord::from_picks(&game(), &picks);
        assert_eq!(record.game, "Ohio State @ Michigan");
        assert_eq!(record.spread_pick.as_deref(), Some("Michigan (+19.5)"));
        assert_eq!(record.spread_conf.as_deref(), Some("56.0%"));
        assert_eq!(record.pick_line, Some(19.5));
        assert_eq!(record.total_pick.as_deref(), Some(PENDING));
        assert_eq!(record.moneyline_conf.as_deref(), Some("70.0%"));
        assert!(!record.is_pending());
    }

    #[test]
    fn test_pending_row() {
        let picks = GamePicks {
            spread: None,
            total: None,
            moneyline: moneyline(),
        };
        let record = PredictionRecord::pending(&game(), &picks);
        assert!(record.is_pending());
        assert_eq!(record.spread_book.as_deref(), Some(NO_BOOK));
        assert_eq!(record.spread_conf.as_deref(), Some("0.0%"));
        assert_eq!(record.moneyline_pick.as_deref(), Some("Ohio State"));
    }

    #[test]
    fn test_absorb_overrides_only_fills_gaps() {
        let mut kept = PredictionRecord::default();
        let mut dropped = PredictionRecord {
            manual_home_score: Some(13),
            manual_away_score: Some(10),
            manual_date: Some("2024-11-30".to_string()),
            ..Default::default()
        };
        kept.absorb_overrides(&dropped);
        assert_eq!(kept.manual_score(), Some(FinalScore { home: 13, away: 10 }));

        dropped.manual_home_score = Some(99);
        kept.absorb_overrides(&dropped);
        assert_eq!(kept.manual_home_score, Some(13));
    }
}

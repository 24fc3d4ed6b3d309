//! Grading picks against final scores.

use crate::ledger::PredictionRecord;
use crate::models::{FinalScore, Game, GameId, Market, TotalSide};
use crate::picks::staking::STANDARD_PAYOUT;
use crate::picks::{parse_confidence, parse_spread_pick, parse_total_pick};
use crate::utils::teams::{matchup_key, normalize_team_name};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Win,
    Loss,
    Push,
    /// Pick made, game not final
    Pending,
    NoPick,
}

impl Outcome {
    fn from_margin(margin: f64) -> Self {
        if margin > 0.0 {
            Outcome::Win
        } else if margin < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Push
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::Push => "PUSH",
            Outcome::Pending => "PENDING",
            Outcome::NoPick => "-",
        };
        f.write_str(s)
    }
}

/// Final scores reported by the API, by id and by matchup
#[derive(Debug, Clone, Default)]
pub struct ScoreBook {
    by_id: HashMap<GameId, FinalScore>,
    by_matchup: HashMap<(String, String), FinalScore>,
}

impl ScoreBook {
    /// Only completed games with both scores count
    pub fn from_games(games: &[Game]) -> Self {
        let mut book = Self::default();
        for game in games.iter().filter(|g| g.completed) {
            if let Some(score) = game.final_score() {
                book.by_id.insert(game.id.clone(), score);
                book.by_matchup
                    .insert(matchup_key(&game.home_team, &game.away_team), score);
            }
        }
        book
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Manual overrides first, then the API by id, then by matchup
    pub fn resolve(&self, record: &PredictionRecord) -> Option<FinalScore> {
        record
            .manual_score()
            .or_else(|| self.by_id.get(&record.game_id).copied())
            .or_else(|| {
                record
                    .matchup()
                    .and_then(|key| self.by_matchup.get(&key).copied())
            })
    }
}

/// Which side of the game a team name refers to
fn side_of(record: &PredictionRecord, team: &str) -> Option<bool> {
    let team = normalize_team_name(team);
    if team == normalize_team_name(&record.home_team) {
        Some(true)
    } else if team == normalize_team_name(&record.away_team) {
        Some(false)
    } else {
        None
    }
}

/// Picked team and its line. The display text always carries the team's
/// own line; the numeric column is only a fallback.
fn spread_selection(record: &PredictionRecord) -> Option<(String, f64)> {
    record
        .spread_pick
        .as_deref()
        .and_then(parse_spread_pick)
        .or_else(|| Some((record.pick_team.clone()?, record.pick_line?)))
}

pub fn grade_spread(record: &PredictionRecord, score: Option<FinalScore>) -> Outcome {
    let Some((team, line)) = spread_selection(record) else {
        return Outcome::NoPick;
    };
    let Some(is_home) = side_of(record, &team) else {
        warn!(game = %record.game, team = %team, "Spread pick names neither team");
        return Outcome::NoPick;
    };
    let Some(score) = score else {
        return Outcome::Pending;
    };
    let (own, opp) = if is_home {
        (score.home, score.away)
    } else {
        (score.away, score.home)
    };
    Outcome::from_margin(own as f64 + line - opp as f64)
}

pub fn grade_total(record: &PredictionRecord, score: Option<FinalScore>) -> Outcome {
    let selection = record
        .total_pick
        .as_deref()
        .and_then(parse_total_pick)
        .or_else(|| Some((record.total_side()?, record.pick_total?)));
    let Some((side, total)) = selection else {
        return Outcome::NoPick;
    };
    let Some(score) = score else {
        return Outcome::Pending;
    };
    let over_by = score.total() as f64 - total;
    match side {
        TotalSide::Over => Outcome::from_margin(over_by),
        TotalSide::Under => Outcome::from_margin(-over_by),
    }
}

pub fn grade_moneyline(record: &PredictionRecord, score: Option<FinalScore>) -> Outcome {
    let Some(is_home) = record
        .moneyline_pick
        .as_deref()
        .and_then(|team| side_of(record, team))
    else {
        return Outcome::NoPick;
    };
    let Some(score) = score else {
        return Outcome::Pending;
    };
    let margin = if is_home { score.margin() } else { -score.margin() };
    Outcome::from_margin(margin as f64)
}

/// A ledger row with its per-market results
#[derive(Debug, Clone)]
pub struct GradedRecord {
    pub record: PredictionRecord,
    pub score: Option<FinalScore>,
    pub spread: Outcome,
    pub total: Outcome,
    pub moneyline: Outcome,
}

impl GradedRecord {
    pub fn outcome(&self, market: Market) -> Outcome {
        match market {
            Market::Spread => self.spread,
            Market::Total => self.total,
            Market::Moneyline => self.moneyline,
        }
    }

    /// Model confidence behind the pick in `market`
    pub fn confidence(&self, market: Market) -> Option<f64> {
        let r = &self.record;
        let (raw, text) = match market {
            Market::Spread => (r.spread_conf_raw, r.spread_conf.as_deref()),
            Market::Total => (r.total_conf_raw, r.total_conf.as_deref()),
            Market::Moneyline => (r.moneyline_conf_raw, r.moneyline_conf.as_deref()),
        };
        raw.or_else(|| text.and_then(parse_confidence))
    }
}

pub fn grade_record(record: &PredictionRecord, score: Option<FinalScore>) -> GradedRecord {
    GradedRecord {
        record: record.clone(),
        score,
        spread: grade_spread(record, score),
        total: grade_total(record, score),
        moneyline: grade_moneyline(record, score),
    }
}

pub fn grade_records(records: &[PredictionRecord], scores: &ScoreBook) -> Vec<GradedRecord> {
    records
        .iter()
        .map(|record| grade_record(record, scores.resolve(record)))
        .collect()
}

/// Flat one-unit record for one market at -110
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketSummary {
    pub market: Market,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub pending: u32,
}

impl MarketSummary {
    fn new(market: Market) -> Self {
        Self {
            market,
            wins: 0,
            losses: 0,
            pushes: 0,
            pending: 0,
        }
    }

    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Push => self.pushes += 1,
            Outcome::Pending => self.pending += 1,
            Outcome::NoPick => {}
        }
    }

    pub fn bets(&self) -> u32 {
        self.wins + self.losses + self.pushes
    }

    /// Over decided bets; pushes excluded
    pub fn win_rate(&self) -> Option<f64> {
        let decided = self.wins + self.losses;
        (decided > 0).then(|| self.wins as f64 / decided as f64)
    }

    /// Units won: +100/110 per win, -1 per loss
    pub fn profit(&self) -> f64 {
        self.wins as f64 * STANDARD_PAYOUT - self.losses as f64
    }

    /// Profit per unit staked
    pub fn roi(&self) -> Option<f64> {
        let bets = self.bets();
        (bets > 0).then(|| self.profit() / bets as f64)
    }

    pub fn format(&self) -> String {
        let pct = |v: Option<f64>| {
            v.map(|x| format!("{:.1}%", x * 100.0))
                .unwrap_or_else(|| "n/a".to_string())
        };
        format!(
            "{:<10} {:>3}-{:<3} ({} push, {} pending)  Win rate: {:>6}  Profit: {:+.2}u  ROI: {}",
            self.market.to_string(),
            self.wins,
            self.losses,
            self.pushes,
            self.pending,
            pct(self.win_rate()),
            self.profit(),
            pct(self.roi()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub spread: MarketSummary,
    pub total: MarketSummary,
    pub moneyline: MarketSummary,
}

impl GradeSummary {
    pub fn markets(&self) -> [&MarketSummary; 3] {
        [&self.spread, &self.total, &self.moneyline]
    }
}

/// Tally results. With `min_confidence`, picks below it are treated as not
/// bet at all.
pub fn summarize(graded: &[GradedRecord], min_confidence: Option<f64>) -> GradeSummary {
    let mut summary = GradeSummary {
        spread: MarketSummary::new(Market::Spread),
        total: MarketSummary::new(Market::Total),
        moneyline: MarketSummary::new(Market::Moneyline),
    };
    for g in graded {
        for (market, tally) in [
            (Market::Spread, &mut summary.spread),
            (Market::Total, &mut summary.total),
            (Market::Moneyline, &mut summary.moneyline),
        ] {
            if let Some(threshold) = min_confidence {
                if g.confidence(market).map_or(true, |c| c < threshold) {
                    continue;
                }
            }
            tally.add(g.outcome(market));
        }
    }
    summary
}

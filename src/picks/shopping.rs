use super::format::{format_spread_pick, format_total_pick};
use crate::features::{FeatureDefaults, FeatureRow};
use crate::model::{rating_win_probability, Classifier};
use crate::models::{Line, TotalSide};
use serde::Serialize;
use std::cmp::Ordering;

pub const CONSENSUS_PROVIDER: &str = "Consensus";

/// How to choose among the lines offered for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LineStrategy {
    /// First quoted line carrying the market
    First,
    /// Median spread and median total across books
    Consensus,
    /// Score every book and keep the line the model is most confident about
    #[default]
    BestConfidence,
}

/// Keep only lines from whitelisted bookmakers
pub fn filter_books(lines: &[Line], valid_books: &[String]) -> Vec<Line> {
    lines
        .iter()
        .filter(|l| valid_books.iter().any(|b| b == &l.provider))
        .cloned()
        .collect()
}

/// Median; even-length input averages the middle two
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Synthetic line holding the median spread and median total
pub fn consensus_line(lines: &[Line]) -> Option<Line> {
    let spreads: Vec<f64> = lines.iter().filter_map(|l| l.spread).collect();
    let totals: Vec<f64> = lines.iter().filter_map(|l| l.over_under).collect();
    let spread = median(&spreads);
    let over_under = median(&totals);
    if spread.is_none() && over_under.is_none() {
        return None;
    }
    Some(Line {
        provider: CONSENSUS_PROVIDER.to_string(),
        spread,
        over_under,
        home_moneyline: None,
        away_moneyline: None,
    })
}

fn candidates(lines: &[Line], strategy: LineStrategy, has_market: fn(&Line) -> bool) -> Vec<Line> {
    match strategy {
        LineStrategy::BestConfidence => lines.iter().filter(|l| has_market(l)).cloned().collect(),
        LineStrategy::First => lines.iter().find(|l| has_market(l)).cloned().into_iter().collect(),
        LineStrategy::Consensus => consensus_line(lines)
            .filter(has_market)
            .into_iter()
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadPick {
    pub team: String,
    pub home_pick: bool,
    /// Line from the picked team's perspective
    pub line: f64,
    /// Line as quoted, home perspective
    pub home_spread: f64,
    pub book: String,
    /// P(home covers)
    pub prob: f64,
    pub confidence: f64,
}

impl SpreadPick {
    pub fn display(&self) -> String {
        format_spread_pick(&self.team, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalPick {
    pub side: TotalSide,
    pub total: f64,
    pub book: String,
    /// P(over)
    pub prob: f64,
    pub confidence: f64,
}

impl TotalPick {
    pub fn display(&self) -> String {
        format_total_pick(self.side, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoneylinePick {
    pub team: String,
    pub home_pick: bool,
    /// P(home wins)
    pub prob: f64,
    pub confidence: f64,
    /// Whether a trained winner model produced the probability
    pub from_model: bool,
}

/// Everything picked for one game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePicks {
    pub spread: Option<SpreadPick>,
    pub total: Option<TotalPick>,
    pub moneyline: MoneylinePick,
}

/// Score each candidate spread and keep the most confident one. Ties go to
/// the earlier line. A zero spread is a real line.
pub fn shop_spread(
    model: &dyn Classifier,
    base: &FeatureRow,
    lines: &[Line],
    strategy: LineStrategy,
    home_team: &str,
    away_team: &str,
    defaults: &FeatureDefaults,
) -> Option<SpreadPick> {
    let mut best: Option<SpreadPick> = None;
    for line in candidates(lines, strategy, |l| l.spread.is_some()) {
        let Some(spread) = line.spread else { continue };
        let row = base.with_line(spread, line.over_under.unwrap_or(defaults.total));
        let prob = model.predict_proba(&row);
        let confidence = prob.max(1.0 - prob);
        if best.as_ref().map_or(true, |b| confidence > b.confidence) {
            let home_pick = prob > 0.5;
            best = Some(SpreadPick {
                team: (if home_pick { home_team } else { away_team }).to_string(),
                home_pick,
                line: if home_pick { spread } else { -spread },
                home_spread: spread,
                book: line.provider.clone(),
                prob,
                confidence,
            });
        }
    }
    best
}

/// Same as [`shop_spread`] for totals. Lines without a spread score with 0.0.
pub fn shop_total(
    model: &dyn Classifier,
    base: &FeatureRow,
    lines: &[Line],
    strategy: LineStrategy,
) -> Option<TotalPick> {
    let mut best: Option<TotalPick> = None;
    for line in candidates(lines, strategy, |l| l.over_under.is_some()) {
        let Some(total) = line.over_under else { continue };
        let row = base.with_line(line.spread.unwrap_or(0.0), total);
        let prob = model.predict_proba(&row);
        let confidence = prob.max(1.0 - prob);
        if best.as_ref().map_or(true, |b| confidence > b.confidence) {
            best = Some(TotalPick {
                side: if prob > 0.5 { TotalSide::Over } else { TotalSide::Under },
                total,
                book: line.provider.clone(),
                prob,
                confidence,
            });
        }
    }
    best
}

/// Straight-up pick. `row` should carry the line columns when the winner
/// model was fit with them.
pub fn pick_moneyline(
    winner: Option<&dyn Classifier>,
    row: &FeatureRow,
    home_team: &str,
    away_team: &str,
    defaults: &FeatureDefaults,
) -> MoneylinePick {
    let prob = match winner {
        Some(model) => model.predict_proba(row),
        None => rating_win_probability(
            row.get("home_srs_rating").unwrap_or(defaults.srs),
            row.get("away_srs_rating").unwrap_or(defaults.srs),
            row.get("home_talent_score").unwrap_or(defaults.talent),
            row.get("away_talent_score").unwrap_or(defaults.talent),
        ),
    };
    let home_pick = prob > 0.5;
    MoneylinePick {
        team: (if home_pick { home_team } else { away_team }).to_string(),
        home_pick,
        prob,
        confidence: prob.max(1.0 - prob),
        from_model: winner.is_some(),
    }
}

use crate::api::cfbd_api::{AdvancedGameStats, AdvancedSideStats, PlayTypeStats};
use std::collections::HashMap;

/// Window of the exponentially weighted mean
pub const DECAY_SPAN: f64 = 3.0;

/// Advanced-stat metrics that get a decayed feature, in column order
pub const DECAY_METRICS: [&str; 14] = [
    "offense.ppa",
    "offense.successRate",
    "offense.explosiveness",
    "defense.ppa",
    "defense.successRate",
    "defense.explosiveness",
    "offense.rushing.ppa",
    "offense.rushing.successRate",
    "offense.passing.ppa",
    "offense.passing.successRate",
    "defense.rushing.ppa",
    "defense.rushing.successRate",
    "defense.passing.ppa",
    "defense.passing.successRate",
];

pub type DecayValues = [f64; DECAY_METRICS.len()];

/// Non-adjusted exponentially weighted mean: `y0 = x0`,
/// `y_t = (1 - a) * y_{t-1} + a * x_t` with `a = 2 / (span + 1)`.
pub fn ewma(values: &[f64], span: f64) -> Option<f64> {
    let alpha = 2.0 / (span + 1.0);
    let mut iter = values.iter();
    let first = *iter.next()?;
    Some(iter.fold(first, |acc, x| (1.0 - alpha) * acc + alpha * x))
}

fn side_values(side: &AdvancedSideStats) -> [f64; 3] {
    [
        side.ppa.unwrap_or(0.0),
        side.success_rate.unwrap_or(0.0),
        side.explosiveness.unwrap_or(0.0),
    ]
}

fn split_values(split: Option<&PlayTypeStats>) -> [f64; 2] {
    split
        .map(|s| [s.ppa.unwrap_or(0.0), s.success_rate.unwrap_or(0.0)])
        .unwrap_or([0.0, 0.0])
}

/// Raw metric values of one game, missing entries as 0.0
fn metric_values(stat: &AdvancedGameStats) -> DecayValues {
    let off = side_values(&stat.offense);
    let def = side_values(&stat.defense);
    let off_rush = split_values(stat.offense.rushing_plays.as_ref());
    let off_pass = split_values(stat.offense.passing_plays.as_ref());
    let def_rush = split_values(stat.defense.rushing_plays.as_ref());
    let def_pass = split_values(stat.defense.passing_plays.as_ref());
    [
        off[0], off[1], off[2], def[0], def[1], def[2], off_rush[0], off_rush[1], off_pass[0],
        off_pass[1], def_rush[0], def_rush[1], def_pass[0], def_pass[1],
    ]
}

#[derive(Debug, Clone)]
struct TeamGame {
    season: i32,
    week: u32,
    values: DecayValues,
}

/// Per-team game history of advanced stats, sorted by (season, week)
#[derive(Debug, Clone, Default)]
pub struct DecayTable {
    teams: HashMap<String, Vec<TeamGame>>,
}

impl DecayTable {
    /// `default_season` fills in rows whose payload omits the season
    pub fn from_stats(stats: &[AdvancedGameStats], default_season: i32) -> Self {
        let mut teams: HashMap<String, Vec<TeamGame>> = HashMap::new();
        for stat in stats {
            teams.entry(stat.team.clone()).or_default().push(TeamGame {
                season: stat.season.unwrap_or(default_season),
                week: stat.week,
                values: metric_values(stat),
            });
        }
        for games in teams.values_mut() {
            games.sort_by_key(|g| (g.season, g.week));
        }
        Self { teams }
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    fn decay_over<'a>(games: impl Iterator<Item = &'a TeamGame> + Clone) -> Option<DecayValues> {
        let mut out = [0.0; DECAY_METRICS.len()];
        for (i, slot) in out.iter_mut().enumerate() {
            let series: Vec<f64> = games.clone().map(|g| g.values[i]).collect();
            *slot = ewma(&series, DECAY_SPAN)?;
        }
        Some(out)
    }

    /// Decayed metrics through the team's most recent game
    pub fn latest(&self, team: &str) -> Option<DecayValues> {
        let games = self.teams.get(team)?;
        Self::decay_over(games.iter())
    }

    /// Decayed metrics from the team's games earlier in `season` than `week`.
    /// This is what a model could have seen before kickoff of that week.
    pub fn before(&self, team: &str, season: i32, week: u32) -> Option<DecayValues> {
        let games = self.teams.get(team)?;
        Self::decay_over(
            games
                .iter()
                .filter(move |g| g.season == season && g.week < week),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stat(team: &str, week: u32, off_ppa: f64) -> AdvancedGameStats {
        AdvancedGameStats {
            game_id: None,
            season: Some(2024),
            week,
            team: team.to_string(),
            opponent: None,
            offense: AdvancedSideStats {
                ppa: Some(off_ppa),
                ..Default::default()
            },
            defense: AdvancedSideStats::default(),
        }
    }

    #[test]
    fn test_ewma_span_three() {
        assert_eq!(ewma(&[], DECAY_SPAN), None);
        assert_relative_eq!(ewma(&[1.0], DECAY_SPAN).unwrap(), 1.0);
        // alpha = 0.5: 1.0 -> 1.5 -> 2.25
        assert_relative_eq!(ewma(&[1.0, 2.0, 3.0], DECAY_SPAN).unwrap(), 2.25);
    }

    #[test]
    fn test_latest_and_before() {
        // Deliberately out of order; the table sorts by week
        let stats = vec![
            stat("Texas", 3, 3.0),
            stat("Texas", 1, 1.0),
            stat("Texas", 2, 2.0),
        ];
        let table = DecayTable::from_stats(&stats, 2024);

        let latest = table.latest("Texas").unwrap();
        assert_relative_eq!(latest[0], 2.25);
        // Missing metrics decay as zeros
        assert_relative_eq!(latest[1], 0.0);

        let before_week3 = table.before("Texas", 2024, 3).unwrap();
        assert_relative_eq!(before_week3[0], 1.5);
        assert!(table.before("Texas", 2024, 1).is_none());
        assert!(table.before("Texas", 2023, 5).is_none());
        assert!(table.latest("Oregon").is_none());
    }

    #[test]
    fn test_metric_extraction_reads_splits() {
        let mut s = stat("Texas", 1, 0.3);
        s.defense.passing_plays = Some(PlayTypeStats {
            ppa: Some(-0.1),
            success_rate: Some(0.4),
            explosiveness: None,
        });
        let values = metric_values(&s);
        let idx = DECAY_METRICS
            .iter()
            .position(|m| *m == "defense.passing.successRate")
            .unwrap();
        assert_relative_eq!(values[idx], 0.4);
        assert_relative_eq!(values[0], 0.3);
    }
}

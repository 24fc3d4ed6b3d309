use super::decay::{DecayTable, DecayValues, DECAY_METRICS};
use super::{FeatureDefaults, FeatureRow};
use crate::api::cfbd_api::{AdvancedGameStats, SrsRating, TeamTalent};
use std::collections::HashMap;
use tracing::debug;

/// Which point in the season the decayed stats should describe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayLookup {
    /// Through each team's last recorded game
    Latest,
    /// Only games earlier in `season` than `week`
    Before { season: i32, week: u32 },
}

/// Team-strength lookups for one season
#[derive(Debug, Clone, Default)]
pub struct TeamContext {
    pub srs: HashMap<String, f64>,
    pub talent: HashMap<String, f64>,
    pub decay: DecayTable,
    pub defaults: FeatureDefaults,
}

impl TeamContext {
    pub fn from_payloads(
        year: i32,
        srs: &[SrsRating],
        talent: &[TeamTalent],
        stats: &[AdvancedGameStats],
        defaults: FeatureDefaults,
    ) -> Self {
        Self {
            srs: srs
                .iter()
                .filter_map(|r| r.rating.map(|v| (r.team.clone(), v)))
                .collect(),
            talent: talent
                .iter()
                .filter_map(|t| t.talent.map(|v| (t.team.clone(), v)))
                .collect(),
            decay: DecayTable::from_stats(stats, year),
            defaults,
        }
    }

    pub fn srs_rating(&self, team: &str) -> f64 {
        self.srs.get(team).copied().unwrap_or(self.defaults.srs)
    }

    pub fn talent_score(&self, team: &str) -> f64 {
        self.talent.get(team).copied().unwrap_or(self.defaults.talent)
    }

    fn decay_for(&self, team: &str, lookup: DecayLookup) -> Option<DecayValues> {
        match lookup {
            DecayLookup::Latest => self.decay.latest(team),
            DecayLookup::Before { season, week } => self.decay.before(team, season, week),
        }
    }

    /// Everything but the line columns (`spread`, `overUnder`)
    pub fn base_row(&self, home_team: &str, away_team: &str, lookup: DecayLookup) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.set("home_talent_score", self.talent_score(home_team));
        row.set("away_talent_score", self.talent_score(away_team));
        row.set("home_srs_rating", self.srs_rating(home_team));
        row.set("away_srs_rating", self.srs_rating(away_team));

        for (prefix, team) in [("home", home_team), ("away", away_team)] {
            let values = self.decay_for(team, lookup).unwrap_or_else(|| {
                debug!(team, ?lookup, "No decay history, using zeros");
                [0.0; DECAY_METRICS.len()]
            });
            for (metric, value) in DECAY_METRICS.iter().zip(values) {
                row.set(format!("{}_decay_{}", prefix, metric), value);
            }
        }
        row
    }
}

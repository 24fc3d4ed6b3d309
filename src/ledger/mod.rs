//! The prediction ledger: a CSV of one row per game, reconciled by game identity.

pub mod record;

pub use record::PredictionRecord;

use crate::error::Result;
use crate::utils::teams::canonical_team_name;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;
use tracing::{debug, info, warn};

/// Which duplicate survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Keep {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    /// Settled rows left untouched
    pub protected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub records: Vec<PredictionRecord>,
}

impl Ledger {
    pub fn new(records: Vec<PredictionRecord>) -> Self {
        Self { records }
    }

    /// Read the ledger. A missing file is an empty ledger; rows that cannot
    /// be parsed at all are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No ledger yet, starting empty");
            return Ok(Self::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut records = Vec::new();
        for (i, row) in reader.deserialize::<PredictionRecord>().enumerate() {
            match row {
                Ok(mut record) => {
                    fill_teams_from_label(&mut record);
                    records.push(record);
                }
                Err(e) => warn!(row = i + 2, error = %e, "Skipping unreadable ledger row"),
            }
        }
        debug!(path = %path.display(), rows = records.len(), "Loaded ledger");
        Ok(Self { records })
    }

    /// Write to a temp file beside `path`, then rename it into place
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        let written = self
            .write_csv(&tmp)
            .and_then(|()| std::fs::rename(&tmp, path).map_err(Into::into));
        if let Err(e) = written {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "Temp ledger not removed");
            }
            return Err(e);
        }
        info!(path = %path.display(), rows = self.records.len(), "Saved ledger");
        Ok(())
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rewrite aliased team names and rebuild the game labels. Returns the
    /// number of rows that changed.
    pub fn normalize_teams(&mut self) -> usize {
        let mut changed = 0;
        for record in &mut self.records {
            let home = canonical_team_name(&record.home_team);
            let away = canonical_team_name(&record.away_team);
            if home != record.home_team || away != record.away_team {
                changed += 1;
            }
            record.home_team = home;
            record.away_team = away;
            if !record.home_team.is_empty() && !record.away_team.is_empty() {
                record.game = record.label();
            }
        }
        changed
    }

    /// Remove rows whose label or teams are empty or hold a literal `None`
    pub fn drop_broken(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|r| {
            let bad = |s: &str| s.trim().is_empty() || s.contains("None");
            !(bad(&r.game) || bad(&r.home_team) || bad(&r.away_team))
        });
        before - self.records.len()
    }

    /// Collapse duplicates by game id, then by normalized matchup. Manual
    /// scores on a dropped row carry over to the survivor if it has none.
    pub fn dedupe(&mut self, keep: Keep) -> usize {
        let before = self.records.len();
        let records = std::mem::take(&mut self.records);
        let records = dedupe_by(records, keep, |r| {
            (!r.game_id.is_empty()).then(|| r.game_id.clone())
        });
        self.records = dedupe_by(records, keep, PredictionRecord::matchup);
        before - self.records.len()
    }

    fn position(&self, record: &PredictionRecord) -> Option<usize> {
        if !record.game_id.is_empty() {
            if let Some(i) = self.records.iter().position(|r| r.game_id == record.game_id) {
                return Some(i);
            }
        }
        let key = record.matchup()?;
        self.records
            .iter()
            .position(|r| r.matchup().as_ref() == Some(&key))
    }

    /// Upsert fresh predictions. Settled rows are never overwritten; other
    /// matches take the new picks but keep their manual overrides.
    pub fn merge(&mut self, incoming: Vec<PredictionRecord>) -> MergeStats {
        let mut stats = MergeStats::default();
        for record in incoming {
            match self.position(&record) {
                Some(i) if self.records[i].is_settled() => {
                    debug!(game = %self.records[i].game, "Keeping settled row");
                    stats.protected += 1;
                }
                Some(i) => {
                    let existing = &self.records[i];
                    let mut updated = record;
                    updated.manual_home_score = existing.manual_home_score;
                    updated.manual_away_score = existing.manual_away_score;
                    updated.manual_date = existing.manual_date.clone();
                    self.records[i] = updated;
                    stats.updated += 1;
                }
                None => {
                    self.records.push(record);
                    stats.inserted += 1;
                }
            }
        }
        stats
    }
}

/// Rows from before the team columns existed only carry "Away @ Home"
fn fill_teams_from_label(record: &mut PredictionRecord) {
    if !record.home_team.is_empty() || !record.away_team.is_empty() {
        return;
    }
    if let Some((away, home)) = record.game.split_once(" @ ") {
        record.away_team = away.trim().to_string();
        record.home_team = home.trim().to_string();
    }
}

fn dedupe_by<K, F>(records: Vec<PredictionRecord>, keep: Keep, key: F) -> Vec<PredictionRecord>
where
    K: Eq + Hash,
    F: Fn(&PredictionRecord) -> Option<K>,
{
    let ordered: Vec<PredictionRecord> = match keep {
        Keep::First => records,
        Keep::Last => records.into_iter().rev().collect(),
    };

    let mut seen: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<PredictionRecord> = Vec::with_capacity(ordered.len());
    for record in ordered {
        match key(&record) {
            Some(k) => match seen.get(&k) {
                Some(&i) => out[i].absorb_overrides(&record),
                None => {
                    seen.insert(k, out.len());
                    out.push(record);
                }
            },
            None => out.push(record),
        }
    }

    if keep == Keep::Last {
        out.reverse();
    }
    out
}

//! End-to-end operations behind each CLI subcommand.

use crate::api::cfbd_api::InfoResult;
use crate::api::CfbdClient;
use crate::features::{DecayLookup, FeatureDefaults, TeamContext};
use crate::grading::{
    grade_record, grade_records, summarize, GradeSummary, GradedRecord, ScoreBook,
};
use crate::ledger::record::PENDING;
use crate::ledger::{Keep, Ledger, MergeStats, PredictionRecord};
use crate::model::ModelSet;
use crate::models::{Game, GameId, GameLines, SeasonType};
use crate::picks::{
    consensus_line, filter_books, format_confidence, pick_moneyline, shop_spread, shop_total,
    ConfidenceTier, GamePicks, KellySettings, LineStrategy,
};
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// Team lookups for one season
pub struct SeasonContext {
    pub year: i32,
    pub teams: TeamContext,
}

impl SeasonContext {
    /// SRS, talent and decayed stats are all optional: a failed fetch is
    /// logged and that lookup falls back to defaults.
    pub async fn load(client: &CfbdClient, year: i32, defaults: FeatureDefaults) -> Self {
        let srs = client.srs_ratings(year).await.unwrap_or_else(|e| {
            warn!(year, error = %e, "SRS ratings unavailable");
            Vec::new()
        });
        let talent = client.talent(year).await.unwrap_or_else(|e| {
            warn!(year, error = %e, "Talent composite unavailable");
            Vec::new()
        });
        let stats = client.advanced_game_stats(year).await.unwrap_or_else(|e| {
            warn!(year, error = %e, "Advanced stats unavailable");
            Vec::new()
        });

        let teams = TeamContext::from_payloads(year, &srs, &talent, &stats, defaults);
        info!(
            year,
            srs = teams.srs.len(),
            talent = teams.talent.len(),
            decay = teams.decay.team_count(),
            "Loaded season context"
        );
        Self { year, teams }
    }
}

#[derive(Debug, Clone)]
pub struct PredictOptions {
    pub year: i32,
    pub season_type: SeasonType,
    pub week: Option<u32>,
    pub strategy: LineStrategy,
    /// Emit placeholder rows for games without qualifying lines
    pub include_pending: bool,
    pub valid_books: Vec<String>,
    pub defaults: FeatureDefaults,
}

/// Shop every market for one game with the decayed stats `lookup` selects
fn score_game(
    game: &Game,
    lines: Option<&GameLines>,
    teams: &TeamContext,
    models: &ModelSet,
    opts: &PredictOptions,
    lookup: DecayLookup,
) -> GamePicks {
    let valid = lines
        .map(|g| filter_books(&g.lines, &opts.valid_books))
        .unwrap_or_default();

    let base = teams.base_row(&game.home_team, &game.away_team, lookup);
    let spread = shop_spread(
        models.spread.as_ref(),
        &base,
        &valid,
        opts.strategy,
        &game.home_team,
        &game.away_team,
        &opts.defaults,
    );
    let total = shop_total(models.total.as_ref(), &base, &valid, opts.strategy);

    let market = consensus_line(&valid);
    let ml_row = base.with_line(
        market.as_ref().and_then(|l| l.spread).unwrap_or(0.0),
        market
            .as_ref()
            .and_then(|l| l.over_under)
            .unwrap_or(opts.defaults.total),
    );
    let moneyline = pick_moneyline(
        models.winner.as_deref(),
        &ml_row,
        &game.home_team,
        &game.away_team,
        &opts.defaults,
    );

    GamePicks {
        spread,
        total,
        moneyline,
    }
}

/// Score every upcoming game. Pure: no I/O.
pub fn predict_games(
    games: &[Game],
    lines: &[GameLines],
    teams: &TeamContext,
    models: &ModelSet,
    opts: &PredictOptions,
) -> Vec<PredictionRecord> {
    let lines_by_game: HashMap<&GameId, &GameLines> =
        lines.iter().map(|g| (&g.game_id, g)).collect();

    let mut records = Vec::new();
    for game in games.iter().filter(|g| !g.completed) {
        let game_lines = lines_by_game.get(&game.id).copied();
        let picks = score_game(game, game_lines, teams, models, opts, DecayLookup::Latest);
        if picks.spread.is_none() && picks.total.is_none() {
            if opts.include_pending {
                records.push(PredictionRecord::pending(game, &picks));
            } else {
                warn!(game = %game.label(), "No valid lines, skipping");
            }
            continue;
        }
        records.push(PredictionRecord::from_picks(game, &picks));
    }
    records
}

pub struct PredictReport {
    pub records: Vec<PredictionRecord>,
    pub merge: MergeStats,
}

/// Fetch, score, and merge this week's predictions into the ledger
pub async fn predict(
    client: &CfbdClient,
    ledger_path: &Path,
    models: &ModelSet,
    opts: &PredictOptions,
) -> Result<PredictReport> {
    let games = client
        .games(opts.year, opts.season_type, opts.week)
        .await
        .context("Failed to fetch games")?;
    let lines = client
        .lines(opts.year, opts.season_type, opts.week)
        .await
        .context("Failed to fetch betting lines")?;
    let season = SeasonContext::load(client, opts.year, opts.defaults).await;

    let records = predict_games(&games, &lines, &season.teams, models, opts);
    info!(games = games.len(), picks = records.len(), "Scored games");

    let mut ledger = Ledger::load(ledger_path).context("Failed to load ledger")?;
    let merge = ledger.merge(records.clone());
    ledger.save(ledger_path).context("Failed to save ledger")?;
    Ok(PredictReport { records, merge })
}

pub struct GradeReport {
    pub graded: Vec<GradedRecord>,
    pub summary: GradeSummary,
    /// Games with a final score from the API
    pub scored_games: usize,
}

/// Grade the ledger against final scores for a season
pub async fn grade(
    client: &CfbdClient,
    ledger_path: &Path,
    year: i32,
    season_type: SeasonType,
    min_confidence: Option<f64>,
) -> Result<GradeReport> {
    let ledger = Ledger::load(ledger_path).context("Failed to load ledger")?;
    // Cached game lists go stale while games are in progress
    let games = client
        .uncached()
        .games(year, season_type, None)
        .await
        .context("Failed to fetch game results")?;
    Ok(grade_ledger(&ledger, &games, min_confidence))
}

pub fn grade_ledger(ledger: &Ledger, games: &[Game], min_confidence: Option<f64>) -> GradeReport {
    let scores = ScoreBook::from_games(games);
    let graded = grade_records(&ledger.records, &scores);
    let summary = summarize(&graded, min_confidence);
    GradeReport {
        graded,
        summary,
        scored_games: scores.len(),
    }
}

pub struct BacktestReport {
    pub graded: Vec<GradedRecord>,
    pub summary: GradeSummary,
    /// Completed games without lines from a valid book
    pub skipped: usize,
}

/// Replay completed games as if predicted before kickoff. Decayed stats only
/// see games from earlier weeks of the same season. Pure: no I/O.
pub fn backtest_games(
    games: &[Game],
    lines: &[GameLines],
    teams: &TeamContext,
    models: &ModelSet,
    opts: &PredictOptions,
    min_confidence: Option<f64>,
) -> BacktestReport {
    let lines_by_game: HashMap<&GameId, &GameLines> =
        lines.iter().map(|g| (&g.game_id, g)).collect();

    let mut graded = Vec::new();
    let mut skipped = 0;
    for game in games.iter().filter(|g| g.completed) {
        let Some(score) = game.final_score() else {
            continue;
        };
        let lookup = DecayLookup::Before {
            season: game.season,
            week: game.week,
        };
        let game_lines = lines_by_game.get(&game.id).copied();
        let picks = score_game(game, game_lines, teams, models, opts, lookup);
        if picks.spread.is_none() && picks.total.is_none() {
            debug!(game = %game.label(), "No valid lines, skipping");
            skipped += 1;
            continue;
        }
        let record = PredictionRecord::from_picks(game, &picks);
        graded.push(grade_record(&record, Some(score)));
    }

    let summary = summarize(&graded, min_confidence);
    BacktestReport {
        graded,
        summary,
        skipped,
    }
}

/// Fetch a finished season (or week) and replay it through the models
pub async fn backtest(
    client: &CfbdClient,
    models: &ModelSet,
    opts: &PredictOptions,
    min_confidence: Option<f64>,
) -> Result<BacktestReport> {
    let games = client
        .games(opts.year, opts.season_type, opts.week)
        .await
        .context("Failed to fetch games")?;
    let lines = client
        .lines(opts.year, opts.season_type, opts.week)
        .await
        .context("Failed to fetch betting lines")?;
    let season = SeasonContext::load(client, opts.year, opts.defaults).await;

    let report = backtest_games(&games, &lines, &season.teams, models, opts, min_confidence);
    info!(
        games = games.len(),
        graded = report.graded.len(),
        skipped = report.skipped,
        "Backtested season"
    );
    Ok(report)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub broken: usize,
    pub renamed: usize,
    pub duplicates: usize,
    pub remaining: usize,
}

/// Drop broken rows, canonicalize team names, and collapse duplicates
pub fn clean(ledger_path: &Path, keep: Keep) -> Result<CleanReport> {
    let mut ledger = Ledger::load(ledger_path).context("Failed to load ledger")?;
    let report = clean_ledger(&mut ledger, keep);
    ledger.save(ledger_path).context("Failed to save ledger")?;
    Ok(report)
}

pub fn clean_ledger(ledger: &mut Ledger, keep: Keep) -> CleanReport {
    let broken = ledger.drop_broken();
    let renamed = ledger.normalize_teams();
    let duplicates = ledger.dedupe(keep);
    CleanReport {
        broken,
        renamed,
        duplicates,
        remaining: ledger.len(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct LineAudit {
    pub games_scanned: usize,
    pub lines_seen: usize,
    pub games_with_multiple_books: usize,
    pub providers: BTreeSet<String>,
    /// Providers the API offers that the whitelist filters out
    pub blocked: Vec<String>,
    /// First game quoted by more than one book
    pub sample: Option<GameLines>,
}

pub fn audit_lines(lines: &[GameLines], valid_books: &[String]) -> LineAudit {
    let mut audit = LineAudit {
        games_scanned: lines.len(),
        ..Default::default()
    };
    for game in lines.iter().filter(|g| !g.lines.is_empty()) {
        audit.lines_seen += game.lines.len();
        audit
            .providers
            .extend(game.lines.iter().map(|l| l.provider.clone()));
        if game.lines.len() > 1 {
            audit.games_with_multiple_books += 1;
            if audit.sample.is_none() {
                audit.sample = Some(game.clone());
            }
        }
    }
    audit.blocked = audit
        .providers
        .iter()
        .filter(|p| !valid_books.contains(p))
        .cloned()
        .collect();
    audit
}

pub async fn run_line_audit(
    client: &CfbdClient,
    year: i32,
    season_type: SeasonType,
    week: Option<u32>,
    valid_books: &[String],
) -> Result<LineAudit> {
    let lines = client
        .lines(year, season_type, week)
        .await
        .context("Failed to fetch betting lines")?;
    Ok(audit_lines(&lines, valid_books))
}

pub async fn usage(client: &CfbdClient) -> Result<InfoResult> {
    client.info().await.context("Failed to fetch API usage")
}

/// One line of the pick board
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub game: String,
    pub pick: String,
    pub book: String,
    pub confidence: f64,
    pub tier: ConfidenceTier,
    /// Kelly stake in dollars
    pub stake: f64,
}

impl BoardRow {
    pub fn format(&self) -> String {
        format!(
            "{:<40} {:<28} {:<12} {:>6}  {:<16} ${:.2}",
            self.game,
            self.pick,
            self.book,
            format_confidence(self.confidence),
            self.tier.to_string(),
            self.stake
        )
    }
}

/// Spread and total boards for unsettled, non-pending picks, most
/// confident first
pub fn board(ledger: &Ledger, kelly: &KellySettings) -> (Vec<BoardRow>, Vec<BoardRow>) {
    let open: Vec<&PredictionRecord> = ledger
        .records
        .iter()
        .filter(|r| !r.is_settled() && !r.is_pending())
        .collect();

    let rows = |pick: fn(&PredictionRecord) -> Option<(&String, &String, f64)>| {
        let mut rows: Vec<BoardRow> = open
            .iter()
            .filter_map(|r| {
                let (text, book, confidence) = pick(r)?;
                if text == PENDING {
                    return None;
                }
                Some(BoardRow {
                    game: r.game.clone(),
                    pick: text.clone(),
                    book: book.clone(),
                    confidence,
                    tier: ConfidenceTier::from_confidence(confidence),
                    stake: kelly.stake(confidence),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    };

    let spreads = rows(|r| {
        Some((
            r.spread_pick.as_ref()?,
            r.spread_book.as_ref()?,
            r.spread_conf_raw?,
        ))
    });
    let totals = rows(|r| {
        Some((
            r.total_pick.as_ref()?,
            r.total_book.as_ref()?,
            r.total_conf_raw?,
        ))
    });
    (spreads, totals)
}

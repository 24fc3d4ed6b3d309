use anyhow::{Context, Result};
use cfb_picks::api::cfbd_api::CfbdClient;
use cfb_picks::ledger::{Keep, Ledger};
use cfb_picks::model::ModelSet;
use cfb_picks::models::SeasonType;
use cfb_picks::picks::LineStrategy;
use cfb_picks::pipeline::{self, PredictOptions};
use cfb_picks::Config;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cfb-picks", about = "College football spread, total and moneyline picks")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score upcoming games and merge the picks into the ledger
    Predict {
        #[arg(long)]
        year: i32,
        #[arg(long, value_enum, default_value = "regular")]
        season_type: SeasonType,
        #[arg(long)]
        week: Option<u32>,
        #[arg(long, value_enum, default_value = "best-confidence")]
        strategy: LineStrategy,
        /// Keep games that have no lines yet as Pending rows
        #[arg(long)]
        include_pending: bool,
    },
    /// Grade ledger picks against final scores
    Grade {
        #[arg(long)]
        year: i32,
        #[arg(long, value_enum, default_value = "both")]
        season_type: SeasonType,
        /// Only count picks at or above this confidence (e.g. 0.55)
        #[arg(long)]
        min_confidence: Option<f64>,
        /// Print every graded row
        #[arg(long)]
        verbose: bool,
    },
    /// Replay a finished season with pre-game stats and report the record
    Backtest {
        #[arg(long)]
        year: i32,
        #[arg(long, value_enum, default_value = "regular")]
        season_type: SeasonType,
        #[arg(long)]
        week: Option<u32>,
        #[arg(long, value_enum, default_value = "best-confidence")]
        strategy: LineStrategy,
        /// Only bet picks at or above this confidence
        #[arg(long, default_value = "0.55")]
        min_confidence: f64,
    },
    /// Open picks ranked by confidence, with tiers and Kelly stakes
    Board {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Drop broken rows, canonicalize team names and remove duplicates
    Clean {
        #[arg(long, value_enum, default_value = "last")]
        keep: Keep,
    },
    /// Report which bookmakers the API quotes and which the whitelist blocks
    AuditLines {
        #[arg(long)]
        year: i32,
        #[arg(long, value_enum, default_value = "regular")]
        season_type: SeasonType,
        #[arg(long)]
        week: Option<u32>,
    },
    /// Show the remaining API quota
    Usage,
}

fn client(config: &Config) -> Result<CfbdClient> {
    let api_key = config.api_key()?.to_string();
    let client = CfbdClient::new(api_key, &config.base_url, config.retry_policy());
    Ok(if config.use_cache {
        client.with_cache(config.cache_dir.clone())
    } else {
        client
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = cli.config;
    config.validate()?;

    match cli.command {
        Command::Predict {
            year,
            season_type,
            week,
            strategy,
            include_pending,
        } => {
            let models = ModelSet::load(&config.model_dir).with_context(|| {
                format!("Failed to load models from {}", config.model_dir.display())
            })?;
            let client = client(&config)?;
            let opts = PredictOptions {
                year,
                season_type,
                week,
                strategy,
                include_pending,
                valid_books: config.books(),
                defaults: config.feature_defaults(),
            };
            info!(year, %season_type, ?week, ?strategy, "Predicting");
            let report = pipeline::predict(&client, &config.history_file, &models, &opts).await?;

            if report.records.is_empty() {
                println!("No games with valid lines found.");
                return Ok(());
            }

            let mut spreads: Vec<_> = report
                .records
                .iter()
                .filter_map(|r| Some((r, r.spread_conf_raw?)))
                .collect();
            spreads.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            println!("\nTOP SPREAD EDGES\n");
            for (i, (r, _)) in spreads.iter().take(20).enumerate() {
                println!(
                    "{}. {:<40} {:<28} {:<12} {}",
                    i + 1,
                    r.game,
                    r.spread_pick.as_deref().unwrap_or("-"),
                    r.spread_book.as_deref().unwrap_or("-"),
                    r.spread_conf.as_deref().unwrap_or("-")
                );
            }

            let mut totals: Vec<_> = report
                .records
                .iter()
                .filter_map(|r| Some((r, r.total_conf_raw?)))
                .collect();
            totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            println!("\nTOP TOTALS EDGES\n");
            for (i, (r, _)) in totals.iter().take(20).enumerate() {
                println!(
                    "{}. {:<40} {:<16} {:<12} {}",
                    i + 1,
                    r.game,
                    r.total_pick.as_deref().unwrap_or("-"),
                    r.total_book.as_deref().unwrap_or("-"),
                    r.total_conf.as_deref().unwrap_or("-")
                );
            }

            println!(
                "\nLedger {}: {} inserted, {} updated, {} settled rows kept",
                config.history_file.display(),
                report.merge.inserted,
                report.merge.updated,
                report.merge.protected
            );
        }
        Command::Grade {
            year,
            season_type,
            min_confidence,
            verbose,
        } => {
            let client = client(&config)?;
            let report =
                pipeline::grade(&client, &config.history_file, year, season_type, min_confidence)
                    .await?;

            if verbose {
                println!("\nGRADED PICKS\n");
                for g in &report.graded {
                    let score = g
                        .score
                        .map(|s| format!("{}-{}", s.away, s.home))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<40} {:>7}  Spread: {:<8} Total: {:<8} ML: {}",
                        g.record.game,
                        score,
                        g.spread.to_string(),
                        g.total.to_string(),
                        g.moneyline.to_string()
                    );
                }
            }

            println!("\nRECORD ({} final scores from the API)\n", report.scored_games);
            if let Some(threshold) = min_confidence {
                println!("Counting picks at {:.1}% confidence or higher\n", threshold * 100.0);
            }
            for market in report.summary.markets() {
                println!("{}", market.format());
            }
        }
        Command::Backtest {
            year,
            season_type,
            week,
            strategy,
            min_confidence,
        } => {
            let models = ModelSet::load(&config.model_dir).with_context(|| {
                format!("Failed to load models from {}", config.model_dir.display())
            })?;
            let client = client(&config)?;
            let opts = PredictOptions {
                year,
                season_type,
                week,
                strategy,
                include_pending: false,
                valid_books: config.books(),
                defaults: config.feature_defaults(),
            };
            info!(year, %season_type, ?week, ?strategy, "Backtesting");
            let report = pipeline::backtest(&client, &models, &opts, Some(min_confidence)).await?;

            println!(
                "\nBACKTEST {} ({} games replayed, {} without valid lines)\n",
                year,
                report.graded.len(),
                report.skipped
            );
            println!("Betting picks at {:.1}% confidence or higher\n", min_confidence * 100.0);
            for market in report.summary.markets() {
                println!("{}", market.format());
            }
        }
        Command::Board { limit } => {
            let ledger = Ledger::load(&config.history_file).context("Failed to load ledger")?;
            let (spreads, totals) = pipeline::board(&ledger, &config.kelly());

            println!("\nSPREAD BOARD\n");
            if spreads.is_empty() {
                println!("No open spread picks.");
            }
            for (i, row) in spreads.iter().take(limit).enumerate() {
                println!("{}. {}", i + 1, row.format());
            }

            println!("\nTOTALS BOARD\n");
            if totals.is_empty() {
                println!("No open total picks.");
            }
            for (i, row) in totals.iter().take(limit).enumerate() {
                println!("{}. {}", i + 1, row.format());
            }

            let exposure: f64 = spreads
                .iter()
                .take(limit)
                .chain(totals.iter().take(limit))
                .map(|r| r.stake)
                .sum();
            println!(
                "\nBankroll ${:.2}, Kelly fraction {:.2}: total exposure ${:.2} ({:.1}%)",
                config.bankroll,
                config.kelly_fraction,
                exposure,
                exposure / config.bankroll * 100.0
            );
        }
        Command::Clean { keep } => {
            let report = pipeline::clean(&config.history_file, keep)?;
            println!("Removed {} broken rows", report.broken);
            println!("Renamed teams in {} rows", report.renamed);
            println!("Removed {} duplicates", report.duplicates);
            println!(
                "Saved {} with {} rows",
                config.history_file.display(),
                report.remaining
            );
        }
        Command::AuditLines {
            year,
            season_type,
            week,
        } => {
            let client = client(&config)?;
            let books = config.books();
            let audit = pipeline::run_line_audit(&client, year, season_type, week, &books).await?;

            println!("\nLINE SHOPPING AUDIT\n");
            println!("Games scanned:       {}", audit.games_scanned);
            println!("Lines scanned:       {}", audit.lines_seen);
            println!("Games with >1 book:  {}", audit.games_with_multiple_books);
            println!(
                "Books found:         {}",
                audit.providers.iter().cloned().collect::<Vec<_>>().join(", ")
            );

            if let Some(sample) = &audit.sample {
                println!(
                    "\nSample multi-book game: {} vs {}",
                    sample.home_team, sample.away_team
                );
                for line in &sample.lines {
                    println!(
                        "  - {}: spread {} | total {}",
                        line.provider,
                        line.spread.map_or("-".to_string(), |s| s.to_string()),
                        line.over_under.map_or("-".to_string(), |t| t.to_string())
                    );
                }
            }

            println!("\nBlocked by VALID_BOOKS:");
            if audit.blocked.is_empty() {
                println!("  none");
            }
            for book in &audit.blocked {
                println!("  {}", book);
            }
        }
        Command::Usage => {
            let client = client(&config)?;
            let info = pipeline::usage(&client).await?;
            match info.remaining_calls {
                Some(remaining) => println!("CFB Data API requests remaining: {}", remaining),
                None => println!("CFB Data API did not report a remaining call count"),
            }
            if let Some(level) = info.patron_level {
                println!("Patron level: {}", level);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_shared_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cfb-picks",
            "grade",
            "--year",
            "2024",
            "--history-file",
            "graded.csv",
        ])
        .unwrap();
        assert_eq!(cli.config.history_file, std::path::PathBuf::from("graded.csv"));
        assert!(matches!(cli.command, Command::Grade { year: 2024, .. }));

        let cli = Cli::try_parse_from(["cfb-picks", "--use-cache", "backtest", "--year", "2023"])
            .unwrap();
        assert!(cli.config.use_cache);
        assert!(matches!(
            cli.command,
            Command::Backtest { min_confidence, .. } if min_confidence == 0.55
        ));
    }
}

use crate::error::{CfbError, Result};
use crate::models::{Game, GameId, GameLines, Line, SeasonType};
use crate::utils::data::{cache_path, load_from_cache, save_to_cache};
use crate::utils::lenient::json_opt_f64;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const BASE_URL: &str = "https://api.collegefootballdata.com";

/// How hard to push on a failing endpoint before giving up.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Multiplied by the attempt number after an HTTP 429
    pub rate_limit_backoff: Duration,
    /// Pause after a transport failure
    pub error_backoff: Duration,
    /// Politeness delay after every successful call
    pub request_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_backoff: Duration::from_secs(10),
            error_backoff: Duration::from_secs(5),
            request_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiGame {
    pub id: GameId,
    pub season: i32,
    pub week: u32,
    #[serde(default, alias = "season_type")]
    pub season_type: Option<String>,
    #[serde(default, alias = "start_date")]
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(alias = "home_team")]
    pub home_team: String,
    #[serde(alias = "away_team")]
    pub away_team: String,
    #[serde(default, alias = "home_points")]
    pub home_points: Option<i32>,
    #[serde(default, alias = "away_points")]
    pub away_points: Option<i32>,
}

impl From<ApiGame> for Game {
    fn from(g: ApiGame) -> Self {
        let season_type = match g.season_type.as_deref() {
            Some("postseason") => SeasonType::Postseason,
            _ => SeasonType::Regular,
        };
        Game {
            id: g.id,
            season: g.season,
            week: g.week,
            season_type,
            start_date: g.start_date,
            completed: g.completed,
            home_team: g.home_team,
            away_team: g.away_team,
            home_points: g.home_points,
            away_points: g.away_points,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiLine {
    pub provider: String,
    #[serde(default, deserialize_with = "json_opt_f64")]
    pub spread: Option<f64>,
    #[serde(default, alias = "over_under", deserialize_with = "json_opt_f64")]
    pub over_under: Option<f64>,
    #[serde(default, alias = "home_moneyline")]
    pub home_moneyline: Option<i32>,
    #[serde(default, alias = "away_moneyline")]
    pub away_moneyline: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiGameLines {
    pub id: GameId,
    #[serde(alias = "home_team")]
    pub home_team: String,
    #[serde(alias = "away_team")]
    pub away_team: String,
    #[serde(default)]
    pub lines: Vec<ApiLine>,
}

impl From<ApiGameLines> for GameLines {
    fn from(g: ApiGameLines) -> Self {
        GameLines {
            game_id: g.id,
            home_team: g.home_team,
            away_team: g.away_team,
            lines: g
                .lines
                .into_iter()
                .map(|l| Line {
                    provider: l.provider,
                    spread: l.spread,
                    over_under: l.over_under,
                    home_moneyline: l.home_moneyline,
                    away_moneyline: l.away_moneyline,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SrsRating {
    pub team: String,
    #[serde(default, deserialize_with = "json_opt_f64")]
    pub rating: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TeamTalent {
    /// Older payloads name the team `school`
    #[serde(alias = "school")]
    pub team: String,
    #[serde(default, deserialize_with = "json_opt_f64")]
    pub talent: Option<f64>,
}

/// Efficiency split for one play type (rushing or passing)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayTypeStats {
    #[serde(default, deserialize_with = "json_opt_f64")]
    pub ppa: Option<f64>,
    #[serde(default, alias = "success_rate", deserialize_with = "json_opt_f64")]
    pub success_rate: Option<f64>,
    #[serde(default, deserialize_with = "json_opt_f64")]
    pub explosiveness: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSideStats {
    #[serde(default, deserialize_with = "json_opt_f64")]
    pub ppa: Option<f64>,
    #[serde(default, alias = "success_rate", deserialize_with = "json_opt_f64")]
    pub success_rate: Option<f64>,
    #[serde(default, deserialize_with = "json_opt_f64")]
    pub explosiveness: Option<f64>,
    #[serde(default, alias = "rushing", alias = "rushing_plays")]
    pub rushing_plays: Option<PlayTypeStats>,
    #[serde(default, alias = "passing", alias = "passing_plays")]
    pub passing_plays: Option<PlayTypeStats>,
}

/// One team's advanced box score for one game (`/stats/game/advanced`)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedGameStats {
    #[serde(default, alias = "game_id")]
    pub game_id: Option<GameId>,
    #[serde(default)]
    pub season: Option<i32>,
    pub week: u32,
    pub team: String,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub offense: AdvancedSideStats,
    #[serde(default)]
    pub defense: AdvancedSideStats,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InfoResult {
    #[serde(default)]
    pub patron_level: Option<u32>,
    #[serde(default)]
    pub remaining_calls: Option<i64>,
}

#[derive(Clone)]
pub struct CfbdClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
    cache_dir: Option<PathBuf>,
}

impl CfbdClient {
    pub fn new(api_key: String, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            cache_dir: None,
        }
    }

    /// Serve list endpoints from JSON files under `dir` when present
    pub fn with_cache(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    /// Same client with the disk cache switched off
    pub fn uncached(&self) -> Self {
        Self {
            cache_dir: None,
            ..self.clone()
        }
    }

    /// GET `endpoint` with bounded retries.
    ///
    /// A 429 backs off `rate_limit_backoff * attempt`, a transport error
    /// backs off `error_backoff`, any other non-success status fails at once.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let sent = self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Accept", "application/json")
                .query(params)
                .send()
                .await;

            match sent {
                Ok(response) if response.status().is_success() => {
                    let data: T = response.json().await?;
                    tokio::time::sleep(self.retry.request_delay).await;
                    return Ok(data);
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = self.retry.rate_limit_backoff * attempt;
                    warn!(endpoint, attempt, ?wait, "Rate limit hit");
                    if attempt < max_attempts {
                        tokio::time::sleep(wait).await;
                    }
                }
                Ok(response) => {
                    return Err(CfbError::Api {
                        status: response.status(),
                        endpoint: endpoint.to_string(),
                    });
                }
                Err(e) => {
                    warn!(endpoint, attempt, error = %e, "Request failed");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry.error_backoff).await;
                    }
                }
            }
        }

        Err(CfbError::RetriesExhausted {
            endpoint: endpoint.to_string(),
            attempts: max_attempts,
        })
    }

    /// Fetch a list endpoint, consulting the disk cache first when one is set.
    /// An empty cached list counts as a miss.
    async fn fetch_list<T>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Serialize,
    {
        let cache_file = self
            .cache_dir
            .as_ref()
            .map(|dir| cache_path(dir, endpoint, params));

        if let Some(path) = cache_file.as_ref().filter(|p| p.exists()) {
            match load_from_cache::<Vec<T>>(path) {
                Ok(cached) if !cached.is_empty() => {
                    debug!(endpoint, path = %path.display(), "Using cached response");
                    return Ok(cached);
                }
                Ok(_) => debug!(endpoint, "Cached response empty, fetching live"),
                Err(e) => warn!(endpoint, error = %e, "Ignoring unreadable cache file"),
            }
        }

        let data: Vec<T> = self.get_json(endpoint, params).await?;
        info!(endpoint, count = data.len(), "Fetched");

        if let Some(path) = cache_file.as_ref() {
            if !data.is_empty() {
                if let Err(e) = save_to_cache(&data, path) {
                    warn!(endpoint, error = %e, "Failed to write cache");
                }
            }
        }
        Ok(data)
    }

    fn season_params(
        year: i32,
        season_type: SeasonType,
        week: Option<u32>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("year", year.to_string()),
            ("seasonType", season_type.as_str().to_string()),
        ];
        if let Some(week) = week {
            params.push(("week", week.to_string()));
        }
        params
    }

    pub async fn games(
        &self,
        year: i32,
        season_type: SeasonType,
        week: Option<u32>,
    ) -> Result<Vec<Game>> {
        let params = Self::season_params(year, season_type, week);
        let games: Vec<ApiGame> = self.fetch_list("/games", &params).await?;
        Ok(games.into_iter().map(Game::from).collect())
    }

    pub async fn lines(
        &self,
        year: i32,
        season_type: SeasonType,
        week: Option<u32>,
    ) -> Result<Vec<GameLines>> {
        let params = Self::season_params(year, season_type, week);
        let lines: Vec<ApiGameLines> = self.fetch_list("/lines", &params).await?;
        Ok(lines.into_iter().map(GameLines::from).collect())
    }

    pub async fn srs_ratings(&self, year: i32) -> Result<Vec<SrsRating>> {
        self.fetch_list("/ratings/srs", &[("year", year.to_string())]).await
    }

    pub async fn talent(&self, year: i32) -> Result<Vec<TeamTalent>> {
        self.fetch_list("/talent", &[("year", year.to_string())]).await
    }

    pub async fn advanced_game_stats(&self, year: i32) -> Result<Vec<AdvancedGameStats>> {
        let params = [("year", year.to_string())];
        self.fetch_list("/stats/game/advanced", &params).await
    }

    /// Account info, including the remaining monthly call quota. Never cached.
    pub async fn info(&self) -> Result<InfoResult> {
        self.get_json("/info", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_game_accepts_both_key_spellings() {
        let json = r#"[
            {"id": 401628374, "season": 2024, "week": 5, "seasonType": "regular",
             "startDate": "2024-09-28T19:30:00.000Z", "completed": true,
             "homeTeam": "Texas", "awayTeam": "Mississippi State",
             "homePoints": 35, "awayPoints": 13},
            {"id": "401628375", "season": 2024, "week": 5, "season_type": "postseason",
             "start_date": null, "completed": false,
             "home_team": "Oregon", "away_team": "Michigan State",
             "home_points": null, "away_points": null}
        ]"#;
        let games: Vec<Game> = serde_json::from_str::<Vec<ApiGame>>(json)
            .unwrap()
            .into_iter()
            .map(Game::from)
            .collect();

        assert_eq!(games[0].home_team, "Texas");
        assert_eq!(games[0].home_points, Some(35));
        assert!(games[0].start_date.is_some());
        assert_eq!(games[1].id.as_str(), "401628375");
        assert_eq!(games[1].season_type, SeasonType::Postseason);
        assert!(games[1].final_score().is_none());
    }

    #[test]
    fn test_lines_payload() {
        let json = r#"[{"id": 1, "homeTeam": "Georgia", "awayTeam": "Alabama", "lines": [
            {"provider": "DraftKings", "spread": -2.5, "overUnder": 55.0,
             "homeMoneyline": -135, "awayMoneyline": 115},
            {"provider": "Bovada", "spread": "-1.5", "overUnder": null}
        ]}]"#;
        let games: Vec<GameLines> = serde_json::from_str::<Vec<ApiGameLines>>(json)
            .unwrap()
            .into_iter()
            .map(GameLines::from)
            .collect();
        let lines = &games[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spread, Some(-2.5));
        assert_eq!(lines[0].home_moneyline, Some(-135));
        assert_eq!(lines[1].spread, Some(-1.5));
        assert_eq!(lines[1].over_under, None);
    }

    #[test]
    fn test_talent_and_advanced_payloads() {
        let talent: Vec<TeamTalent> = serde_json::from_str(
            r#"[{"year": 2024, "school": "Georgia", "talent": "1000.52"},
                {"year": 2024, "team": "Ohio State", "talent": 990.1}]"#,
        )
        .unwrap();
        assert_eq!(talent[0].team, "Georgia");
        assert_eq!(talent[0].talent, Some(1000.52));
        assert_eq!(talent[1].team, "Ohio State");

        let stats: Vec<AdvancedGameStats> = serde_json::from_str(
            r#"[{"gameId": 1, "season": 2024, "week": 2, "team": "Texas", "opponent": "Michigan",
                 "offense": {"ppa": 0.31, "successRate": 0.48, "explosiveness": 1.2,
                             "rushingPlays": {"ppa": 0.2, "successRate": 0.45}},
                 "defense": {"ppa": 0.05}}]"#,
        )
        .unwrap();
        assert_eq!(stats[0].offense.success_rate, Some(0.48));
        let rushing = stats[0].offense.rushing_plays.as_ref().unwrap();
        assert_eq!(rushing.ppa, Some(0.2));
        assert!(stats[0].defense.passing_plays.is_none());
    }

    async fn stub_server(statuses: Vec<u16>, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses.get(n).or(statuses.last()).copied().unwrap_or(200);
                let mut request = vec![0u8; 4096];
                let _ = socket.read(&mut request).await;
                let payload = if status == 200 { body } else { "{}" };
                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    payload.len(),
                    payload
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{}", addr), hits)
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            rate_limit_backoff: Duration::from_millis(1),
            error_backoff: Duration::from_millis(1),
            request_delay: Duration::ZERO,
        }
    }

    const SRS_BODY: &str = r#"[{"team": "Georgia", "rating": 24.1}]"#;

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let (url, hits) = stub_server(vec![429, 429, 200], SRS_BODY).await;
        let client = CfbdClient::new("key".to_string(), &url, quick_retry());
        let ratings = client.srs_ratings(2024).await.unwrap();
        assert_eq!(ratings[0].team, "Georgia");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_attempts() {
        let (url, hits) = stub_server(vec![429], SRS_BODY).await;
        let client = CfbdClient::new("key".to_string(), &url, quick_retry());
        let err = client.srs_ratings(2024).await.unwrap_err();
        assert!(matches!(
            err,
            CfbError::RetriesExhausted { ref endpoint, attempts: 3 } if endpoint == "/ratings/srs"
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let (url, hits) = stub_server(vec![500, 200], SRS_BODY).await;
        let client = CfbdClient::new("key".to_string(), &url, quick_retry());
        let err = client.srs_ratings(2024).await.unwrap_err();
        assert!(matches!(
            err,
            CfbError::Api { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_reads_writes_and_bypass() {
        let (url, hits) = stub_server(vec![200], SRS_BODY).await;
        let dir = std::env::temp_dir().join(format!("cfb_picks_api_cache_{}", std::process::id()));
        let file = cache_path(&dir, "/ratings/srs", &[("year", "2024".to_string())]);
        save_to_cache(&Vec::<SrsRating>::new(), &file).unwrap();

        let client =
            CfbdClient::new("key".to_string(), &url, quick_retry()).with_cache(dir.clone());

        // An empty cached list is a miss; the live result replaces it
        let ratings = client.srs_ratings(2024).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let cached: Vec<SrsRating> = load_from_cache(&file).unwrap();
        assert_eq!(cached[0].team, "Georgia");

        client.srs_ratings(2024).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        client.uncached().srs_ratings(2024).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_games() {
        dotenv::dotenv().ok();
        let api_key = std::env::var("CFBD_API_KEY").expect("CFBD_API_KEY not set");
        let client = CfbdClient::new(api_key, BASE_URL, RetryPolicy::default());
        let games = client
            .games(2024, SeasonType::Regular, Some(1))
            .await
            .unwrap();
        assert!(!games.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_check_usage() {
        dotenv::dotenv().ok();
        let api_key = std::env::var("CFBD_API_KEY").expect("CFBD_API_KEY not set");
        let client = CfbdClient::new(api_key, BASE_URL, RetryPolicy::default());
        let info = client.info().await.unwrap();
        assert!(info.remaining_calls.is_some());
    }
}

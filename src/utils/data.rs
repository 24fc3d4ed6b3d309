use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Cache file for an API call, e.g. `cache/games_2024_regular_5.json`
pub fn cache_path(cache_dir: &Path, endpoint: &str, params: &[(&str, String)]) -> PathBuf {
    let mut name = endpoint.trim_matches('/').replace('/', "_");
    for (_, value) in params {
        name.push('_');
        name.push_str(&value.replace(|c: char| !c.is_ascii_alphanumeric(), "-"));
    }
    cache_dir.join(format!("{}.json", name))
}

/// Save any serializable payload to a JSON cache file
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, cache_file: &Path) -> Result<()> {
    if let Some(parent) = cache_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(cache_file, json)?;
    Ok(())
}

/// Load a payload from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(cache_file: &Path) -> Result<T> {
    let json = std::fs::read_to_string(cache_file)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path() {
        let path = cache_path(
            Path::new("cache"),
            "/stats/game/advanced",
            &[("year", "2024".to_string()), ("seasonType", "regular".to_string())],
        );
        assert_eq!(path, Path::new("cache/stats_game_advanced_2024_regular.json"));
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = std::env::temp_dir().join(format!("cfb_picks_cache_{}", std::process::id()));
        let file = dir.join("talent_2024.json");
        let data = vec![("Georgia".to_string(), 1000.5), ("Ohio State".to_string(), 990.1)];
        save_to_cache(&data, &file).unwrap();
        let loaded: Vec<(String, f64)> = load_from_cache(&file).unwrap();
        assert_eq!(loaded, data);
        std::fs::remove_dir_all(&dir).ok();
    }
}

//! Pre-trained classifiers and how they are loaded.
//!
//! Models are exported to JSON ahead of time. Every model predicts the
//! probability of the positive class: home covers, game goes over, or home
//! team wins.

pub mod forest;
pub mod logistic;

pub use forest::ForestModel;
pub use logistic::LogisticModel;

use crate::error::{CfbError, Result};
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const SPREAD_MODEL_FILE: &str = "model_spread.json";
pub const TOTAL_MODEL_FILE: &str = "model_total.json";
pub const WINNER_MODEL_FILE: &str = "model_winner.json";

pub trait Classifier: Send + Sync {
    /// Input columns in the order the model was fit on
    fn feature_names(&self) -> &[String];

    /// Probability of the positive class
    fn predict_proba(&self, row: &FeatureRow) -> f64;
}

/// On-disk model, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Model {
    Logistic(LogisticModel),
    Forest(ForestModel),
}

impl Model {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let model: Model = serde_json::from_str(&json)?;
        model.validate().map_err(|reason| {
            CfbError::Model(format!("{}: {}", path.display(), reason))
        })?;
        Ok(model)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Model::Logistic(m) => m.validate(),
            Model::Forest(m) => m.validate(),
        }
    }
}

impl Classifier for Model {
    fn feature_names(&self) -> &[String] {
        match self {
            Model::Logistic(m) => m.feature_names(),
            Model::Forest(m) => m.feature_names(),
        }
    }

    fn predict_proba(&self, row: &FeatureRow) -> f64 {
        match self {
            Model::Logistic(m) => m.predict_proba(row),
            Model::Forest(m) => m.predict_proba(row),
        }
    }
}

/// The spread and total models, plus an optional straight-up winner model
pub struct ModelSet {
    pub spread: Box<dyn Classifier>,
    pub total: Box<dyn Classifier>,
    pub winner: Option<Box<dyn Classifier>>,
}

impl ModelSet {
    pub fn load(dir: &Path) -> Result<Self> {
        let spread = Model::load(&dir.join(SPREAD_MODEL_FILE))?;
        let total = Model::load(&dir.join(TOTAL_MODEL_FILE))?;
        let winner_path = dir.join(WINNER_MODEL_FILE);
        let winner = if winner_path.exists() {
            Some(Box::new(Model::load(&winner_path)?) as Box<dyn Classifier>)
        } else {
            info!("No winner model found, moneyline falls back to ratings");
            None
        };
        Ok(Self {
            spread: Box::new(spread),
            total: Box::new(total),
            winner,
        })
    }
}

pub(crate) fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Home win probability from SRS and talent gaps, for when no winner model
/// is available. Talent composites run in the hundreds, so they are scaled
/// down before being added to the SRS gap.
pub fn rating_win_probability(
    home_srs: f64,
    away_srs: f64,
    home_talent: f64,
    away_talent: f64,
) -> f64 {
    let srs_diff = home_srs - away_srs;
    let talent_diff = home_talent - away_talent;
    logistic((srs_diff + talent_diff / 200.0) / 7.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rating_win_probability() {
        assert_relative_eq!(rating_win_probability(5.0, 5.0, 800.0, 800.0), 0.5);
        // 7.5 point SRS edge is one logit
        assert_relative_eq!(
            rating_win_probability(10.0, 2.5, 800.0, 800.0),
            1.0 / (1.0 + (-1.0f64).exp()),
            epsilon = 1e-12
        );
        assert!(rating_win_probability(0.0, 10.0, 700.0, 900.0) < 0.5);
    }

    #[test]
    fn test_load_model_set() {
        let dir = std::env::temp_dir().join(format!("cfb_picks_models_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(SPREAD_MODEL_FILE),
            r#"{"kind": "logistic", "feature_names": ["spread"], "intercept": 0.0, "coefficients": [0.1]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(TOTAL_MODEL_FILE),
            r#"{"kind": "forest", "feature_names": ["overUnder"],
                "trees": [{"nodes": [{"value": 0.6}]}]}"#,
        )
        .unwrap();

        let models = ModelSet::load(&dir).unwrap();
        assert!(models.winner.is_none());
        let row = FeatureRow::new().with_line(0.0, 55.5);
        assert_relative_eq!(models.spread.predict_proba(&row), 0.5);
        assert_relative_eq!(models.total.predict_proba(&row), 0.6);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_model_rejected() {
        let dir = std::env::temp_dir().join(format!("cfb_picks_badmodel_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(
            &path,
            r#"{"kind": "logistic", "feature_names": ["a", "b"], "intercept": 0.0, "coefficients": [1.0]}"#,
        )
        .unwrap();
        assert!(matches!(Model::load(&path), Err(CfbError::Model(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}

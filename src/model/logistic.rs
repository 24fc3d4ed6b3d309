use super::{logistic, Classifier};
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};

/// `p = 1 / (1 + exp(-(intercept + w . x)))`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticModel {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.coefficients.len() != self.feature_names.len() {
            return Err(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            ));
        }
        Ok(())
    }
}

impl Classifier for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: &FeatureRow) -> f64 {
        let x = row.vector(&self.feature_names);
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(x.iter())
                .map(|(w, v)| w * v)
                .sum::<f64>();
        logistic(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_predict_proba() {
        let model = LogisticModel {
            feature_names: vec!["spread".to_string(), "home_srs_rating".to_string()],
            intercept: 0.5,
            coefficients: vec![-0.1, 0.05],
        };
        let mut row = FeatureRow::new();
        row.set("spread", -3.0);
        row.set("home_srs_rating", 10.0);
        // z = 0.5 + 0.3 + 0.5 = 1.3
        assert_relative_eq!(
            model.predict_proba(&row),
            1.0 / (1.0 + (-1.3f64).exp()),
            epsilon = 1e-12
        );

        // Missing columns count as zero
        assert_relative_eq!(
            model.predict_proba(&FeatureRow::new()),
            1.0 / (1.0 + (-0.5f64).exp()),
            epsilon = 1e-12
        );
    }
}

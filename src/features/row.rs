use std::collections::BTreeMap;
use tracing::debug;

/// Named model inputs for one game
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    values: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Copy of this row with `name` set
    pub fn with(&self, name: &str, value: f64) -> Self {
        let mut row = self.clone();
        row.set(name, value);
        row
    }

    /// Copy of this row with the line columns filled in
    pub fn with_line(&self, spread: f64, over_under: f64) -> Self {
        self.with("spread", spread).with("overUnder", over_under)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Columns in `names` this row does not carry
    pub fn missing<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .filter(|n| !self.values.contains_key(n.as_str()))
            .map(|n| n.as_str())
            .collect()
    }

    /// Values ordered as `names`, zero for any column the row lacks
    pub fn vector(&self, names: &[String]) -> Vec<f64> {
        let missing = self.missing(names);
        if !missing.is_empty() {
            debug!(?missing, "Zero-filling missing feature columns");
        }
        names
            .iter()
            .map(|n| self.get(n).unwrap_or(0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_orders_and_zero_fills() {
        let mut row = FeatureRow::new();
        row.set("home_srs_rating", 12.5);
        row.set("spread", -3.0);
        let names: Vec<String> = ["spread", "home_srs_rating", "home_decay_offense.ppa"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(row.vector(&names), vec![-3.0, 12.5, 0.0]);
        assert_eq!(row.missing(&names), vec!["home_decay_offense.ppa"]);
    }

    #[test]
    fn test_with_line_leaves_base_untouched() {
        let mut base = FeatureRow::new();
        base.set("home_talent_score", 900.0);
        let row = base.with_line(0.0, 55.5);
        assert_eq!(row.get("spread"), Some(0.0));
        assert_eq!(row.get("overUnder"), Some(55.5));
        assert_eq!(base.get("spread"), None);
        assert_eq!(row.len(), 3);
    }
}

//! Feature engineering: team lookups and the model input rows built from them.

pub mod context;
pub mod decay;
pub mod row;

pub use context::{DecayLookup, TeamContext};
pub use decay::{DecayTable, DECAY_METRICS};
pub use row::FeatureRow;

/// Values assumed for teams the API has nothing on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDefaults {
    pub talent: f64,
    pub srs: f64,
    /// Over/under used when a line quotes a spread but no total
    pub total: f64,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            talent: 10.0,
            srs: -5.0,
            total: 55.5,
        }
    }
}

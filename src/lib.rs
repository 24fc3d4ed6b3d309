pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod grading;
pub mod ledger;
pub mod model;
pub mod models;
pub mod picks;
pub mod pipeline;
pub mod utils;

pub use api::CfbdClient;
pub use config::Config;
pub use error::{CfbError, Result};
pub use models::*;

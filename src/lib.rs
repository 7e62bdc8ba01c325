//! Ride analysis core: parses GPX/FIT tracks, derives ride metrics, enriches
//! them with weather and terrain, and estimates energy expenditure.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod terrain;
pub mod types;
pub mod weather;

pub use config::Config;
pub use error::AnalysisError;
pub use pipeline::analyze::RideAnalyzer;
pub use types::activity::TrackFormat;
pub use types::analysis::RideAnalysis;

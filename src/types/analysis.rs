use serde::{Deserialize, Serialize};

use crate::types::activity::{RideMetrics, TrackFormat};
use crate::types::terrain::{TerrainSegment, TerrainSourceStats, TerrainSummary};
use crate::types::weather::WeatherSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieBreakdownEntry {
    pub factor: String,
    pub calories: i64,
    pub percentage_of_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieEstimate {
    pub total_kcal: i64,
    pub breakdown: Vec<CalorieBreakdownEntry>,
}

/// Everything one analysis produces, handed to the caller by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideAnalysis {
    pub format: TrackFormat,
    pub rider_weight_kg: f64,
    pub metrics: RideMetrics,
    pub calories: CalorieEstimate,
    pub weather: WeatherSnapshot,
    pub terrain_segments: Vec<TerrainSegment>,
    pub terrain_summary: TerrainSummary,
    pub terrain_source: TerrainSourceStats,
}

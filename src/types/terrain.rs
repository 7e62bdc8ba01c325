use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    Urban,
    Suburban,
    Rural,
    Forest,
    Mountain,
    Coastal,
    Desert,
    Grassland,
    Wetland,
    Industrial,
    Park,
    Water,
    Unknown,
}

impl TerrainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerrainType::Urban => "urban",
            TerrainType::Suburban => "suburban",
            TerrainType::Rural => "rural",
            TerrainType::Forest => "forest",
            TerrainType::Mountain => "mountain",
            TerrainType::Coastal => "coastal",
            TerrainType::Desert => "desert",
            TerrainType::Grassland => "grassland",
            TerrainType::Wetland => "wetland",
            TerrainType::Industrial => "industrial",
            TerrainType::Park => "park",
            TerrainType::Water => "water",
            TerrainType::Unknown => "unknown",
        }
    }
}

/// Where a sampled point's classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Remote,
    ElevationFallback,
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointClassification {
    pub terrain: TerrainType,
    pub confidence: f64,
    pub source: ClassificationSource,
}

/// A maximal run of points sharing one terrain type. Indices are inclusive
/// and refer to the route's point list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSegment {
    pub start_index: usize,
    pub end_index: usize,
    pub distance_m: f64,
    pub terrain: TerrainType,
    pub average_elevation_m: Option<f64>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSummary {
    pub dominant: TerrainType,
    pub distance_m_by_type: BTreeMap<TerrainType, f64>,
    pub percentage_by_type: BTreeMap<TerrainType, f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainSourceStats {
    pub sampled: usize,
    pub remote: usize,
    pub fallback: usize,
}

use crate::terrain::FeatureTags;
use crate::types::terrain::{ClassificationSource, PointClassification, TerrainType};

/// Matches a tag key against a list of accepted values. An empty list
/// accepts any value.
#[derive(Debug, Clone, Copy)]
pub struct TagRule {
    pub key: &'static str,
    pub values: &'static [&'static str],
    pub terrain: TerrainType,
    pub confidence: f64,
}

const fn rule(
    key: &'static str,
    values: &'static [&'static str],
    terrain: TerrainType,
    confidence: f64,
) -> TagRule {
    TagRule {
        key,
        values,
        terrain,
        confidence,
    }
}

/// Highest priority first. Land cover at the point outranks nearby natural
/// features, which outrank settlement names.
pub const TAG_RULES: &[TagRule] = &[
    rule("landuse", &["forest"], TerrainType::Forest, 0.9),
    rule("natural", &["wood"], TerrainType::Forest, 0.85),
    rule(
        "leisure",
        &["park", "nature_reserve", "garden", "recreation_ground", "golf_course"],
        TerrainType::Park,
        0.85,
    ),
    rule(
        "landuse",
        &["recreation_ground", "village_green", "cemetery"],
        TerrainType::Park,
        0.8,
    ),
    rule(
        "landuse",
        &["industrial", "quarry", "railway", "landfill", "port"],
        TerrainType::Industrial,
        0.85,
    ),
    rule("landuse", &["commercial", "retail"], TerrainType::Urban, 0.85),
    rule("landuse", &["residential"], TerrainType::Suburban, 0.75),
    rule(
        "landuse",
        &[
            "farmland",
            "farmyard",
            "orchard",
            "vineyard",
            "allotments",
            "greenhouse_horticulture",
        ],
        TerrainType::Rural,
        0.8,
    ),
    rule(
        "natural",
        &["grassland", "heath", "scrub", "fell"],
        TerrainType::Grassland,
        0.8,
    ),
    rule("landuse", &["meadow", "grass"], TerrainType::Grassland, 0.75),
    rule("natural", &["wetland", "mud"], TerrainType::Wetland, 0.85),
    rule("natural", &["water"], TerrainType::Water, 0.9),
    rule("water", &[], TerrainType::Water, 0.85),
    rule("landuse", &["reservoir", "basin"], TerrainType::Water, 0.8),
    rule("waterway", &["riverbank", "dock"], TerrainType::Water, 0.8),
    rule(
        "natural",
        &["beach", "coastline", "bay", "shingle", "cape"],
        TerrainType::Coastal,
        0.85,
    ),
    rule(
        "natural",
        &[
            "peak", "ridge", "arete", "cliff", "bare_rock", "scree", "glacier", "saddle",
        ],
        TerrainType::Mountain,
        0.8,
    ),
    rule("natural", &["sand", "dune", "desert"], TerrainType::Desert, 0.75),
    rule("place", &["city", "town", "borough"], TerrainType::Urban, 0.75),
    rule(
        "place",
        &["suburb", "neighbourhood", "quarter"],
        TerrainType::Suburban,
        0.75,
    ),
    rule(
        "place",
        &["village", "hamlet", "isolated_dwelling", "farm", "locality"],
        TerrainType::Rural,
        0.7,
    ),
];

/// Classifies a point from the tags of the features around it. `None` when
/// no rule matches any feature.
pub fn classify_tags(features: &[FeatureTags]) -> Option<PointClassification> {
    TAG_RULES.iter().find_map(|rule| {
        let matched = features.iter().any(|tags| {
            tags.get(rule.key)
                .is_some_and(|value| rule.values.is_empty() || rule.values.contains(&value.as_str()))
        });
        matched.then_some(PointClassification {
            terrain: rule.terrain,
            confidence: rule.confidence,
            source: ClassificationSource::Remote,
        })
    })
}

pub mod fallback_confidence {
    pub const HIGH_MOUNTAIN: f64 = 0.6;
    pub const MOUNTAIN: f64 = 0.45;
    pub const COASTAL: f64 = 0.35;
    pub const RURAL: f64 = 0.3;
    pub const UNKNOWN: f64 = 0.1;
}

/// Rule-of-thumb guess from elevation alone, used when the remote lookup is
/// unavailable or inconclusive.
pub fn elevation_fallback(elevation: Option<f64>) -> PointClassification {
    let Some(elevation) = elevation else {
        return PointClassification {
            terrain: TerrainType::Unknown,
            confidence: fallback_confidence::UNKNOWN,
            source: ClassificationSource::Unclassified,
        };
    };

    let (terrain, confidence) = if elevation > 2000.0 {
        (TerrainType::Mountain, fallback_confidence::HIGH_MOUNTAIN)
    } else if elevation >= 1000.0 {
        (TerrainType::Mountain, fallback_confidence::MOUNTAIN)
    } else if elevation >= 500.0 {
        (TerrainType::Rural, fallback_confidence::RURAL)
    } else if elevation < 50.0 {
        (TerrainType::Coastal, fallback_confidence::COASTAL)
    } else {
        (TerrainType::Rural, fallback_confidence::RURAL)
    };

    PointClassification {
        terrain,
        confidence,
        source: ClassificationSource::ElevationFallback,
    }
}

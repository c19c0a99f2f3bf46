use super::constants::{
    CENTER_EXCLUSION_RADIUS, FEATURE_MIN_SEPARATION, LAKE_COUNT, MAP_HEIGHT, MAP_WIDTH,
    MAX_SPAWN_ATTEMPTS, TREE_COUNT,
};
use super::geometry::distance;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Jail,
    Lake,
    Tree,
}

impl FeatureKind {
    /// Footprint in map units. The client renders scenes of exactly these
    /// sizes, so they are part of the wire contract even though only the
    /// centre travels.
    pub fn size(self) -> (f64, f64) {
        match self {
            FeatureKind::Jail => (200.0, 200.0),
            FeatureKind::Lake => (400.0, 300.0),
            FeatureKind::Tree => (80.0, 120.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MapFeature {
    pub kind: FeatureKind,
    pub x: f64,
    pub y: f64,
}

/// Generates the session-fixed map layout: one jail, then lakes, then
/// trees, each rejection-sampled away from the map centre and from every
/// feature already placed. The same placement order as the client keeps
/// replays comparable.
pub fn generate_layout() -> Vec<MapFeature> {
    let mut features: Vec<MapFeature> = Vec::with_capacity(1 + LAKE_COUNT + TREE_COUNT);

    let jail = place_feature(FeatureKind::Jail, &features);
    features.push(jail);
    for _ in 0..LAKE_COUNT {
        let lake = place_feature(FeatureKind::Lake, &features);
        features.push(lake);
    }
    for _ in 0..TREE_COUNT {
        let tree = place_feature(FeatureKind::Tree, &features);
        features.push(tree);
    }

    features
}

/// The jail is always placed first.
pub fn jail_position(features: &[MapFeature]) -> Option<(f64, f64)> {
    features
        .iter()
        .find(|feature| feature.kind == FeatureKind::Jail)
        .map(|feature| (feature.x, feature.y))
}

fn place_feature(kind: FeatureKind, placed: &[MapFeature]) -> MapFeature {
    let (width, height) = kind.size();
    let margin_x = width / 2.0;
    let margin_y = height / 2.0;
    let center_x = MAP_WIDTH / 2.0;
    let center_y = MAP_HEIGHT / 2.0;
    let mut rng = rand::thread_rng();

    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let x = margin_x + rng.gen::<f64>() * (MAP_WIDTH - 2.0 * margin_x);
        let y = margin_y + rng.gen::<f64>() * (MAP_HEIGHT - 2.0 * margin_y);

        if distance(x, y, center_x, center_y) < CENTER_EXCLUSION_RADIUS + width / 2.0 {
            continue;
        }
        if placed
            .iter()
            .any(|feature| distance(x, y, feature.x, feature.y) < FEATURE_MIN_SEPARATION)
        {
            continue;
        }
        return MapFeature { kind, x, y };
    }

    // Attempt budget exhausted: place unconstrained rather than fail.
    let x = margin_x + rng.gen::<f64>() * (MAP_WIDTH - 2.0 * margin_x);
    let y = margin_y + rng.gen::<f64>() * (MAP_HEIGHT - 2.0 * margin_y);
    MapFeature { kind, x, y }
}

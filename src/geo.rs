//! Property lookups on territorial boundary features.
//!
//! Boundary files come from different sources and spell their property
//! keys differently, so each attribute is resolved through a fallback
//! chain of known spellings.

use geojson::{Feature, FeatureCollection, JsonObject};
use std::collections::HashSet;

use crate::util::{json_code, normalize_key};

const NAME_KEYS: [&str; 6] = ["nome", "Nome", "Municipio", "municipio", "territorio", "name"];
const CODE_KEYS: [&str; 6] = ["codigo", "Codigo", "CODIGO", "CodIbge", "cod_ibge", "id"];
const LEVEL_KEYS: [&str; 4] = ["nivel", "Nivel", "level", "Level"];

/// Display name used when a feature has no name property.
pub const UNNAMED_FEATURE: &str = "Sem nome";

fn first_value(props: Option<&JsonObject>, keys: &[&str]) -> Option<String> {
    let props = props?;
    keys.iter()
        .filter_map(|key| props.get(*key))
        .find_map(json_code)
}

pub fn feature_name(feature: &Feature) -> Option<String> {
    first_value(feature.properties.as_ref(), &NAME_KEYS)
}

pub fn feature_code(feature: &Feature) -> Option<String> {
    first_value(feature.properties.as_ref(), &CODE_KEYS)
}

pub fn feature_level(feature: &Feature) -> Option<String> {
    first_value(feature.properties.as_ref(), &LEVEL_KEYS)
}

/// Normalized names of every named feature.
pub fn name_keys(boundaries: &FeatureCollection) -> HashSet<String> {
    boundaries
        .features
        .iter()
        .filter_map(feature_name)
        .map(|name| normalize_key(&name))
        .collect()
}

/// Features drawable at `level`: those tagged with it plus untagged ones.
/// An empty level keeps everything.
pub fn features_for_level<'a>(boundaries: &'a FeatureCollection, level: &str) -> Vec<&'a Feature> {
    boundaries
        .features
        .iter()
        .filter(|f| {
            level.is_empty()
                || match feature_level(f) {
                    Some(l) => l == level,
                    None => true,
                }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn resolves_through_fallback_keys() {
        let f = feature(json!({ "Municipio": "Cascavel", "CodIbge": 4104808, "level": "Municipio" }));
        assert_eq!(feature_name(&f).as_deref(), Some("Cascavel"));
        assert_eq!(feature_code(&f).as_deref(), Some("4104808"));
        assert_eq!(feature_level(&f).as_deref(), Some("Municipio"));
    }

    #[test]
    fn blank_values_fall_through() {
        let f = feature(json!({ "nome": "", "name": "Toledo" }));
        assert_eq!(feature_name(&f).as_deref(), Some("Toledo"));
        assert_eq!(feature_code(&feature(json!({}))), None);
        let bare = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert_eq!(feature_name(&bare), None);
    }

    #[test]
    fn level_selection_keeps_untagged_features() {
        let fc = FeatureCollection {
            bbox: None,
            features: vec![
                feature(json!({ "nome": "A", "nivel": "Municipio" })),
                feature(json!({ "nome": "B", "nivel": "Mesorregiao" })),
                feature(json!({ "nome": "C" })),
            ],
            foreign_members: None,
        };
        let names: Vec<_> = features_for_level(&fc, "Municipio")
            .into_iter()
            .filter_map(feature_name)
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(features_for_level(&fc, "").len(), 3);
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ShadowError;

/// Per-entity shadow knobs. One canonical engine, parameterized per call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowTuning {
    pub max_alpha: f32,
    pub max_stretch: f32,
    pub min_stretch: f32,
    pub blur_px: f32,
    pub pivot_y_offset: f32,
}

impl Default for ShadowTuning {
    fn default() -> Self {
        Self {
            max_alpha: config::DEFAULT_MAX_ALPHA,
            max_stretch: config::DEFAULT_MAX_STRETCH,
            min_stretch: config::DEFAULT_MIN_STRETCH,
            blur_px: config::DEFAULT_BLUR_PX,
            pivot_y_offset: config::DEFAULT_PIVOT_Y_OFFSET,
        }
    }
}

impl ShadowTuning {
    pub fn with_pivot_offset(mut self, pivot_y_offset: f32) -> Self {
        self.pivot_y_offset = pivot_y_offset;
        self
    }

    /// Clamp knobs into ranges the compositor can draw.
    pub fn sanitized(self) -> Self {
        let max_stretch = self.max_stretch.max(0.0);
        Self {
            max_alpha: self.max_alpha.clamp(0.0, 1.0),
            max_stretch,
            min_stretch: self.min_stretch.clamp(0.0, max_stretch.max(0.0)),
            blur_px: self.blur_px.max(0.0),
            pivot_y_offset: self.pivot_y_offset,
        }
    }
}

/// Entity families that historically carried their own shadow constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowProfile {
    Tree,
    Stone,
    Structure,
    Doodad,
    Player,
}

impl ShadowProfile {
    pub const ALL: [Self; 5] = [
        Self::Tree,
        Self::Stone,
        Self::Structure,
        Self::Doodad,
        Self::Player,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Tree => "Tree",
            Self::Stone => "Stone",
            Self::Structure => "Structure",
            Self::Doodad => "Doodad",
            Self::Player => "Player",
        }
    }

    pub fn default_tuning(self) -> ShadowTuning {
        match self {
            Self::Tree => ShadowTuning {
                max_alpha: 0.45,
                max_stretch: 2.2,
                min_stretch: 0.15,
                blur_px: 3.0,
                pivot_y_offset: 0.0,
            },
            Self::Stone => ShadowTuning {
                max_alpha: 0.5,
                max_stretch: 1.6,
                min_stretch: 0.2,
                blur_px: 2.0,
                pivot_y_offset: 0.0,
            },
            Self::Structure => ShadowTuning {
                max_alpha: 0.4,
                max_stretch: 1.4,
                min_stretch: 0.25,
                blur_px: 2.0,
                pivot_y_offset: 10.0,
            },
            Self::Doodad => ShadowTuning {
                max_alpha: 0.35,
                max_stretch: 1.2,
                min_stretch: 0.1,
                blur_px: 1.0,
                pivot_y_offset: 0.0,
            },
            Self::Player => ShadowTuning {
                max_alpha: 0.4,
                max_stretch: 1.8,
                min_stretch: 0.15,
                blur_px: 2.0,
                pivot_y_offset: 4.0,
            },
        }
    }
}

/// Partial tuning as written in a profiles file. Absent fields keep the
/// profile's built-in value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TuningOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_alpha: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stretch: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stretch: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur_px: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_y_offset: Option<f32>,
}

impl TuningOverride {
    pub fn from_tuning(t: ShadowTuning) -> Self {
        Self {
            max_alpha: Some(t.max_alpha),
            max_stretch: Some(t.max_stretch),
            min_stretch: Some(t.min_stretch),
            blur_px: Some(t.blur_px),
            pivot_y_offset: Some(t.pivot_y_offset),
        }
    }

    pub fn apply(&self, base: ShadowTuning) -> ShadowTuning {
        ShadowTuning {
            max_alpha: self.max_alpha.unwrap_or(base.max_alpha),
            max_stretch: self.max_stretch.unwrap_or(base.max_stretch),
            min_stretch: self.min_stretch.unwrap_or(base.min_stretch),
            blur_px: self.blur_px.unwrap_or(base.blur_px),
            pivot_y_offset: self.pivot_y_offset.unwrap_or(base.pivot_y_offset),
        }
    }
}

/// Tuning table keyed by profile, loadable from JSON.
///
/// Profiles missing from the file, and fields missing from a listed
/// profile, keep their built-in values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadowProfiles {
    #[serde(default)]
    overrides: BTreeMap<ShadowProfile, TuningOverride>,
}

impl ShadowProfiles {
    pub fn get(&self, profile: ShadowProfile) -> ShadowTuning {
        let builtin = profile.default_tuning();
        self.overrides
            .get(&profile)
            .map_or(builtin, |o| o.apply(builtin))
            .sanitized()
    }

    pub fn set(&mut self, profile: ShadowProfile, tuning: ShadowTuning) {
        self.overrides.insert(profile, TuningOverride::from_tuning(tuning));
    }

    pub fn from_json_str(json: &str) -> Result<Self, ShadowError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, ShadowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShadowError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let profiles = Self::from_json_str(&text)?;
        log::info!(
            "loaded {} shadow profile override(s) from {}",
            profiles.overrides.len(),
            path.as_ref().display()
        );
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_profiles_fall_back_to_builtin_values() {
        let profiles = ShadowProfiles::from_json_str(
            r#"{ "overrides": { "stone": { "max_alpha": 0.9, "blur_px": 0.0 } } }"#,
        )
        .unwrap();

        let stone = profiles.get(ShadowProfile::Stone);
        assert_eq!(stone.max_alpha, 0.9);
        assert_eq!(stone.blur_px, 0.0);
        assert_eq!(stone.max_stretch, 1.6);
        assert_eq!(stone.min_stretch, 0.2);

        assert_eq!(
            profiles.get(ShadowProfile::Tree),
            ShadowProfile::Tree.default_tuning()
        );
    }

    #[test]
    fn partial_override_keeps_the_profiles_own_values() {
        let profiles =
            ShadowProfiles::from_json_str(r#"{"overrides":{"structure":{"max_alpha":0.3}}}"#).unwrap();

        let structure = profiles.get(ShadowProfile::Structure);
        assert_eq!(structure.max_alpha, 0.3);
        assert_eq!(structure.max_stretch, 1.4);
        assert_eq!(structure.min_stretch, 0.25);
        assert_eq!(structure.blur_px, 2.0);
        assert_eq!(structure.pivot_y_offset, 10.0);
        assert_ne!(structure.max_stretch, config::DEFAULT_MAX_STRETCH);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = ShadowProfiles::from_json_str("{ overrides: ").unwrap_err();
        assert!(matches!(err, ShadowError::Parse(_)));
    }

    #[test]
    fn sanitized_clamps_out_of_range_knobs() {
        let t = ShadowTuning {
            max_alpha: 3.0,
            max_stretch: 1.0,
            min_stretch: 5.0,
            blur_px: -2.0,
            pivot_y_offset: -7.0,
        }
        .sanitized();
        assert_eq!(t.max_alpha, 1.0);
        assert_eq!(t.min_stretch, 1.0);
        assert_eq!(t.blur_px, 0.0);
        assert_eq!(t.pivot_y_offset, -7.0);
    }

    #[test]
    fn profiles_survive_json_export() {
        let mut profiles = ShadowProfiles::default();
        profiles.set(ShadowProfile::Player, ShadowTuning::default().with_pivot_offset(12.0));
        let json = profiles.to_json_string().unwrap();
        let back = ShadowProfiles::from_json_str(&json).unwrap();
        assert_eq!(back.get(ShadowProfile::Player).pivot_y_offset, 12.0);
    }
}

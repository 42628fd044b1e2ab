//! Time-of-day ground shadows for 2D top-down scenes.
//!
//! A sprite's silhouette is sheared and flattened onto the ground plane
//! around its anchor, with length, lean and opacity driven by the day/night
//! cycle. Shelter interiors are clipped out, hit shakes move the anchor, and
//! a drop-shadow variant covers flat platform sprites.

pub mod canvas;
pub mod clock;
pub mod config;
pub mod error;
pub mod phase;
pub mod shadow;
pub mod shake;
pub mod shelter;
pub mod silhouette;
pub mod sway;
pub mod transform;
pub mod tuning;

pub use canvas::{Canvas, DropShadow, SoftwareCanvas, StateGuard};
pub use clock::DayNightClock;
pub use error::ShadowError;
pub use phase::{phase_transform, PhaseTransform, TimeOfDay};
pub use shadow::{DropShadowOptions, ShadowOutcome, ShadowRenderer, ShadowRequest};
pub use shake::{ShakeParams, ShakeStyle, ShakeTracker};
pub use shelter::Shelter;
pub use silhouette::{SilhouetteCache, SpriteId, SpriteSource};
pub use sway::{SwayField, SwayParams, SwayPose};
pub use tuning::{ShadowProfile, ShadowProfiles, ShadowTuning, TuningOverride};

// All tunable shadow-engine constants in one place.

// Day/night clock
pub const DAY_CYCLE_LENGTH: f32 = 1800.0; // seconds for a full cycle
pub const INITIAL_CYCLE_PROGRESS: f32 = 0.25;

// Phase table
pub const VISIBILITY_EPSILON: f32 = 0.01;

// Silhouettes
pub const SILHOUETTE_CACHE_CAPACITY: usize = 128;
pub const SHADOW_TINT: [u8; 3] = [0, 0, 0];

// Compositor
/// Transparent padding most sprites carry below their feet, as a fraction of height.
pub const SPRITE_FOOT_PADDING: f32 = 0.04;

// Default per-entity tuning
pub const DEFAULT_MAX_ALPHA: f32 = 0.35;
pub const DEFAULT_MAX_STRETCH: f32 = 1.8;
pub const DEFAULT_MIN_STRETCH: f32 = 0.15;
pub const DEFAULT_BLUR_PX: f32 = 2.0;
pub const DEFAULT_PIVOT_Y_OFFSET: f32 = 0.0;

// Drop shadow (platform shadow) defaults
pub const DROP_SHADOW_OFFSET_PX: f32 = 6.0;
pub const DROP_SHADOW_BLUR_PX: f32 = 4.0;

// Shelters (shared with the shelter collision box)
pub const SHELTER_INTERIOR_WIDTH: f32 = 300.0;
pub const SHELTER_INTERIOR_HEIGHT: f32 = 125.0;
pub const SHELTER_INTERIOR_Y_OFFSET: f32 = 200.0;

// Shake
pub const SHAKE_DURATION_MS: f64 = 250.0;
pub const SHAKE_INTENSITY_PX: f32 = 5.0;
pub const SHAKE_GRACE_MS: f64 = 2000.0;
pub const SHAKE_WOBBLE_HZ: f32 = 18.0;

// Sway
pub const SWAY_AMPLITUDE_RAD: f32 = 0.03;
pub const SWAY_FREQUENCY_HZ: f32 = 0.35;
pub const SWAY_GUST_STRENGTH: f32 = 0.5;
pub const WATER_BOB_PX: f32 = 2.5;

// Sandbox
pub const SANDBOX_WIDTH: u16 = 960;
pub const SANDBOX_HEIGHT: u16 = 600;
pub const CAMERA_PAN_SPEED: f32 = 400.0;
pub const CAMERA_SMOOTH_SPEED: f32 = 8.0;
pub const SANDBOX_SEED: u64 = 42;
pub const SANDBOX_WORLD_WIDTH: f32 = 1800.0;
pub const SANDBOX_WORLD_HEIGHT: f32 = 1200.0;
pub const SANDBOX_PROP_COUNT: usize = 48;
pub const PICK_RADIUS: f32 = 30.0;
/// Simulated round trip before the server confirms a click-hit.
pub const HIT_CONFIRM_LATENCY_MS: f64 = 120.0;
pub const PROFILES_PATH: &str = "shadow_profiles.json";

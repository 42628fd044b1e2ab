use noise::{NoiseFn, Perlin};

use crate::config;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwayParams {
    pub amplitude_rad: f32,
    pub frequency_hz: f32,
    /// Fraction of the amplitude contributed by wind gusts.
    pub gust_strength: f32,
}

impl Default for SwayParams {
    fn default() -> Self {
        Self {
            amplitude_rad: config::SWAY_AMPLITUDE_RAD,
            frequency_hz: config::SWAY_FREQUENCY_HZ,
            gust_strength: config::SWAY_GUST_STRENGTH,
        }
    }
}

/// Rotation about the sprite's base plus a horizontal tip offset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwayPose {
    pub rotation: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Shared wind field. Entities sample it with their own seed so neighbours
/// move out of phase.
pub struct SwayField {
    wind: Perlin,
}

impl SwayField {
    pub fn new(seed: u32) -> Self {
        Self {
            wind: Perlin::new(seed),
        }
    }

    fn phase(seed: u32) -> f32 {
        // Spread seeds over a full turn.
        (seed.wrapping_mul(0x9e37_79b9) >> 8) as f32 / (1u32 << 24) as f32 * std::f32::consts::TAU
    }

    fn gust(&self, time_s: f32, seed: u32) -> f32 {
        let g = self.wind.get([time_s as f64 * 0.2, seed as f64 * 0.37]) as f32;
        g.clamp(-1.0, 1.0)
    }

    /// Land sway for trees, grass and similar anchored sprites. `height` is
    /// the sprite's drawn height, used to turn rotation into a tip offset.
    pub fn sway_pose(&self, time_s: f32, seed: u32, height: f32, params: &SwayParams) -> SwayPose {
        let base = (time_s * params.frequency_hz * std::f32::consts::TAU + Self::phase(seed)).sin();
        let gust = self.gust(time_s, seed) * params.gust_strength;
        let rotation = params.amplitude_rad * (base * (1.0 - params.gust_strength) + gust);
        SwayPose {
            rotation,
            offset_x: rotation.sin() * height,
            offset_y: 0.0,
        }
    }

    /// Sway for sprites standing in water: slower, with a vertical bob.
    pub fn water_sway_pose(
        &self,
        time_s: f32,
        seed: u32,
        height: f32,
        params: &SwayParams,
    ) -> SwayPose {
        let slow = SwayParams {
            frequency_hz: params.frequency_hz * 0.6,
            ..*params
        };
        let mut pose = self.sway_pose(time_s, seed, height, &slow);
        let bob = (time_s * slow.frequency_hz * std::f32::consts::TAU * 1.7 + Self::phase(seed ^ 0x5bd1))
            .sin();
        pose.offset_y = bob * config::WATER_BOB_PX;
        pose
    }
}

impl Default for SwayField {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_stays_within_amplitude() {
        let field = SwayField::new(3);
        let params = SwayParams::default();
        for i in 0..500 {
            let pose = field.sway_pose(i as f32 * 0.05, 11, 64.0, &params);
            assert!(pose.rotation.abs() <= params.amplitude_rad + 1e-6);
            assert_eq!(pose.offset_y, 0.0);
        }
    }

    #[test]
    fn different_seeds_are_out_of_phase() {
        let field = SwayField::new(3);
        let params = SwayParams {
            gust_strength: 0.0,
            ..SwayParams::default()
        };
        let a = field.sway_pose(1.0, 1, 64.0, &params);
        let b = field.sway_pose(1.0, 2, 64.0, &params);
        assert_ne!(a.rotation, b.rotation);
    }

    #[test]
    fn water_sway_bobs_vertically() {
        let field = SwayField::new(3);
        let params = SwayParams::default();
        let mut max_bob = 0.0f32;
        for i in 0..200 {
            let pose = field.water_sway_pose(i as f32 * 0.1, 4, 32.0, &params);
            assert!(pose.offset_y.abs() <= config::WATER_BOB_PX + 1e-4);
            max_bob = max_bob.max(pose.offset_y.abs());
        }
        assert!(max_bob > config::WATER_BOB_PX * 0.5);
    }

    #[test]
    fn zero_amplitude_holds_still() {
        let field = SwayField::new(1);
        let params = SwayParams {
            amplitude_rad: 0.0,
            ..SwayParams::default()
        };
        assert_eq!(field.sway_pose(12.3, 9, 80.0, &params).rotation, 0.0);
    }
}

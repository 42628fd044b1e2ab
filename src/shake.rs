use std::collections::HashMap;
use std::hash::Hash;

use macroquad::prelude::Vec2;

use crate::config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShakeStyle {
    /// Smooth circular wobble; the offset rotates with elapsed time.
    Directional,
    /// Fresh random direction every frame.
    Jitter,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShakeParams {
    pub duration_ms: f64,
    pub intensity_px: f32,
    pub style: ShakeStyle,
    /// Let a recent client-predicted shake absorb the server's confirmation.
    pub suppress_restart: bool,
    pub grace_ms: f64,
}

impl Default for ShakeParams {
    fn default() -> Self {
        Self {
            duration_ms: config::SHAKE_DURATION_MS,
            intensity_px: config::SHAKE_INTENSITY_PX,
            style: ShakeStyle::Jitter,
            suppress_restart: false,
            grace_ms: config::SHAKE_GRACE_MS,
        }
    }
}

impl ShakeParams {
    pub fn directional(mut self) -> Self {
        self.style = ShakeStyle::Directional;
        self
    }

    pub fn suppressing_restart(mut self) -> Self {
        self.suppress_restart = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ShakeStart {
    at_ms: f64,
    /// Started by the client ahead of server confirmation.
    predicted: bool,
}

/// Per-entity hit-shake bookkeeping: the last server hit timestamp seen and
/// when the local shake animation started.
#[derive(Debug)]
pub struct ShakeTracker<K> {
    last_server_hit: HashMap<K, f64>,
    shake_start: HashMap<K, ShakeStart>,
}

impl<K> Default for ShakeTracker<K> {
    fn default() -> Self {
        Self {
            last_server_hit: HashMap::new(),
            shake_start: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> ShakeTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities with a shake in progress or a predicted shake awaiting confirmation.
    pub fn tracked(&self) -> usize {
        self.shake_start.len()
    }

    /// Entities whose last server hit is remembered for deduplication.
    pub fn known_hits(&self) -> usize {
        self.last_server_hit.len()
    }

    /// Start a client-predicted shake before the server confirms the hit.
    pub fn start_local_shake(&mut self, id: K, now_ms: f64) {
        self.shake_start.insert(
            id,
            ShakeStart {
                at_ms: now_ms,
                predicted: true,
            },
        );
    }

    pub fn clear(&mut self) {
        self.last_server_hit.clear();
        self.shake_start.clear();
    }

    fn recent_local_shake(&self, id: &K, now_ms: f64, grace_ms: f64) -> bool {
        self.shake_start
            .get(id)
            .is_some_and(|start| start.predicted && now_ms - start.at_ms < grace_ms)
    }

    /// Offset to add to the entity's draw position (and its shadow anchor)
    /// this frame. `on_new_shake` fires when a new server hit starts a shake.
    pub fn calculate_shake_offsets(
        &mut self,
        id: K,
        last_hit_ms: Option<f64>,
        now_ms: f64,
        params: &ShakeParams,
        on_new_shake: impl FnOnce(),
        rng: &mut impl ::rand::Rng,
    ) -> Vec2 {
        match last_hit_ms {
            Some(hit) => {
                if self.last_server_hit.get(&id) != Some(&hit) {
                    self.last_server_hit.insert(id, hit);
                    let absorbed = params.suppress_restart
                        && self.recent_local_shake(&id, now_ms, params.grace_ms);
                    if !absorbed {
                        self.shake_start.insert(
                            id,
                            ShakeStart {
                                at_ms: now_ms,
                                predicted: false,
                            },
                        );
                        on_new_shake();
                    }
                }
            }
            None => {
                if !self.recent_local_shake(&id, now_ms, params.grace_ms) {
                    self.last_server_hit.remove(&id);
                    self.shake_start.remove(&id);
                    return Vec2::ZERO;
                }
            }
        }

        let Some(start) = self.shake_start.get(&id).copied() else {
            return Vec2::ZERO;
        };
        let elapsed = now_ms - start.at_ms;
        // Finished shakes are dropped unless a prediction still waits on its confirmation.
        if elapsed >= params.duration_ms && !self.recent_local_shake(&id, now_ms, params.grace_ms) {
            self.shake_start.remove(&id);
            return Vec2::ZERO;
        }
        shake_offset(elapsed, params, rng)
    }
}

/// Decaying offset `elapsed_ms` into a shake. Magnitude falls linearly from
/// `intensity_px` to zero over the duration.
pub fn shake_offset(elapsed_ms: f64, params: &ShakeParams, rng: &mut impl ::rand::Rng) -> Vec2 {
    if params.duration_ms <= 0.0 || elapsed_ms < 0.0 || elapsed_ms >= params.duration_ms {
        return Vec2::ZERO;
    }
    let decay = (1.0 - elapsed_ms / params.duration_ms) as f32;
    let magnitude = params.intensity_px * decay;
    let angle = match params.style {
        ShakeStyle::Directional => {
            (elapsed_ms as f32 / 1000.0) * config::SHAKE_WOBBLE_HZ * std::f32::consts::TAU
        }
        ShakeStyle::Jitter => rng.gen_range(0.0..std::f32::consts::TAU),
    };
    Vec2::from_angle(angle) * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn offset_starts_at_full_intensity_and_ends_at_zero() {
        let mut r = rng();
        for params in [ShakeParams::default(), ShakeParams::default().directional()] {
            let start = shake_offset(0.0, &params, &mut r);
            assert!((start.length() - params.intensity_px).abs() < 1e-3);
            assert_eq!(shake_offset(params.duration_ms, &params, &mut r), Vec2::ZERO);
            assert_eq!(shake_offset(params.duration_ms + 50.0, &params, &mut r), Vec2::ZERO);
        }
    }

    #[test]
    fn directional_magnitude_never_grows() {
        let params = ShakeParams::default().directional();
        let mut r = rng();
        let mut last = f32::INFINITY;
        let mut t = 0.0;
        while t <= params.duration_ms {
            let m = shake_offset(t, &params, &mut r).length();
            assert!(m <= last + 1e-4, "t = {t}");
            last = m;
            t += 5.0;
        }
    }

    #[test]
    fn directional_is_deterministic_and_jitter_is_not() {
        let directional = ShakeParams::default().directional();
        let mut a = rng();
        let mut b = ChaCha8Rng::seed_from_u64(99);
        assert_eq!(
            shake_offset(40.0, &directional, &mut a),
            shake_offset(40.0, &directional, &mut b)
        );

        let jitter = ShakeParams::default();
        let mut r = rng();
        let first = shake_offset(40.0, &jitter, &mut r);
        let second = shake_offset(40.0, &jitter, &mut r);
        assert_ne!(first, second);
        assert!((first.length() - second.length()).abs() < 1e-4);
    }

    #[test]
    fn new_server_hit_starts_a_shake_once() {
        let mut tracker = ShakeTracker::new();
        let params = ShakeParams::default();
        let mut r = rng();
        let mut started = 0;

        let o = tracker.calculate_shake_offsets(1u64, Some(500.0), 1000.0, &params, || started += 1, &mut r);
        assert!(o.length() > 0.0);
        tracker.calculate_shake_offsets(1u64, Some(500.0), 1050.0, &params, || started += 1, &mut r);
        assert_eq!(started, 1);

        let late = tracker.calculate_shake_offsets(1u64, Some(500.0), 1400.0, &params, || started += 1, &mut r);
        assert_eq!(late, Vec2::ZERO);

        tracker.calculate_shake_offsets(1u64, Some(900.0), 1500.0, &params, || started += 1, &mut r);
        assert_eq!(started, 2);
    }

    #[test]
    fn confirmation_of_a_predicted_shake_does_not_restart_it() {
        let mut tracker = ShakeTracker::new();
        let params = ShakeParams::default().directional().suppressing_restart();
        let mut r = rng();
        let mut started = 0;

        tracker.start_local_shake(3u64, 1000.0);
        let mid = tracker.calculate_shake_offsets(3u64, None, 1100.0, &params, || started += 1, &mut r);
        assert!(mid.length() > 0.0);

        // Server event lands after the local animation already finished.
        let confirmed = tracker.calculate_shake_offsets(3u64, Some(990.0), 1300.0, &params, || started += 1, &mut r);
        assert_eq!(started, 0);
        assert_eq!(confirmed, Vec2::ZERO);
    }

    #[test]
    fn without_suppression_confirmation_restarts() {
        let mut tracker = ShakeTracker::new();
        let params = ShakeParams::default();
        let mut r = rng();
        let mut started = 0;

        tracker.start_local_shake(3u64, 1000.0);
        let o = tracker.calculate_shake_offsets(3u64, Some(990.0), 1300.0, &params, || started += 1, &mut r);
        assert_eq!(started, 1);
        assert!((o.length() - params.intensity_px).abs() < 1e-3);
    }

    #[test]
    fn idle_entities_are_forgotten() {
        let mut tracker = ShakeTracker::new();
        let params = ShakeParams::default();
        let mut r = rng();

        tracker.calculate_shake_offsets(1u64, Some(10.0), 100.0, &params, || {}, &mut r);
        tracker.start_local_shake(2u64, 100.0);
        assert_eq!(tracker.tracked(), 2);

        tracker.calculate_shake_offsets(1u64, None, 200.0, &params, || {}, &mut r);
        assert_eq!(tracker.tracked(), 1);

        // Local shake stays tracked through the grace window, then goes.
        tracker.calculate_shake_offsets(2u64, None, 1500.0, &params, || {}, &mut r);
        assert_eq!(tracker.tracked(), 1);
        tracker.calculate_shake_offsets(2u64, None, 2200.0, &params, || {}, &mut r);
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn finished_shakes_are_dropped_while_the_hit_stays_reported() {
        let mut tracker = ShakeTracker::new();
        let params = ShakeParams::default();
        let mut r = rng();
        let mut started = 0;

        for id in 0..1000u64 {
            tracker.calculate_shake_offsets(id, Some(10.0), 100.0, &params, || started += 1, &mut r);
        }
        assert_eq!(started, 1000);
        assert_eq!(tracker.tracked(), 1000);

        let hour_later = 100.0 + 3_600_000.0;
        for id in 0..1000u64 {
            let o = tracker.calculate_shake_offsets(id, Some(10.0), hour_later, &params, || started += 1, &mut r);
            assert_eq!(o, Vec2::ZERO);
        }
        assert_eq!(tracker.tracked(), 0);
        assert_eq!(started, 1000);
        // The same hit is still recognised and does not shake again.
        assert_eq!(tracker.known_hits(), 1000);
        tracker.calculate_shake_offsets(7u64, Some(10.0), hour_later + 16.0, &params, || started += 1, &mut r);
        assert_eq!(started, 1000);
    }
}

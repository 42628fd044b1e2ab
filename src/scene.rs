use std::collections::HashMap;

use macroquad::math::Affine2;
use macroquad::prelude::{vec2, Color, Image, Rect, Vec2};
use ::rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ground_shadows::canvas::{Canvas, StateGuard};
use ground_shadows::shadow::{DropShadowOptions, ShadowOutcome, ShadowRenderer, ShadowRequest};
use ground_shadows::{
    config, DayNightClock, ShadowProfile, ShadowProfiles, ShakeParams, Shelter,
    SpriteId, SpriteSource, SwayField, SwayParams, SwayPose,
};

use ground_shadows::transform::translate;

use crate::sprites::{self, SpriteKind};

pub struct Prop {
    pub id: u64,
    pub kind: SpriteKind,
    /// Ground contact point.
    pub pos: Vec2,
    pub in_water: bool,
    /// Center and radius of a walking loop.
    pub walk: Option<(Vec2, f32)>,
    /// Server timestamp of the last confirmed hit.
    pub last_hit_ms: Option<f64>,
    confirm_at_ms: Option<f64>,
}

impl Prop {
    pub fn new(id: u64, kind: SpriteKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            in_water: false,
            walk: None,
            last_hit_ms: None,
            confirm_at_ms: None,
        }
    }

    fn visual_center(&self) -> Vec2 {
        self.pos - vec2(0.0, self.kind.draw_size().y * 0.5)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    pub invisible: usize,
    pub skipped: usize,
}

/// Sandbox world: props, shelters and coins under a running day/night clock.
pub struct Scene {
    pub props: Vec<Prop>,
    pub coins: Vec<Vec2>,
    pub shelters: Vec<Shelter>,
    pub clock: DayNightClock,
    pub renderer: ShadowRenderer,
    pub profiles: ShadowProfiles,
    pub sway: SwayField,
    pub sway_params: SwayParams,
    pub shake_params: ShakeParams,
    pub isometric: bool,
    pub elapsed_s: f32,
    pub last_stats: FrameStats,
    sprites: HashMap<SpriteKind, Image>,
    coin: Image,
    rng: ChaCha8Rng,
}

impl Scene {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (w, h) = (config::SANDBOX_WORLD_WIDTH, config::SANDBOX_WORLD_HEIGHT);

        let shelters = vec![
            Shelter::new(vec2(w * 0.3, h * 0.55)),
            Shelter::new(vec2(w * 0.75, h * 0.85)),
        ];

        let mut props = Vec::with_capacity(config::SANDBOX_PROP_COUNT + 2);
        for i in 0..config::SANDBOX_PROP_COUNT {
            let kind = match rng.gen_range(0..10) {
                0..=4 => SpriteKind::Tree,
                5..=7 => SpriteKind::Stone,
                _ => SpriteKind::Crate,
            };
            let pos = vec2(rng.gen_range(40.0..w - 40.0), rng.gen_range(120.0..h - 20.0));
            let mut prop = Prop::new(i as u64 + 1, kind, pos);
            prop.in_water = kind == SpriteKind::Stone && rng.gen_bool(0.3);
            props.push(prop);
        }

        // One player taking cover, one walking a loop in the open.
        let next = props.len() as u64 + 1;
        let cover = shelters[0].interior().center() + vec2(0.0, 30.0);
        props.push(Prop::new(next, SpriteKind::Player, cover));
        let mut walker = Prop::new(next + 1, SpriteKind::Player, vec2(w * 0.5, h * 0.5));
        walker.walk = Some((vec2(w * 0.5, h * 0.5), 140.0));
        props.push(walker);

        let coins = (0..12)
            .map(|_| vec2(rng.gen_range(40.0..w - 40.0), rng.gen_range(40.0..h - 40.0)))
            .collect();

        let sprites = SpriteKind::ALL.iter().map(|&k| (k, k.build())).collect();

        log::info!(
            "sandbox scene: {} props, {} shelters, seed {}",
            props.len(),
            shelters.len(),
            seed
        );

        Self {
            props,
            coins,
            shelters,
            clock: DayNightClock::default(),
            renderer: ShadowRenderer::new(),
            profiles: ShadowProfiles::default(),
            sway: SwayField::new(seed as u32),
            sway_params: SwayParams::default(),
            shake_params: ShakeParams::default().directional().suppressing_restart(),
            isometric: false,
            elapsed_s: 0.0,
            last_stats: FrameStats::default(),
            sprites,
            coin: sprites::coin(),
            rng,
        }
    }

    pub fn update(&mut self, dt: f32, now_ms: f64) {
        self.clock.advance(dt);
        self.elapsed_s += dt;
        let t = self.elapsed_s;

        for prop in &mut self.props {
            if let Some((center, radius)) = prop.walk {
                let a = t * 0.4;
                prop.pos = center + vec2(a.cos(), a.sin()) * radius;
            }
            if let Some(due) = prop.confirm_at_ms {
                if now_ms >= due {
                    prop.last_hit_ms = Some(due - config::HIT_CONFIRM_LATENCY_MS);
                    prop.confirm_at_ms = None;
                }
            }
        }
    }

    /// Hit the prop under `world`: shake it right away and queue the server's
    /// confirmation.
    pub fn hit_at(&mut self, world: Vec2, now_ms: f64) -> Option<u64> {
        let (idx, _) = self
            .props
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let d = p.visual_center().distance(world);
                let reach = config::PICK_RADIUS.max(p.kind.draw_size().x * 0.5);
                (d < reach).then_some((i, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let prop = &mut self.props[idx];
        prop.confirm_at_ms = Some(now_ms + config::HIT_CONFIRM_LATENCY_MS);
        self.renderer.start_local_shake(prop.id, now_ms);
        log::debug!("hit {:?} #{}", prop.kind, prop.id);
        Some(prop.id)
    }

    fn pose(&self, prop: &Prop) -> SwayPose {
        let seed = prop.id as u32;
        let height = prop.kind.draw_size().y;
        if prop.in_water {
            self.sway
                .water_sway_pose(self.elapsed_s, seed, height, &self.sway_params)
        } else if prop.kind == SpriteKind::Tree {
            self.sway.sway_pose(self.elapsed_s, seed, height, &self.sway_params)
        } else {
            SwayPose::default()
        }
    }

    /// Draw one frame. `origin` is the canvas position of the world origin.
    pub fn render<C: Canvas>(&mut self, canvas: &mut C, origin: Vec2, now_ms: f64) -> FrameStats {
        let daylight = self.clock.daylight();
        let progress = self.clock.progress();
        let (cw, ch) = (canvas.width() as f32, canvas.height() as f32);
        canvas.clear(ground_color(daylight));

        let mut g = StateGuard::new(canvas);
        g.set_transform(translate(origin.x, origin.y));

        for shelter in self.shelters.iter().filter(|s| !s.destroyed) {
            g.fill_rect(shelter.interior(), Color::from_rgba(122, 98, 70, 255));
        }
        for prop in self.props.iter().filter(|p| p.in_water) {
            let size = prop.kind.draw_size();
            g.fill_rect(
                Rect::new(prop.pos.x - size.x, prop.pos.y - 10.0, size.x * 2.0, 16.0),
                Color::from_rgba(58, 104, 150, 220),
            );
        }

        self.renderer
            .set_shelter_clipping_data(self.shelters.clone());

        {
            let mut coins = StateGuard::new(&mut *g);
            let options = DropShadowOptions {
                tuning: self.profiles.get(ShadowProfile::Doodad),
                isometric: self.isometric,
                ..DropShadowOptions::new(progress)
            };
            self.renderer.apply_standard_drop_shadow(&mut *coins, &options);
            for c in &self.coins {
                coins.draw_image(&self.coin, Rect::new(c.x - 6.0, c.y - 6.0, 12.0, 12.0));
            }
        }

        let mut order: Vec<usize> = (0..self.props.len()).collect();
        order.sort_by(|&a, &b| self.props[a].pos.y.total_cmp(&self.props[b].pos.y));

        let mut placed = Vec::with_capacity(order.len());
        for &i in &order {
            let pose = self.pose(&self.props[i]);
            let prop = &self.props[i];
            let id = prop.id;
            let shake = self.renderer.shake_offsets(
                id,
                prop.last_hit_ms,
                now_ms,
                &self.shake_params,
                || log::debug!("hit sound for #{id}"),
                &mut self.rng,
            );
            placed.push((i, prop.pos + vec2(0.0, pose.offset_y), shake, pose.rotation));
        }

        let mut stats = FrameStats::default();
        for &(i, anchor, shake, _) in &placed {
            let prop = &self.props[i];
            let Some(image) = self.sprites.get(&prop.kind) else {
                stats.skipped += 1;
                continue;
            };
            let request = ShadowRequest::new(
                SpriteSource::Asset {
                    id: SpriteId(prop.kind as u64),
                    image,
                },
                anchor,
                prop.kind.draw_size(),
                progress,
            )
            .with_tuning(self.profiles.get(prop.kind.profile()))
            .with_shake(shake)
            .isometric(self.isometric);

            match self.renderer.draw_dynamic_ground_shadow(&mut *g, &request) {
                ShadowOutcome::Drawn => stats.drawn += 1,
                ShadowOutcome::Invisible => stats.invisible += 1,
                _ => stats.skipped += 1,
            }
        }

        for &(i, anchor, shake, rotation) in &placed {
            let prop = &self.props[i];
            let Some(image) = self.sprites.get(&prop.kind) else {
                continue;
            };
            let size = prop.kind.draw_size();
            let base = anchor + shake;
            let mut sprite = StateGuard::new(&mut *g);
            sprite.apply_transform(&translate(base.x, base.y));
            if rotation != 0.0 {
                sprite.apply_transform(&Affine2::from_angle(rotation));
            }
            sprite.draw_image(image, Rect::new(-size.x * 0.5, -size.y, size.x, size.y));
        }

        for shelter in self.shelters.iter().filter(|s| !s.destroyed) {
            draw_outline(&mut *g, shelter.interior(), 4.0, Color::from_rgba(70, 52, 36, 255));
        }

        g.set_transform(Affine2::IDENTITY);
        g.fill_rect(
            Rect::new(0.0, 0.0, cw, ch),
            Color::new(0.04, 0.06, 0.16, (1.0 - daylight) * 0.55),
        );

        self.last_stats = stats;
        stats
    }
}

fn ground_color(daylight: f32) -> Color {
    let day = [96.0, 150.0, 82.0];
    let night = [34.0, 52.0, 44.0];
    let mix = |i: usize| (night[i] + (day[i] - night[i]) * daylight) / 255.0;
    Color::new(mix(0), mix(1), mix(2), 1.0)
}

fn draw_outline<C: Canvas + ?Sized>(canvas: &mut C, r: Rect, t: f32, color: Color) {
    canvas.fill_rect(Rect::new(r.x, r.y, r.w, t), color);
    canvas.fill_rect(Rect::new(r.x, r.y + r.h - t, r.w, t), color);
    canvas.fill_rect(Rect::new(r.x, r.y, t, r.h), color);
    canvas.fill_rect(Rect::new(r.x + r.w - t, r.y, t, r.h), color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ground_shadows::SoftwareCanvas;

    fn canvas() -> SoftwareCanvas {
        SoftwareCanvas::new(config::SANDBOX_WIDTH, config::SANDBOX_HEIGHT).unwrap()
    }

    fn origin() -> Vec2 {
        vec2(config::SANDBOX_WIDTH as f32, config::SANDBOX_HEIGHT as f32) * 0.5
            - vec2(config::SANDBOX_WORLD_WIDTH, config::SANDBOX_WORLD_HEIGHT) * 0.5
    }

    #[test]
    fn same_seed_builds_the_same_world() {
        let a = Scene::new(7);
        let b = Scene::new(7);
        assert_eq!(a.props.len(), config::SANDBOX_PROP_COUNT + 2);
        for (pa, pb) in a.props.iter().zip(&b.props) {
            assert_eq!(pa.pos, pb.pos);
            assert_eq!(pa.kind, pb.kind);
        }
    }

    #[test]
    fn every_prop_casts_a_shadow_at_noon() {
        let mut scene = Scene::new(3);
        scene.clock.set_progress(0.45);
        let mut c = canvas();
        let stats = scene.render(&mut c, origin(), 0.0);
        assert_eq!(stats.drawn, scene.props.len());
        assert_eq!(c.depth(), 0);
        // One silhouette per sprite kind in use.
        assert!(scene.renderer.silhouettes().cache().len() <= SpriteKind::ALL.len());
    }

    #[test]
    fn nothing_is_cast_at_midnight_or_when_disabled() {
        let mut scene = Scene::new(3);
        scene.clock.set_progress(0.93);
        let mut c = canvas();
        let stats = scene.render(&mut c, origin(), 0.0);
        assert_eq!(stats.drawn, 0);
        assert_eq!(stats.invisible, scene.props.len());

        scene.clock.set_progress(0.45);
        scene.renderer.set_shadows_enabled(false);
        let stats = scene.render(&mut c, origin(), 0.0);
        assert_eq!(stats.drawn, 0);
        assert_eq!(stats.skipped, scene.props.len());
    }

    #[test]
    fn hits_are_confirmed_after_the_round_trip() {
        let mut scene = Scene::new(5);
        let target = scene.props[0].visual_center();
        let id = scene.hit_at(target, 1000.0).unwrap();
        let prop = scene.props.iter().find(|p| p.id == id).unwrap();
        assert_eq!(prop.last_hit_ms, None);
        assert_eq!(scene.renderer.shakes().tracked(), 1);

        scene.update(0.0, 1000.0 + config::HIT_CONFIRM_LATENCY_MS);
        let prop = scene.props.iter().find(|p| p.id == id).unwrap();
        assert_eq!(prop.last_hit_ms, Some(1000.0));

        assert_eq!(scene.hit_at(vec2(-5000.0, -5000.0), 2000.0), None);
    }
}

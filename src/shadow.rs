use macroquad::prelude::{vec2, Color, Rect, Vec2};

use crate::canvas::{Canvas, DropShadow, StateGuard};
use crate::config;
use crate::phase::{phase_transform, PhaseTransform};
use crate::shake::{ShakeParams, ShakeTracker};
use crate::shelter::{shelter_clip_rects, Shelter};
use crate::silhouette::{SilhouetteStore, SpriteSource};
use crate::transform::{shear, translate};
use crate::tuning::ShadowTuning;

pub type EntityId = u64;

/// Everything needed to cast one entity's ground shadow this frame.
#[derive(Clone, Copy)]
pub struct ShadowRequest<'a> {
    pub sprite: SpriteSource<'a>,
    /// World point where the entity touches the ground.
    pub anchor: Vec2,
    /// On-screen size of the sprite.
    pub draw_size: Vec2,
    pub cycle_progress: f32,
    pub tint: [u8; 3],
    pub tuning: ShadowTuning,
    pub shake_offset: Vec2,
    pub isometric: bool,
}

impl<'a> ShadowRequest<'a> {
    pub fn new(sprite: SpriteSource<'a>, anchor: Vec2, draw_size: Vec2, cycle_progress: f32) -> Self {
        Self {
            sprite,
            anchor,
            draw_size,
            cycle_progress,
            tint: config::SHADOW_TINT,
            tuning: ShadowTuning::default(),
            shake_offset: Vec2::ZERO,
            isometric: false,
        }
    }

    pub fn with_tuning(mut self, tuning: ShadowTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_shake(mut self, offset: Vec2) -> Self {
        self.shake_offset = offset;
        self
    }

    pub fn with_tint(mut self, tint: [u8; 3]) -> Self {
        self.tint = tint;
        self
    }

    pub fn isometric(mut self, isometric: bool) -> Self {
        self.isometric = isometric;
        self
    }

    /// The one point the shadow transform leaves in place.
    pub fn pivot(&self) -> Vec2 {
        vec2(
            self.anchor.x + self.shake_offset.x,
            self.anchor.y + self.shake_offset.y - self.tuning.pivot_y_offset,
        )
    }
}

/// What a draw call did. Draws never fail loudly; this is for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowOutcome {
    Drawn,
    Disabled,
    /// Night, or a shadow too faint or short to see.
    Invisible,
    SpriteNotReady,
    InvalidSize,
    SurfaceUnavailable,
}

/// Options for the platform-shadow variant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropShadowOptions {
    pub cycle_progress: f32,
    pub tuning: ShadowTuning,
    pub tint: [u8; 3],
    pub blur_px: f32,
    /// Offset in pixels per unit of shadow length.
    pub offset_px: f32,
    pub isometric: bool,
}

impl DropShadowOptions {
    pub fn new(cycle_progress: f32) -> Self {
        Self {
            cycle_progress,
            tuning: ShadowTuning::default(),
            tint: config::SHADOW_TINT,
            blur_px: config::DROP_SHADOW_BLUR_PX,
            offset_px: config::DROP_SHADOW_OFFSET_PX,
            isometric: false,
        }
    }
}

/// Horizontal correction so the sprite's padded feet row, not the image's
/// bottom edge, lands on the pivot after shearing.
pub fn padding_compensation(shear_x: f32, scaled_height: f32) -> f32 {
    shear_x * config::SPRITE_FOOT_PADDING * scaled_height
}

/// Owns all shadow state that outlives a single draw: the enable switch, the
/// shelter snapshot, the silhouette cache and the hit-shake maps.
pub struct ShadowRenderer {
    enabled: bool,
    shelters: Vec<Shelter>,
    silhouettes: SilhouetteStore,
    shakes: ShakeTracker<EntityId>,
}

impl Default for ShadowRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowRenderer {
    pub fn new() -> Self {
        Self::with_cache_capacity(config::SILHOUETTE_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            enabled: true,
            shelters: Vec::new(),
            silhouettes: SilhouetteStore::with_capacity(capacity),
            shakes: ShakeTracker::new(),
        }
    }

    pub fn shadows_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_shadows_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!("ground shadows {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    /// Replace the shelter snapshot. Call once per frame before any shadow draws.
    pub fn set_shelter_clipping_data(&mut self, shelters: Vec<Shelter>) {
        self.shelters = shelters;
    }

    pub fn shelters(&self) -> &[Shelter] {
        &self.shelters
    }

    pub fn silhouettes(&self) -> &SilhouetteStore {
        &self.silhouettes
    }

    pub fn shakes(&self) -> &ShakeTracker<EntityId> {
        &self.shakes
    }

    pub fn clear_caches(&mut self) {
        self.silhouettes.clear();
        self.shakes.clear();
    }

    /// Cast `request`'s shadow onto `canvas`. Canvas state is restored on
    /// every path.
    pub fn draw_dynamic_ground_shadow<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        request: &ShadowRequest<'_>,
    ) -> ShadowOutcome {
        if !self.enabled {
            return ShadowOutcome::Disabled;
        }

        let size = request.draw_size;
        if !(size.x > 0.0 && size.y > 0.0 && size.is_finite()) {
            log::debug!("skipping shadow with draw size {:?}", size);
            return ShadowOutcome::InvalidSize;
        }

        let tuning = request.tuning.sanitized();
        let phase = phase_transform(request.cycle_progress, &tuning, request.isometric);
        if !phase.is_visible() {
            return ShadowOutcome::Invisible;
        }

        if !request.sprite.is_ready() {
            log::debug!("shadow sprite not loaded yet; skipping");
            return ShadowOutcome::SpriteNotReady;
        }

        if canvas.width() == 0 || canvas.height() == 0 {
            log::warn!("shadow target surface has no pixels; skipping draw");
            return ShadowOutcome::SurfaceUnavailable;
        }

        let clip_rects = shelter_clip_rects(&self.shelters);
        let silhouette = self.silhouettes.silhouette(request.sprite, request.tint);

        let mut g = StateGuard::new(canvas);
        if !clip_rects.is_empty() {
            g.clip_exclude_rects(&clip_rects);
        }

        let pivot = request.pivot();
        g.apply_transform(&translate(pivot.x, pivot.y));
        g.apply_transform(&shear(phase.shear_x, phase.scale_y));

        let scaled_height = size.y * phase.length_factor;
        g.set_blur(tuning.blur_px);
        g.set_global_alpha(phase.alpha);

        let dest = Rect::new(
            -size.x * 0.5 + padding_compensation(phase.shear_x, scaled_height),
            -scaled_height,
            size.x,
            scaled_height,
        );
        g.draw_image(silhouette, dest);

        ShadowOutcome::Drawn
    }

    /// Phase-driven platform shadow: sets the canvas drop shadow instead of
    /// drawing a silhouette. Clears it when shadows are off or invisible.
    pub fn apply_standard_drop_shadow<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        options: &DropShadowOptions,
    ) -> ShadowOutcome {
        if !self.enabled {
            canvas.set_drop_shadow(None);
            return ShadowOutcome::Disabled;
        }
        let tuning = options.tuning.sanitized();
        let phase = phase_transform(options.cycle_progress, &tuning, options.isometric);
        if !phase.is_visible() {
            canvas.set_drop_shadow(None);
            return ShadowOutcome::Invisible;
        }
        canvas.set_drop_shadow(Some(drop_shadow_for(&phase, options)));
        ShadowOutcome::Drawn
    }

    /// Hit-shake offset for `id`; zero while shadows are disabled.
    pub fn shake_offsets(
        &mut self,
        id: EntityId,
        last_hit_ms: Option<f64>,
        now_ms: f64,
        params: &ShakeParams,
        on_new_shake: impl FnOnce(),
        rng: &mut impl ::rand::Rng,
    ) -> Vec2 {
        if !self.enabled {
            return Vec2::ZERO;
        }
        self.shakes
            .calculate_shake_offsets(id, last_hit_ms, now_ms, params, on_new_shake, rng)
    }

    pub fn start_local_shake(&mut self, id: EntityId, now_ms: f64) {
        self.shakes.start_local_shake(id, now_ms);
    }
}

/// The offset follows the top of the ground shadow: away from the sun and
/// flattened by the same vertical scale.
fn drop_shadow_for(phase: &PhaseTransform, options: &DropShadowOptions) -> DropShadow {
    let reach = phase.length_factor * options.offset_px;
    DropShadow {
        color: Color::new(
            options.tint[0] as f32 / 255.0,
            options.tint[1] as f32 / 255.0,
            options.tint[2] as f32 / 255.0,
            phase.alpha,
        ),
        blur: options.blur_px.max(0.0),
        offset: vec2(-phase.shear_x * reach, -phase.scale_y * reach),
    }
}

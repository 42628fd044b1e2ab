use std::ops::{Deref, DerefMut};

use macroquad::math::Affine2;
use macroquad::prelude::{vec2, Color, Image, Rect, Vec2};

use crate::error::ShadowError;
use crate::transform::checked_inverse;

/// Platform-style shadow cast by everything drawn while it is set.
/// Offset is in device pixels and ignores the current transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropShadow {
    pub color: Color,
    pub blur: f32,
    pub offset: Vec2,
}

/// The 2D surface shadows are drawn onto. Mirrors the subset of an immediate
/// mode canvas the shadow engine relies on: a save/restore state stack, an
/// affine transform, global alpha, a blur filter and clip exclusions.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Reset every pixel; state and transform are untouched.
    fn clear(&mut self, color: Color);

    fn save(&mut self);
    fn restore(&mut self);

    fn transform(&self) -> Affine2;
    fn set_transform(&mut self, transform: Affine2);

    /// Multiply `local` onto the current transform.
    fn apply_transform(&mut self, local: &Affine2) {
        let combined = self.transform() * *local;
        self.set_transform(combined);
    }

    fn global_alpha(&self) -> f32;
    fn set_global_alpha(&mut self, alpha: f32);

    fn blur(&self) -> f32;
    fn set_blur(&mut self, px: f32);

    /// Shrink the clip region by the interior of each rect (in current local space).
    fn clip_exclude_rects(&mut self, rects: &[Rect]);

    fn drop_shadow(&self) -> Option<DropShadow>;
    fn set_drop_shadow(&mut self, shadow: Option<DropShadow>);

    fn draw_image(&mut self, image: &Image, dest: Rect);
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

/// Saves canvas state on creation and restores it when dropped, so early
/// returns cannot leak alpha, filters, clips or transforms.
pub struct StateGuard<'a, C: Canvas + ?Sized> {
    canvas: &'a mut C,
}

impl<'a, C: Canvas + ?Sized> StateGuard<'a, C> {
    pub fn new(canvas: &'a mut C) -> Self {
        canvas.save();
        Self { canvas }
    }
}

impl<C: Canvas + ?Sized> Deref for StateGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.canvas
    }
}

impl<C: Canvas + ?Sized> DerefMut for StateGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.canvas
    }
}

impl<C: Canvas + ?Sized> Drop for StateGuard<'_, C> {
    fn drop(&mut self) {
        self.canvas.restore();
    }
}

#[derive(Clone, Copy, Debug)]
struct ClipExclusion {
    /// Device to local, captured when the clip was set.
    inverse: Affine2,
    rect: Rect,
}

#[derive(Clone, Debug)]
pub struct CanvasState {
    pub transform: Affine2,
    pub alpha: f32,
    pub blur_px: f32,
    pub drop_shadow: Option<DropShadow>,
    exclusions: Vec<ClipExclusion>,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            transform: Affine2::IDENTITY,
            alpha: 1.0,
            blur_px: 0.0,
            drop_shadow: None,
            exclusions: Vec::new(),
        }
    }
}

impl CanvasState {
    pub fn clip_count(&self) -> usize {
        self.exclusions.len()
    }
}

/// Premultiplied RGBA scratch block in device space.
#[derive(Clone, Debug)]
struct Layer {
    x0: i32,
    y0: i32,
    w: usize,
    h: usize,
    px: Vec<[f32; 4]>,
}

impl Layer {
    fn new(x0: i32, y0: i32, w: usize, h: usize) -> Self {
        Self {
            x0,
            y0,
            w,
            h,
            px: vec![[0.0; 4]; w * h],
        }
    }

    fn padded(&self, pad: usize) -> Self {
        let mut out = Layer::new(
            self.x0 - pad as i32,
            self.y0 - pad as i32,
            self.w + pad * 2,
            self.h + pad * 2,
        );
        for y in 0..self.h {
            let src = y * self.w;
            let dst = (y + pad) * out.w + pad;
            out.px[dst..dst + self.w].copy_from_slice(&self.px[src..src + self.w]);
        }
        out
    }

    /// Two separable box passes, a cheap stand-in for a gaussian.
    fn box_blur(&mut self, radius: usize) {
        if radius == 0 || self.px.is_empty() {
            return;
        }
        for _ in 0..2 {
            self.blur_axis(radius, true);
            self.blur_axis(radius, false);
        }
    }

    fn blur_axis(&mut self, radius: usize, horizontal: bool) {
        let (lines, len) = if horizontal { (self.h, self.w) } else { (self.w, self.h) };
        let idx = |line: usize, i: usize, w: usize| {
            if horizontal {
                line * w + i
            } else {
                i * w + line
            }
        };
        let norm = 1.0 / (radius * 2 + 1) as f32;
        let mut line_buf = vec![[0.0f32; 4]; len];

        for line in 0..lines {
            let mut sum = [0.0f32; 4];
            // Prime the window with [0, radius); outside the layer is transparent.
            for i in 0..radius.min(len) {
                let p = self.px[idx(line, i, self.w)];
                for c in 0..4 {
                    sum[c] += p[c];
                }
            }
            for i in 0..len {
                let enter = i + radius;
                if enter < len {
                    let p = self.px[idx(line, enter, self.w)];
                    for c in 0..4 {
                        sum[c] += p[c];
                    }
                }
                for c in 0..4 {
                    line_buf[i][c] = sum[c] * norm;
                }
                if i >= radius {
                    let p = self.px[idx(line, i - radius, self.w)];
                    for c in 0..4 {
                        sum[c] -= p[c];
                    }
                }
            }
            for (i, value) in line_buf.iter().enumerate() {
                let k = idx(line, i, self.w);
                self.px[k] = *value;
            }
        }
    }
}

/// CPU raster canvas over a macroquad `Image` framebuffer (RGBA8, straight alpha).
pub struct SoftwareCanvas {
    frame: Image,
    state: CanvasState,
    stack: Vec<CanvasState>,
}

impl SoftwareCanvas {
    pub fn new(width: u16, height: u16) -> Result<Self, ShadowError> {
        if width == 0 || height == 0 {
            return Err(ShadowError::EmptySurface {
                width: width as u32,
                height: height as u32,
            });
        }
        Ok(Self {
            frame: Image::gen_image_color(width, height, Color::new(0.0, 0.0, 0.0, 0.0)),
            state: CanvasState::default(),
            stack: Vec::new(),
        })
    }

    pub fn from_image(frame: Image) -> Result<Self, ShadowError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(ShadowError::EmptySurface {
                width: frame.width as u32,
                height: frame.height as u32,
            });
        }
        Ok(Self {
            frame,
            state: CanvasState::default(),
            stack: Vec::new(),
        })
    }

    pub fn image(&self) -> &Image {
        &self.frame
    }

    pub fn into_image(self) -> Image {
        self.frame
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// None outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.frame.width as u32 || y >= self.frame.height as u32 {
            return None;
        }
        let i = (y as usize * self.frame.width as usize + x as usize) * 4;
        let b = self.frame.bytes.get(i..i + 4)?;
        Some(Color::new(
            b[0] as f32 / 255.0,
            b[1] as f32 / 255.0,
            b[2] as f32 / 255.0,
            b[3] as f32 / 255.0,
        ))
    }

    /// Count pixels that differ from `reference`.
    pub fn changed_pixels(&self, reference: &Image) -> usize {
        self.frame
            .bytes
            .chunks_exact(4)
            .zip(reference.bytes.chunks_exact(4))
            .filter(|(a, b)| a != b)
            .count()
    }

    fn is_clipped(&self, x: i32, y: i32) -> bool {
        let p = vec2(x as f32 + 0.5, y as f32 + 0.5);
        self.state.exclusions.iter().any(|ex| {
            let local = ex.inverse.transform_point2(p);
            local.x > ex.rect.x
                && local.x < ex.rect.x + ex.rect.w
                && local.y > ex.rect.y
                && local.y < ex.rect.y + ex.rect.h
        })
    }

    /// Rasterize `dest` (local space) through the current transform. `shade`
    /// receives normalized coordinates inside `dest` and returns a
    /// premultiplied color.
    fn rasterize(
        &self,
        dest: Rect,
        margin: usize,
        shade: impl Fn(f32, f32) -> Option<[f32; 4]>,
    ) -> Option<Layer> {
        if !(dest.w > 0.0 && dest.h > 0.0) {
            return None;
        }
        let m = self.state.transform;
        let inv = checked_inverse(&m)?;

        let corners = [
            m.transform_point2(vec2(dest.x, dest.y)),
            m.transform_point2(vec2(dest.x + dest.w, dest.y)),
            m.transform_point2(vec2(dest.x, dest.y + dest.h)),
            m.transform_point2(vec2(dest.x + dest.w, dest.y + dest.h)),
        ];
        let (mut min, mut max) = (corners[0], corners[0]);
        for c in &corners[1..] {
            min = min.min(*c);
            max = max.max(*c);
        }

        let fw = self.frame.width as i32;
        let fh = self.frame.height as i32;
        let x0 = (min.x.floor() as i32 - margin as i32).clamp(0, fw);
        let y0 = (min.y.floor() as i32 - margin as i32).clamp(0, fh);
        let x1 = (max.x.ceil() as i32 + margin as i32).clamp(0, fw);
        let y1 = (max.y.ceil() as i32 + margin as i32).clamp(0, fh);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let mut layer = Layer::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize);
        let alpha = self.state.alpha.clamp(0.0, 1.0);
        for ly in 0..layer.h {
            for lx in 0..layer.w {
                let device = vec2((x0 + lx as i32) as f32 + 0.5, (y0 + ly as i32) as f32 + 0.5);
                let local = inv.transform_point2(device);
                let u = (local.x - dest.x) / dest.w;
                let v = (local.y - dest.y) / dest.h;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                if let Some(c) = shade(u, v) {
                    layer.px[ly * layer.w + lx] = [c[0] * alpha, c[1] * alpha, c[2] * alpha, c[3] * alpha];
                }
            }
        }
        Some(layer)
    }

    fn effect_margin(&self) -> usize {
        let blur = blur_radius(self.state.blur_px) * 2;
        let shadow = self
            .state
            .drop_shadow
            .map(|s| blur_radius(s.blur) * 2 + s.offset.abs().max_element().ceil() as usize)
            .unwrap_or(0);
        blur + shadow
    }

    fn composite_with_effects(&mut self, mut layer: Layer) {
        layer.box_blur(blur_radius(self.state.blur_px));

        if let Some(shadow) = self.state.drop_shadow {
            if shadow.color.a > 0.0 {
                let radius = blur_radius(shadow.blur);
                let mut cast = layer.padded(radius * 2);
                let tint = shadow.color;
                for p in cast.px.iter_mut() {
                    let a = p[3] * tint.a;
                    *p = [tint.r * a, tint.g * a, tint.b * a, a];
                }
                cast.x0 += shadow.offset.x.round() as i32;
                cast.y0 += shadow.offset.y.round() as i32;
                cast.box_blur(radius);
                self.composite(&cast);
            }
        }

        self.composite(&layer);
    }

    fn composite(&mut self, layer: &Layer) {
        let fw = self.frame.width as i32;
        let fh = self.frame.height as i32;
        for ly in 0..layer.h {
            let y = layer.y0 + ly as i32;
            if y < 0 || y >= fh {
                continue;
            }
            for lx in 0..layer.w {
                let x = layer.x0 + lx as i32;
                if x < 0 || x >= fw {
                    continue;
                }
                let src = layer.px[ly * layer.w + lx];
                if src[3] <= 0.0 || self.is_clipped(x, y) {
                    continue;
                }
                let i = (y as usize * fw as usize + x as usize) * 4;
                let dst = &mut self.frame.bytes[i..i + 4];
                blend_source_over(dst, src);
            }
        }
    }
}

impl Canvas for SoftwareCanvas {
    fn width(&self) -> u32 {
        self.frame.width as u32
    }

    fn height(&self) -> u32 {
        self.frame.height as u32
    }

    fn clear(&mut self, color: Color) {
        let rgba = to_rgba8(color);
        for chunk in self.frame.bytes.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        } else {
            log::warn!("canvas restore() without matching save()");
        }
    }

    fn transform(&self) -> Affine2 {
        self.state.transform
    }

    fn set_transform(&mut self, transform: Affine2) {
        self.state.transform = transform;
    }

    fn global_alpha(&self) -> f32 {
        self.state.alpha
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }

    fn blur(&self) -> f32 {
        self.state.blur_px
    }

    fn set_blur(&mut self, px: f32) {
        self.state.blur_px = px.max(0.0);
    }

    fn clip_exclude_rects(&mut self, rects: &[Rect]) {
        let Some(inverse) = checked_inverse(&self.state.transform) else {
            // A collapsed transform maps every rect to zero area.
            return;
        };
        self.state
            .exclusions
            .extend(rects.iter().map(|&rect| ClipExclusion { inverse, rect }));
    }

    fn drop_shadow(&self) -> Option<DropShadow> {
        self.state.drop_shadow
    }

    fn set_drop_shadow(&mut self, shadow: Option<DropShadow>) {
        self.state.drop_shadow = shadow;
    }

    fn draw_image(&mut self, image: &Image, dest: Rect) {
        let iw = image.width as usize;
        let ih = image.height as usize;
        if iw == 0 || ih == 0 {
            return;
        }
        let margin = self.effect_margin();
        let layer = self.rasterize(dest, margin, |u, v| {
            let sx = ((u * iw as f32) as usize).min(iw - 1);
            let sy = ((v * ih as f32) as usize).min(ih - 1);
            let i = (sy * iw + sx) * 4;
            let b = &image.bytes[i..i + 4];
            let a = b[3] as f32 / 255.0;
            if a <= 0.0 {
                return None;
            }
            Some([
                b[0] as f32 / 255.0 * a,
                b[1] as f32 / 255.0 * a,
                b[2] as f32 / 255.0 * a,
                a,
            ])
        });
        if let Some(layer) = layer {
            self.composite_with_effects(layer);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let premul = [color.r * color.a, color.g * color.a, color.b * color.a, color.a];
        let margin = self.effect_margin();
        if let Some(layer) = self.rasterize(rect, margin, |_, _| Some(premul)) {
            self.composite_with_effects(layer);
        }
    }
}

fn blur_radius(px: f32) -> usize {
    if px > 0.0 {
        px.ceil() as usize
    } else {
        0
    }
}

fn blend_source_over(dst: &mut [u8], src: [f32; 4]) {
    let da = dst[3] as f32 / 255.0;
    let sa = src[3].clamp(0.0, 1.0);
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let d = dst[c] as f32 / 255.0 * da;
        let premul = src[c] + d * (1.0 - sa);
        dst[c] = ((premul / out_a).clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

pub fn to_rgba8(color: Color) -> [u8; 4] {
    [
        (color.r.clamp(0.0, 1.0) * 255.0).round() as u8,
        (color.g.clamp(0.0, 1.0) * 255.0).round() as u8,
        (color.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        (color.a.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{shear, translate};
    use macroquad::prelude::{BLACK, WHITE};

    fn canvas() -> SoftwareCanvas {
        SoftwareCanvas::new(64, 64).unwrap()
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(matches!(
            SoftwareCanvas::new(0, 10),
            Err(ShadowError::EmptySurface { width: 0, height: 10 })
        ));
    }

    #[test]
    fn fill_rect_respects_transform() {
        let mut c = canvas();
        c.set_transform(translate(10.0, 20.0));
        c.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), WHITE);
        assert_eq!(c.pixel(11, 21).unwrap().a, 1.0);
        assert_eq!(c.pixel(1, 1).unwrap().a, 0.0);
    }

    #[test]
    fn global_alpha_scales_coverage() {
        let mut c = canvas();
        c.set_global_alpha(0.5);
        c.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), BLACK);
        let a = c.pixel(2, 2).unwrap().a;
        assert!((a - 0.5).abs() < 0.01, "alpha {a}");
    }

    #[test]
    fn exclusion_clip_blocks_interior_only() {
        let mut c = canvas();
        c.clip_exclude_rects(&[Rect::new(10.0, 10.0, 20.0, 20.0)]);
        c.fill_rect(Rect::new(0.0, 0.0, 64.0, 64.0), WHITE);
        assert_eq!(c.pixel(20, 20).unwrap().a, 0.0);
        assert_eq!(c.pixel(5, 5).unwrap().a, 1.0);
        assert_eq!(c.pixel(40, 40).unwrap().a, 1.0);
    }

    #[test]
    fn clip_is_captured_in_the_space_it_was_set() {
        let mut c = canvas();
        c.set_transform(translate(30.0, 0.0));
        c.clip_exclude_rects(&[Rect::new(0.0, 0.0, 10.0, 10.0)]);
        c.set_transform(Affine2::IDENTITY);
        c.fill_rect(Rect::new(0.0, 0.0, 64.0, 64.0), WHITE);
        assert_eq!(c.pixel(35, 5).unwrap().a, 0.0);
        assert_eq!(c.pixel(5, 5).unwrap().a, 1.0);
    }

    #[test]
    fn guard_restores_state_on_drop() {
        let mut c = canvas();
        {
            let mut g = StateGuard::new(&mut c);
            g.set_global_alpha(0.2);
            g.set_blur(3.0);
            g.apply_transform(&shear(1.0, 0.5));
            g.clip_exclude_rects(&[Rect::new(0.0, 0.0, 5.0, 5.0)]);
            assert_eq!(g.depth(), 1);
        }
        assert_eq!(c.depth(), 0);
        assert_eq!(c.global_alpha(), 1.0);
        assert_eq!(c.blur(), 0.0);
        assert_eq!(c.transform(), Affine2::IDENTITY);
        assert_eq!(c.state().clip_count(), 0);
    }

    #[test]
    fn blur_spreads_coverage_outside_the_shape() {
        let mut sharp = canvas();
        sharp.fill_rect(Rect::new(24.0, 24.0, 16.0, 16.0), BLACK);
        assert_eq!(sharp.pixel(22, 32).unwrap().a, 0.0);

        let mut soft = canvas();
        soft.set_blur(3.0);
        soft.fill_rect(Rect::new(24.0, 24.0, 16.0, 16.0), BLACK);
        assert!(soft.pixel(22, 32).unwrap().a > 0.0);
        assert!(soft.pixel(32, 32).unwrap().a > 0.9);
    }

    #[test]
    fn drop_shadow_is_offset_in_device_space() {
        let mut c = canvas();
        c.set_drop_shadow(Some(DropShadow {
            color: Color::new(0.0, 0.0, 0.0, 0.5),
            blur: 0.0,
            offset: vec2(10.0, 0.0),
        }));
        c.fill_rect(Rect::new(10.0, 10.0, 5.0, 5.0), WHITE);
        let shadow = c.pixel(22, 12).unwrap();
        assert!((shadow.a - 0.5).abs() < 0.01);
        assert_eq!(c.pixel(12, 12).unwrap(), WHITE);
    }

    #[test]
    fn draw_image_samples_source_pixels() {
        let mut src = Image::gen_image_color(2, 1, Color::new(0.0, 0.0, 0.0, 0.0));
        src.set_pixel(1, 0, WHITE);
        let mut c = canvas();
        c.draw_image(&src, Rect::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(c.pixel(5, 5).unwrap().a, 0.0);
        assert_eq!(c.pixel(15, 5).unwrap(), WHITE);
    }

    #[test]
    fn pixel_outside_the_frame_is_none() {
        let mut c = canvas();
        c.clear(WHITE);
        assert_eq!(c.pixel(63, 63), Some(WHITE));
        assert_eq!(c.pixel(64, 0), None);
        assert_eq!(c.pixel(0, 64), None);
        assert_eq!(c.pixel(u32::MAX, u32::MAX), None);
    }
}

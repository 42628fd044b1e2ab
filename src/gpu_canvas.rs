use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use macroquad::math::Affine2;
use macroquad::miniquad::{BlendFactor, BlendState, BlendValue, Equation, PipelineParams};
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;

use ground_shadows::canvas::{Canvas, DropShadow};
use ground_shadows::transform::checked_inverse;

/// Exclusion rects the composite shader can test per fragment.
const MAX_CLIPS: usize = 8;
/// Uploaded silhouettes and sprites kept before the cache is dropped.
const TEXTURE_CACHE_LIMIT: usize = 512;

const QUAD_VERT: &str = r#"#version 100
attribute vec3 position;
attribute vec2 texcoord;
attribute vec4 color0;
varying lowp vec2 uv;
varying lowp vec4 color;
uniform mat4 Model;
uniform mat4 Projection;
void main() {
    gl_Position = Projection * Model * vec4(position, 1);
    uv = texcoord;
    color = color0 / 255.0;
}
"#;

const COPY_FRAG: &str = r#"#version 100
precision lowp float;
varying lowp vec2 uv;
varying lowp vec4 color;
uniform sampler2D Texture;
void main() {
    gl_FragColor = texture2D(Texture, uv) * color;
}
"#;

const BLUR_VERT: &str = r#"#version 100
attribute vec3 position;
attribute vec2 texcoord;
varying lowp vec2 uv;
uniform mat4 Model;
uniform mat4 Projection;
void main() {
    gl_Position = Projection * Model * vec4(position, 1);
    uv = texcoord;
}
"#;

const BLUR_H_FRAG: &str = r#"#version 100
precision lowp float;
varying lowp vec2 uv;
uniform sampler2D Texture;
uniform vec2 texel_size;
void main() {
    vec4 sum = vec4(0.0);
    sum += texture2D(Texture, uv + vec2(-3.0 * texel_size.x, 0.0)) * 0.06;
    sum += texture2D(Texture, uv + vec2(-2.0 * texel_size.x, 0.0)) * 0.12;
    sum += texture2D(Texture, uv + vec2(-1.0 * texel_size.x, 0.0)) * 0.18;
    sum += texture2D(Texture, uv) * 0.28;
    sum += texture2D(Texture, uv + vec2( 1.0 * texel_size.x, 0.0)) * 0.18;
    sum += texture2D(Texture, uv + vec2( 2.0 * texel_size.x, 0.0)) * 0.12;
    sum += texture2D(Texture, uv + vec2( 3.0 * texel_size.x, 0.0)) * 0.06;
    gl_FragColor = sum;
}
"#;

const BLUR_V_FRAG: &str = r#"#version 100
precision lowp float;
varying lowp vec2 uv;
uniform sampler2D Texture;
uniform vec2 texel_size;
void main() {
    vec4 sum = vec4(0.0);
    sum += texture2D(Texture, uv + vec2(0.0, -3.0 * texel_size.y)) * 0.06;
    sum += texture2D(Texture, uv + vec2(0.0, -2.0 * texel_size.y)) * 0.12;
    sum += texture2D(Texture, uv + vec2(0.0, -1.0 * texel_size.y)) * 0.18;
    sum += texture2D(Texture, uv) * 0.28;
    sum += texture2D(Texture, uv + vec2(0.0,  1.0 * texel_size.y)) * 0.18;
    sum += texture2D(Texture, uv + vec2(0.0,  2.0 * texel_size.y)) * 0.12;
    sum += texture2D(Texture, uv + vec2(0.0,  3.0 * texel_size.y)) * 0.06;
    gl_FragColor = sum;
}
"#;

const COMPOSITE_VERT: &str = r#"#version 100
attribute vec3 position;
attribute vec2 texcoord;
varying lowp vec2 uv;
varying highp vec2 device;
uniform mat4 Model;
uniform mat4 Projection;
void main() {
    gl_Position = Projection * Model * vec4(position, 1);
    uv = texcoord;
    device = position.xy;
}
"#;

const COMPOSITE_FRAG: &str = r#"#version 100
precision highp float;
varying lowp vec2 uv;
varying highp vec2 device;
uniform sampler2D Texture;
uniform vec4 tint;
uniform float use_tint;
uniform float clip_count;
uniform mat4 clip0;
uniform mat4 clip1;
uniform mat4 clip2;
uniform mat4 clip3;
uniform mat4 clip4;
uniform mat4 clip5;
uniform mat4 clip6;
uniform mat4 clip7;

bool excluded(mat4 c, vec2 p) {
    vec2 local = vec2(
        c[0][0] * p.x + c[1][0] * p.y + c[2][0],
        c[0][1] * p.x + c[1][1] * p.y + c[2][1]);
    vec4 r = c[3];
    return local.x > r.x && local.x < r.x + r.z && local.y > r.y && local.y < r.y + r.w;
}

void main() {
    if (clip_count > 0.5 && excluded(clip0, device)) discard;
    if (clip_count > 1.5 && excluded(clip1, device)) discard;
    if (clip_count > 2.5 && excluded(clip2, device)) discard;
    if (clip_count > 3.5 && excluded(clip3, device)) discard;
    if (clip_count > 4.5 && excluded(clip4, device)) discard;
    if (clip_count > 5.5 && excluded(clip5, device)) discard;
    if (clip_count > 6.5 && excluded(clip6, device)) discard;
    if (clip_count > 7.5 && excluded(clip7, device)) discard;

    vec4 src = texture2D(Texture, uv);
    if (use_tint > 0.5) {
        gl_FragColor = vec4(tint.rgb, src.a * tint.a);
    } else {
        gl_FragColor = src;
    }
}
"#;

#[derive(Clone, Copy, Debug)]
struct ClipExclusion {
    inverse: Affine2,
    rect: Rect,
}

#[derive(Clone, Debug)]
struct GpuState {
    transform: Affine2,
    alpha: f32,
    blur_px: f32,
    drop_shadow: Option<DropShadow>,
    exclusions: Vec<ClipExclusion>,
}

impl Default for GpuState {
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

/// Canvas backed by macroquad render targets. Affine transforms are applied
/// to quad vertices; blur, drop shadows and clip exclusions go through an
/// offscreen layer and shader passes.
pub struct GpuCanvas {
    frame: RenderTarget,
    layer: RenderTarget,
    scratch_h: RenderTarget,
    scratch_v: RenderTarget,
    copy_material: Material,
    blur_h_material: Material,
    blur_v_material: Material,
    composite_material: Material,
    textures: HashMap<u64, Texture2D>,
    state: GpuState,
    stack: Vec<GpuState>,
    width: u32,
    height: u32,
    clip_overflow_logged: bool,
}

fn target(width: u32, height: u32) -> RenderTarget {
    let rt = render_target(width, height);
    rt.texture.set_filter(FilterMode::Linear);
    rt
}

fn target_camera(rt: &RenderTarget, width: u32, height: u32) -> Camera2D {
    Camera2D {
        render_target: Some(rt.clone()),
        ..Camera2D::from_display_rect(Rect::new(0.0, 0.0, width as f32, height as f32))
    }
}

fn source_over() -> PipelineParams {
    PipelineParams {
        color_blend: Some(BlendState::new(
            Equation::Add,
            BlendFactor::Value(BlendValue::SourceAlpha),
            BlendFactor::OneMinusValue(BlendValue::SourceAlpha),
        )),
        alpha_blend: Some(BlendState::new(
            Equation::Add,
            BlendFactor::One,
            BlendFactor::OneMinusValue(BlendValue::SourceAlpha),
        )),
        ..Default::default()
    }
}

impl GpuCanvas {
    /// None when a shader fails to compile.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let copy_material = load_material(
            ShaderSource::Glsl {
                vertex: QUAD_VERT,
                fragment: COPY_FRAG,
            },
            MaterialParams::default(),
        )
        .ok()?;

        let blur_h_material = load_material(
            ShaderSource::Glsl {
                vertex: BLUR_VERT,
                fragment: BLUR_H_FRAG,
            },
            MaterialParams {
                uniforms: vec![UniformDesc::new("texel_size", UniformType::Float2)],
                ..Default::default()
            },
        )
        .ok()?;

        let blur_v_material = load_material(
            ShaderSource::Glsl {
                vertex: BLUR_VERT,
                fragment: BLUR_V_FRAG,
            },
            MaterialParams {
                uniforms: vec![UniformDesc::new("texel_size", UniformType::Float2)],
                ..Default::default()
            },
        )
        .ok()?;

        let mut uniforms = vec![
            UniformDesc::new("tint", UniformType::Float4),
            UniformDesc::new("use_tint", UniformType::Float1),
            UniformDesc::new("clip_count", UniformType::Float1),
        ];
        for i in 0..MAX_CLIPS {
            uniforms.push(UniformDesc::new(&format!("clip{i}"), UniformType::Mat4));
        }
        let composite_material = load_material(
            ShaderSource::Glsl {
                vertex: COMPOSITE_VERT,
                fragment: COMPOSITE_FRAG,
            },
            MaterialParams {
                uniforms,
                pipeline_params: source_over(),
                ..Default::default()
            },
        )
        .ok()?;

        log::info!("gpu canvas {width}x{height} ready");
        Some(Self {
            frame: target(width, height),
            layer: target(width, height),
            scratch_h: target(width, height),
            scratch_v: target(width, height),
            copy_material,
            blur_h_material,
            blur_v_material,
            composite_material,
            textures: HashMap::new(),
            state: GpuState::default(),
            stack: Vec::new(),
            width,
            height,
            clip_overflow_logged: false,
        })
    }

    /// Draw the finished frame to the screen, stretched to `dest_size`.
    pub fn present(&self, dest_size: Vec2) {
        set_default_camera();
        draw_texture_ex(
            &self.frame.texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(dest_size),
                ..Default::default()
            },
        );
    }

    fn use_target(&self, rt: &RenderTarget) {
        set_camera(&target_camera(rt, self.width, self.height));
    }

    fn texture_for(&mut self, image: &Image) -> Texture2D {
        let key = texture_key(image);
        if let Some(texture) = self.textures.get(&key) {
            return texture.clone();
        }
        if self.textures.len() >= TEXTURE_CACHE_LIMIT {
            log::debug!("dropping {} cached canvas textures", self.textures.len());
            self.textures.clear();
        }
        let texture = Texture2D::from_image(image);
        texture.set_filter(FilterMode::Linear);
        self.textures.insert(key, texture.clone());
        texture
    }

    fn needs_layer(&self) -> bool {
        self.state.blur_px > 0.0
            || !self.state.exclusions.is_empty()
            || self.state.drop_shadow.is_some_and(|s| s.color.a > 0.0)
    }

    fn draw_quad(&mut self, dest: Rect, texture: Option<Texture2D>, color: Color) {
        if !(dest.w > 0.0 && dest.h > 0.0) || checked_inverse(&self.state.transform).is_none() {
            return;
        }
        let mesh = quad_mesh(&self.state.transform, dest, texture, color);

        if !self.needs_layer() {
            self.use_target(&self.frame);
            draw_mesh(&mesh);
            return;
        }

        self.use_target(&self.layer);
        clear_background(Color::new(0.0, 0.0, 0.0, 0.0));
        gl_use_material(&self.copy_material);
        draw_mesh(&mesh);
        gl_use_default_material();

        if self.state.blur_px > 0.0 {
            self.blur_into_scratch(&self.layer.texture, self.state.blur_px);
            self.copy_scratch_to_layer();
        }

        self.set_clip_uniforms();

        if let Some(shadow) = self.state.drop_shadow.filter(|s| s.color.a > 0.0) {
            let source = if shadow.blur > 0.0 {
                self.blur_into_scratch(&self.layer.texture, shadow.blur);
                self.scratch_v.texture.clone()
            } else {
                self.layer.texture.clone()
            };
            let c = shadow.color;
            self.composite_material
                .set_uniform("tint", vec4(c.r, c.g, c.b, c.a));
            self.composite_material.set_uniform("use_tint", 1.0f32);
            self.composite(&source, shadow.offset);
        }

        self.composite_material.set_uniform("use_tint", 0.0f32);
        let layer = self.layer.texture.clone();
        self.composite(&layer, Vec2::ZERO);
    }

    /// Two 7-tap passes: `source` into `scratch_h`, then into `scratch_v`.
    fn blur_into_scratch(&self, source: &Texture2D, blur_px: f32) {
        let step = blur_texel_size(blur_px, self.width, self.height);
        let size = vec2(self.width as f32, self.height as f32);

        self.use_target(&self.scratch_h);
        clear_background(Color::new(0.0, 0.0, 0.0, 0.0));
        self.blur_h_material.set_uniform("texel_size", step);
        gl_use_material(&self.blur_h_material);
        draw_texture_ex(
            source,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(size),
                ..Default::default()
            },
        );
        gl_use_default_material();

        self.use_target(&self.scratch_v);
        clear_background(Color::new(0.0, 0.0, 0.0, 0.0));
        self.blur_v_material.set_uniform("texel_size", step);
        gl_use_material(&self.blur_v_material);
        draw_texture_ex(
            &self.scratch_h.texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(size),
                ..Default::default()
            },
        );
        gl_use_default_material();
    }

    fn copy_scratch_to_layer(&self) {
        self.use_target(&self.layer);
        clear_background(Color::new(0.0, 0.0, 0.0, 0.0));
        gl_use_material(&self.copy_material);
        draw_texture_ex(
            &self.scratch_v.texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(self.width as f32, self.height as f32)),
                ..Default::default()
            },
        );
        gl_use_default_material();
    }

    fn set_clip_uniforms(&mut self) {
        let clips = &self.state.exclusions;
        if clips.len() > MAX_CLIPS && !self.clip_overflow_logged {
            log::warn!(
                "{} clip exclusions set, only the first {MAX_CLIPS} are applied",
                clips.len()
            );
            self.clip_overflow_logged = true;
        }
        let count = clips.len().min(MAX_CLIPS);
        self.composite_material
            .set_uniform("clip_count", count as f32);
        for (i, clip) in clips.iter().take(MAX_CLIPS).enumerate() {
            self.composite_material
                .set_uniform(&format!("clip{i}"), clip_uniform(&clip.inverse, clip.rect));
        }
    }

    fn composite(&self, texture: &Texture2D, offset: Vec2) {
        self.use_target(&self.frame);
        gl_use_material(&self.composite_material);
        draw_texture_ex(
            texture,
            offset.x,
            offset.y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(self.width as f32, self.height as f32)),
                ..Default::default()
            },
        );
        gl_use_default_material();
    }
}

impl Canvas for GpuCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, color: Color) {
        self.use_target(&self.frame);
        clear_background(color);
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
        if image.width == 0 || image.height == 0 {
            return;
        }
        let texture = self.texture_for(image);
        let tint = Color::new(1.0, 1.0, 1.0, self.state.alpha);
        self.draw_quad(dest, Some(texture), tint);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let color = Color::new(color.r, color.g, color.b, color.a * self.state.alpha);
        self.draw_quad(rect, None, color);
    }
}

/// `dest` corners through `m`, in the order top-left, top-right,
/// bottom-right, bottom-left.
fn quad_corners(m: &Affine2, dest: Rect) -> [Vec2; 4] {
    [
        m.transform_point2(vec2(dest.x, dest.y)),
        m.transform_point2(vec2(dest.x + dest.w, dest.y)),
        m.transform_point2(vec2(dest.x + dest.w, dest.y + dest.h)),
        m.transform_point2(vec2(dest.x, dest.y + dest.h)),
    ]
}

fn quad_mesh(m: &Affine2, dest: Rect, texture: Option<Texture2D>, color: Color) -> Mesh {
    let uvs = [vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(1.0, 1.0), vec2(0.0, 1.0)];
    let vertices = quad_corners(m, dest)
        .iter()
        .zip(uvs)
        .map(|(p, uv)| Vertex::new(p.x, p.y, 0.0, uv.x, uv.y, color))
        .collect();
    Mesh {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
        texture,
    }
}

/// Columns `(a, b)`, `(c, d)`, `(e, f)` of the device-to-local matrix, then
/// the rect as `(x, y, w, h)`.
fn clip_uniform(inverse: &Affine2, rect: Rect) -> Mat4 {
    let m = inverse.matrix2;
    let t = inverse.translation;
    Mat4::from_cols(
        vec4(m.x_axis.x, m.x_axis.y, 0.0, 0.0),
        vec4(m.y_axis.x, m.y_axis.y, 0.0, 0.0),
        vec4(t.x, t.y, 0.0, 0.0),
        vec4(rect.x, rect.y, rect.w, rect.h),
    )
}

/// The 7-tap kernel reaches three texels; stretch the step so it reaches `blur_px`.
fn blur_texel_size(blur_px: f32, width: u32, height: u32) -> Vec2 {
    let spread = blur_px.max(0.0) / 3.0;
    vec2(spread / width.max(1) as f32, spread / height.max(1) as f32)
}

fn texture_key(image: &Image) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.width.hash(&mut hasher);
    image.height.hash(&mut hasher);
    image.bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ground_shadows::transform::{shear, translate};

    /// Same test the composite shader runs for one exclusion.
    fn excluded(clip: &Mat4, p: Vec2) -> bool {
        let c = clip.to_cols_array_2d();
        let local = vec2(
            c[0][0] * p.x + c[1][0] * p.y + c[2][0],
            c[0][1] * p.x + c[1][1] * p.y + c[2][1],
        );
        let r = c[3];
        local.x > r[0] && local.x < r[0] + r[2] && local.y > r[1] && local.y < r[1] + r[3]
    }

    #[test]
    fn quad_corners_follow_the_shadow_matrix() {
        let m = translate(100.0, 150.0) * shear(-0.95, 0.375);
        let corners = quad_corners(&m, Rect::new(-25.0, -50.0, 50.0, 50.0));
        assert!((corners[0] - vec2(122.5, 131.25)).length() < 1e-4);
        assert!((corners[2] - vec2(125.0, 150.0)).length() < 1e-4);
        assert!((corners[3] - vec2(75.0, 150.0)).length() < 1e-4);
    }

    #[test]
    fn clip_uniform_matches_the_software_clip_test() {
        let m = translate(30.0, 10.0) * shear(0.5, 0.5);
        let inverse = checked_inverse(&m).unwrap();
        let rect = Rect::new(0.0, -20.0, 10.0, 20.0);
        let clip = clip_uniform(&inverse, rect);

        for p in [vec2(33.0, 5.0), vec2(31.0, 1.0), vec2(60.0, 5.0), vec2(35.0, 12.0)] {
            let local = inverse.transform_point2(p);
            let expected = local.x > rect.x
                && local.x < rect.x + rect.w
                && local.y > rect.y
                && local.y < rect.y + rect.h;
            assert_eq!(excluded(&clip, p), expected, "at {p}");
        }
        assert!(excluded(&clip, vec2(33.0, 5.0)));
        assert!(!excluded(&clip, vec2(60.0, 5.0)));
    }

    #[test]
    fn blur_step_reaches_the_requested_radius() {
        let step = blur_texel_size(6.0, 960, 600);
        assert!((step.x * 3.0 * 960.0 - 6.0).abs() < 1e-4);
        assert!((step.y * 3.0 * 600.0 - 6.0).abs() < 1e-4);
        assert_eq!(blur_texel_size(-1.0, 960, 600), Vec2::ZERO);
    }

    #[test]
    fn identical_images_share_a_texture_key() {
        let a = Image::gen_image_color(4, 4, BLACK);
        let b = Image::gen_image_color(4, 4, BLACK);
        let c = Image::gen_image_color(4, 4, WHITE);
        let tall = Image::gen_image_color(2, 8, BLACK);
        assert_eq!(texture_key(&a), texture_key(&b));
        assert_ne!(texture_key(&a), texture_key(&c));
        assert_ne!(texture_key(&a), texture_key(&tall));
    }
}

use macroquad::prelude::{vec2, Color, Image, Vec2};

use ground_shadows::config;
use ground_shadows::ShadowProfile;

/// Procedural stand-ins for loaded sprite assets. Every sprite keeps the
/// usual transparent strip below its feet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKind {
    Tree,
    Stone,
    Player,
    Crate,
}

impl SpriteKind {
    pub const ALL: [Self; 4] = [Self::Tree, Self::Stone, Self::Player, Self::Crate];

    pub fn profile(self) -> ShadowProfile {
        match self {
            Self::Tree => ShadowProfile::Tree,
            Self::Stone => ShadowProfile::Stone,
            Self::Player => ShadowProfile::Player,
            Self::Crate => ShadowProfile::Structure,
        }
    }

    pub fn draw_size(self) -> Vec2 {
        match self {
            Self::Tree => vec2(72.0, 110.0),
            Self::Stone => vec2(40.0, 30.0),
            Self::Player => vec2(28.0, 48.0),
            Self::Crate => vec2(36.0, 36.0),
        }
    }

    pub fn build(self) -> Image {
        match self {
            Self::Tree => tree(48, 72),
            Self::Stone => stone(32, 24),
            Self::Player => player(20, 34),
            Self::Crate => crate_box(24, 24),
        }
    }
}

/// Flat ground item, shadowed with the drop-shadow variant.
pub fn coin() -> Image {
    let mut img = blank(12, 12);
    fill_ellipse(&mut img, 6.0, 6.0, 5.0, 5.0, Color::from_rgba(232, 190, 60, 255));
    fill_ellipse(&mut img, 5.0, 5.0, 2.0, 2.0, Color::from_rgba(255, 236, 150, 255));
    img
}

fn blank(w: u16, h: u16) -> Image {
    Image::gen_image_color(w, h, Color::new(0.0, 0.0, 0.0, 0.0))
}

/// First row of the transparent foot strip.
fn feet_limit(h: u16) -> u32 {
    ((h as f32) * (1.0 - config::SPRITE_FOOT_PADDING)).floor() as u32
}

fn fill_ellipse(img: &mut Image, cx: f32, cy: f32, rx: f32, ry: f32, color: Color) {
    let limit = feet_limit(img.height);
    for y in 0..limit.min(img.height as u32) {
        for x in 0..img.width as u32 {
            let dx = (x as f32 + 0.5 - cx) / rx;
            let dy = (y as f32 + 0.5 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                img.set_pixel(x, y, color);
            }
        }
    }
}

fn fill_box(img: &mut Image, x0: u32, y0: u32, x1: u32, y1: u32, color: Color) {
    let limit = feet_limit(img.height);
    for y in y0..y1.min(limit) {
        for x in x0..x1.min(img.width as u32) {
            img.set_pixel(x, y, color);
        }
    }
}

fn tree(w: u16, h: u16) -> Image {
    let mut img = blank(w, h);
    let (wf, hf) = (w as f32, h as f32);
    let trunk_w = (w / 6) as u32;
    let mid = (w / 2) as u32;
    fill_box(
        &mut img,
        mid - trunk_w / 2,
        (hf * 0.5) as u32,
        mid + trunk_w / 2 + 1,
        h as u32,
        Color::from_rgba(110, 74, 44, 255),
    );
    fill_ellipse(&mut img, wf * 0.5, hf * 0.33, wf * 0.48, hf * 0.32, Color::from_rgba(46, 120, 58, 255));
    fill_ellipse(&mut img, wf * 0.4, hf * 0.26, wf * 0.2, hf * 0.12, Color::from_rgba(76, 156, 82, 255));
    img
}

fn stone(w: u16, h: u16) -> Image {
    let mut img = blank(w, h);
    let (wf, hf) = (w as f32, h as f32);
    fill_ellipse(&mut img, wf * 0.5, hf * 0.55, wf * 0.48, hf * 0.42, Color::from_rgba(128, 128, 136, 255));
    fill_ellipse(&mut img, wf * 0.4, hf * 0.42, wf * 0.18, hf * 0.14, Color::from_rgba(170, 170, 178, 255));
    img
}

fn player(w: u16, h: u16) -> Image {
    let mut img = blank(w, h);
    let (wf, hf) = (w as f32, h as f32);
    fill_box(
        &mut img,
        (wf * 0.25) as u32,
        (hf * 0.35) as u32,
        (wf * 0.75) as u32,
        h as u32,
        Color::from_rgba(60, 90, 170, 255),
    );
    fill_ellipse(&mut img, wf * 0.5, hf * 0.2, wf * 0.3, hf * 0.17, Color::from_rgba(236, 196, 160, 255));
    img
}

fn crate_box(w: u16, h: u16) -> Image {
    let mut img = blank(w, h);
    fill_box(&mut img, 1, 1, w as u32 - 1, h as u32, Color::from_rgba(150, 104, 58, 255));
    fill_box(&mut img, 3, 3, w as u32 - 3, (h - 3) as u32, Color::from_rgba(184, 134, 80, 255));
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprites_keep_transparent_feet_padding() {
        for kind in SpriteKind::ALL {
            let img = kind.build();
            let limit = feet_limit(img.height);
            assert!(limit < img.height as u32, "{kind:?} has no padding row");
            for y in limit..img.height as u32 {
                for x in 0..img.width as u32 {
                    assert_eq!(img.get_pixel(x, y).a, 0.0, "{kind:?} at ({x}, {y})");
                }
            }
            let opaque = img.bytes.chunks_exact(4).filter(|p| p[3] == 255).count();
            assert!(opaque > 0, "{kind:?} is empty");
        }
    }

    #[test]
    fn coin_is_round() {
        let img = coin();
        assert_eq!(img.get_pixel(6, 6).a, 1.0);
        assert_eq!(img.get_pixel(0, 0).a, 0.0);
    }
}

use macroquad::prelude::{Rect, Vec2};

use crate::config;

/// A placed shelter. Light never reaches its interior, so no shadow may be
/// painted there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shelter {
    pub pos: Vec2,
    pub destroyed: bool,
}

impl Shelter {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            destroyed: false,
        }
    }

    /// Interior box, identical to the shelter's collision AABB.
    pub fn interior(&self) -> Rect {
        let center_y = self.pos.y - config::SHELTER_INTERIOR_Y_OFFSET;
        Rect::new(
            self.pos.x - config::SHELTER_INTERIOR_WIDTH * 0.5,
            center_y - config::SHELTER_INTERIOR_HEIGHT * 0.5,
            config::SHELTER_INTERIOR_WIDTH,
            config::SHELTER_INTERIOR_HEIGHT,
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let r = self.interior();
        point.x > r.x && point.x < r.x + r.w && point.y > r.y && point.y < r.y + r.h
    }
}

/// Interiors of the shelters still standing.
pub fn shelter_clip_rects(shelters: &[Shelter]) -> Vec<Rect> {
    shelters
        .iter()
        .filter(|s| !s.destroyed)
        .map(Shelter::interior)
        .collect()
}

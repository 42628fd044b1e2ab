use macroquad::prelude::*;

use ground_shadows::config;

/// Pans over the sandbox world. The software canvas is a fixed-size window
/// centered on `smooth_target`, stretched over the screen when blitted.
pub struct CameraController {
    pub target: Vec2,
    pub smooth_target: Vec2,
    is_dragging: bool,
    drag_start: Vec2,
    drag_cam_start: Vec2,
}

impl CameraController {
    pub fn new(initial_target: Vec2) -> Self {
        Self {
            target: initial_target,
            smooth_target: initial_target,
            is_dragging: false,
            drag_start: Vec2::ZERO,
            drag_cam_start: Vec2::ZERO,
        }
    }

    pub fn update(&mut self, dt: f32, pointer_free: bool) {
        let pan_speed = config::CAMERA_PAN_SPEED;
        if is_key_down(KeyCode::W) || is_key_down(KeyCode::Up) {
            self.target.y -= pan_speed * dt;
        }
        if is_key_down(KeyCode::S) || is_key_down(KeyCode::Down) {
            self.target.y += pan_speed * dt;
        }
        if is_key_down(KeyCode::A) || is_key_down(KeyCode::Left) {
            self.target.x -= pan_speed * dt;
        }
        if is_key_down(KeyCode::D) || is_key_down(KeyCode::Right) {
            self.target.x += pan_speed * dt;
        }

        // Middle mouse drag
        if pointer_free && is_mouse_button_pressed(MouseButton::Middle) {
            self.is_dragging = true;
            self.drag_start = Vec2::from(mouse_position());
            self.drag_cam_start = self.target;
        }
        if is_mouse_button_released(MouseButton::Middle) {
            self.is_dragging = false;
        }
        if self.is_dragging {
            let scale = canvas_scale(screen_size(), canvas_size());
            let delta = (self.drag_start - Vec2::from(mouse_position())) * scale;
            self.target = self.drag_cam_start + delta;
        }

        self.target = self.target.clamp(
            Vec2::ZERO,
            vec2(config::SANDBOX_WORLD_WIDTH, config::SANDBOX_WORLD_HEIGHT),
        );

        let smooth = 1.0 - (-config::CAMERA_SMOOTH_SPEED * dt).exp();
        self.smooth_target = self.smooth_target.lerp(self.target, smooth);
    }

    /// Canvas position of the world origin.
    pub fn canvas_origin(&self, canvas: Vec2) -> Vec2 {
        canvas * 0.5 - self.smooth_target
    }

    pub fn screen_to_world(&self, screen_pos: Vec2, screen: Vec2, canvas: Vec2) -> Vec2 {
        screen_pos * canvas_scale(screen, canvas) - self.canvas_origin(canvas)
    }
}

pub fn canvas_size() -> Vec2 {
    vec2(config::SANDBOX_WIDTH as f32, config::SANDBOX_HEIGHT as f32)
}

fn screen_size() -> Vec2 {
    vec2(screen_width(), screen_height())
}

/// Canvas pixels per screen pixel.
fn canvas_scale(screen: Vec2, canvas: Vec2) -> Vec2 {
    canvas / screen.max(Vec2::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_center_maps_to_camera_target() {
        let cam = CameraController::new(vec2(500.0, 300.0));
        let canvas = vec2(960.0, 600.0);
        let screen = vec2(1920.0, 1200.0);
        assert_eq!(cam.screen_to_world(screen * 0.5, screen, canvas), vec2(500.0, 300.0));
        assert_eq!(cam.screen_to_world(Vec2::ZERO, screen, canvas), vec2(20.0, 0.0));
    }

    #[test]
    fn origin_offsets_by_half_the_canvas() {
        let cam = CameraController::new(vec2(100.0, 50.0));
        assert_eq!(cam.canvas_origin(vec2(200.0, 100.0)), vec2(0.0, 0.0));
    }
}

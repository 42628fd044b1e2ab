pub mod settings;
pub mod toolbar;

use crate::scene::Scene;

/// Tracks which UI panels are open and sandbox-only knobs.
pub struct UiState {
    pub show_settings: bool,
    /// Clock multiplier; a full cycle at 60x takes half a minute.
    pub clock_speed: f32,
    pub frame_ms: f32,
    pub selected_profile: ground_shadows::ShadowProfile,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_settings: true,
            clock_speed: 20.0,
            frame_ms: 0.0,
            selected_profile: ground_shadows::ShadowProfile::Tree,
        }
    }
}

/// Draw all egui UI panels.
pub fn draw_ui(scene: &mut Scene, ui_state: &mut UiState) {
    egui_macroquad::ui(|ctx| {
        toolbar::draw_toolbar(ctx, scene, ui_state);

        if ui_state.show_settings {
            settings::draw_settings(ctx, scene, ui_state);
        }
    });

    egui_macroquad::draw();
}

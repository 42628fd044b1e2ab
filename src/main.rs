use std::path::Path;

use macroquad::prelude::*;

use ground_shadows::{config, ShadowProfiles};

mod camera;
mod gpu_canvas;
mod scene;
mod sprites;
mod ui;

use camera::CameraController;
use gpu_canvas::GpuCanvas;
use scene::Scene;
use ui::UiState;

fn window_conf() -> Conf {
    Conf {
        window_title: "Ground Shadow Sandbox".to_string(),
        window_width: config::SANDBOX_WIDTH as i32,
        window_height: config::SANDBOX_HEIGHT as i32,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn load_profiles() -> ShadowProfiles {
    if !Path::new(config::PROFILES_PATH).exists() {
        return ShadowProfiles::default();
    }
    match ShadowProfiles::load(config::PROFILES_PATH) {
        Ok(profiles) => profiles,
        Err(e) => {
            log::warn!("ignoring {}: {e}", config::PROFILES_PATH);
            ShadowProfiles::default()
        }
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut scene = Scene::new(config::SANDBOX_SEED);
    scene.profiles = load_profiles();
    let mut camera = CameraController::new(vec2(
        config::SANDBOX_WORLD_WIDTH * 0.5,
        config::SANDBOX_WORLD_HEIGHT * 0.5,
    ));
    let mut ui_state = UiState::default();

    let Some(mut canvas) = GpuCanvas::new(config::SANDBOX_WIDTH as u32, config::SANDBOX_HEIGHT as u32)
    else {
        log::error!("cannot create the sandbox canvas: shader compilation failed");
        return;
    };

    loop {
        let dt = get_frame_time().min(0.1);
        let now_ms = get_time() * 1000.0;

        scene.clock.cycle_length_s = config::DAY_CYCLE_LENGTH / ui_state.clock_speed.max(0.001);
        scene.update(dt, now_ms);

        // Hits via left click (only if egui doesn't want the input)
        let mut egui_wants_pointer = false;
        egui_macroquad::cfg(|ctx| {
            egui_wants_pointer = ctx.wants_pointer_input();
        });
        camera.update(dt, !egui_wants_pointer);

        if !egui_wants_pointer && is_mouse_button_pressed(MouseButton::Left) {
            let screen = vec2(screen_width(), screen_height());
            let world = camera.screen_to_world(Vec2::from(mouse_position()), screen, camera::canvas_size());
            scene.hit_at(world, now_ms);
        }

        if is_key_pressed(KeyCode::Space) {
            scene.clock.paused = !scene.clock.paused;
        }
        if is_key_pressed(KeyCode::T) {
            let enabled = scene.renderer.shadows_enabled();
            scene.renderer.set_shadows_enabled(!enabled);
        }
        if is_key_pressed(KeyCode::I) {
            scene.isometric = !scene.isometric;
        }

        let origin = camera.canvas_origin(camera::canvas_size());
        scene.render(&mut canvas, origin, now_ms);

        set_default_camera();
        clear_background(BLACK);
        canvas.present(vec2(screen_width(), screen_height()));

        ui_state.frame_ms = get_frame_time() * 1000.0;
        ui::draw_ui(&mut scene, &mut ui_state);

        next_frame().await;
    }
}

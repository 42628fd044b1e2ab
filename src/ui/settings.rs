use egui;

use ground_shadows::{config, ShadowProfile, ShadowProfiles, ShakeStyle};

use super::UiState;
use crate::scene::Scene;

/// Runtime settings panel for the clock and per-profile shadow tuning.
pub fn draw_settings(ctx: &egui::Context, scene: &mut Scene, ui_state: &mut UiState) {
    egui::Window::new("Settings")
        .default_pos(egui::pos2(12.0, 80.0))
        .default_size(egui::vec2(280.0, 420.0))
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Clock");

            let mut progress = scene.clock.progress();
            if ui
                .add(egui::Slider::new(&mut progress, 0.0..=0.999).text("Cycle"))
                .changed()
            {
                scene.clock.set_progress(progress);
            }
            ui.label(format!(
                "{} · daylight {:.0}%",
                scene.clock.time_of_day().label(),
                scene.clock.daylight() * 100.0
            ));
            ui.add(egui::Slider::new(&mut ui_state.clock_speed, 0.0..=600.0).text("Speed"));

            ui.separator();
            ui.heading("Shadow Profile");

            egui::ComboBox::from_label("Profile")
                .selected_text(ui_state.selected_profile.label())
                .show_ui(ui, |ui| {
                    for profile in ShadowProfile::ALL {
                        ui.selectable_value(&mut ui_state.selected_profile, profile, profile.label());
                    }
                });

            let profile = ui_state.selected_profile;
            let mut tuning = scene.profiles.get(profile);
            let mut changed = false;
            changed |= ui
                .add(egui::Slider::new(&mut tuning.max_alpha, 0.0..=1.0).text("Max alpha"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut tuning.max_stretch, 0.0..=4.0).text("Max stretch"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut tuning.min_stretch, 0.0..=1.0).text("Min stretch"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut tuning.blur_px, 0.0..=8.0).text("Blur px"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut tuning.pivot_y_offset, -20.0..=20.0).text("Pivot offset"))
                .changed();
            if changed {
                scene.profiles.set(profile, tuning.sanitized());
            }

            ui.horizontal(|ui| {
                if ui.button("Reset").clicked() {
                    scene.profiles.set(profile, profile.default_tuning());
                }
                if ui.button("Save").clicked() {
                    save_profiles(&scene.profiles);
                }
                if ui.button("Reload").clicked() {
                    match ShadowProfiles::load(config::PROFILES_PATH) {
                        Ok(loaded) => scene.profiles = loaded,
                        Err(e) => log::warn!("could not reload {}: {e}", config::PROFILES_PATH),
                    }
                }
            });

            ui.separator();
            ui.heading("Motion");

            ui.add(
                egui::Slider::new(&mut scene.sway_params.amplitude_rad, 0.0..=0.2).text("Sway amplitude"),
            );
            ui.add(egui::Slider::new(&mut scene.sway_params.frequency_hz, 0.0..=2.0).text("Sway Hz"));
            ui.horizontal(|ui| {
                ui.label("Hit shake");
                ui.radio_value(&mut scene.shake_params.style, ShakeStyle::Directional, "Wobble");
                ui.radio_value(&mut scene.shake_params.style, ShakeStyle::Jitter, "Jitter");
            });
            ui.checkbox(
                &mut scene.shake_params.suppress_restart,
                "Predicted hits absorb server confirmation",
            );

            ui.separator();
            ui.heading("Shelters");
            for (i, shelter) in scene.shelters.iter_mut().enumerate() {
                ui.checkbox(&mut shelter.destroyed, format!("Shelter {} destroyed", i + 1));
            }
            if ui.button("Clear shadow caches").clicked() {
                scene.renderer.clear_caches();
            }
        });
}

fn save_profiles(profiles: &ShadowProfiles) {
    let json = match profiles.to_json_string() {
        Ok(json) => json,
        Err(e) => {
            log::error!("could not encode shadow profiles: {e}");
            return;
        }
    };
    match std::fs::write(config::PROFILES_PATH, json) {
        Ok(()) => log::info!("saved shadow profiles to {}", config::PROFILES_PATH),
        Err(e) => log::error!("could not write {}: {e}", config::PROFILES_PATH),
    }
}

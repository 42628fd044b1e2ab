use egui;

use super::UiState;
use crate::scene::Scene;

/// Slim status strip + compact controls.
pub fn draw_toolbar(ctx: &egui::Context, scene: &mut Scene, ui_state: &mut UiState) {
    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.add_space(3.0);
        ui.horizontal_wrapped(|ui| {
            title_badge(ui, "SHADOWS");

            ui.separator();
            compact_group(ui, "Clock", |ui| {
                let pause_label = if scene.clock.paused { "Play" } else { "Pause" };
                if ui.button(pause_label).clicked() {
                    scene.clock.paused = !scene.clock.paused;
                }
            });

            compact_group(ui, "Speed", |ui| {
                for speed in [1.0, 20.0, 60.0, 300.0] {
                    speed_button(ui, ui_state, speed);
                }
            });

            compact_group(ui, "View", |ui| {
                let mut enabled = scene.renderer.shadows_enabled();
                if ui.toggle_value(&mut enabled, "Shadows").changed() {
                    scene.renderer.set_shadows_enabled(enabled);
                }
                ui.toggle_value(&mut scene.isometric, "Isometric");
                ui.toggle_value(&mut ui_state.show_settings, "Settings");
            });
        });

        ui.add_space(4.0);
        ui.horizontal_wrapped(|ui| {
            let stats = scene.last_stats;
            metric_chip(
                ui,
                "Time",
                format!(
                    "{} · {:.1}%",
                    scene.clock.time_of_day().label(),
                    scene.clock.progress() * 100.0
                ),
            );
            metric_chip(ui, "Cast", format!("{}", stats.drawn));
            metric_chip(ui, "Hidden", format!("{}", stats.invisible));
            metric_chip(
                ui,
                "Silhouettes",
                format!("{}", scene.renderer.silhouettes().cache().len()),
            );
            metric_chip(ui, "Shaking", format!("{}", scene.renderer.shakes().tracked()));
            metric_chip(ui, "Frame", format!("{:.1}ms", ui_state.frame_ms));
            if !scene.renderer.shadows_enabled() {
                status_chip(ui, "SHADOWS OFF", egui::Color32::from_rgb(220, 140, 90));
            }
        });
        ui.add_space(3.0);
    });
}

fn speed_button(ui: &mut egui::Ui, ui_state: &mut UiState, speed: f32) {
    let label = format!("{speed}x");
    let selected = (ui_state.clock_speed - speed).abs() < 0.01;
    if ui.selectable_label(selected, label).clicked() {
        ui_state.clock_speed = speed;
    }
}

fn title_badge(ui: &mut egui::Ui, label: &str) {
    let text = egui::RichText::new(label)
        .strong()
        .color(egui::Color32::from_rgb(190, 220, 255));
    ui.label(text);
}

fn compact_group(ui: &mut egui::Ui, heading: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.group(|ui| {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(heading)
                    .small()
                    .color(egui::Color32::from_rgb(150, 170, 185)),
            );
            add_contents(ui);
        });
    });
}

fn metric_chip(ui: &mut egui::Ui, key: &str, value: String) {
    let text = egui::RichText::new(format!("{key}: {value}"))
        .small()
        .color(egui::Color32::from_rgb(205, 215, 225));
    ui.group(|ui| {
        ui.label(text);
    });
}

fn status_chip(ui: &mut egui::Ui, label: &str, color: egui::Color32) {
    ui.group(|ui| {
        ui.label(egui::RichText::new(label).small().strong().color(color));
    });
}

use egui::{Align, Layout, Slider, Ui};

use crate::controller::PlaybackController;
use crate::engine::MediaEngine;

/// What the user asked for this frame that the controls can't do on their
/// own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlsResponse {
    pub open_requested: bool,
}

/// Transport bar: seek slider, time and status labels, buttons and volume.
pub struct PlayerControls;

impl PlayerControls {
    pub fn show<E: MediaEngine>(
        ui: &mut Ui,
        controller: &mut PlaybackController<E>,
    ) -> ControlsResponse {
        let mut response = ControlsResponse::default();
        let view = controller.view().clone();

        // Seek bar
        let mut position = view.slider_value_ms;
        let width = ui.available_width();
        ui.spacing_mut().slider_width = width;
        let slider = ui.add_enabled(
            view.seek_enabled,
            Slider::new(&mut position, 0..=view.slider_max_ms)
                .show_value(false)
                .trailing_fill(true),
        );
        if slider.drag_started() {
            controller.begin_seek_drag();
        }
        if slider.changed() {
            controller.seek(i64::try_from(position).unwrap_or(i64::MAX));
        }
        if slider.drag_stopped() {
            controller.end_seek_drag();
        }

        ui.vertical_centered(|ui| {
            ui.label(view.time_text.as_str());
            ui.label(egui::RichText::new(view.status_text.as_str()).color(egui::Color32::LIGHT_BLUE));
        });

        ui.horizontal(|ui| {
            if ui.button("Open file").clicked() {
                response.open_requested = true;
            }
            if ui
                .add_enabled(view.enablement.play, egui::Button::new("Play"))
                .clicked()
            {
                controller.play();
            }
            if ui
                .add_enabled(view.enablement.pause, egui::Button::new("Pause"))
                .clicked()
            {
                controller.pause();
            }
            if ui
                .add_enabled(view.enablement.stop, egui::Button::new("Stop"))
                .clicked()
            {
                controller.stop();
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let mut volume = view.volume_percent;
                ui.spacing_mut().slider_width = 100.0;
                if ui
                    .add(Slider::new(&mut volume, 0..=100).show_value(false))
                    .changed()
                {
                    controller.set_volume(i32::from(volume));
                }
                ui.label("Volume:");
            });
        });

        response
    }
}

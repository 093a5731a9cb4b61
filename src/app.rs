use egui::{CentralPanel, TopBottomPanel, Vec2, ViewportCommand};
use idokeno::{ControllerConfig, PlaybackController, PlayerControls, VideoPlayer};
use log::debug;
use std::path::PathBuf;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv"];

pub struct PlayerApp {
    controller: PlaybackController<VideoPlayer>,
    title: String,
}

impl PlayerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let engine = VideoPlayer::new(cc.egui_ctx.clone());
        let controller = PlaybackController::new(engine, ControllerConfig::default());
        let title = controller.view().title.clone();
        Self { controller, title }
    }

    /// Ask for a file. Cancelling hands the controller an empty path.
    fn open_file(&mut self) {
        let path = rfd::FileDialog::new()
            .set_title("Open media file")
            .add_filter("Video files", VIDEO_EXTENSIONS)
            .add_filter("All files", &["*"])
            .pick_file()
            .unwrap_or_default();
        self.controller.open(path);
    }

    fn dropped_file(ctx: &egui::Context) -> Option<PathBuf> {
        ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()))
    }

    fn show_video(&mut self, ui: &mut egui::Ui) {
        let player = self.controller.engine();
        let (Some(texture), Some((width, height))) = (player.texture(), player.video_size()) else {
            ui.centered_and_justified(|ui| {
                ui.heading("Open a video file or drop one here");
            });
            return;
        };
        if width == 0 || height == 0 {
            return;
        }

        // Fit inside the panel, keeping aspect ratio
        let available = ui.available_size();
        let aspect = width as f32 / height as f32;
        let size = if aspect > available.x / available.y {
            Vec2::new(available.x, available.x / aspect)
        } else {
            Vec2::new(available.y * aspect, available.y)
        };
        let texture_id = texture.id();
        ui.centered_and_justified(|ui| {
            ui.image((texture_id, size));
        });
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.engine_mut().update();
        self.controller.process_engine_events();

        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open...").clicked() {
                        ui.close_menu();
                        self.open_file();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(ViewportCommand::Close);
                    }
                });
            });
        });

        TopBottomPanel::bottom("controls").show(ctx, |ui| {
            let response = PlayerControls::show(ui, &mut self.controller);
            if response.open_requested {
                self.open_file();
            }
        });

        CentralPanel::default().show(ctx, |ui| self.show_video(ui));

        if let Some(path) = Self::dropped_file(ctx) {
            debug!("Dropped {}", path.display());
            self.controller.open(path);
        }

        let title = &self.controller.view().title;
        if *title != self.title {
            self.title = title.clone();
            ctx.send_viewport_cmd(ViewportCommand::Title(self.title.clone()));
        }

        if self.controller.engine().is_playing() {
            ctx.request_repaint();
        }
    }
}

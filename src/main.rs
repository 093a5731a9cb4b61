mod app;

use anyhow::Context;
use app::PlayerApp;
use eframe::NativeOptions;
use idokeno::controller::APP_TITLE;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    ffmpeg_next::init().context("failed to initialize FFmpeg")?;

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(|cc| Ok(Box::new(PlayerApp::new(cc)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

use anyhow::{anyhow, Result};
use screendraw::app::OverlayApp;
use screendraw::{logging, settings_store};
use tracing::warn;

fn main() -> Result<()> {
    let settings = settings_store::load().unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "falling back to default settings");
        Default::default()
    });
    logging::init(settings.debug_logging);

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 800.0])
            .with_title("Screen Draw"),
        ..Default::default()
    };

    eframe::run_native(
        "Screen Draw",
        native_options,
        Box::new(move |cc| Box::new(OverlayApp::new(cc, settings))),
    )
    .map_err(|err| anyhow!("run overlay demo: {err}"))
}

mod app;
mod color;
mod state;
mod ui;

use app::SurveyLensApp;
use eframe::egui;
use state::AppState;
use survey_lens::config::{AppConfig, ConfigManager};
use survey_lens::DatasetKind;

pub const APP_NAME: &str = "survey-lens";

fn load_config() -> AppConfig {
    match ConfigManager::new(APP_NAME).and_then(|m| m.load()) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Falling back to default config: {e:#}");
            AppConfig::default()
        }
    }
}

fn main() -> eframe::Result {
    env_logger::init();

    let mut state = AppState::new(load_config());
    let default_kind = DatasetKind::LaborEfficacy;
    let default_path = state.config.datasets.path_for(default_kind).to_path_buf();
    if default_path.exists() {
        state.open_path(&default_path, default_kind.label());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Survey Lens – Comparativa por carrera",
        options,
        Box::new(|_cc| Ok(Box::new(SurveyLensApp::new(state)))),
    )
}

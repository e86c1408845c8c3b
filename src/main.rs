use std::sync::Arc;

use gm_ratatui::{
    JsonCampaignStore, ModelGateway, Settings, app::App, gateway::MODEL_NAME, logging,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let (settings, settings_error) = Settings::load();
    let data_dir = Settings::data_dir();
    if let Err(e) = logging::init(data_dir.clone(), settings.debug_mode) {
        eprintln!("Failed to initialize logging: {e}");
    }
    log::info!("Start: {}", chrono::Local::now());
    match settings_error {
        Some(e) => log::info!(
            "Using default settings, {} unreadable: {e}",
            Settings::settings_path().display()
        ),
        None => log::info!("Settings loaded from {}", Settings::settings_path().display()),
    }

    // Loading happens once, before the terminal is taken over.
    println!("Loading {MODEL_NAME} from {}...", settings.endpoint);
    let gateway = ModelGateway::initialize(&settings.endpoint).await;
    let store = Arc::new(JsonCampaignStore::new(&data_dir));

    let mut app = App::new(settings, gateway, store);
    app.run().await
}

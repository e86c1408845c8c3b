pub mod app;
pub mod catalog;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod settings;
pub mod store;
pub mod transcript;
pub mod tui;
pub mod turn;
pub mod ui;

// Re-export commonly used items for easier access
pub use catalog::{CampaignCatalog, CampaignId, CampaignRecord, CampaignStore, SelectionResult};
pub use error::{AppError, CatalogError, GatewayError, StoreError};
pub use gateway::{ModelGateway, TextGenerator};
pub use settings::Settings;
pub use store::JsonCampaignStore;
pub use transcript::{ContextWindow, Speaker, Transcript, TranscriptLine};
pub use turn::{Submission, TurnCompletion, TurnController, TurnOutcome, TurnState};

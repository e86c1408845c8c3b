use chrono::Utc;
use std::fs::{self, create_dir_all, read_dir, remove_dir_all};
use std::path::{Path, PathBuf};

use crate::catalog::{CampaignId, CampaignRecord, CampaignStore, UNKNOWN_CAMPAIGN};
use crate::error::StoreError;
use crate::transcript::TranscriptLine;

pub const CAMPAIGNS_DIR: &str = "campaigns";
pub const METADATA_FILE: &str = "campaign_metadata.json";
pub const HISTORY_FILE: &str = "session_history.json";

// One directory per campaign, named after its id, holding a metadata file and
// the conversation played so far.
#[derive(Debug, Clone)]
pub struct JsonCampaignStore {
    root: PathBuf,
}

impl JsonCampaignStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join(CAMPAIGNS_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn campaign_dir(&self, id: &CampaignId) -> PathBuf {
        self.root.join(&id.0)
    }

    fn read_record(&self, id: &CampaignId) -> Result<CampaignRecord, StoreError> {
        let path = self.campaign_dir(id).join(METADATA_FILE);
        let data = fs::read_to_string(&path)?;
        let mut record: CampaignRecord = serde_json::from_str(&data)?;
        // The directory name is authoritative.
        record.id = id.clone();
        Ok(record)
    }

    fn write_record(&self, record: &CampaignRecord) -> Result<(), StoreError> {
        let dir = self.campaign_dir(&record.id);
        create_dir_all(&dir)?;
        let serialized = serde_json::to_string_pretty(record)?;
        fs::write(dir.join(METADATA_FILE), serialized)?;
        Ok(())
    }

    /// Every campaign on disk, most recently played first.
    pub fn list_campaigns(&self) -> Result<Vec<CampaignRecord>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut campaigns = Vec::new();
        for entry in read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let id = CampaignId::from(name);
            if !path.join(METADATA_FILE).exists() {
                continue;
            }
            let record = self.read_record(&id).unwrap_or_else(|e| {
                log::error!("Error loading campaign metadata for {id}: {e}");
                CampaignRecord::new(id.clone(), UNKNOWN_CAMPAIGN, 0, 0)
            });
            campaigns.push(record);
        }

        campaigns.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(campaigns)
    }

    pub fn create_campaign(&self, name: &str) -> Result<CampaignRecord, StoreError> {
        let now = Utc::now().timestamp();
        let record = CampaignRecord::new(uuid::Uuid::new_v4().to_string(), name, now, now);
        self.write_record(&record)?;
        log::info!("Created campaign {} ({})", record.name, record.id);
        Ok(record)
    }

    pub fn load_campaign(&self, id: &CampaignId) -> Result<CampaignRecord, StoreError> {
        if !self.campaign_dir(id).exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.read_record(id)
    }

    /// Marks the campaign as played now, keeping its creation time.
    pub fn touch(&self, id: &CampaignId) -> Result<CampaignRecord, StoreError> {
        let mut record = self.load_campaign(id)?;
        record.last_modified = Utc::now().timestamp();
        self.write_record(&record)?;
        Ok(record)
    }

    /// The dialogue saved for a campaign. A campaign never played has none.
    pub fn load_history(&self, id: &CampaignId) -> Result<Vec<TranscriptLine>, StoreError> {
        let dir = self.campaign_dir(id);
        if !dir.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let path = dir.join(HISTORY_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&path)?;
        let history: Vec<TranscriptLine> = serde_json::from_str(&data)?;
        log::debug!("Loaded {} history lines for {id}", history.len());
        Ok(history)
    }

    /// Replaces the saved dialogue. The file is written aside and renamed into place.
    pub fn save_history(&self, id: &CampaignId, history: &[TranscriptLine]) -> Result<(), StoreError> {
        let dir = self.campaign_dir(id);
        if !dir.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let path = dir.join(HISTORY_FILE);
        let temp_path = path.with_extension("json.temp");
        fs::write(&temp_path, serde_json::to_string_pretty(history)?)?;
        fs::rename(&temp_path, &path)?;
        log::debug!("Saved {} history lines for {id}", history.len());
        Ok(())
    }
}

impl CampaignStore for JsonCampaignStore {
    fn delete_campaign(&self, id: &CampaignId) -> bool {
        if id.0.is_empty() || id.0.contains(['/', '\\']) || id.0 == "." || id.0 == ".." {
            log::error!("Refusing to delete campaign with id {id:?}");
            return false;
        }
        let dir = self.campaign_dir(id);
        if !dir.is_dir() {
            log::error!("Campaign directory not found: {}", dir.display());
            return false;
        }
        match remove_dir_all(&dir) {
            Ok(()) => {
                log::info!("Deleted campaign directory {}", dir.display());
                true
            }
            Err(e) => {
                log::error!("Failed to delete {}: {e}", dir.display());
                false
            }
        }
    }
}

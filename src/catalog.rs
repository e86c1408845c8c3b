//! Campaign selection.
//!
//! The catalog only ever holds the records its owner hands it. Deleting goes
//! through the owner's [`CampaignStore`]; the catalog never touches a record's
//! fields.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::CatalogError;

pub const UNKNOWN_CAMPAIGN: &str = "Unknown Campaign";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(id: &str) -> Self {
        CampaignId(id.to_string())
    }
}

impl From<String> for CampaignId {
    fn from(id: String) -> Self {
        CampaignId(id)
    }
}

fn unknown_campaign() -> String {
    UNKNOWN_CAMPAIGN.to_string()
}

// Epoch seconds written either as integers or as fractional floats.
fn epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = Option::<f64>::deserialize(deserializer)?;
    Ok(seconds.map_or(0, |s| s as i64))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRecord {
    #[serde(default)]
    pub id: CampaignId,
    #[serde(default = "unknown_campaign")]
    pub name: String,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub created: i64,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub last_modified: i64,
}

fn format_date(epoch_seconds: i64) -> String {
    Local
        .timestamp_opt(epoch_seconds, 0)
        .single()
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl CampaignRecord {
    pub fn new(id: impl Into<CampaignId>, name: impl Into<String>, created: i64, last_modified: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created,
            last_modified,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{} (Created: {}, Last played: {})",
            self.name,
            format_date(self.created),
            format_date(self.last_modified)
        )
    }
}

/// The owner's side of campaign management, as far as the catalog needs it.
pub trait CampaignStore: Send + Sync {
    fn delete_campaign(&self, id: &CampaignId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Existing(CampaignId),
    NewCampaign(String),
    Cancelled,
}

/// A deletion waiting for the user's yes or no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub index: usize,
    pub name: String,
}

impl DeletePrompt {
    pub fn question(&self) -> String {
        format!(
            "Are you sure you want to delete the campaign '{}'?\n\nThis will permanently delete the campaign and its saved conversation.",
            self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(CampaignRecord),
    Declined,
}

impl DeleteOutcome {
    pub fn message(&self) -> Option<String> {
        match self {
            DeleteOutcome::Deleted(record) => {
                Some(format!("Campaign '{}' has been deleted.", record.name))
            }
            DeleteOutcome::Declined => None,
        }
    }
}

#[derive(Default)]
pub struct CampaignCatalog {
    campaigns: Vec<CampaignRecord>,
    selected_id: Option<CampaignId>,
    new_campaign_name: Option<String>,
    pending_delete: Option<DeletePrompt>,
    store: Option<Arc<dyn CampaignStore>>,
    result: Option<SelectionResult>,
}

impl fmt::Debug for CampaignCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CampaignCatalog")
            .field("campaigns", &self.campaigns)
            .field("selected_id", &self.selected_id)
            .field("new_campaign_name", &self.new_campaign_name)
            .field("pending_delete", &self.pending_delete)
            .field("has_store", &self.store.is_some())
            .field("result", &self.result)
            .finish()
    }
}

impl CampaignCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<dyn CampaignStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    pub fn campaigns(&self) -> &[CampaignRecord] {
        &self.campaigns
    }

    pub fn labels(&self) -> Vec<String> {
        self.campaigns.iter().map(CampaignRecord::label).collect()
    }

    pub fn selected_id(&self) -> Option<&CampaignId> {
        self.selected_id.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&DeletePrompt> {
        self.pending_delete.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.result.is_none()
    }

    pub fn result(&self) -> Option<&SelectionResult> {
        self.result.as_ref()
    }

    fn ensure_open(&self) -> Result<(), CatalogError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CatalogError::Closed)
        }
    }

    pub fn set_campaigns(&mut self, campaigns: Vec<CampaignRecord>) {
        self.campaigns = campaigns;
        self.pending_delete = None;
    }

    pub fn select_existing(&mut self, index: usize) -> Result<(), CatalogError> {
        self.ensure_open()?;
        let record = self
            .campaigns
            .get(index)
            .ok_or(CatalogError::IndexOutOfRange(index))?;
        self.selected_id = Some(record.id.clone());
        Ok(())
    }

    /// Records a new campaign request and closes the catalog. An empty name is
    /// ignored and leaves the catalog open.
    pub fn request_new(&mut self, name: &str) -> Result<Option<SelectionResult>, CatalogError> {
        self.ensure_open()?;
        if name.is_empty() {
            return Ok(None);
        }
        self.new_campaign_name = Some(name.to_string());
        self.finalize().map(Some)
    }

    /// First half of a deletion: names the campaign at `index` for confirmation.
    pub fn request_delete(&mut self, index: Option<usize>) -> Result<DeletePrompt, CatalogError> {
        self.ensure_open()?;
        let index = index.ok_or(CatalogError::NoDeleteSelection)?;
        let record = self
            .campaigns
            .get(index)
            .ok_or(CatalogError::NoDeleteSelection)?;
        let prompt = DeletePrompt {
            index,
            name: record.name.clone(),
        };
        self.pending_delete = Some(prompt.clone());
        Ok(prompt)
    }

    /// Second half of a deletion. Only a confirmed deletion the store accepts
    /// changes the list.
    pub fn confirm_delete(&mut self, confirmed: bool) -> Result<DeleteOutcome, CatalogError> {
        self.ensure_open()?;
        let prompt = self
            .pending_delete
            .take()
            .ok_or(CatalogError::NoPendingDeletion)?;
        if !confirmed {
            return Ok(DeleteOutcome::Declined);
        }

        let store = self.store.as_ref().ok_or(CatalogError::DeleteUnavailable)?;
        let id = self.campaigns[prompt.index].id.clone();
        if !store.delete_campaign(&id) {
            log::warn!("Store refused to delete campaign {id}");
            return Err(CatalogError::DeleteFailed(prompt.name));
        }

        let record = self.campaigns.remove(prompt.index);
        if self.selected_id.as_ref() == Some(&record.id) {
            self.selected_id = None;
        }
        log::info!("Deleted campaign {} ({})", record.name, record.id);
        Ok(DeleteOutcome::Deleted(record))
    }

    /// Closes the catalog. Without an explicit choice the first campaign is taken;
    /// with no campaign and no new request the catalog stays open.
    pub fn finalize(&mut self) -> Result<SelectionResult, CatalogError> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }

        if self.selected_id.is_none() && self.new_campaign_name.is_none() {
            self.selected_id = self.campaigns.first().map(|record| record.id.clone());
        }

        let result = match (&self.new_campaign_name, &self.selected_id) {
            (Some(name), _) => SelectionResult::NewCampaign(name.clone()),
            (None, Some(id)) => SelectionResult::Existing(id.clone()),
            (None, None) => return Err(CatalogError::NothingSelected),
        };
        self.pending_delete = None;
        self.result = Some(result.clone());
        Ok(result)
    }

    pub fn cancel(&mut self) -> SelectionResult {
        self.result
            .get_or_insert(SelectionResult::Cancelled)
            .clone()
    }
}

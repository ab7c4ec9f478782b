mod http;
mod in_memory;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::appsettings::BackendSettings;
use crate::draft::ReminderDraft;
use crate::reminder::{Reminder, ReminderId, ReminderPatch};

pub use http::HttpReminderApi;
pub use in_memory::InMemoryReminderApi;

/// Backend holding a user's sunscreen reminders. Any failure, whatever its cause,
/// is reported as an error whose top-level context is the operation's failure message.
#[async_trait]
pub trait ReminderApi: Send + Sync {
    async fn list(&self, user_id: &str) -> anyhow::Result<Vec<Reminder>>;
    async fn create(&self, user_id: &str, draft: &ReminderDraft) -> anyhow::Result<Reminder>;
    async fn update(
        &self,
        user_id: &str,
        id: &ReminderId,
        patch: &ReminderPatch,
    ) -> anyhow::Result<()>;
    async fn delete(&self, user_id: &str, id: &ReminderId) -> anyhow::Result<()>;
}

pub fn from_settings(settings: &BackendSettings) -> anyhow::Result<Arc<dyn ReminderApi>> {
    if settings.in_memory {
        log::info!("Using in-memory reminder backend.");
        return Ok(Arc::new(InMemoryReminderApi::new()));
    }

    let base_url = settings
        .base_url
        .as_deref()
        .context("backend.base_url must be set unless backend.in_memory is enabled")?;
    log::info!("Using HTTP reminder backend. [base_url = {}]", base_url);
    Ok(Arc::new(HttpReminderApi::new(base_url)?))
}

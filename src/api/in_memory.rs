use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use tokio::sync::RwLock;

use crate::draft::ReminderDraft;
use crate::reminder::{Reminder, ReminderId, ReminderPatch, UserId};
use crate::state::ReminderOperation;

use super::ReminderApi;

struct InMemoryReminderStore {
    next_id: i64,
    reminders: HashMap<UserId, Vec<Reminder>>,
}

/// Process-local backend, selected with `backend.in_memory`. Tests can also make
/// individual operations fail or slow every call down.
pub struct InMemoryReminderApi {
    store: RwLock<InMemoryReminderStore>,
    failing: RwLock<HashSet<ReminderOperation>>,
    latency: Duration,
    list_calls: AtomicUsize,
}

impl InMemoryReminderApi {
    pub fn new() -> Self {
        InMemoryReminderApi {
            store: RwLock::new(InMemoryReminderStore {
                next_id: 1,
                reminders: HashMap::new(),
            }),
            failing: RwLock::new(HashSet::new()),
            latency: Duration::ZERO,
            list_calls: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn insert(&self, user_id: &str, draft: ReminderDraft) -> Reminder {
        let mut store = self.store.write().await;
        let reminder = Reminder {
            id: ReminderId::Number(store.next_id),
            frequency: draft.frequency,
            times: draft.times,
            uv_index_threshold: draft.uv_index_threshold,
            temp_alert: draft.temp_alert,
            extra: Map::new(),
        };
        store.next_id += 1;
        store
            .reminders
            .entry(user_id.to_string())
            .or_default()
            .push(reminder.clone());

        reminder
    }

    #[cfg(test)]
    pub async fn seed(&self, user_id: &str, draft: ReminderDraft) -> Reminder {
        self.insert(user_id, draft).await
    }

    #[cfg(test)]
    pub async fn fail(&self, operation: ReminderOperation) {
        self.failing.write().await.insert(operation);
    }

    #[cfg(test)]
    pub async fn recover(&self, operation: ReminderOperation) {
        self.failing.write().await.remove(&operation);
    }

    #[cfg(test)]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    async fn begin(&self, operation: ReminderOperation) -> anyhow::Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.read().await.contains(&operation) {
            anyhow::bail!(operation.failure_message());
        }

        Ok(())
    }
}

impl Default for InMemoryReminderApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReminderApi for InMemoryReminderApi {
    async fn list(&self, user_id: &str) -> anyhow::Result<Vec<Reminder>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.begin(ReminderOperation::List).await?;
        let store = self.store.read().await;
        Ok(store.reminders.get(user_id).cloned().unwrap_or_default())
    }

    async fn create(&self, user_id: &str, draft: &ReminderDraft) -> anyhow::Result<Reminder> {
        self.begin(ReminderOperation::Create).await?;
        let reminder = self.insert(user_id, draft.clone()).await;
        log::info!("Stored reminder. [reminder_id = {}]", reminder.id);
        Ok(reminder)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &ReminderId,
        patch: &ReminderPatch,
    ) -> anyhow::Result<()> {
        self.begin(ReminderOperation::Update).await?;
        let mut store = self.store.write().await;
        match store
            .reminders
            .get_mut(user_id)
            .and_then(|reminders| reminders.iter_mut().find(|r| &r.id == id))
        {
            Some(reminder) => {
                reminder.apply_patch(patch);
                Ok(())
            }
            None => anyhow::bail!(ReminderOperation::Update.failure_message()),
        }
    }

    async fn delete(&self, user_id: &str, id: &ReminderId) -> anyhow::Result<()> {
        self.begin(ReminderOperation::Delete).await?;
        let mut store = self.store.write().await;
        let reminders = store.reminders.entry(user_id.to_string()).or_default();
        let before = reminders.len();
        reminders.retain(|r| &r.id != id);
        if reminders.len() == before {
            anyhow::bail!(ReminderOperation::Delete.failure_message());
        }

        Ok(())
    }
}

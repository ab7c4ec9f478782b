use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};

use crate::draft::ReminderDraft;
use crate::reminder::{Reminder, ReminderId, ReminderPatch};
use crate::state::ReminderOperation;

use super::ReminderApi;

/// REST client for `/users/{user_id}/sunscreen-reminders`.
#[derive(Clone)]
pub struct HttpReminderApi {
    client: Client,
    base_url: Url,
}

impl HttpReminderApi {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid backend url \"{}\"", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend url \"{}\" cannot have a path", base_url);
        }

        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// User and reminder ids are pushed as single, percent-encoded path segments.
    fn url(&self, user_id: &str, id: Option<&ReminderId>) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("Backend url \"{}\" cannot have a path", self.base_url))?;
            segments
                .pop_if_empty()
                .push("users")
                .push(user_id)
                .push("sunscreen-reminders");
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }

        Ok(url)
    }
}

async fn send(request: RequestBuilder) -> anyhow::Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Backend responded with status {}", status);
    }

    Ok(response)
}

#[async_trait]
impl ReminderApi for HttpReminderApi {
    async fn list(&self, user_id: &str) -> anyhow::Result<Vec<Reminder>> {
        let url = self
            .url(user_id, None)
            .context(ReminderOperation::List.failure_message())?;
        log::debug!("Fetching reminders. [url = {}]", url);

        let reminders = send(self.client.get(url.clone()))
            .await
            .context(ReminderOperation::List.failure_message())?
            .json::<Vec<Reminder>>()
            .await
            .context(ReminderOperation::List.failure_message())?;

        Ok(reminders)
    }

    async fn create(&self, user_id: &str, draft: &ReminderDraft) -> anyhow::Result<Reminder> {
        let url = self
            .url(user_id, None)
            .context(ReminderOperation::Create.failure_message())?;
        log::debug!("Creating reminder. [url = {}]", url);

        let reminder = send(self.client.post(url.clone()).json(draft))
            .await
            .context(ReminderOperation::Create.failure_message())?
            .json::<Reminder>()
            .await
            .context(ReminderOperation::Create.failure_message())?;

        Ok(reminder)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &ReminderId,
        patch: &ReminderPatch,
    ) -> anyhow::Result<()> {
        let url = self
            .url(user_id, Some(id))
            .context(ReminderOperation::Update.failure_message())?;
        log::debug!("Updating reminder. [url = {}]", url);

        send(self.client.put(url.clone()).json(patch))
            .await
            .context(ReminderOperation::Update.failure_message())?;

        Ok(())
    }

    async fn delete(&self, user_id: &str, id: &ReminderId) -> anyhow::Result<()> {
        let url = self
            .url(user_id, Some(id))
            .context(ReminderOperation::Delete.failure_message())?;
        log::debug!("Deleting reminder. [url = {}]", url);

        send(self.client.delete(url.clone()))
            .await
            .context(ReminderOperation::Delete.failure_message())?;

        Ok(())
    }
}

use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::api::ReminderApi;
use crate::reminder::{ReminderFrequency, ReminderId, ReminderPatch, UserId, UvIndexThreshold};
use crate::state::{OperationError, ReminderOperation, ReminderSettingsState, StateAction, reduce};

#[derive(Debug)]
enum SettingsCommand {
    Reload,
    SubmitDraft,
    Update { id: ReminderId, patch: ReminderPatch },
    Delete(ReminderId),
    Edit(StateAction),
}

/// Handle to a running reminder settings component.
///
/// The component task owns the state and is the only writer; every change goes
/// through [`reduce`] and is published to subscribers. Requests run in their own
/// tasks so several can be in flight at once.
pub struct ReminderSettingsHandle {
    commands: mpsc::UnboundedSender<SettingsCommand>,
    user_id: watch::Sender<Option<UserId>>,
    state: watch::Receiver<ReminderSettingsState>,
    cancellation_token: CancellationToken,
    task: JoinHandle<()>,
}

pub fn start(api: Arc<dyn ReminderApi>, user_id: Option<UserId>) -> ReminderSettingsHandle {
    let (commands, commands_rx) = mpsc::unbounded_channel();
    let (actions, actions_rx) = mpsc::unbounded_channel();
    let (user_tx, user_rx) = watch::channel(user_id);
    let (state_tx, state_rx) = watch::channel(ReminderSettingsState::default());
    let cancellation_token = CancellationToken::new();

    let component = Component {
        api,
        state: ReminderSettingsState::default(),
        state_tx,
        actions,
    };
    let task_token = cancellation_token.child_token();
    let task = tokio::spawn(component.run(commands_rx, actions_rx, user_rx, task_token));

    ReminderSettingsHandle {
        commands,
        user_id: user_tx,
        state: state_rx,
        cancellation_token,
        task,
    }
}

impl ReminderSettingsHandle {
    /// Watches a new user. The list is refetched only when the id actually changes.
    pub fn set_user_id(&self, user_id: impl Into<UserId>) {
        self.user_id.send_replace(Some(user_id.into()));
    }

    pub fn reload(&self) -> anyhow::Result<()> {
        self.send(SettingsCommand::Reload)
    }

    pub fn submit_draft(&self) -> anyhow::Result<()> {
        self.send(SettingsCommand::SubmitDraft)
    }

    pub fn update_reminder(&self, id: ReminderId, patch: ReminderPatch) -> anyhow::Result<()> {
        self.send(SettingsCommand::Update { id, patch })
    }

    pub fn delete_reminder(&self, id: ReminderId) -> anyhow::Result<()> {
        self.send(SettingsCommand::Delete(id))
    }

    pub fn add_draft_time(&self) -> anyhow::Result<()> {
        self.send(SettingsCommand::Edit(StateAction::AddDraftTime))
    }

    pub fn change_draft_time(&self, index: usize, time: impl Into<String>) -> anyhow::Result<()> {
        self.send(SettingsCommand::Edit(StateAction::ChangeDraftTime {
            index,
            time: time.into(),
        }))
    }

    pub fn remove_draft_time(&self, index: usize) -> anyhow::Result<()> {
        self.send(SettingsCommand::Edit(StateAction::RemoveDraftTime(index)))
    }

    pub fn set_draft_frequency(&self, frequency: ReminderFrequency) -> anyhow::Result<()> {
        self.send(SettingsCommand::Edit(StateAction::SetDraftFrequency(
            frequency,
        )))
    }

    pub fn set_draft_uv_threshold(&self, threshold: UvIndexThreshold) -> anyhow::Result<()> {
        self.send(SettingsCommand::Edit(StateAction::SetDraftUvThreshold(
            threshold,
        )))
    }

    pub fn set_draft_temp_alert(&self, temp_alert: bool) -> anyhow::Result<()> {
        self.send(SettingsCommand::Edit(StateAction::SetDraftTempAlert(
            temp_alert,
        )))
    }

    pub fn state(&self) -> ReminderSettingsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReminderSettingsState> {
        self.state.clone()
    }

    /// Waits until the published state satisfies `predicate` and returns it.
    #[cfg(test)]
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ReminderSettingsState) -> bool,
    ) -> anyhow::Result<ReminderSettingsState> {
        let mut state = self.state.clone();
        let matched = state.wait_for(predicate).await?;
        Ok(matched.clone())
    }

    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        if let Err(e) = self.task.await {
            log::error!("Reminder settings task failed. [error = {}]", e);
        }
    }

    fn send(&self, command: SettingsCommand) -> anyhow::Result<()> {
        self.commands.send(command)?;
        Ok(())
    }
}

struct Component {
    api: Arc<dyn ReminderApi>,
    state: ReminderSettingsState,
    state_tx: watch::Sender<ReminderSettingsState>,
    actions: mpsc::UnboundedSender<StateAction>,
}

impl Component {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SettingsCommand>,
        mut actions: mpsc::UnboundedReceiver<StateAction>,
        mut user_id: watch::Receiver<Option<UserId>>,
        cancellation_token: CancellationToken,
    ) {
        log::info!("Reminder settings component started");

        let initial_user = user_id.borrow_and_update().clone();
        if let Some(initial_user) = initial_user {
            self.observe_user(initial_user);
        }
        self.publish();

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::info!("Reminder settings component stopped");
                    break;
                }
                changed = user_id.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next_user = user_id.borrow_and_update().clone();
                    if let Some(next_user) = next_user {
                        self.observe_user(next_user);
                    }
                }
                Some(command) = commands.recv() => self.handle_command(command),
                Some(action) = actions.recv() => self.apply(action),
                else => break,
            }

            self.publish();
        }
    }

    fn observe_user(&mut self, user_id: UserId) {
        if self.state.user_id.as_ref() == Some(&user_id) {
            return;
        }

        self.apply(StateAction::UserChanged(user_id.clone()));
        self.spawn_load(user_id);
    }

    fn handle_command(&mut self, command: SettingsCommand) {
        match command {
            SettingsCommand::Edit(action) => self.apply(action),
            SettingsCommand::Reload => {
                if let Some(user_id) = self.current_user(ReminderOperation::List) {
                    self.spawn_load(user_id);
                }
            }
            SettingsCommand::SubmitDraft => {
                let Some(user_id) = self.current_user(ReminderOperation::Create) else {
                    return;
                };
                let api = Arc::clone(&self.api);
                let draft = self.state.draft.clone();
                self.spawn_operation(ReminderOperation::Create, user_id, move |user_id| async move {
                    match api.create(&user_id, &draft).await {
                        Ok(reminder) => Ok(StateAction::Created { user_id, reminder }),
                        Err(e) => Err((user_id, e)),
                    }
                });
            }
            SettingsCommand::Update { id, patch } => {
                let Some(user_id) = self.current_user(ReminderOperation::Update) else {
                    return;
                };
                let api = Arc::clone(&self.api);
                self.spawn_operation(ReminderOperation::Update, user_id, move |user_id| async move {
                    match api.update(&user_id, &id, &patch).await {
                        Ok(()) => Ok(StateAction::Updated { user_id, id, patch }),
                        Err(e) => Err((user_id, e)),
                    }
                });
            }
            SettingsCommand::Delete(id) => {
                let Some(user_id) = self.current_user(ReminderOperation::Delete) else {
                    return;
                };
                let api = Arc::clone(&self.api);
                self.spawn_operation(ReminderOperation::Delete, user_id, move |user_id| async move {
                    match api.delete(&user_id, &id).await {
                        Ok(()) => Ok(StateAction::Deleted { user_id, id }),
                        Err(e) => Err((user_id, e)),
                    }
                });
            }
        }
    }

    fn current_user(&self, operation: ReminderOperation) -> Option<UserId> {
        let user_id = self.state.user_id.clone();
        if user_id.is_none() {
            log::warn!("No user selected, ignoring operation. [operation = {:?}]", operation);
        }
        user_id
    }

    fn spawn_load(&mut self, user_id: UserId) {
        let api = Arc::clone(&self.api);
        self.spawn_operation(ReminderOperation::List, user_id, move |user_id| async move {
            match api.list(&user_id).await {
                Ok(reminders) => Ok(StateAction::Loaded { user_id, reminders }),
                Err(e) => Err((user_id, e)),
            }
        });
    }

    fn spawn_operation<F, Fut>(&mut self, operation: ReminderOperation, user_id: UserId, request: F)
    where
        F: FnOnce(UserId) -> Fut + Send + 'static,
        Fut: Future<Output = Result<StateAction, (UserId, anyhow::Error)>> + Send + 'static,
    {
        self.apply(StateAction::OperationStarted(operation));

        let actions = self.actions.clone();
        tokio::spawn(async move {
            let action = match request(user_id).await {
                Ok(action) => action,
                Err((user_id, e)) => {
                    log::warn!(
                        "Reminder operation failed. [operation = {:?}, user_id = {}, error = {:#}]",
                        operation,
                        user_id,
                        e
                    );
                    StateAction::Failed {
                        user_id,
                        error: OperationError::new(operation, &e),
                    }
                }
            };

            // The component may already be gone.
            let _ = actions.send(action);
        });
    }

    fn apply(&mut self, action: StateAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::api::InMemoryReminderApi;
    use crate::draft::ReminderDraft;

    use super::*;

    async fn loaded(handle: &ReminderSettingsHandle) -> ReminderSettingsState {
        handle
            .wait_for(|s| s.user_id.is_some() && !s.is_loading())
            .await
            .unwrap()
    }

    fn draft_at(time: &str) -> ReminderDraft {
        ReminderDraft {
            times: vec![time.to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn loads_reminders_for_initial_user() {
        let api = Arc::new(InMemoryReminderApi::new());
        let seeded = api.seed("1", draft_at("08:00")).await;

        let handle = start(api, Some("1".to_string()));
        let state = handle.wait_for(|s| !s.reminders.is_empty()).await.unwrap();

        assert_eq!(state.reminders, vec![seeded]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn nothing_is_loaded_until_a_user_is_known() {
        let api = Arc::new(InMemoryReminderApi::new());
        api.seed("1", draft_at("08:00")).await;

        let handle = start(api, None);
        handle.submit_draft().unwrap();
        handle.add_draft_time().unwrap();
        let state = handle.wait_for(|s| s.draft.times.len() == 2).await.unwrap();
        assert!(state.reminders.is_empty());
        assert!(!state.is_loading());

        handle.set_user_id("1");
        let state = handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();
        assert_eq!(state.user_id.as_deref(), Some("1"));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn user_change_discards_and_refetches() {
        let api = Arc::new(InMemoryReminderApi::new());
        api.seed("1", draft_at("08:00")).await;
        let second = api.seed("2", draft_at("09:00")).await;

        let handle = start(api, Some("1".to_string()));
        handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();

        handle.set_user_id("2");
        let state = handle
            .wait_for(|s| s.user_id.as_deref() == Some("2") && !s.reminders.is_empty())
            .await
            .unwrap();

        assert_eq!(state.reminders, vec![second]);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_for_previous_user_is_ignored() {
        let api = InMemoryReminderApi::new().with_latency(Duration::from_millis(100));
        api.seed("1", draft_at("08:00")).await;
        let api = Arc::new(api);

        let handle = start(api, Some("1".to_string()));
        handle
            .wait_for(|s| s.is_loading() && s.user_id.as_deref() == Some("1"))
            .await
            .unwrap();
        handle.set_user_id("2");

        let state = handle
            .wait_for(|s| !s.is_loading() && s.user_id.as_deref() == Some("2"))
            .await
            .unwrap();
        assert!(state.reminders.is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let state = handle.state();
        assert!(state.reminders.is_empty());
        assert!(!state.is_loading());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn submitting_draft_appends_and_resets() {
        let api = Arc::new(InMemoryReminderApi::new());
        let handle = start(api.clone(), Some("1".to_string()));
        loaded(&handle).await;

        handle.add_draft_time().unwrap();
        handle.change_draft_time(1, "15:00").unwrap();
        handle.set_draft_temp_alert(true).unwrap();
        handle.submit_draft().unwrap();

        let state = handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();
        assert_eq!(state.reminders[0].times, vec!["10:00", "15:00"]);
        assert!(state.reminders[0].temp_alert);
        assert_eq!(state.draft, ReminderDraft::default());
        assert_eq!(api.list("1").await.unwrap(), state.reminders);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn failed_create_keeps_draft_and_records_error() {
        let api = Arc::new(InMemoryReminderApi::new());
        api.fail(ReminderOperation::Create).await;
        let handle = start(api.clone(), Some("1".to_string()));
        loaded(&handle).await;

        handle.set_draft_frequency(ReminderFrequency::Weekly).unwrap();
        handle.submit_draft().unwrap();

        let state = handle.wait_for(|s| s.error.is_some()).await.unwrap();
        assert!(state.reminders.is_empty());
        assert_eq!(state.draft.frequency, ReminderFrequency::Weekly);
        assert_eq!(
            state.error.map(|e| e.message),
            Some("Failed to add reminder".to_string())
        );

        api.recover(ReminderOperation::Create).await;
        handle.submit_draft().unwrap();
        let state = handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();
        assert_eq!(state.error, None);
        assert_eq!(state.reminders[0].frequency, ReminderFrequency::Weekly);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn update_and_delete_reconcile_by_id() {
        let api = Arc::new(InMemoryReminderApi::new());
        let first = api.seed("1", draft_at("08:00")).await;
        let second = api.seed("1", draft_at("09:00")).await;
        let handle = start(api, Some("1".to_string()));
        handle.wait_for(|s| s.reminders.len() == 2).await.unwrap();

        handle
            .update_reminder(
                first.id.clone(),
                ReminderPatch {
                    temp_alert: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let state = handle
            .wait_for(|s| s.reminders.iter().any(|r| r.temp_alert))
            .await
            .unwrap();
        assert_eq!(state.reminders[0].times, first.times);
        assert_eq!(state.reminders[1], second);

        handle.delete_reminder(first.id.clone()).unwrap();
        let state = handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();
        assert_eq!(state.reminders, vec![second]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn failed_delete_leaves_list_untouched() {
        let api = Arc::new(InMemoryReminderApi::new());
        api.seed("1", draft_at("08:00")).await;
        let handle = start(api, Some("1".to_string()));
        let before = handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();

        handle.delete_reminder(404.into()).unwrap();
        let state = handle.wait_for(|s| s.error.is_some()).await.unwrap();

        assert_eq!(state.reminders, before.reminders);
        assert_eq!(state.error.map(|e| e.operation), Some(ReminderOperation::Delete));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn reload_picks_up_backend_changes() {
        let api = Arc::new(InMemoryReminderApi::new());
        api.seed("1", draft_at("08:00")).await;
        let handle = start(api.clone(), Some("1".to_string()));
        handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();

        let added = api.seed("1", draft_at("12:00")).await;
        handle.reload().unwrap();

        let state = handle.wait_for(|s| s.reminders.len() == 2).await.unwrap();
        assert_eq!(state.reminders[1], added);
        assert_eq!(api.list_calls(), 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn failed_reload_keeps_list_and_records_error() {
        let api = Arc::new(InMemoryReminderApi::new());
        api.seed("1", draft_at("08:00")).await;
        let handle = start(api.clone(), Some("1".to_string()));
        let before = handle.wait_for(|s| s.reminders.len() == 1).await.unwrap();

        api.fail(ReminderOperation::List).await;
        handle.reload().unwrap();

        let state = handle.wait_for(|s| s.error.is_some()).await.unwrap();
        assert_eq!(state.reminders, before.reminders);
        assert!(!state.is_loading());
        assert_eq!(
            state.error,
            Some(OperationError {
                operation: ReminderOperation::List,
                message: "Failed to fetch reminders".to_string(),
            })
        );
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn same_user_id_does_not_refetch() {
        let api = Arc::new(InMemoryReminderApi::new());
        let handle = start(api.clone(), Some("1".to_string()));
        loaded(&handle).await;
        assert_eq!(api.list_calls(), 1);

        handle.set_user_id("1");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.list_calls(), 1);
        assert!(!handle.state().is_loading());

        handle.set_user_id("2");
        handle
            .wait_for(|s| s.user_id.as_deref() == Some("2") && !s.is_loading())
            .await
            .unwrap();
        assert_eq!(api.list_calls(), 2);
        handle.shutdown().await;
    }
}
